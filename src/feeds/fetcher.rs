//! HTTP feed fetcher backed by `feed-rs`
//!
//! Handles RSS 0.x/1.0/2.0, Atom and JSON Feed. Sources that are not
//! `http(s)` URLs are read from the local filesystem (`file://` prefix
//! optional).

use super::{FeedEntry, FeedFetcher, ParsedFeed};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Parse raw feed bytes
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| Error::Feed(e.to_string()))?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let body = entry
                .summary
                .map(|s| s.content)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| entry.content.and_then(|c| c.body));
            FeedEntry::new(
                entry.title.map(|t| t.content),
                body,
                entry.links.into_iter().next().map(|l| l.href),
            )
        })
        .collect();

    Ok(ParsedFeed {
        title: feed.title.map(|t| t.content),
        entries,
    })
}

/// Fetches feeds over HTTP(S) or from local files
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("feedclaw/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| Error::Feed(format!("{}: {}", url, e)))?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Feed(format!("{}: HTTP {}", url, status)));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::Feed(format!("{}: {}", url, e)))?;
            Ok(bytes.to_vec())
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            tokio::fs::read(path)
                .await
                .map_err(|e| Error::Feed(format!("{}: {}", url, e)))
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let bytes = self.fetch_bytes(url).await?;
        let feed = parse_feed(&bytes).map_err(|e| Error::Feed(format!("{}: {}", url, e)))?;
        tracing::debug!(
            url = %url,
            title = %feed.display_title(),
            entries = feed.entries.len(),
            "Fetched feed"
        );
        Ok(feed)
    }
}
