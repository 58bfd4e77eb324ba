//! Feed fetching and processing
//!
//! A feed URL becomes a [`ParsedFeed`]; the [`FeedProcessor`] summarizes
//! every entry, writes a note for it and delivers the relevant ones.

mod fetcher;
mod processor;

pub use fetcher::{parse_feed, HttpFeedFetcher};
pub use processor::{format_note, FeedProcessor, FeedReport, RunReport};

use crate::error::Result;
use async_trait::async_trait;

pub const NO_TITLE: &str = "No Title";
pub const NO_SUMMARY: &str = "No Summary";
pub const UNKNOWN_FEED: &str = "Unknown Feed";

/// One article of a feed, with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub body: String,
    pub link: String,
}

impl FeedEntry {
    /// Build an entry; missing or blank fields fall back to placeholders
    pub fn new(title: Option<String>, body: Option<String>, link: Option<String>) -> Self {
        fn present(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            title: present(title).unwrap_or_else(|| NO_TITLE.to_string()),
            body: present(body).unwrap_or_else(|| NO_SUMMARY.to_string()),
            link: present(link).unwrap_or_default(),
        }
    }
}

/// A fetched and parsed feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

impl ParsedFeed {
    /// Feed title, or the placeholder when the feed has none
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_FEED)
    }
}

/// Fetches and parses a feed URL
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed>;
}
