//! Test doubles for the channel, fetcher and summarizer seams

use crate::channels::{ChannelAdapter, ChannelEvent, SentMessage};
use crate::error::{Error, Result};
use crate::feeds::{FeedFetcher, ParsedFeed};
use crate::summarizer::{Summaries, Summarizer};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use tokio::sync::{mpsc, Mutex};

/// A direct message captured by [`RecordingChannel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub recipient: String,
    pub content: String,
    pub message_id: String,
}

/// Channel that records outbound traffic instead of sending it
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<RecordedMessage>>,
    posts: Mutex<Vec<(String, String)>>,
    reactions: Mutex<Vec<(String, String)>>,
    next_id: AtomicU64,
    fail_sends: AtomicBool,
    fail_reactions: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<RecordedMessage> {
        self.sent.lock().await.clone()
    }

    /// Channel posts as `(channel_id, content)`
    pub async fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().await.clone()
    }

    pub async fn reactions(&self) -> Vec<(String, String)> {
        self.reactions.lock().await.clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reactions(&self, fail: bool) {
        self.fail_reactions.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChannelAdapter for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self, _event_tx: mpsc::Sender<ChannelEvent>) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn send_direct(&self, recipient: &str, content: &str) -> Result<SentMessage> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Channel("send failed".to_string()));
        }
        let message_id = format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.sent.lock().await.push(RecordedMessage {
            recipient: recipient.to_string(),
            content: content.to_string(),
            message_id: message_id.clone(),
        });
        Ok(SentMessage {
            channel_id: format!("dm-{}", recipient),
            message_id,
        })
    }

    async fn send_to_channel(&self, channel_id: &str, content: &str) -> Result<SentMessage> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Channel("send failed".to_string()));
        }
        let message_id = format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.posts
            .lock()
            .await
            .push((channel_id.to_string(), content.to_string()));
        Ok(SentMessage {
            channel_id: channel_id.to_string(),
            message_id,
        })
    }

    async fn add_reaction(&self, message: &SentMessage, emoji: &str) -> Result<()> {
        if self.fail_reactions.load(Ordering::SeqCst) {
            return Err(Error::Channel("reaction failed".to_string()));
        }
        self.reactions
            .lock()
            .await
            .push((message.message_id.clone(), emoji.to_string()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Fetcher serving canned feeds; unknown URLs fail like a malformed feed
#[derive(Default)]
pub struct StaticFetcher {
    feeds: StdMutex<HashMap<String, ParsedFeed>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str, feed: ParsedFeed) {
        self.feeds
            .lock()
            .unwrap()
            .insert(url.to_string(), feed);
    }
}

#[async_trait]
impl FeedFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        self.feeds
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Feed(format!("{}: not a feed", url)))
    }
}

/// Summarizer echoing the article; selected titles fail
#[derive(Default)]
pub struct CannedSummarizer {
    failing: StdMutex<HashSet<String>>,
}

impl CannedSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, title: &str) {
        self.failing.lock().unwrap().insert(title.to_string());
    }
}

#[async_trait]
impl Summarizer for CannedSummarizer {
    async fn summarize(&self, title: &str, content: &str) -> Result<Summaries> {
        if self.failing.lock().unwrap().contains(title) {
            return Err(Error::Summarizer(format!("model unavailable for {}", title)));
        }
        Ok(Summaries {
            short: format!("Summary of {}: {}", title, content),
            long: format!("Detailed summary of {}: {}", title, content),
        })
    }
}
