//! In-memory delivery records
//!
//! Maps a delivered message identifier to the article it summarized so a
//! later reaction can be resolved. Shared between the run task (writer) and
//! the feedback path (reader) through `tokio::sync::RwLock`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Article metadata kept for a delivered message
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub title: String,
    pub link: String,
    pub feed_title: String,
    pub short_summary: String,
    pub long_summary: String,
    /// User the message was sent to
    pub recipient: String,
    /// Conversation the message lives in
    pub channel_id: String,
    pub delivered_at: DateTime<Utc>,
}

/// Process-lifetime store of delivery records, cheap to clone
#[derive(Clone, Default)]
pub struct DeliveryStore {
    records: Arc<RwLock<HashMap<String, DeliveryRecord>>>,
}

impl DeliveryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delivered message; a repeated id replaces the old record
    pub async fn insert(&self, message_id: &str, record: DeliveryRecord) {
        self.records
            .write()
            .await
            .insert(message_id.to_string(), record);
    }

    /// Look up the record for a message
    pub async fn get(&self, message_id: &str) -> Option<DeliveryRecord> {
        self.records.read().await.get(message_id).cloned()
    }

    pub async fn contains(&self, message_id: &str) -> bool {
        self.records.read().await.contains_key(message_id)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> DeliveryRecord {
        DeliveryRecord {
            title: title.to_string(),
            link: "https://example.com/a".to_string(),
            feed_title: "Example".to_string(),
            short_summary: "short".to_string(),
            long_summary: "long".to_string(),
            recipient: "user-1".to_string(),
            channel_id: "dm-1".to_string(),
            delivered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = DeliveryStore::new();
        assert!(store.is_empty().await);

        store.insert("m1", record("Mars Rover Update")).await;
        let found = store.get("m1").await.unwrap();
        assert_eq!(found.title, "Mars Rover Update");
        assert!(store.contains("m1").await);
        assert!(store.get("m2").await.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = DeliveryStore::new();
        let writer = store.clone();

        let handle = tokio::spawn(async move {
            writer.insert("m1", record("a")).await;
            writer.insert("m2", record("b")).await;
        });
        handle.await.unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("m2").await.unwrap().title, "b");
    }
}
