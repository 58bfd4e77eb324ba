//! Channel adapter trait and shared lifecycle state

use super::message::{InboundMessage, ReactionEvent, SentMessage};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::mpsc;

/// Events emitted by a channel adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Adapter connected; `bot_user_id` identifies our own account
    Connected {
        channel: String,
        bot_user_id: Option<String>,
    },
    /// A direct message from a user
    DirectMessage(InboundMessage),
    /// A message posted in a server channel
    GuildMessage(InboundMessage),
    /// A reaction added to a message in a direct conversation
    ReactionAdded(ReactionEvent),
    /// Adapter disconnected
    Disconnected { channel: String, reason: String },
}

/// Chat platform adapter
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Channel name (e.g. "discord")
    fn name(&self) -> &str;

    /// Start receiving events
    async fn start(&self, event_tx: mpsc::Sender<ChannelEvent>) -> Result<()>;

    /// Stop receiving events
    async fn stop(&self) -> Result<()>;

    /// Send a direct message to a user, returning the sent message
    async fn send_direct(&self, recipient: &str, content: &str) -> Result<SentMessage>;

    /// Post a message in an existing channel
    async fn send_to_channel(&self, channel_id: &str, content: &str) -> Result<SentMessage>;

    /// Attach a reaction affordance to a sent message
    async fn add_reaction(&self, message: &SentMessage, emoji: &str) -> Result<()>;

    /// Whether the adapter is currently running
    fn is_connected(&self) -> bool;
}

/// Adapter lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdapterStatus {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl AdapterStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AdapterStatus::Starting,
            2 => AdapterStatus::Running,
            3 => AdapterStatus::Stopping,
            _ => AdapterStatus::Stopped,
        }
    }
}

/// Name and status shared by every adapter
pub struct AdapterBase {
    name: String,
    status: AtomicU8,
}

impl AdapterBase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: AtomicU8::new(AdapterStatus::Stopped as u8),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> AdapterStatus {
        AdapterStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn set_status(&self, status: AdapterStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.status() == AdapterStatus::Running
    }
}
