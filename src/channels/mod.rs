//! Chat channel adapters
//!
//! The pipeline only needs two things from a chat platform: send a direct
//! message (getting back an identifier) and attach a reaction affordance to
//! it. Inbound traffic arrives as [`ChannelEvent`]s on an mpsc channel.

mod adapter;
mod discord;
mod gateway;
mod message;

pub use adapter::{AdapterBase, AdapterStatus, ChannelAdapter, ChannelEvent};
pub use discord::DiscordAdapter;
pub use gateway::{decode_dispatch, GATEWAY_INTENTS};
pub use message::{InboundMessage, ReactionEvent, SentMessage, MAX_MESSAGE_CHARS, split_message};
