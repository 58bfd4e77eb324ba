//! FeedClaw - Personal RSS digest assistant
//!
//! FeedClaw polls a list of feeds, summarizes every entry with a language
//! model, keeps a plain text note per entry, and sends the entries that
//! match the user's interests as Discord direct messages. Reactions on
//! those messages feed back into the user profile, which in turn steers
//! which entries are surfaced next time.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ChannelEvent   ┌──────────────┐   BotEvent   ┌──────────────┐
//! │   Discord    │ ───────────────► │  Dispatcher  │ ◄─────────── │  Scheduler   │
//! │   adapter    │ ◄─────────────── │              │              └──────────────┘
//! └──────────────┘   DMs/reactions  └──────┬───────┘
//!                                          │ run / feedback
//!                        ┌─────────────────┼─────────────────┐
//!                        ▼                 ▼                 ▼
//!                 ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//!                 │   Feeds    │──►│  Summarizer  │   │   Feedback   │
//!                 │ processor  │   │   (model)    │   │   tracker    │
//!                 └─────┬──────┘   └──────────────┘   └──────┬───────┘
//!                       │ notes, relevance                    │ profile lines
//!                       ▼                                     ▼
//!                 ┌──────────────────────────────────────────────────┐
//!                 │       Text store (interest, profile, notes)      │
//!                 └──────────────────────────────────────────────────┘
//! ```

pub mod bot;
pub mod channels;
pub mod config;
pub mod delivery;
pub mod error;
pub mod feeds;
pub mod relevance;
pub mod scheduler;
pub mod store;
pub mod summarizer;

#[cfg(test)]
mod testing;

pub use config::FeedClawConfig;
pub use error::{Error, Result};
