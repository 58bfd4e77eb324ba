//! Plain text state
//!
//! Everything FeedClaw persists is a flat text file: the interest file,
//! the append-only profile log, the feed source list and one note per
//! processed entry.

mod naming;
mod text;

pub use naming::{sanitize_filename, DEFAULT_MAX_NAME_LEN, PLACEHOLDER_NAME};
pub use text::{append_line, load_feed_sources, load_text, write_note, TextStore};
