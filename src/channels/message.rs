//! Channel message types

/// Discord rejects message content longer than this
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A message we sent; `message_id` is unique across the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SentMessage {
    pub channel_id: String,
    pub message_id: String,
}

/// Direct message received from a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub author_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub content: String,
}

/// Reaction added to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub user_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub emoji: String,
}

/// Split content into chunks the platform accepts, preferring line breaks.
pub fn split_message(content: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in content.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len <= max_chars {
            current.push_str(line);
            current_len += line_len;
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        // A single line longer than the limit is cut by characters
        let mut chars = line.chars().peekable();
        while chars.peek().is_some() {
            let piece: String = chars.by_ref().take(max_chars).collect();
            let piece_len = piece.chars().count();
            if piece_len == max_chars {
                chunks.push(piece);
            } else {
                current = piece;
                current_len = piece_len;
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    if chunks.is_empty() {
        chunks.push(String::new());
    }
    chunks
}
