//! Delivery of relevant articles and feedback handling
//!
//! ```text
//! deliver ──► Sent ──👍──► Expanded          (long summary, positive profile line)
//!                  ├──👎──► Dismissed         (acknowledgement, negative profile line)
//!                  └──🙌──► AwaitingFreeText  (instructions for !feedback)
//! ```
//!
//! Every state is terminal; repeated signals are processed again.

use super::store::{DeliveryRecord, DeliveryStore};
use crate::channels::{ChannelAdapter, SentMessage};
use crate::error::Result;
use crate::store::TextStore;
use crate::summarizer::Summaries;
use chrono::Utc;
use std::sync::Arc;

pub const POSITIVE_EMOJI: &str = "👍";
pub const NEGATIVE_EMOJI: &str = "👎";
pub const MORE_INFO_EMOJI: &str = "🙌";

/// Affordances attached to every delivered message, in order
pub const AFFORDANCES: [&str; 3] = [POSITIVE_EMOJI, NEGATIVE_EMOJI, MORE_INFO_EMOJI];

/// Characters of the short summary shown in the delivered message
pub const PREVIEW_CHARS: usize = 200;

pub const DISMISS_REPLY: &str = "Noted! We won't expand on this topic.";
pub const CUSTOM_FEEDBACK_REPLY: &str = "Feedback noted! Your profile has been updated.";

/// Feedback a user can give on a delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackSignal {
    Positive,
    Negative,
    MoreInfo,
    CustomText(String),
}

impl FeedbackSignal {
    /// Map a reaction emoji to a signal; unknown emoji are not feedback
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        match emoji {
            POSITIVE_EMOJI => Some(FeedbackSignal::Positive),
            NEGATIVE_EMOJI => Some(FeedbackSignal::Negative),
            MORE_INFO_EMOJI => Some(FeedbackSignal::MoreInfo),
            _ => None,
        }
    }
}

/// What handling a signal did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Message not tracked; nothing happened
    Ignored,
    Expanded,
    Dismissed,
    AwaitingFreeText,
    FeedbackRecorded,
}

/// Article ready for delivery
#[derive(Debug, Clone)]
pub struct Digest {
    pub title: String,
    pub link: String,
    pub feed_title: String,
    pub summaries: Summaries,
}

pub fn positive_line(title: &str) -> String {
    format!("Positive interest in: {}", title)
}

pub fn negative_line(title: &str) -> String {
    format!("Negative interest in: {}", title)
}

pub fn custom_feedback_line(text: &str) -> String {
    format!("Custom Feedback: {}", text)
}

/// Text of the direct message announcing an article
pub fn format_delivery(digest: &Digest) -> String {
    let mut preview: String = digest.summaries.short.chars().take(PREVIEW_CHARS).collect();
    if digest.summaries.short.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }

    let mut text = format!(
        "{} more detail · {} not interested · {} give feedback\n**Title:** {}\n**Summary:** {}",
        POSITIVE_EMOJI, NEGATIVE_EMOJI, MORE_INFO_EMOJI, digest.title, preview
    );
    if !digest.link.is_empty() {
        text.push_str(&format!("\n(Link: {})", digest.link));
    }
    text
}

/// Text of the follow-up sent on positive feedback
pub fn format_expanded(record: &DeliveryRecord) -> String {
    let mut text = format!(
        "**Detailed Summary for:** {}\n\n{}",
        record.title, record.long_summary
    );
    if !record.link.is_empty() {
        text.push_str(&format!("\n\nLink: {}", record.link));
    }
    text
}

/// Sends digests and turns reactions into profile updates
pub struct FeedbackTracker {
    channel: Arc<dyn ChannelAdapter>,
    store: TextStore,
    deliveries: DeliveryStore,
    command_prefix: String,
}

impl FeedbackTracker {
    pub fn new(
        channel: Arc<dyn ChannelAdapter>,
        store: TextStore,
        deliveries: DeliveryStore,
        command_prefix: &str,
    ) -> Self {
        Self {
            channel,
            store,
            deliveries,
            command_prefix: command_prefix.to_string(),
        }
    }

    pub fn deliveries(&self) -> &DeliveryStore {
        &self.deliveries
    }

    /// Instruction sent for the "more feedback" affordance
    pub fn free_text_instructions(&self) -> String {
        format!(
            "Please type your feedback in chat. Start with `{}feedback <your text>`.",
            self.command_prefix
        )
    }

    /// Send a digest to `recipient`, track it and attach the affordances.
    ///
    /// The record is stored before any affordance is attached so an early
    /// reaction always resolves. Failing to attach an affordance is logged
    /// and does not fail the delivery.
    pub async fn deliver(&self, recipient: &str, digest: &Digest) -> Result<SentMessage> {
        let sent = self
            .channel
            .send_direct(recipient, &format_delivery(digest))
            .await?;

        self.deliveries
            .insert(
                &sent.message_id,
                DeliveryRecord {
                    title: digest.title.clone(),
                    link: digest.link.clone(),
                    feed_title: digest.feed_title.clone(),
                    short_summary: digest.summaries.short.clone(),
                    long_summary: digest.summaries.long.clone(),
                    recipient: recipient.to_string(),
                    channel_id: sent.channel_id.clone(),
                    delivered_at: Utc::now(),
                },
            )
            .await;

        for emoji in AFFORDANCES {
            if let Err(e) = self.channel.add_reaction(&sent, emoji).await {
                tracing::warn!(
                    message_id = %sent.message_id,
                    emoji = %emoji,
                    error = %e,
                    "Failed to attach feedback affordance"
                );
            }
        }

        tracing::info!(
            recipient = %recipient,
            message_id = %sent.message_id,
            title = %digest.title,
            "Delivered digest"
        );
        Ok(sent)
    }

    /// Handle a feedback signal for a delivered message
    pub async fn on_feedback(
        &self,
        message_id: &str,
        signal: FeedbackSignal,
    ) -> Result<FeedbackOutcome> {
        let Some(record) = self.deliveries.get(message_id).await else {
            tracing::debug!(message_id = %message_id, "Feedback on untracked message ignored");
            return Ok(FeedbackOutcome::Ignored);
        };

        let outcome = match signal {
            FeedbackSignal::Positive => {
                self.store.append_profile(&positive_line(&record.title)).await?;
                self.notify(&record.recipient, &format_expanded(&record)).await;
                FeedbackOutcome::Expanded
            }
            FeedbackSignal::Negative => {
                self.store.append_profile(&negative_line(&record.title)).await?;
                self.notify(&record.recipient, DISMISS_REPLY).await;
                FeedbackOutcome::Dismissed
            }
            FeedbackSignal::MoreInfo => {
                self.channel
                    .send_direct(&record.recipient, &self.free_text_instructions())
                    .await?;
                FeedbackOutcome::AwaitingFreeText
            }
            FeedbackSignal::CustomText(text) => {
                self.on_custom_feedback(&record.recipient, &text).await?
            }
        };

        tracing::info!(
            message_id = %message_id,
            title = %record.title,
            outcome = ?outcome,
            "Feedback handled"
        );
        Ok(outcome)
    }

    /// Record free-text feedback submitted through the feedback command
    pub async fn on_custom_feedback(&self, recipient: &str, text: &str) -> Result<FeedbackOutcome> {
        let text = text.trim();
        if text.is_empty() {
            self.channel
                .send_direct(
                    recipient,
                    &format!("Usage: `{}feedback <your text>`", self.command_prefix),
                )
                .await?;
            return Ok(FeedbackOutcome::Ignored);
        }

        self.store.append_profile(&custom_feedback_line(text)).await?;
        self.notify(recipient, CUSTOM_FEEDBACK_REPLY).await;
        Ok(FeedbackOutcome::FeedbackRecorded)
    }

    /// Send a follow-up whose loss must not undo a recorded profile update
    async fn notify(&self, recipient: &str, content: &str) {
        if let Err(e) = self.channel.send_direct(recipient, content).await {
            tracing::warn!(recipient = %recipient, error = %e, "Failed to send feedback reply");
        }
    }
}
