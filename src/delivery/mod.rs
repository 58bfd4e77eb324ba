//! Delivery of relevant articles and feedback-driven personalization

mod store;
mod tracker;

pub use store::{DeliveryRecord, DeliveryStore};
pub use tracker::{
    custom_feedback_line, format_delivery, format_expanded, negative_line, positive_line, Digest,
    FeedbackOutcome, FeedbackSignal, FeedbackTracker, AFFORDANCES, CUSTOM_FEEDBACK_REPLY,
    DISMISS_REPLY, MORE_INFO_EMOJI, NEGATIVE_EMOJI, POSITIVE_EMOJI, PREVIEW_CHARS,
};
