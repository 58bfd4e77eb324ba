//! Inbound event handling
//!
//! Chat traffic and scheduler ticks are funnelled into one queue of
//! [`BotEvent`]s consumed by a single [`Dispatcher`].

mod command;
mod dispatcher;

pub use command::{parse_command, Command};
pub use dispatcher::{Dispatcher, DM_ONLY_REPLY, HELP_TEXT};

use crate::delivery::FeedbackSignal;

/// What asked for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTrigger {
    /// The user typed the run command
    Command,
    /// Periodic tick
    Schedule,
}

/// Events consumed by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    /// Process all feeds for `recipient`
    RunRequested {
        recipient: String,
        trigger: RunTrigger,
    },
    /// Feedback from `user_id`, on a delivered message or free-standing
    FeedbackReceived {
        user_id: String,
        message_id: Option<String>,
        signal: FeedbackSignal,
    },
}
