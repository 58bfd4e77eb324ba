//! Single consumer for chat events and scheduler ticks
//!
//! Runs are spawned off the dispatcher so feedback keeps flowing while
//! feeds are processed. At most one run is in flight; a request that
//! arrives during a run is refused rather than queued.

use super::command::{parse_command, Command};
use super::{BotEvent, RunTrigger};
use crate::channels::{ChannelAdapter, ChannelEvent};
use crate::delivery::{FeedbackSignal, FeedbackTracker};
use crate::feeds::FeedProcessor;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

pub const HELP_TEXT: &str = "Commands:\n\
`{p}run` : fetch and summarize all feeds now\n\
`{p}feedback <text>` : tell me what you want more or less of\n\
`{p}help` : this message\n\
React to a summary with 👍 for details, 👎 to skip the topic, 🙌 to give feedback.";

/// Reply to commands posted outside a direct conversation
pub const DM_ONLY_REPLY: &str = "Please use this command in a direct message (DM) with me.";

/// Dispatches inbound events to the feed processor and feedback tracker
pub struct Dispatcher {
    processor: Arc<FeedProcessor>,
    tracker: Arc<FeedbackTracker>,
    channel: Arc<dyn ChannelAdapter>,
    command_prefix: String,
    bot_user_id: RwLock<Option<String>>,
    run_lock: Arc<Mutex<()>>,
}

impl Dispatcher {
    pub fn new(
        processor: Arc<FeedProcessor>,
        channel: Arc<dyn ChannelAdapter>,
        command_prefix: &str,
    ) -> Self {
        Self {
            tracker: processor.tracker().clone(),
            processor,
            channel,
            command_prefix: command_prefix.to_string(),
            bot_user_id: RwLock::new(None),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Our own account id, learned from the connect event
    pub async fn bot_user_id(&self) -> Option<String> {
        self.bot_user_id.read().await.clone()
    }

    fn help_text(&self) -> String {
        HELP_TEXT.replace("{p}", &self.command_prefix)
    }

    /// Turn a channel event into a bot event.
    ///
    /// Reactions from our own account (the affordances we attach) and
    /// emoji that are not feedback never reach the tracker.
    pub async fn translate(&self, event: ChannelEvent) -> Option<BotEvent> {
        match event {
            ChannelEvent::Connected {
                channel,
                bot_user_id,
            } => {
                tracing::info!(channel = %channel, bot_user_id = ?bot_user_id, "Channel connected");
                if bot_user_id.is_some() {
                    *self.bot_user_id.write().await = bot_user_id;
                }
                None
            }
            ChannelEvent::Disconnected { channel, reason } => {
                tracing::warn!(channel = %channel, reason = %reason, "Channel disconnected");
                None
            }
            ChannelEvent::DirectMessage(msg) => {
                let command = parse_command(&self.command_prefix, &msg.content)?;
                match command {
                    Command::Run => Some(BotEvent::RunRequested {
                        recipient: msg.author_id,
                        trigger: RunTrigger::Command,
                    }),
                    Command::Feedback(text) => Some(BotEvent::FeedbackReceived {
                        user_id: msg.author_id,
                        message_id: None,
                        signal: FeedbackSignal::CustomText(text),
                    }),
                    Command::Help => {
                        self.reply(&msg.author_id, &self.help_text()).await;
                        None
                    }
                    Command::Unknown(name) => {
                        self.reply(
                            &msg.author_id,
                            &format!(
                                "Unknown command `{}`. Try `{}help`.",
                                name, self.command_prefix
                            ),
                        )
                        .await;
                        None
                    }
                }
            }
            ChannelEvent::GuildMessage(msg) => {
                if parse_command(&self.command_prefix, &msg.content).is_some() {
                    let sent = self
                        .channel
                        .send_to_channel(&msg.channel_id, DM_ONLY_REPLY)
                        .await;
                    if let Err(e) = sent {
                        tracing::warn!(channel_id = %msg.channel_id, error = %e, "Failed to send reply");
                    }
                }
                None
            }
            ChannelEvent::ReactionAdded(reaction) => {
                if self.bot_user_id.read().await.as_deref() == Some(reaction.user_id.as_str()) {
                    return None;
                }
                let signal = FeedbackSignal::from_emoji(&reaction.emoji)?;
                Some(BotEvent::FeedbackReceived {
                    user_id: reaction.user_id,
                    message_id: Some(reaction.message_id),
                    signal,
                })
            }
        }
    }

    async fn reply(&self, recipient: &str, content: &str) {
        if let Err(e) = self.channel.send_direct(recipient, content).await {
            tracing::warn!(recipient = %recipient, error = %e, "Failed to send reply");
        }
    }

    /// Handle one bot event. Returns the spawned run task, if any.
    pub async fn handle(&self, event: BotEvent) -> Option<JoinHandle<()>> {
        match event {
            BotEvent::RunRequested { recipient, trigger } => {
                self.start_run(recipient, trigger).await
            }
            BotEvent::FeedbackReceived {
                user_id,
                message_id,
                signal,
            } => {
                let result = match (message_id, signal) {
                    (Some(message_id), signal) => {
                        self.tracker.on_feedback(&message_id, signal).await
                    }
                    (None, FeedbackSignal::CustomText(text)) => {
                        self.tracker.on_custom_feedback(&user_id, &text).await
                    }
                    (None, signal) => {
                        tracing::debug!(signal = ?signal, "Feedback without a target ignored");
                        return None;
                    }
                };
                if let Err(e) = result {
                    tracing::error!(user = %user_id, error = %e, "Failed to handle feedback");
                    self.reply(&user_id, &format!("Could not record feedback: {}", e))
                        .await;
                }
                None
            }
        }
    }

    async fn start_run(&self, recipient: String, trigger: RunTrigger) -> Option<JoinHandle<()>> {
        let guard = match self.run_lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!(recipient = %recipient, trigger = ?trigger, "Run already in progress");
                if trigger == RunTrigger::Command {
                    self.reply(&recipient, "A run is already in progress, please wait for it to finish.")
                        .await;
                }
                return None;
            }
        };

        if trigger == RunTrigger::Command {
            self.reply(&recipient, "Starting RSS feed parsing now...").await;
        }

        let processor = self.processor.clone();
        let channel = self.channel.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            let notice = match processor.process_all_feeds(&recipient).await {
                Ok(report) => {
                    if trigger == RunTrigger::Command {
                        Some(format!("Parsing complete! {}", report.summary_line()))
                    } else {
                        None
                    }
                }
                Err(e) => {
                    tracing::error!(recipient = %recipient, error = %e, "Run failed");
                    Some(format!("Run failed: {}", e))
                }
            };
            if let Some(notice) = notice {
                if let Err(e) = channel.send_direct(&recipient, &notice).await {
                    tracing::warn!(recipient = %recipient, error = %e, "Failed to send run notice");
                }
            }
        }))
    }

    /// Consume events until both queues close.
    pub async fn run(
        self: Arc<Self>,
        mut channel_rx: mpsc::Receiver<ChannelEvent>,
        mut bot_rx: mpsc::Receiver<BotEvent>,
    ) {
        let mut channel_open = true;
        let mut bot_open = true;

        while channel_open || bot_open {
            let event = tokio::select! {
                event = channel_rx.recv(), if channel_open => match event {
                    Some(event) => self.translate(event).await,
                    None => {
                        channel_open = false;
                        None
                    }
                },
                event = bot_rx.recv(), if bot_open => match event {
                    Some(event) => Some(event),
                    None => {
                        bot_open = false;
                        None
                    }
                },
            };

            if let Some(event) = event {
                self.handle(event).await;
            }
        }
        tracing::info!("Dispatcher stopped");
    }
}
