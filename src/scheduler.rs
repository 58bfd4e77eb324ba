//! Periodic run scheduler
//!
//! Emits a scheduled [`BotEvent::RunRequested`] for the owner every
//! interval. The first tick fires one full interval after start; ticks
//! missed while the dispatcher is busy are skipped, not replayed.

use crate::bot::{BotEvent, RunTrigger};
use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Sends run requests on a fixed period
#[derive(Debug, Clone)]
pub struct RunScheduler {
    period: Duration,
    recipient: String,
}

impl RunScheduler {
    pub fn new(period: Duration, recipient: impl Into<String>) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::Config(
                "scheduler interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            period,
            recipient: recipient.into(),
        })
    }

    /// Build from config. `None` when scheduling is disabled.
    pub fn from_config(config: &SchedulerConfig, recipient: Option<&str>) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let recipient = recipient.ok_or_else(|| {
            Error::Config("scheduler.enabled requires discord.owner_user_id".to_string())
        })?;
        let secs = config.interval_minutes.checked_mul(60).ok_or_else(|| {
            Error::Config(format!(
                "scheduler.interval_minutes is too large: {}",
                config.interval_minutes
            ))
        })?;
        Self::new(Duration::from_secs(secs), recipient).map(Some)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start ticking. The task ends once the receiving side is dropped.
    pub fn spawn(self, bot_tx: mpsc::Sender<BotEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(
                recipient = %self.recipient,
                period_secs = self.period.as_secs(),
                "Scheduler started"
            );

            loop {
                ticker.tick().await;
                tracing::debug!(recipient = %self.recipient, "Scheduled run due");
                let event = BotEvent::RunRequested {
                    recipient: self.recipient.clone(),
                    trigger: RunTrigger::Schedule,
                };
                if bot_tx.send(event).await.is_err() {
                    break;
                }
            }

            tracing::info!("Scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let disabled = SchedulerConfig::default();
        assert!(RunScheduler::from_config(&disabled, Some("u1"))
            .unwrap()
            .is_none());

        let enabled = SchedulerConfig {
            enabled: true,
            interval_minutes: 30,
        };
        let scheduler = RunScheduler::from_config(&enabled, Some("u1"))
            .unwrap()
            .unwrap();
        assert_eq!(scheduler.period(), Duration::from_secs(1800));

        assert!(matches!(
            RunScheduler::from_config(&enabled, None),
            Err(Error::Config(_))
        ));

        let zero = SchedulerConfig {
            enabled: true,
            interval_minutes: 0,
        };
        assert!(RunScheduler::from_config(&zero, Some("u1")).is_err());

        let huge = SchedulerConfig {
            enabled: true,
            interval_minutes: u64::MAX,
        };
        assert!(matches!(
            RunScheduler::from_config(&huge, Some("u1")),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = RunScheduler::new(Duration::from_secs(60), "u1")
            .unwrap()
            .spawn(tx);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(rx.try_recv().is_err());

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            BotEvent::RunRequested {
                recipient: "u1".to_string(),
                trigger: RunTrigger::Schedule,
            }
        );

        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second,
            BotEvent::RunRequested {
                trigger: RunTrigger::Schedule,
                ..
            }
        ));
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        let handle = RunScheduler::new(Duration::from_secs(1), "u1")
            .unwrap()
            .spawn(tx);
        drop(rx);
        handle.await.unwrap();
    }
}
