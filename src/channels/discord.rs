//! Discord channel adapter
//!
//! Outbound traffic goes through the REST API (v10); inbound events come
//! from the gateway listener in [`super::gateway`].

use super::adapter::{AdapterBase, AdapterStatus, ChannelAdapter, ChannelEvent};
use super::gateway::run_gateway;
use super::message::{split_message, SentMessage, MAX_MESSAGE_CHARS};
use crate::config::DiscordConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_LENGTH, Client, Method, StatusCode, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};

/// How many times a rate-limited request is retried
const RATE_LIMIT_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
struct ChannelObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    id: String,
    channel_id: String,
}

#[derive(Debug, Deserialize)]
struct RateLimited {
    #[serde(default)]
    retry_after: f64,
}

/// Discord channel adapter
pub struct DiscordAdapter {
    config: DiscordConfig,
    token: String,
    client: Client,
    base: AdapterBase,
    /// Recipient user id → DM channel id
    dm_channels: RwLock<HashMap<String, String>>,
    shutdown_tx: RwLock<Option<watch::Sender<bool>>>,
}

impl DiscordAdapter {
    /// Create a new Discord adapter with a resolved bot token
    pub fn new(config: DiscordConfig, token: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            config,
            token,
            client,
            base: AdapterBase::new("discord"),
            dm_channels: RwLock::new(HashMap::new()),
            shutdown_tx: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Send a request, waiting out 429 responses.
    async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            let mut builder = self
                .client
                .request(method.clone(), url.clone())
                .header("Authorization", format!("Bot {}", self.token));
            builder = match &body {
                Some(body) => builder.json(body),
                None => builder.header(CONTENT_LENGTH, 0),
            };

            let response = builder.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < RATE_LIMIT_RETRIES {
                let wait = response
                    .json::<RateLimited>()
                    .await
                    .map(|r| r.retry_after)
                    .unwrap_or(1.0);
                tracing::debug!(url = %url, retry_after = wait, "Discord rate limited");
                tokio::time::sleep(Duration::from_secs_f64(wait.clamp(0.05, 30.0))).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(Error::Channel(format!(
                    "Discord API {} {} failed: {} {}",
                    method,
                    url.path(),
                    status,
                    text.chars().take(200).collect::<String>()
                )));
            }
            return Ok(response);
        }
    }

    fn parse_url(&self, path: &str) -> Result<Url> {
        Url::parse(&self.url(path))
            .map_err(|e| Error::Config(format!("Invalid Discord API URL: {}", e)))
    }

    /// DM channel for a user, created once and cached
    async fn dm_channel(&self, recipient: &str) -> Result<String> {
        if let Some(id) = self.dm_channels.read().await.get(recipient) {
            return Ok(id.clone());
        }

        let url = self.parse_url("/users/@me/channels")?;
        let channel: ChannelObject = self
            .request(
                Method::POST,
                url,
                Some(serde_json::json!({ "recipient_id": recipient })),
            )
            .await?
            .json()
            .await?;

        self.dm_channels
            .write()
            .await
            .insert(recipient.to_string(), channel.id.clone());
        Ok(channel.id)
    }

    async fn post_message(&self, channel_id: &str, content: &str) -> Result<SentMessage> {
        let url = self.parse_url(&format!("/channels/{}/messages", channel_id))?;
        let message: MessageObject = self
            .request(
                Method::POST,
                url,
                Some(serde_json::json!({ "content": content })),
            )
            .await?
            .json()
            .await?;
        Ok(SentMessage {
            channel_id: message.channel_id,
            message_id: message.id,
        })
    }

    /// Reaction endpoint with the emoji percent-encoded as a path segment
    fn reaction_url(&self, message: &SentMessage, emoji: &str) -> Result<Url> {
        let mut url = self.parse_url(&format!(
            "/channels/{}/messages/{}/reactions",
            message.channel_id, message.message_id
        ))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("Discord API URL cannot be a base".to_string()))?
            .push(emoji)
            .push("@me");
        Ok(url)
    }
}

#[async_trait]
impl ChannelAdapter for DiscordAdapter {
    fn name(&self) -> &str {
        self.base.name()
    }

    async fn start(&self, event_tx: mpsc::Sender<ChannelEvent>) -> Result<()> {
        if self.base.is_running() {
            return Ok(());
        }
        self.base.set_status(AdapterStatus::Starting);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.shutdown_tx.write().await = Some(shutdown_tx);

        tokio::spawn(run_gateway(
            self.config.gateway_url.clone(),
            self.token.clone(),
            event_tx,
            shutdown_rx,
        ));

        self.base.set_status(AdapterStatus::Running);
        tracing::info!("Discord adapter started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.base.set_status(AdapterStatus::Stopping);

        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(true);
        }

        self.base.set_status(AdapterStatus::Stopped);
        tracing::info!("Discord adapter stopped");
        Ok(())
    }

    async fn send_direct(&self, recipient: &str, content: &str) -> Result<SentMessage> {
        let channel_id = self.dm_channel(recipient).await?;
        let sent = self.send_to_channel(&channel_id, content).await?;
        tracing::debug!(recipient = %recipient, chars = content.len(), "Sent Discord DM");
        Ok(sent)
    }

    async fn send_to_channel(&self, channel_id: &str, content: &str) -> Result<SentMessage> {
        let mut first: Option<SentMessage> = None;
        for chunk in split_message(content, MAX_MESSAGE_CHARS) {
            let sent = self.post_message(channel_id, &chunk).await?;
            first.get_or_insert(sent);
        }
        first.ok_or_else(|| Error::Internal("No message chunk was sent".to_string()))
    }

    async fn add_reaction(&self, message: &SentMessage, emoji: &str) -> Result<()> {
        let url = self.reaction_url(message, emoji)?;
        self.request(Method::PUT, url, None).await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.base.is_running()
    }
}
