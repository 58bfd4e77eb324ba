//! Discord gateway listener
//!
//! Keeps a websocket session open, heartbeats, and turns the dispatches we
//! care about (READY, MESSAGE_CREATE, direct MESSAGE_REACTION_ADD) into
//! [`ChannelEvent`]s. Sessions are not resumed: after a disconnect we
//! identify again from scratch.

use super::adapter::ChannelEvent;
use super::message::{InboundMessage, ReactionEvent};
use crate::error::{Error, Result};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// GUILD_MESSAGES | DIRECT_MESSAGES | DIRECT_MESSAGE_REACTIONS | MESSAGE_CONTENT
pub const GATEWAY_INTENTS: u64 = (1 << 9) | (1 << 12) | (1 << 13) | (1 << 15);

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Hello {
    heartbeat_interval: u64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct Ready {
    user: User,
}

#[derive(Debug, Deserialize)]
struct MessageCreate {
    id: String,
    channel_id: String,
    #[serde(default)]
    guild_id: Option<String>,
    author: User,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Emoji {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReactionAdd {
    user_id: String,
    channel_id: String,
    message_id: String,
    #[serde(default)]
    guild_id: Option<String>,
    emoji: Emoji,
}

/// Translate a dispatch into a channel event.
///
/// Messages written by bots and guild reactions are dropped here; reactions
/// by our own account are filtered later by the dispatcher, which knows the
/// bot user id from READY.
pub fn decode_dispatch(event_type: &str, data: Value) -> Result<Option<ChannelEvent>> {
    match event_type {
        "READY" => {
            let ready: Ready = serde_json::from_value(data)?;
            Ok(Some(ChannelEvent::Connected {
                channel: "discord".to_string(),
                bot_user_id: Some(ready.user.id),
            }))
        }
        "MESSAGE_CREATE" => {
            let msg: MessageCreate = serde_json::from_value(data)?;
            if msg.author.bot {
                return Ok(None);
            }
            let inbound = InboundMessage {
                author_id: msg.author.id,
                channel_id: msg.channel_id,
                message_id: msg.id,
                content: msg.content,
            };
            Ok(Some(match msg.guild_id {
                Some(_) => ChannelEvent::GuildMessage(inbound),
                None => ChannelEvent::DirectMessage(inbound),
            }))
        }
        "MESSAGE_REACTION_ADD" => {
            let reaction: ReactionAdd = serde_json::from_value(data)?;
            if reaction.guild_id.is_some() {
                return Ok(None);
            }
            let Some(emoji) = reaction.emoji.name else {
                return Ok(None);
            };
            Ok(Some(ChannelEvent::ReactionAdded(ReactionEvent {
                user_id: reaction.user_id,
                channel_id: reaction.channel_id,
                message_id: reaction.message_id,
                emoji,
            })))
        }
        _ => Ok(None),
    }
}

fn identify_payload(token: &str) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": GATEWAY_INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "feedclaw",
                "device": "feedclaw"
            }
        }
    })
}

fn heartbeat_payload(seq: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": seq })
}

/// Tracks whether the last heartbeat was acknowledged
#[derive(Debug, Default)]
struct Heartbeat {
    awaiting_ack: bool,
}

impl Heartbeat {
    /// Called when a heartbeat is due. Fails if the previous one was never
    /// acknowledged, which means the connection is dead.
    fn beat(&mut self) -> Result<()> {
        if self.awaiting_ack {
            return Err(Error::Channel(
                "Gateway did not acknowledge the last heartbeat".to_string(),
            ));
        }
        self.awaiting_ack = true;
        Ok(())
    }

    fn ack(&mut self) {
        self.awaiting_ack = false;
    }
}

fn ws_error(e: tokio_tungstenite::tungstenite::Error) -> Error {
    Error::Channel(format!("Discord gateway: {}", e))
}

/// Run the gateway until `shutdown` flips to true, reconnecting on errors.
pub(crate) async fn run_gateway(
    gateway_url: String,
    token: String,
    event_tx: mpsc::Sender<ChannelEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let session = run_session(&gateway_url, &token, &event_tx, &mut shutdown);
        match session.await {
            Ok(()) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Discord gateway session ended, reconnecting");
                let _ = event_tx
                    .send(ChannelEvent::Disconnected {
                        channel: "discord".to_string(),
                        reason: e.to_string(),
                    })
                    .await;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            _ = shutdown.changed() => {}
        }
        if *shutdown.borrow() || event_tx.is_closed() {
            break;
        }
    }
    tracing::info!("Discord gateway stopped");
}

/// One websocket session. `Ok` means a requested shutdown.
async fn run_session(
    gateway_url: &str,
    token: &str,
    event_tx: &mpsc::Sender<ChannelEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<()> {
    let (ws, _) = connect_async(gateway_url).await.map_err(ws_error)?;
    let (mut write, mut read) = ws.split();

    let hello = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => {
                let payload: GatewayPayload = serde_json::from_str(&text)?;
                if payload.op == OP_HELLO {
                    break serde_json::from_value::<Hello>(payload.d)?;
                }
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(ws_error(e)),
            None => return Err(Error::Channel("Gateway closed before HELLO".to_string())),
        }
    };

    write
        .send(Message::Text(identify_payload(token).to_string()))
        .await
        .map_err(ws_error)?;

    let period = Duration::from_millis(hello.heartbeat_interval.max(1000));
    let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    let mut seq: Option<u64> = None;
    let mut liveness = Heartbeat::default();

    tracing::info!(heartbeat_ms = hello.heartbeat_interval, "Discord gateway identified");

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                liveness.beat()?;
                write
                    .send(Message::Text(heartbeat_payload(seq).to_string()))
                    .await
                    .map_err(ws_error)?;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            }
            frame = read.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(frame))) => {
                        return Err(Error::Channel(format!("Gateway closed: {:?}", frame)));
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(ws_error(e)),
                    None => return Err(Error::Channel("Gateway stream ended".to_string())),
                };

                let payload: GatewayPayload = match serde_json::from_str(&text) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::debug!(error = %e, "Ignoring undecodable gateway frame");
                        continue;
                    }
                };
                if payload.s.is_some() {
                    seq = payload.s;
                }

                match payload.op {
                    OP_DISPATCH => {
                        let event_type = payload.t.unwrap_or_default();
                        match decode_dispatch(&event_type, payload.d) {
                            Ok(Some(event)) => {
                                if event_tx.send(event).await.is_err() {
                                    return Ok(());
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                tracing::warn!(event = %event_type, error = %e, "Failed to decode dispatch");
                            }
                        }
                    }
                    OP_HEARTBEAT => {
                        write
                            .send(Message::Text(heartbeat_payload(seq).to_string()))
                            .await
                            .map_err(ws_error)?;
                    }
                    OP_RECONNECT => {
                        return Err(Error::Channel("Gateway requested reconnect".to_string()));
                    }
                    OP_INVALID_SESSION => {
                        return Err(Error::Channel("Gateway invalidated the session".to_string()));
                    }
                    OP_HEARTBEAT_ACK => liveness.ack(),
                    other => tracing::debug!(op = other, "Unhandled gateway opcode"),
                }
            }
        }
    }
}
