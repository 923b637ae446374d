use anyhow::{Context, Result, anyhow, bail};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message, client::IntoClientRequest},
};
use tracing::{debug, error, info, warn};
use weather_core::Dispatcher;

use super::{
    model::{self, GatewayPayload, Hello, MessageCreate, Ready, op},
    rest::DiscordRest,
};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How a gateway session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Open a fresh session.
    Reconnect,
    /// Discord will refuse any new session with the same settings.
    Fatal(String),
}

/// What the session loop should do after one payload.
#[derive(Debug)]
enum Step {
    Continue,
    SendHeartbeat,
    Message(MessageCreate),
    End(SessionEnd),
}

/// Per-session bookkeeping: last sequence number and heartbeat acknowledgement.
#[derive(Debug)]
struct SessionState {
    seq: Option<u64>,
    acked: bool,
}

impl SessionState {
    fn new() -> Self {
        Self { seq: None, acked: true }
    }

    fn on_payload(&mut self, payload: GatewayPayload) -> Step {
        if let Some(seq) = payload.s {
            self.seq = Some(seq);
        }

        match payload.op {
            op::DISPATCH => on_dispatch(payload.t.as_deref(), payload.d),
            op::HEARTBEAT => Step::SendHeartbeat,
            op::HEARTBEAT_ACK => {
                self.acked = true;
                Step::Continue
            }
            op::RECONNECT => {
                info!("Discord asked to reconnect");
                Step::End(SessionEnd::Reconnect)
            }
            op::INVALID_SESSION => {
                warn!("Discord invalidated the session");
                Step::End(SessionEnd::Reconnect)
            }
            other => {
                debug!(op = other, "ignoring gateway opcode");
                Step::Continue
            }
        }
    }

    /// Called on each heartbeat tick. `false` means the previous beat was never
    /// acknowledged and the connection is a zombie.
    fn start_heartbeat(&mut self) -> bool {
        if !self.acked {
            return false;
        }
        self.acked = false;
        true
    }
}

fn on_dispatch(event: Option<&str>, data: Value) -> Step {
    match event {
        Some("READY") => {
            match serde_json::from_value::<Ready>(data) {
                Ok(ready) => {
                    info!(user_id = %ready.user.id, "✅ Bot started as {}", ready.user.username)
                }
                Err(err) => warn!(error = %err, "malformed READY payload"),
            }
            Step::Continue
        }
        Some("MESSAGE_CREATE") => match serde_json::from_value::<MessageCreate>(data) {
            Ok(msg) if msg.author.bot => Step::Continue,
            Ok(msg) => Step::Message(msg),
            Err(err) => {
                warn!(error = %err, "malformed MESSAGE_CREATE payload");
                Step::Continue
            }
        },
        _ => Step::Continue,
    }
}

/// Long-running Discord gateway connection feeding messages into a [`Dispatcher`].
pub struct Gateway {
    url: String,
    token: String,
    dispatcher: Arc<Dispatcher>,
    rest: Arc<DiscordRest>,
    reconnect_delay: Duration,
}

impl Gateway {
    /// Fails unless `url` is a well-formed `ws://` or `wss://` URL.
    pub fn new(
        url: &str,
        token: String,
        dispatcher: Arc<Dispatcher>,
        rest: Arc<DiscordRest>,
    ) -> Result<Self> {
        let request = url
            .into_client_request()
            .with_context(|| format!("Invalid Discord gateway URL: {url}"))?;
        if !matches!(request.uri().scheme_str(), Some("ws" | "wss")) {
            bail!("Invalid Discord gateway URL: {url} (expected ws:// or wss://)");
        }

        Ok(Self {
            url: url.to_string(),
            token,
            dispatcher,
            rest,
            reconnect_delay: RECONNECT_DELAY,
        })
    }

    /// Runs sessions back to back until one ends fatally.
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.run_session().await {
                Ok(SessionEnd::Reconnect) => info!("gateway session ended, reconnecting"),
                Ok(SessionEnd::Fatal(reason)) => bail!("Discord gateway stopped: {reason}"),
                Err(err) => warn!(error = %format!("{err:#}"), "gateway session failed"),
            }
            sleep(self.reconnect_delay).await;
        }
    }

    async fn run_session(&self) -> Result<SessionEnd> {
        let ws = match connect_async(self.url.as_str()).await {
            Ok((ws, _)) => ws,
            Err(err @ (tungstenite::Error::Url(_) | tungstenite::Error::HttpFormat(_))) => {
                return Ok(SessionEnd::Fatal(format!("unusable gateway URL {}: {err}", self.url)));
            }
            Err(err) => return Err(err).context("Failed to connect to Discord gateway"),
        };
        let (mut sink, mut stream) = ws.split();

        let hello = loop {
            let frame = stream
                .next()
                .await
                .ok_or_else(|| anyhow!("gateway closed before HELLO"))?
                .context("Failed to read HELLO")?;
            if let Message::Text(text) = frame {
                let payload: GatewayPayload =
                    serde_json::from_str(text.as_str()).context("Malformed HELLO")?;
                if payload.op != op::HELLO {
                    bail!("expected HELLO, got opcode {}", payload.op);
                }
                break serde_json::from_value::<Hello>(payload.d).context("Malformed HELLO")?;
            }
        };

        if hello.heartbeat_interval == 0 {
            bail!("HELLO with zero heartbeat_interval");
        }
        let period = Duration::from_millis(hello.heartbeat_interval);
        debug!(?period, "gateway HELLO received");

        sink.send(Message::text(model::identify(&self.token).to_string()))
            .await
            .context("Failed to send IDENTIFY")?;

        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut state = SessionState::new();

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if !state.start_heartbeat() {
                        warn!("heartbeat was not acknowledged");
                        return Ok(SessionEnd::Reconnect);
                    }
                    sink.send(Message::text(model::heartbeat(state.seq).to_string()))
                        .await
                        .context("Failed to send heartbeat")?;
                }
                frame = stream.next() => {
                    let Some(frame) = frame else {
                        return Ok(SessionEnd::Reconnect);
                    };
                    match frame.context("Failed to read from gateway")? {
                        Message::Text(text) => {
                            let payload: GatewayPayload = match serde_json::from_str(text.as_str()) {
                                Ok(payload) => payload,
                                Err(err) => {
                                    warn!(error = %err, "skipping malformed gateway payload");
                                    continue;
                                }
                            };
                            match state.on_payload(payload) {
                                Step::Continue => {}
                                Step::SendHeartbeat => {
                                    sink.send(Message::text(model::heartbeat(state.seq).to_string()))
                                        .await
                                        .context("Failed to send heartbeat")?;
                                }
                                Step::Message(msg) => self.spawn_command(msg),
                                Step::End(end) => return Ok(end),
                            }
                        }
                        Message::Close(frame) => {
                            let code = frame.as_ref().map(|f| u16::from(f.code));
                            warn!(?code, "gateway closed the connection");
                            return Ok(match code {
                                Some(code) if model::is_fatal_close(code) => {
                                    let reason = frame.map(|f| f.reason.as_str().to_owned()).unwrap_or_default();
                                    SessionEnd::Fatal(format!("close code {code}: {reason}"))
                                }
                                _ => SessionEnd::Reconnect,
                            });
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Commands run in their own task; the read loop never awaits a lookup.
    fn spawn_command(&self, msg: MessageCreate) {
        if !self.dispatcher.is_command(&msg.content) {
            return;
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let rest = Arc::clone(&self.rest);
        tokio::spawn(async move {
            let Some(reply) = dispatcher.dispatch(&msg.content).await else {
                return;
            };
            if let Err(err) = rest.send_reply(&msg.channel_id, &reply).await {
                error!(
                    error = %format!("{err:#}"),
                    channel_id = %msg.channel_id,
                    "failed to send reply"
                );
            }
        });
    }
}
