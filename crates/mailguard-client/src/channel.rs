//! Long-lived push channel with a scoped lifetime.
//!
//! [`PushChannel::open`] spawns one connection task and returns the handle
//! that owns it. Events arrive on [`PushChannel::recv`]. Dropping the handle
//! aborts the task, so a channel never outlives the view that opened it.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mailguard_core::{PushEvent, decode_event, decode_sse_data};
use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{ClientConfig, ReconnectPolicy, Transport};
use crate::socketio::{self, EnginePacket, SocketPacket};
use crate::sse::{SseDecoder, SseEvent};
use crate::{Error, Result};

/// Capacity of the event queue between the connection task and the handle.
const EVENT_BUFFER: usize = 64;

/// Something that happened on the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The transport connected.
    Opened,
    /// A decoded server event.
    Event(PushEvent),
    /// A connection attempt or the live connection failed. A retry follows
    /// unless the policy is exhausted.
    Error(String),
    /// The channel gave up or the server ended the session. No further
    /// events follow.
    Closed,
}

/// Handle owning the connection task.
#[derive(Debug)]
pub struct PushChannel {
    transport: Transport,
    events: mpsc::Receiver<ChannelEvent>,
    task: JoinHandle<()>,
}

impl PushChannel {
    /// Opens the configured transport against `config.api_url`.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when the channel URL cannot be derived or the HTTP
    /// client cannot be built. Connection failures are reported as
    /// [`ChannelEvent::Error`] instead.
    pub fn open(config: &ClientConfig) -> Result<Self> {
        let (tx, events) = mpsc::channel(EVENT_BUFFER);
        let transport = config.transport;

        let task = match transport {
            Transport::Sse => {
                let session = SseSession {
                    url: config.api_url.join("api/events/stream")?,
                    // No overall timeout: the response body never ends.
                    http: Client::builder()
                        .connect_timeout(config.request_timeout)
                        .build()?,
                    last_event_id: None,
                    retry: None,
                };
                tokio::spawn(reconnect_loop(session, config.sse_reconnect, tx))
            }
            Transport::Socket => {
                let session = SocketSession {
                    url: socketio::handshake_url(&config.api_url)?,
                    connect_timeout: config.request_timeout,
                };
                tokio::spawn(reconnect_loop(session, config.socket_reconnect, tx))
            }
        };

        info!(transport = transport.as_str(), "Push channel opened");
        Ok(Self {
            transport,
            events,
            task,
        })
    }

    /// Transport in use.
    #[must_use]
    pub const fn transport(&self) -> Transport {
        self.transport
    }

    /// Next event, or `None` once the connection task has finished.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    /// Stops the connection task and waits for it to finish.
    pub async fn close(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        info!(transport = self.transport.as_str(), "Push channel closed");
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// What the reconnect loop does after a connection ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Connection lost; apply the reconnect policy.
    Reconnect,
    /// The handle is gone or the server ended the session.
    Stop,
}

/// Result of one connection attempt.
struct Attempt {
    /// The transport reached the open state during this attempt.
    opened: bool,
    outcome: Result<Flow>,
}

/// One transport's connect-and-read cycle.
trait Connector {
    /// Connects once and forwards events until the connection ends.
    async fn connect_once(&mut self, tx: &mpsc::Sender<ChannelEvent>) -> Attempt;

    /// Delay requested by the server for the next attempt.
    fn retry_hint(&self) -> Option<Duration> {
        None
    }
}

/// Fixed-delay reconnect loop. The attempt counter resets whenever a
/// connection opens.
async fn reconnect_loop<C: Connector>(
    mut connector: C,
    policy: ReconnectPolicy,
    tx: mpsc::Sender<ChannelEvent>,
) {
    let mut attempt: u32 = 0;
    loop {
        let Attempt { opened, outcome } = connector.connect_once(&tx).await;
        if opened {
            attempt = 0;
        }
        match outcome {
            Ok(Flow::Stop) => return,
            Ok(Flow::Reconnect) => debug!("Push connection ended"),
            Err(e) => {
                warn!(error = %e, "Push connection failed");
                if !emit(&tx, ChannelEvent::Error(e.to_string())).await {
                    return;
                }
            }
        }

        attempt += 1;
        if !policy.allows(attempt) {
            warn!(attempt, "Reconnect attempts exhausted");
            emit(&tx, ChannelEvent::Closed).await;
            return;
        }
        let delay = connector.retry_hint().unwrap_or(policy.delay);
        debug!(attempt, ?delay, "Reconnecting push channel");
        sleep(delay).await;
    }
}

/// Sends `event`; `false` once the handle is gone.
async fn emit(tx: &mpsc::Sender<ChannelEvent>, event: ChannelEvent) -> bool {
    tx.send(event).await.is_ok()
}

/// `GET /api/events/stream`.
struct SseSession {
    http: Client,
    url: Url,
    last_event_id: Option<String>,
    retry: Option<Duration>,
}

impl Connector for SseSession {
    async fn connect_once(&mut self, tx: &mpsc::Sender<ChannelEvent>) -> Attempt {
        let mut opened = false;
        let outcome = self.stream(tx, &mut opened).await;
        Attempt { opened, outcome }
    }

    fn retry_hint(&self) -> Option<Duration> {
        self.retry
    }
}

impl SseSession {
    async fn stream(&mut self, tx: &mpsc::Sender<ChannelEvent>, opened: &mut bool) -> Result<Flow> {
        let mut request = self
            .http
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = &self.last_event_id {
            request = request.header("Last-Event-ID", id.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with("text/event-stream") {
            return Err(Error::InvalidContentType(content_type.to_string()));
        }

        *opened = true;
        info!(url = %self.url, "Event stream connected");
        if !emit(tx, ChannelEvent::Opened).await {
            return Ok(Flow::Stop);
        }

        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let events = decoder.feed(&chunk?)?;
            self.retry = decoder.retry().or(self.retry);
            if let Some(id) = decoder.last_event_id() {
                self.last_event_id = Some(id.to_string());
            }
            for event in events {
                if !forward_sse(tx, &event).await {
                    return Ok(Flow::Stop);
                }
            }
        }
        Ok(Flow::Reconnect)
    }
}

/// Decodes one stream message and forwards it. Malformed messages are
/// logged and skipped.
async fn forward_sse(tx: &mpsc::Sender<ChannelEvent>, event: &SseEvent) -> bool {
    match decode_sse_data(&event.data) {
        Ok(Some(push)) => {
            debug!(kind = push.kind().as_str(), "Event stream message");
            emit(tx, ChannelEvent::Event(push)).await
        }
        Ok(None) => true,
        Err(e) => {
            warn!(error = %e, "Skipping malformed event stream message");
            true
        }
    }
}

/// Socket.IO over WebSocket.
struct SocketSession {
    url: Url,
    connect_timeout: Duration,
}

impl Connector for SocketSession {
    async fn connect_once(&mut self, tx: &mpsc::Sender<ChannelEvent>) -> Attempt {
        let mut opened = false;
        let outcome = self.session(tx, &mut opened).await;
        Attempt { opened, outcome }
    }
}

impl SocketSession {
    async fn session(&self, tx: &mpsc::Sender<ChannelEvent>, opened: &mut bool) -> Result<Flow> {
        let (mut ws, _) = timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| Error::Timeout(self.connect_timeout))??;
        debug!(url = %self.url, "WebSocket connected");

        // Until the open packet says otherwise.
        let mut heartbeat = self.connect_timeout;
        loop {
            let frame = match timeout(heartbeat, ws.next()).await {
                Ok(Some(frame)) => frame?,
                Ok(None) => return Ok(Flow::Reconnect),
                Err(_) => return Err(Error::Timeout(heartbeat)),
            };
            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => return Ok(Flow::Reconnect),
                _ => continue,
            };

            match socketio::decode_engine(&text)? {
                EnginePacket::Open(info) => {
                    heartbeat = Duration::from_millis(info.ping_interval + info.ping_timeout);
                    debug!(sid = %info.sid, ?heartbeat, "Engine.IO session open");
                    ws.send(Message::Text(socketio::CONNECT.to_string())).await?;
                }
                EnginePacket::Ping => {
                    ws.send(Message::Text(socketio::PONG.to_string())).await?;
                }
                EnginePacket::Close => return Ok(Flow::Reconnect),
                EnginePacket::Message(body) => match socketio::decode_socket(&body)? {
                    SocketPacket::Connect(_) => {
                        *opened = true;
                        info!(url = %self.url, "Socket connected");
                        if !emit(tx, ChannelEvent::Opened).await {
                            return Ok(Flow::Stop);
                        }
                    }
                    SocketPacket::Event { name, payload } => {
                        if !forward_socket(tx, &name, payload).await {
                            return Ok(Flow::Stop);
                        }
                    }
                    SocketPacket::Disconnect => {
                        // Server-initiated: the session is over, not lost.
                        info!("Server closed the socket session");
                        let reason = Some("io server disconnect".to_string());
                        emit(tx, ChannelEvent::Event(PushEvent::Disconnect { reason })).await;
                        emit(tx, ChannelEvent::Closed).await;
                        return Ok(Flow::Stop);
                    }
                    SocketPacket::ConnectError(data) => {
                        return Err(Error::Protocol(format!("connect error: {data}")));
                    }
                    SocketPacket::Ack => {}
                },
                EnginePacket::Pong | EnginePacket::Upgrade => {}
            }
        }
    }
}

/// Decodes one named socket event and forwards it.
async fn forward_socket(tx: &mpsc::Sender<ChannelEvent>, name: &str, payload: serde_json::Value) -> bool {
    match decode_event(name, payload) {
        Ok(Some(push)) => {
            debug!(kind = push.kind().as_str(), "Socket event");
            emit(tx, ChannelEvent::Event(push)).await
        }
        Ok(None) => true,
        Err(e) => {
            warn!(event = name, error = %e, "Skipping malformed socket event");
            true
        }
    }
}
