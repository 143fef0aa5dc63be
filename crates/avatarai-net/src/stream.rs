//! Streaming chat transport with a tokio mpsc command/notification pattern.
//!
//! One background task owns the WebSocket. The rest of the program talks to
//! it through a cloneable [`StreamHandle`] and receives status changes and
//! inbound frames on an unbounded notification channel. Delivering a
//! notification never blocks the task. The socket is only ever touched by
//! the task.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout, Sleep};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use avatarai_shared::constants::{CLOSE_ABNORMAL, DEFAULT_BASE_URL, STREAM_PATH};
use avatarai_shared::protocol::{InboundFrame, OutboundFrame};

use crate::credentials::Credentials;
use crate::error::{NetError, Result};
use crate::reconnect::ReconnectPolicy;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code reported when the peer closed without a status code.
const CLOSE_NO_STATUS: u16 = 1005;

// ---------------------------------------------------------------------------
// Command / notification types
// ---------------------------------------------------------------------------

/// Visible connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }

    /// Message input is only usable on an open socket.
    pub fn input_enabled(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

/// Commands sent *into* the stream task.
#[derive(Debug)]
pub enum StreamCommand {
    /// Open the socket if a session is active and none is open.
    Connect,
    /// Close with a normal-closure code and cancel any pending reconnect.
    Disconnect,
    /// Transmit a serialized frame. Replies `false` when the socket is not open.
    Send {
        payload: String,
        reply: oneshot::Sender<bool>,
    },
    /// Close the socket and stop the task.
    Shutdown,
}

/// Notifications sent *from* the stream task to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamNotification {
    Status(ConnectionStatus),
    /// A well-formed inbound frame.
    Frame(InboundFrame),
    /// The socket closed with this code.
    Closed { code: u16 },
    /// One reconnect attempt is armed.
    ReconnectScheduled { delay: Duration },
}

/// Configuration for spawning the stream task.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Full `ws://` or `wss://` URL of the chat stream.
    pub url: String,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout: Duration,
}

impl StreamConfig {
    /// Stream URL derived from an HTTP base URL (`http` → `ws`, `https` → `wss`).
    pub fn from_base_url(base_url: &str) -> Self {
        Self {
            url: stream_url(base_url),
            ..Default::default()
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: stream_url(DEFAULT_BASE_URL),
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

pub fn stream_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws_base}{STREAM_PATH}")
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable sender side of the stream task.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    cmd_tx: mpsc::Sender<StreamCommand>,
}

impl StreamHandle {
    /// Wrap a raw command sender. Useful for driving components against a
    /// stand-in task.
    pub fn from_sender(cmd_tx: mpsc::Sender<StreamCommand>) -> Self {
        Self { cmd_tx }
    }

    pub async fn connect(&self) {
        self.command(StreamCommand::Connect).await;
    }

    pub async fn disconnect(&self) {
        self.command(StreamCommand::Disconnect).await;
    }

    pub async fn shutdown(&self) {
        self.command(StreamCommand::Shutdown).await;
    }

    /// Serialize and transmit `frame`. Never fails loudly: any problem,
    /// including a closed socket, yields `false`.
    pub async fn send(&self, frame: &OutboundFrame) -> bool {
        let payload = match frame.to_json() {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "Failed to serialize outbound frame");
                return false;
            }
        };

        let (reply, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(StreamCommand::Send { payload, reply })
            .await
            .is_err()
        {
            warn!("Stream task stopped, frame not sent");
            return false;
        }
        rx.await.unwrap_or(false)
    }

    async fn command(&self, cmd: StreamCommand) {
        if self.cmd_tx.send(cmd).await.is_err() {
            warn!("Stream task stopped, command dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Spawn the stream task.
///
/// Returns the command handle and the notification receiver. The task starts
/// disconnected; call [`StreamHandle::connect`] once a session exists.
pub fn spawn_stream(
    config: StreamConfig,
    credentials: Arc<dyn Credentials>,
) -> (StreamHandle, mpsc::UnboundedReceiver<StreamNotification>) {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<StreamCommand>(256);
    let (notif_tx, notif_rx) = mpsc::unbounded_channel::<StreamNotification>();

    let mut task = StreamTask {
        config,
        credentials,
        notif_tx,
        writer: None,
        reader: None,
        reconnect_timer: None,
    };

    tokio::spawn(async move {
        loop {
            tokio::select! {
                // --- Incoming commands ---
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(StreamCommand::Connect) => task.connect().await,
                        Some(StreamCommand::Disconnect) => task.disconnect().await,
                        Some(StreamCommand::Send { payload, reply }) => {
                            let sent = task.send(payload).await;
                            let _ = reply.send(sent);
                        }
                        Some(StreamCommand::Shutdown) => {
                            info!("Stream shutdown requested");
                            task.disconnect().await;
                            break;
                        }
                        None => {
                            info!("Command channel closed, shutting down stream");
                            task.disconnect().await;
                            break;
                        }
                    }
                }

                // --- Socket events ---
                msg = next_message(&mut task.reader) => {
                    task.on_message(msg).await;
                }

                // --- Scheduled reconnect ---
                _ = wait_timer(&mut task.reconnect_timer) => {
                    task.reconnect_timer = None;
                    if task.credentials.is_active() {
                        info!("Reconnecting stream");
                        task.connect().await;
                    } else {
                        debug!("Session ended before reconnect, staying closed");
                    }
                }
            }
        }
    });

    (StreamHandle::from_sender(cmd_tx), notif_rx)
}

struct StreamTask {
    config: StreamConfig,
    credentials: Arc<dyn Credentials>,
    notif_tx: mpsc::UnboundedSender<StreamNotification>,
    writer: Option<SplitSink<WsStream, Message>>,
    reader: Option<SplitStream<WsStream>>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
}

impl StreamTask {
    fn notify(&self, notification: StreamNotification) {
        if self.notif_tx.send(notification).is_err() {
            debug!("Notification receiver dropped");
        }
    }

    async fn connect(&mut self) {
        if self.writer.is_some() {
            debug!("Stream already open");
            return;
        }
        let token = match self.credentials.access_token() {
            Some(token) if self.credentials.is_active() => token,
            _ => {
                debug!("No active session, not connecting");
                return;
            }
        };

        self.reconnect_timer = None;
        self.notify(StreamNotification::Status(ConnectionStatus::Connecting));

        match self.open_socket(&token).await {
            Ok(ws) => {
                let (writer, reader) = ws.split();
                self.writer = Some(writer);
                self.reader = Some(reader);
                info!(url = %self.config.url, "Stream connected");
                self.notify(StreamNotification::Status(ConnectionStatus::Connected));
            }
            Err(e) => {
                warn!(url = %self.config.url, error = %e, "Stream connection failed");
                self.on_closed(CLOSE_ABNORMAL).await;
            }
        }
    }

    async fn open_socket(&self, token: &str) -> Result<WsStream> {
        let mut request = self.config.url.as_str().into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| NetError::NotAuthenticated)?;
        request.headers_mut().insert("Authorization", bearer);

        let (ws, _response) = timeout(self.config.connect_timeout, connect_async(request))
            .await
            .map_err(|_| NetError::Timeout(self.config.connect_timeout))??;
        Ok(ws)
    }

    async fn disconnect(&mut self) {
        self.reconnect_timer = None;
        self.reader = None;
        if let Some(mut writer) = self.writer.take() {
            let close = Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "User logout".into(),
            }));
            if let Err(e) = writer.send(close).await {
                debug!(error = %e, "Close frame not delivered");
            }
            info!("Stream disconnected");
        }
        self.notify(StreamNotification::Status(ConnectionStatus::Disconnected));
    }

    async fn send(&mut self, payload: String) -> bool {
        let Some(writer) = self.writer.as_mut() else {
            warn!("Stream not open, frame not sent");
            return false;
        };
        match writer.send(Message::Text(payload)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to send frame");
                false
            }
        }
    }

    async fn on_message(
        &mut self,
        msg: Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>,
    ) {
        match msg {
            Some(Ok(Message::Text(text))) => self.on_text(&text),
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                Ok(text) => self.on_text(&text),
                Err(_) => warn!("Dropping non-UTF-8 binary frame"),
            },
            Some(Ok(Message::Close(frame))) => {
                let code = frame.map_or(CLOSE_NO_STATUS, |f| u16::from(f.code));
                self.on_closed(code).await;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "Stream read error");
                self.on_closed(CLOSE_ABNORMAL).await;
            }
            None => self.on_closed(CLOSE_ABNORMAL).await,
        }
    }

    fn on_text(&self, text: &str) {
        match InboundFrame::parse(text) {
            Ok(frame) => {
                debug!(event_type = %frame.event_type, event_id = %frame.event_id, "Frame received");
                self.notify(StreamNotification::Frame(frame));
            }
            Err(e) => warn!(error = %e, "Dropping malformed frame"),
        }
    }

    async fn on_closed(&mut self, code: u16) {
        self.writer = None;
        self.reader = None;
        info!(code, "Stream closed");
        self.notify(StreamNotification::Closed { code });
        self.notify(StreamNotification::Status(ConnectionStatus::Disconnected));

        let active = self.credentials.is_active();
        if let Some(delay) = self.config.reconnect.on_close(code, active) {
            info!(code, delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
            self.reconnect_timer = Some(Box::pin(sleep(delay)));
            self.notify(StreamNotification::ReconnectScheduled { delay });
        }
    }
}

async fn next_message(
    reader: &mut Option<SplitStream<WsStream>>,
) -> Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> {
    match reader {
        Some(reader) => reader.next().await,
        None => pending().await,
    }
}

async fn wait_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}
