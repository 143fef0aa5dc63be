//! Events emitted to whatever front end drives the client.
//!
//! Components never render anything themselves. They update their own
//! view-model and push a [`UiEvent`] through the [`EventSink`]; the console
//! binary prints them, a GUI would repaint.

use tokio::sync::mpsc;

use avatarai_net::ConnectionStatus;
use avatarai_shared::mcp::McpServer;
use avatarai_shared::User;

use crate::components::chat::ChatEntry;
use crate::components::feed::FeedCard;
use crate::components::post::CounterLevel;
use crate::components::reducer::StreamingMessage;
use crate::components::thread::ThreadRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Which top-level auth view is showing.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthView {
    Welcome,
    LoginForm,
    /// Sign-in continues in a browser at this URL.
    Redirect(String),
    UserPanel(User),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Toast { level: ToastLevel, message: String },
    Auth(AuthView),
    Connection {
        status: ConnectionStatus,
        input_enabled: bool,
    },
    InterruptVisible(bool),
    /// An entry was appended, or replaced when its id is already shown.
    ChatEntryAdded(ChatEntry),
    ChatEntryRemoved(u64),
    ChatHistoryLoaded(Vec<ChatEntry>),
    /// A streaming assistant message changed.
    StreamingUpdated(StreamingMessage),
    FeedUpdated { cards: Vec<FeedCard>, has_more: bool },
    ReplyFormToggled { moment_id: String, open: bool },
    ThreadLoaded { root: Option<FeedCard>, rows: Vec<ThreadRow> },
    CharCounter { count: usize, level: CounterLevel },
    ProfileUpdated(User),
    McpServers(Vec<McpServer>),
    McpServerDetail(McpServer),
    /// OAuth for an MCP server continues in a browser at this URL.
    McpAuthorizeRedirect(String),
}

/// Sender half of the UI event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: UiEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::error!(event = ?e.0, "Failed to emit event");
        }
    }

    pub fn toast(&self, level: ToastLevel, message: impl Into<String>) {
        self.emit(UiEvent::Toast {
            level,
            message: message.into(),
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.toast(ToastLevel::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.toast(ToastLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.toast(ToastLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.toast(ToastLevel::Error, message);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Drain everything emitted so far.
    pub fn drain(rx: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn toasts(events: &[UiEvent]) -> Vec<(ToastLevel, String)> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Toast { level, message } => Some((*level, message.clone())),
                _ => None,
            })
            .collect()
    }
}
