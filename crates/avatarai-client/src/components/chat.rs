//! Chat with the assistant: the timeline, the streaming reducer and the
//! stream-facing send operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use avatarai_net::{ApiClient, ConnectionStatus, Dispatcher, StreamHandle};
use avatarai_shared::chat::{ChatMessage, MessageBody};
use avatarai_shared::constants::{DEFAULT_ROOM_ID, DEFAULT_THREAD_ID, HISTORY_LIMIT};
use avatarai_shared::protocol::{
    AgentEvent, ErrorEvent, EventType, InboundFrame, MessageReceivedEvent, OutboundFrame,
};
use avatarai_shared::types::blob_url;
use avatarai_shared::validate::MediaKind;
use avatarai_shared::Session;

use super::reducer::{Change, StreamReducer, StreamingMessage};
use crate::error::{ClientError, Result};
use crate::events::{EventSink, UiEvent};
use crate::media::{self, MediaFile};

const WELCOME_TEXT: &str = "Welcome to AvatarAI! I'm your assistant, how can I help?";
const UPLOADING_TEXT: &str = "[Uploading image...]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryBody {
    Text(String),
    Image { url: String, alt: String },
    /// Rendered from the streaming message with this id.
    Streaming(String),
}

/// One row of the chat timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub id: u64,
    pub role: ChatRole,
    pub body: EntryBody,
    /// Unix milliseconds, for history rows.
    pub timestamp: Option<i64>,
}

struct ChatView {
    entries: Vec<ChatEntry>,
    next_entry_id: u64,
    reducer: StreamReducer,
    /// Streaming message id → timeline entry id.
    streaming_entries: HashMap<String, u64>,
    status: ConnectionStatus,
}

impl ChatView {
    fn new() -> Self {
        let mut view = Self {
            entries: Vec::new(),
            next_entry_id: 1,
            reducer: StreamReducer::new(),
            streaming_entries: HashMap::new(),
            status: ConnectionStatus::Disconnected,
        };
        view.push(ChatRole::System, EntryBody::Text(WELCOME_TEXT.into()), None);
        view
    }

    fn make_entry(&mut self, role: ChatRole, body: EntryBody, timestamp: Option<i64>) -> ChatEntry {
        let entry = ChatEntry {
            id: self.next_entry_id,
            role,
            body,
            timestamp,
        };
        self.next_entry_id += 1;
        entry
    }

    fn push(&mut self, role: ChatRole, body: EntryBody, timestamp: Option<i64>) -> ChatEntry {
        let entry = self.make_entry(role, body, timestamp);
        self.entries.push(entry.clone());
        entry
    }

    fn remove(&mut self, entry_id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != entry_id);
        self.entries.len() != before
    }

    fn replace(&mut self, entry_id: u64, body: EntryBody) -> Option<ChatEntry> {
        let entry = self.entries.iter_mut().find(|e| e.id == entry_id)?;
        entry.body = body;
        Some(entry.clone())
    }
}

#[derive(Clone)]
pub struct ChatComponent {
    session: Session,
    api: ApiClient,
    stream: StreamHandle,
    events: EventSink,
    view: Arc<Mutex<ChatView>>,
}

impl ChatComponent {
    pub fn new(session: Session, api: ApiClient, stream: StreamHandle, events: EventSink) -> Self {
        Self {
            session,
            api,
            stream,
            events,
            view: Arc::new(Mutex::new(ChatView::new())),
        }
    }

    fn view(&self) -> MutexGuard<'_, ChatView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register this component for every frame type it renders.
    pub fn subscribe(&self, dispatcher: &mut Dispatcher) {
        let this = self.clone();
        dispatcher.subscribe(EventType::MessageReceived, move |frame| {
            this.on_message_received(frame)
        });

        let this = self.clone();
        dispatcher.subscribe(EventType::Error, move |frame| this.on_error_frame(frame));

        for event_type in EventType::ALL.into_iter().filter(EventType::is_agent_event) {
            let this = self.clone();
            dispatcher.subscribe(event_type, move |frame| this.on_agent_frame(frame));
        }
    }

    // -----------------------------------------------------------------------
    // Inbound frames
    // -----------------------------------------------------------------------

    fn on_message_received(&self, frame: &InboundFrame) {
        let event: MessageReceivedEvent = match frame.payload() {
            Ok(event) => event,
            Err(e) => {
                warn!(event_id = %frame.event_id, error = %e, "Malformed message_received frame");
                return;
            }
        };
        let body = match event.message.body() {
            MessageBody::Text(text) if !text.is_empty() => EntryBody::Text(text),
            MessageBody::Image {
                image_cid,
                image_url,
                alt,
            } => match image_url.or_else(|| image_cid.as_deref().map(blob_url)) {
                Some(url) => EntryBody::Image {
                    url,
                    alt: alt.unwrap_or_else(|| "Image".into()),
                },
                None => return,
            },
            other => {
                debug!(msg_type = event.message.msg_type, body = ?other, "Unhandled received message");
                return;
            }
        };
        let entry = self.view().push(ChatRole::Assistant, body, None);
        self.events.emit(UiEvent::ChatEntryAdded(entry));
    }

    fn on_error_frame(&self, frame: &InboundFrame) {
        let message = frame
            .payload::<ErrorEvent>()
            .ok()
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "An unknown error occurred".into());
        warn!(event_id = %frame.event_id, message = %message, "Error frame received");
        self.add_system(format!("Error: {message}"));
    }

    fn on_agent_frame(&self, frame: &InboundFrame) {
        match AgentEvent::from_frame(frame) {
            Ok(Some(event)) => self.apply_agent_event(&event),
            Ok(None) => {}
            Err(e) => warn!(event_id = %frame.event_id, error = %e, "Malformed agent frame dropped"),
        }
    }

    /// Fold one agent event into the timeline.
    pub fn apply_agent_event(&self, event: &AgentEvent) {
        let mut view = self.view();
        let was_visible = view.reducer.interrupt_visible();
        let change = view.reducer.apply(event);
        let id = event.message_id().to_string();

        if change == Change::Created {
            let entry = view.push(ChatRole::Assistant, EntryBody::Streaming(id.clone()), None);
            view.streaming_entries.insert(id.clone(), entry.id);
            self.events.emit(UiEvent::ChatEntryAdded(entry));
        }
        if change != Change::Unchanged {
            if let Some(message) = view.reducer.get(&id) {
                self.events.emit(UiEvent::StreamingUpdated(message.clone()));
            }
        }

        let visible = view.reducer.interrupt_visible();
        if visible != was_visible {
            self.events.emit(UiEvent::InterruptVisible(visible));
        }
    }

    /// Track the stream status and enable input only while connected.
    pub fn on_connection(&self, status: ConnectionStatus) {
        self.view().status = status;
        self.events.emit(UiEvent::Connection {
            status,
            input_enabled: status.input_enabled(),
        });
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Show and send a text message. Returns whether the frame went out.
    pub async fn send_text(&self, text: &str) -> Result<bool> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }
        let did = self.session.did().ok_or(ClientError::NotSignedIn)?;

        let entry = self.view().push(ChatRole::User, EntryBody::Text(text.to_string()), None);
        self.events.emit(UiEvent::ChatEntryAdded(entry));

        let frame = OutboundFrame::text_message(&did, text, now_ms());
        let sent = self.stream.send(&frame).await;
        if !sent {
            self.events.error("Chat is not connected, message not sent");
        }
        Ok(sent)
    }

    /// Validate, upload and send an image. The placeholder row is replaced by
    /// the image on success and removed on failure.
    pub async fn send_image(&self, file: MediaFile) -> Result<bool> {
        let did = self.session.did().ok_or(ClientError::NotSignedIn)?;
        if let Err(e) = avatarai_shared::validate::validate_media(
            MediaKind::Image,
            &file.content_type,
            file.size(),
        ) {
            self.events.error(e.to_string());
            return Err(e.into());
        }

        let placeholder = self
            .view()
            .push(ChatRole::User, EntryBody::Text(UPLOADING_TEXT.into()), None);
        self.events.emit(UiEvent::ChatEntryAdded(placeholder.clone()));

        let staged = match media::upload(&self.api, MediaKind::Image, file).await {
            Ok(staged) => staged,
            Err(e) => {
                self.remove_entry(placeholder.id);
                self.events.error(format!("Image upload failed: {e}"));
                return Err(e);
            }
        };

        let frame = OutboundFrame::image_message(&did, &staged.cid, &staged.alt, now_ms());
        if !self.stream.send(&frame).await {
            self.remove_entry(placeholder.id);
            self.events.error("Chat is not connected, image not sent");
            return Ok(false);
        }

        let updated = self.view().replace(
            placeholder.id,
            EntryBody::Image {
                url: staged.url,
                alt: staged.alt,
            },
        );
        if let Some(entry) = updated {
            self.events.emit(UiEvent::ChatEntryAdded(entry));
        }
        Ok(true)
    }

    /// Ask the server to stop the open response. `false` when nothing is
    /// open or the frame could not be sent. The response stays open until
    /// the server finalizes it.
    pub async fn interrupt(&self) -> bool {
        let Some(message_id) = self.view().reducer.current_id().map(str::to_string) else {
            debug!("No open response to interrupt");
            return false;
        };

        let sent = self.stream.send(&OutboundFrame::interrupt(&message_id)).await;
        if sent {
            info!(message_id = %message_id, "Interrupt sent");
            let was_visible = {
                let mut view = self.view();
                let visible = view.reducer.interrupt_visible();
                view.reducer.hide_interrupt();
                visible
            };
            if was_visible {
                self.events.emit(UiEvent::InterruptVisible(false));
            }
        }
        sent
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Replace the timeline with the stored conversation, oldest first.
    pub async fn load_history(&self) -> Result<usize> {
        if !self.session.is_active() {
            debug!("Not signed in, history not loaded");
            return Ok(0);
        }
        let own_did = self.session.did().unwrap_or_default();

        let page = match self
            .api
            .get_chat_history(DEFAULT_ROOM_ID, DEFAULT_THREAD_ID, HISTORY_LIMIT)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.add_system(format!("Failed to load history: {e}"));
                return Err(e.into());
            }
        };

        let mut messages = page.messages;
        messages.sort_by_key(ChatMessage::timestamp);
        let count = messages.len();

        let entries = {
            let mut view = self.view();
            view.entries.retain(|e| e.id == 1);
            view.streaming_entries.clear();
            view.reducer.clear();
            for message in &messages {
                if let Some((role, body)) = history_row(message, &own_did) {
                    let ts = Some(message.timestamp()).filter(|ts| *ts > 0);
                    view.push(role, body, ts);
                }
            }
            view.entries.clone()
        };
        self.events.emit(UiEvent::ChatHistoryLoaded(entries));

        if count == 0 {
            self.add_system("No messages yet".to_string());
        }
        info!(count, "Chat history loaded");
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn entries(&self) -> Vec<ChatEntry> {
        self.view().entries.clone()
    }

    pub fn streaming(&self, message_id: &str) -> Option<StreamingMessage> {
        self.view().reducer.get(message_id).cloned()
    }

    pub fn current_message_id(&self) -> Option<String> {
        self.view().reducer.current_id().map(str::to_string)
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.view().status
    }

    fn add_system(&self, text: String) {
        let entry = self.view().push(ChatRole::System, EntryBody::Text(text), None);
        self.events.emit(UiEvent::ChatEntryAdded(entry));
    }

    fn remove_entry(&self, entry_id: u64) {
        if self.view().remove(entry_id) {
            self.events.emit(UiEvent::ChatEntryRemoved(entry_id));
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Timeline row for one history message. `None` for rows without content.
fn history_row(message: &ChatMessage, own_did: &str) -> Option<(ChatRole, EntryBody)> {
    if message.content.is_null() {
        return None;
    }
    let sender = if !own_did.is_empty() && message.sender_id == own_did {
        ChatRole::User
    } else {
        ChatRole::Assistant
    };
    let text = |s: String| Some(EntryBody::Text(s));

    let (role, body) = match message.body() {
        MessageBody::Text(t) => (sender, text(t)?),
        MessageBody::Image {
            image_cid,
            image_url,
            alt,
        } => match image_url.or_else(|| image_cid.as_deref().map(blob_url)) {
            Some(url) => (
                sender,
                EntryBody::Image {
                    url,
                    alt: alt.unwrap_or_else(|| "Image".into()),
                },
            ),
            None => (sender, text(format!("[Image] {}", alt.unwrap_or_default()))?),
        },
        MessageBody::Agent(agent) => match agent.status.as_str() {
            "incomplete" => {
                let notice = match agent.error_message() {
                    Some(msg) => format!("Error: {msg}"),
                    None if agent.was_interrupted() => "Response interrupted".into(),
                    None => "Response incomplete".into(),
                };
                (ChatRole::System, text(notice)?)
            }
            "failed" => {
                let msg = agent.error_message().unwrap_or("Processing failed");
                (ChatRole::System, text(format!("Processing failed: {msg}"))?)
            }
            _ => {
                let output = agent.output_text();
                let output = if output.trim().is_empty() {
                    "[Empty assistant message]".to_string()
                } else {
                    output
                };
                (ChatRole::Assistant, text(output)?)
            }
        },
        MessageBody::Unsupported(code) => (
            ChatRole::System,
            text(format!("[Unsupported message type: {code}]"))?,
        ),
    };

    match &body {
        EntryBody::Text(t) if t.is_empty() => None,
        _ => Some((role, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::test_support::{drain, toasts};
    use crate::events::ToastLevel;
    use crate::test_support::{api_for, fake_stream, signed_in_session, SentFrames};
    use tokio::sync::mpsc::UnboundedReceiver;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn frame(event_type: &str, event: serde_json::Value) -> InboundFrame {
        InboundFrame {
            event_id: "e".into(),
            event_type: event_type.into(),
            event,
        }
    }

    async fn component(
        server: &MockServer,
        connected: bool,
    ) -> (ChatComponent, SentFrames, UnboundedReceiver<UiEvent>) {
        let (events, rx) = EventSink::channel();
        let (stream, sent) = fake_stream(connected);
        let chat = ChatComponent::new(
            signed_in_session(),
            api_for(server, Some("tok")),
            stream,
            events,
        );
        (chat, sent, rx)
    }

    #[tokio::test]
    async fn interrupt_without_open_message_sends_nothing() {
        let server = MockServer::start().await;
        let (chat, sent, _rx) = component(&server, true).await;
        assert!(!chat.interrupt().await);
        assert!(sent.frames().is_empty());
    }

    #[tokio::test]
    async fn interrupt_targets_the_open_message() {
        let server = MockServer::start().await;
        let (chat, sent, mut rx) = component(&server, true).await;
        let mut dispatcher = Dispatcher::new();
        chat.subscribe(&mut dispatcher);

        dispatcher.dispatch(&frame(
            "agent_message.created",
            json!({"agentMessage": {"id": "am-1", "status": "pending"}}),
        ));
        assert_eq!(chat.current_message_id().as_deref(), Some("am-1"));
        assert!(drain(&mut rx).contains(&UiEvent::InterruptVisible(true)));

        assert!(chat.interrupt().await);
        let frames = sent.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["eventType"], "agent_message.interrupt");
        assert_eq!(frames[0]["event"]["agentMessageId"], "am-1");
        assert_eq!(chat.current_message_id().as_deref(), Some("am-1"));
        assert!(drain(&mut rx).contains(&UiEvent::InterruptVisible(false)));

        // Still open until the server finalizes it, so a repeat goes out.
        assert!(chat.interrupt().await);
        let frames = sent.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1]["event"]["agentMessageId"], "am-1");

        dispatcher.dispatch(&frame(
            "agent_message.incomplete",
            json!({"agentMessage": {"id": "am-1", "status": "incomplete", "interruptType": 1}}),
        ));
        assert_eq!(chat.current_message_id(), None);
        assert!(!chat.interrupt().await);
        assert_eq!(sent.frames().len(), 2);
    }

    #[tokio::test]
    async fn streamed_response_renders_through_the_map() {
        let server = MockServer::start().await;
        let (chat, _sent, mut rx) = component(&server, true).await;
        let mut dispatcher = Dispatcher::new();
        chat.subscribe(&mut dispatcher);

        let frames = [
            frame("agent_message.created", json!({"agentMessage": {"id": "m1"}})),
            frame("agent_message.output_text.delta", json!({"itemId": "m1", "contentIndex": 0, "delta": "Hel"})),
            frame("agent_message.output_text.delta", json!({"itemId": "m1", "contentIndex": 0, "delta": "lo"})),
            frame("agent_message.output_text.done", json!({"itemId": "m1", "contentIndex": 0, "text": "Hello!"})),
            frame("agent_message.completed", json!({"agentMessage": {"id": "m1", "status": "completed"}})),
            frame("agent_message.output_text.delta", json!({"itemId": "m1", "contentIndex": 0, "delta": " late"})),
        ];
        for f in &frames {
            dispatcher.dispatch(f);
        }

        let message = chat.streaming("m1").unwrap();
        assert_eq!(message.text(), "Hello!");
        assert!(message.status.is_final());

        let streaming_rows: Vec<_> = chat
            .entries()
            .into_iter()
            .filter(|e| e.body == EntryBody::Streaming("m1".into()))
            .collect();
        assert_eq!(streaming_rows.len(), 1);

        let events = drain(&mut rx);
        assert!(events.contains(&UiEvent::InterruptVisible(false)));
    }

    #[tokio::test]
    async fn malformed_agent_frame_is_dropped() {
        let server = MockServer::start().await;
        let (chat, _sent, _rx) = component(&server, true).await;
        let mut dispatcher = Dispatcher::new();
        chat.subscribe(&mut dispatcher);

        dispatcher.dispatch(&frame("agent_message.output_text.delta", json!({"delta": 5})));
        assert_eq!(chat.entries().len(), 1);
    }

    #[tokio::test]
    async fn error_frame_becomes_system_row() {
        let server = MockServer::start().await;
        let (chat, _sent, _rx) = component(&server, true).await;
        let mut dispatcher = Dispatcher::new();
        chat.subscribe(&mut dispatcher);

        dispatcher.dispatch(&frame("error", json!({"message": "rate limited"})));
        let last = chat.entries().pop().unwrap();
        assert_eq!(last.role, ChatRole::System);
        assert_eq!(last.body, EntryBody::Text("Error: rate limited".into()));
    }

    #[tokio::test]
    async fn send_text_without_connection_reports_failure() {
        let server = MockServer::start().await;
        let (chat, sent, mut rx) = component(&server, false).await;
        assert!(!chat.send_text("hello").await.unwrap());
        assert!(sent.frames().is_empty());
        let toasts = toasts(&drain(&mut rx));
        assert_eq!(toasts[0].0, ToastLevel::Error);
    }

    #[tokio::test]
    async fn send_text_builds_message_frame() {
        let server = MockServer::start().await;
        let (chat, sent, _rx) = component(&server, true).await;
        assert!(chat.send_text("  hi there  ").await.unwrap());
        assert!(!chat.send_text("   ").await.unwrap());

        let frames = sent.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["eventType"], "message.send");
        assert_eq!(frames[0]["event"]["msgType"], 1);
        assert_eq!(frames[0]["event"]["body"]["text"], "hi there");
        assert_eq!(frames[0]["event"]["senderId"], "did:plc:me");
    }

    #[tokio::test]
    async fn oversized_chat_image_is_not_uploaded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/blobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cid": "c"})))
            .expect(0)
            .mount(&server)
            .await;
        let (chat, sent, _rx) = component(&server, true).await;

        let file = MediaFile::new("big.jpg", "image/jpeg", vec![0; 15 * 1024 * 1024]);
        assert!(chat.send_image(file).await.is_err());
        assert!(sent.frames().is_empty());
        assert_eq!(chat.entries().len(), 1);
    }

    #[tokio::test]
    async fn image_is_uploaded_then_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/blobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cid": "bafyimg"})))
            .expect(1)
            .mount(&server)
            .await;
        let (chat, sent, _rx) = component(&server, true).await;

        let file = MediaFile::new("cat.png", "image/png", vec![1, 2, 3]);
        assert!(chat.send_image(file).await.unwrap());

        let frames = sent.frames();
        assert_eq!(frames[0]["event"]["msgType"], 3);
        assert_eq!(frames[0]["event"]["body"]["imageCid"], "bafyimg");
        assert_eq!(frames[0]["event"]["body"]["alt"], "cat.png");

        let last = chat.entries().pop().unwrap();
        assert_eq!(
            last.body,
            EntryBody::Image {
                url: "/api/blobs?id=bafyimg".into(),
                alt: "cat.png".into()
            }
        );
    }

    #[tokio::test]
    async fn history_is_sorted_oldest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages/history"))
            .and(query_param("roomId", "default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [
                    {"id": "c", "msgType": 1, "content": {"text": "third"}, "senderId": "did:plc:me", "senderAt": 300},
                    {"id": "a", "msgType": 1, "content": {"text": "first"}, "senderId": "did:plc:me", "senderAt": 100},
                    {"id": "b", "msgType": 1, "content": {"text": "second"}, "senderId": "did:plc:bot", "senderAt": 200}
                ]
            })))
            .mount(&server)
            .await;
        let (chat, _sent, _rx) = component(&server, true).await;

        assert_eq!(chat.load_history().await.unwrap(), 3);

        let rows: Vec<_> = chat.entries().into_iter().skip(1).collect();
        let timestamps: Vec<_> = rows.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![Some(100), Some(200), Some(300)]);
        assert_eq!(rows[0].role, ChatRole::User);
        assert_eq!(rows[1].role, ChatRole::Assistant);
    }

    #[test]
    fn history_rows_for_agent_records() {
        let agent = |record: serde_json::Value| ChatMessage {
            id: "x".into(),
            msg_type: 9,
            content: json!({ "message": record }),
            sender_id: "did:plc:bot".into(),
            sender_at: Some(1),
            created_at: None,
        };

        let (role, body) = history_row(&agent(json!({"status": "failed", "error": {"message": "boom"}})), "did:plc:me").unwrap();
        assert_eq!(role, ChatRole::System);
        assert_eq!(body, EntryBody::Text("Processing failed: boom".into()));

        let (_, body) = history_row(&agent(json!({"status": "incomplete", "interruptType": 2})), "did:plc:me").unwrap();
        assert_eq!(body, EntryBody::Text("Response interrupted".into()));

        let (role, body) = history_row(&agent(json!({"status": "completed", "altText": "summary"})), "did:plc:me").unwrap();
        assert_eq!(role, ChatRole::Assistant);
        assert_eq!(body, EntryBody::Text("summary".into()));

        let (_, body) = history_row(&agent(json!({"status": "completed"})), "did:plc:me").unwrap();
        assert_eq!(body, EntryBody::Text("[Empty assistant message]".into()));

        let unsupported = ChatMessage {
            msg_type: 7,
            content: json!({}),
            ..agent(json!({}))
        };
        let (role, _) = history_row(&unsupported, "did:plc:me").unwrap();
        assert_eq!(role, ChatRole::System);
    }

    #[tokio::test]
    async fn connection_status_drives_input() {
        let server = MockServer::start().await;
        let (chat, _sent, mut rx) = component(&server, true).await;
        chat.on_connection(ConnectionStatus::Connected);
        chat.on_connection(ConnectionStatus::Disconnected);
        assert_eq!(
            drain(&mut rx),
            vec![
                UiEvent::Connection {
                    status: ConnectionStatus::Connected,
                    input_enabled: true
                },
                UiEvent::Connection {
                    status: ConnectionStatus::Disconnected,
                    input_enabled: false
                },
            ]
        );
    }
}
