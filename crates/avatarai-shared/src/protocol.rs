//! WebSocket wire protocol: frame envelope, event-type tags and payloads.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::chat::{AgentMessage, ChatMessage, ContentPart, MessageType};
use crate::constants::{ASSISTANT_RECEIVER_ID, DEFAULT_ROOM_ID, DEFAULT_THREAD_ID};
use crate::error::ProtocolError;

/// Closed set of event-type tags carried in `eventType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    MessageSend,
    MessageReceived,
    AgentMessageCreated,
    AgentMessageInProgress,
    AgentMessageCompleted,
    AgentMessageFailed,
    AgentMessageIncomplete,
    OutputItemAdded,
    OutputItemDone,
    ContentPartAdded,
    ContentPartDone,
    OutputTextDelta,
    OutputTextDone,
    AgentMessageInterrupt,
    Error,
}

impl EventType {
    pub const ALL: [EventType; 15] = [
        EventType::MessageSend,
        EventType::MessageReceived,
        EventType::AgentMessageCreated,
        EventType::AgentMessageInProgress,
        EventType::AgentMessageCompleted,
        EventType::AgentMessageFailed,
        EventType::AgentMessageIncomplete,
        EventType::OutputItemAdded,
        EventType::OutputItemDone,
        EventType::ContentPartAdded,
        EventType::ContentPartDone,
        EventType::OutputTextDelta,
        EventType::OutputTextDone,
        EventType::AgentMessageInterrupt,
        EventType::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::MessageSend => "message.send",
            EventType::MessageReceived => "message_received",
            EventType::AgentMessageCreated => "agent_message.created",
            EventType::AgentMessageInProgress => "agent_message.in_progress",
            EventType::AgentMessageCompleted => "agent_message.completed",
            EventType::AgentMessageFailed => "agent_message.failed",
            EventType::AgentMessageIncomplete => "agent_message.incomplete",
            EventType::OutputItemAdded => "agent_message.output_item.added",
            EventType::OutputItemDone => "agent_message.output_item.done",
            EventType::ContentPartAdded => "agent_message.content_part.added",
            EventType::ContentPartDone => "agent_message.content_part.done",
            EventType::OutputTextDelta => "agent_message.output_text.delta",
            EventType::OutputTextDone => "agent_message.output_text.done",
            EventType::AgentMessageInterrupt => "agent_message.interrupt",
            EventType::Error => "error",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == tag)
    }

    /// True for the streaming agent-message family handled by the reducer.
    pub fn is_agent_event(&self) -> bool {
        self.as_str().starts_with("agent_message.") && *self != EventType::AgentMessageInterrupt
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        EventType::from_tag(&tag)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown event type '{tag}'")))
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// A frame received from the server. The tag is kept raw so frames with
/// unknown tags can still be logged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundFrame {
    #[serde(default)]
    pub event_id: String,
    pub event_type: String,
    #[serde(default)]
    pub event: Value,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn kind(&self) -> Option<EventType> {
        EventType::from_tag(&self.event_type)
    }

    /// Decode the payload into a typed event body.
    pub fn payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, ProtocolError> {
        Ok(T::deserialize(&self.event)?)
    }
}

/// A frame sent by the client.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundFrame {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub event: Value,
}

impl OutboundFrame {
    pub fn new(event_type: EventType, event: Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            event,
        }
    }

    /// `message.send` carrying a text body.
    pub fn text_message(sender_did: &str, text: &str, sender_at_ms: i64) -> Self {
        Self::chat_message(
            sender_did,
            MessageType::Text,
            json!({ "text": text }),
            sender_at_ms,
        )
    }

    /// `message.send` carrying an uploaded image.
    pub fn image_message(sender_did: &str, image_cid: &str, alt: &str, sender_at_ms: i64) -> Self {
        Self::chat_message(
            sender_did,
            MessageType::Image,
            json!({ "imageCid": image_cid, "width": 0, "height": 0, "alt": alt }),
            sender_at_ms,
        )
    }

    /// `agent_message.interrupt` for an open assistant response.
    pub fn interrupt(agent_message_id: &str) -> Self {
        Self::new(
            EventType::AgentMessageInterrupt,
            json!({ "agentMessageId": agent_message_id }),
        )
    }

    fn chat_message(sender_did: &str, msg_type: MessageType, body: Value, sender_at_ms: i64) -> Self {
        Self::new(
            EventType::MessageSend,
            json!({
                "roomId": DEFAULT_ROOM_ID,
                "msgType": msg_type.code(),
                "body": body,
                "receiverId": ASSISTANT_RECEIVER_ID,
                "senderId": sender_did,
                "threadId": DEFAULT_THREAD_ID,
                "senderAt": sender_at_ms,
            }),
        )
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// Payload of the created/in_progress/completed/failed/incomplete events.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessageEvent {
    #[serde(alias = "response")]
    pub agent_message: AgentMessage,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputItemEvent {
    #[serde(default)]
    pub output_index: u32,
    pub item: OutputItem,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputItem {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentPartEvent {
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
    #[serde(default)]
    pub content_index: usize,
    #[serde(default)]
    pub part: Option<ContentPart>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextDeltaEvent {
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
    #[serde(default)]
    pub content_index: usize,
    #[serde(default)]
    pub delta: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextDoneEvent {
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
    #[serde(default)]
    pub content_index: usize,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MessageReceivedEvent {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ErrorEvent {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub param: Option<String>,
}

/// Typed agent-message stream event, as consumed by the streaming reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Created(AgentMessage),
    InProgress(AgentMessage),
    OutputItemAdded(OutputItemEvent),
    ContentPartAdded(ContentPartEvent),
    TextDelta(TextDeltaEvent),
    TextDone(TextDoneEvent),
    ContentPartDone(ContentPartEvent),
    OutputItemDone(OutputItemEvent),
    Completed(AgentMessage),
    Failed(AgentMessage),
    Incomplete(AgentMessage),
}

impl AgentEvent {
    /// Decode an agent-message family frame. Returns `Ok(None)` for other tags.
    pub fn from_frame(frame: &InboundFrame) -> Result<Option<Self>, ProtocolError> {
        let Some(kind) = frame.kind() else {
            return Err(ProtocolError::UnknownEventType(frame.event_type.clone()));
        };
        let envelope = |frame: &InboundFrame| -> Result<AgentMessage, ProtocolError> {
            Ok(frame.payload::<AgentMessageEvent>()?.agent_message)
        };
        let event = match kind {
            EventType::AgentMessageCreated => AgentEvent::Created(envelope(frame)?),
            EventType::AgentMessageInProgress => AgentEvent::InProgress(envelope(frame)?),
            EventType::AgentMessageCompleted => AgentEvent::Completed(envelope(frame)?),
            EventType::AgentMessageFailed => AgentEvent::Failed(envelope(frame)?),
            EventType::AgentMessageIncomplete => AgentEvent::Incomplete(envelope(frame)?),
            EventType::OutputItemAdded => AgentEvent::OutputItemAdded(frame.payload()?),
            EventType::OutputItemDone => AgentEvent::OutputItemDone(frame.payload()?),
            EventType::ContentPartAdded => AgentEvent::ContentPartAdded(frame.payload()?),
            EventType::ContentPartDone => AgentEvent::ContentPartDone(frame.payload()?),
            EventType::OutputTextDelta => AgentEvent::TextDelta(frame.payload()?),
            EventType::OutputTextDone => AgentEvent::TextDone(frame.payload()?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Id of the agent message this event refers to.
    pub fn message_id(&self) -> &str {
        match self {
            AgentEvent::Created(m)
            | AgentEvent::InProgress(m)
            | AgentEvent::Completed(m)
            | AgentEvent::Failed(m)
            | AgentEvent::Incomplete(m) => &m.id,
            AgentEvent::OutputItemAdded(e) | AgentEvent::OutputItemDone(e) => &e.item.id,
            AgentEvent::ContentPartAdded(e) | AgentEvent::ContentPartDone(e) => &e.item_id,
            AgentEvent::TextDelta(e) => &e.item_id,
            AgentEvent::TextDone(e) => &e.item_id,
        }
    }
}
