use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Interrupt type carried by an incomplete agent message when the user stopped it.
pub const INTERRUPT_TYPE_NONE: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Text,
    Image,
    AgentMessage,
}

impl MessageType {
    pub fn code(&self) -> i32 {
        match self {
            MessageType::Text => 1,
            MessageType::Image => 3,
            MessageType::AgentMessage => 9,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(MessageType::Text),
            3 => Some(MessageType::Image),
            9 => Some(MessageType::AgentMessage),
            _ => None,
        }
    }
}

/// A chat message as delivered by `message_received` frames and the history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    pub msg_type: i32,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub sender_id: String,
    /// Unix milliseconds.
    #[serde(default)]
    pub sender_at: Option<i64>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Response of `GET /api/messages/history`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HistoryPage {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Typed view of a message's `content`, selected by `msgType`.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text(String),
    Image {
        image_cid: Option<String>,
        image_url: Option<String>,
        alt: Option<String>,
    },
    Agent(Box<AgentMessage>),
    Unsupported(i32),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageContent {
    #[serde(default)]
    image_cid: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    alt: Option<String>,
}

impl ChatMessage {
    /// Sort key for history display: `senderAt`, falling back to `createdAt`.
    pub fn timestamp(&self) -> i64 {
        self.sender_at.or(self.created_at).unwrap_or(0)
    }

    pub fn body(&self) -> MessageBody {
        match MessageType::from_code(self.msg_type) {
            Some(MessageType::Text) => MessageBody::Text(
                self.content
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            Some(MessageType::Image) => {
                let image: ImageContent =
                    serde_json::from_value(self.content.clone()).unwrap_or_default();
                MessageBody::Image {
                    image_cid: image.image_cid,
                    image_url: image.image_url,
                    alt: image.alt,
                }
            }
            Some(MessageType::AgentMessage) => {
                // History wraps the record as `{"message": {...}}`.
                let record = self.content.get("message").unwrap_or(&self.content);
                match AgentMessage::deserialize(record) {
                    Ok(agent) => MessageBody::Agent(Box::new(agent)),
                    Err(e) => {
                        tracing::debug!(id = %self.id, error = %e, "Malformed agent message content");
                        MessageBody::Agent(Box::default())
                    }
                }
            }
            None => MessageBody::Unsupported(self.msg_type),
        }
    }
}

/// Server-side record of an assistant response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<AgentError>,
    #[serde(default)]
    pub interrupt_type: i32,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub message_items: Vec<MessageItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AgentError {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MessageItem {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContentPart {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

impl AgentMessage {
    /// Error message carried by the record, if non-empty.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupt_type != INTERRUPT_TYPE_NONE
    }

    /// `altText` if present, otherwise every `output_text` part joined in order.
    pub fn output_text(&self) -> String {
        if let Some(alt) = self.alt_text.as_deref().filter(|t| !t.is_empty()) {
            return alt.to_string();
        }
        self.message_items
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .map(|part| part.text.as_str())
            .collect()
    }
}
