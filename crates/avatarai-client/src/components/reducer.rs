//! Streaming assistant-message state machine.
//!
//! Every agent-message frame is folded into a [`StreamingMessage`] keyed by
//! message id. Ids from `agentMessage.id`, `item.id` and `itemId` share one
//! id space. Once a message reaches a final status it no longer changes.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use avatarai_shared::chat::AgentMessage;
use avatarai_shared::protocol::AgentEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Incomplete,
}

impl MessageStatus {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            MessageStatus::Completed | MessageStatus::Failed | MessageStatus::Incomplete
        )
    }
}

/// View-model of one assistant response being streamed.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingMessage {
    pub id: String,
    pub status: MessageStatus,
    /// Progress indicator visible until the first content arrives.
    pub thinking: bool,
    /// Cleared when the output item is done or the message is final.
    pub loading: bool,
    /// Failure or incompleteness notice shown instead of (or after) content.
    pub notice: Option<String>,
    parts: BTreeMap<usize, String>,
}

impl StreamingMessage {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            status: MessageStatus::Pending,
            thinking: true,
            loading: true,
            notice: None,
            parts: BTreeMap::new(),
        }
    }

    /// Accumulated text of one content part.
    pub fn part(&self, content_index: usize) -> Option<&str> {
        self.parts.get(&content_index).map(String::as_str)
    }

    /// All content parts joined in index order.
    pub fn text(&self) -> String {
        self.parts.values().map(String::as_str).collect()
    }

    fn accumulator(&mut self, content_index: usize) -> &mut String {
        self.thinking = false;
        self.parts.entry(content_index).or_default()
    }

    fn finalize(&mut self, status: MessageStatus, notice: Option<String>) {
        self.status = status;
        self.thinking = false;
        self.loading = false;
        self.notice = notice;
    }
}

/// What applying one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// A new message was allocated.
    Created,
    /// The message changed in place.
    Updated,
    /// Nothing changed.
    Unchanged,
}

#[derive(Debug, Default)]
pub struct StreamReducer {
    messages: HashMap<String, StreamingMessage>,
    current_id: Option<String>,
    interrupt_visible: bool,
}

impl StreamReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, message_id: &str) -> Option<&StreamingMessage> {
        self.messages.get(message_id)
    }

    /// The open response an interrupt would target.
    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn interrupt_visible(&self) -> bool {
        self.interrupt_visible
    }

    /// Hide the interrupt affordance once an interrupt was requested. The
    /// response stays current until the server finalizes it.
    pub fn hide_interrupt(&mut self) {
        self.interrupt_visible = false;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.release_current();
    }

    fn release_current(&mut self) {
        self.current_id = None;
        self.interrupt_visible = false;
    }

    pub fn apply(&mut self, event: &AgentEvent) -> Change {
        let id = event.message_id();
        match event {
            AgentEvent::Created(_) => {
                if self.is_finalized(id) {
                    return self.ignore(id, "created");
                }
                self.current_id = Some(id.to_string());
                self.interrupt_visible = true;
                self.allocate(id)
            }

            AgentEvent::InProgress(_) => match self.open_message(id) {
                Some(msg) => {
                    msg.status = MessageStatus::InProgress;
                    msg.thinking = true;
                    Change::Updated
                }
                _ => self.ignore(id, "in_progress"),
            },

            AgentEvent::OutputItemAdded(e) => {
                if e.item.kind != "message" {
                    debug!(message_id = %id, item_type = %e.item.kind, "Ignoring non-message output item");
                    return Change::Unchanged;
                }
                if self.messages.contains_key(id) {
                    return Change::Unchanged;
                }
                self.allocate(id)
            }

            AgentEvent::ContentPartAdded(e) => {
                let is_text = e.part.as_ref().is_some_and(|p| p.kind == "output_text");
                if !is_text {
                    return Change::Unchanged;
                }
                match self.open_message(id) {
                    Some(msg) => {
                        msg.accumulator(e.content_index);
                        Change::Updated
                    }
                    None => self.ignore(id, "content_part.added"),
                }
            }

            AgentEvent::TextDelta(e) => match self.open_message(id) {
                Some(msg) => {
                    msg.accumulator(e.content_index).push_str(&e.delta);
                    Change::Updated
                }
                None => self.ignore(id, "output_text.delta"),
            },

            AgentEvent::TextDone(e) => match self.open_message(id) {
                Some(msg) => {
                    let text = msg.accumulator(e.content_index);
                    text.clear();
                    text.push_str(&e.text);
                    Change::Updated
                }
                None => self.ignore(id, "output_text.done"),
            },

            AgentEvent::ContentPartDone(e) => {
                debug!(message_id = %id, content_index = e.content_index, "Content part done");
                Change::Unchanged
            }

            AgentEvent::OutputItemDone(_) => match self.open_message(id) {
                Some(msg) => {
                    msg.loading = false;
                    Change::Updated
                }
                None => self.ignore(id, "output_item.done"),
            },

            AgentEvent::Completed(_) => {
                if self.current_id.as_deref() == Some(id) {
                    self.release_current();
                }
                match self.open_message(id) {
                    Some(msg) => {
                        msg.finalize(MessageStatus::Completed, None);
                        Change::Updated
                    }
                    None => self.ignore(id, "completed"),
                }
            }

            AgentEvent::Failed(record) => {
                let notice = format!("Error: {}", record.error_message().unwrap_or("Processing failed"));
                self.finalize_any(id, MessageStatus::Failed, notice)
            }

            AgentEvent::Incomplete(record) => {
                self.finalize_any(id, MessageStatus::Incomplete, incomplete_notice(record))
            }
        }
    }

    fn allocate(&mut self, id: &str) -> Change {
        if self.messages.contains_key(id) {
            return Change::Unchanged;
        }
        debug!(message_id = %id, "Streaming message allocated");
        self.messages.insert(id.to_string(), StreamingMessage::new(id));
        Change::Created
    }

    /// Failed and incomplete finalize whether or not the id was seen before.
    fn finalize_any(&mut self, id: &str, status: MessageStatus, notice: String) -> Change {
        self.release_current();
        if self.is_finalized(id) {
            return self.ignore(id, "finalize");
        }
        let change = self.allocate(id);
        if let Some(msg) = self.messages.get_mut(id) {
            msg.finalize(status, Some(notice));
        }
        match change {
            Change::Created => Change::Created,
            _ => Change::Updated,
        }
    }

    fn open_message(&mut self, id: &str) -> Option<&mut StreamingMessage> {
        self.messages.get_mut(id).filter(|m| !m.status.is_final())
    }

    fn is_finalized(&self, id: &str) -> bool {
        self.messages.get(id).is_some_and(|m| m.status.is_final())
    }

    fn ignore(&self, id: &str, event: &str) -> Change {
        match self.messages.get(id) {
            Some(msg) if msg.status.is_final() => {
                debug!(message_id = %id, event, status = ?msg.status, "Event after final status ignored");
            }
            Some(_) => debug!(message_id = %id, event, "Event ignored"),
            None => warn!(message_id = %id, event, "Event for unknown message ignored"),
        }
        Change::Unchanged
    }
}

/// Distinguishes an explicit error, a user interrupt and a generic cut-off.
fn incomplete_notice(record: &AgentMessage) -> String {
    if let Some(message) = record.error_message() {
        format!("Error: {message}")
    } else if record.was_interrupted() {
        "Response interrupted".to_string()
    } else {
        "Response incomplete".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatarai_shared::chat::{AgentError, ContentPart};
    use avatarai_shared::protocol::{
        ContentPartEvent, OutputItem, OutputItemEvent, TextDeltaEvent, TextDoneEvent,
    };

    fn record(id: &str) -> AgentMessage {
        AgentMessage {
            id: id.into(),
            ..Default::default()
        }
    }

    fn created(id: &str) -> AgentEvent {
        AgentEvent::Created(record(id))
    }

    fn delta(id: &str, index: usize, text: &str) -> AgentEvent {
        AgentEvent::TextDelta(TextDeltaEvent {
            item_id: id.into(),
            output_index: 0,
            content_index: index,
            delta: text.into(),
        })
    }

    fn done(id: &str, index: usize, text: &str) -> AgentEvent {
        AgentEvent::TextDone(TextDoneEvent {
            item_id: id.into(),
            output_index: 0,
            content_index: index,
            text: text.into(),
        })
    }

    fn item(id: &str, kind: &str) -> OutputItemEvent {
        OutputItemEvent {
            output_index: 0,
            item: OutputItem {
                id: id.into(),
                kind: kind.into(),
            },
        }
    }

    #[test]
    fn deltas_concatenate_in_arrival_order() {
        let mut reducer = StreamReducer::new();
        reducer.apply(&created("m1"));
        for piece in ["Hel", "lo", ", ", "world"] {
            assert_eq!(reducer.apply(&delta("m1", 0, piece)), Change::Updated);
        }
        assert_eq!(reducer.get("m1").unwrap().part(0), Some("Hello, world"));
    }

    #[test]
    fn done_replaces_accumulated_text() {
        let mut reducer = StreamReducer::new();
        reducer.apply(&created("m1"));
        reducer.apply(&delta("m1", 0, "draft tex"));
        reducer.apply(&done("m1", 0, "Final text"));
        assert_eq!(reducer.get("m1").unwrap().part(0), Some("Final text"));
    }

    #[test]
    fn delta_before_part_added_creates_accumulator() {
        let mut reducer = StreamReducer::new();
        reducer.apply(&created("m1"));
        reducer.apply(&delta("m1", 1, "late"));
        reducer.apply(&AgentEvent::ContentPartAdded(ContentPartEvent {
            item_id: "m1".into(),
            output_index: 0,
            content_index: 1,
            part: Some(ContentPart {
                kind: "output_text".into(),
                text: String::new(),
            }),
        }));
        let msg = reducer.get("m1").unwrap();
        assert_eq!(msg.part(1), Some("late"));
        assert!(!msg.thinking);
    }

    #[test]
    fn parts_join_in_index_order() {
        let mut reducer = StreamReducer::new();
        reducer.apply(&created("m1"));
        reducer.apply(&delta("m1", 1, "world"));
        reducer.apply(&delta("m1", 0, "hello "));
        assert_eq!(reducer.get("m1").unwrap().text(), "hello world");
    }

    #[test]
    fn final_message_ignores_later_events() {
        let mut reducer = StreamReducer::new();
        reducer.apply(&created("m1"));
        reducer.apply(&delta("m1", 0, "answer"));
        reducer.apply(&AgentEvent::Completed(record("m1")));

        assert_eq!(reducer.apply(&delta("m1", 0, " more")), Change::Unchanged);
        assert_eq!(reducer.apply(&done("m1", 0, "rewritten")), Change::Unchanged);
        assert_eq!(
            reducer.apply(&AgentEvent::Failed(record("m1"))),
            Change::Unchanged
        );

        let msg = reducer.get("m1").unwrap();
        assert_eq!(msg.status, MessageStatus::Completed);
        assert_eq!(msg.text(), "answer");
        assert!(msg.notice.is_none());
    }

    #[test]
    fn created_tracks_current_and_completion_clears_it() {
        let mut reducer = StreamReducer::new();
        assert_eq!(reducer.apply(&created("m1")), Change::Created);
        assert_eq!(reducer.current_id(), Some("m1"));
        assert!(reducer.interrupt_visible());

        reducer.apply(&AgentEvent::InProgress(record("m1")));
        assert_eq!(reducer.get("m1").unwrap().status, MessageStatus::InProgress);

        reducer.apply(&AgentEvent::Completed(record("m1")));
        assert_eq!(reducer.current_id(), None);
        assert!(!reducer.interrupt_visible());
    }

    #[test]
    fn completion_of_another_message_keeps_current() {
        let mut reducer = StreamReducer::new();
        reducer.apply(&AgentEvent::OutputItemAdded(item("old", "message")));
        reducer.apply(&created("m1"));

        reducer.apply(&AgentEvent::Completed(record("old")));
        assert_eq!(reducer.current_id(), Some("m1"));
        assert!(reducer.interrupt_visible());

        reducer.apply(&AgentEvent::Completed(record("ghost")));
        assert_eq!(reducer.current_id(), Some("m1"));

        reducer.apply(&AgentEvent::Completed(record("m1")));
        assert_eq!(reducer.current_id(), None);
    }

    #[test]
    fn hidden_interrupt_keeps_the_response_current() {
        let mut reducer = StreamReducer::new();
        reducer.apply(&created("m1"));
        reducer.hide_interrupt();
        assert!(!reducer.interrupt_visible());
        assert_eq!(reducer.current_id(), Some("m1"));

        reducer.apply(&AgentEvent::Incomplete(record("m1")));
        assert_eq!(reducer.current_id(), None);

        reducer.apply(&created("m2"));
        assert!(reducer.interrupt_visible());
    }

    #[test]
    fn output_item_allocates_when_created_was_skipped() {
        let mut reducer = StreamReducer::new();
        assert_eq!(
            reducer.apply(&AgentEvent::OutputItemAdded(item("m2", "message"))),
            Change::Created
        );
        assert_eq!(reducer.current_id(), None);
        assert_eq!(
            reducer.apply(&AgentEvent::OutputItemAdded(item("m2", "message"))),
            Change::Unchanged
        );
        assert_eq!(
            reducer.apply(&AgentEvent::OutputItemAdded(item("r1", "reasoning"))),
            Change::Unchanged
        );
        assert!(reducer.get("r1").is_none());

        reducer.apply(&AgentEvent::OutputItemDone(item("m2", "message")));
        assert!(!reducer.get("m2").unwrap().loading);
    }

    #[test]
    fn events_for_unknown_ids_are_ignored() {
        let mut reducer = StreamReducer::new();
        assert_eq!(reducer.apply(&delta("ghost", 0, "x")), Change::Unchanged);
        assert_eq!(
            reducer.apply(&AgentEvent::Completed(record("ghost"))),
            Change::Unchanged
        );
        assert!(reducer.get("ghost").is_none());
    }

    #[test]
    fn failed_without_created_still_finalizes() {
        let mut reducer = StreamReducer::new();
        let mut failed = record("m3");
        failed.error = Some(AgentError {
            code: None,
            message: "quota exceeded".into(),
        });
        assert_eq!(reducer.apply(&AgentEvent::Failed(failed)), Change::Created);
        let msg = reducer.get("m3").unwrap();
        assert_eq!(msg.status, MessageStatus::Failed);
        assert_eq!(msg.notice.as_deref(), Some("Error: quota exceeded"));
    }

    #[test]
    fn incomplete_notice_variants() {
        let mut reducer = StreamReducer::new();

        reducer.apply(&created("a"));
        let mut interrupted = record("a");
        interrupted.interrupt_type = 2;
        reducer.apply(&AgentEvent::Incomplete(interrupted));
        assert_eq!(reducer.get("a").unwrap().notice.as_deref(), Some("Response interrupted"));
        assert_eq!(reducer.current_id(), None);

        reducer.apply(&AgentEvent::Incomplete(record("b")));
        assert_eq!(reducer.get("b").unwrap().notice.as_deref(), Some("Response incomplete"));

        let mut errored = record("c");
        errored.error = Some(AgentError {
            code: None,
            message: "context too long".into(),
        });
        reducer.apply(&AgentEvent::Incomplete(errored));
        assert_eq!(reducer.get("c").unwrap().notice.as_deref(), Some("Error: context too long"));
        assert_eq!(reducer.get("c").unwrap().status, MessageStatus::Incomplete);
    }

    #[test]
    fn content_part_of_other_type_is_ignored() {
        let mut reducer = StreamReducer::new();
        reducer.apply(&created("m1"));
        let change = reducer.apply(&AgentEvent::ContentPartAdded(ContentPartEvent {
            item_id: "m1".into(),
            output_index: 0,
            content_index: 0,
            part: Some(ContentPart {
                kind: "refusal".into(),
                text: String::new(),
            }),
        }));
        assert_eq!(change, Change::Unchanged);
        assert_eq!(reducer.get("m1").unwrap().part(0), None);
    }
}
