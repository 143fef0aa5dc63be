//! Routing of inbound frames to subscribers.
//!
//! Every event type keeps an ordered list of subscribers. Subscribing never
//! replaces an earlier handler; all of them run, in subscription order.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use avatarai_shared::protocol::{EventType, InboundFrame};

pub type FrameHandler = Arc<dyn Fn(&InboundFrame) + Send + Sync>;

#[derive(Default, Clone)]
pub struct Dispatcher {
    subscribers: HashMap<EventType, Vec<FrameHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, event_type: EventType, handler: F)
    where
        F: Fn(&InboundFrame) + Send + Sync + 'static,
    {
        self.subscribers
            .entry(event_type)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Subscribe one shared handler to several event types.
    pub fn subscribe_many(&mut self, event_types: &[EventType], handler: FrameHandler) {
        for event_type in event_types {
            self.subscribers
                .entry(*event_type)
                .or_default()
                .push(Arc::clone(&handler));
        }
    }

    pub fn subscriber_count(&self, event_type: EventType) -> usize {
        self.subscribers.get(&event_type).map_or(0, Vec::len)
    }

    /// Run every subscriber of the frame's event type. Returns how many ran.
    pub fn dispatch(&self, frame: &InboundFrame) -> usize {
        let Some(event_type) = frame.kind() else {
            warn!(event_type = %frame.event_type, event_id = %frame.event_id, "Unknown event type, frame dropped");
            return 0;
        };

        let handlers = match self.subscribers.get(&event_type) {
            Some(handlers) if !handlers.is_empty() => handlers,
            _ => {
                debug!(event_type = %event_type, "No subscriber for event type");
                return 0;
            }
        };

        for handler in handlers {
            handler(frame);
        }
        handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn frame(tag: &str) -> InboundFrame {
        InboundFrame {
            event_id: "e1".into(),
            event_type: tag.into(),
            event: json!({}),
        }
    }

    #[test]
    fn subscribers_run_in_order_without_replacement() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();

        for name in ["first", "second"] {
            let calls = Arc::clone(&calls);
            dispatcher.subscribe(EventType::Error, move |_| calls.lock().unwrap().push(name));
        }

        assert_eq!(dispatcher.subscriber_count(EventType::Error), 2);
        assert_eq!(dispatcher.dispatch(&frame("error")), 2);
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn unknown_and_unsubscribed_tags_run_nothing() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.dispatch(&frame("no.such.event")), 0);
        assert_eq!(dispatcher.dispatch(&frame("message_received")), 0);
    }

    #[test]
    fn shared_handler_across_types() {
        let count = Arc::new(Mutex::new(0));
        let mut dispatcher = Dispatcher::new();
        let counter = Arc::clone(&count);
        dispatcher.subscribe_many(
            &[EventType::AgentMessageCreated, EventType::OutputTextDelta],
            Arc::new(move |_| *counter.lock().unwrap() += 1),
        );

        dispatcher.dispatch(&frame("agent_message.created"));
        dispatcher.dispatch(&frame("agent_message.output_text.delta"));
        assert_eq!(*count.lock().unwrap(), 2);
    }
}
