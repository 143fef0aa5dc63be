//! Thread view: a root moment and its replies, flattened for display.

use tracing::info;

use avatarai_net::ApiClient;
use avatarai_shared::constants::THREAD_DEPTH;
use avatarai_shared::feed::ThreadReply;
use avatarai_shared::ValidationError;

use super::feed::FeedCard;
use crate::error::Result;
use crate::events::{EventSink, UiEvent};

/// One reply in the flattened thread. Direct replies have depth 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadRow {
    pub depth: usize,
    pub card: FeedCard,
}

/// Depth-first, in server order. Entries without a moment are skipped but
/// their replies are kept.
pub fn flatten(replies: &[ThreadReply]) -> Vec<ThreadRow> {
    fn walk(replies: &[ThreadReply], depth: usize, rows: &mut Vec<ThreadRow>) {
        for reply in replies {
            if let Some(moment) = &reply.moment {
                rows.push(ThreadRow {
                    depth,
                    card: FeedCard::new(moment.clone()),
                });
            }
            walk(&reply.replies, depth + 1, rows);
        }
    }

    let mut rows = Vec::new();
    walk(replies, 1, &mut rows);
    rows
}

#[derive(Clone)]
pub struct ThreadView {
    api: ApiClient,
    events: EventSink,
}

impl ThreadView {
    pub fn new(api: ApiClient, events: EventSink) -> Self {
        Self { api, events }
    }

    pub async fn open_thread(&self, uri: &str) -> Result<(Option<FeedCard>, Vec<ThreadRow>)> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(ValidationError::Required("Thread uri").into());
        }

        let thread = match self.api.get_thread(uri, THREAD_DEPTH).await {
            Ok(thread) => thread,
            Err(e) => {
                self.events.error(format!("Failed to load thread: {e}"));
                return Err(e.into());
            }
        };

        let root = thread.moment.map(FeedCard::new);
        let rows = flatten(&thread.replies);
        info!(uri, replies = rows.len(), "Thread loaded");
        self.events.emit(UiEvent::ThreadLoaded {
            root: root.clone(),
            rows: rows.clone(),
        });
        Ok((root, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::api_for;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(id: &str, replies: serde_json::Value) -> serde_json::Value {
        json!({"moment": {"id": id, "author": {"did": "did:plc:a"}}, "replies": replies})
    }

    #[test]
    fn nested_replies_flatten_depth_first() {
        let replies: Vec<ThreadReply> = serde_json::from_value(json!([
            reply("a", json!([reply("a1", json!([reply("a1x", json!([]))])), reply("a2", json!([]))])),
            reply("b", json!([])),
            {"replies": [reply("orphan-child", json!([]))]}
        ]))
        .unwrap();

        let rows: Vec<_> = flatten(&replies)
            .into_iter()
            .map(|r| (r.card.moment.id, r.depth))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("a".to_string(), 1),
                ("a1".to_string(), 2),
                ("a1x".to_string(), 3),
                ("a2".to_string(), 2),
                ("b".to_string(), 1),
                ("orphan-child".to_string(), 2),
            ]
        );
    }

    #[tokio::test]
    async fn thread_is_requested_with_depth_ten() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/moments/thread"))
            .and(query_param("uri", "at://did:plc:a/app.vtri.activity.moment/1"))
            .and(query_param("depth", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "moment": {"id": "1", "author": {"did": "did:plc:a"}},
                "replies": [reply("r1", json!([]))]
            })))
            .expect(1)
            .mount(&server)
            .await;
        let (events, _rx) = EventSink::channel();
        let view = ThreadView::new(api_for(&server, Some("tok")), events);

        let (root, rows) = view
            .open_thread("at://did:plc:a/app.vtri.activity.moment/1")
            .await
            .unwrap();
        assert_eq!(root.unwrap().moment.id, "1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].depth, 1);
    }

    #[tokio::test]
    async fn blank_uri_is_rejected() {
        let server = MockServer::start().await;
        let (events, _rx) = EventSink::channel();
        let view = ThreadView::new(api_for(&server, None), events);
        assert!(view.open_thread(" ").await.is_err());
    }
}
