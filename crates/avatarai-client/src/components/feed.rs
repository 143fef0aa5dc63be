//! Moment feed with cursor paging and per-card reply drafts.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use avatarai_net::ApiClient;
use avatarai_shared::constants::FEED_PAGE_LIMIT;
use avatarai_shared::feed::Moment;
use avatarai_shared::richtext::build_moment_uri;
use avatarai_shared::ValidationError;

use super::post::{stage_images, stage_video, Draft};
use crate::error::Result;
use crate::events::{EventSink, UiEvent};
use crate::media::{MediaFile, StagedMedia};

/// A moment ready for display, with its `at://` uri resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedCard {
    pub moment: Moment,
    pub uri: Option<String>,
}

impl FeedCard {
    pub fn new(moment: Moment) -> Self {
        let uri = moment
            .uri
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| build_moment_uri(&moment.author.did, &moment.id));
        Self { moment, uri }
    }
}

#[derive(Default)]
struct FeedView {
    cards: Vec<FeedCard>,
    cursor: Option<String>,
    has_more: bool,
    open_replies: HashSet<String>,
    reply_drafts: HashMap<String, Arc<Mutex<Draft>>>,
}

#[derive(Clone)]
pub struct FeedComponent {
    api: ApiClient,
    events: EventSink,
    view: Arc<Mutex<FeedView>>,
}

impl FeedComponent {
    pub fn new(api: ApiClient, events: EventSink) -> Self {
        Self {
            api,
            events,
            view: Arc::new(Mutex::new(FeedView::default())),
        }
    }

    fn view(&self) -> MutexGuard<'_, FeedView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a page. `refresh` starts over from the newest moment; otherwise
    /// the page is appended after the current cursor.
    pub async fn load_feed(&self, refresh: bool) -> Result<usize> {
        let cursor = if refresh { None } else { self.view().cursor.clone() };

        let page = match self.api.get_feed(cursor.as_deref(), FEED_PAGE_LIMIT).await {
            Ok(page) => page,
            Err(e) => {
                self.events.error(format!("Failed to load feed: {e}"));
                return Err(e.into());
            }
        };

        let fresh: Vec<FeedCard> = page.moments().cloned().map(FeedCard::new).collect();
        let count = fresh.len();

        let (cards, has_more) = {
            let mut view = self.view();
            if refresh {
                view.cards.clear();
            }
            view.cards.extend(fresh);
            view.has_more = page.cursor.is_some() && !page.feed.is_empty();
            view.cursor = page.cursor;
            (view.cards.clone(), view.has_more)
        };
        info!(count, refresh, has_more, "Feed page loaded");
        self.events.emit(UiEvent::FeedUpdated { cards, has_more });
        Ok(count)
    }

    /// Next page, if the last one said there is more.
    pub async fn load_more(&self) -> Result<usize> {
        if !self.view().has_more {
            debug!("No more feed pages");
            return Ok(0);
        }
        self.load_feed(false).await
    }

    pub fn cards(&self) -> Vec<FeedCard> {
        self.view().cards.clone()
    }

    pub fn has_more(&self) -> bool {
        self.view().has_more
    }

    /// Show or hide the reply form under a card. Returns whether it is open.
    pub fn toggle_reply(&self, moment_id: &str) -> bool {
        let open = {
            let mut view = self.view();
            if view.open_replies.remove(moment_id) {
                false
            } else {
                view.open_replies.insert(moment_id.to_string());
                true
            }
        };
        self.events.emit(UiEvent::ReplyFormToggled {
            moment_id: moment_id.to_string(),
            open,
        });
        open
    }

    pub fn reply_open(&self, moment_id: &str) -> bool {
        self.view().open_replies.contains(moment_id)
    }

    fn reply_draft(&self, moment_id: &str) -> Arc<Mutex<Draft>> {
        self.view()
            .reply_drafts
            .entry(moment_id.to_string())
            .or_default()
            .clone()
    }

    pub fn reply_media(&self, moment_id: &str) -> Draft {
        let draft = self.reply_draft(moment_id);
        let snapshot = draft.lock().unwrap_or_else(PoisonError::into_inner).clone();
        snapshot
    }

    pub async fn add_reply_images(&self, moment_id: &str, files: Vec<MediaFile>) -> Result<usize> {
        let draft = self.reply_draft(moment_id);
        stage_images(&self.api, &self.events, &draft, files).await
    }

    pub async fn set_reply_video(&self, moment_id: &str, file: MediaFile) -> Result<StagedMedia> {
        let draft = self.reply_draft(moment_id);
        stage_video(&self.api, &self.events, &draft, file).await
    }

    /// Post a reply to `moment_id`, then close the form and reload the feed.
    pub async fn submit_reply(&self, moment_id: &str, text: &str) -> Result<bool> {
        let request = match self.reply_media(moment_id).to_request(text, Some(moment_id)) {
            Ok(request) => request,
            Err(ValidationError::Required(_)) => {
                self.events.warning("Enter a reply or add media");
                return Ok(false);
            }
            Err(e) => {
                self.events.error(e.to_string());
                return Err(e.into());
            }
        };

        if let Err(e) = self.api.create_moment(&request).await {
            self.events.error(format!("Failed to reply: {e}"));
            return Err(e.into());
        }
        info!(parent = %moment_id, "Reply published");

        {
            let mut view = self.view();
            view.open_replies.remove(moment_id);
            view.reply_drafts.remove(moment_id);
        }
        self.events.emit(UiEvent::ReplyFormToggled {
            moment_id: moment_id.to_string(),
            open: false,
        });
        self.events.success("Reply posted");
        self.load_feed(true).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::test_support::drain;
    use crate::test_support::api_for;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed(server: &MockServer) -> (FeedComponent, UnboundedReceiver<UiEvent>) {
        let (events, rx) = EventSink::channel();
        (FeedComponent::new(api_for(server, Some("tok")), events), rx)
    }

    fn moment(id: &str) -> serde_json::Value {
        json!({"type": "moment", "card": {"id": id, "author": {"did": "did:plc:a", "handle": "a"}, "text": id}})
    }

    #[test]
    fn card_uri_falls_back_to_author_did() {
        let mut m = Moment {
            id: "m1".into(),
            ..Default::default()
        };
        assert_eq!(FeedCard::new(m.clone()).uri, None);
        m.author.did = "did:plc:a".into();
        assert_eq!(
            FeedCard::new(m.clone()).uri.as_deref(),
            Some("at://did:plc:a/app.vtri.activity.moment/m1")
        );
        m.uri = Some("at://x/y/z".into());
        assert_eq!(FeedCard::new(m).uri.as_deref(), Some("at://x/y/z"));
    }

    #[tokio::test]
    async fn pages_append_and_refresh_resets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/feeds"))
            .and(query_param("cursor", "c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "feed": [moment("m3")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/feeds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "feed": [moment("m1"), {"type": "ad"}, moment("m2")],
                "cursor": "c1"
            })))
            .mount(&server)
            .await;
        let (feed, mut rx) = feed(&server);

        assert_eq!(feed.load_feed(true).await.unwrap(), 2);
        assert!(feed.has_more());

        assert_eq!(feed.load_more().await.unwrap(), 1);
        let ids: Vec<_> = feed.cards().into_iter().map(|c| c.moment.id).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert!(!feed.has_more());
        assert_eq!(feed.load_more().await.unwrap(), 0);

        assert_eq!(feed.load_feed(true).await.unwrap(), 2);
        assert_eq!(feed.cards().len(), 2);

        let updates = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, UiEvent::FeedUpdated { .. }))
            .count();
        assert_eq!(updates, 3);
    }

    #[tokio::test]
    async fn reply_form_toggles() {
        let server = MockServer::start().await;
        let (feed, _rx) = feed(&server);
        assert!(feed.toggle_reply("m1"));
        assert!(feed.reply_open("m1"));
        assert!(!feed.toggle_reply("m1"));
        assert!(!feed.reply_open("m1"));
    }

    #[tokio::test]
    async fn reply_carries_parent_and_reloads() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/moments"))
            .and(body_partial_json(json!({"text": "nice", "parentId": "m1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/feeds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"feed": [moment("m1")]})))
            .expect(1)
            .mount(&server)
            .await;
        let (feed, _rx) = feed(&server);

        feed.toggle_reply("m1");
        assert!(feed.submit_reply("m1", "nice").await.unwrap());
        assert!(!feed.reply_open("m1"));
        assert_eq!(feed.cards().len(), 1);
    }

    #[tokio::test]
    async fn reply_drafts_are_per_card() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/blobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cid": "v1"})))
            .expect(1)
            .mount(&server)
            .await;
        let (feed, _rx) = feed(&server);

        let clip = MediaFile::new("clip.mp4", "video/mp4", vec![0; 32]);
        feed.set_reply_video("m1", clip).await.unwrap();
        assert_eq!(feed.reply_media("m1").video.map(|v| v.cid).as_deref(), Some("v1"));
        assert!(!feed.reply_media("m2").has_media());
    }
}
