use avatarai_shared::feed::{CreateMoment, FeedPage, ThreadResponse};

use super::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// `POST /api/moments`: publish a moment or a reply.
    pub async fn create_moment(&self, moment: &CreateMoment) -> Result<serde_json::Value> {
        self.post_json("/api/moments", moment).await
    }

    /// `GET /api/feeds`. A `None` cursor requests the start of the feed.
    pub async fn get_feed(&self, cursor: Option<&str>, limit: u32) -> Result<FeedPage> {
        let limit = limit.to_string();
        let mut query = vec![("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        self.get_json_with_query("/api/feeds", &query).await
    }

    /// `GET /api/moments/thread`.
    pub async fn get_thread(&self, uri: &str, depth: u32) -> Result<ThreadResponse> {
        let depth = depth.to_string();
        self.get_json_with_query("/api/moments/thread", &[("uri", uri), ("depth", depth.as_str())])
            .await
    }
}
