use serde::{Deserialize, Serialize};

use crate::richtext::Facet;
use crate::types::blob_url;

// ---------------------------------------------------------------------------
// Read side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub did: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Author {
    pub fn name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if !self.handle.is_empty() => &self.handle,
            _ => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Moment {
    pub id: String,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub text: String,
    /// Unix seconds.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub embed: Option<Embed>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub reply: Option<ReplyRef>,
}

impl Moment {
    pub fn is_reply(&self) -> bool {
        self.reply.as_ref().is_some_and(|r| r.parent.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReplyRef {
    #[serde(default)]
    pub parent: Option<serde_json::Value>,
    #[serde(default)]
    pub root: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Embed {
    #[serde(default)]
    pub images: Vec<EmbedImage>,
    #[serde(default)]
    pub video: Option<EmbedVideo>,
    #[serde(default)]
    pub external: Option<EmbedExternal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EmbedImage {
    #[serde(default)]
    pub cid: String,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

impl EmbedImage {
    pub fn url(&self) -> String {
        self.thumb.clone().unwrap_or_else(|| blob_url(&self.cid))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EmbedVideo {
    #[serde(default)]
    pub cid: String,
    #[serde(default)]
    pub video: Option<String>,
}

impl EmbedVideo {
    pub fn url(&self) -> String {
        self.video.clone().unwrap_or_else(|| blob_url(&self.cid))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmbedExternal {
    pub uri: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumb_cid: String,
    #[serde(default, rename = "thumbURL")]
    pub thumb_url: Option<String>,
}

impl EmbedExternal {
    /// External link staged from a bare URL.
    pub fn from_url(url: &str) -> Self {
        Self {
            uri: url.to_string(),
            title: url.to_string(),
            ..Default::default()
        }
    }

    pub fn thumbnail(&self) -> Option<String> {
        match &self.thumb_url {
            Some(url) if !url.is_empty() => Some(url.clone()),
            _ if !self.thumb_cid.is_empty() => Some(blob_url(&self.thumb_cid)),
            _ => None,
        }
    }
}

/// One entry of `GET /api/feeds`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub card: Option<Moment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FeedPage {
    #[serde(default)]
    pub feed: Vec<FeedItem>,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl FeedPage {
    /// Moment cards of the page; other item kinds are skipped.
    pub fn moments(&self) -> impl Iterator<Item = &Moment> {
        self.feed
            .iter()
            .filter(|item| item.kind == "moment")
            .filter_map(|item| item.card.as_ref())
    }
}

/// Response of `GET /api/moments/thread`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ThreadResponse {
    #[serde(default)]
    pub moment: Option<Moment>,
    #[serde(default)]
    pub replies: Vec<ThreadReply>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ThreadReply {
    #[serde(default)]
    pub moment: Option<Moment>,
    #[serde(default)]
    pub replies: Vec<ThreadReply>,
}

// ---------------------------------------------------------------------------
// Write side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobRef {
    pub cid: String,
}

/// Body of `POST /api/moments`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateMoment {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
    pub langs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<BlobRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<BlobRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<EmbedExternal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Body of `POST /api/avatar/profile`. Only fields the user filled are sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UpdateProfile {
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "avatarCID", skip_serializing_if = "Option::is_none")]
    pub avatar_cid: Option<String>,
    #[serde(rename = "bannerCID", skip_serializing_if = "Option::is_none")]
    pub banner_cid: Option<String>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.description.is_none()
            && self.avatar_cid.is_none()
            && self.banner_cid.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn feed_page_keeps_only_moments() {
        let page: FeedPage = serde_json::from_value(json!({
            "feed": [
                {"type": "moment", "card": {"id": "m1", "text": "hi", "createdAt": 1}},
                {"type": "ad", "card": null},
                {"type": "moment", "card": {"id": "m2", "text": "yo", "createdAt": 2}}
            ],
            "cursor": "c1"
        }))
        .unwrap();
        let ids: Vec<_> = page.moments().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert_eq!(page.cursor.as_deref(), Some("c1"));
    }

    #[test]
    fn create_moment_omits_empty_fields() {
        let body = CreateMoment {
            text: "hello".into(),
            langs: vec!["zh".into(), "en".into()],
            parent_id: Some("m1".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, json!({"text": "hello", "langs": ["zh", "en"], "parentId": "m1"}));
    }

    #[test]
    fn update_profile_field_names() {
        let body = UpdateProfile {
            display_name: Some("Alice".into()),
            avatar_cid: Some("bafy".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, json!({"displayName": "Alice", "avatarCID": "bafy"}));
    }

    #[test]
    fn media_urls_fall_back_to_blob_endpoint() {
        let image = EmbedImage { cid: "c1".into(), ..Default::default() };
        assert_eq!(image.url(), "/api/blobs?id=c1");
        let external = EmbedExternal { thumb_cid: "t1".into(), ..EmbedExternal::from_url("https://a.b") };
        assert_eq!(external.thumbnail().as_deref(), Some("/api/blobs?id=t1"));
        assert_eq!(external.title, "https://a.b");
    }

    #[test]
    fn author_name_fallbacks() {
        assert_eq!(Author::default().name(), "Unknown");
        let author = Author { handle: "bob".into(), ..Default::default() };
        assert_eq!(author.name(), "bob");
    }
}
