use serde::{Deserialize, Serialize};

/// A signed-in account. The identity key is `did`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub did: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<TimeValue>,
}

impl User {
    /// Minimal record known right after a token exchange or refresh.
    pub fn from_identity(did: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            did: did.into(),
            handle: handle.into(),
            ..Default::default()
        }
    }

    /// Display name, falling back to the handle.
    pub fn name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.handle,
        }
    }

    /// Rewrite bare blob ids in `avatar`/`banner` into fetchable URLs.
    pub fn normalize_media(&mut self) {
        self.avatar = self.avatar.take().map(|v| normalize_media_url(&v));
        self.banner = self.banner.take().map(|v| normalize_media_url(&v));
    }
}

/// Timestamps arrive either as unix seconds or as RFC 3339 strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(i64),
    Text(String),
}

impl TimeValue {
    pub fn as_unix_seconds(&self) -> Option<i64> {
        match self {
            TimeValue::Seconds(s) => Some(*s),
            TimeValue::Text(t) => chrono::DateTime::parse_from_rfc3339(t)
                .ok()
                .map(|dt| dt.timestamp()),
        }
    }
}

/// Response of the OAuth code exchange and token refresh endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub did: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TokenResponse {
    /// `{did, handle}` user record when the response carries a did.
    pub fn user(&self) -> Option<User> {
        self.did
            .as_ref()
            .map(|did| User::from_identity(did.clone(), self.handle.clone().unwrap_or_default()))
    }
}

/// Response of `POST /api/blobs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResult {
    pub cid: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl UploadResult {
    /// Server-provided URL, or the blob endpoint for the cid.
    pub fn display_url(&self) -> String {
        match &self.url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => blob_url(&self.cid),
        }
    }
}

/// Relative URL serving a stored blob.
pub fn blob_url(cid: &str) -> String {
    format!("/api/blobs?id={cid}")
}

/// Values that are not absolute http(s) URLs are treated as blob ids.
pub fn normalize_media_url(value: &str) -> String {
    if value.is_empty() || value.starts_with("http") || value.starts_with("/api/blobs") {
        value.to_string()
    } else {
        blob_url(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_deserializes_camel_case() {
        let user: User = serde_json::from_str(
            r#"{"did":"did:plc:abc","handle":"alice","displayName":"Alice","createdAt":1700000000}"#,
        )
        .unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Alice"));
        assert_eq!(user.created_at, Some(TimeValue::Seconds(1_700_000_000)));
        assert_eq!(user.name(), "Alice");
    }

    #[test]
    fn name_falls_back_to_handle() {
        let user = User::from_identity("did:plc:abc", "alice");
        assert_eq!(user.name(), "alice");
    }

    #[test]
    fn normalize_media_rewrites_bare_cids() {
        let mut user = User {
            avatar: Some("bafycid".into()),
            banner: Some("https://cdn.example/banner.png".into()),
            ..User::from_identity("did:plc:abc", "alice")
        };
        user.normalize_media();
        assert_eq!(user.avatar.as_deref(), Some("/api/blobs?id=bafycid"));
        assert_eq!(user.banner.as_deref(), Some("https://cdn.example/banner.png"));
    }

    #[test]
    fn rfc3339_time_value() {
        let t = TimeValue::Text("2024-01-01T00:00:00Z".into());
        assert_eq!(t.as_unix_seconds(), Some(1_704_067_200));
    }
}
