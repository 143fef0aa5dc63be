//! Rich-text helpers for moment text: facet parsing, tags, moment URIs and
//! small display helpers shared by the feed and profile views.

use std::sync::OnceLock;

use chrono::{TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::MOMENT_COLLECTION;

/// Did attached to mentions until handles are resolved server-side.
pub const UNRESOLVED_MENTION_DID: &str = "did:plc:unknown";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

/// Half-open UTF-8 byte range into the post text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#([A-Za-z0-9_]+)").expect("valid regex"))
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").expect("valid regex"))
}

fn mention_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"@([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)").expect("valid regex")
    })
}

/// Extract tag, link and mention facets, grouped in that order.
pub fn parse_facets(text: &str) -> Vec<Facet> {
    let mut facets = Vec::new();

    for caps in tag_regex().captures_iter(text) {
        let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        facets.push(Facet {
            index: ByteSlice {
                byte_start: whole.start(),
                byte_end: whole.end(),
            },
            features: vec![FacetFeature::Tag {
                tag: tag.as_str().to_string(),
            }],
        });
    }

    for m in link_regex().find_iter(text) {
        facets.push(Facet {
            index: ByteSlice {
                byte_start: m.start(),
                byte_end: m.end(),
            },
            features: vec![FacetFeature::Link {
                uri: m.as_str().to_string(),
            }],
        });
    }

    for m in mention_regex().find_iter(text) {
        facets.push(Facet {
            index: ByteSlice {
                byte_start: m.start(),
                byte_end: m.end(),
            },
            features: vec![FacetFeature::Mention {
                did: UNRESOLVED_MENTION_DID.to_string(),
            }],
        });
    }

    facets
}

/// Hashtags in first-seen order, without duplicates.
pub fn extract_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for caps in tag_regex().captures_iter(text) {
        if let Some(tag) = caps.get(1) {
            if !tags.iter().any(|t| t == tag.as_str()) {
                tags.push(tag.as_str().to_string());
            }
        }
    }
    tags
}

/// `at://{did}/app.vtri.activity.moment/{id}`, or `None` without an author did.
pub fn build_moment_uri(did: &str, moment_id: &str) -> Option<String> {
    if did.is_empty() || moment_id.is_empty() {
        return None;
    }
    Some(format!("at://{did}/{MOMENT_COLLECTION}/{moment_id}"))
}

const AVATAR_COLORS: [&str; 8] = [
    "#6366f1", "#8b5cf6", "#06b6d4", "#10b981", "#f59e0b", "#ef4444", "#ec4899", "#84cc16",
];

/// Deterministic placeholder colour for an avatar without an image.
pub fn avatar_color(seed: &str) -> &'static str {
    let mut hash: i32 = 0;
    for unit in seed.encode_utf16() {
        hash = (unit as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash));
    }
    AVATAR_COLORS[(hash.unsigned_abs() as usize) % AVATAR_COLORS.len()]
}

/// Upper-cased first character, used inside placeholder avatars.
pub fn initial(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

/// Human relative time between two unix-millisecond instants.
pub fn relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms - timestamp_ms;
    match diff {
        d if d < 60_000 => "just now".to_string(),
        d if d < 3_600_000 => format!("{}m ago", d / 60_000),
        d if d < 86_400_000 => format!("{}h ago", d / 3_600_000),
        d if d < 604_800_000 => format!("{}d ago", d / 86_400_000),
        _ => Utc
            .timestamp_millis_opt(timestamp_ms)
            .single()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_facet_kind() {
        let text = "hi #rust see https://example.com/x and @alice.bsky.social";
        let facets = parse_facets(text);
        assert_eq!(facets.len(), 3);

        assert_eq!(facets[0].features[0], FacetFeature::Tag { tag: "rust".into() });
        assert_eq!(&text[facets[0].index.byte_start..facets[0].index.byte_end], "#rust");

        assert_eq!(
            facets[1].features[0],
            FacetFeature::Link { uri: "https://example.com/x".into() }
        );

        assert_eq!(
            &text[facets[2].index.byte_start..facets[2].index.byte_end],
            "@alice.bsky.social"
        );
        assert_eq!(
            facets[2].features[0],
            FacetFeature::Mention { did: UNRESOLVED_MENTION_DID.into() }
        );
    }

    #[test]
    fn offsets_are_utf8_bytes() {
        let text = "你好 #标签 #tag";
        let facets = parse_facets(text);
        assert_eq!(facets.len(), 1);
        assert_eq!(&text[facets[0].index.byte_start..facets[0].index.byte_end], "#tag");
    }

    #[test]
    fn plain_text_has_no_facets() {
        assert!(parse_facets("nothing to see").is_empty());
    }

    #[test]
    fn facet_serializes_with_type_tag() {
        let facet = &parse_facets("#a")[0];
        let value = serde_json::to_value(facet).unwrap();
        assert_eq!(value["features"][0]["$type"], "app.bsky.richtext.facet#tag");
        assert_eq!(value["index"]["byteEnd"], 2);
    }

    #[test]
    fn tags_are_deduplicated_in_order() {
        assert_eq!(extract_tags("#b #a #b #c #a"), vec!["b", "a", "c"]);
    }

    #[test]
    fn moment_uri() {
        assert_eq!(
            build_moment_uri("did:plc:abc", "3k2"),
            Some("at://did:plc:abc/app.vtri.activity.moment/3k2".to_string())
        );
        assert_eq!(build_moment_uri("", "3k2"), None);
    }

    #[test]
    fn avatar_color_is_stable() {
        assert_eq!(avatar_color("alice"), avatar_color("alice"));
        assert!(AVATAR_COLORS.contains(&avatar_color("")));
    }

    #[test]
    fn relative_time_buckets() {
        let now = 1_700_000_000_000;
        assert_eq!(relative_time(now - 5_000, now), "just now");
        assert_eq!(relative_time(now - 5 * 60_000, now), "5m ago");
        assert_eq!(relative_time(now - 3 * 3_600_000, now), "3h ago");
        assert_eq!(relative_time(now - 2 * 86_400_000, now), "2d ago");
        assert_eq!(relative_time(0, now), "1970-01-01");
    }
}
