//! Client-side checks run before any upload or submit is issued.

use std::sync::OnceLock;

use regex::Regex;

use crate::constants::{
    MAX_AVATAR_SIZE, MAX_BANNER_SIZE, MAX_DESCRIPTION_LENGTH, MAX_DISPLAY_NAME_LENGTH,
    MAX_IMAGE_SIZE, MAX_POST_LENGTH, MAX_VIDEO_SIZE,
};
use crate::error::ValidationError;

/// What an uploaded file is going to be used as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Avatar,
    Banner,
}

impl MediaKind {
    pub fn max_size(&self) -> u64 {
        match self {
            MediaKind::Image => MAX_IMAGE_SIZE,
            MediaKind::Video => MAX_VIDEO_SIZE,
            MediaKind::Avatar => MAX_AVATAR_SIZE,
            MediaKind::Banner => MAX_BANNER_SIZE,
        }
    }

    fn mime_prefix(&self) -> &'static str {
        match self {
            MediaKind::Video => "video/",
            _ => "image/",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Video => "Video",
            MediaKind::Avatar => "Avatar",
            MediaKind::Banner => "Banner",
        }
    }
}

/// Text fields with a length ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Post,
    DisplayName,
    Description,
}

impl TextField {
    pub fn max_chars(&self) -> usize {
        match self {
            TextField::Post => MAX_POST_LENGTH,
            TextField::DisplayName => MAX_DISPLAY_NAME_LENGTH,
            TextField::Description => MAX_DESCRIPTION_LENGTH,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TextField::Post => "Post",
            TextField::DisplayName => "Display name",
            TextField::Description => "Description",
        }
    }
}

pub fn validate_media(kind: MediaKind, content_type: &str, size: u64) -> Result<(), ValidationError> {
    if !content_type.starts_with(kind.mime_prefix()) {
        return Err(ValidationError::WrongMediaType {
            expected: if kind == MediaKind::Video { "Video" } else { "Image" },
            content_type: content_type.to_string(),
        });
    }
    if size > kind.max_size() {
        return Err(ValidationError::FileTooLarge {
            kind: kind.label(),
            limit_mb: kind.max_size() / (1024 * 1024),
        });
    }
    Ok(())
}

/// Length check in characters, not bytes.
pub fn validate_text(field: TextField, text: &str) -> Result<(), ValidationError> {
    if text.chars().count() > field.max_chars() {
        return Err(ValidationError::TextTooLong {
            field: field.label(),
            limit: field.max_chars(),
        });
    }
    Ok(())
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*(:\d+)?(/\S*)?$").expect("valid regex")
    })
}

/// An absolute http(s) URL with a host, for external link embeds.
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url_regex().is_match(url.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidUrl(url.trim().to_string()))
    }
}

/// Content type inferred from a file extension, for files read from disk.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn image_size_ceiling() {
        assert!(validate_media(MediaKind::Image, "image/png", 9 * MB).is_ok());
        assert_eq!(
            validate_media(MediaKind::Image, "image/png", 15 * MB),
            Err(ValidationError::FileTooLarge { kind: "Image", limit_mb: 10 })
        );
    }

    #[test]
    fn avatar_is_stricter_than_image() {
        assert!(validate_media(MediaKind::Avatar, "image/jpeg", 6 * MB).is_err());
        assert!(validate_media(MediaKind::Banner, "image/jpeg", 6 * MB).is_ok());
    }

    #[test]
    fn wrong_mime_is_rejected() {
        assert!(matches!(
            validate_media(MediaKind::Video, "image/png", MB),
            Err(ValidationError::WrongMediaType { .. })
        ));
        assert!(validate_media(MediaKind::Video, "video/mp4", 99 * MB).is_ok());
    }

    #[test]
    fn text_length_counts_chars() {
        let name: String = "名".repeat(50);
        assert!(validate_text(TextField::DisplayName, &name).is_ok());
        assert!(validate_text(TextField::DisplayName, &format!("{name}x")).is_err());
        assert!(validate_text(TextField::Post, &"a".repeat(3001)).is_err());
    }

    #[test]
    fn external_urls() {
        assert!(validate_url("https://example.com/post?id=1").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
        assert_eq!(
            validate_url("example.com"),
            Err(ValidationError::InvalidUrl("example.com".into()))
        );
        assert!(validate_url("https://").is_err());
        assert!(validate_url("ftp://example.com").is_err());
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for("cat.PNG"), "image/png");
        assert_eq!(content_type_for("clip.mp4"), "video/mp4");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }
}
