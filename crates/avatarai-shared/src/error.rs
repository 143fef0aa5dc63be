use thiserror::Error;

/// Client-side validation failures. Raised before any request is issued;
/// the display text is shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{expected} file required, got '{content_type}'")]
    WrongMediaType {
        expected: &'static str,
        content_type: String,
    },

    #[error("{kind} must be at most {limit_mb}MB")]
    FileTooLarge { kind: &'static str, limit_mb: u64 },

    #[error("At most {0} images per post")]
    TooManyImages(usize),

    #[error("{field} must be at most {limit} characters")]
    TextTooLong { field: &'static str, limit: usize },

    #[error("{0} is required")]
    Required(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{field} must be a JSON object")]
    InvalidJson { field: &'static str },

    #[error("Unknown endpoint type: {0}")]
    UnknownEndpointType(String),
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}
