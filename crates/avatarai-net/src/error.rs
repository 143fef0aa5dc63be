use std::time::Duration;

use thiserror::Error;

use avatarai_shared::ProtocolError;

#[derive(Error, Debug)]
pub enum NetError {
    /// Non-2xx response. `message` is the server-provided text, or a
    /// generic fallback when the body was empty.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),
}

impl NetError {
    /// Missing, invalid or expired credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, NetError::Http { status: 401 | 403, .. } | NetError::NotAuthenticated)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            NetError::Http { status, .. } => Some(*status),
            NetError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_401_and_403_are_auth_failures() {
        let http = |status| NetError::Http {
            status,
            message: "x".into(),
        };
        assert!(http(401).is_auth_failure());
        assert!(http(403).is_auth_failure());
        assert!(!http(500).is_auth_failure());
        assert_eq!(http(404).status(), Some(404));
    }

    #[test]
    fn timeout_is_not_an_auth_failure() {
        let err = NetError::Timeout(Duration::from_secs(10));
        assert!(!err.is_auth_failure());
        assert_eq!(err.to_string(), "Connection timed out after 10s");
    }
}
