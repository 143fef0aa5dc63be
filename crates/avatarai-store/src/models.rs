//! Rows persisted in the local database.

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Cookie
// ---------------------------------------------------------------------------

/// A stored cookie. `expires_at` of `None` means a session cookie that never
/// expires on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Cookie {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}
