//! Best-effort bearer token inspection.
//!
//! The only thing the client reads from a token is the `exp` claim of a
//! three-segment, dot-separated token with a JSON middle segment. This is a
//! scheduling hint for proactive refresh, never an authorization check: any
//! other token shape simply yields no expiry.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use tracing::debug;

use crate::constants::TOKEN_EXPIRY_THRESHOLD_SECS;

/// Read the `exp` claim (unix seconds) from the middle segment of `token`.
pub fn decode_expiry(token: &str) -> Option<i64> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        debug!(segments = parts.len(), "Token is not three-segment, skipping expiry check");
        return None;
    }

    let segment = parts[1].trim_end_matches('=');
    let bytes = match URL_SAFE_NO_PAD.decode(segment) {
        Ok(b) => b,
        Err(_) => match STANDARD.decode(parts[1]) {
            Ok(b) => b,
            Err(e) => {
                debug!(error = %e, "Token payload is not base64");
                return None;
            }
        },
    };

    let claims: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Token payload is not JSON");
            return None;
        }
    };

    claims.get("exp").and_then(|exp| {
        exp.as_i64()
            .or_else(|| exp.as_f64().map(|f| f as i64))
    })
}

/// True when the token expires within the proactive-refresh threshold.
/// Tokens without a readable expiry never trigger a refresh.
pub fn needs_refresh(token: &str, now_secs: i64) -> bool {
    match decode_expiry(token) {
        Some(exp) => exp - now_secs < TOKEN_EXPIRY_THRESHOLD_SECS,
        None => false,
    }
}
