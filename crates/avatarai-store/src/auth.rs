//! Persisted auth state: access token, refresh token and the user record.
//!
//! The access token lives in local storage and is mirrored into two cookies
//! with a 24 hour max-age so that requests made outside the API client
//! (blob URLs, the stream upgrade) can still authenticate.

use avatarai_shared::constants::{
    ACCESS_TOKEN_COOKIE, ACCESS_TOKEN_KEY, LEGACY_TOKEN_COOKIE, REFRESH_TOKEN_KEY,
    TOKEN_COOKIE_MAX_AGE_SECS, USER_KEY,
};
use avatarai_shared::User;

use crate::database::Database;
use crate::error::Result;

impl Database {
    pub fn store_token(&self, token: &str) -> Result<()> {
        self.set_item(ACCESS_TOKEN_KEY, token)?;
        self.set_cookie(ACCESS_TOKEN_COOKIE, token, TOKEN_COOKIE_MAX_AGE_SECS)?;
        self.set_cookie(LEGACY_TOKEN_COOKIE, token, TOKEN_COOKIE_MAX_AGE_SECS)?;
        Ok(())
    }

    pub fn get_stored_token(&self) -> Result<Option<String>> {
        self.get_item(ACCESS_TOKEN_KEY)
    }

    pub fn store_refresh_token(&self, token: &str) -> Result<()> {
        self.set_item(REFRESH_TOKEN_KEY, token)
    }

    pub fn get_stored_refresh_token(&self) -> Result<Option<String>> {
        self.get_item(REFRESH_TOKEN_KEY)
    }

    pub fn store_user(&self, user: &User) -> Result<()> {
        let json = serde_json::to_string(user)?;
        self.set_item(USER_KEY, &json)
    }

    /// The stored user record. A record that no longer parses is removed
    /// and reported as absent.
    pub fn get_stored_user(&self) -> Result<Option<User>> {
        let Some(json) = self.get_item(USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "discarding corrupt stored user");
                self.remove_item(USER_KEY)?;
                Ok(None)
            }
        }
    }

    /// Forget every piece of auth state, tokens, user and cookies alike.
    pub fn clear_stored_auth(&self) -> Result<()> {
        self.remove_item(ACCESS_TOKEN_KEY)?;
        self.remove_item(REFRESH_TOKEN_KEY)?;
        self.remove_item(USER_KEY)?;
        self.delete_cookie(ACCESS_TOKEN_COOKIE)?;
        self.delete_cookie(LEGACY_TOKEN_COOKIE)?;
        Ok(())
    }
}
