use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Cookie;

impl Database {
    /// Store a cookie that expires `max_age_secs` from now.
    pub fn set_cookie(&self, name: &str, value: &str, max_age_secs: i64) -> Result<()> {
        let expires_at = Utc::now() + Duration::seconds(max_age_secs);
        self.put_cookie(&Cookie {
            name: name.to_string(),
            value: value.to_string(),
            expires_at: Some(expires_at),
        })
    }

    pub fn put_cookie(&self, cookie: &Cookie) -> Result<()> {
        self.conn().execute(
            "INSERT INTO cookies (name, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![
                cookie.name,
                cookie.value,
                cookie.expires_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Current value of a cookie. Expired cookies are purged and read as absent.
    pub fn get_cookie(&self, name: &str) -> Result<Option<String>> {
        let cookie = self
            .conn()
            .query_row(
                "SELECT name, value, expires_at FROM cookies WHERE name = ?1",
                params![name],
                row_to_cookie,
            )
            .optional()?;

        match cookie {
            Some(c) if c.is_expired(Utc::now()) => {
                tracing::debug!(name, "cookie expired");
                self.delete_cookie(name)?;
                Ok(None)
            }
            Some(c) => Ok(Some(c.value)),
            None => Ok(None),
        }
    }

    pub fn delete_cookie(&self, name: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM cookies WHERE name = ?1", params![name])?;
        Ok(affected > 0)
    }

    /// Fetch a single cookie row including its expiry.
    pub fn cookie(&self, name: &str) -> Result<Cookie> {
        self.conn()
            .query_row(
                "SELECT name, value, expires_at FROM cookies WHERE name = ?1",
                params![name],
                row_to_cookie,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Remove every expired cookie, returning how many were dropped.
    pub fn purge_expired_cookies(&self) -> Result<usize> {
        let mut stmt = self
            .conn()
            .prepare("SELECT name, value, expires_at FROM cookies")?;
        let rows = stmt.query_map([], row_to_cookie)?;

        let now = Utc::now();
        let mut expired = Vec::new();
        for row in rows {
            let cookie = row?;
            if cookie.is_expired(now) {
                expired.push(cookie.name);
            }
        }
        for name in &expired {
            self.delete_cookie(name)?;
        }
        Ok(expired.len())
    }
}

fn row_to_cookie(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cookie> {
    let name: String = row.get(0)?;
    let value: String = row.get(1)?;
    let expires_str: Option<String> = row.get(2)?;

    let expires_at = match expires_str {
        Some(s) => Some(
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
        ),
        None => None,
    };

    Ok(Cookie {
        name,
        value,
        expires_at,
    })
}
