//! # avatarai-store
//!
//! Durable client state for AvatarAI, backed by SQLite.
//!
//! Two tables stand in for the browser's persistence layers: `local_storage`
//! (a plain key/value store) and `cookies` (values with a max-age). The
//! [`Database`] handle wraps a `rusqlite::Connection` and exposes typed
//! helpers for both, plus the auth-specific accessors in [`auth`].

pub mod auth;
pub mod cookies;
pub mod database;
pub mod local_storage;
pub mod migrations;
pub mod models;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
