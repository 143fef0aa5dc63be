//! Handles shared between the application shell and the components.
//!
//! The session itself lives in [`avatarai_shared::Session`]; this module only
//! wraps the database so every component can reach local storage through one
//! lock.

use std::path::Path;
use std::sync::{Arc, Mutex};

use avatarai_store::Database;

use crate::error::{ClientError, Result};

/// Shared handle to the local database.
#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Database>>,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Open the database in `dir`, or in the platform data directory.
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        let db = match dir {
            Some(dir) => Database::open_in_dir(dir)?,
            None => Database::new()?,
        };
        Ok(Self::new(db))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Run `f` with the database locked. Never hold the lock across an await.
    pub fn with<T>(&self, f: impl FnOnce(&Database) -> avatarai_store::Result<T>) -> Result<T> {
        let guard = self.db.lock().map_err(|_| ClientError::LockPoisoned)?;
        Ok(f(&guard)?)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}
