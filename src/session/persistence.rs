//! Conversation id persistence
//!
//! The conversation store keeps the active conversation id behind the
//! [`KeyValueStore`] interface so a restart resumes the same backend
//! conversation. [`SledStore`] is the on-disk implementation used by the
//! CLI; [`MemoryStore`] keeps everything in process.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use sled::Db;
use uuid::Uuid;

use crate::error::{Result, TripPlannerError};

/// Key under which the active conversation id is stored
pub const CONVERSATION_ID_KEY: &str = "conversation_id";

/// Minimal string key-value persistence
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn clear(&self, key: &str) -> Result<()>;
}

/// In-process store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| TripPlannerError::Persistence("memory store lock poisoned".to_string()).into())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Embedded on-disk store backed by `sled`
pub struct SledStore {
    db: Db,
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore").finish_non_exhaustive()
    }
}

impl SledStore {
    /// Open or create the store at `path`
    ///
    /// # Errors
    ///
    /// Returns `TripPlannerError::Persistence` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```
    /// use tripplanner::session::persistence::{KeyValueStore, SledStore};
    ///
    /// # fn main() -> tripplanner::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = SledStore::open(dir.path().join("session"))?;
    /// store.set("conversation_id", "abc")?;
    /// assert_eq!(store.get("conversation_id")?.as_deref(), Some("abc"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| {
            TripPlannerError::Persistence(format!(
                "Failed to open session store at {}: {}",
                path.display(),
                e
            ))
        })?;
        tracing::debug!("Opened session store at {}", path.display());
        Ok(Self { db })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    TripPlannerError::Persistence(format!("Stored value for {} is not UTF-8: {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        self.db.remove(key.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

/// Generate a fresh client-side conversation id
pub fn generate_conversation_id() -> String {
    Uuid::new_v4().to_string()
}
