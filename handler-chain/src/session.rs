//! Per-update session storage, filled and persisted by the session middleware.

use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Decoded session contents.
pub type SessionData = serde_json::Map<String, Value>;

/// Key/value store shared by every link inside the session middleware.
#[derive(Debug, Default)]
pub struct Session {
    data: Mutex<SessionData>,
}

impl Session {
    pub fn new(data: SessionData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionData> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Value under `key`, or `None` when absent or of another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lock().get(key)?.clone();
        serde_json::from_value(value).ok()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> serde_json::Result<()> {
        let value = serde_json::to_value(value)?;
        self.lock().insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> SessionData {
        self.lock().clone()
    }
}
