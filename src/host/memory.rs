//! In-memory [`StorageHost`].
//!
//! Backs the warning and DevTools flags when no synced storage is
//! available (headless embedding, tests).

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::Result;

use super::StorageHost;

/// Key-value store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<FxHashMap<String, Value>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored pair.
    #[must_use]
    pub fn snapshot(&self) -> FxHashMap<String, Value> {
        self.items.lock().clone()
    }
}

#[async_trait]
impl StorageHost for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.items.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.items.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.items.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.lock().keys().cloned().collect())
    }
}
