//! In-memory `SettingsStore` — used when no database path is configured and
//! throughout the tests.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::store::traits::SettingsStore;

/// HashMap-backed settings store.
///
/// `set_unavailable(true)` makes every call fail, which is how tests model a
/// broken or full storage quota.
#[derive(Default)]
pub struct MemoryBackend {
    values: RwLock<HashMap<(String, String), serde_json::Value>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated storage failure.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful `set_setting` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Seed a raw value, bypassing the write counter. Handy for corrupt-data tests.
    pub fn seed(&self, user_id: &str, key: &str, value: serde_json::Value) {
        if let Ok(mut values) = self.values.write() {
            values.insert((user_id.to_string(), key.to_string()), value);
        }
    }

    fn check_available(&self) -> Result<(), DatabaseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("memory backend disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryBackend {
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        self.check_available()?;
        let values = self
            .values
            .read()
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;
        Ok(values
            .get(&(user_id.to_string(), key.to_string()))
            .cloned())
    }

    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        self.check_available()?;
        let mut values = self
            .values
            .write()
            .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;
        values.insert((user_id.to_string(), key.to_string()), value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError> {
        self.check_available()?;
        let mut values = self
            .values
            .write()
            .map_err(|e| DatabaseError::Query(format!("delete_setting: {e}")))?;
        Ok(values
            .remove(&(user_id.to_string(), key.to_string()))
            .is_some())
    }
}
