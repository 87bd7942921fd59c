//! `SettingsStore` trait — the async interface behind durable client settings.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// Backend-agnostic key/value settings storage.
///
/// Values are JSON documents scoped by `(user_id, key)`.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch a setting. `Ok(None)` when the key was never written.
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or overwrite a setting.
    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Remove a setting. Returns whether anything was deleted.
    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError>;
}
