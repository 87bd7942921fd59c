//! libSQL backend — durable `SettingsStore` on a local file or `:memory:`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{info, warn};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::SettingsStore;

/// libSQL settings backend.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        info!(path = %path.display(), "Settings database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl SettingsStore for LibSqlBackend {
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT value FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value_str: String = row.get(0).unwrap_or_else(|_| "null".to_string());
                // Corrupt rows read back as null so callers fall back to defaults.
                let value = serde_json::from_str(&value_str).unwrap_or_else(|e| {
                    warn!(key, error = %e, "Stored setting is not valid JSON");
                    serde_json::Value::Null
                });
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let value_str = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO settings (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![user_id, key, value_str, now],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;

        Ok(())
    }

    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute(
                "DELETE FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_setting: {e}")))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn settings_crud() {
        let db = test_db().await;
        let value = serde_json::json!({"main": true, "chat": false});

        db.set_setting("user1", "seenTours", &value).await.unwrap();
        let fetched = db
            .get_setting("user1", "seenTours")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched["main"], true);
        assert_eq!(fetched["chat"], false);

        // Upsert
        db.set_setting("user1", "seenTours", &serde_json::json!({"chat": true}))
            .await
            .unwrap();
        let fetched = db
            .get_setting("user1", "seenTours")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, serde_json::json!({"chat": true}));

        assert!(db.delete_setting("user1", "seenTours").await.unwrap());
        assert!(db.get_setting("user1", "seenTours").await.unwrap().is_none());
        assert!(!db.delete_setting("user1", "seenTours").await.unwrap());
    }

    #[tokio::test]
    async fn settings_get_nonexistent() {
        let db = test_db().await;
        assert!(db.get_setting("nobody", "nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_row_reads_as_null() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO settings (user_id, key, value) VALUES ('u', 'seenTours', '{not json')",
                (),
            )
            .await
            .unwrap();

        let value = db.get_setting("u", "seenTours").await.unwrap();
        assert_eq!(value, Some(serde_json::Value::Null));
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("tours.db");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.set_setting("default", "assistantName", &serde_json::json!("Ada"))
                .await
                .unwrap();
        }
        assert!(path.exists());

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let name = db
            .get_setting("default", "assistantName")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(name, "Ada");
    }
}
