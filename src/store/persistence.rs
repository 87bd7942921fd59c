//! PersistenceStore — write-behind cache over a `SettingsStore`.
//!
//! Reads are served from an in-memory snapshot loaded once at startup.
//! Writes update the snapshot synchronously and mark the key dirty for a
//! background writer, so no tour transition ever waits on storage. The writer
//! always persists the snapshot's current value for a dirty key; a key whose
//! write fails stays dirty and is retried on the next write or `flush`.
//!
//! Keys that could not be read at startup are "unloaded". Before the first
//! write of such a key the writer re-reads the durable value and merges it
//! under the local one, so a seen-tours record is never replaced by a partial
//! view of it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::assistant::model::{AssistantSettings, Personality};
use crate::error::DatabaseError;
use crate::store::traits::SettingsStore;

/// Persisted setting keys. Each value is stored as its own JSON document.
pub mod keys {
    pub const SEEN_TOURS: &str = "seenTours";
    pub const ASSISTANT_VISIBLE: &str = "assistantVisible";
    pub const ASSISTANT_NAME: &str = "assistantName";
    pub const ASSISTANT_AVATAR: &str = "assistantAvatar";
    pub const ASSISTANT_PERSONALITY: &str = "assistantPersonality";

    pub const ALL: &[&str] = &[
        SEEN_TOURS,
        ASSISTANT_VISIBLE,
        ASSISTANT_NAME,
        ASSISTANT_AVATAR,
        ASSISTANT_PERSONALITY,
    ];
}

enum WriteOp {
    Dirty(String),
    Flush(oneshot::Sender<()>),
}

#[derive(Default)]
struct Snapshot {
    values: HashMap<String, serde_json::Value>,
    /// Keys whose durable value is unknown because loading them failed.
    unloaded: HashSet<String>,
}

/// Client-side persistence for seen tours and assistant settings.
pub struct PersistenceStore {
    user_id: String,
    snapshot: Arc<RwLock<Snapshot>>,
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl PersistenceStore {
    /// Load every known key from `backend` and start the writer task.
    ///
    /// Keys that fail to load read as missing until the backend recovers.
    pub async fn load(backend: Arc<dyn SettingsStore>, user_id: &str) -> Self {
        let mut snapshot = Snapshot::default();
        for key in keys::ALL {
            match backend.get_setting(user_id, key).await {
                Ok(Some(value)) => {
                    snapshot.values.insert((*key).to_string(), value);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(key, error = %e, "Failed to load setting, using default");
                    snapshot.unloaded.insert((*key).to_string());
                }
            }
        }
        debug!(
            user_id,
            loaded = snapshot.values.len(),
            unloaded = snapshot.unloaded.len(),
            "Persistence loaded"
        );

        let snapshot = Arc::new(RwLock::new(snapshot));
        let (tx, rx) = mpsc::unbounded_channel();
        Writer {
            backend,
            user_id: user_id.to_string(),
            snapshot: Arc::clone(&snapshot),
            dirty: BTreeSet::new(),
        }
        .spawn(rx);

        Self {
            user_id: user_id.to_string(),
            snapshot,
            tx,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Raw cached value for `key`.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.snapshot
            .read()
            .ok()
            .and_then(|s| s.values.get(key).cloned())
    }

    /// Store `value` under `key`. Writing the value already held is a no-op.
    pub fn set(&self, key: &str, value: serde_json::Value) {
        {
            let Ok(mut snapshot) = self.snapshot.write() else {
                warn!(key, "Settings cache poisoned, dropping write");
                return;
            };
            if snapshot.values.get(key) == Some(&value) {
                return;
            }
            snapshot.values.insert(key.to_string(), value);
        }
        self.mark_dirty(key);
    }

    /// Drop `key` locally and durably. Whatever the backend held before is
    /// discarded, even if it was never loaded.
    pub fn remove(&self, key: &str) {
        {
            let Ok(mut snapshot) = self.snapshot.write() else {
                warn!(key, "Settings cache poisoned, dropping delete");
                return;
            };
            let was_unloaded = snapshot.unloaded.remove(key);
            if snapshot.values.remove(key).is_none() && !was_unloaded {
                return;
            }
        }
        self.mark_dirty(key);
    }

    /// Wait until the writer has retried every dirty key once.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteOp::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    fn mark_dirty(&self, key: &str) {
        if self.tx.send(WriteOp::Dirty(key.to_string())).is_err() {
            warn!(key, "Settings writer stopped, change kept in memory only");
        }
    }

    fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                debug!(key, error = %e, "Stored setting has unexpected shape, using default");
                default
            }),
            None => default,
        }
    }

    fn set_typed<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => self.set(key, v),
            Err(e) => warn!(key, error = %e, "Failed to serialize setting"),
        }
    }

    // ── Seen tours ──────────────────────────────────────────────────

    /// The seen-tours record. Malformed entries are dropped; a record that
    /// is not a JSON object reads as empty.
    pub fn seen_tours(&self) -> BTreeMap<String, bool> {
        match self.get(keys::SEEN_TOURS) {
            Some(serde_json::Value::Object(map)) => map
                .into_iter()
                .filter_map(|(tour, seen)| seen.as_bool().map(|b| (tour, b)))
                .collect(),
            Some(other) => {
                debug!(value = %other, "seenTours is not an object, treating as empty");
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        }
    }

    pub fn has_seen(&self, tour: &str) -> bool {
        self.seen_tours().get(tour).copied().unwrap_or(false)
    }

    /// Record `tour` as seen. Idempotent.
    pub fn mark_seen(&self, tour: &str) {
        let mut seen = self.seen_tours();
        if seen.get(tour) == Some(&true) {
            return;
        }
        seen.insert(tour.to_string(), true);
        self.set_typed(keys::SEEN_TOURS, &seen);
        debug!(tour, "Tour marked seen");
    }

    /// Forget every seen tour.
    pub fn reset_seen(&self) {
        self.remove(keys::SEEN_TOURS);
        debug!("Seen tours reset");
    }

    // ── Assistant settings ──────────────────────────────────────────

    pub fn assistant_settings(&self) -> AssistantSettings {
        let defaults = AssistantSettings::default();
        AssistantSettings {
            visible: self.get_or(keys::ASSISTANT_VISIBLE, defaults.visible),
            name: self.get_or(keys::ASSISTANT_NAME, defaults.name),
            avatar: self.get_or(keys::ASSISTANT_AVATAR, defaults.avatar),
            personality: self.get_or(keys::ASSISTANT_PERSONALITY, defaults.personality),
        }
    }

    pub fn set_assistant_visible(&self, visible: bool) {
        self.set_typed(keys::ASSISTANT_VISIBLE, &visible);
    }

    pub fn set_assistant_name(&self, name: &str) {
        self.set_typed(keys::ASSISTANT_NAME, &name);
    }

    pub fn set_assistant_avatar(&self, avatar: &str) {
        self.set_typed(keys::ASSISTANT_AVATAR, &avatar);
    }

    pub fn set_assistant_personality(&self, personality: Personality) {
        self.set_typed(keys::ASSISTANT_PERSONALITY, &personality);
    }
}

/// Background half of the store. Owns the dirty set.
struct Writer {
    backend: Arc<dyn SettingsStore>,
    user_id: String,
    snapshot: Arc<RwLock<Snapshot>>,
    dirty: BTreeSet<String>,
}

impl Writer {
    fn spawn(mut self, mut rx: mpsc::UnboundedReceiver<WriteOp>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match op {
                    WriteOp::Dirty(key) => {
                        self.dirty.insert(key);
                        self.write_dirty().await;
                    }
                    WriteOp::Flush(done) => {
                        self.refresh_unloaded().await;
                        self.write_dirty().await;
                        let _ = done.send(());
                    }
                }
            }
            if !self.dirty.is_empty() {
                warn!(pending = self.dirty.len(), "Settings writer stopped with unsaved keys");
            }
            debug!("Settings writer stopped");
        })
    }

    /// Persist every dirty key, stopping at the first failure.
    async fn write_dirty(&mut self) {
        let keys: Vec<String> = self.dirty.iter().cloned().collect();
        for key in keys {
            match self.write_key(&key).await {
                Ok(()) => {
                    self.dirty.remove(&key);
                }
                Err(e) => {
                    warn!(
                        key = %key,
                        pending = self.dirty.len(),
                        error = %e,
                        "Failed to persist setting, will retry"
                    );
                    return;
                }
            }
        }
    }

    async fn write_key(&self, key: &str) -> Result<(), DatabaseError> {
        if self.is_unloaded(key) {
            let durable = self.backend.get_setting(&self.user_id, key).await?;
            self.absorb(key, durable);
        }
        let current = self
            .snapshot
            .read()
            .ok()
            .and_then(|s| s.values.get(key).cloned());
        match current {
            Some(value) => self.backend.set_setting(&self.user_id, key, &value).await,
            None => self
                .backend
                .delete_setting(&self.user_id, key)
                .await
                .map(|_| ()),
        }
    }

    /// Re-read keys that failed at startup so the snapshot catches up once
    /// the backend is reachable again.
    async fn refresh_unloaded(&self) {
        let unloaded: Vec<String> = match self.snapshot.read() {
            Ok(s) => s.unloaded.iter().cloned().collect(),
            Err(_) => return,
        };
        for key in unloaded {
            match self.backend.get_setting(&self.user_id, &key).await {
                Ok(durable) => self.absorb(&key, durable),
                Err(e) => {
                    debug!(key = %key, error = %e, "Settings backend still unreachable");
                    return;
                }
            }
        }
    }

    fn is_unloaded(&self, key: &str) -> bool {
        self.snapshot
            .read()
            .map(|s| s.unloaded.contains(key))
            .unwrap_or(false)
    }

    /// Fold a freshly read durable value into the snapshot. Local entries
    /// win; a key removed locally in the meantime is left alone.
    fn absorb(&self, key: &str, durable: Option<serde_json::Value>) {
        let Ok(mut snapshot) = self.snapshot.write() else {
            return;
        };
        if !snapshot.unloaded.remove(key) {
            return;
        }
        let Some(durable) = durable else {
            return;
        };
        let merged = match snapshot.values.remove(key) {
            Some(local) => merge_under(durable, local),
            None => durable,
        };
        info!(key, "Recovered setting from storage");
        snapshot.values.insert(key.to_string(), merged);
    }
}

/// `local` layered over `durable`. Objects merge entry by entry; anything
/// else is replaced by `local`.
fn merge_under(durable: serde_json::Value, local: serde_json::Value) -> serde_json::Value {
    match (durable, local) {
        (serde_json::Value::Object(mut base), serde_json::Value::Object(overlay)) => {
            base.extend(overlay);
            serde_json::Value::Object(base)
        }
        (_, local) => local,
    }
}
