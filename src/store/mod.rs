//! Persistence layer — seen tours and assistant settings over a pluggable
//! settings backend.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod persistence;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use memory::MemoryBackend;
pub use persistence::{PersistenceStore, keys};
pub use traits::SettingsStore;
