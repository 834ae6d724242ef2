//! Storage layer for toyledger.
//!
//! Records live behind the [`RecordStore`] trait. Two backends implement it:
//!
//! - [`SqliteStore`]: an append-only `SQLite` table, photos written to an
//!   upload directory and referenced by path
//! - [`SnapshotStore`]: one JSON blob holding every user's records, photos
//!   embedded as `data:` URLs

pub mod migrations;
pub mod schema;
mod snapshot;
mod sqlite;

use std::sync::Arc;

use crate::config::{Backend, Config};
use crate::error::Result;
use crate::record::{NewRecord, ToyRecord};

pub use snapshot::SnapshotStore;
pub use sqlite::{SqliteStore, UPLOADS_PREFIX};

/// Append-only persistence for toy records.
///
/// Records are never updated or deleted once appended.
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Store a batch of records for `user_id`.
    ///
    /// Every record in the batch shares one creation timestamp. Either the
    /// whole batch is stored or none of it is.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the batch fails.
    fn append(&self, user_id: &str, batch: Vec<NewRecord>) -> Result<Vec<ToyRecord>>;

    /// All records belonging to `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be read.
    fn list(&self, user_id: &str) -> Result<Vec<ToyRecord>>;
}

/// Open the backend selected by the configuration.
///
/// # Errors
///
/// Returns an error if the backend cannot be opened.
pub fn open_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match config.storage.backend {
        Backend::Sqlite => Ok(Arc::new(SqliteStore::open(
            config.database_path(),
            config.upload_dir(),
        )?)),
        Backend::Snapshot => Ok(Arc::new(SnapshotStore::open(
            config.snapshot_path(),
            config.storage.snapshot_quota_bytes,
        )?)),
    }
}
