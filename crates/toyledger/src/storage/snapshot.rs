//! Whole-store JSON snapshot with photos embedded inline.
//!
//! Every change rewrites the entire blob. A byte quota stands in for the
//! capacity limit of browser storage: a write that would exceed it is
//! rejected and the in-memory state rolled back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::images;
use crate::record::{NewRecord, Photo, RecordId, ToyRecord};

use super::RecordStore;

/// Serialized shape of the snapshot blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    records_by_user: BTreeMap<String, Vec<ToyRecord>>,
}

/// Record store that persists everything as one JSON file.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    quota_bytes: usize,
    state: Mutex<Snapshot>,
}

impl SnapshotStore {
    /// Open the snapshot at `path`, starting empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SnapshotDecode`] if the file exists but is not a
    /// valid snapshot, or an I/O error if it cannot be read.
    pub fn open(path: impl AsRef<Path>, quota_bytes: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let state = match std::fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|source| Error::SnapshotDecode {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {}, starting empty", path.display());
                Snapshot::default()
            }
            Err(e) => return Err(e.into()),
        };

        info!("Snapshot opened at {}", path.display());
        Ok(Self {
            path,
            quota_bytes,
            state: Mutex::new(state),
        })
    }

    /// Get the path to the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Snapshot>> {
        self.state
            .lock()
            .map_err(|_| Error::internal("snapshot lock poisoned"))
    }

    /// Serialize `state` and write it out, enforcing the quota.
    fn persist(&self, state: &Snapshot) -> Result<()> {
        let raw = serde_json::to_vec(state)?;
        if raw.len() > self.quota_bytes {
            warn!(
                needed = raw.len(),
                limit = self.quota_bytes,
                "Snapshot quota exceeded, write rejected"
            );
            return Err(Error::StorageFull {
                needed: raw.len(),
                limit: self.quota_bytes,
            });
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &raw)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(bytes = raw.len(), "Snapshot written");
        Ok(())
    }
}

impl RecordStore for SnapshotStore {
    fn append(&self, user_id: &str, batch: Vec<NewRecord>) -> Result<Vec<ToyRecord>> {
        let created_at = Utc::now();
        let inserted: Vec<ToyRecord> = batch
            .iter()
            .map(|record| {
                ToyRecord::from_new(
                    RecordId::Uuid(Uuid::new_v4()),
                    user_id,
                    record,
                    Photo::Inline(images::to_data_url(&record.photo)),
                    created_at,
                )
            })
            .collect();

        let mut state = self.lock()?;
        let mut next = state.clone();
        let list = next.records_by_user.entry(user_id.to_string()).or_default();
        list.splice(0..0, inserted.iter().cloned());

        self.persist(&next)?;
        *state = next;

        info!(user = user_id, count = inserted.len(), "Stored upload batch");
        Ok(inserted)
    }

    fn list(&self, user_id: &str) -> Result<Vec<ToyRecord>> {
        let state = self.lock()?;
        Ok(state
            .records_by_user
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
