//! `toyledger` - Month-by-month toy purchases and photos for each child
//!
//! This library provides the records model, month grouping, photo ingestion,
//! the persistence backends, and the HTTP API served by the `toyledger` binary.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod grouping;
pub mod images;
pub mod ingest;
pub mod logging;
pub mod record;
pub mod server;
pub mod storage;
pub mod users;

pub use config::{Backend, Config, IngestMode};
pub use error::{Error, Result};
pub use grouping::{group_by_month, MonthGroup};
pub use ingest::{Ingestor, UploadForm};
pub use logging::init_logging;
pub use record::{MonthKey, NewRecord, Photo, PhotoData, RecordId, ToyRecord};
pub use storage::{open_store, RecordStore, SnapshotStore, SqliteStore};
pub use users::{User, USERS};
