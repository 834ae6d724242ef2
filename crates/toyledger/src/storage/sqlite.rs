//! `SQLite` record store with photos kept as files on disk.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::record::{MonthKey, NewRecord, Photo, RecordId, ToyRecord};

use super::{migrations, RecordStore};

/// URL prefix stored uploaded photos are served under.
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Record store backed by an `SQLite` table and an upload directory.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Directory photo files are written to.
    upload_dir: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store with its database at `path` and photos in
    /// `upload_dir`.
    ///
    /// Creates the parent directories, the upload directory and the database
    /// file if they don't exist, then brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created, the database cannot
    /// be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>, upload_dir: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let upload_dir = upload_dir.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            create_dir(parent)?;
        }
        create_dir(&upload_dir)?;

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            upload_dir,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database that still writes photos to `upload_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database or the directory cannot be created.
    pub fn open_in_memory(upload_dir: impl AsRef<Path>) -> Result<Self> {
        let upload_dir = upload_dir.as_ref().to_path_buf();
        create_dir(&upload_dir)?;

        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            upload_dir,
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the directory photos are written to.
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Count all records across every user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM toy_records", [], |row| row.get(0))?;
        Ok(count)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Write one photo file and return its public path.
    fn write_photo(&self, record: &NewRecord, created_at: DateTime<Utc>) -> Result<PathBuf> {
        let file_name = format!(
            "{}-{}{}",
            created_at.timestamp_millis(),
            Uuid::new_v4().simple(),
            record.photo.extension()
        );
        let file_path = self.upload_dir.join(file_name);
        std::fs::write(&file_path, &record.photo.bytes)?;
        Ok(file_path)
    }

    fn insert_rows(
        &self,
        user_id: &str,
        batch: &[NewRecord],
        paths: &[String],
        created_at: DateTime<Utc>,
    ) -> Result<Vec<ToyRecord>> {
        let created_at_str = created_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = Vec::with_capacity(batch.len());
        {
            let mut stmt = tx.prepare(
                r"
                INSERT INTO toy_records
                    (user_id, month, image_path, created_at, record_date, name, amount, note)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
            )?;
            for (record, path) in batch.iter().zip(paths) {
                stmt.execute(params![
                    user_id,
                    MonthKey::from(record.date).to_string(),
                    path,
                    created_at_str,
                    record.date.format("%Y-%m-%d").to_string(),
                    record.name,
                    record.amount,
                    record.note,
                ])?;
                let id = tx.last_insert_rowid();
                inserted.push(ToyRecord::from_new(
                    RecordId::Row(id),
                    user_id,
                    record,
                    Photo::Stored(path.clone()),
                    created_at,
                ));
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Convert a database row to a `ToyRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ToyRecord> {
        let id: i64 = row.get(0)?;
        let user_id: String = row.get(1)?;
        let month_str: String = row.get(2)?;
        let image_path: String = row.get(3)?;
        let created_at_str: String = row.get(4)?;
        let date_str: Option<String> = row.get(5)?;
        let name: Option<String> = row.get(6)?;
        let amount: Option<f64> = row.get(7)?;
        let note: Option<String> = row.get(8)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

        let date = date_str
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
            .or_else(|| month_str.parse::<MonthKey>().ok().map(|m| m.first_day()))
            .unwrap_or_else(|| {
                warn!(id, month = %month_str, "Unparseable record date, using creation date");
                created_at.date_naive()
            });

        Ok(ToyRecord {
            id: RecordId::Row(id),
            user_id,
            month: MonthKey::from(date),
            date,
            name,
            amount,
            note,
            photo: Photo::Stored(image_path),
            created_at,
        })
    }
}

impl RecordStore for SqliteStore {
    fn append(&self, user_id: &str, batch: Vec<NewRecord>) -> Result<Vec<ToyRecord>> {
        let created_at = Utc::now();

        let mut written: Vec<PathBuf> = Vec::with_capacity(batch.len());
        let mut paths: Vec<String> = Vec::with_capacity(batch.len());
        for record in &batch {
            match self.write_photo(record, created_at) {
                Ok(file_path) => {
                    let name = file_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    paths.push(format!("{UPLOADS_PREFIX}/{name}"));
                    written.push(file_path);
                }
                Err(e) => {
                    remove_files(&written);
                    return Err(e);
                }
            }
        }

        match self.insert_rows(user_id, &batch, &paths, created_at) {
            Ok(inserted) => {
                info!(user = user_id, count = inserted.len(), "Stored upload batch");
                Ok(inserted)
            }
            Err(e) => {
                remove_files(&written);
                Err(e)
            }
        }
    }

    fn list(&self, user_id: &str) -> Result<Vec<ToyRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, user_id, month, image_path, created_at, record_date, name, amount, note
            FROM toy_records WHERE user_id = ?1
            ORDER BY id DESC
            ",
        )?;

        let records = stmt
            .query_map([user_id], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove {} after aborted upload: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PhotoData;

    fn new_record(date: &str, file_name: &str) -> NewRecord {
        NewRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            name: None,
            amount: None,
            note: None,
            photo: PhotoData {
                file_name: file_name.to_string(),
                content_type: "image/jpeg".to_string(),
                bytes: file_name.as_bytes().to_vec(),
            },
        }
    }

    fn create_test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open_in_memory(dir.path().join("uploads")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_append_returns_one_record_per_photo() {
        let (_dir, store) = create_test_store();
        let batch = vec![
            new_record("2024-03-01", "a.png"),
            new_record("2024-03-01", "b.jpg"),
        ];

        let inserted = store.append("xiaoyuan", batch).unwrap();

        assert_eq!(inserted.len(), 2);
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(inserted[0].created_at, inserted[1].created_at);
        assert_ne!(inserted[0].id, inserted[1].id);
    }

    #[test]
    fn test_append_writes_files_under_uploads() {
        let (_dir, store) = create_test_store();
        let inserted = store
            .append("xiaoyuan", vec![new_record("2024-03-01", "car.png")])
            .unwrap();

        let Photo::Stored(path) = &inserted[0].photo else {
            panic!("expected stored photo");
        };
        assert!(path.starts_with("/uploads/"));
        assert!(path.ends_with(".png"));

        let file_name = path.trim_start_matches("/uploads/");
        let bytes = std::fs::read(store.upload_dir().join(file_name)).unwrap();
        assert_eq!(bytes, b"car.png");
    }

    #[test]
    fn test_generated_file_names_are_unique() {
        let (_dir, store) = create_test_store();
        let batch = (0..5).map(|_| new_record("2024-03-01", "same.jpg")).collect();

        let inserted = store.append("xiaoyuan", batch).unwrap();
        let mut paths: Vec<&str> = inserted.iter().map(|r| r.photo.src()).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), 5);
    }

    #[test]
    fn test_list_newest_first() {
        let (_dir, store) = create_test_store();
        store
            .append("xiaoyuan", vec![new_record("2024-01-01", "1.jpg")])
            .unwrap();
        store
            .append("xiaoyuan", vec![new_record("2023-06-01", "2.jpg")])
            .unwrap();

        let records = store.list("xiaoyuan").unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(
            (records[0].id, records[1].id),
            (RecordId::Row(a), RecordId::Row(b)) if a > b
        ));
        assert_eq!(records[0].date.to_string(), "2023-06-01");
    }

    #[test]
    fn test_list_isolated_by_user() {
        let (_dir, store) = create_test_store();
        store
            .append("xiaoyuan", vec![new_record("2024-01-01", "a.jpg")])
            .unwrap();
        store
            .append(
                "xiaoman",
                vec![
                    new_record("2024-01-01", "b.jpg"),
                    new_record("2024-01-02", "c.jpg"),
                ],
            )
            .unwrap();

        let yuan = store.list("xiaoyuan").unwrap();
        let man = store.list("xiaoman").unwrap();
        assert_eq!(yuan.len(), 1);
        assert_eq!(man.len(), 2);
        assert!(yuan.iter().all(|r| r.user_id == "xiaoyuan"));
        assert!(man.iter().all(|r| r.user_id == "xiaoman"));
    }

    #[test]
    fn test_details_round_trip() {
        let (_dir, store) = create_test_store();
        let mut record = new_record("2024-05-20", "kite.jpg");
        record.name = Some("Kite".to_string());
        record.amount = Some(25.5);
        record.note = Some("birthday".to_string());

        store.append("xiaoman", vec![record]).unwrap();
        let listed = &store.list("xiaoman").unwrap()[0];

        assert_eq!(listed.name.as_deref(), Some("Kite"));
        assert_eq!(listed.amount, Some(25.5));
        assert_eq!(listed.note.as_deref(), Some("birthday"));
        assert_eq!(listed.month.to_string(), "2024-05");
    }

    #[test]
    fn test_list_unknown_user_is_empty() {
        let (_dir, store) = create_test_store();
        assert!(store.list("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_failed_photo_write_leaves_nothing_behind() {
        let (dir, store) = create_test_store();
        std::fs::remove_dir_all(dir.path().join("uploads")).unwrap();

        let result = store.append("xiaoyuan", vec![new_record("2024-03-01", "a.jpg")]);
        assert!(result.is_err());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_open_file_based_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested/data/toyledger.db");
        let uploads = dir.path().join("nested/uploads");

        let store = SqliteStore::open(&db_path, &uploads).unwrap();
        store
            .append("xiaoyuan", vec![new_record("2024-03-01", "a.jpg")])
            .unwrap();

        assert!(db_path.exists());
        assert!(uploads.is_dir());
        assert_eq!(store.path(), db_path);
        drop(store);

        let reopened = SqliteStore::open(&db_path, &uploads).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn test_reads_rows_from_unmigrated_layout() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute(super::super::schema::CREATE_RECORDS_TABLE, [])
                .unwrap();
            conn.execute(
                "INSERT INTO toy_records (user_id, month, image_path, created_at)
                 VALUES ('xiaoman', '2023-11', '/uploads/legacy.jpg', '2023-11-05T08:00:00.000Z')",
                [],
            )
            .unwrap();
        }

        let store = SqliteStore::open(&db_path, dir.path().join("uploads")).unwrap();
        let records = store.list("xiaoman").unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date.to_string(), "2023-11-01");
        assert_eq!(records[0].photo, Photo::Stored("/uploads/legacy.jpg".to_string()));
    }
}
