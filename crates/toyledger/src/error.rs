//! Error types for toyledger.
//!
//! Every fallible operation in the crate returns [`Result`]. The HTTP layer
//! maps these variants onto status codes; see [`Error::is_client_error`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for toyledger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// Writing the snapshot would exceed its configured quota.
    #[error("storage quota exceeded: snapshot needs {needed} bytes, limit is {limit}")]
    StorageFull {
        /// Size of the serialized snapshot that was rejected.
        needed: usize,
        /// Configured quota in bytes.
        limit: usize,
    },

    /// The persisted snapshot could not be read back.
    #[error("failed to read snapshot at {path}, please retry: {source}")]
    SnapshotDecode {
        /// Path to the snapshot file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Input Errors ===
    /// A submitted form was missing a field or carried an invalid value.
    #[error("{0}")]
    Validation(String),

    /// The user id is not one of the known profiles.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// An uploaded photo could not be decoded or re-encoded.
    #[error("failed to process photo '{file_name}', please retry: {message}")]
    Photo {
        /// Name of the uploaded file.
        file_name: String,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for toyledger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a photo processing error.
    #[must_use]
    pub fn photo(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Photo {
            file_name: file_name.into(),
            message: message.into(),
        }
    }

    /// Check if this error was caused by the caller's input rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Photo { .. })
    }

    /// Check if this error indicates an unknown user.
    #[must_use]
    pub fn is_unknown_user(&self) -> bool {
        matches!(self, Self::UnknownUser(_))
    }

    /// Check if this error indicates the snapshot quota was hit.
    #[must_use]
    pub fn is_storage_full(&self) -> bool {
        matches!(self, Self::StorageFull { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = Error::validation("month required");
        assert_eq!(err.to_string(), "month required");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unknown_user() {
        let err = Error::UnknownUser("nobody".to_string());
        assert_eq!(err.to_string(), "unknown user: nobody");
        assert!(err.is_unknown_user());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_photo_error_is_client_error() {
        let err = Error::photo("toy.png", "unsupported format");
        let msg = err.to_string();
        assert!(msg.contains("toy.png"));
        assert!(msg.contains("retry"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_storage_full() {
        let err = Error::StorageFull {
            needed: 6_000_000,
            limit: 5_000_000,
        };
        assert!(err.is_storage_full());
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("5000000"));
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_snapshot_decode_display() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = Error::SnapshotDecode {
            path: PathBuf::from("/tmp/records.json"),
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/records.json"));
        assert!(msg.contains("retry"));
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "jpeg_quality out of range".to_string(),
        };
        assert!(err.to_string().contains("jpeg_quality"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
