//! Configuration management for toyledger.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "toyledger";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "toyledger.db";

/// Default snapshot file name.
const SNAPSHOT_FILE_NAME: &str = "records.json";

/// Default upload directory name.
const UPLOAD_DIR_NAME: &str = "uploads";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. The bare `PORT` environment variable (server port only)
/// 2. Environment variables prefixed with `TOYLEDGER_`, `__` between sections
/// 3. TOML config file at `~/.config/toyledger/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Photo ingestion configuration.
    pub ingest: IngestConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Maximum accepted request body size in bytes.
    pub max_upload_bytes: usize,
    /// Maximum number of photos in one upload.
    pub max_photos_per_upload: usize,
}

/// Which persistence backend holds the records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// `SQLite` table plus an on-disk upload directory.
    #[default]
    Sqlite,
    /// A single JSON blob with photos embedded inline.
    Snapshot,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Active backend.
    pub backend: Backend,
    /// Path to the database file.
    /// Defaults to `~/.local/share/toyledger/toyledger.db`
    pub database_path: Option<PathBuf>,
    /// Directory uploaded photos are written to and served from.
    /// Defaults to `~/.local/share/toyledger/uploads`
    pub upload_dir: Option<PathBuf>,
    /// Path to the snapshot blob.
    /// Defaults to `~/.local/share/toyledger/records.json`
    pub snapshot_path: Option<PathBuf>,
    /// Largest snapshot blob that may be written, in bytes.
    pub snapshot_quota_bytes: usize,
}

/// How strict the upload form is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// A month and at least one photo; everything else optional.
    #[default]
    Quick,
    /// A full date, name, amount and at least one photo.
    Itemized,
}

/// Photo ingestion configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Required-field rules for uploads.
    pub mode: IngestMode,
    /// Downscale and recompress photos before storing them.
    /// Unset means: on for the snapshot backend, off for `SQLite`.
    pub downscale: Option<bool>,
    /// Maximum photo width after downscaling, in pixels.
    pub max_width: u32,
    /// JPEG quality used when recompressing (1-100).
    pub jpeg_quality: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            max_upload_bytes: 50 * 1024 * 1024,
            max_photos_per_upload: 20,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            database_path: None, // Will be resolved to default at runtime
            upload_dir: None,
            snapshot_path: None,
            snapshot_quota_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            mode: IngestMode::Quick,
            downscale: None,
            max_width: 1280,
            jpeg_quality: 78,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("TOYLEDGER_").split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_photos_per_upload == 0 {
            return Err(Error::ConfigValidation {
                message: "max_photos_per_upload must be greater than 0".to_string(),
            });
        }

        if self.server.max_upload_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "max_upload_bytes must be greater than 0".to_string(),
            });
        }

        if self.storage.snapshot_quota_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "snapshot_quota_bytes must be greater than 0".to_string(),
            });
        }

        if self.ingest.max_width == 0 {
            return Err(Error::ConfigValidation {
                message: "max_width must be greater than 0".to_string(),
            });
        }

        if !(1..=100).contains(&self.ingest.jpeg_quality) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "jpeg_quality must be between 1 and 100, got {}",
                    self.ingest.jpeg_quality
                ),
            });
        }

        Ok(())
    }

    /// Get the socket address the server binds to.
    ///
    /// # Errors
    ///
    /// Returns an error if `server.host` is not a valid IP address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| Error::ConfigValidation {
                message: format!("invalid listen address: {}", self.server.host),
            })
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the upload directory, resolving defaults if not set.
    #[must_use]
    pub fn upload_dir(&self) -> PathBuf {
        self.storage
            .upload_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(UPLOAD_DIR_NAME))
    }

    /// Get the snapshot path, resolving defaults if not set.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.storage
            .snapshot_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SNAPSHOT_FILE_NAME))
    }

    /// Whether photos are downscaled, resolving the backend default if unset.
    #[must_use]
    pub fn downscale_enabled(&self) -> bool {
        self.ingest
            .downscale
            .unwrap_or(self.storage.backend == Backend::Snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.port, 8787);
        assert_eq!(config.server.max_photos_per_upload, 20);
        assert_eq!(config.storage.backend, Backend::Sqlite);
        assert_eq!(config.ingest.mode, IngestMode::Quick);
    }

    #[test]
    fn test_default_ingest_config() {
        let ingest = IngestConfig::default();

        assert!(ingest.downscale.is_none());
        assert_eq!(ingest.max_width, 1280);
        assert_eq!(ingest.jpeg_quality, 78);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_photos() {
        let mut config = Config::default();
        config.server.max_photos_per_upload = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_photos_per_upload"));
    }

    #[test]
    fn test_validate_zero_quota() {
        let mut config = Config::default();
        config.storage.snapshot_quota_bytes = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("snapshot_quota_bytes"));
    }

    #[test]
    fn test_validate_jpeg_quality_range() {
        let mut config = Config::default();
        config.ingest.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.ingest.jpeg_quality = 101;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("jpeg_quality"));

        config.ingest.jpeg_quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_width() {
        let mut config = Config::default();
        config.ingest.max_width = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_width"));
    }

    #[test]
    fn test_listen_addr() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9000;

        let addr = config.listen_addr().unwrap();
        assert_eq!(addr.port(), 9000);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_listen_addr_invalid_host() {
        let mut config = Config::default();
        config.server.host = "not an ip".to_string();

        assert!(config.listen_addr().is_err());
    }

    #[test]
    fn test_paths_default() {
        let config = Config::default();

        assert!(config.database_path().ends_with("toyledger/toyledger.db"));
        assert!(config.upload_dir().ends_with("toyledger/uploads"));
        assert!(config.snapshot_path().ends_with("toyledger/records.json"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_downscale_follows_backend() {
        let mut config = Config::default();
        assert!(!config.downscale_enabled());

        config.storage.backend = Backend::Snapshot;
        assert!(config.downscale_enabled());

        config.ingest.downscale = Some(false);
        assert!(!config.downscale_enabled());
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(Backend::Sqlite.to_string(), "sqlite");
        assert_eq!(Backend::Snapshot.to_string(), "snapshot");
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("toyledger"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    /// Load `config.toml` from the jail directory, which may not exist.
    fn load_in(jail: &Jail) -> figment::error::Result<Config> {
        Config::load_from(Some(jail.directory().join("config.toml")))
            .map_err(|e| e.to_string().into())
    }

    #[test]
    fn test_load_nonexistent_config() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config = load_in(jail)?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                "config.toml",
                "[storage]\nbackend = \"snapshot\"\nsnapshot_quota_bytes = 1024\n\n[ingest]\nmode = \"itemized\"\n",
            )?;

            let config = load_in(jail)?;
            assert_eq!(config.storage.backend, Backend::Snapshot);
            assert_eq!(config.storage.snapshot_quota_bytes, 1024);
            assert_eq!(config.ingest.mode, IngestMode::Itemized);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("config.toml", "[ingest]\njpeg_quality = 0\n")?;

            let err = Config::load_from(Some(jail.directory().join("config.toml"))).unwrap_err();
            assert!(matches!(err, Error::ConfigValidation { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_port_env_sets_server_port() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("PORT", "9123");

            assert_eq!(load_in(jail)?.server.port, 9123);
            Ok(())
        });
    }

    #[test]
    fn test_port_env_wins_over_prefixed_port() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("config.toml", "[server]\nport = 7000\n")?;
            jail.set_env("TOYLEDGER_SERVER__PORT", "8000");
            assert_eq!(load_in(jail)?.server.port, 8000);

            jail.set_env("PORT", "9123");
            assert_eq!(load_in(jail)?.server.port, 9123);
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_sets_nested_keys() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("config.toml", "[storage]\nbackend = \"sqlite\"\n")?;
            jail.set_env("TOYLEDGER_STORAGE__BACKEND", "snapshot");
            jail.set_env("TOYLEDGER_INGEST__MAX_WIDTH", "640");

            let config = load_in(jail)?;
            assert_eq!(config.storage.backend, Backend::Snapshot);
            assert_eq!(config.ingest.max_width, 640);
            assert!(config.downscale_enabled());
            Ok(())
        });
    }

    #[test]
    fn test_non_numeric_port_env_is_rejected() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("PORT", "http");

            let err = Config::load_from(Some(jail.directory().join("config.toml"))).unwrap_err();
            assert!(matches!(err, Error::ConfigLoad(_)));
            Ok(())
        });
    }

    #[test]
    fn test_storage_config_deserialize() {
        let json = r#"{"backend": "snapshot", "snapshot_quota_bytes": 2048}"#;
        let storage: StorageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(storage.backend, Backend::Snapshot);
        assert_eq!(storage.snapshot_quota_bytes, 2048);
        assert!(storage.database_path.is_none());
    }
}
