//! Configuration file handling.
//!
//! The configuration file is stored at `$FINANCES_HOME/config.json` and holds the server settings:
//! the upload size limit, the listen address and the SQLite busy timeout.

use crate::db::Db;
use crate::error::Res;
use crate::utils;
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "finances";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const FINANCES_SQLITE: &str = "finances.sqlite";
pub(crate) const DEFAULT_MAX_UPLOAD_MB: f64 = 5.0;
pub(crate) const DEFAULT_BIND: &str = "0.0.0.0:5000";
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$FINANCES_HOME` and from there it loads `$FINANCES_HOME/config.json` and opens the
/// SQLite database that lives next to it.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the data directory and:
    /// - Creates an initial `config.json` file with the given settings
    /// - Creates the SQLite database and its schema
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/finances`
    /// - `max_upload_mb` - The largest upload the server accepts, in megabytes
    /// - `bind` - The address the server listens on
    ///
    /// # Errors
    /// - Returns an error if the directory already holds a config file or any file operation
    ///   fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        max_upload_mb: f64,
        bind: SocketAddr,
    ) -> Res<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the finances home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "The finances home is already initialized '{}'",
                config_path.display()
            );
        }

        let config_file = ConfigFile {
            max_upload_mb,
            bind,
            ..ConfigFile::default()
        };
        config_file.validate()?;
        config_file.save(&config_path).await?;

        let sqlite_path = root.join(FINANCES_SQLITE);
        let db = Db::init(&sqlite_path, config_file.busy_timeout())
            .await
            .context("Unable to create SQLite DB")?;

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    /// This will
    /// - validate that `finances_home` exists and that the config file exists
    /// - load and validate the config file
    /// - open the SQLite database, migrating it if needed
    /// - return the loaded configuration object
    pub async fn load(finances_home: impl Into<PathBuf>) -> Res<Self> {
        let maybe_relative = finances_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Finances home is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let sqlite_path = root.join(FINANCES_SQLITE);
        let db = Db::load(&sqlite_path, config_file.busy_timeout())
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    pub fn max_upload_mb(&self) -> f64 {
        self.config_file.max_upload_mb
    }

    /// The upload limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.config_file.max_upload_bytes()
    }

    pub fn bind(&self) -> SocketAddr {
        self.config_file.bind
    }

    pub fn busy_timeout(&self) -> Duration {
        self.config_file.busy_timeout()
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "finances",
///   "config_version": 1,
///   "max_upload_mb": 5.0,
///   "bind": "0.0.0.0:5000",
///   "busy_timeout_secs": 5
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "finances"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Largest accepted upload, in megabytes
    #[serde(default = "default_max_upload_mb")]
    max_upload_mb: f64,

    /// Address the HTTP server listens on
    #[serde(default = "default_bind")]
    bind: SocketAddr,

    /// How long a storage call waits on a locked database before failing
    #[serde(default = "default_busy_timeout_secs")]
    busy_timeout_secs: u64,
}

fn default_max_upload_mb() -> f64 {
    DEFAULT_MAX_UPLOAD_MB
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_busy_timeout_secs() -> u64 {
    DEFAULT_BUSY_TIMEOUT_SECS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            max_upload_mb: default_max_upload_mb(),
            bind: default_bind(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it fails validation
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;
        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Res<()> {
        ensure!(
            self.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            self.app_name
        );
        ensure!(
            self.max_upload_mb.is_finite() && self.max_upload_mb > 0.0,
            "Invalid max_upload_mb in config file: must be a positive number, got {}",
            self.max_upload_mb
        );
        Ok(())
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb * 1024.0 * 1024.0) as usize
    }

    fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}
