//! Configuration file handling for the ledger.
//!
//! The configuration file is stored at `$LEDGER_HOME/config.json`. It names the app, its version
//! and, optionally, where the SQLite database lives.

use crate::db::Db;
use crate::error::{ErrorKind, IntoResult, WrapErr};
use crate::{utils, Result};
use anyhow::{anyhow, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "ledger";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const LEDGER_SQLITE: &str = "ledger.sqlite";

/// The loaded ledger home: its paths and an open database.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    sqlite_path: PathBuf,
    db: Db,
}

impl Config {
    /// Creates the ledger home directory (if needed), writes an initial `config.json` and creates
    /// an empty database.
    ///
    /// # Errors
    /// - Returns an error if `dir` already holds a `config.json` or a database, or if any file
    ///   operation fails.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .wrap_err("Unable to create the ledger home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            return Err(anyhow!(
                "A config file already exists at '{}'",
                config_path.display()
            ))
            .pub_result(ErrorKind::Config);
        }

        let config_file = ConfigFile::default();
        let sqlite_path = config_file.sqlite_path(&root);
        let db = Db::init(&sqlite_path)
            .await
            .wrap_err("Unable to create SQLite DB")?;
        config_file.save(&config_path).await?;
        debug!("Created ledger home at {}", root.display());

        Ok(Self {
            root,
            config_path,
            config_file,
            sqlite_path,
            db,
        })
    }

    /// This will
    /// - validate that `ledger_home` exists and holds a config file
    /// - load the config file
    /// - open the database, migrating its schema forward if needed
    pub async fn load(ledger_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = ledger_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .wrap_err("Ledger home is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            return Err(anyhow!(
                "The config file is missing '{}'",
                config_path.display()
            ))
            .pub_result(ErrorKind::Config);
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let sqlite_path = config_file.sqlite_path(&root);
        let db = Db::load(&sqlite_path)
            .await
            .wrap_err("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            config_path,
            config_file,
            sqlite_path,
            db,
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

    pub fn config_version(&self) -> u8 {
        self.config_file.config_version
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "ledger",
///   "config_version": 1,
///   "sqlite_path": "ledger.sqlite"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Always "ledger"
    app_name: String,

    config_version: u8,

    /// Relative paths are resolved against the ledger home. Defaults to `ledger.sqlite`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sqlite_path: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sqlite_path: None,
        }
    }
}

impl ConfigFile {
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;
        let config = parse_config(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))
            .pub_result(ErrorKind::Config)?;
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self)
            .context("Unable to serialize config")
            .pub_result(ErrorKind::Config)?;
        utils::write(path, data)
            .await
            .wrap_err("Unable to write config file")
    }

    fn sqlite_path(&self, root: &Path) -> PathBuf {
        match &self.sqlite_path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => root.join(LEDGER_SQLITE),
        }
    }
}

fn parse_config(content: &str) -> anyhow::Result<ConfigFile> {
    let config: ConfigFile = serde_json::from_str(content)?;
    ensure!(
        config.app_name == APP_NAME,
        "Invalid app_name in config file: expected '{}', got '{}'",
        APP_NAME,
        config.app_name
    );
    Ok(config)
}
