//! Configuration file handling.
//!
//! The configuration file is stored at `$EXPENSES_HOME/config.json`. The home directory also
//! holds the SQLite database, the read-only `categories.json` document and the `budgets.json`
//! mapping. `Config` is loaded once at process start and threaded explicitly into every
//! command; reloading the categories list requires restarting the process.

use crate::db::Db;
use crate::model::Categories;
use crate::{utils, Result};
use crate::error::{ErrorType, IntoResult};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "expenses";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const EXPENSES_SQLITE: &str = "expenses.sqlite";
const CATEGORIES_JSON: &str = "categories.json";
const BUDGETS_JSON: &str = "budgets.json";

/// The `Config` object represents the configuration of the app. You instantiate it by
/// providing the path to `$EXPENSES_HOME` and from there it loads `config.json`, opens the
/// database, and reads the categories document. It provides paths to the other items expected
/// in the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
    categories: Categories,
}

impl Config {
    /// Creates the home directory and:
    /// - Writes an initial `config.json` with default settings
    /// - Writes a `categories.json` seeded with the default category and payment-method lists
    /// - Creates and initializes the SQLite database
    ///
    /// # Errors
    /// Returns an error if the directory already contains a database, or if any file
    /// operation fails.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let inner = async {
            let maybe_relative = dir.into();
            utils::make_dir(&maybe_relative)
                .await
                .context("Unable to create the expenses home directory")?;
            let root = utils::canonicalize(&maybe_relative).await?;

            let config_path = root.join(CONFIG_JSON);
            let config_file = ConfigFile::default();
            config_file.save(&config_path).await?;

            let categories = Categories::default();
            categories.save(&root.join(CATEGORIES_JSON)).await?;

            let sqlite_path = root.join(EXPENSES_SQLITE);
            let db = Db::init(&sqlite_path)
                .await
                .context("Unable to create the SQLite database")?;

            anyhow::Ok(Self {
                root,
                config_path,
                config_file,
                db,
                sqlite_path,
                categories,
            })
        };
        inner.await.pub_result(ErrorType::Config)
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load the config file
    /// - open the database, migrating the schema if needed
    /// - load the categories document (defaults when the file is absent)
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let inner = async {
            let maybe_relative = home.into();
            let root = utils::canonicalize(&maybe_relative)
                .await
                .context("Expenses home is missing; run `expenses init` first")?;

            let config_path = root.join(CONFIG_JSON);
            if !config_path.is_file() {
                bail!("The config file is missing '{}'", config_path.display())
            }
            let config_file = ConfigFile::load(&config_path).await?;

            let sqlite_path = root.join(EXPENSES_SQLITE);
            let db = Db::load(&sqlite_path)
                .await
                .context("Unable to load the SQLite database")?;

            let categories = Categories::load(&config_file.resolve(&root, ConfigFile::categories_rel))
                .await
                .context("Unable to load the categories document")?;

            anyhow::Ok(Self {
                root,
                config_path,
                config_file,
                db,
                sqlite_path,
                categories,
            })
        };
        inner.await.pub_result(ErrorType::Config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    /// The configured category and payment-method lists, immutable for the process lifetime.
    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    /// The path of the categories document.
    pub fn categories_path(&self) -> PathBuf {
        self.config_file.resolve(&self.root, ConfigFile::categories_rel)
    }

    /// The path of the budgets document. The document itself is re-read per operation because
    /// `set_budget` rewrites it.
    pub fn budgets_path(&self) -> PathBuf {
        self.config_file.resolve(&self.root, ConfigFile::budgets_rel)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "expenses",
///   "config_version": 1,
///   "categories_path": "categories.json",
///   "budgets_path": "budgets.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "expenses"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Path to the categories document (optional, relative to the home directory or absolute).
    /// Defaults to $EXPENSES_HOME/categories.json if not specified.
    #[serde(skip_serializing_if = "Option::is_none")]
    categories_path: Option<PathBuf>,

    /// Path to the budgets document (optional, relative to the home directory or absolute).
    /// Defaults to $EXPENSES_HOME/budgets.json if not specified.
    #[serde(skip_serializing_if = "Option::is_none")]
    budgets_path: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            categories_path: None,
            budgets_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if `app_name` is wrong.
    async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path.as_ref(), data)
            .await
            .context("Unable to write config file")
    }

    fn categories_rel(&self) -> PathBuf {
        self.categories_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(CATEGORIES_JSON))
    }

    fn budgets_rel(&self) -> PathBuf {
        self.budgets_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(BUDGETS_JSON))
    }

    /// Resolves one of the configured paths against `root` unless it is absolute.
    fn resolve(&self, root: &Path, f: impl Fn(&Self) -> PathBuf) -> PathBuf {
        let p = f(self);
        if p.is_absolute() {
            p
        } else {
            root.join(p)
        }
    }
}
