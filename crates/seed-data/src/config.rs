//! Configuration for seeding runs.
//!
//! A run is configured from a JSON file named by `SEED_CONFIG`, or, without one,
//! from individual `SEED_*` environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use loader::config::StoreConfig;
use loader::connection::DEFAULT_MAX_CONCURRENT_OPENS;
use loader::errors::ConfigError;
use loader::models::{Record, Target};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which store driver a run talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    #[default]
    Postgres,
    /// In-process stores; useful for dry runs.
    Memory,
}

impl FromStr for DriverKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DriverKind::Postgres),
            "memory" => Ok(DriverKind::Memory),
            other => Err(ConfigError::InvalidValue {
                key: "SEED_DRIVER",
                value: other.to_string(),
            }),
        }
    }
}

fn default_database() -> String {
    "elemental".to_string()
}

fn default_collection() -> String {
    "monsters".to_string()
}

fn default_max_concurrent_opens() -> usize {
    DEFAULT_MAX_CONCURRENT_OPENS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub driver: DriverKind,

    /// Every store is opened and verified; the batch goes to the target store.
    pub stores: Vec<StoreConfig>,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Name of the store receiving the batch. Defaults to the first store.
    #[serde(default)]
    pub target_store: Option<String>,

    /// JSON array of records to insert instead of the built-in monsters.
    #[serde(default)]
    pub records_path: Option<PathBuf>,

    #[serde(default = "default_max_concurrent_opens")]
    pub max_concurrent_opens: usize,
}

impl SeedConfig {
    pub fn new(stores: Vec<StoreConfig>) -> Self {
        Self {
            driver: DriverKind::default(),
            stores,
            database: default_database(),
            collection: default_collection(),
            target_store: None,
            records_path: None,
            max_concurrent_opens: default_max_concurrent_opens(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(path) = lookup("SEED_CONFIG") {
            return Self::load(path);
        }

        let uris = lookup("SEED_STORE_URIS").ok_or(ConfigError::Missing("SEED_STORE_URIS"))?;
        let stores = uris
            .split(',')
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
            .map(StoreConfig::new)
            .collect();

        let mut config = Self::new(stores);
        if let Some(database) = lookup("SEED_DATABASE") {
            config.database = database;
        }
        if let Some(collection) = lookup("SEED_COLLECTION") {
            config.collection = collection;
        }
        if let Some(driver) = lookup("SEED_DRIVER") {
            config.driver = driver.parse()?;
        }
        config.target_store = lookup("SEED_TARGET_STORE");
        config.records_path = lookup("SEED_RECORDS").map(PathBuf::from);

        Ok(config)
    }

    pub fn target(&self) -> Result<Target, ConfigError> {
        Target::new(self.database.clone(), self.collection.clone())
    }

    /// Position of the target store in `stores`.
    ///
    /// A named target matches a store's name or its credential-free label.
    pub fn target_index(&self) -> Result<usize, ConfigError> {
        if self.stores.is_empty() {
            return Err(ConfigError::NoStores);
        }

        match &self.target_store {
            None => Ok(0),
            Some(wanted) => self
                .stores
                .iter()
                .position(|store| {
                    store.name.as_deref() == Some(wanted.as_str()) || store.label() == *wanted
                })
                .ok_or_else(|| ConfigError::UnknownTargetStore(wanted.clone())),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stores.is_empty() {
            return Err(ConfigError::NoStores);
        }
        for (index, store) in self.stores.iter().enumerate() {
            store.validate(index)?;
        }
        self.target()?;
        self.target_index()?;
        Ok(())
    }
}

/// Reads a JSON array of flat objects into records.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<Record>, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let values: Vec<Value> = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    values
        .iter()
        .enumerate()
        .map(|(index, value)| Record::from_json(index, value))
        .collect()
}
