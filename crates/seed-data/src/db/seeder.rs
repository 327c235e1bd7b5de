//! Seeding run orchestration.

use std::sync::Arc;

use loader::connection::ConnectionManager;
use loader::driver::StoreDriver;
use loader::errors::{ConfigError, ConnectionError, InsertError};
use loader::inserter::BatchInserter;
use loader::models::{Record, Target, ensure_homogeneous};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::config::SeedConfig;

/// Failed seeding run; the failing stage is the message, details are in the source.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid seed configuration")]
    Config(#[from] ConfigError),
    #[error("store setup failed")]
    Connection(#[from] ConnectionError),
    #[error("insert failed")]
    Insert(#[from] InsertError),
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct SeedSummary {
    pub stores_opened: usize,
    pub target_store: String,
    pub target: Target,
    pub inserted: u64,
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
}

/// Runs a seed: open all stores, insert into the target, close all stores.
pub struct Seeder<D> {
    connections: ConnectionManager<D>,
    inserter: BatchInserter<D>,
}

impl<D: StoreDriver> Seeder<D> {
    /// Creates a new seeder talking to stores through `driver`.
    pub fn new(driver: D) -> Self {
        let driver = Arc::new(driver);
        Self {
            connections: ConnectionManager::from_shared(driver.clone()),
            inserter: BatchInserter::from_shared(driver),
        }
    }

    /// Sets how many stores are opened at the same time.
    pub fn with_max_concurrent_opens(mut self, limit: usize) -> Self {
        self.connections = self.connections.with_max_concurrent_opens(limit);
        self
    }

    /// Seeds `records` into the configured target store.
    ///
    /// Configuration and batch shape are checked before any store is contacted.
    /// Once the stores are open, every one of them is closed before this returns,
    /// on success and on failure alike.
    pub async fn seed(
        &self,
        config: &SeedConfig,
        records: &[Record],
    ) -> Result<SeedSummary, SeedError> {
        config.validate()?;
        let target = config.target()?;
        let target_index = config.target_index()?;
        ensure_homogeneous(records)?;

        let started_at = OffsetDateTime::now_utc();
        info!(
            "Seeding {} records into {} across {} stores...",
            records.len(),
            target,
            config.stores.len()
        );

        let mut handles = self.connections.open_all(&config.stores).await?;

        let (target_store, outcome) = match handles.get_mut(target_index) {
            Some(handle) => {
                let label = handle.label().to_string();
                let outcome = self.inserter.insert_batch(handle, &target, records).await;
                (label, outcome.map_err(SeedError::from))
            }
            None => (
                String::new(),
                Err(ConfigError::UnknownTargetStore(target_index.to_string()).into()),
            ),
        };

        self.connections.close_all(&mut handles).await;
        info!("Disconnected from {} stores", handles.len());

        let result = outcome?;

        Ok(SeedSummary {
            stores_opened: handles.len(),
            target_store,
            target,
            inserted: result.count,
            started_at,
            finished_at: OffsetDateTime::now_utc(),
        })
    }
}
