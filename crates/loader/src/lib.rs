//! Bulk seed loading for remote data stores.
//!
//! This crate opens and verifies connections to one or more stores, writes a
//! homogeneous batch of records to one of them, and tears every connection down
//! again. Stores are reached through the [`driver::StoreDriver`] contract, so the
//! same lifecycle works against PostgreSQL or the in-memory driver.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use loader::prelude::*;
//!
//! let driver = MemoryDriver::new();
//! let connections = ConnectionManager::new(driver.clone());
//! let inserter = BatchInserter::new(driver);
//!
//! let mut handles = connections.open_all(&[StoreConfig::new("memory://primary")]).await?;
//! let result = inserter
//!     .insert_batch(&mut handles[0], &Target::new("elemental", "monsters")?, &records)
//!     .await;
//! connections.close_all(&mut handles).await;
//! ```

pub mod config;
pub mod connection;
pub mod driver;
pub mod errors;
pub mod inserter;
pub mod models;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::{DEFAULT_TIMEOUT, StoreConfig};
    pub use crate::connection::{ConnectionManager, HandleState, StoreHandle};
    pub use crate::driver::{MemoryDriver, PostgresDriver, StoreDriver};
    pub use crate::errors::{
        ConfigError, ConnectionError, ConnectionFailure, DriverError, InsertError, Stage,
    };
    pub use crate::inserter::BatchInserter;
    pub use crate::models::{BatchResult, FieldType, FieldValue, Record, Schema, Target};
}
