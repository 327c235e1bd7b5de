//! Store driver contract.
//!
//! A [`StoreDriver`] is the only thing that talks to a store. The connection
//! manager and the batch inserter own lifecycle, deadlines and error context;
//! drivers only translate the four primitive calls into their native library.

mod memory;
mod postgres;

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::DriverError;
use crate::models::{Record, Target};

pub use memory::{MemoryConnection, MemoryDriver, StoreBehavior, StoreStats};
pub use postgres::PostgresDriver;

#[async_trait]
pub trait StoreDriver: Send + Sync + 'static {
    /// Live session with one store. Not shared between concurrent callers.
    type Connection: Send + 'static;

    async fn connect(&self, uri: &str, timeout: Duration)
    -> Result<Self::Connection, DriverError>;

    async fn ping(&self, conn: &mut Self::Connection, timeout: Duration)
    -> Result<(), DriverError>;

    /// Writes `records` as one batch and returns how many were committed.
    ///
    /// On failure the driver reports what it knows was committed through
    /// [`DriverError::Rejected`].
    async fn insert_many(
        &self,
        conn: &mut Self::Connection,
        target: &Target,
        records: &[Record],
        timeout: Duration,
    ) -> Result<u64, DriverError>;

    async fn disconnect(&self, conn: Self::Connection) -> Result<(), DriverError>;
}
