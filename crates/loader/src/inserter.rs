//! Batch writes against a verified store handle.

use std::sync::Arc;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, info};

use crate::connection::StoreHandle;
use crate::driver::StoreDriver;
use crate::errors::{DriverError, InsertError};
use crate::models::{BatchResult, Record, Target, ensure_homogeneous};

/// Writes homogeneous batches of records, one driver call per batch.
///
/// No retries happen here. Calls against the same handle are serialized by the
/// `&mut` borrow; distinct handles may be written concurrently.
pub struct BatchInserter<D> {
    driver: Arc<D>,
}

impl<D: StoreDriver> BatchInserter<D> {
    pub fn new(driver: D) -> Self {
        Self::from_shared(Arc::new(driver))
    }

    pub fn from_shared(driver: Arc<D>) -> Self {
        Self { driver }
    }

    /// Inserts `records` within the store's configured timeout.
    pub async fn insert_batch(
        &self,
        handle: &mut StoreHandle<D::Connection>,
        target: &Target,
        records: &[Record],
    ) -> Result<BatchResult, InsertError> {
        let deadline = handle.deadline();
        self.insert_batch_until(handle, target, records, deadline).await
    }

    /// Inserts `records` as one batch, giving up at `deadline`.
    ///
    /// The handle must be verified. An empty batch succeeds with a count of zero
    /// without touching the store. A failed insert leaves the handle open.
    pub async fn insert_batch_until(
        &self,
        handle: &mut StoreHandle<D::Connection>,
        target: &Target,
        records: &[Record],
        deadline: Instant,
    ) -> Result<BatchResult, InsertError> {
        let store = handle.label().to_string();
        let state = handle.state();
        let Some(connection) = handle.verified_connection() else {
            return Err(InsertError::InvalidState { store, state });
        };

        if records.is_empty() {
            debug!(store = %store, "Empty batch; nothing to insert");
            return Ok(BatchResult { count: 0 });
        }

        target.validate()?;
        ensure_homogeneous(records)?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        debug!(store = %store, target = %target, records = records.len(), "Inserting batch");

        let insert = self.driver.insert_many(connection, target, records, remaining);
        let outcome = timeout_at(deadline, insert).await;

        match outcome {
            Ok(Ok(count)) => {
                info!("Inserted {} records into {} on {}", count, target, store);
                Ok(BatchResult { count })
            }
            Ok(Err(DriverError::Rejected { committed, reason })) if committed > 0 => {
                Err(InsertError::Partial {
                    store,
                    committed,
                    attempted: records.len(),
                    reason,
                })
            }
            Ok(Err(DriverError::Rejected { reason, .. })) => {
                Err(InsertError::Rejected { store, reason })
            }
            Ok(Err(DriverError::Timeout)) | Err(_) => Err(InsertError::Timeout { store }),
            Ok(Err(e)) => Err(InsertError::Rejected {
                store,
                reason: e.to_string(),
            }),
        }
    }
}
