//! Store connection lifecycle.
//!
//! A [`StoreHandle`] moves through `Unverified -> Verified -> Closed`. A failed
//! verification parks it in `Failed`, from which only [`ConnectionManager::close`]
//! is valid. Every operation takes a deadline; when it expires the in-flight driver
//! call is dropped and a timeout error is returned.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::driver::StoreDriver;
use crate::errors::{ConnectionError, ConnectionFailure, Stage};

/// Stores opened at once by [`ConnectionManager::open_all`] unless overridden.
pub const DEFAULT_MAX_CONCURRENT_OPENS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Unverified,
    Verified,
    Failed,
    Closed,
}

impl HandleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleState::Unverified => "unverified",
            HandleState::Verified => "verified",
            HandleState::Failed => "failed",
            HandleState::Closed => "closed",
        }
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One live session with a store.
pub struct StoreHandle<C> {
    session_id: Uuid,
    config: StoreConfig,
    label: String,
    state: HandleState,
    connection: Option<C>,
}

impl<C> StoreHandle<C> {
    fn new(config: &StoreConfig, connection: C) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            label: config.label(),
            config: config.clone(),
            state: HandleState::Unverified,
            connection: Some(connection),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Credential-free store name for logs and errors.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_verified(&self) -> bool {
        self.state == HandleState::Verified
    }

    /// Deadline for an operation started now under the store's timeout.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.config.timeout()
    }

    /// The connection, only while the handle is verified.
    pub(crate) fn verified_connection(&mut self) -> Option<&mut C> {
        match self.state {
            HandleState::Verified => self.connection.as_mut(),
            _ => None,
        }
    }
}

impl<C> fmt::Debug for StoreHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("session_id", &self.session_id)
            .field("store", &self.label)
            .field("state", &self.state)
            .finish()
    }
}

impl<C> Drop for StoreHandle<C> {
    fn drop(&mut self) {
        if self.connection.is_some() {
            warn!(
                store = %self.label,
                session = %self.session_id,
                "Store handle dropped without close; releasing connection without disconnect"
            );
        }
    }
}

/// Opens, verifies and closes store connections through a driver.
pub struct ConnectionManager<D> {
    driver: Arc<D>,
    max_concurrent_opens: usize,
}

impl<D: StoreDriver> ConnectionManager<D> {
    pub fn new(driver: D) -> Self {
        Self::from_shared(Arc::new(driver))
    }

    pub fn from_shared(driver: Arc<D>) -> Self {
        Self {
            driver,
            max_concurrent_opens: DEFAULT_MAX_CONCURRENT_OPENS,
        }
    }

    /// Bounds how many stores [`Self::open_all`] sets up at the same time.
    pub fn with_max_concurrent_opens(mut self, limit: usize) -> Self {
        self.max_concurrent_opens = limit.max(1);
        self
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    /// Opens a connection within the store's configured timeout.
    pub async fn open(
        &self,
        config: &StoreConfig,
    ) -> Result<StoreHandle<D::Connection>, ConnectionError> {
        self.open_until(config, Instant::now() + config.timeout()).await
    }

    /// Opens a connection, giving up at `deadline`.
    ///
    /// A connect attempt cut short by the deadline is dropped together with
    /// whatever it had acquired, so no half-open session survives.
    pub async fn open_until(
        &self,
        config: &StoreConfig,
        deadline: Instant,
    ) -> Result<StoreHandle<D::Connection>, ConnectionError> {
        let label = config.label();
        let remaining = deadline.saturating_duration_since(Instant::now());
        debug!(store = %label, timeout_ms = remaining.as_millis() as u64, "Connecting to store");

        match timeout_at(deadline, self.driver.connect(&config.uri, remaining)).await {
            Ok(Ok(connection)) => {
                let handle = StoreHandle::new(config, connection);
                debug!(store = %label, session = %handle.session_id, "Connected to store");
                Ok(handle)
            }
            Ok(Err(e)) => Err(ConnectionError::new(label, Stage::Connect, e.into())),
            Err(_) => Err(ConnectionError::new(label, Stage::Connect, ConnectionFailure::Timeout)),
        }
    }

    /// Probes the store within its configured timeout.
    pub async fn verify(
        &self,
        handle: &mut StoreHandle<D::Connection>,
    ) -> Result<(), ConnectionError> {
        let deadline = handle.deadline();
        self.verify_until(handle, deadline).await
    }

    /// Probes the store; on success the handle becomes `Verified`, on failure `Failed`.
    pub async fn verify_until(
        &self,
        handle: &mut StoreHandle<D::Connection>,
        deadline: Instant,
    ) -> Result<(), ConnectionError> {
        let state = handle.state;
        let connection = match (state, handle.connection.as_mut()) {
            (HandleState::Unverified | HandleState::Verified, Some(connection)) => connection,
            _ => {
                return Err(ConnectionError::new(
                    handle.label.clone(),
                    Stage::Verify,
                    ConnectionFailure::InvalidState(state),
                ));
            }
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let failure = match timeout_at(deadline, self.driver.ping(connection, remaining)).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(ConnectionFailure::from(e)),
            Err(_) => Some(ConnectionFailure::Timeout),
        };

        match failure {
            None => {
                handle.state = HandleState::Verified;
                debug!(store = %handle.label, session = %handle.session_id, "Store verified");
                Ok(())
            }
            Some(reason) => {
                handle.state = HandleState::Failed;
                Err(ConnectionError::new(handle.label.clone(), Stage::Verify, reason))
            }
        }
    }

    /// Releases the connection. Closing a closed handle does nothing.
    pub async fn close(&self, handle: &mut StoreHandle<D::Connection>) {
        let deadline = handle.deadline();
        self.close_until(handle, deadline).await
    }

    /// Releases the connection, abandoning the disconnect at `deadline`.
    ///
    /// The handle ends `Closed` whatever the driver reports; disconnect
    /// failures are logged, never returned.
    pub async fn close_until(&self, handle: &mut StoreHandle<D::Connection>, deadline: Instant) {
        handle.state = HandleState::Closed;
        let Some(connection) = handle.connection.take() else {
            return;
        };

        match timeout_at(deadline, self.driver.disconnect(connection)).await {
            Ok(Ok(())) => debug!(
                store = %handle.label,
                session = %handle.session_id,
                "Disconnected from store"
            ),
            Ok(Err(e)) => warn!(store = %handle.label, error = %e, "Disconnect failed"),
            Err(_) => warn!(store = %handle.label, "Disconnect timed out"),
        }
    }

    /// Opens and verifies one store, closing it again if verification fails.
    ///
    /// Connect and verify share a single deadline of the store's timeout.
    async fn open_verified(
        &self,
        config: &StoreConfig,
    ) -> Result<StoreHandle<D::Connection>, ConnectionError> {
        let deadline = Instant::now() + config.timeout();
        let mut handle = self.open_until(config, deadline).await?;
        if let Err(e) = self.verify_until(&mut handle, deadline).await {
            self.close(&mut handle).await;
            return Err(e);
        }
        Ok(handle)
    }

    /// Opens and verifies every store, all or nothing.
    ///
    /// Stores are set up concurrently, at most `max_concurrent_opens` at a time.
    /// Once every attempt has finished, any failure closes all handles that did
    /// open and the first failure in configuration order is returned.
    pub async fn open_all(
        &self,
        configs: &[StoreConfig],
    ) -> Result<Vec<StoreHandle<D::Connection>>, ConnectionError> {
        let outcomes: Vec<_> = futures::stream::iter(configs)
            .map(|config| self.open_verified(config))
            .buffered(self.max_concurrent_opens)
            .collect()
            .await;

        let mut handles = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(handle) => handles.push(handle),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => warn!(error = %e, "Additional store failed during setup"),
            }
        }

        if let Some(err) = first_error {
            warn!(opened = handles.len(), "Store setup failed; closing opened stores");
            self.close_all(&mut handles).await;
            return Err(err);
        }

        info!("Connected to {} stores", handles.len());
        Ok(handles)
    }

    /// Closes every handle, each under its own timeout.
    pub async fn close_all(&self, handles: &mut [StoreHandle<D::Connection>]) {
        for handle in handles.iter_mut() {
            self.close(handle).await;
        }
    }
}
