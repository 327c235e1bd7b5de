//! In-memory driver with scriptable per-store behaviour.
//!
//! Every store is keyed by its uri. Besides holding written records, the driver
//! counts each primitive call so callers can check for leaked connections and
//! for calls that should never have reached the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::StoreDriver;
use crate::errors::DriverError;
use crate::models::{Record, Target};

/// Scripted behaviour for one store uri.
#[derive(Debug, Clone, Default)]
pub struct StoreBehavior {
    pub connect_delay: Option<Duration>,
    pub ping_delay: Option<Duration>,
    pub insert_delay: Option<Duration>,
    pub refuse_connect: bool,
    pub reject_auth: bool,
    pub fail_ping: bool,
    /// Report inserts as timed out by the store itself, writing nothing.
    pub time_out_inserts: bool,
    /// Commit at most this many records per batch, then reject the rest.
    pub commit_limit: Option<usize>,
}

impl StoreBehavior {
    pub fn refusing() -> Self {
        Self {
            refuse_connect: true,
            ..Self::default()
        }
    }

    pub fn slow_ping(delay: Duration) -> Self {
        Self {
            ping_delay: Some(delay),
            ..Self::default()
        }
    }
}

/// Call counters for one store uri.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub connect_attempts: u64,
    pub connects: u64,
    pub disconnects: u64,
    pub pings: u64,
    pub insert_calls: u64,
    pub records_written: u64,
}

impl StoreStats {
    /// Connections opened and not yet disconnected.
    pub fn live(&self) -> u64 {
        self.connects.saturating_sub(self.disconnects)
    }

    /// Every call that would have crossed the network.
    pub fn network_calls(&self) -> u64 {
        self.connect_attempts + self.pings + self.insert_calls + self.disconnects
    }
}

#[derive(Debug)]
pub struct MemoryConnection {
    id: u64,
    uri: String,
}

impl MemoryConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

#[derive(Debug, Default)]
struct State {
    behaviors: HashMap<String, StoreBehavior>,
    stats: HashMap<String, StoreStats>,
    collections: HashMap<(String, Target), Vec<Record>>,
    next_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    state: Arc<Mutex<State>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts how the store at `uri` responds from now on.
    pub fn behave(&self, uri: impl Into<String>, behavior: StoreBehavior) {
        self.state().behaviors.insert(uri.into(), behavior);
    }

    pub fn stats(&self, uri: &str) -> StoreStats {
        self.state().stats.get(uri).copied().unwrap_or_default()
    }

    /// Connections still open across every store.
    pub fn live_connections(&self) -> u64 {
        self.state().stats.values().map(StoreStats::live).sum()
    }

    pub fn records(&self, uri: &str, target: &Target) -> Vec<Record> {
        self.state()
            .collections
            .get(&(uri.to_string(), target.clone()))
            .cloned()
            .unwrap_or_default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn behavior(&self, uri: &str) -> StoreBehavior {
        self.state().behaviors.get(uri).cloned().unwrap_or_default()
    }

    fn record_call(&self, uri: &str, update: impl FnOnce(&mut StoreStats)) {
        update(self.state().stats.entry(uri.to_string()).or_default());
    }
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl StoreDriver for MemoryDriver {
    type Connection = MemoryConnection;

    async fn connect(
        &self,
        uri: &str,
        _timeout: Duration,
    ) -> Result<MemoryConnection, DriverError> {
        let behavior = self.behavior(uri);
        self.record_call(uri, |s| s.connect_attempts += 1);
        pause(behavior.connect_delay).await;

        if behavior.refuse_connect {
            return Err(DriverError::Unreachable("connection refused".to_string()));
        }
        if behavior.reject_auth {
            return Err(DriverError::Auth("invalid credentials".to_string()));
        }

        let id = {
            let mut state = self.state();
            state.next_id += 1;
            state.stats.entry(uri.to_string()).or_default().connects += 1;
            state.next_id
        };

        Ok(MemoryConnection {
            id,
            uri: uri.to_string(),
        })
    }

    async fn ping(
        &self,
        conn: &mut MemoryConnection,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        let behavior = self.behavior(&conn.uri);
        self.record_call(&conn.uri, |s| s.pings += 1);
        pause(behavior.ping_delay).await;

        if behavior.fail_ping {
            return Err(DriverError::Unreachable("ping failed".to_string()));
        }
        Ok(())
    }

    async fn insert_many(
        &self,
        conn: &mut MemoryConnection,
        target: &Target,
        records: &[Record],
        _timeout: Duration,
    ) -> Result<u64, DriverError> {
        let behavior = self.behavior(&conn.uri);
        self.record_call(&conn.uri, |s| s.insert_calls += 1);
        pause(behavior.insert_delay).await;

        if behavior.time_out_inserts {
            return Err(DriverError::Timeout);
        }

        let accepted = behavior
            .commit_limit
            .map_or(records.len(), |limit| limit.min(records.len()));

        {
            let mut state = self.state();
            state
                .collections
                .entry((conn.uri.clone(), target.clone()))
                .or_default()
                .extend_from_slice(&records[..accepted]);
            state.stats.entry(conn.uri.clone()).or_default().records_written += accepted as u64;
        }

        if accepted < records.len() {
            return Err(DriverError::Rejected {
                committed: accepted as u64,
                reason: format!("commit limit of {accepted} records reached"),
            });
        }

        Ok(accepted as u64)
    }

    async fn disconnect(&self, conn: MemoryConnection) -> Result<(), DriverError> {
        self.record_call(&conn.uri, |s| s.disconnects += 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Target {
        Target::new("elemental", "monsters").unwrap()
    }

    #[tokio::test]
    async fn test_counts_connect_and_disconnect() {
        let driver = MemoryDriver::new();
        let conn = driver
            .connect("memory://a", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(driver.live_connections(), 1);

        driver.disconnect(conn).await.unwrap();
        let stats = driver.stats("memory://a");
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.disconnects, 1);
        assert_eq!(driver.live_connections(), 0);
    }

    #[tokio::test]
    async fn test_refused_connect_opens_nothing() {
        let driver = MemoryDriver::new();
        driver.behave("memory://down", StoreBehavior::refusing());

        let err = driver
            .connect("memory://down", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Unreachable(_)));

        let stats = driver.stats("memory://down");
        assert_eq!(stats.connect_attempts, 1);
        assert_eq!(stats.connects, 0);
    }

    #[tokio::test]
    async fn test_commit_limit_reports_partial_write() {
        let driver = MemoryDriver::new();
        driver.behave(
            "memory://a",
            StoreBehavior {
                commit_limit: Some(2),
                ..StoreBehavior::default()
            },
        );
        let mut conn = driver
            .connect("memory://a", Duration::from_secs(1))
            .await
            .unwrap();
        let records: Vec<Record> = (0..5)
            .map(|i| Record::new().with_integer("n", i))
            .collect();

        let err = driver
            .insert_many(&mut conn, &target(), &records, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::Rejected { committed: 2, .. }));
        assert_eq!(driver.records("memory://a", &target()).len(), 2);
    }
}
