use std::fmt;

use thiserror::Error;

use crate::connection::HandleState;

/// Malformed configuration or batch input, detected before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no stores configured")]
    NoStores,

    #[error("store #{index} has an empty uri")]
    EmptyUri { index: usize },

    #[error("store {store} has a zero timeout")]
    ZeroTimeout { store: String },

    #[error("invalid target {database}.{collection}: names must be non-empty ASCII identifiers")]
    InvalidTarget {
        database: String,
        collection: String,
    },

    #[error("unknown target store: {0}")]
    UnknownTargetStore(String),

    #[error("record #{index} does not match the batch schema (expected {expected}, found {found})")]
    SchemaMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("invalid record #{index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Lifecycle step during which a connection failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Connect => f.write_str("connect"),
            Stage::Verify => f.write_str("verify"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionFailure {
    Timeout,
    Auth(String),
    Unreachable(String),
    InvalidState(HandleState),
    Driver(String),
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionFailure::Timeout => f.write_str("timed out"),
            ConnectionFailure::Auth(msg) => write!(f, "authentication failed: {msg}"),
            ConnectionFailure::Unreachable(msg) => write!(f, "store unreachable: {msg}"),
            ConnectionFailure::InvalidState(state) => write!(f, "handle is {state}"),
            ConnectionFailure::Driver(msg) => f.write_str(msg),
        }
    }
}

/// Failure to open or verify a store connection.
#[derive(Debug, Error)]
#[error("{stage} failed for store {store}: {reason}")]
pub struct ConnectionError {
    pub store: String,
    pub stage: Stage,
    pub reason: ConnectionFailure,
}

impl ConnectionError {
    pub fn new(store: impl Into<String>, stage: Stage, reason: ConnectionFailure) -> Self {
        Self {
            store: store.into(),
            stage,
            reason,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.reason == ConnectionFailure::Timeout
    }
}

#[derive(Debug, Error)]
pub enum InsertError {
    #[error("cannot insert into store {store}: handle is {state}, expected verified")]
    InvalidState { store: String, state: HandleState },

    #[error("store {store} rejected the batch: {reason}")]
    Rejected { store: String, reason: String },

    #[error("store {store} committed {committed} of {attempted} records before failing: {reason}")]
    Partial {
        store: String,
        committed: u64,
        attempted: usize,
        reason: String,
    },

    #[error("insert into store {store} timed out")]
    Timeout { store: String },

    #[error(transparent)]
    Batch(#[from] ConfigError),
}

impl InsertError {
    /// Number of records known to be durably written before the failure.
    pub fn committed(&self) -> u64 {
        match self {
            InsertError::Partial { committed, .. } => *committed,
            _ => 0,
        }
    }
}

/// Errors reported by a [`crate::driver::StoreDriver`].
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("timed out")]
    Timeout,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("write rejected after {committed} records: {reason}")]
    Rejected { committed: u64, reason: String },

    #[error("{0}")]
    Other(String),
}

impl From<DriverError> for ConnectionFailure {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Timeout => ConnectionFailure::Timeout,
            DriverError::Auth(msg) => ConnectionFailure::Auth(msg),
            DriverError::Unreachable(msg) => ConnectionFailure::Unreachable(msg),
            other => ConnectionFailure::Driver(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_names_store_and_stage() {
        let err = ConnectionError::new("postgres://db1", Stage::Verify, ConnectionFailure::Timeout);
        assert_eq!(
            err.to_string(),
            "verify failed for store postgres://db1: timed out"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn test_driver_error_maps_to_connection_failure() {
        let failure: ConnectionFailure = DriverError::Auth("bad password".into()).into();
        assert_eq!(failure, ConnectionFailure::Auth("bad password".into()));

        let failure: ConnectionFailure = DriverError::Rejected {
            committed: 0,
            reason: "nope".into(),
        }
        .into();
        assert!(matches!(failure, ConnectionFailure::Driver(_)));
    }

    #[test]
    fn test_insert_error_committed() {
        let err = InsertError::Partial {
            store: "a".into(),
            committed: 7,
            attempted: 13,
            reason: "duplicate key".into(),
        };
        assert_eq!(err.committed(), 7);
        assert_eq!(
            InsertError::Timeout { store: "a".into() }.committed(),
            0
        );
    }
}
