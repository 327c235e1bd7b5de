//! PostgreSQL driver backed by a single sqlx connection.
//!
//! `Target::database` names a schema and `Target::collection` a table inside it;
//! record fields map to columns of the same name.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use tracing::debug;

use super::StoreDriver;
use crate::errors::DriverError;
use crate::models::{FieldValue, Record, Target};

/// Postgres caps a statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        Self
    }
}

/// Maps sqlx failures onto the driver error taxonomy.
fn classify(err: sqlx::Error) -> DriverError {
    match err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            // invalid_authorization_specification, invalid_password
            Some("28000") | Some("28P01") => DriverError::Auth(db.message().to_string()),
            _ => DriverError::Other(db.to_string()),
        },
        sqlx::Error::Io(e) => DriverError::Unreachable(e.to_string()),
        sqlx::Error::Tls(e) => DriverError::Unreachable(e.to_string()),
        sqlx::Error::PoolTimedOut => DriverError::Timeout,
        other => DriverError::Other(other.to_string()),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn rejected(err: sqlx::Error) -> DriverError {
    // The whole batch runs in one transaction, so nothing survives a failure.
    DriverError::Rejected {
        committed: 0,
        reason: classify(err).to_string(),
    }
}

#[async_trait]
impl StoreDriver for PostgresDriver {
    type Connection = PgConnection;

    async fn connect(&self, uri: &str, _timeout: Duration) -> Result<PgConnection, DriverError> {
        PgConnection::connect(uri).await.map_err(classify)
    }

    async fn ping(&self, conn: &mut PgConnection, _timeout: Duration) -> Result<(), DriverError> {
        conn.ping().await.map_err(classify)
    }

    async fn insert_many(
        &self,
        conn: &mut PgConnection,
        target: &Target,
        records: &[Record],
        timeout: Duration,
    ) -> Result<u64, DriverError> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let columns: Vec<&str> = first.field_names().collect();
        let rows_per_statement = (MAX_BIND_PARAMS / columns.len().max(1)).max(1);

        let mut tx = conn.begin().await.map_err(rejected)?;

        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            timeout.as_millis().max(1)
        ))
        .execute(&mut *tx)
        .await
        .map_err(rejected)?;

        let mut written = 0;
        for chunk in records.chunks(rows_per_statement) {
            let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {}.{} (",
                quote_ident(&target.database),
                quote_ident(&target.collection)
            ));
            let mut separated = query.separated(", ");
            for column in &columns {
                separated.push(quote_ident(column));
            }
            query.push(") ");

            query.push_values(chunk, |mut row, record| {
                for column in &columns {
                    match record.get(column) {
                        Some(FieldValue::Text(s)) | Some(FieldValue::Category(s)) => {
                            row.push_bind(s.clone())
                        }
                        Some(FieldValue::Integer(i)) => row.push_bind(*i),
                        Some(FieldValue::Float(f)) => row.push_bind(*f),
                        Some(FieldValue::Bool(b)) => row.push_bind(*b),
                        None => row.push_bind(None::<String>),
                    };
                }
            });

            let result = query.build().execute(&mut *tx).await.map_err(rejected)?;
            written += result.rows_affected();
            debug!(table = %target, rows = written, "Wrote insert chunk");
        }

        tx.commit().await.map_err(rejected)?;

        Ok(written)
    }

    async fn disconnect(&self, conn: PgConnection) -> Result<(), DriverError> {
        conn.close().await.map_err(classify)
    }
}
