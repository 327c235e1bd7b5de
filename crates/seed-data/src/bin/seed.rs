//! Default seed script - loads the monster collection
//!
//! Run with:
//! ```
//! SEED_STORE_URIS=postgres://... cargo run -p seed-data --bin seed
//! ```
//!
//! Set `SEED_CONFIG` to a JSON file for multi-store runs, or `SEED_DRIVER=memory`
//! for a dry run.

use std::process::ExitCode;

use loader::driver::{MemoryDriver, PostgresDriver};
use seed_data::config::{DriverKind, SeedConfig, load_records};
use seed_data::db::{SeedError, Seeder};
use seed_data::fixtures::monster_records;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Whole cause chain on one line.
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = SeedConfig::from_env().map_err(SeedError::from)?;

    let records = match &config.records_path {
        Some(path) => load_records(path).map_err(SeedError::from)?,
        None => monster_records(),
    };

    let summary = match config.driver {
        DriverKind::Postgres => {
            Seeder::new(PostgresDriver::new())
                .with_max_concurrent_opens(config.max_concurrent_opens)
                .seed(&config, &records)
                .await?
        }
        DriverKind::Memory => {
            Seeder::new(MemoryDriver::new())
                .with_max_concurrent_opens(config.max_concurrent_opens)
                .seed(&config, &records)
                .await?
        }
    };

    // Summary output
    tracing::info!("Seed completed!");
    tracing::info!("  Stores verified: {}", summary.stores_opened);
    tracing::info!("  Target: {} on {}", summary.target, summary.target_store);
    tracing::info!("  Records inserted: {}", summary.inserted);
    tracing::info!(
        "  Elapsed: {:.2}s",
        (summary.finished_at - summary.started_at).as_seconds_f64()
    );

    Ok(())
}
