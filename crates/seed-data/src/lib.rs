//! Seed data for the elemental monsters collection.
//!
//! This crate wires the [`loader`] core into a one-shot seeding run: every
//! configured store is opened and verified, the record batch is written to the
//! target store, and all connections are released before the run reports back.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use seed_data::prelude::*;
//!
//! let config = SeedConfig::from_env()?;
//! let summary = Seeder::new(PostgresDriver::new())
//!     .seed(&config, &monster_records())
//!     .await?;
//! ```

pub mod config;
pub mod db;
pub mod fixtures;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::{DriverKind, SeedConfig, load_records};
    pub use crate::db::{SeedError, SeedSummary, Seeder};
    pub use crate::fixtures::{Monster, MonsterCategory, monster_records, monsters};
    pub use loader::prelude::*;
}
