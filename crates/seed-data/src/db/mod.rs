//! Store seeding.
//!
//! The [`Seeder`] opens every configured store, writes one batch to the target
//! store and closes every connection again, whatever happened in between.

mod seeder;

pub use seeder::{SeedError, SeedSummary, Seeder};
