//! # Repositories
//!
//! SQL lives here and nowhere else. Each repository holds a pool clone and
//! is cheap to create via [`crate::Database`].
//!
//! - [`SnapshotRepository`] - save/load the engine's four collections

pub mod snapshot;

pub use snapshot::{SnapshotRepository, TableCounts};
