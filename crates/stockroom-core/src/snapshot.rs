//! # Snapshot & Persistence Seam
//!
//! The engine never performs I/O. After each top-level change settles it
//! hands a full [`InventorySnapshot`] to a [`StatePersister`] and moves on.
//!
//! ```text
//! ┌──────────────────────┐  persist(snapshot)   ┌──────────────────────────┐
//! │ ReconciliationEngine │ ───────────────────► │ StatePersister           │
//! │ (in-memory, settled) │   returns at once    │ e.g. SnapshotWriter in   │
//! └──────────────────────┘                      │ stockroom-db (async)     │
//!                                               └──────────────────────────┘
//! ```
//!
//! No acknowledgement, no retry: a failed write is the persister's problem
//! to log, and never changes the result of the operation that caused it.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::types::{CustomerProfile, MovementRecord, Product};

/// The four persisted collections.
///
/// `movements` is in insertion order; `documents` newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub products: Vec<Product>,
    pub documents: Vec<Document>,
    pub movements: Vec<MovementRecord>,
    pub customers: Vec<CustomerProfile>,
}

impl InventorySnapshot {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
            && self.documents.is_empty()
            && self.movements.is_empty()
            && self.customers.is_empty()
    }
}

/// Durable-save hook. Implementations must not block the caller.
pub trait StatePersister: Send + Sync {
    fn persist(&self, snapshot: InventorySnapshot);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Persister that remembers every snapshot it was handed.
    #[derive(Default)]
    pub struct RecordingPersister {
        pub snapshots: Mutex<Vec<InventorySnapshot>>,
    }

    impl RecordingPersister {
        pub fn count(&self) -> usize {
            self.snapshots.lock().map(|s| s.len()).unwrap_or(0)
        }
    }

    impl StatePersister for RecordingPersister {
        fn persist(&self, snapshot: InventorySnapshot) {
            if let Ok(mut snapshots) = self.snapshots.lock() {
                snapshots.push(snapshot);
            }
        }
    }
}
