//! # Inventory Service
//!
//! Async entry point used by the shop UI. Wraps one
//! [`ReconciliationEngine`] behind a mutex so each document, edit or
//! import applies as a single step, and wires the engine to the
//! background [`SnapshotWriter`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UI command ──► InventoryService (Clone) ──► Mutex<Engine>              │
//! │                                                  │                      │
//! │                              engine mutation ────┤                      │
//! │                                                  ▼                      │
//! │                                       SnapshotWriter ──► SQLite         │
//! │                                                                         │
//! │  open():     load snapshot ─► from_snapshot ─► attach writer            │
//! │  shutdown(): drain writer  ─► close pool                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::StockroomConfig;
use crate::error::DbResult;
use crate::pool::{Database, DbConfig};
use crate::writer::SnapshotWriter;
use stockroom_core::{
    CancelReport, Document, EngineConfig, ImportRow, ImportSummary, InventorySnapshot,
    IssueReport, LocationId, Product, ProductDraft, ReconciliationEngine, StatePersister,
};

#[derive(Clone)]
pub struct InventoryService {
    engine: Arc<Mutex<ReconciliationEngine>>,
    writer: SnapshotWriter,
    db: Database,
}

impl std::fmt::Debug for InventoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryService")
            .field("writer_closed", &self.writer.is_closed())
            .finish()
    }
}

impl InventoryService {
    /// Opens the configured database and restores the last saved state.
    pub async fn open(config: &StockroomConfig) -> DbResult<Self> {
        config.validate()?;
        let db = Database::new(DbConfig::from_settings(&config.database)).await?;
        Self::with_database(db, config.engine.clone(), config.persistence.queue_capacity).await
    }

    pub async fn with_database(
        db: Database,
        engine_config: EngineConfig,
        queue_capacity: usize,
    ) -> DbResult<Self> {
        let snapshot = db.snapshots().load().await?;
        let writer = SnapshotWriter::spawn(db.snapshots(), queue_capacity);
        let engine = ReconciliationEngine::from_snapshot(engine_config, snapshot)?
            .with_persister(Arc::new(writer.clone()) as Arc<dyn StatePersister>);

        info!(?engine, "Inventory service ready");
        Ok(InventoryService {
            engine: Arc::new(Mutex::new(engine)),
            writer,
            db,
        })
    }

    // =========================================================================
    // Documents
    // =========================================================================

    pub async fn issue(&self, document: Document) -> DbResult<IssueReport> {
        Ok(self.engine.lock().await.issue(document)?)
    }

    pub async fn cancel(&self, document_id: &str) -> DbResult<CancelReport> {
        Ok(self.engine.lock().await.cancel(document_id)?)
    }

    // =========================================================================
    // Catalog & Stock
    // =========================================================================

    pub async fn upsert_product(&self, draft: ProductDraft) -> DbResult<Product> {
        Ok(self.engine.lock().await.upsert_product(draft)?)
    }

    pub async fn remove_product(&self, product_id: &str) -> DbResult<Product> {
        Ok(self.engine.lock().await.remove_product(product_id)?)
    }

    pub async fn adjust_stock(
        &self,
        product_id: &str,
        location: &LocationId,
        delta: i64,
        note: &str,
    ) -> DbResult<i64> {
        Ok(self
            .engine
            .lock()
            .await
            .adjust_stock(product_id, location, delta, note)?)
    }

    pub async fn clear_location_stock(&self, location: &LocationId) -> DbResult<usize> {
        Ok(self.engine.lock().await.clear_location_stock(location)?)
    }

    pub async fn clear_movement_log(&self) -> usize {
        self.engine.lock().await.clear_movement_log()
    }

    pub async fn wipe(&self) {
        self.engine.lock().await.wipe();
    }

    // =========================================================================
    // Imports
    // =========================================================================

    pub async fn import_price_list(&self, rows: &[ImportRow]) -> DbResult<ImportSummary> {
        Ok(self.engine.lock().await.import_price_list(rows)?)
    }

    pub async fn import_restock(
        &self,
        rows: &[ImportRow],
        location: &LocationId,
    ) -> DbResult<ImportSummary> {
        Ok(self.engine.lock().await.import_restock(rows, location)?)
    }

    // =========================================================================
    // Reads & Lifecycle
    // =========================================================================

    /// Runs `f` against the engine under the lock, e.g. for reports.
    pub async fn read<R>(&self, f: impl FnOnce(&ReconciliationEngine) -> R) -> R {
        let engine = self.engine.lock().await;
        f(&engine)
    }

    pub async fn snapshot(&self) -> InventorySnapshot {
        self.engine.lock().await.snapshot()
    }

    /// Waits until the latest state is on disk.
    pub async fn flush(&self) -> DbResult<()> {
        self.writer.flush().await
    }

    /// Drains the writer and closes the pool. Mutations after this still
    /// apply in memory but are no longer saved.
    pub async fn shutdown(&self) -> DbResult<()> {
        self.writer.shutdown().await?;
        self.db.close().await;
        info!("Inventory service stopped");
        Ok(())
    }
}
