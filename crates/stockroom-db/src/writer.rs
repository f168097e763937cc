//! # Snapshot Writer
//!
//! Background task that turns engine snapshots into database rows.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ReconciliationEngine ── persist(snapshot) ──► pending slot (newest)    │
//! │                                                     │  notify           │
//! │  flush() / shutdown() ──► bounded mpsc ──┐          ▼                   │
//! │                                          └──► worker: take slot, save   │
//! │                                                                         │
//! │  Flush    → save the pending snapshot, then reply                       │
//! │  Shutdown → save the pending snapshot, reply and stop                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every snapshot is the complete state, so a newer one replaces an unsaved
//! older one in the slot. `persist` never waits and never loses the newest
//! state; only the control commands go through the bounded queue.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, error, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::SnapshotRepository;
use stockroom_core::{InventorySnapshot, StatePersister};

#[derive(Debug)]
enum WriterCommand {
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Newest snapshot not yet handed to the repository.
#[derive(Debug, Default)]
struct PendingSnapshot {
    slot: Mutex<Option<InventorySnapshot>>,
    ready: Notify,
}

impl PendingSnapshot {
    /// Stores `snapshot`, returning true when it replaced an unsaved one.
    fn replace(&self, snapshot: InventorySnapshot) -> bool {
        let superseded = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(snapshot)
            .is_some();
        self.ready.notify_one();
        superseded
    }

    fn take(&self) -> Option<InventorySnapshot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Handle to the writer task. Clones share the same slot and queue.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    cmd_tx: mpsc::Sender<WriterCommand>,
    pending: Arc<PendingSnapshot>,
}

impl SnapshotWriter {
    /// Spawns the worker on the current tokio runtime. `capacity` bounds
    /// outstanding flush and shutdown requests.
    pub fn spawn(repository: SnapshotRepository, capacity: usize) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(capacity.max(1));
        let pending = Arc::new(PendingSnapshot::default());

        let worker_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            run(repository, worker_pending, cmd_rx).await;
        });

        SnapshotWriter { cmd_tx, pending }
    }

    /// Waits until the newest snapshot persisted before this call is written.
    pub async fn flush(&self) -> DbResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(WriterCommand::Flush(reply_tx))
            .await
            .map_err(|_| DbError::WriterClosed)?;
        reply_rx.await.map_err(|_| DbError::WriterClosed)
    }

    /// Writes the pending snapshot, then stops the worker. Later calls on
    /// any clone fail with [`DbError::WriterClosed`].
    pub async fn shutdown(&self) -> DbResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(WriterCommand::Shutdown(reply_tx))
            .await
            .map_err(|_| DbError::WriterClosed)?;
        reply_rx.await.map_err(|_| DbError::WriterClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}

impl StatePersister for SnapshotWriter {
    fn persist(&self, snapshot: InventorySnapshot) {
        if self.cmd_tx.is_closed() {
            warn!("Snapshot writer closed - state change not persisted");
            return;
        }
        if self.pending.replace(snapshot) {
            debug!("Replaced unsaved snapshot with a newer one");
        }
    }
}

async fn write_pending(repository: &SnapshotRepository, pending: &PendingSnapshot) {
    if let Some(snapshot) = pending.take() {
        if let Err(e) = repository.save(&snapshot).await {
            error!(error = %e, "Failed to write snapshot");
        }
    }
}

async fn run(
    repository: SnapshotRepository,
    pending: Arc<PendingSnapshot>,
    mut cmd_rx: mpsc::Receiver<WriterCommand>,
) {
    info!("Snapshot writer started");

    loop {
        tokio::select! {
            _ = pending.ready.notified() => {
                write_pending(&repository, &pending).await;
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(WriterCommand::Flush(reply)) => {
                    write_pending(&repository, &pending).await;
                    let _ = reply.send(());
                }
                Some(WriterCommand::Shutdown(reply)) => {
                    info!("Snapshot writer shutting down");
                    write_pending(&repository, &pending).await;
                    let _ = reply.send(());
                    break;
                }
                None => {
                    write_pending(&repository, &pending).await;
                    break;
                }
            },
        }
    }

    info!("Snapshot writer stopped");
}
