//! # stockroom-db: Persistence Layer for Stockroom
//!
//! Keeps the reconciliation engine's state in SQLite and exposes the engine
//! to async callers.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  UI command (issue receipt, edit transfer, import price list)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockroom-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌───────────────┐    │   │
//! │  │   │ InventoryServ │──►│ SnapshotWriter│──►│ SnapshotRepo  │    │   │
//! │  │   │ (service.rs)  │   │ (writer.rs)   │   │ (repository/) │    │   │
//! │  │   │ Mutex<Engine> │   │ mpsc worker   │   │ one tx / save │    │   │
//! │  │   └───────────────┘   └───────────────┘   └───────┬───────┘    │   │
//! │  │                                                    │            │   │
//! │  │   StockroomConfig (config.rs)   Database (pool.rs) ◄┘            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/stockroom/stockroom.db                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `stockroom.toml` + `STOCKROOM_*` environment overrides
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Snapshot save/load
//! - [`writer`] - Background snapshot writer
//! - [`service`] - Serialized async access to the engine
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_db::{InventoryService, StockroomConfig};
//!
//! let config = StockroomConfig::load(None)?;
//! let service = InventoryService::open(&config).await?;
//!
//! let report = service.issue(receipt).await?;
//! service.flush().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod writer;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, PersistenceSettings, StockroomConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{SnapshotRepository, TableCounts};
pub use service::InventoryService;
pub use writer::SnapshotWriter;
