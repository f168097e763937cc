//! # stockroom-core: Stock Ledger and Document Reconciliation
//!
//! Pure domain logic for a multi-shop retail back office. Keeps per-location
//! stock, the movement history and the issued documents mutually consistent
//! while documents are created, edited and cancelled.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │      Document authoring UI / import pipeline (callers)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ issue / cancel / import / adjust       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockroom-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ReconciliationEngine                                          │   │
//! │  │     ├── StockStore        quantity per (product, location)      │   │
//! │  │     ├── MovementLedger    why each quantity changed             │   │
//! │  │     ├── DocumentRegistry  receipts, transfers, refund forms     │   │
//! │  │     └── CustomerLedger    lifetime spend per customer           │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ StatePersister (fire-and-forget)       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  stockroom-db (SQLite snapshot)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - Issue and cancel documents (revert, apply, settle spend)
//! - [`stock`], [`ledger`], [`registry`], [`customer`] - The four stores
//! - [`catalog`], [`import`] - Product maintenance and spreadsheet rows
//! - [`report`] - Stock status, stats and the alerts list
//! - [`money`], [`types`], [`document`] - Domain types
//! - [`error`], [`validation`], [`config`] - Supporting pieces
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::{Document, EngineConfig, LineItem, LocationId, Money, ProductDraft};
//! use stockroom_core::ReconciliationEngine;
//!
//! let mut engine = ReconciliationEngine::new(EngineConfig::default()).unwrap();
//! let chair = engine
//!     .upsert_product(ProductDraft {
//!         sku: "CH-1".into(),
//!         name: "Chair".into(),
//!         category: "Furniture".into(),
//!         price_cents: 10000,
//!         opening_stock: Some(10),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! let master = LocationId::new("Master");
//! let line = LineItem::new(&chair.id, "CH-1", "Chair", 3, Money::from_cents(10000));
//! engine.issue(Document::sale("d1", "R-1", master.clone(), vec![line])).unwrap();
//!
//! assert_eq!(engine.stock().quantity(&chair.id, &master), 7);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod customer;
pub mod document;
pub mod engine;
pub mod error;
pub mod import;
pub mod ledger;
pub mod money;
pub mod registry;
pub mod report;
pub mod snapshot;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::ProductDraft;
pub use config::EngineConfig;
pub use document::{Document, DocumentKind, DocumentStatus, DocumentTotals, DocumentType, LineItem, VisitorDetails};
pub use engine::{CancelReport, IssueOutcome, IssueReport, IssueWarning, ReconciliationEngine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use import::{ImportRow, ImportSummary};
pub use ledger::MovementFilter;
pub use money::Money;
pub use report::{InventoryStats, StockStatus, StockView};
pub use snapshot::{InventorySnapshot, StatePersister};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity accepted on a single document line.
///
/// Guards against a barcode scanned into the quantity field.
pub const MAX_LINE_QUANTITY: i64 = 9999;
