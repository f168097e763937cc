//! # Reconciliation Engine
//!
//! The only writer of the stock store, movement ledger, document registry
//! and customer ledger. Every public mutation here runs as one
//! uninterrupted unit: callers never observe a half-applied document.
//!
//! ## Issuing A Document
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  issue(doc)                                                             │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  0. doc.validate()                  ── Err ──► nothing touched         │
//! │  1. other id holds same number?     ── Err ──► nothing touched         │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  2. existing = registry[doc.id]                                        │
//! │  3. existing active? ──yes──► adjust(-delta) for each OLD effect       │
//! │     │                          purge_by_reference(old number)          │
//! │     ▼                                                                   │
//! │  4. adjust(+delta) for each NEW effect, one ledger row per effect      │
//! │     unknown product → skipped, zero-delta ADJUST row, warning          │
//! │     negative result → kept, annotated, warning                         │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  5. customer spend += new_total - old_total                            │
//! │  6. registry.upsert(doc)                                               │
//! │  7. persister.persist(snapshot)     fire-and-forget                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 3 reverts the *old* version's effects, so the inverse holds even
//! when lines, quantities or locations changed between versions.
//!
//! ## Concurrency
//! `&mut self` makes the engine single-writer. Shared callers go through
//! `stockroom_db::InventoryService`, which serializes every mutation behind
//! one async mutex so the uniqueness check and the commit stay atomic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::customer::CustomerLedger;
use crate::document::{Document, DocumentStatus};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::{is_reserved_reference, MovementLedger};
use crate::money::Money;
use crate::registry::DocumentRegistry;
use crate::snapshot::{InventorySnapshot, StatePersister};
use crate::stock::StockStore;
use crate::types::{CustomerContact, LocationId, MovementKind, MovementRecord};

// =============================================================================
// Reports
// =============================================================================

/// A soft irregularity met while applying a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueWarning {
    /// The line's product is not in the catalog; its stock effect was skipped.
    UnknownProductReference {
        product_id: String,
        sku: String,
        name: String,
    },
    /// The quantity went below zero. Not blocked, only surfaced.
    NegativeStockCondition {
        product_id: String,
        sku: String,
        location: LocationId,
        quantity: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueOutcome {
    /// First time this id was issued.
    Created,
    /// An active version was reverted and superseded.
    Replaced,
    /// A cancelled version was brought back; nothing needed reverting.
    Reactivated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReport {
    pub document_id: String,
    pub document_number: String,
    pub outcome: IssueOutcome,
    pub movements_purged: usize,
    pub movements_recorded: usize,
    pub warnings: Vec<IssueWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReport {
    pub document_id: String,
    pub document_number: String,
    pub movements_purged: usize,
}

// =============================================================================
// Engine
// =============================================================================

pub struct ReconciliationEngine {
    pub(crate) config: EngineConfig,
    pub(crate) stock: StockStore,
    pub(crate) ledger: MovementLedger,
    pub(crate) registry: DocumentRegistry,
    pub(crate) customers: CustomerLedger,
    persister: Option<Arc<dyn StatePersister>>,
}

impl fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("products", &self.stock.len())
            .field("documents", &self.registry.len())
            .field("movements", &self.ledger.len())
            .field("customers", &self.customers.len())
            .field("persister", &self.persister.is_some())
            .finish()
    }
}

impl ReconciliationEngine {
    /// Creates an empty engine.
    pub fn new(config: EngineConfig) -> CoreResult<Self> {
        Self::from_snapshot(config, InventorySnapshot::default())
    }

    /// Restores an engine from persisted collections.
    pub fn from_snapshot(config: EngineConfig, snapshot: InventorySnapshot) -> CoreResult<Self> {
        config.validate()?;
        info!(
            products = snapshot.products.len(),
            documents = snapshot.documents.len(),
            movements = snapshot.movements.len(),
            customers = snapshot.customers.len(),
            "Reconciliation engine loaded"
        );
        Ok(ReconciliationEngine {
            config,
            stock: StockStore::from_products(snapshot.products),
            ledger: MovementLedger::from_records(snapshot.movements),
            registry: DocumentRegistry::from_documents(snapshot.documents),
            customers: CustomerLedger::from_profiles(snapshot.customers),
            persister: None,
        })
    }

    /// Attaches the durable-save hook called after every state change.
    pub fn with_persister(mut self, persister: Arc<dyn StatePersister>) -> Self {
        self.persister = Some(persister);
        self
    }

    pub fn set_persister(&mut self, persister: Option<Arc<dyn StatePersister>>) {
        self.persister = persister;
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stock(&self) -> &StockStore {
        &self.stock
    }

    pub fn ledger(&self) -> &MovementLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn customers(&self) -> &CustomerLedger {
        &self.customers
    }

    /// Copies the four collections out.
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            products: self.stock.iter().cloned().collect(),
            documents: self.registry.list().cloned().collect(),
            movements: self.ledger.iter().cloned().collect(),
            customers: self.customers.list().cloned().collect(),
        }
    }

    pub(crate) fn persist(&self) {
        if let Some(persister) = &self.persister {
            persister.persist(self.snapshot());
        }
    }

    // =========================================================================
    // Issue
    // =========================================================================

    /// Issues a new document or replaces an issued one with the same id.
    ///
    /// ## Errors
    /// - [`CoreError::Validation`] for structurally broken documents
    /// - [`CoreError::DuplicateDocumentNumber`] when a different document
    ///   holds the same number
    ///
    /// Both are returned before any state is touched. Everything after the
    /// checks is best effort and cannot fail.
    ///
    /// ## Example
    /// ```rust
    /// use stockroom_core::{Document, EngineConfig, LineItem, LocationId, Money};
    /// use stockroom_core::engine::ReconciliationEngine;
    ///
    /// let mut engine = ReconciliationEngine::new(EngineConfig::default()).unwrap();
    /// let line = LineItem::new("ghost", "GH-1", "Ghost", 1, Money::from_cents(100));
    /// let doc = Document::sale("d1", "R-1", LocationId::new("Plouis"), vec![line]);
    ///
    /// let report = engine.issue(doc).unwrap();
    /// assert_eq!(report.warnings.len(), 1); // product not in catalog
    /// ```
    pub fn issue(&mut self, mut document: Document) -> CoreResult<IssueReport> {
        // 0-1: hard preconditions
        document.validate()?;
        if is_reserved_reference(&document.number) {
            return Err(ValidationError::invalid(
                "document number",
                format!("'{}' is reserved for bulk operations", document.number.trim()),
            )
            .into());
        }
        self.require_location(&document.source)?;
        for line in &document.line_items {
            if let Some(destination) = document.destination_for(line) {
                self.require_location(destination)?;
            }
        }
        if let Some(conflict) = self
            .registry
            .find_conflicting(&document.number, &document.id)
        {
            warn!(
                document_number = %document.number,
                existing_id = %conflict.id,
                "Rejected duplicate document number"
            );
            return Err(CoreError::duplicate_number(
                document.number.clone(),
                conflict.id.clone(),
            ));
        }

        let now = Utc::now();

        // 2: previous version
        let previous = self.registry.find_by_id(&document.id).cloned();
        let active_previous = previous.as_ref().filter(|p| !p.is_cancelled());

        // 3: revert
        let movements_purged = match active_previous {
            Some(old) => self.revert_effects(old, now),
            None => 0,
        };

        // 4: apply
        let (rows, warnings) = self.apply_effects(&document, now);
        let movements_recorded = rows.len();
        self.ledger.record_batch(rows);

        // 5: customer spend
        self.settle_customer_spend(active_previous, Some(&document), now);

        // 6: commit
        let outcome = match &previous {
            None => IssueOutcome::Created,
            Some(p) if p.is_cancelled() => IssueOutcome::Reactivated,
            Some(_) => IssueOutcome::Replaced,
        };
        document.status = DocumentStatus::Issued;
        let report = IssueReport {
            document_id: document.id.clone(),
            document_number: document.number.clone(),
            outcome,
            movements_purged,
            movements_recorded,
            warnings,
        };
        self.registry.upsert(document);

        info!(
            document_id = %report.document_id,
            document_number = %report.document_number,
            outcome = ?report.outcome,
            purged = report.movements_purged,
            recorded = report.movements_recorded,
            warnings = report.warnings.len(),
            "Document issued"
        );

        self.persist();
        Ok(report)
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Reverts a document's stock effect and spend, and marks it cancelled.
    ///
    /// The document stays in the registry and keeps its number reserved.
    /// Issuing it again (same id) brings it back.
    pub fn cancel(&mut self, document_id: &str) -> CoreResult<CancelReport> {
        let document = self
            .registry
            .find_by_id(document_id)
            .cloned()
            .ok_or_else(|| CoreError::DocumentNotFound(document_id.to_string()))?;
        if document.is_cancelled() {
            return Err(CoreError::DocumentAlreadyCancelled(document.number));
        }

        let now = Utc::now();
        let movements_purged = self.revert_effects(&document, now);
        self.settle_customer_spend(Some(&document), None, now);

        if let Some(stored) = self.registry.get_mut(document_id) {
            stored.status = DocumentStatus::Cancelled;
        }

        info!(
            document_id,
            document_number = %document.number,
            purged = movements_purged,
            "Document cancelled"
        );

        self.persist();
        Ok(CancelReport {
            document_id: document.id,
            document_number: document.number,
            movements_purged,
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Applies the exact inverse of `document`'s effects, then purges its
    /// ledger rows. Products that left the catalog are skipped: there is no
    /// stock left to correct. Returns the number of purged rows.
    fn revert_effects(&mut self, document: &Document, at: DateTime<Utc>) -> usize {
        for effect in document.stock_effects() {
            let product_id = effect.line.product_id.as_str();
            if self
                .stock
                .adjust(product_id, &effect.location, -effect.delta, at)
                .is_none()
            {
                debug!(product_id, "Revert skipped product no longer in catalog");
            }
        }
        self.ledger.purge_by_reference(&document.number)
    }

    /// Applies `document`'s effects and builds one ledger row per effect.
    fn apply_effects(
        &mut self,
        document: &Document,
        at: DateTime<Utc>,
    ) -> (Vec<MovementRecord>, Vec<IssueWarning>) {
        let mut rows = Vec::new();
        let mut warnings = Vec::new();
        let doc_type = document.document_type();

        for line in &document.line_items {
            if !self.stock.contains(&line.product_id) {
                warn!(
                    document_number = %document.number,
                    product_id = %line.product_id,
                    sku = %line.sku,
                    "Line item references unknown product, stock effect skipped"
                );
                rows.push(MovementRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    product_id: line.product_id.clone(),
                    product_name: line.name.clone(),
                    sku: line.sku.clone(),
                    location: document.source.clone(),
                    kind: MovementKind::Adjust,
                    quantity_delta: 0,
                    timestamp: at,
                    reference: Some(document.number.clone()),
                    note: format!(
                        "{} - skipped: product not in catalog ({} units)",
                        doc_type.as_str(),
                        line.quantity
                    ),
                });
                warnings.push(IssueWarning::UnknownProductReference {
                    product_id: line.product_id.clone(),
                    sku: line.sku.clone(),
                    name: line.name.clone(),
                });
                continue;
            }

            for effect in document.line_effects(line) {
                let Some(quantity) =
                    self.stock
                        .adjust(&line.product_id, &effect.location, effect.delta, at)
                else {
                    continue;
                };
                let Some(product) = self.stock.get(&line.product_id) else {
                    continue;
                };

                let mut note = match (effect.kind, document.destination_for(line)) {
                    (MovementKind::Out, Some(destination)) => {
                        format!("{} - To: {}", doc_type.as_str(), destination)
                    }
                    (MovementKind::In, Some(_)) => {
                        format!("{} - From: {}", doc_type.as_str(), document.source)
                    }
                    _ => doc_type.as_str().to_string(),
                };

                if quantity < 0 {
                    warn!(
                        document_number = %document.number,
                        sku = %product.sku,
                        location = %effect.location,
                        quantity,
                        "Negative stock"
                    );
                    note.push_str(&format!(" (negative stock: {})", quantity));
                    warnings.push(IssueWarning::NegativeStockCondition {
                        product_id: product.id.clone(),
                        sku: product.sku.clone(),
                        location: effect.location.clone(),
                        quantity,
                    });
                }

                rows.push(
                    MovementRecord::for_product(
                        product,
                        effect.location.clone(),
                        effect.kind,
                        effect.delta,
                        at,
                    )
                    .with_reference(document.number.clone())
                    .with_note(note),
                );
            }
        }

        (rows, warnings)
    }

    /// Moves lifetime spend from the previous version to the current one.
    ///
    /// | previous | current | effect                                   |
    /// |----------|---------|------------------------------------------|
    /// | A, t0    | A, t1   | A += t1 - t0                             |
    /// | A, t0    | B, t1   | A -= t0, B += t1                         |
    /// | A, t0    | none    | A -= t0                                  |
    /// | none     | B, t1   | B += t1                                  |
    fn settle_customer_spend(
        &mut self,
        previous: Option<&Document>,
        current: Option<&Document>,
        at: DateTime<Utc>,
    ) {
        let guest = self.config.guest_customer_name.as_str();
        let old = previous.and_then(|d| spend_party(d, guest));
        let new = current.and_then(|d| spend_party(d, guest));

        match (old, new) {
            (Some((old_contact, old_total)), Some((new_contact, new_total)))
                if self.customers.same_profile(old_contact, new_contact) =>
            {
                self.customers
                    .record_visit(new_contact, new_total - old_total, at);
            }
            (Some((old_contact, old_total)), Some((new_contact, new_total))) => {
                self.customers.retract(old_contact, old_total);
                self.customers.record_visit(new_contact, new_total, at);
            }
            (Some((old_contact, old_total)), None) => {
                self.customers.retract(old_contact, old_total);
            }
            (None, Some((new_contact, new_total))) => {
                self.customers.record_visit(new_contact, new_total, at);
            }
            (None, None) => {}
        }
    }
}

/// The paying customer of a document, if it has one that deserves a profile.
fn spend_party<'a>(document: &'a Document, guest: &str) -> Option<(&'a CustomerContact, Money)> {
    if !document.kind.counts_towards_spend() {
        return None;
    }
    document
        .customer
        .as_ref()
        .filter(|c| !c.is_anonymous(guest))
        .map(|c| (c, document.total()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LineItem;
    use crate::ledger::MovementFilter;
    use crate::snapshot::testing::RecordingPersister;
    use crate::types::Product;
    use std::collections::BTreeMap;

    fn loc(name: &str) -> LocationId {
        LocationId::new(name)
    }

    fn engine_with(stock: &[(&str, &str, i64)]) -> ReconciliationEngine {
        let mut engine = ReconciliationEngine::new(EngineConfig::default()).unwrap();
        let mut product = Product {
            id: "p1".into(),
            sku: "TV-55".into(),
            name: "Television".into(),
            category: "Electronics".into(),
            description: String::new(),
            stocks: BTreeMap::new(),
            min_quantity: 1,
            price_cents: 10000,
            promo_price_cents: None,
            offers: None,
            last_updated: Utc::now(),
        };
        for (id, location, qty) in stock {
            if *id == "p1" {
                product.stocks.insert(loc(location), *qty);
            }
        }
        engine.stock.insert(product);
        engine
    }

    fn line(qty: i64) -> LineItem {
        LineItem::new("p1", "TV-55", "Television", qty, Money::from_cents(10000))
    }

    #[test]
    fn test_sale_decrements_source() {
        let mut engine = engine_with(&[("p1", "Plouis", 10)]);
        let report = engine
            .issue(Document::sale("d1", "R-1", loc("Plouis"), vec![line(4)]))
            .unwrap();

        assert_eq!(report.outcome, IssueOutcome::Created);
        assert_eq!(report.movements_recorded, 1);
        assert!(report.warnings.is_empty());
        assert_eq!(engine.stock().quantity("p1", &loc("Plouis")), 6);

        let rows: Vec<_> = engine.ledger().iter().collect();
        assert_eq!(rows[0].kind, MovementKind::Out);
        assert_eq!(rows[0].quantity_delta, -4);
        assert_eq!(rows[0].note, "SALE");
    }

    #[test]
    fn test_refund_form_also_leaves_source() {
        let mut engine = engine_with(&[("p1", "Trianon", 3)]);
        engine
            .issue(Document::refund(
                "d1",
                "VAT-1",
                loc("Trianon"),
                Default::default(),
                vec![line(1)],
            ))
            .unwrap();
        assert_eq!(engine.stock().quantity("p1", &loc("Trianon")), 2);
    }

    #[test]
    fn test_unknown_product_is_skipped_and_annotated() {
        let mut engine = engine_with(&[("p1", "Plouis", 10)]);
        let ghost = LineItem::new("ghost", "GH-1", "Ghost", 2, Money::from_cents(1));
        let report = engine
            .issue(Document::sale("d1", "R-1", loc("Plouis"), vec![ghost, line(1)]))
            .unwrap();

        assert_eq!(engine.stock().quantity("p1", &loc("Plouis")), 9);
        assert!(matches!(
            report.warnings[0],
            IssueWarning::UnknownProductReference { .. }
        ));
        let annotated: Vec<_> = engine
            .ledger()
            .query(&MovementFilter::new().product("ghost"))
            .collect();
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated[0].quantity_delta, 0);
        assert!(annotated[0].note.contains("not in catalog"));
    }

    #[test]
    fn test_negative_stock_is_allowed_and_reported() {
        let mut engine = engine_with(&[("p1", "Plouis", 1)]);
        let report = engine
            .issue(Document::sale("d1", "R-1", loc("Plouis"), vec![line(3)]))
            .unwrap();
        assert_eq!(engine.stock().quantity("p1", &loc("Plouis")), -2);
        assert_eq!(
            report.warnings,
            vec![IssueWarning::NegativeStockCondition {
                product_id: "p1".into(),
                sku: "TV-55".into(),
                location: loc("Plouis"),
                quantity: -2,
            }]
        );
        assert!(engine.ledger().iter().any(|r| r.note.contains("negative stock: -2")));
    }

    #[test]
    fn test_reserved_number_rejected() {
        let mut engine = engine_with(&[]);
        let err = engine
            .issue(Document::sale("d1", "bulk_import", loc("Plouis"), vec![line(1)]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_invalid_document_touches_nothing() {
        let mut engine = engine_with(&[("p1", "Plouis", 5)]);
        let err = engine
            .issue(Document::sale("d1", "R-1", loc("Plouis"), vec![line(0)]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(engine.stock().quantity("p1", &loc("Plouis")), 5);
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn test_edit_moving_location_reverts_old_location() {
        let mut engine = engine_with(&[("p1", "Plouis", 10), ("p1", "Rhill", 10)]);
        engine
            .issue(Document::sale("d1", "R-1", loc("Plouis"), vec![line(4)]))
            .unwrap();
        let report = engine
            .issue(Document::sale("d1", "R-1", loc("Rhill"), vec![line(2)]))
            .unwrap();

        assert_eq!(report.outcome, IssueOutcome::Replaced);
        assert_eq!(report.movements_purged, 1);
        assert_eq!(engine.stock().quantity("p1", &loc("Plouis")), 10);
        assert_eq!(engine.stock().quantity("p1", &loc("Rhill")), 8);
        assert_eq!(engine.ledger().len(), 1);
    }

    #[test]
    fn test_renumbering_purges_old_reference() {
        let mut engine = engine_with(&[("p1", "Plouis", 10)]);
        engine
            .issue(Document::sale("d1", "R-1", loc("Plouis"), vec![line(1)]))
            .unwrap();
        engine
            .issue(Document::sale("d1", "R-1A", loc("Plouis"), vec![line(1)]))
            .unwrap();

        assert_eq!(engine.ledger().query(&MovementFilter::new().reference("R-1")).count(), 0);
        assert_eq!(engine.ledger().query(&MovementFilter::new().reference("R-1A")).count(), 1);
        assert_eq!(engine.stock().quantity("p1", &loc("Plouis")), 9);
    }

    #[test]
    fn test_customer_switch_moves_spend() {
        let mut engine = engine_with(&[("p1", "Plouis", 10)]);
        let alice = CustomerContact::named("Alice");
        let bob = CustomerContact::named("Bob");

        engine
            .issue(
                Document::sale("d1", "R-1", loc("Plouis"), vec![line(1)])
                    .with_customer(alice.clone()),
            )
            .unwrap();
        engine
            .issue(
                Document::sale("d1", "R-1", loc("Plouis"), vec![line(2)])
                    .with_customer(bob.clone()),
            )
            .unwrap();

        let spend = |c: &CustomerContact| engine.customers().find(c).map(|p| p.lifetime_spend_cents);
        assert_eq!(spend(&alice), Some(0));
        assert_eq!(spend(&bob), Some(20000));
    }

    #[test]
    fn test_edit_adding_known_email_moves_spend_to_that_profile() {
        let mut engine = engine_with(&[("p1", "Plouis", 10)]);
        let bob = CustomerContact::named("Bob").with_email("bob@example.mu");
        let alice = CustomerContact::named("Alice");

        engine
            .issue(Document::sale("d1", "R-1", loc("Plouis"), vec![line(1)]).with_customer(bob.clone()))
            .unwrap();
        engine
            .issue(Document::sale("d2", "R-2", loc("Plouis"), vec![line(1)]).with_customer(alice.clone()))
            .unwrap();
        // same name, but the email now resolves to Bob's profile
        engine
            .issue(
                Document::sale("d2", "R-2", loc("Plouis"), vec![line(2)])
                    .with_customer(CustomerContact::named("Alice").with_email("bob@example.mu")),
            )
            .unwrap();

        let spend = |id: &str| engine.customers().get(id).map(|p| p.lifetime_spend_cents);
        let bob_id = engine.customers().find(&bob).map(|p| p.id.clone()).unwrap();
        let alice_id = engine
            .customers()
            .list()
            .find(|p| p.name == "Alice")
            .map(|p| p.id.clone())
            .unwrap();
        assert_eq!(spend(&alice_id), Some(0));
        assert_eq!(spend(&bob_id), Some(30000));
        let total: i64 = engine.customers().list().map(|p| p.lifetime_spend_cents).sum();
        assert_eq!(total, 30000);
    }

    #[test]
    fn test_guest_and_transfers_do_not_create_profiles() {
        let mut engine = engine_with(&[("p1", "Master", 10)]);
        engine
            .issue(
                Document::sale("d1", "R-1", loc("Master"), vec![line(1)])
                    .with_customer(CustomerContact::named("Guest")),
            )
            .unwrap();
        engine
            .issue(
                Document::transfer("d2", "T-1", loc("Master"), loc("Plouis"), vec![line(1)])
                    .with_customer(CustomerContact::named("Shop Manager")),
            )
            .unwrap();
        assert!(engine.customers().is_empty());
    }

    #[test]
    fn test_cancel_then_reissue() {
        let mut engine = engine_with(&[("p1", "Plouis", 10)]);
        let alice = CustomerContact::named("Alice");
        let doc = Document::sale("d1", "R-1", loc("Plouis"), vec![line(3)]).with_customer(alice.clone());
        engine.issue(doc.clone()).unwrap();

        let cancelled = engine.cancel("d1").unwrap();
        assert_eq!(cancelled.movements_purged, 1);
        assert_eq!(engine.stock().quantity("p1", &loc("Plouis")), 10);
        assert!(engine.ledger().is_empty());
        assert_eq!(engine.customers().find(&alice).map(|p| p.lifetime_spend_cents), Some(0));
        assert!(engine.registry().find_by_id("d1").is_some_and(Document::is_cancelled));

        assert!(matches!(
            engine.cancel("d1"),
            Err(CoreError::DocumentAlreadyCancelled(_))
        ));
        assert!(matches!(
            engine.issue(Document::sale("d2", "r-1", loc("Plouis"), vec![line(1)])),
            Err(CoreError::DuplicateDocumentNumber { .. })
        ));

        let report = engine.issue(doc).unwrap();
        assert_eq!(report.outcome, IssueOutcome::Reactivated);
        assert_eq!(engine.stock().quantity("p1", &loc("Plouis")), 7);
        assert_eq!(engine.customers().find(&alice).map(|p| p.lifetime_spend_cents), Some(30000));
    }

    #[test]
    fn test_cancel_unknown_document() {
        let mut engine = engine_with(&[]);
        assert!(matches!(
            engine.cancel("nope"),
            Err(CoreError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_location_rejected() {
        let mut engine = engine_with(&[("p1", "Plouis", 10)]);
        assert!(matches!(
            engine.issue(Document::sale("d1", "R-1", loc("Mars"), vec![line(1)])),
            Err(CoreError::UnknownLocation(_))
        ));
        assert!(matches!(
            engine.issue(Document::transfer("d2", "T-1", loc("Plouis"), loc("Global"), vec![line(1)])),
            Err(CoreError::UnknownLocation(_))
        ));
        assert_eq!(engine.stock().quantity("p1", &loc("Plouis")), 10);
    }

    #[test]
    fn test_persister_called_per_change_not_on_failure() {
        let persister = Arc::new(RecordingPersister::default());
        let mut engine = engine_with(&[("p1", "Plouis", 10)]);
        engine.set_persister(Some(persister.clone() as Arc<dyn StatePersister>));

        engine
            .issue(Document::sale("d1", "R-1", loc("Plouis"), vec![line(1)]))
            .unwrap();
        let _ = engine.issue(Document::sale("d2", "R-1", loc("Plouis"), vec![line(1)]));
        engine.cancel("d1").unwrap();

        assert_eq!(persister.count(), 2);
        let last = persister.snapshots.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.documents[0].status, DocumentStatus::Cancelled);
    }

    #[test]
    fn test_snapshot_roundtrip_restores_state() {
        let mut engine = engine_with(&[("p1", "Plouis", 10)]);
        engine
            .issue(
                Document::sale("d1", "R-1", loc("Plouis"), vec![line(2)])
                    .with_customer(CustomerContact::named("Alice")),
            )
            .unwrap();

        let snapshot = engine.snapshot();
        let restored =
            ReconciliationEngine::from_snapshot(EngineConfig::default(), snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.stock().quantity("p1", &loc("Plouis")), 8);
    }
}
