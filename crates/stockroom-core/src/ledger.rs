//! # Movement Ledger
//!
//! The audit trail of every stock change.
//!
//! ## Append-Mostly
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record / record_batch     append, storage order = insertion order      │
//! │                                                                         │
//! │  purge_by_reference(n)     removes every row tagged with document n.    │
//! │                            Used only when a document is reverted, so    │
//! │                            the ledger holds one explanation per         │
//! │                            document, not one per superseded version.    │
//! │                                                                         │
//! │  clear_all                 explicit wipe from the maintenance screen    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows themselves are never edited once appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{LocationId, MovementKind, MovementRecord};

// =============================================================================
// Reserved References
// =============================================================================

/// Rows created for products that a restock import added to the catalog.
pub const BULK_IMPORT_REF: &str = "BULK_IMPORT";

/// Rows created when a restock import overwrote an existing quantity.
pub const BULK_OVERRIDE_REF: &str = "BULK_OVERRIDE";

/// Rows created by clearing one location's stock.
pub const BULK_CLEAR_REF: &str = "BULK_CLEAR";

/// Bulk markers. A document may not use one as its number, or reverting
/// it would purge bulk rows.
pub const RESERVED_REFERENCES: &[&str] = &[BULK_IMPORT_REF, BULK_OVERRIDE_REF, BULK_CLEAR_REF];

pub fn is_reserved_reference(number: &str) -> bool {
    let number = number.trim();
    RESERVED_REFERENCES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(number))
}

// =============================================================================
// Filter
// =============================================================================

/// Read filter for [`MovementLedger::query`]. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<String>,
    pub location: Option<LocationId>,
    pub kind: Option<MovementKind>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring over product name, SKU, reference and note.
    pub text: Option<String>,
    /// Exact reference match.
    pub reference: Option<String>,
}

impl MovementFilter {
    pub fn new() -> Self {
        MovementFilter::default()
    }

    pub fn product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn location(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }

    pub fn kind(mut self, kind: MovementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn matches(&self, row: &MovementRecord) -> bool {
        if let Some(product_id) = &self.product_id {
            if &row.product_id != product_id {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if &row.location != location {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if row.kind != kind {
                return false;
            }
        }
        if self.from.is_some_and(|from| row.timestamp < from) {
            return false;
        }
        if self.to.is_some_and(|to| row.timestamp > to) {
            return false;
        }
        if let Some(reference) = &self.reference {
            if row.reference.as_deref() != Some(reference.as_str()) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.trim().to_lowercase();
            if !needle.is_empty() {
                let haystacks = [
                    row.product_name.as_str(),
                    row.sku.as_str(),
                    row.reference.as_deref().unwrap_or(""),
                    row.note.as_str(),
                ];
                if !haystacks
                    .iter()
                    .any(|h| h.to_lowercase().contains(&needle))
                {
                    return false;
                }
            }
        }
        true
    }
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct MovementLedger {
    entries: Vec<MovementRecord>,
}

impl MovementLedger {
    pub fn new() -> Self {
        MovementLedger::default()
    }

    pub(crate) fn from_records(entries: Vec<MovementRecord>) -> Self {
        MovementLedger { entries }
    }

    pub(crate) fn record(&mut self, entry: MovementRecord) {
        self.entries.push(entry);
    }

    /// Appends all rows, keeping the caller's order.
    pub(crate) fn record_batch(&mut self, entries: impl IntoIterator<Item = MovementRecord>) {
        let before = self.entries.len();
        self.entries.extend(entries);
        debug!(added = self.entries.len() - before, "Movement batch recorded");
    }

    /// Removes every row whose reference equals `reference` exactly.
    ///
    /// This is the one sanctioned exception to append-only: a document
    /// revert purges the rows of the version being superseded. Returns the
    /// number of rows removed.
    pub(crate) fn purge_by_reference(&mut self, reference: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|row| row.reference.as_deref() != Some(reference));
        let removed = before - self.entries.len();
        debug!(reference, removed, "Movements purged by reference");
        removed
    }

    /// Drops the whole history. Returns how many rows were dropped.
    pub(crate) fn clear_all(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Lazily yields rows matching `filter` in storage order. The iterator
    /// borrows the ledger, so it can be recreated at will and never sees a
    /// half-applied operation.
    pub fn query<'a, 'f>(
        &'a self,
        filter: &'f MovementFilter,
    ) -> impl Iterator<Item = &'a MovementRecord> + 'f
    where
        'a: 'f,
    {
        self.entries.iter().filter(move |row| filter.matches(row))
    }

    /// Rows newest first, the order movement screens display.
    pub fn newest_first(&self) -> impl Iterator<Item = &MovementRecord> {
        self.entries.iter().rev()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MovementRecord> {
        self.entries.iter()
    }

    /// Sum of deltas for one product at one location.
    pub fn net_delta(&self, product_id: &str, location: &LocationId) -> i64 {
        self.entries
            .iter()
            .filter(|row| row.product_id == product_id && &row.location == location)
            .map(|row| row.quantity_delta)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Product;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn product(id: &str, sku: &str, name: &str) -> Product {
        Product {
            id: id.into(),
            sku: sku.into(),
            name: name.into(),
            category: "Other".into(),
            description: String::new(),
            stocks: BTreeMap::new(),
            min_quantity: 0,
            price_cents: 0,
            promo_price_cents: None,
            offers: None,
            last_updated: Utc::now(),
        }
    }

    fn row(p: &Product, loc: &str, kind: MovementKind, delta: i64, reference: &str) -> MovementRecord {
        MovementRecord::for_product(p, LocationId::new(loc), kind, delta, Utc::now())
            .with_reference(reference)
            .with_note("Sale")
    }

    #[test]
    fn test_batch_preserves_order() {
        let p = product("p1", "A-1", "Armchair");
        let mut ledger = MovementLedger::new();
        ledger.record_batch(vec![
            row(&p, "X", MovementKind::Out, -1, "R-1"),
            row(&p, "X", MovementKind::Out, -2, "R-2"),
        ]);
        let refs: Vec<_> = ledger.iter().filter_map(|r| r.reference.clone()).collect();
        assert_eq!(refs, vec!["R-1", "R-2"]);
        let newest: Vec<_> = ledger.newest_first().map(|r| r.quantity()).collect();
        assert_eq!(newest, vec![2, 1]);
    }

    #[test]
    fn test_purge_is_exact_match_only() {
        let p = product("p1", "A-1", "Armchair");
        let mut ledger = MovementLedger::new();
        ledger.record(row(&p, "X", MovementKind::Out, -1, "R-1"));
        ledger.record(row(&p, "X", MovementKind::Out, -1, "R-10"));
        ledger.record(row(&p, "X", MovementKind::Out, -1, "r-1"));
        ledger.record(row(&p, "X", MovementKind::Out, -4, "R-1"));

        assert_eq!(ledger.purge_by_reference("R-1"), 2);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.purge_by_reference("R-1"), 0);
    }

    #[test]
    fn test_text_filter_is_case_insensitive_over_fields() {
        let chair = product("p1", "CH-9", "Office Chair");
        let desk = product("p2", "DK-1", "Desk");
        let mut ledger = MovementLedger::new();
        ledger.record(row(&chair, "X", MovementKind::Out, -1, "R-1"));
        ledger.record(row(&desk, "X", MovementKind::In, 2, "T-7"));

        assert_eq!(ledger.query(&MovementFilter::new().text("chair")).count(), 1);
        assert_eq!(ledger.query(&MovementFilter::new().text("dk-")).count(), 1);
        assert_eq!(ledger.query(&MovementFilter::new().text("t-7")).count(), 1);
        assert_eq!(ledger.query(&MovementFilter::new().text("sale")).count(), 2);
        assert_eq!(ledger.query(&MovementFilter::new().text("  ")).count(), 2);
    }

    #[test]
    fn test_structured_filters_combine() {
        let chair = product("p1", "CH-9", "Office Chair");
        let mut ledger = MovementLedger::new();
        ledger.record(row(&chair, "X", MovementKind::Out, -1, "R-1"));
        ledger.record(row(&chair, "Y", MovementKind::In, 1, "T-1"));

        let filter = MovementFilter::new()
            .product("p1")
            .location(LocationId::new("Y"))
            .kind(MovementKind::In);
        let hits: Vec<_> = ledger.query(&filter).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].reference.as_deref(), Some("T-1"));

        let future = Utc::now() + Duration::days(1);
        let window = MovementFilter::new().between(future, future + Duration::days(1));
        assert_eq!(ledger.query(&window).count(), 0);

        // restartable
        let by_ref = MovementFilter::new().reference("R-1");
        assert_eq!(ledger.query(&by_ref).count(), ledger.query(&by_ref).count());
    }

    #[test]
    fn test_rows_outlive_a_temporary_filter() {
        let chair = product("p1", "CH-9", "Office Chair");
        let mut ledger = MovementLedger::new();
        ledger.record(row(&chair, "X", MovementKind::Out, -1, "R-1"));
        ledger.record(row(&chair, "X", MovementKind::Out, -2, "R-2"));

        let rows: Vec<&MovementRecord> =
            ledger.query(&MovementFilter::new().product("p1")).collect();
        let latest = ledger
            .query(&MovementFilter::new().reference("R-2"))
            .last();
        assert_eq!(rows.len(), 2);
        assert_eq!(latest.map(|r| r.quantity()), Some(2));
    }

    #[test]
    fn test_net_delta() {
        let chair = product("p1", "CH-9", "Office Chair");
        let mut ledger = MovementLedger::new();
        let x = LocationId::new("X");
        ledger.record(row(&chair, "X", MovementKind::In, 10, "BULK_IMPORT"));
        ledger.record(row(&chair, "X", MovementKind::Out, -3, "R-1"));
        ledger.record(row(&chair, "Y", MovementKind::Out, -3, "R-2"));
        assert_eq!(ledger.net_delta("p1", &x), 7);
        assert_eq!(ledger.clear_all(), 3);
        assert!(ledger.is_empty());
    }
}
