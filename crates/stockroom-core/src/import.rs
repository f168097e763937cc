//! # Import Application
//!
//! Applies already-parsed spreadsheet rows. Parsing raw text is the import
//! pipeline's job; the engine only sees [`ImportRow`] values.
//!
//! ## Two Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MASTER PRICE LIST                   SHOP RESTOCK (target location L)  │
//! │  ─────────────────                   ────────────────────────────────  │
//! │  match: SKU, else name prefix        match: SKU, else exact name       │
//! │  hit:   overwrite price/promo/offer  hit:   stock(L) := row quantity   │
//! │         ADJUST(0) row per change            ADJUST(new - old) row,     │
//! │                                             ref BULK_OVERRIDE          │
//! │  miss:  create product, no stock     miss:  create product with stock  │
//! │                                             IN row, ref BULK_IMPORT    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The restock override records the delta actually applied, so the ledger
//! still sums to the stock store after an absolute overwrite.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::PricingUpdate;
use crate::engine::ReconciliationEngine;
use crate::error::CoreResult;
use crate::ledger::{BULK_IMPORT_REF, BULK_OVERRIDE_REF};
use crate::types::{LocationId, MovementKind, Product};
use crate::validation::{normalize_sku, validate_product_name, validate_sku};

/// One parsed spreadsheet row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub promo_price_cents: Option<i64>,
    #[serde(default)]
    pub offers: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl ImportRow {
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        ImportRow {
            sku: sku.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, cents: i64) -> Self {
        self.price_cents = Some(cents);
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    fn has_bad_price(&self) -> bool {
        self.price_cents.is_some_and(|p| p < 0) || self.promo_price_cents.is_some_and(|p| p < 0)
    }

    fn pricing(&self) -> PricingUpdate {
        PricingUpdate {
            price_cents: self.price_cents,
            promo_price_cents: self.promo_price_cents.map(Some),
            offers: self
                .offers
                .as_deref()
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(|o| Some(o.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl ReconciliationEngine {
    /// Master price list mode. Never changes stock.
    pub fn import_price_list(&mut self, rows: &[ImportRow]) -> CoreResult<ImportSummary> {
        let now = Utc::now();
        let mut summary = ImportSummary::default();

        for row in rows {
            if row.has_bad_price() {
                warn!(sku = %row.sku, "Import row with negative price skipped");
                summary.skipped += 1;
                continue;
            }

            let matched = self
                .stock
                .find_by_sku(&row.sku)
                .or_else(|| self.stock.find_by_name_prefix(&row.name))
                .map(|p| p.id.clone());

            match matched {
                Some(product_id) => {
                    if self.apply_pricing(&product_id, row.pricing(), "Bulk", now) > 0 {
                        summary.updated += 1;
                    } else {
                        summary.unchanged += 1;
                    }
                }
                None => {
                    if self.create_from_row(row).is_some() {
                        summary.created += 1;
                    } else {
                        summary.skipped += 1;
                    }
                }
            }
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            "Price list imported"
        );
        self.persist();
        Ok(summary)
    }

    /// Shop restock mode: sets stock at `location` to each row's quantity.
    pub fn import_restock(
        &mut self,
        rows: &[ImportRow],
        location: &LocationId,
    ) -> CoreResult<ImportSummary> {
        self.require_location(location)?;
        let now = Utc::now();
        let mut summary = ImportSummary::default();

        for row in rows {
            let Some(quantity) = row.quantity.filter(|q| *q >= 0) else {
                summary.skipped += 1;
                continue;
            };
            if row.has_bad_price() {
                summary.skipped += 1;
                continue;
            }

            let matched = self
                .stock
                .find_by_sku(&row.sku)
                .or_else(|| self.stock.find_by_name(&row.name))
                .map(|p| p.id.clone());

            match matched {
                Some(product_id) => {
                    let previous = self.stock.quantity(&product_id, location);
                    let delta = quantity - previous;
                    let mut changed = false;
                    if delta != 0 {
                        let note = format!(
                            "Stock Override at {}: {} -> {}",
                            location, previous, quantity
                        );
                        self.book_adjustment(
                            &product_id,
                            location,
                            delta,
                            MovementKind::Adjust,
                            Some(BULK_OVERRIDE_REF),
                            &note,
                            now,
                        );
                        changed = true;
                    }
                    if self.apply_pricing(&product_id, row.pricing(), "Bulk", now) > 0 {
                        changed = true;
                    }
                    if changed {
                        summary.updated += 1;
                    } else {
                        summary.unchanged += 1;
                    }
                }
                None => match self.create_from_row(row) {
                    Some(product_id) => {
                        if quantity > 0 {
                            let note = format!("Bulk import at {}", location);
                            self.book_adjustment(
                                &product_id,
                                location,
                                quantity,
                                MovementKind::In,
                                Some(BULK_IMPORT_REF),
                                &note,
                                now,
                            );
                        }
                        summary.created += 1;
                    }
                    None => summary.skipped += 1,
                },
            }
        }

        info!(
            location = %location,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            "Restock imported"
        );
        self.persist();
        Ok(summary)
    }

    /// Adds a stockless product built from a row. `None` when the row lacks
    /// a usable SKU or name.
    fn create_from_row(&mut self, row: &ImportRow) -> Option<String> {
        if validate_sku(&row.sku).is_err() || validate_product_name(&row.name).is_err() {
            warn!(sku = %row.sku, name = %row.name, "Import row without SKU or name skipped");
            return None;
        }
        let category = row
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("Other");
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: normalize_sku(&row.sku),
            name: row.name.trim().to_string(),
            category: category.to_string(),
            description: String::new(),
            stocks: BTreeMap::new(),
            min_quantity: self.config.default_min_quantity,
            price_cents: row.price_cents.unwrap_or(0),
            promo_price_cents: row.promo_price_cents,
            offers: row.offers.clone().filter(|o| !o.trim().is_empty()),
            last_updated: Utc::now(),
        };
        let id = product.id.clone();
        self.stock.insert(product);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ledger::MovementFilter;

    fn engine() -> ReconciliationEngine {
        ReconciliationEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_price_list_creates_then_overrides() {
        let mut engine = engine();
        let first = engine
            .import_price_list(&[
                ImportRow::new("ch-1", "Office Chair Black").with_price(250000),
                ImportRow::new("", "No Sku"),
            ])
            .unwrap();
        assert_eq!(first, ImportSummary { created: 1, skipped: 1, ..Default::default() });

        let product = engine.stock().find_by_sku("CH-1").cloned().unwrap();
        assert_eq!(product.min_quantity, 5);
        assert_eq!(product.category, "Other");
        assert_eq!(product.total_quantity(), 0);

        // matched by name prefix, sku differs
        let second = engine
            .import_price_list(&[ImportRow::new("CH-NEW", "office chair").with_price(199900)])
            .unwrap();
        assert_eq!(second.updated, 1);
        assert_eq!(engine.stock().get(&product.id).map(|p| p.price_cents), Some(199900));

        let row = engine.ledger().iter().last().cloned().unwrap();
        assert_eq!(row.quantity_delta, 0);
        assert_eq!(row.note, "Bulk Price Override: MUR 2500.00 -> MUR 1999.00");

        let third = engine
            .import_price_list(&[ImportRow::new("CH-1", "x").with_price(199900)])
            .unwrap();
        assert_eq!(third.unchanged, 1);
    }

    #[test]
    fn test_restock_records_applied_delta() {
        let mut engine = engine();
        let plouis = LocationId::new("Plouis");
        engine
            .import_restock(&[ImportRow::new("LAMP", "Desk Lamp").with_quantity(10)], &plouis)
            .unwrap();
        let lamp = engine.stock().find_by_sku("lamp").cloned().unwrap();
        assert_eq!(lamp.quantity_at(&plouis), 10);

        let summary = engine
            .import_restock(
                &[
                    ImportRow::new("", "desk lamp").with_quantity(4),
                    ImportRow::new("NOQTY", "No Quantity"),
                ],
                &plouis,
            )
            .unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(engine.stock().quantity(&lamp.id, &plouis), 4);

        let overrides: Vec<_> = engine
            .ledger()
            .query(&MovementFilter::new().reference(BULK_OVERRIDE_REF))
            .collect();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].quantity_delta, -6);
        assert_eq!(engine.ledger().net_delta(&lamp.id, &plouis), 4);
    }

    #[test]
    fn test_restock_unknown_location() {
        let mut engine = engine();
        assert!(engine
            .import_restock(&[ImportRow::new("A", "A").with_quantity(1)], &LocationId::new("Global"))
            .is_err());
    }

    #[test]
    fn test_same_quantity_is_unchanged() {
        let mut engine = engine();
        let rhill = LocationId::new("Rhill");
        let rows = [ImportRow::new("VASE", "Vase").with_quantity(3)];
        engine.import_restock(&rows, &rhill).unwrap();
        let again = engine.import_restock(&rows, &rhill).unwrap();
        assert_eq!(again.unchanged, 1);
        assert_eq!(engine.ledger().len(), 1);
    }
}
