//! # Catalog Maintenance
//!
//! Product create/edit/remove, manual adjustments and bulk clearing.
//!
//! Editing a product never changes stock. Price, promo and offer changes
//! each leave a zero-delta ADJUST row at the master location so the
//! movement history explains why receipts started printing a new price.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

use crate::engine::ReconciliationEngine;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::BULK_CLEAR_REF;
use crate::money::Money;
use crate::types::{LocationId, MovementKind, MovementRecord, Product};
use crate::validation::{normalize_sku, validate_price_cents, validate_product_name, validate_sku};

/// Product fields as entered on the item form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    /// `None` creates a new product.
    pub id: Option<String>,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub min_quantity: i64,
    pub price_cents: i64,
    pub promo_price_cents: Option<i64>,
    pub offers: Option<String>,
    /// New products only: units booked in at the master location.
    pub opening_stock: Option<i64>,
}

impl ProductDraft {
    fn validate(&self) -> CoreResult<()> {
        validate_sku(&self.sku)?;
        validate_product_name(&self.name)?;
        validate_price_cents("price", self.price_cents)?;
        if let Some(promo) = self.promo_price_cents {
            validate_price_cents("promo price", promo)?;
        }
        if self.min_quantity < 0 {
            return Err(ValidationError::OutOfRange {
                field: "min quantity".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }
        if self.opening_stock.is_some_and(|q| q < 0) {
            return Err(ValidationError::MustBePositive {
                field: "opening stock".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// New values for the pricing fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub(crate) struct PricingUpdate {
    pub price_cents: Option<i64>,
    pub promo_price_cents: Option<Option<i64>>,
    pub offers: Option<Option<String>>,
}

fn describe_price(currency: &str, cents: Option<i64>) -> String {
    match cents {
        Some(c) => Money::from_cents(c).display_with(currency),
        None => "none".to_string(),
    }
}

fn describe_offer(offer: &Option<String>) -> String {
    match offer.as_deref().map(str::trim).filter(|o| !o.is_empty()) {
        Some(o) => format!("'{}'", o),
        None => "none".to_string(),
    }
}

impl ReconciliationEngine {
    // =========================================================================
    // Products
    // =========================================================================

    /// Creates or edits a product. Returns the stored version.
    pub fn upsert_product(&mut self, draft: ProductDraft) -> CoreResult<Product> {
        draft.validate()?;
        let now = Utc::now();

        let product = match draft.id.clone() {
            Some(id) => {
                if !self.stock.contains(&id) {
                    return Err(CoreError::ProductNotFound(id));
                }
                let pricing = PricingUpdate {
                    price_cents: Some(draft.price_cents),
                    promo_price_cents: Some(draft.promo_price_cents),
                    offers: Some(draft.offers.clone()),
                };
                self.apply_pricing(&id, pricing, "", now);
                let Some(product) = self.stock.get_mut(&id) else {
                    return Err(CoreError::ProductNotFound(id));
                };
                product.sku = normalize_sku(&draft.sku);
                product.name = draft.name.trim().to_string();
                product.category = draft.category.trim().to_string();
                product.description = draft.description;
                product.min_quantity = draft.min_quantity;
                product.last_updated = now;
                info!(product_id = %id, sku = %product.sku, "Product updated");
                product.clone()
            }
            None => {
                let product = Product {
                    id: Uuid::new_v4().to_string(),
                    sku: normalize_sku(&draft.sku),
                    name: draft.name.trim().to_string(),
                    category: draft.category.trim().to_string(),
                    description: draft.description,
                    stocks: BTreeMap::new(),
                    min_quantity: draft.min_quantity,
                    price_cents: draft.price_cents,
                    promo_price_cents: draft.promo_price_cents,
                    offers: draft.offers,
                    last_updated: now,
                };
                let id = product.id.clone();
                self.stock.insert(product);
                if let Some(opening) = draft.opening_stock.filter(|q| *q > 0) {
                    let master = self.config.master_location.clone();
                    self.book_adjustment(&id, &master, opening, MovementKind::In, None, "Initial stock entry", now);
                }
                let Some(product) = self.stock.get(&id) else {
                    return Err(CoreError::ProductNotFound(id));
                };
                info!(product_id = %product.id, sku = %product.sku, "Product created");
                product.clone()
            }
        };

        self.persist();
        Ok(product)
    }

    /// Removes a product from the catalog. Documents keep their line
    /// snapshots; later edits of those documents skip the missing product.
    pub fn remove_product(&mut self, product_id: &str) -> CoreResult<Product> {
        let removed = self
            .stock
            .remove(product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        info!(product_id, sku = %removed.sku, "Product removed");
        self.persist();
        Ok(removed)
    }

    // =========================================================================
    // Stock Maintenance
    // =========================================================================

    /// Manual stock correction at one location. Returns the new quantity.
    pub fn adjust_stock(
        &mut self,
        product_id: &str,
        location: &LocationId,
        delta: i64,
        note: &str,
    ) -> CoreResult<i64> {
        self.require_location(location)?;
        if !self.stock.contains(product_id) {
            return Err(CoreError::ProductNotFound(product_id.to_string()));
        }
        if delta == 0 {
            return Err(ValidationError::invalid("adjustment", "delta must not be zero").into());
        }

        let note = if note.trim().is_empty() {
            "Manual adjustment"
        } else {
            note.trim()
        };
        let quantity = self
            .book_adjustment(product_id, location, delta, MovementKind::Adjust, None, note, Utc::now())
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        info!(product_id, location = %location, delta, quantity, "Stock adjusted manually");
        self.persist();
        Ok(quantity)
    }

    /// Sets every non-zero quantity at `location` to zero, one ADJUST row
    /// each. Returns how many products were cleared.
    ///
    /// The global view is not a location, so it cannot be cleared.
    pub fn clear_location_stock(&mut self, location: &LocationId) -> CoreResult<usize> {
        self.require_location(location)?;
        let now = Utc::now();

        let targets: Vec<(String, i64)> = self
            .stock
            .iter()
            .map(|p| (p.id.clone(), p.quantity_at(location)))
            .filter(|(_, qty)| *qty != 0)
            .collect();

        for (product_id, quantity) in &targets {
            self.book_adjustment(
                product_id,
                location,
                -quantity,
                MovementKind::Adjust,
                Some(BULK_CLEAR_REF),
                "BULK CLEAR SHOP STOCK",
                now,
            );
        }

        info!(location = %location, cleared = targets.len(), "Location stock cleared");
        self.persist();
        Ok(targets.len())
    }

    /// Drops the whole movement history. Stock is not touched.
    pub fn clear_movement_log(&mut self) -> usize {
        let removed = self.ledger.clear_all();
        info!(removed, "Movement log cleared");
        self.persist();
        removed
    }

    /// Empties all four collections.
    pub fn wipe(&mut self) {
        self.stock.clear();
        self.ledger.clear_all();
        self.registry.clear();
        self.customers.clear();
        info!("All inventory data wiped");
        self.persist();
    }

    // =========================================================================
    // Shared Helpers
    // =========================================================================

    pub(crate) fn require_location(&self, location: &LocationId) -> CoreResult<()> {
        if self.config.is_known_location(location) {
            Ok(())
        } else {
            Err(CoreError::UnknownLocation(location.to_string()))
        }
    }

    /// Applies `delta` and appends the matching ledger row in one step.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn book_adjustment(
        &mut self,
        product_id: &str,
        location: &LocationId,
        delta: i64,
        kind: MovementKind,
        reference: Option<&str>,
        note: &str,
        at: DateTime<Utc>,
    ) -> Option<i64> {
        let quantity = self.stock.adjust(product_id, location, delta, at)?;
        let product = self.stock.get(product_id)?;
        let mut row = MovementRecord::for_product(product, location.clone(), kind, delta, at)
            .with_note(note);
        if let Some(reference) = reference {
            row = row.with_reference(reference);
        }
        self.ledger.record(row);
        Some(quantity)
    }

    /// Writes changed pricing fields and leaves one zero-delta ADJUST row
    /// per change at the master location. `label` prefixes the note
    /// ("" for the item form, "Bulk" for imports).
    pub(crate) fn apply_pricing(
        &mut self,
        product_id: &str,
        update: PricingUpdate,
        label: &str,
        at: DateTime<Utc>,
    ) -> usize {
        let currency = self.config.currency_code.clone();
        let master = self.config.master_location.clone();
        let Some(product) = self.stock.get_mut(product_id) else {
            return 0;
        };

        let mut notes = Vec::new();
        let (price_word, promo_word, offer_word) = if label.is_empty() {
            ("Price Change", "Promo Change", "Offer Change")
        } else {
            ("Price Override", "Promo Override", "Offer Override")
        };
        let prefix = if label.is_empty() {
            String::new()
        } else {
            format!("{} ", label)
        };

        if let Some(price) = update.price_cents.filter(|p| *p != product.price_cents) {
            notes.push(format!(
                "{}{}: {} -> {}",
                prefix,
                price_word,
                describe_price(&currency, Some(product.price_cents)),
                describe_price(&currency, Some(price))
            ));
            product.price_cents = price;
        }
        if let Some(promo) = update
            .promo_price_cents
            .filter(|p| *p != product.promo_price_cents)
        {
            notes.push(format!(
                "{}{}: {} -> {}",
                prefix,
                promo_word,
                describe_price(&currency, product.promo_price_cents),
                describe_price(&currency, promo)
            ));
            product.promo_price_cents = promo;
        }
        if let Some(offers) = update.offers.filter(|o| *o != product.offers) {
            notes.push(format!(
                "{}{}: {} -> {}",
                prefix,
                offer_word,
                describe_offer(&product.offers),
                describe_offer(&offers)
            ));
            product.offers = offers;
        }

        if notes.is_empty() {
            return 0;
        }
        product.last_updated = at;
        let rows: Vec<MovementRecord> = notes
            .into_iter()
            .map(|note| {
                MovementRecord::for_product(product, master.clone(), MovementKind::Adjust, 0, at)
                    .with_note(note)
            })
            .collect();
        let count = rows.len();
        self.ledger.record_batch(rows);
        count
    }
}
