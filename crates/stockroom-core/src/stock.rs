//! # Stock Store
//!
//! Source of truth for "how many units of product P are at location L
//! right now". Owns the product catalog because quantities live on the
//! product record.
//!
//! Reads are public. Every mutation is `pub(crate)`: only the
//! reconciliation engine changes stock, so each change can be paired with a
//! ledger row.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::trace;

use crate::types::{LocationId, Product};
use crate::validation::{normalize_name, normalize_sku};

#[derive(Debug, Clone, Default)]
pub struct StockStore {
    products: BTreeMap<String, Product>,
}

impl StockStore {
    pub fn new() -> Self {
        StockStore::default()
    }

    pub(crate) fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        StockStore {
            products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Quantity of a product at a location. Unknown products and unstocked
    /// locations both read as 0.
    pub fn quantity(&self, product_id: &str, location: &LocationId) -> i64 {
        self.products
            .get(product_id)
            .map(|p| p.quantity_at(location))
            .unwrap_or(0)
    }

    /// Sum of a product's quantities over every location.
    pub fn aggregate(&self, product_id: &str) -> i64 {
        self.products
            .get(product_id)
            .map(Product::total_quantity)
            .unwrap_or(0)
    }

    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.products.get(product_id)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.products.contains_key(product_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// First product whose normalized SKU matches.
    pub fn find_by_sku(&self, sku: &str) -> Option<&Product> {
        let wanted = normalize_sku(sku);
        if wanted.is_empty() {
            return None;
        }
        self.products.values().find(|p| normalize_sku(&p.sku) == wanted)
    }

    /// First product whose normalized name equals `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Product> {
        let wanted = normalize_name(name);
        if wanted.is_empty() {
            return None;
        }
        self.products.values().find(|p| normalize_name(&p.name) == wanted)
    }

    /// First product whose normalized name starts with `prefix`.
    pub fn find_by_name_prefix(&self, prefix: &str) -> Option<&Product> {
        let wanted = normalize_name(prefix);
        if wanted.is_empty() {
            return None;
        }
        self.products
            .values()
            .find(|p| normalize_name(&p.name).starts_with(&wanted))
    }

    // =========================================================================
    // Mutations (engine only)
    // =========================================================================

    /// Adds `delta` to the quantity at `location`, creating the entry if
    /// absent, and stamps `last_updated`.
    ///
    /// Never fails on the arithmetic and never clamps. Returns the new
    /// quantity, or `None` when the product is not in the catalog.
    pub(crate) fn adjust(
        &mut self,
        product_id: &str,
        location: &LocationId,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Option<i64> {
        let product = self.products.get_mut(product_id)?;
        let entry = product.stocks.entry(location.clone()).or_insert(0);
        *entry += delta;
        let updated = *entry;
        product.last_updated = at;
        trace!(product_id, location = %location, delta, quantity = updated, "Stock adjusted");
        Some(updated)
    }

    pub(crate) fn get_mut(&mut self, product_id: &str) -> Option<&mut Product> {
        self.products.get_mut(product_id)
    }

    pub(crate) fn insert(&mut self, product: Product) -> Option<Product> {
        self.products.insert(product.id.clone(), product)
    }

    pub(crate) fn remove(&mut self, product_id: &str) -> Option<Product> {
        self.products.remove(product_id)
    }

    pub(crate) fn clear(&mut self) {
        self.products.clear();
    }
}
