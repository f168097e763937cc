//! # Reporting
//!
//! Read-only views over the engine state for the dashboard and the alerts
//! list. Nothing here mutates or persists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::document::{Document, DocumentKind, DocumentStatus};
use crate::engine::ReconciliationEngine;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{LocationId, Product};

/// Which quantity a report reads: one shop, or the sum over all shops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "location", rename_all = "snake_case")]
pub enum StockView {
    Global,
    Location(LocationId),
}

impl StockView {
    pub fn quantity_of(&self, product: &Product) -> i64 {
        match self {
            StockView::Global => product.total_quantity(),
            StockView::Location(location) => product.quantity_at(location),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockStatus {
    InStock,
    Low,
    Negative,
}

impl StockStatus {
    pub fn classify(quantity: i64, min_quantity: i64) -> Self {
        if quantity < 0 {
            StockStatus::Negative
        } else if quantity <= min_quantity {
            StockStatus::Low
        } else {
            StockStatus::InStock
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub product_count: usize,
    /// Signed sum, so negative quantities pull it down.
    pub total_units: i64,
    pub total_value: Money,
    pub low_stock_count: usize,
    pub negative_stock_count: usize,
    /// Product count per category.
    pub categories: BTreeMap<String, usize>,
}

/// One (product, location) pair below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NegativeStock {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub location: LocationId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationBreakdown {
    pub product_id: String,
    /// Every configured location, in configuration order.
    pub per_location: Vec<(LocationId, i64)>,
    pub global: i64,
    pub status: StockStatus,
}

/// Why a document shows up in the alerts list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingReason {
    MissingInvoiceNumber,
    MissingTransferNote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDocument {
    pub document_id: String,
    pub document_number: String,
    pub reason: PendingReason,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn pending_reason(document: &Document) -> Option<PendingReason> {
    if document.status == DocumentStatus::Cancelled {
        return None;
    }
    match &document.kind {
        DocumentKind::Sale if is_blank(&document.invoice_number) => {
            Some(PendingReason::MissingInvoiceNumber)
        }
        DocumentKind::Transfer {
            transfer_note_number,
            ..
        } if is_blank(transfer_note_number) => Some(PendingReason::MissingTransferNote),
        _ => None,
    }
}

impl ReconciliationEngine {
    pub fn inventory_stats(&self, view: &StockView) -> InventoryStats {
        let mut stats = InventoryStats::default();
        for product in self.stock.iter() {
            let quantity = view.quantity_of(product);
            stats.product_count += 1;
            stats.total_units += quantity;
            stats.total_value += product.effective_price().multiply_quantity(quantity);
            match StockStatus::classify(quantity, product.min_quantity) {
                StockStatus::Low => stats.low_stock_count += 1,
                StockStatus::Negative => stats.negative_stock_count += 1,
                StockStatus::InStock => {}
            }
            *stats.categories.entry(product.category.clone()).or_default() += 1;
        }
        stats
    }

    /// Every stocked (product, location) pair with a quantity below zero.
    pub fn negative_stock(&self) -> Vec<NegativeStock> {
        self.stock
            .iter()
            .flat_map(|product| {
                product
                    .stocks
                    .iter()
                    .filter(|(_, qty)| **qty < 0)
                    .map(move |(location, qty)| NegativeStock {
                        product_id: product.id.clone(),
                        sku: product.sku.clone(),
                        name: product.name.clone(),
                        location: location.clone(),
                        quantity: *qty,
                    })
            })
            .collect()
    }

    /// Products at or below their threshold in `view`, negatives included.
    pub fn low_stock(&self, view: &StockView) -> Vec<&Product> {
        self.stock
            .iter()
            .filter(|p| StockStatus::classify(view.quantity_of(p), p.min_quantity) != StockStatus::InStock)
            .collect()
    }

    /// Issued sales without an invoice number and transfers without a
    /// transfer note number, newest first.
    pub fn pending_documents(&self) -> Vec<PendingDocument> {
        self.registry
            .list()
            .filter_map(|doc| {
                pending_reason(doc).map(|reason| PendingDocument {
                    document_id: doc.id.clone(),
                    document_number: doc.number.clone(),
                    reason,
                })
            })
            .collect()
    }

    pub fn location_breakdown(&self, product_id: &str) -> CoreResult<LocationBreakdown> {
        let product = self
            .stock
            .get(product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        let per_location = self
            .config
            .locations
            .iter()
            .map(|location| (location.clone(), product.quantity_at(location)))
            .collect();
        let global = product.total_quantity();
        Ok(LocationBreakdown {
            product_id: product.id.clone(),
            per_location,
            global,
            status: StockStatus::classify(global, product.min_quantity),
        })
    }
}
