//! # Commercial Documents
//!
//! Sale receipts, inter-shop transfer notes and VAT refund forms.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Document                                                               │
//! │  ├── id          immutable, survives every edit                        │
//! │  ├── number      "R-1", unique among documents (trim + case-fold)      │
//! │  ├── source      shop losing the stock                                 │
//! │  ├── kind ───────┬── Sale                                              │
//! │  │               ├── Transfer { destination, transfer_note_number }    │
//! │  │               └── Refund   { visitor }                              │
//! │  ├── line_items  product snapshot + quantity (+ per-line destination)  │
//! │  ├── total_cents what the customer paid                                │
//! │  └── status      Issued | Cancelled                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-variant fields are enforced by the type: a transfer cannot exist
//! without a destination. Structural sanity (non-empty lines, positive
//! quantities, a transfer not pointing at its own source) is checked by
//! [`Document::validate`], which the engine calls before touching state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CustomerContact, LocationId, MovementKind, TaxRate};
use crate::validation::{self, ValidationResult};

// =============================================================================
// Document Type / Status
// =============================================================================

/// Flat discriminant of [`DocumentKind`], for storage and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum DocumentType {
    Sale,
    Transfer,
    Refund,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Sale => "SALE",
            DocumentType::Transfer => "TRANSFER",
            DocumentType::Refund => "REFUND",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DocumentStatus {
    #[default]
    Issued,
    /// Stock effect reverted, number still reserved.
    Cancelled,
}

// =============================================================================
// Document Kind
// =============================================================================

/// Tourist details printed on a VAT refund form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VisitorDetails {
    pub surname: String,
    pub other_names: String,
    pub passport_number: String,
    pub nationality: String,
    pub date_of_issue: Option<String>,
    pub date_of_expiry: Option<String>,
    pub flight_number: String,
    pub departure_date: Option<String>,
    pub permanent_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
#[ts(export)]
pub enum DocumentKind {
    Sale,
    Transfer {
        /// Default destination for lines that do not name their own.
        destination: LocationId,
        #[serde(default)]
        transfer_note_number: Option<String>,
    },
    Refund {
        visitor: VisitorDetails,
    },
}

impl DocumentKind {
    pub fn document_type(&self) -> DocumentType {
        match self {
            DocumentKind::Sale => DocumentType::Sale,
            DocumentKind::Transfer { .. } => DocumentType::Transfer,
            DocumentKind::Refund { .. } => DocumentType::Refund,
        }
    }

    /// Sales and refund forms carry a paying customer; transfers do not.
    pub fn counts_towards_spend(&self) -> bool {
        !matches!(self, DocumentKind::Transfer { .. })
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product line. Name, SKU and prices are frozen at issue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub promo_price_cents: Option<i64>,
    #[serde(default)]
    pub offers: Option<String>,
    /// Transfers only: overrides the document destination for this line.
    #[serde(default)]
    pub destination: Option<LocationId>,
}

impl LineItem {
    pub fn new(
        product_id: impl Into<String>,
        sku: impl Into<String>,
        name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        LineItem {
            product_id: product_id.into(),
            sku: sku.into(),
            name: name.into(),
            quantity,
            unit_price_cents: unit_price.cents(),
            promo_price_cents: None,
            offers: None,
            destination: None,
        }
    }

    pub fn with_destination(mut self, destination: LocationId) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_promo_price(mut self, promo: Money) -> Self {
        self.promo_price_cents = Some(promo.cents());
        self
    }

    /// Unit price charged: a positive promo price wins.
    pub fn charged_unit_price(&self) -> Money {
        match self.promo_price_cents {
            Some(promo) if promo > 0 => Money::from_cents(promo),
            _ => Money::from_cents(self.unit_price_cents),
        }
    }

    pub fn line_total(&self) -> Money {
        self.charged_unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Stock Effect
// =============================================================================

/// One signed stock delta implied by a line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockEffect<'a> {
    pub line: &'a LineItem,
    pub location: LocationId,
    pub kind: MovementKind,
    pub delta: i64,
}

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Document {
    pub id: String,
    pub number: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub source: LocationId,
    pub kind: DocumentKind,
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub customer: Option<CustomerContact>,
    #[serde(default)]
    pub salesperson: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub footer_note: Option<String>,
    /// Whole-document discount in basis points (1000 = 10%).
    #[serde(default)]
    pub discount_bps: u32,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    #[serde(default)]
    pub status: DocumentStatus,
}

impl Document {
    fn with_kind(
        id: impl Into<String>,
        number: impl Into<String>,
        source: LocationId,
        kind: DocumentKind,
        line_items: Vec<LineItem>,
    ) -> Self {
        let subtotal: Money = line_items.iter().map(LineItem::line_total).sum();
        Document {
            id: id.into(),
            number: number.into(),
            date: Utc::now(),
            source,
            kind,
            line_items,
            customer: None,
            salesperson: None,
            invoice_number: None,
            payment_method: None,
            payment_reference: None,
            footer_note: None,
            discount_bps: 0,
            subtotal_cents: subtotal.cents(),
            total_cents: subtotal.cents(),
            status: DocumentStatus::Issued,
        }
    }

    /// A sale receipt. Totals start as the sum of line totals.
    pub fn sale(
        id: impl Into<String>,
        number: impl Into<String>,
        source: LocationId,
        line_items: Vec<LineItem>,
    ) -> Self {
        Self::with_kind(id, number, source, DocumentKind::Sale, line_items)
    }

    /// A transfer note moving stock from `source` to `destination`.
    pub fn transfer(
        id: impl Into<String>,
        number: impl Into<String>,
        source: LocationId,
        destination: LocationId,
        line_items: Vec<LineItem>,
    ) -> Self {
        let kind = DocumentKind::Transfer {
            destination,
            transfer_note_number: None,
        };
        Self::with_kind(id, number, source, kind, line_items)
    }

    /// A VAT refund form for a departing visitor.
    pub fn refund(
        id: impl Into<String>,
        number: impl Into<String>,
        source: LocationId,
        visitor: VisitorDetails,
        line_items: Vec<LineItem>,
    ) -> Self {
        Self::with_kind(id, number, source, DocumentKind::Refund { visitor }, line_items)
    }

    pub fn with_customer(mut self, customer: CustomerContact) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Applies a percentage discount and recomputes the total.
    pub fn with_discount(mut self, discount_bps: u32) -> Self {
        self.discount_bps = discount_bps;
        self.total_cents = self.subtotal().apply_percentage_discount(discount_bps).cents();
        self
    }

    /// Overrides the paid total, e.g. when the till rounded it.
    pub fn with_total(mut self, total: Money) -> Self {
        self.total_cents = total.cents();
        self
    }

    pub fn with_invoice_number(mut self, invoice_number: impl Into<String>) -> Self {
        self.invoice_number = Some(invoice_number.into());
        self
    }

    pub fn dated(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    #[inline]
    pub fn document_type(&self) -> DocumentType {
        self.kind.document_type()
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == DocumentStatus::Cancelled
    }

    /// Number in the form used for uniqueness comparisons.
    pub fn normalized_number(&self) -> String {
        validation::normalize_document_number(&self.number)
    }

    /// Where a line's units end up. `None` for sales and refunds.
    pub fn destination_for<'a>(&'a self, line: &'a LineItem) -> Option<&'a LocationId> {
        match &self.kind {
            DocumentKind::Transfer { destination, .. } => {
                Some(line.destination.as_ref().unwrap_or(destination))
            }
            _ => None,
        }
    }

    /// Every stock delta this document applies, in line order.
    ///
    /// | Type     | source           | destination      |
    /// |----------|------------------|------------------|
    /// | SALE     | OUT (-qty)       | n/a              |
    /// | TRANSFER | OUT (-qty)       | IN (+qty)        |
    /// | REFUND   | OUT (-qty)       | n/a              |
    ///
    /// Reverting applies the same list with every delta negated.
    pub fn stock_effects(&self) -> Vec<StockEffect<'_>> {
        self.line_items
            .iter()
            .flat_map(|line| self.line_effects(line))
            .collect()
    }

    /// The one or two deltas a single line applies.
    pub fn line_effects<'a>(&'a self, line: &'a LineItem) -> Vec<StockEffect<'a>> {
        let mut effects = vec![StockEffect {
            line,
            location: self.source.clone(),
            kind: MovementKind::Out,
            delta: -line.quantity,
        }];
        if let Some(destination) = self.destination_for(line) {
            effects.push(StockEffect {
                line,
                location: destination.clone(),
                kind: MovementKind::In,
                delta: line.quantity,
            });
        }
        effects
    }

    /// Structural sanity check performed before any mutation.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::required("document id"));
        }
        validation::validate_document_number(&self.number)?;
        if self.source.as_str().is_empty() {
            return Err(ValidationError::required("source location"));
        }
        if self.line_items.is_empty() {
            return Err(ValidationError::required("line items"));
        }
        if self.discount_bps > 10_000 {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: 10_000,
            });
        }
        for line in &self.line_items {
            if line.product_id.trim().is_empty() {
                return Err(ValidationError::required("line item product id"));
            }
            validation::validate_quantity(line.quantity)?;
            if let Some(destination) = self.destination_for(line) {
                if destination.as_str().is_empty() {
                    return Err(ValidationError::required("transfer destination"));
                }
                if *destination == self.source {
                    return Err(ValidationError::invalid(
                        "transfer destination",
                        format!("'{}' is also the source", destination),
                    ));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Printed totals of a receipt or refund form.
///
/// Shelf prices include VAT, so VAT is extracted from the discounted total
/// rather than added on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub vat_included: Money,
    pub total_excl_vat: Money,
}

impl DocumentTotals {
    pub fn compute(lines: &[LineItem], discount_bps: u32, vat: TaxRate) -> Self {
        let subtotal: Money = lines.iter().map(LineItem::line_total).sum();
        let total = subtotal.apply_percentage_discount(discount_bps);
        let vat_included = total.included_tax(vat);
        DocumentTotals {
            subtotal,
            discount: subtotal - total,
            total,
            vat_included,
            total_excl_vat: total - vat_included,
        }
    }

    /// Totals for a document as stored. The stored total wins over
    /// recomputation.
    pub fn for_document(document: &Document, vat: TaxRate) -> Self {
        let subtotal = document.subtotal();
        let total = document.total();
        let vat_included = total.included_tax(vat);
        DocumentTotals {
            subtotal,
            discount: subtotal - total,
            total,
            vat_included,
            total_excl_vat: total - vat_included,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
