//! # Domain Types
//!
//! Catalog, ledger and customer types shared by every store.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │    Product       │   │  MovementRecord  │   │ CustomerProfile  │    │
//! │  │  ──────────────  │   │  ──────────────  │   │  ──────────────  │    │
//! │  │  id (UUID)       │◄──│  product_id      │   │  id (UUID)       │    │
//! │  │  sku             │   │  location        │   │  name / email    │    │
//! │  │  stocks          │   │  kind IN/OUT/ADJ │   │  lifetime_spend  │    │
//! │  │   loc → qty      │   │  quantity_delta  │   │  last_visit      │    │
//! │  │  price_cents     │   │  reference       │   └──────────────────┘    │
//! │  └──────────────────┘   └──────────────────┘                           │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐                           │
//! │  │   LocationId     │   │     TaxRate      │                           │
//! │  │  "Master",       │   │  bps (u32)       │                           │
//! │  │  "Plouis", ...   │   │  1500 = 15%      │                           │
//! │  └──────────────────┘   └──────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Documents live in [`crate::document`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1500 = 15%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Location
// =============================================================================

/// A shop terminal where stock is physically held.
///
/// The aggregate "global" view is not a location; see
/// [`StockView`](crate::report::StockView).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct LocationId(String);

// Saved snapshots and UI payloads go through the same trim as `new`.
impl<'de> Deserialize<'de> for LocationId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(LocationId::new)
    }
}

impl LocationId {
    /// Creates a location id, trimming surrounding whitespace.
    pub fn new(name: impl AsRef<str>) -> Self {
        LocationId(name.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationId {
    fn from(name: &str) -> Self {
        LocationId::new(name)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog entry together with its per-location stock.
///
/// Quantities may be negative. A negative value means more units left a
/// shop on paper than were booked into it, and is reported, never clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit, stored uppercase-trimmed. Not unique.
    pub sku: String,

    pub name: String,

    pub category: String,

    #[serde(default)]
    pub description: String,

    /// Quantity on hand per location. Absent means zero.
    #[serde(default)]
    pub stocks: BTreeMap<LocationId, i64>,

    /// At or below this quantity a location is reported as low.
    pub min_quantity: i64,

    /// Shelf price in cents, VAT inclusive.
    pub price_cents: i64,

    /// Promotional price in cents, when a promotion runs.
    #[serde(default)]
    pub promo_price_cents: Option<i64>,

    /// Free-text offer line printed on receipts ("2 for 1", ...).
    #[serde(default)]
    pub offers: Option<String>,

    /// Touched on every stock adjustment and catalog edit.
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn promo_price(&self) -> Option<Money> {
        self.promo_price_cents.map(Money::from_cents)
    }

    /// The price a unit actually sells for: a positive promo price wins.
    pub fn effective_price(&self) -> Money {
        match self.promo_price_cents {
            Some(promo) if promo > 0 => Money::from_cents(promo),
            _ => self.price(),
        }
    }

    /// Quantity at one location, zero if never stocked there.
    pub fn quantity_at(&self, location: &LocationId) -> i64 {
        self.stocks.get(location).copied().unwrap_or(0)
    }

    /// Sum over every location.
    pub fn total_quantity(&self) -> i64 {
        self.stocks.values().sum()
    }
}

// =============================================================================
// Movement Kind
// =============================================================================

/// Direction of a ledger row.
///
/// | Kind   | `quantity_delta` |
/// |--------|------------------|
/// | IN     | `>= 0`           |
/// | OUT    | `<= 0`           |
/// | ADJUST | any sign, or 0 for annotation-only rows |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum MovementKind {
    In,
    Out,
    Adjust,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "IN",
            MovementKind::Out => "OUT",
            MovementKind::Adjust => "ADJUST",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementKind {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "IN" => Ok(MovementKind::In),
            "OUT" => Ok(MovementKind::Out),
            "ADJUST" => Ok(MovementKind::Adjust),
            other => Err(crate::error::ValidationError::invalid(
                "movement kind",
                format!("unknown kind '{}'", other),
            )),
        }
    }
}

// =============================================================================
// Movement Record
// =============================================================================

/// One ledger row explaining a single product/location quantity change.
///
/// `quantity_delta` is signed and equals exactly what was applied to the
/// stock store. Name and SKU are snapshots so rows stay readable after the
/// catalog drifts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementRecord {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub location: LocationId,
    pub kind: MovementKind,
    pub quantity_delta: i64,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    /// Document number this row belongs to, or a bulk marker.
    pub reference: Option<String>,
    pub note: String,
}

impl MovementRecord {
    /// Starts a row for a catalog product. Reference and note are added with
    /// the `with_*` methods.
    pub fn for_product(
        product: &Product,
        location: LocationId,
        kind: MovementKind,
        quantity_delta: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        MovementRecord {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            sku: product.sku.clone(),
            location,
            kind,
            quantity_delta,
            timestamp,
            reference: None,
            note: String::new(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Unsigned quantity, as shown in a movement list.
    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity_delta.abs()
    }
}

// =============================================================================
// Customers
// =============================================================================

/// Customer details as typed on a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerContact {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl CustomerContact {
    pub fn named(name: impl Into<String>) -> Self {
        CustomerContact {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Blank names and the configured walk-in name do not get a profile.
    pub fn is_anonymous(&self, guest_name: &str) -> bool {
        let name = self.name.trim();
        name.is_empty() || name == guest_name
    }

    /// Email with blanks treated as absent.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Aggregated customer record derived from issued documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerProfile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub last_visit: DateTime<Utc>,
    /// Maintained incrementally, never re-summed from documents.
    pub lifetime_spend_cents: i64,
}

impl CustomerProfile {
    #[inline]
    pub fn lifetime_spend(&self) -> Money {
        Money::from_cents(self.lifetime_spend_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
