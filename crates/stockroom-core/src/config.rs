//! # Engine Configuration
//!
//! Pure data describing the shop network and business constants. Loading
//! from disk and environment happens in `stockroom-db`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{LocationId, TaxRate};
use crate::validation::{validate_rate_bps, ValidationResult};

/// Shops that hold stock, in display order.
pub const DEFAULT_LOCATIONS: &[&str] = &[
    "Master",
    "Plouis",
    "Bagatelle",
    "Tribecca",
    "Trianon",
    "Rhill",
    "Cascavelle",
    "Rosebelle",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Shops that hold stock.
    #[serde(default = "default_locations")]
    pub locations: Vec<LocationId>,

    /// Where catalog-level ADJUST rows (price, promo, offer changes) and
    /// opening stock are booked.
    #[serde(default = "default_master_location")]
    pub master_location: LocationId,

    /// Walk-in customer name that never gets a profile.
    #[serde(default = "default_guest_name")]
    pub guest_customer_name: String,

    /// Low-stock threshold for products created by import.
    #[serde(default = "default_min_quantity")]
    pub default_min_quantity: i64,

    /// VAT rate included in shelf prices, in basis points.
    #[serde(default = "default_vat_rate_bps")]
    pub vat_rate_bps: u32,

    #[serde(default = "default_currency")]
    pub currency_code: String,
}

fn default_locations() -> Vec<LocationId> {
    DEFAULT_LOCATIONS.iter().map(|name| LocationId::new(name)).collect()
}

fn default_master_location() -> LocationId {
    LocationId::new("Master")
}

fn default_guest_name() -> String {
    "Guest".to_string()
}

fn default_min_quantity() -> i64 {
    5
}

fn default_vat_rate_bps() -> u32 {
    1500
}

fn default_currency() -> String {
    "MUR".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            locations: default_locations(),
            master_location: default_master_location(),
            guest_customer_name: default_guest_name(),
            default_min_quantity: default_min_quantity(),
            vat_rate_bps: default_vat_rate_bps(),
            currency_code: default_currency(),
        }
    }
}

impl EngineConfig {
    #[inline]
    pub fn vat_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.vat_rate_bps)
    }

    pub fn is_known_location(&self, location: &LocationId) -> bool {
        self.locations.contains(location)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if self.locations.is_empty() {
            return Err(ValidationError::required("locations"));
        }

        let mut seen = HashSet::new();
        for location in &self.locations {
            if location.as_str().is_empty() {
                return Err(ValidationError::required("location name"));
            }
            if !seen.insert(location) {
                return Err(ValidationError::Duplicate {
                    field: "location".to_string(),
                    value: location.to_string(),
                });
            }
        }

        if !self.is_known_location(&self.master_location) {
            return Err(ValidationError::invalid(
                "master_location",
                format!("'{}' is not one of the configured locations", self.master_location),
            ));
        }

        if self.default_min_quantity < 0 {
            return Err(ValidationError::OutOfRange {
                field: "default_min_quantity".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }

        if self.currency_code.trim().is_empty() {
            return Err(ValidationError::required("currency_code"));
        }

        validate_rate_bps("vat_rate_bps", self.vat_rate_bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.locations.len(), 8);
        assert_eq!(config.vat_rate().bps(), 1500);
        assert_eq!(config.currency_code, "MUR");
    }

    #[test]
    fn test_rejects_master_outside_locations() {
        let config = EngineConfig {
            master_location: LocationId::new("Warehouse"),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_locations() {
        let mut config = EngineConfig::default();
        config.locations.push(LocationId::new("Plouis"));
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_rejects_vat_above_hundred_percent() {
        let config = EngineConfig {
            vat_rate_bps: 12_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
