//! # Validation Module
//!
//! Normalization and structural checks for caller input.
//!
//! The engine does not validate form fields (required-ness of customer
//! details and the like); that is the authoring UI's job. What lives here is
//! the small set of rules the stores depend on:
//!
//! - SKUs are stored uppercase-trimmed
//! - document numbers compare trimmed and case-insensitive
//! - line quantities are positive
//! - prices and rates stay inside sane bounds

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Normalizers
// =============================================================================

/// Canonical SKU form: trimmed, uppercase.
///
/// ```rust
/// use stockroom_core::validation::normalize_sku;
///
/// assert_eq!(normalize_sku("  tv-55 "), "TV-55");
/// ```
pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_uppercase()
}

/// Canonical document number used for uniqueness checks.
///
/// ```rust
/// use stockroom_core::validation::normalize_document_number;
///
/// assert_eq!(normalize_document_number(" r-1 "), normalize_document_number("R-1"));
/// ```
pub fn normalize_document_number(number: &str) -> String {
    number.trim().to_lowercase()
}

/// Canonical product name form used by import matching.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

// =============================================================================
// String Validators
// =============================================================================

pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

pub fn validate_document_number(number: &str) -> ValidationResult<()> {
    let number = number.trim();

    if number.is_empty() {
        return Err(ValidationError::required("document number"));
    }

    if number.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "document number".to_string(),
            max: 64,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Line item quantity: strictly positive and below the sanity cap.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Prices may be zero (giveaways) but never negative.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Rates above 100% are rejected.
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
