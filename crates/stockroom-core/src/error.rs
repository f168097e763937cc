//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── CoreError        - Hard failures that block an operation          │
//! │  └── ValidationError  - Structural problems in caller input            │
//! │                                                                         │
//! │  stockroom-db errors (separate crate)                                  │
//! │  └── DbError          - Database, config and snapshot failures         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT An Error
//! Unknown product references on a line item and negative stock are soft
//! conditions. They come back as [`IssueWarning`](crate::engine::IssueWarning)
//! values and are annotated in the movement ledger. Retail operations must
//! keep flowing even when bookkeeping lags behind the shelf.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors returned by engine operations.
///
/// Every variant is raised before any state is touched.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Another document already holds this number.
    ///
    /// ## When This Occurs
    /// ```text
    /// Registry: SALE  "R-1" (id A)
    ///      │
    ///      ▼
    /// issue(REFUND "r-1 " (id B))
    ///      │  normalize → "R-1"
    ///      ▼
    /// DuplicateDocumentNumber { number: "r-1 ", existing_id: A }
    /// ```
    #[error("Document number '{number}' is already used by document {existing_id}")]
    DuplicateDocumentNumber { number: String, existing_id: String },

    /// No document with this id exists in the registry.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// The document was already cancelled.
    #[error("Document {0} is already cancelled")]
    DocumentAlreadyCancelled(String),

    /// No product with this id exists in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The location is not part of the configured shop set.
    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a DuplicateDocumentNumber error.
    pub fn duplicate_number(number: impl Into<String>, existing_id: impl Into<String>) -> Self {
        CoreError::DuplicateDocumentNumber {
            number: number.into(),
            existing_id: existing_id.into(),
        }
    }

    /// Returns true if the caller can fix the input and retry.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            CoreError::DuplicateDocumentNumber { .. } | CoreError::Validation(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., a location listed twice).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
