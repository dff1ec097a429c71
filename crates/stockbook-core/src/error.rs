//! # Error Types
//!
//! Domain-specific error types for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockbook-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockbook-db errors                                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  stockbook-invoice errors                                              │
//! │  └── InvoiceError     - What callers of invoice.create see             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → InvoiceError → ApiResponse        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Product does not exist or belongs to another shop.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer does not exist or belongs to another shop.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Requested quantity exceeds the stock available at reservation time.
    ///
    /// ## User Workflow
    /// ```text
    /// Order line (qty: 5)
    ///      │
    ///      ▼
    /// Reserve: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole invoice aborted, stock untouched
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// An invoice cannot be finalized without at least one line.
    #[error("Invoice has no items")]
    EmptyInvoice,

    /// One or more order fields failed validation.
    ///
    /// All failing fields are collected so the caller can fix them in one go.
    #[error("Invalid parameters: {}", field_list(.0))]
    InvalidParameters(Vec<ValidationError>),

    /// Single validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Names of the fields that caused a validation failure, if any.
    pub fn invalid_fields(&self) -> Vec<String> {
        match self {
            CoreError::InvalidParameters(errors) => {
                errors.iter().map(|e| e.field().to_string()).collect()
            }
            CoreError::Validation(e) => vec![e.field().to_string()],
            CoreError::EmptyInvoice => vec!["items".to_string()],
            _ => Vec::new(),
        }
    }
}

fn field_list(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Raised before any monetary computation or stock access.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, NaN percentage).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Monetary result does not fit in the amount representation.
    #[error("{field} overflows the supported amount range")]
    Overflow { field: String },
}

impl ValidationError {
    /// The name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Overflow { field } => field,
        }
    }

    /// Returns the same error reported against a different field name.
    ///
    /// Used to qualify line-level errors, e.g. `quantity` → `items[2].quantity`.
    pub fn with_field(self, name: impl Into<String>) -> Self {
        let field = name.into();
        match self {
            ValidationError::Required { .. } => ValidationError::Required { field },
            ValidationError::OutOfRange { min, max, .. } => {
                ValidationError::OutOfRange { field, min, max }
            }
            ValidationError::MustBePositive { .. } => ValidationError::MustBePositive { field },
            ValidationError::Negative { .. } => ValidationError::Negative { field },
            ValidationError::InvalidFormat { reason, .. } => {
                ValidationError::InvalidFormat { field, reason }
            }
            ValidationError::Overflow { .. } => ValidationError::Overflow { field },
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
