//! # Invoice Error Type
//!
//! What callers of the invoice engine see when an operation fails.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Stockbook                              │
//! │                                                                         │
//! │  ValidationError ─► CoreError ──┐                                       │
//! │                                 ├──► InvoiceError ──► ApiResponse       │
//! │  sqlx::Error ─► DbError ────────┤    (kind + status)   {errors: [...]}  │
//! │                                 │                                       │
//! │  LedgerError ───────────────────┘                                       │
//! │                                                                         │
//! │  Storage details are logged at `error` and replaced by a generic       │
//! │  message; they never reach the caller.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Kind                   | Status |
//! |------------------------|--------|
//! | `INVALID_PARAMETERS`   | 400    |
//! | `RESOURCE_NOT_FOUND`   | 404    |
//! | `INSUFFICIENT_STOCK`   | 409    |
//! | `CONCURRENCY_CONFLICT` | 409    |
//! | `TIMEOUT`              | 503    |
//! | `STORAGE`              | 500    |

use serde::Serialize;
use stockbook_core::{CoreError, ValidationError};
use stockbook_db::{DbError, LedgerError};
use thiserror::Error;
use ts_rs::TS;

/// Invoice engine errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvoiceError {
    /// Malformed or missing input. Caller-fixable.
    #[error("{message}")]
    InvalidParameters { fields: Vec<String>, message: String },

    /// Customer, product or invoice missing, or owned by another shop.
    #[error("{resource} not found: {id}")]
    ResourceNotFound { resource: String, id: String },

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Stock kept changing underneath the transaction until retries ran out.
    #[error("Stock changed concurrently; gave up after {attempts} attempt(s)")]
    ConcurrencyConflict { attempts: u32 },

    #[error("Timed out: {0}")]
    Timeout(String),

    /// Durable storage failed. The detail stays in the logs.
    #[error("Storage failure")]
    Storage,
}

/// Machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorKind {
    InvalidParameters,
    ResourceNotFound,
    InsufficientStock,
    ConcurrencyConflict,
    Timeout,
    Storage,
}

impl ErrorKind {
    /// HTTP status the envelope answers with.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::InvalidParameters => 400,
            ErrorKind::ResourceNotFound => 404,
            ErrorKind::InsufficientStock | ErrorKind::ConcurrencyConflict => 409,
            ErrorKind::Timeout => 503,
            ErrorKind::Storage => 500,
        }
    }
}

impl InvoiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvoiceError::InvalidParameters { .. } => ErrorKind::InvalidParameters,
            InvoiceError::ResourceNotFound { .. } => ErrorKind::ResourceNotFound,
            InvoiceError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            InvoiceError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            InvoiceError::Timeout(_) => ErrorKind::Timeout,
            InvoiceError::Storage => ErrorKind::Storage,
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        InvoiceError::ResourceNotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// Invalid input not tied to a single field (e.g. an unparsable body).
    pub fn invalid(message: impl Into<String>) -> Self {
        InvoiceError::InvalidParameters {
            fields: Vec::new(),
            message: message.into(),
        }
    }

    /// Offending field names, for `INVALID_PARAMETERS` only.
    pub fn fields(&self) -> Option<&[String]> {
        match self {
            InvoiceError::InvalidParameters { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }
}

impl From<ValidationError> for InvoiceError {
    fn from(err: ValidationError) -> Self {
        InvoiceError::InvalidParameters {
            fields: vec![err.field().to_string()],
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for InvoiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => InvoiceError::not_found("Product", &id),
            CoreError::CustomerNotFound(id) => InvoiceError::not_found("Customer", &id),
            CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => InvoiceError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            CoreError::Validation(e) => e.into(),
            other @ (CoreError::EmptyInvoice | CoreError::InvalidParameters(_)) => {
                InvoiceError::InvalidParameters {
                    fields: other.invalid_fields(),
                    message: other.to_string(),
                }
            }
        }
    }
}

/// Converts database errors, logging what the caller won't see.
impl From<DbError> for InvoiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => InvoiceError::not_found(&entity, &id),
            DbError::Validation(e) => e.into(),
            DbError::Busy(e) => {
                tracing::warn!("Database busy: {}", e);
                InvoiceError::ConcurrencyConflict { attempts: 1 }
            }
            DbError::PoolExhausted => {
                InvoiceError::Timeout("no database connection became available".to_string())
            }
            other => {
                tracing::error!("Storage failure: {}", other);
                InvoiceError::Storage
            }
        }
    }
}

impl From<LedgerError> for InvoiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Stock(e) => e.into(),
            LedgerError::Conflict { .. } => InvoiceError::ConcurrencyConflict { attempts: 1 },
            LedgerError::Db(e) => e.into(),
        }
    }
}

/// Result type for invoice engine operations.
pub type InvoiceResult<T> = Result<T, InvoiceError>;
