//! # Validation Module
//!
//! Input validation for Stockbook.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Envelope (stockbook-invoice::api)                             │
//! │  └── JSON shape (deserialization)                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Required fields, id format                                         │
//! │  ├── Positive quantities, non-negative prices                           │
//! │  └── Percentages within 0..=100                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK (quantity >= 0)                                              │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`validate_invoice_request`] collects every failing field instead of
//! stopping at the first, so a rejected order reports all of its problems.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Percentage};
use crate::types::{InvoiceLineRequest, InvoiceOrder, InvoiceRequest, OrderLine};
use crate::MAX_INVOICE_LINES;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (shop, category, customer, product).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: 200,
        });
    }

    Ok(())
}

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("customerId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("customerId", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a requested or received quantity: must be > 0.
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a price in minor units: must be >= 0 (free items allowed).
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Largest whole number a JSON number carries exactly.
const MAX_EXACT_AMOUNT: i64 = 1 << 53;

/// Converts a wire price in minor units to cents.
///
/// The wire value is a JSON number, so `1999` and `1999.0` are both
/// accepted while `19.99` is not a whole number of minor units.
pub fn validate_price_amount(field: &str, amount: f64) -> ValidationResult<i64> {
    if !amount.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if amount < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if amount.fract() != 0.0 {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a whole number of minor units".to_string(),
        });
    }
    if amount > MAX_EXACT_AMOUNT as f64 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_EXACT_AMOUNT,
        });
    }
    Ok(amount as i64)
}

/// Parses an optional wire percentage; absent means 0%.
pub fn validate_percentage(field: &str, pct: Option<f64>) -> ValidationResult<Percentage> {
    match pct {
        None => Ok(Percentage::zero()),
        Some(value) => Percentage::try_from_percent(field, value),
    }
}

// =============================================================================
// Order Validation
// =============================================================================

/// Validates an `invoice.create` request and converts it to an [`InvoiceOrder`].
///
/// ## Rules
/// - `customerId` present and a UUID
/// - `discount` absent or within 0..=100
/// - `items` present, non-empty, at most [`MAX_INVOICE_LINES`]
/// - per line: `productId` UUID, `quantity` > 0, `sellingPrice` a whole number >= 0,
///   `discount`/`gst` absent or within 0..=100
///
/// ## Errors
/// `CoreError::InvalidParameters` listing every failing field, with line
/// fields qualified as `items[i].field`.
pub fn validate_invoice_request(request: &InvoiceRequest) -> CoreResult<InvoiceOrder> {
    let mut errors = Vec::new();

    let customer_id = match request.customer_id.as_deref() {
        Some(id) => match validate_uuid("customerId", id) {
            Ok(()) => Some(id.to_string()),
            Err(e) => {
                errors.push(e);
                None
            }
        },
        None => {
            errors.push(ValidationError::Required {
                field: "customerId".to_string(),
            });
            None
        }
    };

    let discount = validate_percentage("discount", request.discount).unwrap_or_else(|e| {
        errors.push(e);
        Percentage::zero()
    });

    let mut lines = Vec::new();
    match request.items.as_deref() {
        None | Some([]) => errors.push(ValidationError::Required {
            field: "items".to_string(),
        }),
        Some(items) if items.len() > MAX_INVOICE_LINES => errors.push(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_INVOICE_LINES as i64,
        }),
        Some(items) => {
            for (index, item) in items.iter().enumerate() {
                if let Some(line) = validate_line(index, item, &mut errors) {
                    lines.push(line);
                }
            }
        }
    }

    match customer_id {
        Some(customer_id) if errors.is_empty() => Ok(InvoiceOrder {
            customer_id,
            discount,
            lines,
        }),
        _ => Err(CoreError::InvalidParameters(errors)),
    }
}

fn validate_line(
    index: usize,
    item: &InvoiceLineRequest,
    errors: &mut Vec<ValidationError>,
) -> Option<OrderLine> {
    let before = errors.len();
    let qualify = |field: &str| format!("items[{}].{}", index, field);

    let product_id = required(item.product_id.clone(), &qualify("productId"), errors)
        .filter(|id| record(validate_uuid(&qualify("productId"), id), errors));
    let quantity = required(item.quantity, &qualify("quantity"), errors)
        .filter(|qty| record(validate_quantity(&qualify("quantity"), *qty), errors));
    let selling_price =
        required(item.selling_price, &qualify("sellingPrice"), errors).and_then(|amount| {
            validate_price_amount(&qualify("sellingPrice"), amount)
                .map_err(|e| errors.push(e))
                .ok()
        });
    let discount = validate_percentage(&qualify("discount"), item.discount)
        .map_err(|e| errors.push(e))
        .ok();
    let gst = validate_percentage(&qualify("gst"), item.gst)
        .map_err(|e| errors.push(e))
        .ok();

    if errors.len() != before {
        return None;
    }

    Some(OrderLine {
        product_id: product_id?,
        quantity: quantity?,
        selling_price: Money::from_cents(selling_price?),
        discount: discount?,
        gst: gst?,
    })
}

fn required<T>(value: Option<T>, field: &str, errors: &mut Vec<ValidationError>) -> Option<T> {
    if value.is_none() {
        errors.push(ValidationError::Required {
            field: field.to_string(),
        });
    }
    value
}

fn record(result: ValidationResult<()>, errors: &mut Vec<ValidationError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            errors.push(e);
            false
        }
    }
}
