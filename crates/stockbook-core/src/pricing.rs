//! # Pricing Calculator
//!
//! Pure functions computing line and invoice amounts.
//!
//! ## Formula Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  quantity × selling_price                                               │
//! │       │                                                                 │
//! │       ▼  line_total: less line discount %                               │
//! │  total_amount (pre-tax)                                                 │
//! │       │                                                                 │
//! │       ▼  line_total_with_tax: plus GST %                                │
//! │  total_amount_with_gst ──┐                                              │
//! │                          │ Σ over all lines                             │
//! │                          ▼                                              │
//! │                    invoice total_amount                                 │
//! │                          │                                              │
//! │                          ▼  invoice_total: less invoice discount %      │
//! │                    total_amount_after_discount                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inputs are checked before anything is computed: a negative quantity or
//! price, or a percentage outside 0..=100, is an error. Nothing is clamped.

use crate::error::{CoreResult, ValidationError};
use crate::money::{Money, Percentage};

/// Both amounts of one priced line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub total_amount: Money,
    pub total_amount_with_gst: Money,
}

/// `quantity × selling_price × (1 − discount/100)`.
///
/// ## Example
/// ```rust
/// use stockbook_core::money::{Money, Percentage};
/// use stockbook_core::pricing::line_total;
///
/// let total = line_total(4, Money::from_cents(2_500), Percentage::from_bps(1_000)).unwrap();
/// assert_eq!(total.cents(), 9_000);
/// ```
pub fn line_total(quantity: i64, selling_price: Money, discount: Percentage) -> CoreResult<Money> {
    if quantity < 0 {
        return Err(ValidationError::Negative {
            field: "quantity".to_string(),
        }
        .into());
    }
    check_price("sellingPrice", selling_price)?;
    check_percentage("discount", discount)?;

    let gross = selling_price
        .checked_mul_quantity(quantity)
        .ok_or_else(|| overflow("totalAmount"))?;

    Ok(gross.less_percentage(discount))
}

/// `pre_tax × (1 + gst/100)`.
pub fn line_total_with_tax(pre_tax: Money, gst: Percentage) -> CoreResult<Money> {
    check_price("totalAmount", pre_tax)?;
    check_percentage("gst", gst)?;

    pre_tax
        .plus_percentage(gst)
        .ok_or_else(|| overflow("totalAmountWithGst"))
}

/// `sum_with_tax × (1 − discount/100)`, the invoice amount after discount.
pub fn invoice_total(sum_with_tax: Money, discount: Percentage) -> CoreResult<Money> {
    check_price("totalAmount", sum_with_tax)?;
    check_percentage("discount", discount)?;

    Ok(sum_with_tax.less_percentage(discount))
}

/// Prices one order line: [`line_total`] followed by [`line_total_with_tax`].
pub fn price_line(
    quantity: i64,
    selling_price: Money,
    discount: Percentage,
    gst: Percentage,
) -> CoreResult<LineAmounts> {
    let total_amount = line_total(quantity, selling_price, discount)?;
    let total_amount_with_gst = line_total_with_tax(total_amount, gst)?;

    Ok(LineAmounts {
        total_amount,
        total_amount_with_gst,
    })
}

fn check_price(field: &str, amount: Money) -> CoreResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        }
        .into());
    }
    Ok(())
}

fn check_percentage(field: &str, pct: Percentage) -> CoreResult<()> {
    if !pct.is_valid() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        }
        .into());
    }
    Ok(())
}

fn overflow(field: &str) -> crate::error::CoreError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
    .into()
}
