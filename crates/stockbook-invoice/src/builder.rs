//! # Invoice Builder
//!
//! Accumulates the lines of one invoice-in-progress.
//!
//! ```text
//! add_line(product, line)
//!   │
//!   ├─ 1. price_line()           CoreError on bad input, nothing reserved
//!   ├─ 2. running sums checked   overflow rejected, nothing reserved
//!   ├─ 3. StockLedger::reserve   on the coordinator's transaction
//!   └─ 4. push InvoiceItem, update sums
//!
//! finalize(invoice discount) ─► InvoiceDraft (pure, no storage)
//! ```
//!
//! The builder never owns a connection. When a line fails the coordinator
//! drops the builder together with its transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use stockbook_core::money::{Money, Percentage};
use stockbook_core::pricing::{invoice_total, price_line};
use stockbook_core::{CoreError, CoreResult, InvoiceItem, OrderLine, Product, ValidationError};
use stockbook_db::{LedgerResult, StockLedger};
use uuid::Uuid;

/// Totals and items of a finished builder, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub invoice_id: String,
    pub created_at: DateTime<Utc>,
    /// Sum of the lines before GST.
    pub total_before_tax: Money,
    /// Sum of the lines' `total_amount_with_gst`; the invoice `totalAmount`.
    pub total_amount: Money,
    pub total_amount_after_discount: Money,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug)]
pub struct InvoiceBuilder {
    invoice_id: String,
    created_at: DateTime<Utc>,
    items: Vec<InvoiceItem>,
    total_before_tax: Money,
    total_with_tax: Money,
}

impl InvoiceBuilder {
    pub fn new() -> Self {
        InvoiceBuilder {
            invoice_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            items: Vec::new(),
            total_before_tax: Money::zero(),
            total_with_tax: Money::zero(),
        }
    }

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    /// Prices `line`, reserves its stock and appends it.
    ///
    /// `product` must already be resolved within the invoice's shop.
    pub async fn add_line(
        &mut self,
        conn: &mut SqliteConnection,
        ledger: &StockLedger,
        product: &Product,
        line: &OrderLine,
    ) -> LedgerResult<&InvoiceItem> {
        let amounts = price_line(line.quantity, line.selling_price, line.discount, line.gst)?;

        let total_before_tax = self
            .total_before_tax
            .checked_add(amounts.total_amount)
            .ok_or_else(|| overflow("totalAmount"))?;
        let total_with_tax = self
            .total_with_tax
            .checked_add(amounts.total_amount_with_gst)
            .ok_or_else(|| overflow("totalAmount"))?;

        ledger
            .reserve(conn, &product.id, &product.shop_id, line.quantity)
            .await?;

        self.total_before_tax = total_before_tax;
        self.total_with_tax = total_with_tax;
        self.items.push(InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: self.invoice_id.clone(),
            product_id: product.id.clone(),
            line_no: self.items.len() as i64,
            quantity: line.quantity,
            selling_price_cents: line.selling_price.cents(),
            discount_bps: line.discount.bps(),
            gst_bps: line.gst.bps(),
            total_amount_cents: amounts.total_amount.cents(),
            total_amount_with_gst_cents: amounts.total_amount_with_gst.cents(),
            created_at: self.created_at,
        });

        let item = &self.items[self.items.len() - 1];
        Ok(item)
    }

    /// Applies the invoice-level discount and hands over the items.
    pub fn finalize(self, discount: Percentage) -> CoreResult<InvoiceDraft> {
        if self.items.is_empty() {
            return Err(CoreError::EmptyInvoice);
        }

        let total_amount_after_discount = invoice_total(self.total_with_tax, discount)?;

        Ok(InvoiceDraft {
            invoice_id: self.invoice_id,
            created_at: self.created_at,
            total_before_tax: self.total_before_tax,
            total_amount: self.total_with_tax,
            total_amount_after_discount,
            items: self.items,
        })
    }
}

impl Default for InvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn overflow(field: &str) -> CoreError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
    .into()
}
