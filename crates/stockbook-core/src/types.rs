//! # Domain Types
//!
//! Entities persisted by stockbook-db and the `invoice.create` request.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────┐   ┌─────────────────┐   ┌──────────────────────┐      │
//! │  │    Shop     │◄──│    Product      │   │      Invoice         │      │
//! │  │  id         │   │  shop_id        │   │  shop_id             │      │
//! │  │  name       │   │  quantity (≥0)  │◄┐ │  customer_id         │      │
//! │  └─────────────┘   │  version        │ │ │  discount_bps        │      │
//! │        ▲           └─────────────────┘ │ │  total_amount_cents  │      │
//! │        │                               │ └──────────┬───────────┘      │
//! │  ┌─────┴───────┐                       │            │ 1..n             │
//! │  │  Customer   │                       │ ┌──────────▼───────────┐      │
//! │  │  shop_id    │                       └─│    InvoiceItem       │      │
//! │  └─────────────┘                         │  quantity, gst_bps   │      │
//! │                                          └──────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money columns are integer minor units (`*_cents`), percentage columns are
//! basis points (`*_bps`). Accessors return [`Money`] / [`Percentage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Percentage};

// =============================================================================
// Shop / Category
// =============================================================================

/// A shop; every other entity is scoped to exactly one shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Shop {
    pub id: String,
    pub name: String,
    /// User that registered the shop.
    pub owner_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A product category within a shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer of a shop. Referenced by invoices, never mutated by them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product sold by a shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub shop_id: String,
    pub category_id: String,
    pub product_name: String,
    pub description: Option<String>,

    /// Purchase cost per unit, in minor units.
    pub unit_price_cents: i64,

    /// List price per unit, in minor units.
    pub selling_price_cents: i64,

    /// Units currently in stock. Only the stock ledger writes this.
    pub quantity: i64,

    /// Shelf life applied to restocked batches.
    pub expire_time_in_days: i64,

    /// Optimistic concurrency stamp, bumped on every stock change.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Whether `quantity` units can be taken from current stock.
    pub fn has_stock(&self, quantity: i64) -> bool {
        quantity <= self.quantity
    }
}

/// A received batch of stock with its expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockBatch {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub expire_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Invoice
// =============================================================================

/// A committed invoice. Totals are write-once and derived from its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub shop_id: String,
    pub customer_id: String,
    /// Invoice-level discount applied after line taxes.
    pub discount_bps: u32,
    /// Sum of the items' `total_amount_with_gst_cents`.
    pub total_amount_cents: i64,
    pub total_amount_after_discount_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn discount(&self) -> Percentage {
        Percentage::from_bps(self.discount_bps)
    }

    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn total_amount_after_discount(&self) -> Money {
        Money::from_cents(self.total_amount_after_discount_cents)
    }
}

/// One line of an invoice. Owned by its invoice; immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub product_id: String,
    /// Position of the line in the original order (0-based).
    pub line_no: i64,
    pub quantity: i64,
    /// Price per unit charged on this invoice (may differ from list price).
    pub selling_price_cents: i64,
    pub discount_bps: u32,
    pub gst_bps: u32,
    /// quantity × selling price less the line discount.
    pub total_amount_cents: i64,
    /// `total_amount_cents` plus GST.
    pub total_amount_with_gst_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InvoiceItem {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn total_amount_with_gst(&self) -> Money {
        Money::from_cents(self.total_amount_with_gst_cents)
    }
}

/// An invoice together with all of its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

// =============================================================================
// invoice.create Request
// =============================================================================

/// Request body of `invoice.create`, exactly as received.
///
/// Every field is optional at this level so that a missing field is reported
/// as an `InvalidParameters` error naming the field, not as a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceRequest {
    pub customer_id: Option<String>,
    /// Invoice-level discount in percent (e.g. `5` or `2.5`).
    pub discount: Option<f64>,
    pub items: Option<Vec<InvoiceLineRequest>>,
}

/// One requested line of `invoice.create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceLineRequest {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    /// Price per unit in minor units; must be a whole number.
    pub selling_price: Option<f64>,
    /// Line discount in percent.
    pub discount: Option<f64>,
    /// GST in percent.
    pub gst: Option<f64>,
}

/// A validated invoice order, ready for the transaction engine.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceOrder {
    pub customer_id: String,
    pub discount: Percentage,
    pub lines: Vec<OrderLine>,
}

/// A validated order line.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
    pub selling_price: Money,
    pub discount: Percentage,
    pub gst: Percentage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parses_camel_case() {
        let body = r#"{
            "customerId": "c-1",
            "discount": 5,
            "items": [{"productId": "p-1", "quantity": 2, "sellingPrice": 1500, "gst": 18}]
        }"#;

        let request: InvoiceRequest = serde_json::from_str(body).unwrap();
        let items = request.items.unwrap();

        assert_eq!(request.customer_id.as_deref(), Some("c-1"));
        assert_eq!(request.discount, Some(5.0));
        assert_eq!(items[0].selling_price, Some(1500.0));
        assert_eq!(items[0].discount, None);
    }

    #[test]
    fn test_product_has_stock() {
        let now = Utc::now();
        let product = Product {
            id: "p-1".to_string(),
            shop_id: "s-1".to_string(),
            category_id: "c-1".to_string(),
            product_name: "Rice 5kg".to_string(),
            description: None,
            unit_price_cents: 900,
            selling_price_cents: 1200,
            quantity: 3,
            expire_time_in_days: 180,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        assert!(product.has_stock(3));
        assert!(!product.has_stock(4));
        assert_eq!(product.selling_price().cents(), 1200);
    }

    #[test]
    fn test_invoice_with_items_flattens() {
        let now = Utc::now();
        let invoice = InvoiceWithItems {
            invoice: Invoice {
                id: "i-1".to_string(),
                shop_id: "s-1".to_string(),
                customer_id: "c-1".to_string(),
                discount_bps: 0,
                total_amount_cents: 0,
                total_amount_after_discount_cents: 0,
                created_at: now,
            },
            items: Vec::new(),
        };

        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(json["id"], "i-1");
        assert_eq!(json["totalAmountAfterDiscountCents"], 0);
        assert!(json["items"].as_array().unwrap().is_empty());
    }
}
