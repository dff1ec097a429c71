//! # stockbook-core: Pure Business Logic for Stockbook
//!
//! This crate holds everything about an invoice that can be decided without
//! touching storage: the entity types, integer money, percentages, the
//! pricing calculator and order validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP layer (external, binds invoice.create)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   stockbook-invoice: Coordinator, InvoiceBuilder, envelope      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockbook-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ line_total│  │   orders  │  │   │
//! │  │   │  Invoice  │  │Percentage │  │ gst, disc │  │    ids    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          stockbook-db: SQLite, repositories, StockLedger        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Product, Customer, Invoice, InvoiceItem) and the order request
//! - [`money`] - `Money` in minor units and `Percentage` in basis points
//! - [`pricing`] - Line and invoice totals
//! - [`validation`] - Order and identifier validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::money::{Money, Percentage};
//! use stockbook_core::pricing;
//!
//! let price = Money::from_cents(2_000); // 20.00 per unit
//! let line = pricing::price_line(5, price, Percentage::zero(), Percentage::from_bps(1_000)).unwrap();
//!
//! assert_eq!(line.total_amount.cents(), 10_000);
//! assert_eq!(line.total_amount_with_gst.cents(), 11_000);
//! ```

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percentage};
pub use types::*;

/// Maximum number of lines accepted in a single invoice order.
///
/// Bounds the size of the invoice transaction; the whole order holds its
/// stock reservations until commit.
pub const MAX_INVOICE_LINES: usize = 100;
