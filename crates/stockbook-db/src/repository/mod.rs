//! # Repository Module
//!
//! Database repository implementations for Stockbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways In                                          │
//! │                                                                         │
//! │  Pool methods (&self)                 Connection functions (assoc fn)   │
//! │  ─────────────────────                ──────────────────────────────    │
//! │  db.customers().get_by_id(id)         CustomerRepository::find_in_shop( │
//! │  db.invoices().list(shop, ...)            &mut tx, id, shop_id)         │
//! │       │                               InvoiceRepository::               │
//! │       │ own connection                    insert_with_items(&mut tx, ..)│
//! │       ▼                                    │ caller's transaction        │
//! │  SQLite ◄──────────────────────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Connection functions exist for everything the invoice transaction reads
//! or writes, so those statements join the caller's unit of work.
//!
//! ## Available Repositories
//!
//! - [`shop::ShopRepository`]
//! - [`category::CategoryRepository`]
//! - [`customer::CustomerRepository`]
//! - [`product::ProductRepository`] - registration and shop-scoped lookup
//! - [`invoice::InvoiceRepository`] - insert, get, paginated list

pub mod category;
pub mod customer;
pub mod invoice;
pub mod product;
pub mod shop;

/// Generates a new primary key.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
