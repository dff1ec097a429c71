//! # stockbook-db: Database Layer for Stockbook
//!
//! SQLite storage for shops, products, customers and invoices, accessed
//! through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Data Flow                              │
//! │                                                                         │
//! │  InvoiceTransactionCoordinator (stockbook-invoice)                      │
//! │       │  owns the Transaction                                           │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │ StockLedger  │  │   │
//! │  │   │   (pool.rs)   │    │ customer.rs   │    │ (ledger.rs)  │  │   │
//! │  │   │               │    │ product.rs    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ invoice.rs    │    │ reserve      │  │   │
//! │  │   │ begin()       │    │ shop.rs ...   │    │ receive      │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`ledger`] - Stock reservation and restocking
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbook_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stockbook.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let reservation = db.ledger().reserve(&mut tx, &product_id, &shop_id, 2).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use ledger::{LedgerError, LedgerResult, Reservation, StockLedger};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::customer::{CustomerRepository, NewCustomer};
pub use repository::invoice::{InvoicePageRows, InvoiceRepository};
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::shop::ShopRepository;

/// Transaction type handed out by [`Database::begin`].
pub type DbTransaction = sqlx::Transaction<'static, sqlx::Sqlite>;
