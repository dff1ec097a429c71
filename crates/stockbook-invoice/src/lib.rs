//! # stockbook-invoice: Invoice Transaction Engine
//!
//! Turns an `invoice.create` order into a committed invoice with its stock
//! decremented, or into an error that leaves nothing behind.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP layer (external, binds invoice.create)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ApiResponse                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockbook-invoice (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   api ──► coordinator ──► builder ──► StockLedger (db)          │   │
//! │  │                │                                                │   │
//! │  │                └──► notify (after commit only)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │      stockbook-core (pricing, validation) / stockbook-db        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Request handlers and the `{invoice}` / `{errors}` envelope
//! - [`coordinator`] - Commit/abort boundary, timeout and retry
//! - [`builder`] - Per-line pricing and reservation
//! - [`notify`] - Post-commit `InvoiceCreated` dispatch
//! - [`config`] - Environment configuration
//! - [`error`] - `InvoiceError` and its status mapping

pub mod api;
pub mod builder;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod notify;

pub use api::{ApiError, ApiResponse, InvoiceApi};
pub use builder::{InvoiceBuilder, InvoiceDraft};
pub use config::{ConfigError, EngineConfig};
pub use coordinator::{InvoicePage, InvoiceTransactionCoordinator, ListQuery, TransactionPolicy};
pub use error::{ErrorKind, InvoiceError, InvoiceResult};
pub use notify::{InvoiceCreated, InvoiceNotifier, LogNotifier, NotifyError, QueueNotifier};

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` overrides the default filter. Calling it twice panics, so
/// binaries call it once at startup and tests never do.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockbook=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
