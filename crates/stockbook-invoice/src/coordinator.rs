//! # Invoice Transaction Coordinator
//!
//! The single place that decides whether an invoice commits or aborts.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Validating ──► Reserving ──► Persisting ──► Committing ──► Done        │
//! │      │              │              │              │                     │
//! │      └──────────────┴──────┬───────┴──────────────┘                     │
//! │                            ▼                                            │
//! │                         Aborted   (transaction dropped = rolled back)   │
//! │                                                                         │
//! │  Validating  request shape, then customer within the shop (in tx)       │
//! │  Reserving   per line, request order: product in shop, price, reserve   │
//! │  Persisting  totals final, invoice + all items inserted in one pass     │
//! │  Committing  commit; only now is anything visible to other requests     │
//! │  Done        post-commit notification, best effort                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retry and Timeout
//! ```text
//! attempt 1 ──conflict──► sleep 1×backoff ──► attempt 2 ──conflict──► ...
//!     │                                                                  │
//!     │  each attempt (begin → persist) runs under `timeout`;            │
//!     │  elapsing drops the transaction and fails with Timeout           │
//!     ▼                                                                  ▼
//!   Done                                  max_attempts ──► ConcurrencyConflict
//! ```
//! Each attempt opens with `BEGIN IMMEDIATE`, so concurrent invoices queue
//! on SQLite's write lock (up to `busy_timeout`) instead of failing at their
//! first stock write. A conflict is a stock version that moved between read
//! and write, or the write lock staying busy past `busy_timeout`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stockbook_core::validation::{validate_invoice_request, validate_uuid};
use stockbook_core::{CoreError, Invoice, InvoiceOrder, InvoiceRequest, InvoiceWithItems};
use stockbook_db::{
    CustomerRepository, Database, DbError, DbTransaction, InvoiceRepository, LedgerError,
    ProductRepository, StockLedger,
};
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::builder::InvoiceBuilder;
use crate::error::{InvoiceError, InvoiceResult};
use crate::notify::{InvoiceCreated, InvoiceNotifier};

/// Default page size of `list_invoices`.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;
/// Largest accepted page size of `list_invoices`.
pub const MAX_PAGE_LIMIT: i64 = 200;

// =============================================================================
// Policy
// =============================================================================

/// Timeout and retry settings for invoice transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionPolicy {
    /// Budget of one attempt, from `begin` until everything is written.
    pub timeout: Duration,
    pub max_attempts: u32,
    /// Sleep before retry `n` is `n × retry_backoff`.
    pub retry_backoff: Duration,
}

impl TransactionPolicy {
    /// Sleep before the attempt after `attempt`, saturating at `Duration::MAX`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(attempt)
    }
}

impl Default for TransactionPolicy {
    fn default() -> Self {
        TransactionPolicy {
            timeout: Duration::from_secs(5),
            max_attempts: 5,
            retry_backoff: Duration::from_millis(25),
        }
    }
}

// =============================================================================
// Listing Types
// =============================================================================

/// Query of `invoice.list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ListQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub customer_id: Option<String>,
}

/// One page of `invoice.list`.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoicePage {
    pub invoices: Vec<InvoiceWithItems>,
    pub total: i64,
    pub total_page: i64,
    /// 1-based page that `offset` falls on.
    pub current_page: i64,
}

// =============================================================================
// Attempt Outcome
// =============================================================================

/// Why one attempt did not reach the commit.
enum Abort {
    /// Another transaction won a race; the whole attempt may be retried.
    Conflict(String),
    Failed(InvoiceError),
}

impl From<LedgerError> for Abort {
    fn from(err: LedgerError) -> Self {
        if err.is_retryable() {
            Abort::Conflict(err.to_string())
        } else {
            Abort::Failed(err.into())
        }
    }
}

impl From<DbError> for Abort {
    fn from(err: DbError) -> Self {
        LedgerError::Db(err).into()
    }
}

impl From<CoreError> for Abort {
    fn from(err: CoreError) -> Self {
        Abort::Failed(err.into())
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Creates, reads and lists invoices.
///
/// ## Usage
/// ```rust,ignore
/// let coordinator = InvoiceTransactionCoordinator::new(db, TransactionPolicy::default(), Arc::new(LogNotifier));
/// let invoice = coordinator.create_invoice(&shop_id, &request).await?;
/// ```
pub struct InvoiceTransactionCoordinator {
    db: Database,
    ledger: StockLedger,
    policy: TransactionPolicy,
    notifier: Arc<dyn InvoiceNotifier>,
}

impl InvoiceTransactionCoordinator {
    pub fn new(db: Database, policy: TransactionPolicy, notifier: Arc<dyn InvoiceNotifier>) -> Self {
        let ledger = db.ledger();
        InvoiceTransactionCoordinator {
            db,
            ledger,
            policy,
            notifier,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn policy(&self) -> TransactionPolicy {
        self.policy
    }

    /// Turns an order into a committed invoice, or changes nothing.
    ///
    /// ## Errors
    /// - `InvalidParameters` - malformed request (every bad field listed)
    /// - `ResourceNotFound` - customer or product missing / in another shop
    /// - `InsufficientStock` - a line asks for more than is in stock
    /// - `ConcurrencyConflict` - conflicts persisted through every attempt
    /// - `Timeout` - an attempt exceeded its budget
    /// - `Storage` - anything else the database reported
    pub async fn create_invoice(
        &self,
        shop_id: &str,
        request: &InvoiceRequest,
    ) -> InvoiceResult<InvoiceWithItems> {
        debug!(shop_id = %shop_id, state = "Validating", "Invoice transition");

        let order = match validate_invoice_request(request) {
            Ok(order) => order,
            Err(e) => {
                debug!(shop_id = %shop_id, state = "Aborted", error = %e, "Invoice transition");
                return Err(e.into());
            }
        };

        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.attempt(shop_id, &order, attempt).await {
                Ok(invoice) => {
                    self.notify(&invoice);
                    return Ok(invoice);
                }
                Err(Abort::Failed(e)) => return Err(e),
                Err(Abort::Conflict(reason)) => {
                    warn!(
                        shop_id = %shop_id,
                        attempt,
                        max_attempts,
                        reason = %reason,
                        "Invoice attempt conflicted"
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.backoff(attempt)).await;
                    }
                }
            }
        }

        Err(InvoiceError::ConcurrencyConflict {
            attempts: max_attempts,
        })
    }

    /// One pass through the state machine on a fresh transaction.
    async fn attempt(
        &self,
        shop_id: &str,
        order: &InvoiceOrder,
        attempt: u32,
    ) -> Result<InvoiceWithItems, Abort> {
        let prepared = tokio::time::timeout(self.policy.timeout, self.prepare(shop_id, order)).await;

        let (tx, invoice) = match prepared {
            Ok(Ok(prepared)) => prepared,
            Ok(Err(abort)) => {
                debug!(shop_id = %shop_id, attempt, state = "Aborted", "Invoice transition");
                return Err(abort);
            }
            Err(_elapsed) => {
                warn!(
                    shop_id = %shop_id,
                    attempt,
                    budget_ms = self.policy.timeout.as_millis() as u64,
                    "Invoice transaction timed out"
                );
                debug!(shop_id = %shop_id, attempt, state = "Aborted", "Invoice transition");
                return Err(Abort::Failed(InvoiceError::Timeout(format!(
                    "invoice transaction exceeded {}ms",
                    self.policy.timeout.as_millis()
                ))));
            }
        };

        let invoice_id = invoice.invoice.id.clone();
        debug!(invoice_id = %invoice_id, attempt, state = "Committing", "Invoice transition");

        if let Err(e) = tx.commit().await {
            debug!(invoice_id = %invoice_id, attempt, state = "Aborted", "Invoice transition");
            return Err(DbError::from(e).into());
        }

        debug!(invoice_id = %invoice_id, attempt, state = "Done", "Invoice transition");
        info!(
            invoice_id = %invoice_id,
            shop_id = %shop_id,
            items = invoice.items.len(),
            total_cents = invoice.invoice.total_amount_after_discount_cents,
            attempt,
            "Invoice committed"
        );

        Ok(invoice)
    }

    /// Validating (customer) → Reserving → Persisting, leaving the
    /// transaction open for the caller to commit. Any early return drops
    /// `tx`, which rolls back every reservation made so far.
    async fn prepare(
        &self,
        shop_id: &str,
        order: &InvoiceOrder,
    ) -> Result<(DbTransaction, InvoiceWithItems), Abort> {
        let mut tx = self.db.begin_immediate().await?;

        CustomerRepository::find_in_shop(&mut tx, &order.customer_id, shop_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(order.customer_id.clone()))?;

        let mut builder = InvoiceBuilder::new();
        debug!(invoice_id = %builder.invoice_id(), state = "Reserving", "Invoice transition");

        for line in &order.lines {
            let product = ProductRepository::find_in_shop(&mut tx, &line.product_id, shop_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            builder.add_line(&mut tx, &self.ledger, &product, line).await?;
        }

        debug!(invoice_id = %builder.invoice_id(), state = "Persisting", "Invoice transition");

        let draft = builder.finalize(order.discount)?;
        let invoice = Invoice {
            id: draft.invoice_id,
            shop_id: shop_id.to_string(),
            customer_id: order.customer_id.clone(),
            discount_bps: order.discount.bps(),
            total_amount_cents: draft.total_amount.cents(),
            total_amount_after_discount_cents: draft.total_amount_after_discount.cents(),
            created_at: draft.created_at,
        };

        InvoiceRepository::insert_with_items(&mut tx, &invoice, &draft.items).await?;

        Ok((
            tx,
            InvoiceWithItems {
                invoice,
                items: draft.items,
            },
        ))
    }

    fn notify(&self, invoice: &InvoiceWithItems) {
        let event = InvoiceCreated::from(invoice);
        if let Err(e) = self.notifier.notify(&event) {
            warn!(invoice_id = %event.invoice_id, error = %e, "Invoice notification failed");
        }
    }

    /// Gets one invoice of the shop with its items.
    pub async fn get_invoice(&self, shop_id: &str, invoice_id: &str) -> InvoiceResult<InvoiceWithItems> {
        validate_uuid("invoiceId", invoice_id)?;

        self.db
            .invoices()
            .get(shop_id, invoice_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("Invoice", invoice_id))
    }

    /// Lists the shop's invoices, newest first.
    pub async fn list_invoices(&self, shop_id: &str, query: &ListQuery) -> InvoiceResult<InvoicePage> {
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

        let mut fields = Vec::new();
        if offset < 0 {
            fields.push("offset".to_string());
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            fields.push("limit".to_string());
        }
        if let Some(customer_id) = query.customer_id.as_deref() {
            if validate_uuid("customerId", customer_id).is_err() {
                fields.push("customerId".to_string());
            }
        }
        if !fields.is_empty() {
            return Err(InvoiceError::InvalidParameters {
                message: format!("Invalid list parameters: {}", fields.join(", ")),
                fields,
            });
        }

        let rows = self
            .db
            .invoices()
            .list(shop_id, query.customer_id.as_deref(), offset, limit)
            .await?;

        Ok(InvoicePage {
            total_page: pages(rows.total, limit),
            current_page: pages(offset, limit).saturating_add(1),
            total: rows.total,
            invoices: rows.invoices,
        })
    }
}

/// `ceil(count / limit)` for non-negative `count` and positive `limit`.
fn pages(count: i64, limit: i64) -> i64 {
    count / limit + i64::from(count % limit != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{LogNotifier, QueueNotifier};
    use stockbook_core::{InvoiceLineRequest, Product, Shop};
    use stockbook_db::{DbConfig, NewCustomer, NewProduct};

    struct Fixture {
        coordinator: InvoiceTransactionCoordinator,
        shop: Shop,
        customer_id: String,
        product: Product,
    }

    async fn setup(notifier: Arc<dyn InvoiceNotifier>) -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shop = db.shops().create("Corner Store", "owner-1").await.unwrap();
        let category = db.categories().create(&shop.id, "Grocery").await.unwrap();
        let customer = db
            .customers()
            .create(
                &shop.id,
                &NewCustomer {
                    name: "Asha".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let product = db
            .products()
            .create(
                &shop.id,
                &NewProduct {
                    category_id: category.id,
                    product_name: "Salt 1kg".to_string(),
                    selling_price_cents: 200,
                    ..Default::default()
                },
                10,
            )
            .await
            .unwrap();

        Fixture {
            coordinator: InvoiceTransactionCoordinator::new(db, TransactionPolicy::default(), notifier),
            shop,
            customer_id: customer.id,
            product,
        }
    }

    fn request(f: &Fixture, quantity: i64) -> InvoiceRequest {
        InvoiceRequest {
            customer_id: Some(f.customer_id.clone()),
            discount: None,
            items: Some(vec![InvoiceLineRequest {
                product_id: Some(f.product.id.clone()),
                quantity: Some(quantity),
                selling_price: Some(200.0),
                discount: None,
                gst: None,
            }]),
        }
    }

    #[tokio::test]
    async fn test_commit_notifies_once() {
        let (notifier, mut events) = QueueNotifier::channel(8);
        let f = setup(Arc::new(notifier)).await;

        let invoice = f.coordinator.create_invoice(&f.shop.id, &request(&f, 2)).await.unwrap();

        let event = events.try_recv().unwrap();
        assert_eq!(event.invoice_id, invoice.invoice.id);
        assert_eq!(event.item_count, 1);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_notification_keeps_invoice() {
        let (notifier, events) = QueueNotifier::channel(1);
        drop(events);
        let f = setup(Arc::new(notifier)).await;

        let invoice = f.coordinator.create_invoice(&f.shop.id, &request(&f, 1)).await.unwrap();

        let stored = f.coordinator.get_invoice(&f.shop.id, &invoice.invoice.id).await.unwrap();
        assert_eq!(stored.items.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_order_does_not_notify() {
        let (notifier, mut events) = QueueNotifier::channel(8);
        let f = setup(Arc::new(notifier)).await;

        let err = f.coordinator.create_invoice(&f.shop.id, &request(&f, 11)).await.unwrap_err();

        assert!(matches!(err, InvoiceError::InsufficientStock { .. }));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_customer_of_other_shop_is_not_found() {
        let f = setup(Arc::new(LogNotifier)).await;
        let other = f.coordinator.database().shops().create("Other", "owner-2").await.unwrap();

        let err = f.coordinator.create_invoice(&other.id, &request(&f, 1)).await.unwrap_err();
        assert_eq!(err, InvoiceError::not_found("Customer", &f.customer_id));
    }

    #[tokio::test]
    async fn test_get_validates_id() {
        let f = setup(Arc::new(LogNotifier)).await;

        let err = f.coordinator.get_invoice(&f.shop.id, "nope").await.unwrap_err();
        assert_eq!(err.fields(), Some(&["invoiceId".to_string()][..]));

        let missing = uuid::Uuid::new_v4().to_string();
        let err = f.coordinator.get_invoice(&f.shop.id, &missing).await.unwrap_err();
        assert_eq!(err, InvoiceError::not_found("Invoice", &missing));
    }

    #[tokio::test]
    async fn test_list_pages() {
        let f = setup(Arc::new(LogNotifier)).await;
        for _ in 0..3 {
            f.coordinator.create_invoice(&f.shop.id, &request(&f, 1)).await.unwrap();
        }

        let query = ListQuery {
            offset: Some(2),
            limit: Some(2),
            customer_id: Some(f.customer_id.clone()),
        };
        let page = f.coordinator.list_invoices(&f.shop.id, &query).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_page, 2);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.invoices.len(), 1);

        let first = f.coordinator.list_invoices(&f.shop.id, &ListQuery::default()).await.unwrap();
        assert_eq!(first.current_page, 1);
        assert_eq!(first.total_page, 1);
        assert_eq!(first.invoices.len(), 3);
    }

    #[test]
    fn test_backoff_grows_and_saturates() {
        let policy = TransactionPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(25));
        assert_eq!(policy.backoff(3), Duration::from_millis(75));

        let huge = TransactionPolicy {
            retry_backoff: Duration::MAX,
            ..policy
        };
        assert_eq!(huge.backoff(2), Duration::MAX);
    }

    #[test]
    fn test_pages_round_up() {
        assert_eq!(pages(0, 50), 0);
        assert_eq!(pages(3, 2), 2);
        assert_eq!(pages(4, 2), 2);
        assert_eq!(pages(i64::MAX, 1), i64::MAX);
        assert_eq!(pages(i64::MAX, 2), i64::MAX / 2 + 1);
    }

    #[tokio::test]
    async fn test_list_far_offset_is_empty_page() {
        let f = setup(Arc::new(LogNotifier)).await;
        f.coordinator.create_invoice(&f.shop.id, &request(&f, 1)).await.unwrap();

        let query = ListQuery {
            offset: Some(i64::MAX),
            limit: Some(2),
            customer_id: None,
        };
        let page = f.coordinator.list_invoices(&f.shop.id, &query).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.total_page, 1);
        assert_eq!(page.current_page, 4_611_686_018_427_387_905);
        assert!(page.invoices.is_empty());

        let query = ListQuery {
            offset: Some(i64::MAX),
            limit: Some(1),
            customer_id: None,
        };
        let page = f.coordinator.list_invoices(&f.shop.id, &query).await.unwrap();
        assert_eq!(page.current_page, i64::MAX);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_paging() {
        let f = setup(Arc::new(LogNotifier)).await;
        let query = ListQuery {
            offset: Some(-1),
            limit: Some(0),
            customer_id: None,
        };

        let err = f.coordinator.list_invoices(&f.shop.id, &query).await.unwrap_err();
        assert_eq!(
            err.fields(),
            Some(&["offset".to_string(), "limit".to_string()][..])
        );
    }
}
