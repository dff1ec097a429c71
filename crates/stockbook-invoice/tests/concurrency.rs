//! Concurrent invoices against a shared file-backed database.
//!
//! These run on a multi-threaded runtime with a pool of several
//! connections, so transactions genuinely overlap.

mod common;

use std::sync::Arc;
use std::time::Duration;

use stockbook_core::{InvoiceLineRequest, InvoiceRequest, Product};
use stockbook_db::DbConfig;
use stockbook_invoice::{InvoiceError, LogNotifier, TransactionPolicy};
use tempfile::TempDir;

use common::Shopfront;

async fn shared_shop(dir: &TempDir) -> Shopfront {
    let config = DbConfig::new(dir.path().join("stockbook.db"))
        .max_connections(8)
        .busy_timeout(Duration::from_millis(500));
    Shopfront::open(config).await
}

fn policy() -> TransactionPolicy {
    TransactionPolicy {
        timeout: Duration::from_secs(10),
        max_attempts: 10,
        retry_backoff: Duration::from_millis(5),
    }
}

fn request(customer_id: &str, product: &Product, quantity: i64) -> InvoiceRequest {
    InvoiceRequest {
        customer_id: Some(customer_id.to_string()),
        discount: None,
        items: Some(vec![InvoiceLineRequest {
            product_id: Some(product.id.clone()),
            quantity: Some(quantity),
            selling_price: Some(product.selling_price_cents as f64),
            discount: None,
            gst: Some(10.0),
        }]),
    }
}

fn is_expected_rejection(err: &InvoiceError) -> bool {
    matches!(
        err,
        InvoiceError::InsufficientStock { .. } | InvoiceError::ConcurrencyConflict { .. }
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_orders_for_more_than_half_the_stock() {
    let dir = TempDir::new().unwrap();
    let shop = shared_shop(&dir).await;
    let rice = shop.product("Basmati Rice 5kg", 2_990, 10).await;
    let coordinator = Arc::new(shop.coordinator_with(policy(), Arc::new(LogNotifier)));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            let shop_id = shop.shop_id.clone();
            let request = request(&shop.customer_id, &rice, 6);
            tokio::spawn(async move { coordinator.create_invoice(&shop_id, &request).await })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(invoice) => {
                committed += 1;
                assert_eq!(invoice.items[0].quantity, 6);
            }
            Err(e) => assert!(is_expected_rejection(&e), "unexpected error: {e:?}"),
        }
    }

    assert_eq!(committed, 1);
    assert_eq!(shop.stock_of(&rice).await, 4);
    assert_eq!(shop.invoice_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_single_unit_orders_conserve_stock() {
    const STOCK: i64 = 12;
    const ORDERS: usize = 20;

    let dir = TempDir::new().unwrap();
    let shop = shared_shop(&dir).await;
    let tea = shop.product("Assam Tea 250g", 1_200, STOCK).await;
    let coordinator = Arc::new(shop.coordinator_with(policy(), Arc::new(LogNotifier)));

    let handles: Vec<_> = (0..ORDERS)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            let shop_id = shop.shop_id.clone();
            let request = request(&shop.customer_id, &tea, 1);
            tokio::spawn(async move { coordinator.create_invoice(&shop_id, &request).await })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(e) => assert!(is_expected_rejection(&e), "unexpected error: {e:?}"),
        }
    }

    let remaining = shop.stock_of(&tea).await;
    assert!(committed <= STOCK);
    assert!(remaining >= 0);
    assert_eq!(remaining, STOCK - committed);
    assert_eq!(shop.invoice_count().await, committed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn orders_for_different_products_all_commit() {
    let dir = TempDir::new().unwrap();
    let shop = shared_shop(&dir).await;
    let mut products = Vec::new();
    for name in ["Toned Milk 1L", "Paneer 200g", "Curd 400g", "Sugar 1kg"] {
        products.push(shop.product(name, 500, 5).await);
    }
    let coordinator = Arc::new(shop.coordinator_with(policy(), Arc::new(LogNotifier)));

    let handles: Vec<_> = products
        .iter()
        .map(|product| {
            let coordinator = Arc::clone(&coordinator);
            let shop_id = shop.shop_id.clone();
            let request = request(&shop.customer_id, product, 5);
            tokio::spawn(async move { coordinator.create_invoice(&shop_id, &request).await })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            committed += 1;
        }
    }

    // Writers queue on SQLite's lock at BEGIN IMMEDIATE, so every order lands.
    assert_eq!(committed, products.len());
    for product in &products {
        assert_eq!(shop.stock_of(product).await, 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn burst_on_distinct_products_commits_with_default_policy() {
    const ORDERS: usize = 32;

    let dir = TempDir::new().unwrap();
    let config = DbConfig::new(dir.path().join("stockbook.db")).max_connections(16);
    let shop = Shopfront::open(config).await;
    let mut products = Vec::new();
    for n in 0..ORDERS {
        products.push(shop.product(&format!("Spice Mix {n}"), 350, 3).await);
    }
    let coordinator = Arc::new(shop.coordinator(Arc::new(LogNotifier)));

    let handles: Vec<_> = products
        .iter()
        .map(|product| {
            let coordinator = Arc::clone(&coordinator);
            let shop_id = shop.shop_id.clone();
            let request = request(&shop.customer_id, product, 1);
            tokio::spawn(async move { coordinator.create_invoice(&shop_id, &request).await })
        })
        .collect();

    for handle in handles {
        if let Err(e) = handle.await.unwrap() {
            panic!("order on its own product failed: {e:?}");
        }
    }

    assert_eq!(shop.invoice_count().await, ORDERS as i64);
    for product in &products {
        assert_eq!(shop.stock_of(product).await, 2);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn attempt_blocked_past_its_budget_times_out() {
    let dir = TempDir::new().unwrap();
    let shop = Shopfront::open(
        DbConfig::new(dir.path().join("stockbook.db"))
            .max_connections(4)
            .busy_timeout(Duration::from_secs(5)),
    )
    .await;
    let oil = shop.product("Mustard Oil 1L", 1_800, 6).await;
    let coordinator = shop.coordinator_with(
        TransactionPolicy {
            timeout: Duration::from_millis(300),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(5),
        },
        Arc::new(LogNotifier),
    );

    let mut holder = shop.db.begin_immediate().await.unwrap();
    let err = coordinator
        .create_invoice(&shop.shop_id, &request(&shop.customer_id, &oil, 2))
        .await
        .unwrap_err();

    assert!(matches!(err, InvoiceError::Timeout(_)), "unexpected error: {err:?}");
    assert_eq!(err.kind().status(), 503);

    // Read through the lock holder; the timed-out attempt wrote nothing.
    let stock = shop
        .db
        .ledger()
        .available(&mut holder, &oil.id, &shop.shop_id)
        .await
        .unwrap();
    let invoices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
        .fetch_one(&mut *holder)
        .await
        .unwrap();
    assert_eq!(stock, 6);
    assert_eq!(invoices, 0);
    holder.rollback().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lock_held_through_every_attempt_is_a_conflict() {
    let dir = TempDir::new().unwrap();
    let shop = Shopfront::open(
        DbConfig::new(dir.path().join("stockbook.db"))
            .max_connections(4)
            .busy_timeout(Duration::from_millis(20)),
    )
    .await;
    let oil = shop.product("Mustard Oil 1L", 1_800, 6).await;
    let coordinator = shop.coordinator_with(
        TransactionPolicy {
            timeout: Duration::from_secs(5),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(5),
        },
        Arc::new(LogNotifier),
    );

    let holder = shop.db.begin_immediate().await.unwrap();
    let err = coordinator
        .create_invoice(&shop.shop_id, &request(&shop.customer_id, &oil, 2))
        .await
        .unwrap_err();
    holder.rollback().await.unwrap();

    assert_eq!(err, InvoiceError::ConcurrencyConflict { attempts: 3 });
    assert_eq!(err.kind().status(), 409);
    assert_eq!(shop.stock_of(&oil).await, 6);
    assert_eq!(shop.invoice_count().await, 0);
}
