//! Shared fixtures for the invoice integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use stockbook_core::Product;
use stockbook_db::{Database, DbConfig, NewCustomer, NewProduct};
use stockbook_invoice::{
    InvoiceApi, InvoiceNotifier, InvoiceTransactionCoordinator, LogNotifier, TransactionPolicy,
};

pub struct Shopfront {
    pub db: Database,
    pub shop_id: String,
    pub category_id: String,
    pub customer_id: String,
}

impl Shopfront {
    pub async fn in_memory() -> Self {
        Self::open(DbConfig::in_memory()).await
    }

    pub async fn open(config: DbConfig) -> Self {
        let db = Database::new(config).await.unwrap();
        let shop = db.shops().create("Corner Store", "owner-1").await.unwrap();
        let category = db.categories().create(&shop.id, "Grocery").await.unwrap();
        let customer = db
            .customers()
            .create(
                &shop.id,
                &NewCustomer {
                    name: "Asha Verma".to_string(),
                    phone: Some("555-0101".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        Shopfront {
            db,
            shop_id: shop.id,
            category_id: category.id,
            customer_id: customer.id,
        }
    }

    /// Registers a product selling at `selling_price_cents` with `stock` units.
    pub async fn product(&self, name: &str, selling_price_cents: i64, stock: i64) -> Product {
        self.db
            .products()
            .create(
                &self.shop_id,
                &NewProduct {
                    category_id: self.category_id.clone(),
                    product_name: name.to_string(),
                    unit_price_cents: selling_price_cents / 2,
                    selling_price_cents,
                    expire_time_in_days: 30,
                    ..Default::default()
                },
                stock,
            )
            .await
            .unwrap()
    }

    pub async fn stock_of(&self, product: &Product) -> i64 {
        self.db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap()
            .quantity
    }

    pub async fn invoice_count(&self) -> i64 {
        self.db.invoices().count(&self.shop_id).await.unwrap()
    }

    pub fn coordinator(&self, notifier: Arc<dyn InvoiceNotifier>) -> InvoiceTransactionCoordinator {
        self.coordinator_with(TransactionPolicy::default(), notifier)
    }

    pub fn coordinator_with(
        &self,
        policy: TransactionPolicy,
        notifier: Arc<dyn InvoiceNotifier>,
    ) -> InvoiceTransactionCoordinator {
        InvoiceTransactionCoordinator::new(self.db.clone(), policy, notifier)
    }

    pub fn api(&self) -> InvoiceApi {
        InvoiceApi::new(Arc::new(self.coordinator(Arc::new(LogNotifier))))
    }
}

/// One order line as JSON: (product, quantity, discount %, gst %).
pub fn line(product: &Product, quantity: i64, discount: f64, gst: f64) -> Value {
    json!({
        "productId": product.id,
        "quantity": quantity,
        "sellingPrice": product.selling_price_cents,
        "discount": discount,
        "gst": gst,
    })
}

pub fn order(customer_id: &str, discount: f64, lines: Vec<Value>) -> String {
    json!({
        "customerId": customer_id,
        "discount": discount,
        "items": lines,
    })
    .to_string()
}
