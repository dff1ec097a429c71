//! End-to-end invoice flows through the API envelope on one connection.

mod common;

use std::sync::Arc;

use serde_json::Value;
use stockbook_core::{InvoiceLineRequest, InvoiceRequest};
use stockbook_invoice::{InvoiceError, ListQuery, QueueNotifier};

use common::{line, order, Shopfront};

#[tokio::test]
async fn sale_decrements_stock_and_prices_lines() {
    let shop = Shopfront::in_memory().await;
    let rice = shop.product("Basmati Rice 5kg", 2_000, 10).await;

    let response = shop
        .api()
        .create(&shop.shop_id, &order(&shop.customer_id, 0.0, vec![line(&rice, 5, 0.0, 10.0)]))
        .await;

    assert_eq!(response.status, 201);
    let invoice = &response.body["invoice"];
    assert_eq!(invoice["customerId"], Value::from(shop.customer_id.clone()));
    assert_eq!(invoice["items"][0]["totalAmountCents"], 10_000);
    assert_eq!(invoice["items"][0]["totalAmountWithGstCents"], 11_000);
    assert_eq!(invoice["totalAmountCents"], 11_000);
    assert_eq!(invoice["totalAmountAfterDiscountCents"], 11_000);

    assert_eq!(shop.stock_of(&rice).await, 5);
}

#[tokio::test]
async fn oversold_line_leaves_stock_untouched() {
    let shop = Shopfront::in_memory().await;
    let oil = shop.product("Sunflower Oil 1L", 1_650, 3).await;

    let response = shop
        .api()
        .create(&shop.shop_id, &order(&shop.customer_id, 0.0, vec![line(&oil, 5, 0.0, 0.0)]))
        .await;

    assert_eq!(response.status, 409);
    assert_eq!(response.body["errors"][0]["kind"], "INSUFFICIENT_STOCK");
    assert_eq!(shop.stock_of(&oil).await, 3);
    assert_eq!(shop.invoice_count().await, 0);
}

#[tokio::test]
async fn empty_order_writes_nothing() {
    let shop = Shopfront::in_memory().await;
    let sugar = shop.product("Sugar 1kg", 450, 10).await;

    let response = shop
        .api()
        .create(&shop.shop_id, &order(&shop.customer_id, 0.0, Vec::new()))
        .await;

    assert_eq!(response.status, 400);
    assert_eq!(response.body["errors"][0]["kind"], "INVALID_PARAMETERS");
    assert_eq!(response.body["errors"][0]["fields"][0], "items");
    assert_eq!(shop.stock_of(&sugar).await, 10);
    assert_eq!(shop.invoice_count().await, 0);
}

#[tokio::test]
async fn failing_second_line_rolls_back_the_first() {
    let shop = Shopfront::in_memory().await;
    let tea = shop.product("Assam Tea 250g", 1_200, 10).await;
    let paneer = shop.product("Paneer 200g", 900, 1).await;

    let response = shop
        .api()
        .create(
            &shop.shop_id,
            &order(
                &shop.customer_id,
                0.0,
                vec![line(&tea, 4, 0.0, 5.0), line(&paneer, 2, 0.0, 5.0)],
            ),
        )
        .await;

    assert_eq!(response.status, 409);
    assert_eq!(shop.stock_of(&tea).await, 10);
    assert_eq!(shop.stock_of(&paneer).await, 1);
    assert_eq!(shop.invoice_count().await, 0);
}

#[tokio::test]
async fn unknown_product_rolls_back_earlier_lines() {
    let shop = Shopfront::in_memory().await;
    let tea = shop.product("Assam Tea 250g", 1_200, 10).await;
    let missing = uuid::Uuid::new_v4().to_string();

    let body = serde_json::json!({
        "customerId": shop.customer_id,
        "items": [
            line(&tea, 2, 0.0, 0.0),
            {"productId": missing, "quantity": 1, "sellingPrice": 100},
        ],
    })
    .to_string();
    let response = shop.api().create(&shop.shop_id, &body).await;

    assert_eq!(response.status, 404);
    assert_eq!(response.body["errors"][0]["kind"], "RESOURCE_NOT_FOUND");
    assert_eq!(shop.stock_of(&tea).await, 10);
    assert_eq!(shop.invoice_count().await, 0);
}

#[tokio::test]
async fn decimal_selling_price_names_the_field() {
    let shop = Shopfront::in_memory().await;
    let tea = shop.product("Assam Tea 250g", 1_200, 10).await;

    let body = serde_json::json!({
        "customerId": shop.customer_id,
        "items": [{"productId": tea.id, "quantity": 1, "sellingPrice": 19.99}],
    })
    .to_string();
    let response = shop.api().create(&shop.shop_id, &body).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.body["errors"][0]["kind"], "INVALID_PARAMETERS");
    assert_eq!(
        response.body["errors"][0]["fields"],
        serde_json::json!(["items[0].sellingPrice"])
    );
    assert_eq!(shop.stock_of(&tea).await, 10);
    assert_eq!(shop.invoice_count().await, 0);
}

#[tokio::test]
async fn product_of_another_shop_is_not_found() {
    let shop = Shopfront::in_memory().await;
    let other = shop.db.shops().create("Other Store", "owner-2").await.unwrap();
    let other_category = shop.db.categories().create(&other.id, "Dairy").await.unwrap();
    let foreign = shop
        .db
        .products()
        .create(
            &other.id,
            &stockbook_db::NewProduct {
                category_id: other_category.id,
                product_name: "Curd 400g".to_string(),
                selling_price_cents: 450,
                ..Default::default()
            },
            5,
        )
        .await
        .unwrap();

    let response = shop
        .api()
        .create(&shop.shop_id, &order(&shop.customer_id, 0.0, vec![line(&foreign, 1, 0.0, 0.0)]))
        .await;

    assert_eq!(response.status, 404);
    assert_eq!(shop.stock_of(&foreign).await, 5);
}

#[tokio::test]
async fn rejected_order_is_rejected_again_unchanged() {
    let shop = Shopfront::in_memory().await;
    let coffee = shop.product("Instant Coffee 100g", 2_650, 2).await;
    let coordinator = shop.coordinator(Arc::new(stockbook_invoice::LogNotifier));
    let request = InvoiceRequest {
        customer_id: Some(shop.customer_id.clone()),
        discount: None,
        items: Some(vec![InvoiceLineRequest {
            product_id: Some(coffee.id.clone()),
            quantity: Some(3),
            selling_price: Some(coffee.selling_price_cents as f64),
            discount: None,
            gst: None,
        }]),
    };

    let first = coordinator.create_invoice(&shop.shop_id, &request).await.unwrap_err();
    let second = coordinator.create_invoice(&shop.shop_id, &request).await.unwrap_err();

    assert_eq!(first, second);
    assert_eq!(
        first,
        InvoiceError::InsufficientStock {
            product_id: coffee.id.clone(),
            available: 2,
            requested: 3,
        }
    );
    assert_eq!(shop.stock_of(&coffee).await, 2);
}

#[tokio::test]
async fn totals_match_items_with_discounts_and_tax() {
    let shop = Shopfront::in_memory().await;
    let flour = shop.product("Wheat Flour 10kg", 3_900, 20).await;
    let dal = shop.product("Toor Dal 1kg", 1_450, 20).await;
    let juice = shop.product("Mango Juice 1L", 950, 20).await;

    let response = shop
        .api()
        .create(
            &shop.shop_id,
            &order(
                &shop.customer_id,
                5.0,
                vec![
                    line(&flour, 3, 10.0, 5.0),
                    line(&dal, 7, 0.0, 18.0),
                    line(&juice, 1, 2.5, 12.0),
                ],
            ),
        )
        .await;

    assert_eq!(response.status, 201);
    let invoice = &response.body["invoice"];
    let items = invoice["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);

    let with_tax: i64 = items
        .iter()
        .map(|item| item["totalAmountWithGstCents"].as_i64().unwrap())
        .sum();
    let total = invoice["totalAmountCents"].as_i64().unwrap();
    let after_discount = invoice["totalAmountAfterDiscountCents"].as_i64().unwrap();

    assert_eq!(with_tax, total);
    assert!(after_discount <= total);
    assert_eq!(after_discount, total - (total * 500 + 5_000) / 10_000);

    // 3 × 39.00 less 10% = 105.30, plus 5% = 110.565 → 110.57
    assert_eq!(items[0]["totalAmountCents"], 10_530);
    assert_eq!(items[0]["totalAmountWithGstCents"], 11_057);
    assert_eq!(
        items.iter().map(|i| i["lineNo"].as_i64().unwrap()).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    assert_eq!(shop.stock_of(&flour).await, 17);
    assert_eq!(shop.stock_of(&dal).await, 13);
    assert_eq!(shop.stock_of(&juice).await, 19);
}

#[tokio::test]
async fn repeated_product_lines_reserve_cumulatively() {
    let shop = Shopfront::in_memory().await;
    let milk = shop.product("Toned Milk 1L", 560, 10).await;

    let over = shop
        .api()
        .create(
            &shop.shop_id,
            &order(&shop.customer_id, 0.0, vec![line(&milk, 6, 0.0, 0.0), line(&milk, 6, 0.0, 0.0)]),
        )
        .await;
    assert_eq!(over.status, 409);
    assert_eq!(shop.stock_of(&milk).await, 10);

    let fits = shop
        .api()
        .create(
            &shop.shop_id,
            &order(&shop.customer_id, 0.0, vec![line(&milk, 4, 0.0, 0.0), line(&milk, 4, 0.0, 0.0)]),
        )
        .await;
    assert_eq!(fits.status, 201);
    assert_eq!(shop.stock_of(&milk).await, 2);
}

#[tokio::test]
async fn get_and_list_round_trip() {
    let shop = Shopfront::in_memory().await;
    let soap = shop.product("Dish Soap 500ml", 850, 50).await;
    let api = shop.api();

    let mut ids = Vec::new();
    for quantity in 1..=5 {
        let response = api
            .create(&shop.shop_id, &order(&shop.customer_id, 0.0, vec![line(&soap, quantity, 0.0, 0.0)]))
            .await;
        assert_eq!(response.status, 201);
        ids.push(response.body["invoice"]["id"].as_str().unwrap().to_string());
    }

    let fetched = api.get(&shop.shop_id, &ids[2]).await;
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.body["invoice"]["items"][0]["quantity"], 3);

    let page = api
        .list(
            &shop.shop_id,
            &ListQuery {
                offset: Some(4),
                limit: Some(2),
                customer_id: None,
            },
        )
        .await;
    assert_eq!(page.status, 200);
    assert_eq!(page.body["total"], 5);
    assert_eq!(page.body["totalPage"], 3);
    assert_eq!(page.body["currentPage"], 3);
    assert_eq!(page.body["invoices"].as_array().unwrap().len(), 1);

    let other_shop = shop.db.shops().create("Other Store", "owner-2").await.unwrap();
    assert_eq!(api.get(&other_shop.id, &ids[0]).await.status, 404);
    let empty = api.list(&other_shop.id, &ListQuery::default()).await;
    assert_eq!(empty.body["total"], 0);

    assert_eq!(api.get(&shop.shop_id, "not-an-id").await.status, 400);
    let too_big = ListQuery {
        limit: Some(500),
        ..Default::default()
    };
    assert_eq!(api.list(&shop.shop_id, &too_big).await.status, 400);
}

#[tokio::test]
async fn committed_invoice_is_announced() {
    let shop = Shopfront::in_memory().await;
    let detergent = shop.product("Detergent 1kg", 1_990, 5).await;
    let (notifier, mut events) = QueueNotifier::channel(4);
    let api = stockbook_invoice::InvoiceApi::new(Arc::new(shop.coordinator(Arc::new(notifier))));

    let rejected = api
        .create(&shop.shop_id, &order(&shop.customer_id, 0.0, vec![line(&detergent, 9, 0.0, 0.0)]))
        .await;
    assert_eq!(rejected.status, 409);
    assert!(events.try_recv().is_err());

    let created = api
        .create(&shop.shop_id, &order(&shop.customer_id, 0.0, vec![line(&detergent, 2, 0.0, 0.0)]))
        .await;
    assert_eq!(created.status, 201);

    let event = events.recv().await.unwrap();
    assert_eq!(event.invoice_id, created.body["invoice"]["id"].as_str().unwrap());
    assert_eq!(event.shop_id, shop.shop_id);
    assert_eq!(event.total_amount_after_discount_cents, 3_980);
}

#[tokio::test]
async fn full_notification_queue_does_not_fail_the_sale() {
    let shop = Shopfront::in_memory().await;
    let curd = shop.product("Curd 400g", 450, 5).await;
    let (notifier, _events) = QueueNotifier::channel(1);
    let api = stockbook_invoice::InvoiceApi::new(Arc::new(shop.coordinator(Arc::new(notifier))));

    for _ in 0..3 {
        let response = api
            .create(&shop.shop_id, &order(&shop.customer_id, 0.0, vec![line(&curd, 1, 0.0, 0.0)]))
            .await;
        assert_eq!(response.status, 201);
    }

    assert_eq!(shop.stock_of(&curd).await, 2);
    assert_eq!(shop.invoice_count().await, 3);
}
