use invoker_sample::catalog::Catalog;
use invoker_sample::model::{Order, Product, ProductCreate, ProductId, Quote};
use invoker_sample::shop::Shop;
use resource_invoker::mock::MockEngine;
use resource_invoker::{HttpStatus, RequestData, TaskStatus, TokioEngine};
use serde_json::json;
use std::sync::Arc;

fn stocked_shop(quantity: u32) -> (Shop, ProductId) {
    let catalog = Catalog::new();
    let id = catalog.add(ProductCreate {
        name: "Super Widget".to_string(),
        price: 25.50,
        quantity,
    });
    let shop = Shop::new(catalog, Some(Arc::new(TokioEngine::current().unwrap()))).unwrap();
    (shop, id)
}

fn by_id(id: &ProductId) -> RequestData {
    RequestData::new().with_path_key("id", id.0.to_string())
}

#[tokio::test]
async fn test_get_product() {
    let (shop, id) = stocked_shop(10);

    let outcome = shop.handle("products.get", by_id(&id)).await;
    let product = outcome.result().unwrap().downcast_ref::<Product>().unwrap().clone();
    assert_eq!(product.name, "Super Widget");
    assert_eq!(product.quantity, 10);

    let missing = shop.handle("products.get", by_id(&ProductId(99))).await;
    let error = missing.error().unwrap();
    assert_eq!(error.status(), HttpStatus::NOT_FOUND);
    assert_eq!(error.message(), "Product not found: product_99");
}

#[tokio::test]
async fn test_reserve_completes_through_callback() {
    let (shop, id) = stocked_shop(10);

    let outcome = shop
        .handle("products.reserve", by_id(&id).with_query("quantity", "4"))
        .await;
    assert_eq!(outcome.result().unwrap().downcast_ref::<u32>(), Some(&6));

    let too_many = shop
        .handle("products.reserve", by_id(&id).with_query("quantity", "7"))
        .await;
    let error = too_many.error().unwrap();
    assert_eq!(error.status(), HttpStatus::CONFLICT);
    assert_eq!(error.message(), "Insufficient stock: requested 7, available 6");
    assert_eq!(shop.catalog().get(&id).unwrap().quantity, 6);
}

#[tokio::test]
async fn test_quote_is_traced() {
    let (shop, id) = stocked_shop(10);

    let outcome = shop
        .handle("pricing.quote", by_id(&id).with_query("quantity", "2"))
        .await;
    let quote = outcome.result().unwrap().downcast_ref::<Quote>().unwrap().clone();
    assert_eq!(quote.total, 51.0);
    let trace = outcome.report().unwrap().trace.clone().unwrap();
    assert_eq!(trace.status_of("load product"), Some(TaskStatus::Succeeded));
    assert_eq!(trace.status_of("PricingResource.quote"), Some(TaskStatus::Succeeded));
}

#[tokio::test]
async fn test_place_order_streams_a_receipt() {
    let (shop, id) = stocked_shop(10);

    let outcome = shop
        .handle(
            "orders.place",
            RequestData::new().with_entity(json!({ "product_id": id.0, "quantity": 3 })),
        )
        .await;
    let order = outcome.result().unwrap().downcast_ref::<Order>().unwrap().clone();
    assert_eq!(order.product_id, id);
    assert_eq!(order.quantity, 3);
    assert_eq!(order.total, 76.5);
    assert_eq!(shop.catalog().get(&id).unwrap().quantity, 7);

    let receipts = outcome.response_attachments().unwrap().snapshot();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].id, format!("receipt-{}", order.id));
    let trace = outcome.report().unwrap().trace.clone().unwrap();
    assert!(trace.contains("price"));
    assert!(trace.contains("reserve stock"));
}

#[tokio::test]
async fn test_invalid_orders_are_rejected_before_scheduling() {
    let (shop, id) = stocked_shop(10);

    let zero = shop
        .handle(
            "orders.place",
            RequestData::new().with_entity(json!({ "product_id": id.0, "quantity": 0 })),
        )
        .await;
    assert_eq!(zero.error().unwrap().status(), HttpStatus::BAD_REQUEST);

    let malformed = shop
        .handle("orders.place", RequestData::new().with_entity(json!({ "sku": "x" })))
        .await;
    assert_eq!(malformed.error().unwrap().message(), "malformed order body");

    let unknown = shop.handle("orders.cancel", RequestData::new()).await;
    assert_eq!(unknown.error().unwrap().status(), HttpStatus::NOT_FOUND);
}

#[tokio::test]
async fn test_async_routes_need_an_engine() {
    let catalog = Catalog::new();
    let id = catalog.add(ProductCreate {
        name: "Gadget".to_string(),
        price: 4.0,
        quantity: 3,
    });
    let shop = Shop::new(catalog, None).unwrap();

    let outcome = shop
        .handle("pricing.quote", by_id(&id).with_query("quantity", "1"))
        .await;
    let message = outcome.error().unwrap().message().to_string();
    assert!(message.contains("PricingResource.quote"), "{message}");

    // Sync routes keep working without an engine.
    assert!(shop.handle("products.get", by_id(&id)).await.is_success());
}

#[tokio::test]
async fn test_batch_runs_under_one_plan() {
    let catalog = Catalog::new();
    let id = catalog.add(ProductCreate {
        name: "Gadget".to_string(),
        price: 4.0,
        quantity: 3,
    });
    let engine = Arc::new(MockEngine::delegating(TokioEngine::current().unwrap()));
    engine.expect_top_level_runs(1);
    let shop = Shop::new(catalog, Some(engine.clone())).unwrap();

    let outcomes = shop
        .handle_batch(vec![
            ("pricing.quote", by_id(&id).with_query("quantity", "2")),
            (
                "orders.place",
                RequestData::new().with_entity(json!({ "product_id": id.0, "quantity": 1 })),
            ),
            ("products.get", by_id(&ProductId(404))),
            ("nowhere", RequestData::new()),
        ])
        .await;

    assert_eq!(outcomes.len(), 4);
    let quote_plan = outcomes[0].report().unwrap().trace.as_ref().unwrap().plan_id;
    let order_plan = outcomes[1].report().unwrap().trace.as_ref().unwrap().plan_id;
    assert_eq!(quote_plan, order_plan);
    assert_eq!(outcomes[2].error().unwrap().status(), HttpStatus::NOT_FOUND);
    assert_eq!(outcomes[3].error().unwrap().message(), "no route `nowhere`");
    engine.verify();
}
