use std::sync::Arc;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::json;
use vault_payment_engine::{
    db_types::{Channel, OrderCode},
    order_objects::OrderRequest,
    CatalogApi,
    InvoiceError,
    SqliteDatabase,
    ThrottleGuard,
    THROTTLE_WINDOW,
};

use super::{
    helpers::{json, send_request, TestContext, TestOrderApi},
    mocks::{invoice_for, invoicing_processor, MockProcessor},
};
use crate::{
    config::ServerOptions,
    routes::{CancelOrderRoute, CreateOrderRoute, OrderStatusRoute, ProductsRoute, RequestDeliveryRoute},
    throttling::IpThrottle,
};

fn configure(
    orders: web::Data<TestOrderApi>,
    catalog: web::Data<CatalogApi<SqliteDatabase>>,
    ip_throttle: IpThrottle,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let options = ServerOptions { use_x_forwarded_for: true, use_forwarded: false };
        cfg.app_data(orders)
            .app_data(catalog)
            .app_data(web::Data::new(options))
            .app_data(web::Data::new(ip_throttle))
            .service(ProductsRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase, MockProcessor>::new())
            .service(OrderStatusRoute::<SqliteDatabase, MockProcessor>::new())
            .service(CancelOrderRoute::<SqliteDatabase, MockProcessor>::new())
            .service(RequestDeliveryRoute::<SqliteDatabase, MockProcessor>::new());
    }
}

fn ip_limit(limit: u32) -> IpThrottle {
    IpThrottle::new(Arc::new(ThrottleGuard::new(limit, THROTTLE_WINDOW)))
}

fn new_order(product_id: i64, quantity: u32, requester: &str, channel: &str) -> TestRequest {
    TestRequest::post().uri("/orders").insert_header(("X-Forwarded-For", "198.51.100.20")).set_json(json!({
        "product_id": product_id,
        "quantity": quantity,
        "requester_id": requester,
        "channel": channel,
        "pay_currency": "btc"
    }))
}

#[actix_web::test]
async fn list_products() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    ctx.add_product("Vault key", "19.99").await;
    ctx.add_product("Vault map", "5").await;
    let req = TestRequest::get().uri("/products");
    let config = configure(ctx.order_api(invoicing_processor()), ctx.catalog_api(), ip_limit(10));
    let (status, body) = send_request(req, config).await;
    assert_eq!(status, StatusCode::OK);
    let products = json(&body);
    let names = products.as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Vault key", "Vault map"]);
    assert_eq!(products[0]["price"], "19.99");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn create_web_order() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let product = ctx.add_product("Vault key", "19.99").await;
    let mut processor = MockProcessor::new();
    processor
        .expect_create_invoice()
        .withf(|req| req.pay_currency.as_deref() == Some("btc") && req.order_code.as_str().starts_with("W-"))
        .times(1)
        .returning(|req| Ok(invoice_for(req)));
    let req = new_order(product.id, 2, "browser-token-1", "web");
    let (status, body) = send_request(req, configure(ctx.order_api(processor), ctx.catalog_api(), ip_limit(10))).await;
    assert_eq!(status, StatusCode::CREATED);
    let order = json(&body);
    let code = order["order_code"].as_str().unwrap();
    assert_eq!(order["total_amount"], "39.98");
    assert_eq!(order["currency"], "USD");
    assert_eq!(order["invoice_id"], format!("inv-{code}"));
    ctx.tear_down().await;
}

#[actix_web::test]
async fn bad_order_requests() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let product = ctx.add_product("Vault key", "19.99").await;
    let mut processor = MockProcessor::new();
    processor.expect_create_invoice().never();
    let orders = ctx.order_api(processor);
    let catalog = ctx.catalog_api();

    let req = new_order(product.id, 0, "alice", "bot");
    let (status, body) = send_request(req, configure(orders.clone(), catalog.clone(), ip_limit(10))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("Quantity"));

    let req = new_order(product.id + 100, 1, "alice", "bot");
    let (status, _) = send_request(req, configure(orders.clone(), catalog.clone(), ip_limit(10))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::post().uri("/orders").set_json(json!({ "product_id": "one" }));
    let (status, body) = send_request(req, configure(orders, catalog, ip_limit(10))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].is_string());
    ctx.tear_down().await;
}

#[actix_web::test]
async fn processor_outage_is_a_bad_gateway() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let product = ctx.add_product("Vault key", "19.99").await;
    let mut processor = MockProcessor::new();
    // Two attempts, both with the same order code
    processor
        .expect_create_invoice()
        .times(2)
        .returning(|_| Err(InvoiceError::ProcessorUnavailable("503 Service Unavailable".into())));
    let req = new_order(product.id, 1, "alice", "bot");
    let (status, _) = send_request(req, configure(ctx.order_api(processor), ctx.catalog_api(), ip_limit(10))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let recent = ctx.order_api(invoicing_processor()).recent_orders(10).await.unwrap();
    assert!(recent.is_empty(), "nothing may be stored when invoicing fails");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn web_orders_are_limited_per_ip() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let product = ctx.add_product("Vault key", "19.99").await;
    let orders = ctx.order_api(invoicing_processor());
    let catalog = ctx.catalog_api();
    let ip_throttle = ip_limit(2);
    let mut statuses = Vec::new();
    for i in 0..3 {
        // A fresh requester id every time. Only the IP gives it away.
        let req = new_order(product.id, 1, &format!("token-{i}"), "web");
        let (status, _) = send_request(req, configure(orders.clone(), catalog.clone(), ip_throttle.clone())).await;
        statuses.push(status);
    }
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CREATED, StatusCode::TOO_MANY_REQUESTS]);
    // Bot orders are not limited by IP
    let req = new_order(product.id, 1, "12345", "bot");
    let (status, _) = send_request(req, configure(orders, catalog, ip_limit(0))).await;
    assert_eq!(status, StatusCode::CREATED);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn order_status_and_cancellation() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let product = ctx.add_product("Vault key", "19.99").await;
    let orders = ctx.order_api(invoicing_processor());
    let catalog = ctx.catalog_api();
    let created =
        orders.create_order(OrderRequest::new(product.id, 1, "alice", Channel::Bot)).await.expect("order not created");
    let code = created.order_code.as_str().to_string();

    let req = TestRequest::get().uri(&format!("/orders/{}", code.to_lowercase()));
    let (status, body) = send_request(req, configure(orders.clone(), catalog.clone(), ip_limit(10))).await;
    assert_eq!(status, StatusCode::OK);
    let view = json(&body);
    assert_eq!(view["status"], "pending");
    assert!(view.get("requester_id").is_none(), "the status view must not leak the requester");

    let req = TestRequest::get().uri("/orders/W-NOSUCH-010101");
    let (status, _) = send_request(req, configure(orders.clone(), catalog.clone(), ip_limit(10))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let cancel = |who: &str| {
        TestRequest::post().uri(&format!("/orders/{code}/cancel")).set_json(json!({ "requester_id": who }))
    };
    let (status, _) = send_request(cancel("mallory"), configure(orders.clone(), catalog.clone(), ip_limit(10))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send_request(cancel("alice"), configure(orders.clone(), catalog.clone(), ip_limit(10))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "cancelled");
    let (status, _) = send_request(cancel("alice"), configure(orders.clone(), catalog.clone(), ip_limit(10))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let order = orders.order_status(&OrderCode(code.clone())).await.unwrap();
    assert!(order.paid_at.is_none());
    ctx.tear_down().await;
}

#[actix_web::test]
async fn delivery_requires_a_paid_order() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let product = ctx.add_product("Vault key", "19.99").await;
    let orders = ctx.order_api(invoicing_processor());
    let catalog = ctx.catalog_api();
    let created = orders.create_order(OrderRequest::new(product.id, 1, "alice", Channel::Bot)).await.unwrap();
    let delivery = |details: &str| {
        TestRequest::post()
            .uri(&format!("/orders/{}/delivery", created.order_code))
            .set_json(json!({ "method": "email", "details": details }))
    };
    let config = configure(orders.clone(), catalog.clone(), ip_limit(10));
    let (status, _) = send_request(delivery("alice@example.com"), config).await;
    assert_eq!(status, StatusCode::CONFLICT);

    orders.apply_payment_confirmation(&created.invoice_id, "19.99".parse().unwrap(), "USD").await.unwrap();
    let config = configure(orders.clone(), catalog.clone(), ip_limit(10));
    let (status, _) = send_request(delivery("not-an-email"), config).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = send_request(delivery("alice@example.com"), configure(orders, catalog, ip_limit(10))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["success"], true);
    ctx.tear_down().await;
}
