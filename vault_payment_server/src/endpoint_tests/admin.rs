use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::json;
use vault_payment_engine::{
    db_types::Channel,
    order_objects::OrderRequest,
    CatalogApi,
    SqliteDatabase,
};
use vpg_common::Secret;

use super::{
    helpers::{json, send_request, TestContext, TestOrderApi},
    mocks::{invoicing_processor, MockProcessor},
};
use crate::{
    middleware::AdminAuthMiddlewareFactory,
    routes::{
        AddProductRoute,
        MarkDeliveredRoute,
        ProductsRoute,
        RecentOrdersRoute,
        RemoveProductRoute,
        UpdateProductRoute,
    },
};

const ADMIN_TOKEN: &str = "correct-horse-battery-staple";

fn configure(
    orders: web::Data<TestOrderApi>,
    catalog: web::Data<CatalogApi<SqliteDatabase>>,
    token: &str,
) -> impl FnOnce(&mut ServiceConfig) {
    let token = Secret::new(token.to_string());
    move |cfg| {
        let admin = web::scope("/admin")
            .wrap(AdminAuthMiddlewareFactory::new(token))
            .service(RecentOrdersRoute::<SqliteDatabase, MockProcessor>::new())
            .service(MarkDeliveredRoute::<SqliteDatabase, MockProcessor>::new())
            .service(AddProductRoute::<SqliteDatabase>::new())
            .service(UpdateProductRoute::<SqliteDatabase>::new())
            .service(RemoveProductRoute::<SqliteDatabase>::new());
        cfg.app_data(orders).app_data(catalog).service(ProductsRoute::<SqliteDatabase>::new()).service(admin);
    }
}

fn bearer(req: TestRequest, token: &str) -> TestRequest {
    req.insert_header(("Authorization", format!("Bearer {token}")))
}

#[actix_web::test]
async fn admin_routes_need_the_token() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let orders = ctx.order_api(invoicing_processor());
    let catalog = ctx.catalog_api();

    let req = TestRequest::get().uri("/admin/orders");
    let (status, body) = send_request(req, configure(orders.clone(), catalog.clone(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json(&body)["error"].is_string());

    let req = bearer(TestRequest::get().uri("/admin/orders"), "not-the-token");
    let (status, _) = send_request(req, configure(orders.clone(), catalog.clone(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Basic auth with the right secret is still not a bearer token
    let req = TestRequest::get().uri("/admin/orders").insert_header(("Authorization", format!("Basic {ADMIN_TOKEN}")));
    let (status, _) = send_request(req, configure(orders.clone(), catalog.clone(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Public routes are unaffected
    let req = TestRequest::get().uri("/products");
    let (status, _) = send_request(req, configure(orders, catalog, ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn empty_admin_token_refuses_everyone() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let orders = ctx.order_api(invoicing_processor());
    let req = bearer(TestRequest::get().uri("/admin/orders"), ADMIN_TOKEN);
    let (status, _) = send_request(req, configure(orders, ctx.catalog_api(), "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn recent_orders_newest_first() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let product = ctx.add_product("Vault key", "19.99").await;
    let orders = ctx.order_api(invoicing_processor());
    let catalog = ctx.catalog_api();
    let first = orders.create_order(OrderRequest::new(product.id, 1, "alice", Channel::Bot)).await.unwrap();
    let second = orders.create_order(OrderRequest::new(product.id, 3, "bob", Channel::Web)).await.unwrap();

    let req = bearer(TestRequest::get().uri("/admin/orders"), ADMIN_TOKEN);
    let (status, body) = send_request(req, configure(orders.clone(), catalog.clone(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let list = json(&body);
    let codes = list.as_array().unwrap().iter().map(|o| o["order_code"].as_str().unwrap()).collect::<Vec<_>>();
    assert_eq!(codes, vec![second.order_code.as_str(), first.order_code.as_str()]);
    // The admin view is the full record
    assert_eq!(list[0]["requester_id"], "bob");
    assert_eq!(list[0]["total_amount"], "59.97");

    let req = bearer(TestRequest::get().uri("/admin/orders?limit=1"), ADMIN_TOKEN);
    let (status, body) = send_request(req, configure(orders, catalog, ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body).as_array().unwrap().len(), 1);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn mark_delivered() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let product = ctx.add_product("Vault key", "19.99").await;
    let orders = ctx.order_api(invoicing_processor());
    let catalog = ctx.catalog_api();
    let created = orders.create_order(OrderRequest::new(product.id, 1, "alice", Channel::Bot)).await.unwrap();
    let path = format!("/admin/orders/{}/delivered", created.order_code);
    let deliver = || bearer(TestRequest::post().uri(&path), ADMIN_TOKEN);

    let (status, _) = send_request(deliver(), configure(orders.clone(), catalog.clone(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::CONFLICT, "a pending order cannot be delivered");

    orders.apply_payment_confirmation(&created.invoice_id, "19.99".parse().unwrap(), "USD").await.unwrap();
    let (status, body) = send_request(deliver(), configure(orders.clone(), catalog.clone(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let order = json(&body);
    assert_eq!(order["status"], "delivered");
    assert!(order["delivered_at"].is_string());

    // Delivering twice is harmless
    let (status, _) = send_request(deliver(), configure(orders.clone(), catalog.clone(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);

    let req = bearer(TestRequest::post().uri("/admin/orders/B-NOSUCH-010101/delivered"), ADMIN_TOKEN);
    let (status, _) = send_request(req, configure(orders, catalog, ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn catalog_edits_are_visible_immediately() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let orders = ctx.order_api(invoicing_processor());
    let catalog = ctx.catalog_api();
    let list = |orders: web::Data<TestOrderApi>, catalog: web::Data<CatalogApi<SqliteDatabase>>| async move {
        let req = TestRequest::get().uri("/products");
        let (status, body) = send_request(req, configure(orders, catalog, ADMIN_TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
        json(&body)
    };
    // Warm the cache
    assert_eq!(list(orders.clone(), catalog.clone()).await, json!([]));

    let req = bearer(TestRequest::post().uri("/admin/products"), ADMIN_TOKEN)
        .set_json(json!({ "name": "Vault map", "price": "12.50", "description": "Where the vault is" }));
    let (status, body) = send_request(req, configure(orders.clone(), catalog.clone(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json(&body)["id"].as_i64().unwrap();
    let products = list(orders.clone(), catalog.clone()).await;
    assert_eq!(products[0]["name"], "Vault map");
    assert_eq!(products[0]["currency"], "USD");

    let req = bearer(TestRequest::put().uri(&format!("/admin/products/{id}")), ADMIN_TOKEN)
        .set_json(json!({ "price": "10" }));
    let (status, _) = send_request(req, configure(orders.clone(), catalog.clone(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let products = list(orders.clone(), catalog.clone()).await;
    assert_eq!(products[0]["price"], "10");
    assert_eq!(products[0]["name"], "Vault map");

    let req = bearer(TestRequest::put().uri(&format!("/admin/products/{id}")), ADMIN_TOKEN)
        .set_json(json!({ "price": "-1" }));
    let (status, _) = send_request(req, configure(orders.clone(), catalog.clone(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = bearer(TestRequest::delete().uri(&format!("/admin/products/{id}")), ADMIN_TOKEN);
    let (status, _) = send_request(req, configure(orders.clone(), catalog.clone(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list(orders.clone(), catalog.clone()).await, json!([]));

    let req = bearer(TestRequest::delete().uri(&format!("/admin/products/{id}")), ADMIN_TOKEN);
    let (status, _) = send_request(req, configure(orders, catalog, ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    ctx.tear_down().await;
}
