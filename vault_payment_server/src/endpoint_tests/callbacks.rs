use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::json;
use vault_payment_engine::{
    db_types::{Channel, OrderStatusType},
    helpers::calculate_ipn_signature,
    order_objects::{OrderCreated, OrderRequest},
    CallbackVerifier,
    OrderManagement,
    SqliteDatabase,
    IPN_SIGNATURE_HEADER,
};
use vpg_common::Secret;

use super::{
    helpers::{json, send_request, TestContext, TestOrderApi},
    mocks::{invoicing_processor, MockProcessor},
};
use crate::routes::PaymentCallbackRoute;

const IPN_SECRET: &str = "ipn-test-secret";

fn configure(orders: web::Data<TestOrderApi>, secret: &str) -> impl FnOnce(&mut ServiceConfig) {
    let verifier = CallbackVerifier::new(Secret::new(secret.to_string()));
    move |cfg| {
        cfg.app_data(orders)
            .app_data(web::Data::new(verifier))
            .service(PaymentCallbackRoute::<SqliteDatabase, MockProcessor>::new());
    }
}

fn callback_body(order: &OrderCreated, status: &str) -> String {
    json!({
        "payment_id": 5077125051u64,
        "invoice_id": order.invoice_id,
        "payment_status": status,
        "pay_amount": "0.0005",
        "actually_paid": "0.0005",
        "pay_currency": "btc",
        "price_amount": order.total_amount.to_string(),
        "price_currency": "usd",
        "order_id": order.order_code.as_str()
    })
    .to_string()
}

fn signed(body: &str) -> TestRequest {
    TestRequest::post()
        .uri("/ipn")
        .insert_header((IPN_SIGNATURE_HEADER, calculate_ipn_signature(IPN_SECRET, body.as_bytes())))
        .set_payload(body.to_string())
}

async fn pending_order(ctx: &TestContext, orders: &TestOrderApi) -> OrderCreated {
    let product = ctx.add_product("Vault key", "19.99").await;
    let request = OrderRequest::new(product.id, 1, "alice", Channel::Bot).with_pay_currency("btc");
    orders.create_order(request).await.expect("order not created")
}

#[actix_web::test]
async fn unauthenticated_callbacks() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let orders = ctx.order_api(invoicing_processor());
    let order = pending_order(&ctx, &orders).await;
    let body = callback_body(&order, "finished");

    let req = TestRequest::post().uri("/ipn").set_payload(body.clone());
    let (status, _) = send_request(req, configure(orders.clone(), IPN_SECRET)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bad_sig = calculate_ipn_signature("some-other-secret", body.as_bytes());
    let req = TestRequest::post().uri("/ipn").insert_header((IPN_SIGNATURE_HEADER, bad_sig)).set_payload(body.clone());
    let (status, _) = send_request(req, configure(orders.clone(), IPN_SECRET)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A tampered body no longer matches its signature
    let sig = calculate_ipn_signature(IPN_SECRET, body.as_bytes());
    let tampered = body.replace("0.0005", "5.0000");
    let req = TestRequest::post().uri("/ipn").insert_header((IPN_SIGNATURE_HEADER, sig)).set_payload(tampered);
    let (status, _) = send_request(req, configure(orders.clone(), IPN_SECRET)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // No secret configured means nothing is accepted, not even correctly signed bodies
    let (status, _) = send_request(signed(&body), configure(orders.clone(), "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let view = orders.order_status(&order.order_code).await.unwrap();
    assert_eq!(view.status, OrderStatusType::Pending);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn signed_but_malformed() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let orders = ctx.order_api(invoicing_processor());
    let body = r#"{"payment_status": "finished", "pay_currency": "btc"}"#;
    let (status, body) = send_request(signed(body), configure(orders, IPN_SECRET)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("invoice_id"));
    ctx.tear_down().await;
}

#[actix_web::test]
async fn waiting_callbacks_are_acknowledged_and_ignored() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let orders = ctx.order_api(invoicing_processor());
    let order = pending_order(&ctx, &orders).await;
    let req = signed(&callback_body(&order, "waiting"));
    let (status, body) = send_request(req, configure(orders.clone(), IPN_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["outcome"], "ignored");
    let view = orders.order_status(&order.order_code).await.unwrap();
    assert_eq!(view.status, OrderStatusType::Pending);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn finished_payment_settles_the_order_once() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let orders = ctx.order_api(invoicing_processor());
    let order = pending_order(&ctx, &orders).await;
    let body = callback_body(&order, "finished");

    let (status, ack) = send_request(signed(&body), configure(orders.clone(), IPN_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    let ack = json(&ack);
    assert_eq!(ack["outcome"], "paid");
    assert_eq!(ack["invoice_id"], order.invoice_id.as_str());
    let view = orders.order_status(&order.order_code).await.unwrap();
    assert_eq!(view.status, OrderStatusType::Paid);
    let paid_at = view.paid_at;
    assert!(paid_at.is_some());

    // The processor repeats itself. Replays change nothing.
    let (status, ack) = send_request(signed(&body), configure(orders.clone(), IPN_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&ack)["outcome"], "already_settled");
    let view = orders.order_status(&order.order_code).await.unwrap();
    assert_eq!(view.status, OrderStatusType::Paid);
    assert_eq!(view.paid_at, paid_at);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn underpayment_is_held_for_review() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let orders = ctx.order_api(invoicing_processor());
    let order = pending_order(&ctx, &orders).await;
    // Half of what was quoted arrived
    let body = callback_body(&order, "partially_paid")
        .replace(r#""actually_paid":"0.0005""#, r#""actually_paid":"0.00025""#);
    let (status, ack) = send_request(signed(&body), configure(orders.clone(), IPN_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&ack)["outcome"], "held_for_review");
    let view = orders.order_status(&order.order_code).await.unwrap();
    assert_eq!(view.status, OrderStatusType::Pending);
    let stored = orders.db().fetch_order_by_code(&order.order_code).await.unwrap().unwrap();
    assert!(stored.review_note.is_some());

    // The rest arrives and the processor reports the payment as finished
    let req = signed(&callback_body(&order, "finished"));
    let (status, ack) = send_request(req, configure(orders.clone(), IPN_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&ack)["outcome"], "paid");
    let stored = orders.db().fetch_order_by_code(&order.order_code).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatusType::Paid);
    assert!(stored.review_note.is_none(), "a settled order must not stay flagged for review");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn unknown_invoices_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new().await;
    let orders = ctx.order_api(invoicing_processor());
    let body = json!({
        "invoice_id": "999999",
        "payment_status": "finished",
        "actually_paid": "1.5",
        "pay_currency": "btc"
    })
    .to_string();
    let (status, ack) = send_request(signed(&body), configure(orders, IPN_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    let ack = json(&ack);
    assert_eq!(ack["outcome"], "unknown_invoice");
    assert_eq!(ack["invoice_id"], "999999");
    ctx.tear_down().await;
}
