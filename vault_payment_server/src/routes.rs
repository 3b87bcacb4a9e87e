//! Request handler definitions
//!
//! Define each route and its handler here. Handlers stay thin: they extract the request, call the engine and turn
//! the result into a response. Business rules belong in `vault_payment_engine`.
//!
//! A note about performance:
//! Each worker thread processes its requests sequentially, so handlers must never block the current thread. Any I/O
//! (the database, the payment processor) is awaited, never waited on.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use vault_payment_engine::{
    db_types::{Channel, NewProduct, OrderCode, ProductUpdate},
    order_objects::{ConfirmationOutcome, OrderRequest, OrderStatusView},
    CallbackVerifier,
    CatalogApi,
    InvoiceProcessor,
    OrderFlowApi,
    OrderFlowError,
    ProductCatalog,
    VaultStore,
    IPN_SIGNATURE_HEADER,
};

use crate::{
    config::ServerOptions,
    data_objects::{CallbackAck, CancelOrderParams, DeliveryParams, JsonResponse, RecentOrdersQuery},
    errors::ServerError,
    helpers::get_remote_ip,
    throttling::IpThrottle,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

fn parse_order_code(code: &str) -> Result<OrderCode, ServerError> {
    code.parse::<OrderCode>().map_err(|e| ServerError::InvalidRequestPath(e.to_string()))
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(products => Get "/products" impl ProductCatalog);
/// The product list, as both front-ends show it. Served from the product cache.
pub async fn products<B: ProductCatalog>(api: web::Data<CatalogApi<B>>) -> Result<HttpResponse, ServerError> {
    let products = api.products().await?;
    Ok(HttpResponse::Ok().json(products.as_ref()))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl VaultStore, InvoiceProcessor);
/// Place an order.
///
/// The body is an [`OrderRequest`]. On success the response is `201 Created` with the order code and the payment
/// details from the processor. Web orders are also limited per remote IP.
///
/// ## Errors
/// * `400` for a zero quantity or a malformed body
/// * `404` if the product does not exist
/// * `429` if the buyer (or, for web orders, their IP) is over the limit
/// * `502` if the payment processor could not issue an invoice. Nothing is stored in that case.
/// * `503` if the product list cannot be loaded
pub async fn create_order<B, P>(
    req: HttpRequest,
    body: web::Json<OrderRequest>,
    options: web::Data<ServerOptions>,
    ip_throttle: web::Data<IpThrottle>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: VaultStore,
    P: InvoiceProcessor,
{
    let request = body.into_inner();
    trace!("💻️ New order request for product #{} from {}", request.product_id, request.requester_id);
    if request.channel == Channel::Web {
        match get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded) {
            Some(ip) if !ip_throttle.allow(&ip.to_string()) => {
                info!("💻️ Web order from {ip} was rate limited");
                return Err(ServerError::RateLimited);
            },
            Some(_) => {},
            None => debug!("💻️ Could not determine the remote IP of a web order. Only the buyer limit applies."),
        }
    }
    let order = api.create_order(request).await.map_err(|e| {
        debug!("💻️ Could not create order. {e}");
        e
    })?;
    Ok(HttpResponse::Created().json(order))
}

route!(order_status => Get "/orders/{code}" impl VaultStore, InvoiceProcessor);
/// The status of an order. Knowing the order code is all it takes.
pub async fn order_status<B, P>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: VaultStore,
    P: InvoiceProcessor,
{
    let code = parse_order_code(&path.into_inner())?;
    let status = api.order_status(&code).await?;
    Ok(HttpResponse::Ok().json(status))
}

route!(cancel_order => Post "/orders/{code}/cancel" impl VaultStore, InvoiceProcessor);
/// Buyer cancellation of a pending order.
///
/// Returns `403` if `requester_id` is not the buyer's, and `409` if the order is no longer pending (including when a
/// payment landed first).
pub async fn cancel_order<B, P>(
    path: web::Path<String>,
    body: web::Json<CancelOrderParams>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: VaultStore,
    P: InvoiceProcessor,
{
    let code = parse_order_code(&path.into_inner())?;
    let CancelOrderParams { requester_id } = body.into_inner();
    info!("💻️ Cancel request for order {code}");
    let order = api.cancel_order(&code, &requester_id).await.map_err(|e| {
        debug!("💻️ Could not cancel order {code}. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(OrderStatusView::from(order)))
}

route!(request_delivery => Post "/orders/{code}/delivery" impl VaultStore, InvoiceProcessor);
/// The buyer of a paid order tells us where to deliver. The admin channel is notified.
pub async fn request_delivery<B, P>(
    path: web::Path<String>,
    body: web::Json<DeliveryParams>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: VaultStore,
    P: InvoiceProcessor,
{
    let code = parse_order_code(&path.into_inner())?;
    let DeliveryParams { method, details } = body.into_inner();
    api.request_delivery(&code, method, &details).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Delivery by {method} requested for order {code}"))))
}

//------------------------------------------   Payment callbacks  ---------------------------------------------
route!(payment_callback => Post "/ipn" impl VaultStore, InvoiceProcessor);
/// NOWPayments IPN callbacks.
///
/// The raw body is checked against the `x-nowpayments-sig` header before anything is parsed. Then:
/// * `401` if the signature is missing or wrong. Nothing else happens.
/// * `400` if the body is signed but cannot be parsed.
/// * `200` for every outcome the ledger reaches, including replays, reviews and unknown invoices. Answering anything
///   else would make the processor retry a callback that will never succeed.
/// * `500` if the order store failed. The processor will retry, which is safe since confirmations are idempotent.
///
/// Only `finished` and `partially_paid` callbacks reach the ledger. The other statuses are logged and acknowledged.
pub async fn payment_callback<B, P>(
    req: HttpRequest,
    body: web::Bytes,
    verifier: web::Data<CallbackVerifier>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: VaultStore,
    P: InvoiceProcessor,
{
    let signature = req.headers().get(IPN_SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let callback = verifier.verify(body.as_ref(), signature).map_err(|e| {
        warn!("💻️ Payment callback from {:?} was refused. {e}", req.peer_addr());
        e
    })?;
    let invoice_id = callback.invoice_id.as_str();
    info!("💻️ Payment callback for invoice {invoice_id}: {}", callback.payment_status);
    if !callback.payment_status.is_actionable() {
        debug!("💻️ Nothing to do for status {}", callback.payment_status);
        return Ok(HttpResponse::Ok().json(CallbackAck::new(invoice_id, "ignored")));
    }
    let (amount, currency) = callback.confirmed_amount();
    let ack = match api.apply_payment_confirmation(invoice_id, amount, currency).await {
        Ok(ConfirmationOutcome::Paid { order }) => {
            info!("💻️ Order {} is paid", order.order_code);
            CallbackAck::new(invoice_id, "paid")
        },
        Ok(ConfirmationOutcome::AlreadySettled { order }) => {
            debug!("💻️ Replayed callback for order {}", order.order_code);
            CallbackAck::new(invoice_id, "already_settled")
        },
        Ok(ConfirmationOutcome::HeldForReview { order, reason }) => {
            warn!("💻️ Payment for order {} is held for review. {reason}", order.order_code);
            CallbackAck::new(invoice_id, "held_for_review")
        },
        Err(OrderFlowError::OrderNotFound(_)) => {
            warn!("💻️ Authenticated callback for unknown invoice {invoice_id}. Acknowledging it.");
            CallbackAck::new(invoice_id, "unknown_invoice")
        },
        Err(e @ OrderFlowError::StoreError(_)) => return Err(e.into()),
        Err(e) => {
            error!("💻️ Unexpected error applying the callback for invoice {invoice_id}. {e}");
            CallbackAck::new(invoice_id, "ignored")
        },
    };
    Ok(HttpResponse::Ok().json(ack))
}

//----------------------------------------------   Admin  ----------------------------------------------------
// These are mounted under the `/admin` scope, behind the admin token middleware.

route!(recent_orders => Get "/orders" impl VaultStore, InvoiceProcessor);
/// Order history, newest first. `?limit=` defaults to 50 and is capped at 500.
pub async fn recent_orders<B, P>(
    query: web::Query<RecentOrdersQuery>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: VaultStore,
    P: InvoiceProcessor,
{
    let orders = api.recent_orders(query.limit()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(mark_delivered => Post "/orders/{code}/delivered" impl VaultStore, InvoiceProcessor);
pub async fn mark_delivered<B, P>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: VaultStore,
    P: InvoiceProcessor,
{
    let code = parse_order_code(&path.into_inner())?;
    info!("💻️ Admin marked order {code} as delivered");
    let order = api.mark_delivered(&code).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(add_product => Post "/products" impl ProductCatalog);
pub async fn add_product<B: ProductCatalog>(
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.add_product(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(update_product => Put "/products/{id}" impl ProductCatalog);
pub async fn update_product<B: ProductCatalog>(
    path: web::Path<i64>,
    body: web::Json<ProductUpdate>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.update_product(path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(remove_product => Delete "/products/{id}" impl ProductCatalog);
/// Orders already placed keep the name and price they were placed with.
pub async fn remove_product<B: ProductCatalog>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    api.remove_product(id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Product {id} removed"))))
}
