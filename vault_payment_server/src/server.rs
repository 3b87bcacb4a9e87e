use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use vault_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CallbackVerifier,
    CatalogApi,
    OrderFlowApi,
    ProductCache,
    SqliteDatabase,
    ThrottleGuard,
    THROTTLE_WINDOW,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    helpers::json_config,
    integrations::{nowpayments::NowPaymentsProcessor, telegram::create_telegram_event_handlers},
    middleware::AdminAuthMiddlewareFactory,
    routes::{
        health,
        AddProductRoute,
        CancelOrderRoute,
        CreateOrderRoute,
        MarkDeliveredRoute,
        OrderStatusRoute,
        PaymentCallbackRoute,
        ProductsRoute,
        RecentOrdersRoute,
        RemoveProductRoute,
        RequestDeliveryRoute,
        UpdateProductRoute,
    },
    throttling::{start_throttle_janitor, IpThrottle},
};

const THROTTLE_JANITOR_PERIOD: Duration = Duration::from_secs(300);

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let producers = start_event_handlers(&config);
    let processor = NowPaymentsProcessor::new(config.nowpayments.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    report_processor_status(&processor).await;
    let srv = create_server_instance(config, db, processor, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// NOWPayments being down at startup is not fatal. Order creation reports it per request.
async fn report_processor_status(processor: &NowPaymentsProcessor) {
    match processor.api().api_status().await {
        Ok(status) if status.is_ok() => info!("💳️ NOWPayments API is up"),
        Ok(status) => warn!("💳️ NOWPayments API reports '{}'", status.message),
        Err(e) => warn!("💳️ Could not reach the NOWPayments API. {e}"),
    }
}

/// Wires the Telegram hooks, if Telegram is configured, and starts their handler tasks.
fn start_event_handlers(config: &ServerConfig) -> EventProducers {
    let handlers = if config.telegram.is_enabled() {
        create_telegram_event_handlers(config.telegram.clone()).unwrap_or_else(|e| {
            error!("📨️ Could not set up Telegram notifications. {e}. Notifications are disabled.");
            EventHandlers::new(1, EventHooks::default())
        })
    } else {
        info!("📨️ Telegram notifications are disabled");
        EventHandlers::new(1, EventHooks::default())
    };
    let producers = handlers.producers();
    handlers.start_handlers();
    producers
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    processor: NowPaymentsProcessor,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    // Process-wide state. Every worker shares these.
    let cache = Arc::new(ProductCache::new(db.clone(), config.product_cache_ttl));
    let order_throttle = Arc::new(ThrottleGuard::new(config.order_rate_limit, THROTTLE_WINDOW));
    let ip_throttle = IpThrottle::new(Arc::new(ThrottleGuard::new(config.order_rate_limit, THROTTLE_WINDOW)));
    let verifier = CallbackVerifier::new(config.ipn_secret.clone());
    let options = ServerOptions::from_config(&config);
    let policy = config.payment_policy();
    let admin_token = config.admin_token.clone();
    start_throttle_janitor(vec![Arc::clone(&order_throttle), ip_throttle.guard()], THROTTLE_JANITOR_PERIOD);

    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(
            db.clone(),
            Arc::clone(&cache),
            Arc::clone(&order_throttle),
            processor.clone(),
            producers.clone(),
        )
        .with_policy(policy);
        let catalog_api = CatalogApi::new(db.clone(), Arc::clone(&cache));
        let admin_scope = web::scope("/admin")
            .wrap(AdminAuthMiddlewareFactory::new(admin_token.clone()))
            .service(RecentOrdersRoute::<SqliteDatabase, NowPaymentsProcessor>::new())
            .service(MarkDeliveredRoute::<SqliteDatabase, NowPaymentsProcessor>::new())
            .service(AddProductRoute::<SqliteDatabase>::new())
            .service(UpdateProductRoute::<SqliteDatabase>::new())
            .service(RemoveProductRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("vpg::access_log"))
            .app_data(json_config())
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(verifier.clone()))
            .app_data(web::Data::new(ip_throttle.clone()))
            .app_data(web::Data::new(options))
            .service(health)
            .service(ProductsRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase, NowPaymentsProcessor>::new())
            .service(OrderStatusRoute::<SqliteDatabase, NowPaymentsProcessor>::new())
            .service(CancelOrderRoute::<SqliteDatabase, NowPaymentsProcessor>::new())
            .service(RequestDeliveryRoute::<SqliteDatabase, NowPaymentsProcessor>::new())
            .service(PaymentCallbackRoute::<SqliteDatabase, NowPaymentsProcessor>::new())
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
