use std::{sync::Arc, time::Duration};

use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use log::debug;
use vault_payment_engine::{
    db_types::{NewProduct, Product},
    events::EventProducers,
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    CatalogApi,
    OrderFlowApi,
    PaymentPolicy,
    ProductCache,
    ProductCatalog,
    SqliteDatabase,
    ThrottleGuard,
    DEFAULT_PRODUCT_CACHE_TTL,
};

use super::mocks::MockProcessor;
use crate::helpers::json_config;

pub type TestOrderApi = OrderFlowApi<SqliteDatabase, MockProcessor>;

/// A migrated throwaway database, plus the shared product cache the APIs read through.
pub struct TestContext {
    pub db: SqliteDatabase,
    pub cache: Arc<ProductCache<SqliteDatabase>>,
    url: String,
}

impl TestContext {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        let cache = Arc::new(ProductCache::new(db.clone(), DEFAULT_PRODUCT_CACHE_TTL));
        Self { db, cache, url }
    }

    pub async fn add_product(&self, name: &str, price: &str) -> Product {
        let product = NewProduct::new(name, price.parse().unwrap());
        self.db.insert_product(product).await.expect("Could not insert product")
    }

    pub fn order_api(&self, processor: MockProcessor) -> web::Data<TestOrderApi> {
        let api = OrderFlowApi::new(
            self.db.clone(),
            Arc::clone(&self.cache),
            Arc::new(ThrottleGuard::default()),
            processor,
            EventProducers::default(),
        )
        .with_policy(fast_policy());
        web::Data::new(api)
    }

    pub fn catalog_api(&self) -> web::Data<CatalogApi<SqliteDatabase>> {
        web::Data::new(CatalogApi::new(self.db.clone(), Arc::clone(&self.cache)))
    }

    pub async fn tear_down(mut self) {
        self.db.close().await;
        drop_database(&self.url).await;
    }
}

pub fn fast_policy() -> PaymentPolicy {
    PaymentPolicy { invoice_attempts: 2, retry_backoff: Duration::from_millis(1), ..PaymentPolicy::default() }
}

/// Runs a single request against an app built by `configure`. Errors raised by middleware are rendered the way the
/// server would render them.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().app_data(json_config()).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}
