use std::{sync::Arc, time::Duration};

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use vault_payment_engine::{
    db_types::{NewProduct, Product},
    events::EventProducers,
    CatalogApi,
    OrderFlowApi,
    PaymentPolicy,
    ProductCache,
    SqliteDatabase,
    ThrottleGuard,
    DEFAULT_PRODUCT_CACHE_TTL,
};

use super::fake_processor::FakeProcessor;

pub fn random_db_path() -> String {
    format!("sqlite://{}/vpg_engine_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let _ = Sqlite::drop_database(url).await;
    Sqlite::create_database(url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

/// Everything a ledger test needs, wired the way the server wires it.
pub struct TestLedger {
    pub db: SqliteDatabase,
    pub api: OrderFlowApi<SqliteDatabase, FakeProcessor>,
    pub catalog: CatalogApi<SqliteDatabase>,
    pub processor: FakeProcessor,
}

/// Retries in tests should not make the suite slow.
pub fn fast_policy() -> PaymentPolicy {
    PaymentPolicy { retry_backoff: Duration::from_millis(1), ..PaymentPolicy::default() }
}

pub async fn setup() -> TestLedger {
    setup_with(EventProducers::default(), ThrottleGuard::default(), fast_policy()).await
}

pub async fn setup_with(producers: EventProducers, throttle: ThrottleGuard, policy: PaymentPolicy) -> TestLedger {
    let db = prepare_test_env(&random_db_path()).await;
    let cache = Arc::new(ProductCache::new(db.clone(), DEFAULT_PRODUCT_CACHE_TTL));
    let processor = FakeProcessor::default();
    let api = OrderFlowApi::new(db.clone(), Arc::clone(&cache), Arc::new(throttle), processor.clone(), producers)
        .with_policy(policy);
    let catalog = CatalogApi::new(db.clone(), cache);
    TestLedger { db, api, catalog, processor }
}

impl TestLedger {
    pub async fn add_product(&self, name: &str, price: &str) -> Product {
        let product = NewProduct::new(name, price.parse().unwrap());
        self.catalog.add_product(product).await.expect("Error adding product")
    }

    pub async fn tear_down(mut self) {
        let url = self.db.url().to_string();
        self.db.close().await;
        if let Err(e) = Sqlite::drop_database(&url).await {
            warn!("🚀️ Could not drop test database {url}: {e}");
        }
    }
}
