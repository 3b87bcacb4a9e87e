use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use nowpayments_tools::NowPaymentsConfig;
use rust_decimal::Decimal;
use vault_payment_engine::{PaymentPolicy, DEFAULT_PRODUCT_CACHE_TTL, ORDER_CREATION_LIMIT};
use vpg_common::{parse_boolean_flag, Secret};

const DEFAULT_VPG_HOST: &str = "127.0.0.1";
const DEFAULT_VPG_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/vault_store.db";
const DEFAULT_INVOICE_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The bearer token for the `/admin` routes. When empty, every admin request is refused.
    pub admin_token: Secret<String>,
    /// The NOWPayments IPN secret. When empty, every payment callback is refused.
    pub ipn_secret: Secret<String>,
    pub nowpayments: NowPaymentsConfig,
    pub telegram: TelegramConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the `for=` entry of the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    pub product_cache_ttl: Duration,
    /// Order creations per buyer, and per IP for web orders, per minute.
    pub order_rate_limit: u32,
    /// Accepted underpayment, as a fraction of the expected amount.
    pub payment_tolerance: Decimal,
    pub invoice_max_attempts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let policy = PaymentPolicy::default();
        Self {
            host: DEFAULT_VPG_HOST.to_string(),
            port: DEFAULT_VPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            admin_token: Secret::default(),
            ipn_secret: Secret::default(),
            nowpayments: NowPaymentsConfig::default(),
            telegram: TelegramConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            product_cache_ttl: DEFAULT_PRODUCT_CACHE_TTL,
            order_rate_limit: ORDER_CREATION_LIMIT,
            payment_tolerance: policy.tolerance,
            invoice_max_attempts: DEFAULT_INVOICE_MAX_ATTEMPTS,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("VPG_HOST").ok().unwrap_or_else(|| DEFAULT_VPG_HOST.into());
        let port = parse_env_value("VPG_PORT", env::var("VPG_PORT").ok(), DEFAULT_VPG_PORT);
        let database_url = env::var("VPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ VPG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let admin_token = Secret::new(env::var("VPG_ADMIN_TOKEN").ok().unwrap_or_else(|| {
            error!("🪛️ VPG_ADMIN_TOKEN is not set. All requests to the admin routes will be refused.");
            String::default()
        }));
        let ipn_secret = Secret::new(env::var("VPG_NOWPAYMENTS_IPN_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ VPG_NOWPAYMENTS_IPN_SECRET is not set. All payment callbacks will be refused.");
            String::default()
        }));
        let nowpayments = NowPaymentsConfig::new_from_env_or_default();
        let telegram = TelegramConfig::from_env_or_default();
        let use_x_forwarded_for = parse_boolean_flag(env::var("VPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("VPG_USE_FORWARDED").ok(), false);
        let cache_ttl = env::var("VPG_PRODUCT_CACHE_TTL").ok();
        let product_cache_ttl = parse_env_seconds("VPG_PRODUCT_CACHE_TTL", cache_ttl, defaults.product_cache_ttl);
        let order_rate_limit =
            parse_env_value("VPG_ORDER_RATE_LIMIT", env::var("VPG_ORDER_RATE_LIMIT").ok(), defaults.order_rate_limit);
        let payment_tolerance = parse_tolerance(env::var("VPG_PAYMENT_TOLERANCE").ok(), defaults.payment_tolerance);
        let invoice_max_attempts = parse_env_value(
            "VPG_INVOICE_MAX_ATTEMPTS",
            env::var("VPG_INVOICE_MAX_ATTEMPTS").ok(),
            defaults.invoice_max_attempts,
        )
        .max(1);
        Self {
            host,
            port,
            database_url,
            admin_token,
            ipn_secret,
            nowpayments,
            telegram,
            use_x_forwarded_for,
            use_forwarded,
            product_cache_ttl,
            order_rate_limit,
            payment_tolerance,
            invoice_max_attempts,
        }
    }

    /// The ledger's payment policy. The invoice timeout is shared with the NOWPayments HTTP client.
    pub fn payment_policy(&self) -> PaymentPolicy {
        PaymentPolicy {
            tolerance: self.payment_tolerance,
            invoice_timeout: self.nowpayments.timeout,
            invoice_attempts: self.invoice_max_attempts,
            ..PaymentPolicy::default()
        }
    }
}

fn parse_env_value<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match value {
        None => {
            info!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}

fn parse_env_seconds(name: &str, value: Option<String>, default: Duration) -> Duration {
    let secs = parse_env_value(name, value, default.as_secs());
    Duration::from_secs(secs)
}

/// The tolerance is a fraction. Anything outside `[0, 1)` is rejected.
fn parse_tolerance(value: Option<String>, default: Decimal) -> Decimal {
    let tolerance = parse_env_value("VPG_PAYMENT_TOLERANCE", value, default);
    if tolerance.is_sign_negative() || tolerance >= Decimal::ONE {
        warn!("🪛️ VPG_PAYMENT_TOLERANCE must be at least 0 and less than 1, not {tolerance}. Using {default}.");
        return default;
    }
    tolerance
}

//-------------------------------------------------  TelegramConfig  ---------------------------------------------------
#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: Secret<String>,
    /// Admin notifications go here. Without it, only buyers are notified.
    pub admin_chat_id: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_TELEGRAM_API_URL.to_string(), bot_token: Secret::default(), admin_chat_id: None }
    }
}

impl TelegramConfig {
    pub fn from_env_or_default() -> Self {
        let bot_token = Secret::new(env::var("VPG_TELEGRAM_BOT_TOKEN").ok().unwrap_or_else(|| {
            warn!("🪛️ VPG_TELEGRAM_BOT_TOKEN is not set. Telegram notifications are disabled.");
            String::default()
        }));
        let admin_chat_id = env::var("VPG_TELEGRAM_ADMIN_CHAT_ID").ok().filter(|s| !s.trim().is_empty());
        if admin_chat_id.is_none() && !bot_token.is_empty() {
            warn!("🪛️ VPG_TELEGRAM_ADMIN_CHAT_ID is not set. Admin notifications will not be sent.");
        }
        Self { bot_token, admin_chat_id, ..Default::default() }
    }

    pub fn is_enabled(&self) -> bool {
        !self.bot_token.is_empty()
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that route handlers need. Keep this small, and keep secrets out of it.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
