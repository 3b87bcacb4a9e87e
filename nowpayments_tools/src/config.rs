use std::time::Duration;

use log::*;
use vpg_common::Secret;

pub const DEFAULT_NOWPAYMENTS_API_URL: &str = "https://api.nowpayments.io";
pub const DEFAULT_INVOICE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct NowPaymentsConfig {
    /// Base URL, without the `/v1` suffix.
    pub api_url: String,
    pub api_key: Secret<String>,
    /// Where NOWPayments should POST payment callbacks. If unset, the dashboard default applies.
    pub ipn_callback_url: Option<String>,
    pub timeout: Duration,
}

impl Default for NowPaymentsConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_NOWPAYMENTS_API_URL.to_string(),
            api_key: Secret::default(),
            ipn_callback_url: None,
            timeout: DEFAULT_INVOICE_TIMEOUT,
        }
    }
}

impl NowPaymentsConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("VPG_NOWPAYMENTS_API_URL").unwrap_or_else(|_| {
            info!("🪛️ VPG_NOWPAYMENTS_API_URL not set, using {DEFAULT_NOWPAYMENTS_API_URL}");
            DEFAULT_NOWPAYMENTS_API_URL.to_string()
        });
        let api_key = Secret::new(std::env::var("VPG_NOWPAYMENTS_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ VPG_NOWPAYMENTS_API_KEY not set. Invoice requests will be refused by NOWPayments.");
            String::default()
        }));
        let ipn_callback_url = std::env::var("VPG_IPN_CALLBACK_URL").ok().filter(|s| !s.trim().is_empty());
        if ipn_callback_url.is_none() {
            warn!("🪛️ VPG_IPN_CALLBACK_URL not set. NOWPayments will use the callback URL from your dashboard.");
        }
        let timeout = std::env::var("VPG_INVOICE_TIMEOUT")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid VPG_INVOICE_TIMEOUT ({s}). {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_INVOICE_TIMEOUT);
        Self { api_url: api_url.trim_end_matches('/').to_string(), api_key, ipn_callback_url, timeout }
    }
}
