//! Telegram notifications.
//!
//! The ledger publishes events; the hooks registered here turn them into `sendMessage` calls. Admin messages go to
//! `VPG_TELEGRAM_ADMIN_CHAT_ID`. Buyers who ordered through the bot are messaged directly, since their requester id is
//! their chat id. Failures are logged and otherwise ignored.
use std::time::Duration;

use log::*;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use vault_payment_engine::{
    db_types::{Channel, Order},
    events::{EventHandlers, EventHooks},
    order_objects::DeliveryMethod,
};

use crate::config::TelegramConfig;

pub const TELEGRAM_EVENT_BUFFER_SIZE: usize = 25;
const TELEGRAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Could not initialize the Telegram client. {0}")]
    Initialization(String),
    #[error("Could not reach Telegram. {0}")]
    RequestFailed(String),
    #[error("Telegram refused the message. Error {status}. {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Clone)]
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(TELEGRAM_TIMEOUT)
            .build()
            .map_err(|e| TelegramError::Initialization(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramError> {
        // The URL carries the bot token. Never log it.
        let url = format!("{}/bot{}/sendMessage", self.config.api_url, self.config.bot_token.reveal());
        let response = self
            .client
            .post(url)
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| TelegramError::RequestFailed(e.without_url().to_string()))?;
        let status = response.status();
        if status.is_success() {
            trace!("📨️ Message delivered to chat {chat_id}");
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(TelegramError::Rejected { status: status.as_u16(), message })
        }
    }

    pub async fn notify_admin(&self, text: &str) {
        let Some(chat_id) = self.config.admin_chat_id.as_deref() else {
            debug!("📨️ No admin chat is configured. Dropping admin notification.");
            return;
        };
        if let Err(e) = self.send_message(chat_id, text).await {
            error!("📨️ Could not notify the admin chat. {e}");
        }
    }

    /// Messages the buyer, if the order came in through the bot. Web buyers poll the order status instead.
    pub async fn notify_buyer(&self, order: &Order, text: &str) {
        if order.channel != Channel::Bot {
            return;
        }
        if let Err(e) = self.send_message(&order.requester_id, text).await {
            warn!("📨️ Could not notify the buyer of order {}. {e}", order.order_code);
        }
    }
}

/// Registers the Telegram hooks for every ledger event.
pub fn create_telegram_event_handlers(config: TelegramConfig) -> Result<EventHandlers, TelegramError> {
    let mut hooks = EventHooks::default();
    let notifier = TelegramNotifier::new(config)?;
    // --- OrderCreated ---
    let n = notifier.clone();
    hooks.on_order_created(move |ev| {
        let n = n.clone();
        Box::pin(async move { n.notify_admin(&order_created_message(&ev.order)).await })
    });
    // --- OrderPaid ---
    let n = notifier.clone();
    hooks.on_order_paid(move |ev| {
        let n = n.clone();
        Box::pin(async move {
            n.notify_admin(&order_paid_message(&ev.order)).await;
            n.notify_buyer(&ev.order, &buyer_paid_message(&ev.order)).await;
        })
    });
    // --- OrderCancelled ---
    let n = notifier.clone();
    hooks.on_order_cancelled(move |ev| {
        let n = n.clone();
        Box::pin(async move {
            n.notify_admin(&format!("❌ Order {} was cancelled by the buyer.", ev.order.order_code)).await;
            n.notify_buyer(&ev.order, &format!("Your order {} has been cancelled.", ev.order.order_code)).await;
        })
    });
    // --- DeliveryRequested ---
    let n = notifier.clone();
    hooks.on_delivery_requested(move |ev| {
        let n = n.clone();
        Box::pin(async move { n.notify_admin(&delivery_message(&ev.order, ev.method, &ev.details)).await })
    });
    // --- PaymentReview ---
    let n = notifier;
    hooks.on_payment_review(move |ev| {
        let n = n.clone();
        Box::pin(async move {
            let text = format!("⚠️ Payment for order {} needs review. {}", ev.order.order_code, ev.reason);
            n.notify_admin(&text).await
        })
    });
    Ok(EventHandlers::new(TELEGRAM_EVENT_BUFFER_SIZE, hooks))
}

fn order_created_message(order: &Order) -> String {
    format!(
        "🆕 New {} order {}\n{} × {}\nTotal: {} {}",
        order.channel, order.order_code, order.quantity, order.product_name, order.total_amount, order.currency
    )
}

fn order_paid_message(order: &Order) -> String {
    format!(
        "💰 Order {} has been paid.\n{} × {}\nTotal: {} {}",
        order.order_code, order.quantity, order.product_name, order.total_amount, order.currency
    )
}

fn buyer_paid_message(order: &Order) -> String {
    format!(
        "✅ Payment received for order {}. Send us your delivery details (Telegram or email) to receive your {}.",
        order.order_code, order.product_name
    )
}

fn delivery_message(order: &Order, method: DeliveryMethod, details: &str) -> String {
    format!(
        "🚚 Delivery requested for order {} ({} × {}).\nMethod: {method}\nDetails: {details}",
        order.order_code, order.quantity, order.product_name
    )
}
