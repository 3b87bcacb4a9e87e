//! # Processor callbacks (IPN)
//!
//! The processor reports payment progress by POSTing JSON to the server. Those requests are untrusted until their
//! signature checks out: anyone can reach the endpoint, and the source IP proves nothing.
//!
//! [`CallbackVerifier::verify`] authenticates the raw body first and only then parses it. The parsed callback carries
//! no guarantee of uniqueness. The processor retries and repeats itself, and the ledger is what makes repeated
//! confirmations harmless.
//!
//! A callback body looks like this (abridged):
//! ```json
//! {
//!   "payment_id": 5077125051,
//!   "invoice_id": 4522625843,
//!   "payment_status": "finished",
//!   "pay_amount": 0.00084,
//!   "actually_paid": 0.00084,
//!   "pay_currency": "btc",
//!   "price_amount": 50,
//!   "price_currency": "usd",
//!   "order_id": "W-7QK2ZP-160626"
//! }
//! ```
//! Ids and amounts may arrive as JSON numbers or as strings.
use std::fmt::Display;

use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use vpg_common::{Amount, Secret};

use crate::{db_types::OrderCode, helpers::verify_ipn_signature};

pub const IPN_SIGNATURE_HEADER: &str = "x-nowpayments-sig";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("Callback signature is missing or invalid")]
    AuthenticationFailed,
    #[error("Malformed callback payload. {0}")]
    MalformedPayload(String),
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Waiting,
    Confirming,
    Confirmed,
    Sending,
    PartiallyPaid,
    Finished,
    Failed,
    Refunded,
    Expired,
    /// A status this version does not know about.
    Other(String),
}

impl PaymentStatus {
    /// Only these statuses carry money the ledger should act on.
    pub fn is_actionable(&self) -> bool {
        matches!(self, PaymentStatus::Finished | PaymentStatus::PartiallyPaid)
    }
}

impl From<&str> for PaymentStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "waiting" => Self::Waiting,
            "confirming" => Self::Confirming,
            "confirmed" => Self::Confirmed,
            "sending" => Self::Sending,
            "partially_paid" => Self::PartiallyPaid,
            "finished" => Self::Finished,
            "failed" => Self::Failed,
            "refunded" => Self::Refunded,
            "expired" => Self::Expired,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Waiting => write!(f, "waiting"),
            PaymentStatus::Confirming => write!(f, "confirming"),
            PaymentStatus::Confirmed => write!(f, "confirmed"),
            PaymentStatus::Sending => write!(f, "sending"),
            PaymentStatus::PartiallyPaid => write!(f, "partially_paid"),
            PaymentStatus::Finished => write!(f, "finished"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Refunded => write!(f, "refunded"),
            PaymentStatus::Expired => write!(f, "expired"),
            PaymentStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

//--------------------------------------    ParsedCallback     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCallback {
    pub invoice_id: String,
    pub payment_status: PaymentStatus,
    /// `actually_paid`, or `pay_amount` when nothing more specific was sent.
    pub amount: Amount,
    pub currency: String,
    /// The order code we sent with the invoice, if it was echoed back.
    pub order_code: Option<OrderCode>,
    /// `price_amount × amount / pay_amount`, i.e. what was received, expressed in the invoice's price currency.
    pub fiat_amount: Option<Amount>,
    pub fiat_currency: Option<String>,
}

impl ParsedCallback {
    /// The amount and currency to hand to the ledger. The fiat equivalent is preferred when the processor sent one,
    /// since it can be compared with the order total regardless of the coin the buyer ended up paying with.
    pub fn confirmed_amount(&self) -> (Amount, &str) {
        match (&self.fiat_amount, &self.fiat_currency) {
            (Some(amount), Some(currency)) => (*amount, currency.as_str()),
            _ => (self.amount, self.currency.as_str()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCallback {
    invoice_id: Option<Value>,
    payment_id: Option<Value>,
    payment_status: Option<String>,
    actually_paid: Option<Value>,
    pay_amount: Option<Value>,
    pay_currency: Option<String>,
    price_amount: Option<Value>,
    price_currency: Option<String>,
    order_id: Option<String>,
}

/// JSON null, zero-length strings and absent fields all mean "not sent".
fn value_to_string(value: &Option<Value>) -> Option<String> {
    match value.as_ref()? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_amount(field: &str, value: &Option<Value>) -> Result<Option<Amount>, CallbackError> {
    value_to_string(value)
        .map(|s| s.parse::<Amount>().map_err(|e| CallbackError::MalformedPayload(format!("{field}: {e}"))))
        .transpose()
}

fn parse_callback(raw: &[u8]) -> Result<ParsedCallback, CallbackError> {
    let cb = serde_json::from_slice::<RawCallback>(raw).map_err(|e| CallbackError::MalformedPayload(e.to_string()))?;
    let invoice_id = value_to_string(&cb.invoice_id)
        .or_else(|| value_to_string(&cb.payment_id))
        .ok_or_else(|| CallbackError::MalformedPayload("Neither invoice_id nor payment_id was provided".into()))?;
    let payment_status = cb
        .payment_status
        .as_deref()
        .map(PaymentStatus::from)
        .ok_or_else(|| CallbackError::MalformedPayload("payment_status is missing".into()))?;
    let actually_paid = value_to_amount("actually_paid", &cb.actually_paid)?;
    let pay_amount = value_to_amount("pay_amount", &cb.pay_amount)?;
    let amount = actually_paid
        .or(pay_amount)
        .ok_or_else(|| CallbackError::MalformedPayload("Neither actually_paid nor pay_amount was provided".into()))?;
    let currency = cb
        .pay_currency
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| CallbackError::MalformedPayload("pay_currency is missing".into()))?;
    let price_amount = value_to_amount("price_amount", &cb.price_amount)?;
    let fiat_currency = cb.price_currency.filter(|c| !c.trim().is_empty());
    let fiat_amount = match (price_amount, pay_amount, &fiat_currency) {
        (Some(price), Some(quoted), Some(_)) => price.pro_rata(amount, quoted),
        _ => None,
    };
    let order_code = cb.order_id.and_then(|s| s.parse::<OrderCode>().ok());
    Ok(ParsedCallback {
        invoice_id,
        payment_status,
        amount,
        currency: currency.trim().to_string(),
        order_code,
        fiat_currency: fiat_amount.and(fiat_currency),
        fiat_amount,
    })
}

//--------------------------------------   CallbackVerifier    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct CallbackVerifier {
    secret: Secret<String>,
}

impl CallbackVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    /// Authenticates `raw_payload` against the signature header and, only if it is genuine, parses it.
    ///
    /// With no IPN secret configured every callback is rejected.
    pub fn verify(&self, raw_payload: &[u8], signature: Option<&str>) -> Result<ParsedCallback, CallbackError> {
        if self.secret.is_empty() {
            error!("🔐️ No IPN secret is configured. All payment callbacks will be rejected.");
            return Err(CallbackError::AuthenticationFailed);
        }
        let Some(signature) = signature else {
            warn!("🔐️ Payment callback arrived without a signature. Rejected.");
            return Err(CallbackError::AuthenticationFailed);
        };
        if !verify_ipn_signature(self.secret.reveal(), raw_payload, signature) {
            warn!("🔐️ Payment callback carried an invalid signature. Rejected.");
            return Err(CallbackError::AuthenticationFailed);
        }
        trace!("🔐️ Payment callback signature ✅️");
        parse_callback(raw_payload)
    }
}
