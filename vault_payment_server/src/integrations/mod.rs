//! Adapters between the engine and the outside world.
//!
//! * [`nowpayments`] implements the engine's `InvoiceProcessor` on top of the NOWPayments REST client.
//! * [`telegram`] turns ledger events into Telegram messages for the admin chat and for bot buyers.
pub mod nowpayments;
pub mod telegram;
