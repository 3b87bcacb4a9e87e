//! # Vault payment server
//! This crate hosts the HTTP server for the Vault payment gateway. It is responsible for:
//! * Serving the product list to the chat bot and the web store.
//! * Accepting new orders, cancellations and delivery requests from buyers, and handing them to the order ledger.
//! * Receiving payment callbacks (IPN) from NOWPayments. Callbacks are authenticated before they reach the ledger.
//! * A small, token-protected admin surface for order history, deliveries and catalog edits.
//!
//! The server carries no business rules of its own. Every decision is made in `vault_payment_engine`; the routes only
//! translate typed outcomes into HTTP responses.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: liveness check.
//! * `/products`: the cached product list.
//! * `/orders`, `/orders/{code}`, `/orders/{code}/cancel`, `/orders/{code}/delivery`: the buyer-facing order flow.
//! * `/ipn`: NOWPayments payment callbacks.
//! * `/admin/...`: admin routes. These need `Authorization: Bearer <VPG_ADMIN_TOKEN>`.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod throttling;

#[cfg(test)]
mod endpoint_tests;
