use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::NowPaymentsConfig,
    data_objects::{ApiStatus, InvoiceResponse, NewInvoice},
    NowPaymentsApiError,
};

#[derive(Clone)]
pub struct NowPaymentsApi {
    config: NowPaymentsConfig,
    client: Arc<Client>,
}

impl NowPaymentsApi {
    pub fn new(config: NowPaymentsConfig) -> Result<Self, NowPaymentsApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| NowPaymentsApiError::Initialization(e.to_string()))?;
        headers.insert("x-api-key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| NowPaymentsApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &NowPaymentsConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url)
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        headers: &[(&'static str, &str)],
        body: Option<B>,
    ) -> Result<T, NowPaymentsApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                NowPaymentsApiError::Timeout
            } else {
                NowPaymentsApiError::RestResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| NowPaymentsApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message =
                response.text().await.map_err(|e| NowPaymentsApiError::RestResponseError(e.to_string()))?;
            Err(NowPaymentsApiError::QueryError { status, message })
        }
    }

    /// Creates a hosted-checkout invoice.
    ///
    /// `idempotency_key` is sent as the `Idempotency-Key` header. Send the same key when retrying a request whose
    /// response was lost, so a retry cannot open a second invoice.
    pub async fn create_invoice(
        &self,
        invoice: &NewInvoice,
        idempotency_key: &str,
    ) -> Result<InvoiceResponse, NowPaymentsApiError> {
        debug!("Creating invoice for order {} ({} {})", invoice.order_id, invoice.price_amount, invoice.price_currency);
        let headers = [("Idempotency-Key", idempotency_key)];
        let result =
            self.rest_query::<InvoiceResponse, &NewInvoice>(Method::POST, "/invoice", &headers, Some(invoice)).await?;
        info!("Invoice {} created for order {}", result.id, invoice.order_id);
        Ok(result)
    }

    /// Checks that the API is up. Does not need a valid API key.
    pub async fn api_status(&self) -> Result<ApiStatus, NowPaymentsApiError> {
        self.rest_query::<ApiStatus, ()>(Method::GET, "/status", &[], None).await
    }
}
