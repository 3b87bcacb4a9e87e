use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use vault_payment_engine::{Invoice, InvoiceError, InvoiceProcessor, InvoiceRequest};
use vpg_common::Amount;

/// A scriptable stand-in for the payment processor.
///
/// By default every request succeeds and the invoice quotes the order total in the order currency. Queue up
/// failures with [`FakeProcessor::fail_next`], or a different quote with [`FakeProcessor::quote`].
#[derive(Clone, Default)]
pub struct FakeProcessor {
    requests: Arc<Mutex<Vec<InvoiceRequest>>>,
    failures: Arc<Mutex<VecDeque<InvoiceError>>>,
    quote: Arc<Mutex<Option<(Amount, String)>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    invoice_id: Arc<Mutex<Option<String>>>,
}

impl FakeProcessor {
    pub fn fail_next(&self, error: InvoiceError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn quote(&self, amount: &str, currency: &str) {
        *self.quote.lock().unwrap() = Some((amount.parse().unwrap(), currency.to_string()));
    }

    pub fn respond_after(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Every invoice from now on carries this id, as a misbehaving processor might do.
    pub fn reuse_invoice_id(&self, invoice_id: &str) {
        *self.invoice_id.lock().unwrap() = Some(invoice_id.to_string());
    }

    pub fn requests(&self) -> Vec<InvoiceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl InvoiceProcessor for FakeProcessor {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, InvoiceError> {
        self.requests.lock().unwrap().push(request.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.lock().unwrap().pop_front();
        if let Some(e) = failure {
            return Err(e);
        }
        let (expected_amount, expected_currency) =
            self.quote.lock().unwrap().clone().unwrap_or_else(|| (request.amount, request.currency.clone()));
        let invoice_id =
            self.invoice_id.lock().unwrap().clone().unwrap_or_else(|| format!("inv-{}", request.order_code));
        Ok(Invoice {
            invoice_id,
            payment_url: format!("https://pay.example.com/?iid=inv-{}", request.order_code),
            expected_amount,
            expected_currency,
        })
    }
}
