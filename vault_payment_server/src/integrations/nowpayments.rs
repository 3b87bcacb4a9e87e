use log::*;
use nowpayments_tools::{InvoiceResponse, NewInvoice, NowPaymentsApi, NowPaymentsApiError, NowPaymentsConfig};
use vault_payment_engine::{Invoice, InvoiceError, InvoiceProcessor, InvoiceRequest};

/// NOWPayments as the ledger's invoice processor.
///
/// The order code is sent both as the invoice's `order_id` and as the `Idempotency-Key`, so a retried request for the
/// same order cannot open a second invoice.
#[derive(Clone)]
pub struct NowPaymentsProcessor {
    api: NowPaymentsApi,
}

impl NowPaymentsProcessor {
    pub fn new(config: NowPaymentsConfig) -> Result<Self, NowPaymentsApiError> {
        let api = NowPaymentsApi::new(config)?;
        Ok(Self { api })
    }

    pub fn api(&self) -> &NowPaymentsApi {
        &self.api
    }
}

impl InvoiceProcessor for NowPaymentsProcessor {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, InvoiceError> {
        let code = request.order_code.as_str();
        let invoice = NewInvoice::new(code, request.amount, &request.currency)
            .with_description(request.description.clone())
            .with_pay_currency(request.pay_currency.as_deref())
            .with_callback_url(self.api.config().ipn_callback_url.as_deref());
        let response = self.api.create_invoice(&invoice, code).await.map_err(|e| {
            warn!("💳️ NOWPayments could not create an invoice for {code}. {e}");
            to_invoice_error(e)
        })?;
        Ok(invoice_from_response(response))
    }
}

fn to_invoice_error(e: NowPaymentsApiError) -> InvoiceError {
    if e.is_transient() {
        InvoiceError::ProcessorUnavailable(e.to_string())
    } else {
        InvoiceError::Rejected(e.to_string())
    }
}

/// Hosted-checkout invoices are priced in the order currency. The coin and the amount in that coin are only fixed
/// once the buyer picks them on the checkout page.
fn invoice_from_response(response: InvoiceResponse) -> Invoice {
    Invoice {
        invoice_id: response.id,
        payment_url: response.invoice_url,
        expected_amount: response.price_amount,
        expected_currency: response.price_currency.to_uppercase(),
    }
}
