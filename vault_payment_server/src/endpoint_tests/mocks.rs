use mockall::mock;
use vault_payment_engine::{Invoice, InvoiceError, InvoiceProcessor, InvoiceRequest};

mock! {
    pub Processor {}
    impl InvoiceProcessor for Processor {
        async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, InvoiceError>;
    }
}

/// A processor that issues an invoice for every request. The invoice id is derived from the order code.
pub fn invoicing_processor() -> MockProcessor {
    let mut processor = MockProcessor::new();
    processor.expect_create_invoice().returning(|req| Ok(invoice_for(req)));
    processor
}

pub fn invoice_for(req: &InvoiceRequest) -> Invoice {
    Invoice {
        invoice_id: format!("inv-{}", req.order_code),
        payment_url: format!("https://pay.example/invoice/{}", req.order_code),
        expected_amount: req.amount,
        expected_currency: req.currency.clone(),
    }
}
