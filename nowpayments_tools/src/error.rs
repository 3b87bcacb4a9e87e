use thiserror::Error;

#[derive(Debug, Error)]
pub enum NowPaymentsApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach NOWPayments: {0}")]
    RestResponseError(String),
    #[error("NOWPayments did not answer in time")]
    Timeout,
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl NowPaymentsApiError {
    /// True when the same request might succeed if sent again: network trouble, timeouts, throttling and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RestResponseError(_) | Self::Timeout => true,
            Self::QueryError { status, .. } => *status >= 500 || *status == 429,
            Self::Initialization(_) | Self::JsonError(_) => false,
        }
    }
}
