use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::*;
use thiserror::Error;
use vault_payment_engine::{CallbackError, CatalogApiError, OrderFlowError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Authentication failed. {0}")]
    Unauthorized(String),
    #[error("Forbidden. {0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Too many requests. Try again in a minute.")]
    RateLimited,
    #[error("{0}")]
    PaymentInitFailed(String),
    #[error("Service temporarily unavailable. {0}")]
    ServiceUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::PaymentInitFailed(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::ProductNotFound(_) | OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::InvalidQuantity | OrderFlowError::InvalidDeliveryDetails(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            OrderFlowError::Forbidden(_) => Self::Forbidden(e.to_string()),
            OrderFlowError::NotCancellable { .. } | OrderFlowError::InvalidTransition { .. } => {
                Self::Conflict(e.to_string())
            },
            OrderFlowError::RateLimited => Self::RateLimited,
            OrderFlowError::PaymentInitFailed(_) => Self::PaymentInitFailed(e.to_string()),
            OrderFlowError::CatalogUnavailable(_) => Self::ServiceUnavailable(e.to_string()),
            OrderFlowError::StoreError(e) => {
                error!("💻️ Order store failure. {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<CatalogApiError> for ServerError {
    fn from(e: CatalogApiError) -> Self {
        match e {
            CatalogApiError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            CatalogApiError::InvalidProduct(_) => Self::InvalidRequestBody(e.to_string()),
            CatalogApiError::CatalogUnavailable(_) => Self::ServiceUnavailable(e.to_string()),
            CatalogApiError::StoreError(e) => {
                error!("💻️ Product store failure. {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<CallbackError> for ServerError {
    fn from(e: CallbackError) -> Self {
        match e {
            CallbackError::AuthenticationFailed => Self::Unauthorized(e.to_string()),
            CallbackError::MalformedPayload(_) => Self::InvalidRequestBody(e.to_string()),
        }
    }
}
