// web-server/src/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use common::{AuthError, ErrorResponse, PaymentError};
use thiserror::Error;

use crate::store::StoreError;

/// Error returned by services and handlers. Each variant maps to a stable `kind`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("payment required to access the app")]
    PaymentRequired,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("service misconfigured: {0}")]
    Configuration(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Auth(e) => e.kind(),
            ServiceError::Payment(e) => e.kind(),
            ServiceError::PaymentRequired => "PaymentRequired",
            ServiceError::InvalidRequest(_) => "InvalidRequest",
            ServiceError::Configuration(_) => "ConfigurationError",
            ServiceError::Store(_) | ServiceError::Internal(_) => "Internal",
        }
    }

    /// Message safe to show to clients
    fn public_message(&self) -> String {
        match self {
            ServiceError::Auth(e) => e.to_string(),
            ServiceError::Payment(e) => e.to_string(),
            ServiceError::PaymentRequired => self.to_string(),
            ServiceError::InvalidRequest(_) => "Invalid request data".to_string(),
            ServiceError::Configuration(_) => "Service is not configured properly".to_string(),
            ServiceError::Store(_) | ServiceError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Auth(AuthError::InvalidAddress) | ServiceError::Auth(AuthError::NoNonce) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Auth(AuthError::SignatureInvalid) | ServiceError::Auth(AuthError::Unauthorized) => {
                StatusCode::UNAUTHORIZED
            }
            ServiceError::Payment(PaymentError::PayerMismatch) => StatusCode::FORBIDDEN,
            ServiceError::Payment(PaymentError::UpstreamUnavailable) => StatusCode::BAD_GATEWAY,
            ServiceError::Payment(_) => StatusCode::BAD_REQUEST,
            ServiceError::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Configuration(_) | ServiceError::Store(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: self.public_message(),
            kind: self.kind().to_string(),
        })
    }
}
