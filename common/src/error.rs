// common/src/error.rs
use thiserror::Error;

/// Startup configuration failures. Any of these aborts the process.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failures of the wallet sign-in protocol and session checks
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid wallet address")]
    InvalidAddress,

    #[error("no nonce found, request a nonce first")]
    NoNonce,

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("unauthorized, connect your wallet")]
    Unauthorized,
}

impl AuthError {
    /// Stable identifier exposed to API clients
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidAddress => "InvalidAddress",
            AuthError::NoNonce => "NoNonce",
            AuthError::SignatureInvalid => "SignatureInvalid",
            AuthError::Unauthorized => "Unauthorized",
        }
    }
}

/// Failures of on-chain payment verification
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("invalid transaction hash")]
    InvalidTxHash,

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("transaction failed")]
    TransactionFailed,

    #[error("transaction not sent to payment contract")]
    WrongDestination,

    #[error("transaction payer does not match authenticated user")]
    PayerMismatch,

    #[error("payment event missing from transaction: {0}")]
    PaymentEventMissing(String),

    #[error("payment amount {paid} is below the required {required}")]
    InsufficientAmount { paid: String, required: String },

    #[error("blockchain node unavailable")]
    UpstreamUnavailable,
}

impl PaymentError {
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentError::InvalidTxHash => "InvalidTxHash",
            PaymentError::TransactionNotFound => "TransactionNotFound",
            PaymentError::TransactionFailed => "TransactionFailed",
            PaymentError::WrongDestination => "WrongDestination",
            PaymentError::PayerMismatch => "PayerMismatch",
            PaymentError::PaymentEventMissing(_) => "PaymentEventMissing",
            PaymentError::InsufficientAmount { .. } => "InsufficientAmount",
            PaymentError::UpstreamUnavailable => "UpstreamUnavailable",
        }
    }

    /// Whether this outcome is persisted as a FAILED payment row
    pub fn is_recorded(&self) -> bool {
        matches!(
            self,
            PaymentError::TransactionNotFound
                | PaymentError::TransactionFailed
                | PaymentError::WrongDestination
                | PaymentError::PaymentEventMissing(_)
                | PaymentError::InsufficientAmount { .. }
        )
    }
}
