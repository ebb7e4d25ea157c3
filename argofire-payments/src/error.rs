//! Error types for gateway processing

use crate::types::PaymentStatus;
use thiserror::Error;

/// Shown to the customer when the gateway gave us nothing better.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Your payment could not be processed. Please check your card details and try again.";

/// Payment error types
#[derive(Error, Debug)]
pub enum PaymentError {
    /// No usable HTTP response from the gateway
    #[error("Transport error: {0}")]
    Transport(String),

    /// Gateway returned a non-zero result code
    #[error("Declined ({code}): {message}")]
    Declined { code: i64, message: String },

    /// Approved by the gateway but rejected by the AVS check
    #[error("AVS Failed: {0}")]
    AvsFailed(String),

    /// Caller did not supply what processing requires
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Gateway body could not be decoded
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failure taxonomy surfaced to the checkout orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    TransportError,
    GatewayDeclined,
    AvsFailed,
    PreconditionViolation,
    StorageError,
}

impl PaymentError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::TransportError,
            Self::Declined { .. } => FailureKind::GatewayDeclined,
            Self::AvsFailed(_) => FailureKind::AvsFailed,
            Self::Precondition(_)
            | Self::MalformedResponse(_)
            | Self::InvalidTransition { .. }
            | Self::Config(_)
            | Self::Serialization(_) => FailureKind::PreconditionViolation,
            Self::PaymentNotFound(_) | Self::Storage(_) => FailureKind::StorageError,
        }
    }

    /// Text safe to show the customer. Gateway messages pass through
    /// verbatim; everything else collapses to a generic notice.
    pub fn user_message(&self) -> String {
        match self {
            Self::Declined { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::AvsFailed(_) => self.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        PaymentError::Transport(format!("{}: {}", reason, err))
    }
}

impl From<quick_xml::Error> for PaymentError {
    fn from(err: quick_xml::Error) -> Self {
        PaymentError::MalformedResponse(err.to_string())
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

impl From<argofire_config::ConfigError> for PaymentError {
    fn from(err: argofire_config::ConfigError) -> Self {
        PaymentError::Config(err.to_string())
    }
}

/// Result type for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
