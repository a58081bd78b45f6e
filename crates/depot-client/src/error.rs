//! # Client Error Types
//!
//! Error types for backend calls and return submission.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Backend             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Network        │  │  Backend{status, msg}   │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  Decode                 │ │
//! │  │  ConfigLoad/Save│  │  Cancelled      │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Core (depot-core): validation, session lock, kit anomalies     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use depot_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Client error type covering all possible backend and submit failures.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// Session or validation error from depot-core. Never reaches the network.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid client configuration.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// Invalid backend URL.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The backend could not be reached.
    ///
    /// `dispatched` is set when the failing call was SubmitReturn, so the
    /// return may or may not have been applied.
    #[error("Network error: {message}")]
    Network { message: String, dispatched: bool },

    /// A backend call took longer than the configured timeout.
    #[error("{operation} timed out after {secs} seconds")]
    Timeout {
        operation: String,
        secs: u64,
        dispatched: bool,
    },

    /// The keeper cancelled the submit.
    ///
    /// ## When This Occurs
    /// ```text
    /// submit() ──► upload photo ──► POST returns ──► response
    ///                  │                  │
    ///              cancel here        cancel here
    ///          dispatched = false   dispatched = true
    ///                                     │
    ///                                     ▼
    ///                    return may have been applied: refresh holdings
    /// ```
    #[error("Submit cancelled{}", cancelled_hint(.dispatched))]
    Cancelled { dispatched: bool },

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// The backend answered with a non-success status.
    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    /// The backend response could not be decoded.
    #[error("Invalid backend response: {0}")]
    Decode(String),
}

fn cancelled_hint(dispatched: &bool) -> &'static str {
    if *dispatched {
        " after the return was sent; refresh holdings to confirm"
    } else {
        ""
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        ClientError::Core(CoreError::Validation(err))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl ClientError {
    /// Returns true if the operation can be retried as is.
    ///
    /// ## Retryable Errors
    /// - Network failures
    /// - Timeouts
    ///
    /// ## Non-Retryable Errors
    /// - Validation and session errors (input must change first)
    /// - Backend rejections and undecodable responses
    /// - Cancellation
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network { .. } | ClientError::Timeout { .. })
    }

    /// Transport failure before anything that changes holdings was sent.
    pub fn network(message: impl Into<String>) -> Self {
        ClientError::Network {
            message: message.into(),
            dispatched: false,
        }
    }

    /// Marks a transport failure as raised by the SubmitReturn call.
    pub(crate) fn after_dispatch(self) -> Self {
        match self {
            ClientError::Network { message, .. } => ClientError::Network {
                message,
                dispatched: true,
            },
            ClientError::Timeout { operation, secs, .. } => ClientError::Timeout {
                operation,
                secs,
                dispatched: true,
            },
            other => other,
        }
    }

    /// Returns the validation error, if this is one.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            ClientError::Core(CoreError::Validation(err)) => Some(err),
            _ => None,
        }
    }

    /// True when a submit may have reached the backend before failing.
    pub fn may_have_applied(&self) -> bool {
        matches!(
            self,
            ClientError::Cancelled { dispatched: true }
                | ClientError::Timeout { dispatched: true, .. }
                | ClientError::Network { dispatched: true, .. }
        )
    }
}
