//! Shared primitives for all Rust crates in Celoris.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use thiserror::Error;

pub use auth::{Identity, MetadataMap};

/// Result type used across Celoris crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Credential, validation or session failure reported by the auth service.
    #[error("auth error: {0}")]
    Auth(String),

    /// Requested resource does not exist. Expected and non-fatal.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network or service outage. Never retried automatically.
    #[error("transient error: {0}")]
    Transient(String),

    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the message carried by the error, suitable for display.
    ///
    /// The reason is surfaced verbatim and never parsed for control flow.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Auth(reason)
            | Self::NotFound(reason)
            | Self::Transient(reason)
            | Self::Validation(reason)
            | Self::Internal(reason) => reason.as_str(),
        }
    }

    /// Returns whether this is the expected not-found condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns whether this error stems from a network or service outage.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
