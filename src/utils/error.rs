//! Error handling for the authorization core
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for the authorization core
pub type Result<T> = std::result::Result<T, SecurityError>;

/// Main error type for the authorization core
#[derive(Error, Debug)]
pub enum SecurityError {
    /// Token string is structurally invalid. Recoverable: treat the token as
    /// absent and re-authenticate.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Key generation, signing, or DER parsing failure. Blocks enrollment,
    /// so it is always surfaced to the caller.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Secure store read/write failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// The authentication delegate or process reported a failure
    #[error("Authorization failure: {0}")]
    AuthorizationFailure(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SecurityError {
    /// Create a malformed token error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedToken(msg.into())
    }

    /// Create a crypto error
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
