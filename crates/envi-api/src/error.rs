//! Envi API errors

use thiserror::Error;

/// Errors returned by [`crate::EnviClient`] operations
#[derive(Debug, Error)]
pub enum EnviApiError {
    /// The cloud rejected the credentials. Only produced by authentication.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// An endpoint that needs a token was called before a token was obtained
    #[error("No access token available")]
    MissingToken,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl EnviApiError {
    /// Whether this error is the authentication-specific failure
    pub fn is_auth_error(&self) -> bool {
        matches!(self, EnviApiError::Authentication(_))
    }
}

pub type EnviResult<T> = Result<T, EnviApiError>;
