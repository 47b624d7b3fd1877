//! Error types for ShipHero API operations.

use thiserror::Error;

/// Errors from the ShipHero API client
#[derive(Debug, Error)]
pub enum ShipHeroError {
    /// Token refresh was rejected or no credentials are configured
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Non-success HTTP status from the API
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// The GraphQL response carried errors instead of data
    #[error("GraphQL error: {message}")]
    Graphql { message: String },

    /// The response reported success but carried no data payload
    #[error("GraphQL response missing data for {operation}")]
    MissingData { operation: String },

    /// Network, TLS, or timeout failure in the underlying HTTP client
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body could not be decoded
    #[error("Response decoding failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// A configured endpoint URL is malformed
    #[error("Invalid endpoint URL: {url}")]
    InvalidUrl { url: String },
}

impl ShipHeroError {
    /// Check if the error is transient and worth retrying.
    ///
    /// Server errors, rate limits, and transport failures are transient;
    /// auth rejections, client errors, and malformed responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Transport(_) => true,
            Self::Auth { .. } => false,
            Self::Graphql { .. } => false,
            Self::MissingData { .. } => false,
            Self::Decode(_) => false,
            Self::InvalidUrl { .. } => false,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
