//! GraphQL transport for the ShipHero public API.

use crate::auth::{Credentials, TokenManager};
use crate::error::ShipHeroError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Configuration for the ShipHero API client
///
/// # Examples
///
/// ```rust
/// use shiphero_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default().with_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// GraphQL endpoint
    pub api_url: String,
    /// Token refresh endpoint
    pub auth_url: String,
    /// User agent string for API requests
    pub user_agent: String,
    /// Request timeout duration
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://public-api.shiphero.com/graphql".to_string(),
            auth_url: "https://public-api.shiphero.com/auth/refresh".to_string(),
            user_agent: "stock-ledger/0.1.0".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Set the GraphQL endpoint
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the token refresh endpoint
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Authenticated client for the ShipHero GraphQL API.
///
/// Cheap to clone is *not* a goal here; share it behind an `Arc` so all
/// callers reuse one bearer-token cache.
pub struct ShipHeroClient {
    http: reqwest::Client,
    tokens: TokenManager,
    api_url: String,
}

impl ShipHeroClient {
    /// Create a client against the production ShipHero endpoints
    pub fn new(credentials: Credentials) -> Result<Self, ShipHeroError> {
        Self::with_config(credentials, ClientConfig::default())
    }

    /// Create a client with explicit endpoint configuration
    pub fn with_config(
        credentials: Credentials,
        config: ClientConfig,
    ) -> Result<Self, ShipHeroError> {
        for url in [&config.api_url, &config.auth_url] {
            Url::parse(url).map_err(|_| ShipHeroError::InvalidUrl { url: url.clone() })?;
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;

        let tokens = TokenManager::new(credentials, config.auth_url.clone(), http.clone());

        Ok(Self {
            http,
            tokens,
            api_url: config.api_url,
        })
    }

    /// Execute a GraphQL operation and deserialize its `data` payload.
    ///
    /// Retries exactly once on 401 after forcing a token refresh; any
    /// second 401 surfaces as an error.
    ///
    /// # Errors
    ///
    /// - [`ShipHeroError::Graphql`] when the response carries an `errors`
    ///   array (messages are joined with `"; "`)
    /// - [`ShipHeroError::Http`] for non-success statuses
    pub async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, ShipHeroError> {
        let token = self.tokens.bearer().await?;
        let mut response = self.post(&token, query, &variables).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(operation, "Bearer token rejected; refreshing and retrying once");
            let token = self.tokens.force_refresh().await?;
            response = self.post(&token, query, &variables).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShipHeroError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let envelope: GraphqlResponse<T> = response.json().await?;
        if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
            let message = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ShipHeroError::Graphql { message });
        }

        envelope.data.ok_or_else(|| ShipHeroError::MissingData {
            operation: operation.to_string(),
        })
    }

    async fn post(
        &self,
        token: &str,
        query: &str,
        variables: &Value,
    ) -> Result<reqwest::Response, ShipHeroError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "query": query,
                "variables": variables,
            }))
            .send()
            .await?;
        Ok(response)
    }
}

impl fmt::Debug for ShipHeroClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShipHeroClient")
            .field("api_url", &self.api_url)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
