//! Bearer token management for the ShipHero API.
//!
//! ShipHero issues long-lived refresh tokens; API calls require a
//! short-lived bearer token obtained from the auth endpoint. The manager
//! caches the bearer token and refreshes it proactively shortly before the
//! reported expiry, so steady-state requests pay no auth round-trip.

use crate::error::ShipHeroError;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Refresh the bearer token this long before its reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// ShipHero API credentials: a long-lived refresh token
#[derive(Clone)]
pub struct Credentials {
    refresh_token: String,
}

impl Credentials {
    /// Create credentials from a refresh token
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
        }
    }

    pub(crate) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

// The refresh token must never leak into logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Response from the token refresh endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Caches bearer tokens and refreshes them on demand
pub(crate) struct TokenManager {
    credentials: Credentials,
    auth_url: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub(crate) fn new(credentials: Credentials, auth_url: String, http: reqwest::Client) -> Self {
        Self {
            credentials,
            auth_url,
            http,
            cached: Mutex::new(None),
        }
    }

    /// Current bearer token, refreshing it first when missing or stale
    pub(crate) async fn bearer(&self) -> Result<String, ShipHeroError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.access_token.clone());
            }
            debug!("Bearer token stale; refreshing");
        }

        let token = self.refresh().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Discard the cached token and fetch a new one.
    ///
    /// Used after an unexpected 401: the server has invalidated the token
    /// ahead of its reported expiry.
    pub(crate) async fn force_refresh(&self) -> Result<String, ShipHeroError> {
        let mut cached = self.cached.lock().await;
        let token = self.refresh().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn refresh(&self) -> Result<CachedToken, ShipHeroError> {
        let response = self
            .http
            .post(&self.auth_url)
            .json(&serde_json::json!({
                "refresh_token": self.credentials.refresh_token(),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShipHeroError::Auth {
                message: format!("token refresh failed: {} {}", status.as_u16(), body),
            });
        }

        let token: TokenResponse = response.json().await?;
        let expires_at =
            Utc::now() + Duration::seconds((token.expires_in - EXPIRY_MARGIN_SECS).max(0));

        info!(expires_at = %expires_at, "Bearer token refreshed");
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at,
        })
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("auth_url", &self.auth_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
