//! Client-credentials token acquisition for the directory service.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use common::{AppError, AppResult, GraphConfig};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Authorization header prefix for Bearer tokens
const BEARER_TOKEN_PREFIX: &str = "Bearer ";

/// Token response from the identity provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[allow(dead_code)]
    token_type: String,
}

/// OAuth2 error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Bearer token for outbound directory requests.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("{}{}", BEARER_TOKEN_PREFIX, self.secret)
    }

    /// Returns true if the token is expired or will expire within `skew`.
    ///
    /// A skew too large to add to the current time counts as expired.
    pub fn is_expired(&self, skew: Duration) -> bool {
        Utc::now()
            .checked_add_signed(skew)
            .map_or(true, |deadline| deadline >= self.expires_at)
    }
}

/// Source of bearer tokens for a scope set.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Acquire a token valid for `scopes`.
    async fn acquire_token(&self, scopes: &[String]) -> AppResult<AccessToken>;
}

/// Performs the client-credentials grant on every call.
pub struct ClientCredentialsProvider {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentialsProvider {
    /// Create a provider for the configured tenant and application.
    pub fn new(config: &GraphConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(http_client, config))
    }

    /// Create a provider sharing an existing HTTP client.
    pub fn with_client(http_client: reqwest::Client, config: &GraphConfig) -> Self {
        Self {
            http_client,
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    async fn acquire_token(&self, scopes: &[String]) -> AppResult<AccessToken> {
        let scope = scopes.join(" ");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::auth(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<OAuthErrorResponse>(&body) {
                Ok(err) => err.error_description.unwrap_or(err.error),
                Err(_) => body,
            };
            return Err(AppError::auth(format!(
                "Token request failed with status {}: {}",
                status, reason
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::auth(format!("Failed to parse token response: {}", e)))?;

        let expires_at = expiry_from_lifetime(token.expires_in)?;
        debug!(
            "Acquired new token, expires at {}",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        Ok(AccessToken::new(token.access_token, expires_at))
    }
}

/// Absolute expiry for a token lifetime in seconds.
fn expiry_from_lifetime(expires_in: i64) -> AppResult<DateTime<Utc>> {
    if expires_in < 0 {
        return Err(AppError::auth(format!(
            "Invalid expires_in in token response: {}",
            expires_in
        )));
    }

    Duration::try_seconds(expires_in)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| {
            AppError::auth(format!(
                "Invalid expires_in in token response: {}",
                expires_in
            ))
        })
}

/// Process-wide token cache keyed by scope set.
///
/// Tokens are reused until they come within `refresh_skew` of expiry. The
/// cache lock is held while a token is acquired, so concurrent callers for
/// an expired entry wait for a single acquisition instead of racing.
pub struct CachingTokenProvider<P: TokenProvider> {
    inner: P,
    refresh_skew: Duration,
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl<P: TokenProvider> CachingTokenProvider<P> {
    pub fn new(inner: P, refresh_skew: Duration) -> Self {
        Self {
            inner,
            refresh_skew,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Drop every cached token, forcing acquisition on next use.
    pub async fn invalidate(&self) {
        self.tokens.lock().await.clear();
    }
}

/// Cache key: sorted, de-duplicated scopes.
fn scope_key(scopes: &[String]) -> String {
    scopes
        .iter()
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl<P: TokenProvider> TokenProvider for CachingTokenProvider<P> {
    async fn acquire_token(&self, scopes: &[String]) -> AppResult<AccessToken> {
        let key = scope_key(scopes);
        let mut tokens = self.tokens.lock().await;

        if let Some(token) = tokens.get(&key) {
            if !token.is_expired(self.refresh_skew) {
                debug!("Using cached token");
                return Ok(token.clone());
            }
        }

        debug!("Refreshing access token");
        let token = self.inner.acquire_token(scopes).await?;
        tokens.insert(key, token.clone());

        Ok(token)
    }
}
