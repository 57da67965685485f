//! Shared configuration structures.

use serde::{Deserialize, Serialize};

/// Default identity provider host
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Default Graph API base URL (including version)
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Default scope requested with the client-credentials grant
pub const DEFAULT_GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Default number of users requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default outbound request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default refresh window before token expiry in seconds (5 minutes)
pub const DEFAULT_TOKEN_REFRESH_SKEW_SECS: i64 = 300;

/// Largest accepted refresh window in seconds (one day)
pub const MAX_TOKEN_REFRESH_SKEW_SECS: i64 = 86_400;

/// Default group lookups in flight per user
pub const DEFAULT_GROUP_CONCURRENCY: usize = 4;

/// Default users resolved in flight per filter query
pub const DEFAULT_USER_CONCURRENCY: usize = 2;

/// Default cap on memberships resolved per user
pub const DEFAULT_MAX_MEMBERSHIPS_PER_USER: usize = 1000;

/// Base service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Host address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Directory service (Graph) client configuration.
#[derive(Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    pub tenant_id: String,
    /// Application (client) ID
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// Scopes requested with the client-credentials grant
    pub scopes: Vec<String>,
    /// Identity provider host, without tenant
    pub authority_host: String,
    /// Graph base URL including the API version
    pub base_url: String,
    /// Users requested per page
    pub page_size: u32,
    /// Outbound request timeout in seconds
    pub request_timeout_secs: u64,
    /// Tokens are refreshed this many seconds before they expire
    pub token_refresh_skew_secs: i64,
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("authority_host", &self.authority_host)
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token_refresh_skew_secs", &self.token_refresh_skew_secs)
            .finish()
    }
}

impl GraphConfig {
    /// Token endpoint for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scopes: vec![DEFAULT_GRAPH_SCOPE.to_string()],
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            token_refresh_skew_secs: DEFAULT_TOKEN_REFRESH_SKEW_SECS,
        }
    }
}

/// Fan-out limits for membership resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FanOutConfig {
    /// Group lookups in flight per user (1 = sequential)
    pub group_concurrency: usize,
    /// Users resolved in flight per filter query (1 = sequential)
    pub user_concurrency: usize,
    /// Memberships resolved per user before the result is truncated
    pub max_memberships_per_user: usize,
}

impl FanOutConfig {
    /// Strictly sequential resolution, one directory call at a time.
    pub fn sequential() -> Self {
        Self {
            group_concurrency: 1,
            user_concurrency: 1,
            ..Self::default()
        }
    }
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            group_concurrency: DEFAULT_GROUP_CONCURRENCY,
            user_concurrency: DEFAULT_USER_CONCURRENCY,
            max_memberships_per_user: DEFAULT_MAX_MEMBERSHIPS_PER_USER,
        }
    }
}
