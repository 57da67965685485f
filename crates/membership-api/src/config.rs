//! Service configuration.

use std::env;
use std::str::FromStr;

use common::{
    AppError, AppResult, FanOutConfig, GraphConfig, ServiceConfig, DEFAULT_AUTHORITY_HOST,
    DEFAULT_GRAPH_BASE_URL, DEFAULT_GRAPH_SCOPE, DEFAULT_GROUP_CONCURRENCY,
    DEFAULT_MAX_MEMBERSHIPS_PER_USER, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TOKEN_REFRESH_SKEW_SECS, DEFAULT_USER_CONCURRENCY, MAX_TOKEN_REFRESH_SKEW_SECS,
};

/// Identity used by the single-user endpoint when none is configured
pub const DEFAULT_MEMBERSHIP_USER_ID: &str = "john@contoso.com";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub server: ServiceConfig,
    pub graph: GraphConfig,
    pub fan_out: FanOutConfig,
    /// User resolved by `GET /GroupMembership` without filters
    pub membership_user_id: String,
}

impl GatewayConfig {
    /// Load configuration from `.env` and environment variables.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServiceConfig {
            host: optional(&lookup, "SERVER_HOST").unwrap_or_else(|| ServiceConfig::default().host),
            port: parse_or(&lookup, "SERVER_PORT", ServiceConfig::default().port)?,
        };

        let scopes = match optional(&lookup, "GRAPH_SCOPES") {
            Some(raw) => {
                let scopes: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                if scopes.is_empty() {
                    return Err(AppError::config("GRAPH_SCOPES must name at least one scope"));
                }
                scopes
            }
            None => vec![DEFAULT_GRAPH_SCOPE.to_string()],
        };

        let graph = GraphConfig {
            tenant_id: required(&lookup, "GRAPH_TENANT_ID")?,
            client_id: required(&lookup, "GRAPH_CLIENT_ID")?,
            client_secret: required(&lookup, "GRAPH_CLIENT_SECRET")?,
            scopes,
            authority_host: optional(&lookup, "GRAPH_AUTHORITY_HOST")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            base_url: optional(&lookup, "GRAPH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string()),
            page_size: parse_or(&lookup, "GRAPH_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            request_timeout_secs: parse_or(
                &lookup,
                "GRAPH_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            token_refresh_skew_secs: parse_or(
                &lookup,
                "TOKEN_REFRESH_SKEW_SECS",
                DEFAULT_TOKEN_REFRESH_SKEW_SECS,
            )?,
        };

        let fan_out = FanOutConfig {
            group_concurrency: positive(&lookup, "GROUP_CONCURRENCY", DEFAULT_GROUP_CONCURRENCY)?,
            user_concurrency: positive(&lookup, "USER_CONCURRENCY", DEFAULT_USER_CONCURRENCY)?,
            max_memberships_per_user: positive(
                &lookup,
                "MAX_MEMBERSHIPS_PER_USER",
                DEFAULT_MAX_MEMBERSHIPS_PER_USER,
            )?,
        };

        let membership_user_id = optional(&lookup, "MEMBERSHIP_USER_ID")
            .unwrap_or_else(|| DEFAULT_MEMBERSHIP_USER_ID.to_string());

        if !(0..=MAX_TOKEN_REFRESH_SKEW_SECS).contains(&graph.token_refresh_skew_secs) {
            return Err(AppError::config(format!(
                "TOKEN_REFRESH_SKEW_SECS must be between 0 and {}",
                MAX_TOKEN_REFRESH_SKEW_SECS
            )));
        }

        if graph.page_size == 0 {
            return Err(AppError::config("GRAPH_PAGE_SIZE must be greater than zero"));
        }

        Ok(Self {
            server,
            graph,
            fan_out,
            membership_user_id,
        })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServiceConfig::default(),
            graph: GraphConfig::default(),
            fan_out: FanOutConfig::default(),
            membership_user_id: DEFAULT_MEMBERSHIP_USER_ID.to_string(),
        }
    }
}

/// Set, non-blank value of `key`.
fn optional<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> AppResult<String> {
    optional(lookup, key).ok_or_else(|| AppError::config(format!("{} must be set", key)))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::config(format!("{} is invalid ({}): {}", key, raw, e))),
        None => Ok(default),
    }
}

fn positive<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: usize) -> AppResult<usize> {
    let value = parse_or(lookup, key, default)?;
    if value == 0 {
        return Err(AppError::config(format!("{} must be greater than zero", key)));
    }
    Ok(value)
}
