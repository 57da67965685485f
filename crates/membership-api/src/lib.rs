//! Group membership API library.
//!
//! HTTP API resolving directory users to the groups they belong to,
//! backed by Microsoft Graph.

pub mod clients;
pub mod config;
pub mod extractors;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use common::{AppError, AppResult};
use domain::{GroupMembershipInformation, UserRecord};

use crate::clients::{CachingTokenProvider, ClientCredentialsProvider, GraphClient, TokenProvider};
use crate::config::GatewayConfig;
use crate::routes::create_router;
use crate::services::{MembershipAggregator, MembershipService};
use crate::state::AppState;

/// Wire the token cache, Graph client and membership service.
pub fn build_state(config: GatewayConfig) -> AppResult<AppState> {
    let refresh_skew = chrono::Duration::try_seconds(config.graph.token_refresh_skew_secs)
        .ok_or_else(|| {
            AppError::config(format!(
                "TOKEN_REFRESH_SKEW_SECS is out of range: {}",
                config.graph.token_refresh_skew_secs
            ))
        })?;

    let credentials = ClientCredentialsProvider::new(&config.graph)?;
    let token_provider: Arc<dyn TokenProvider> =
        Arc::new(CachingTokenProvider::new(credentials, refresh_skew));

    let directory = Arc::new(GraphClient::new(&config.graph, token_provider.clone())?);
    let membership_service = Arc::new(MembershipAggregator::new(
        directory,
        config.fan_out.clone(),
    ));

    Ok(AppState::new(membership_service, token_provider, config))
}

/// Run the HTTP server with the given configuration.
pub async fn run_server(
    host: &str,
    port: u16,
    config: GatewayConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(config)?;

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Membership API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Resolve one user's memberships without starting the server.
pub async fn lookup(config: GatewayConfig, user_id: &str) -> AppResult<GroupMembershipInformation> {
    let state = build_state(config)?;
    let result = state
        .membership_service
        .resolve_memberships(UserRecord::with_id(user_id))
        .await?;

    Ok(result.into())
}
