//! Application state for dependency injection.

use std::sync::Arc;

use crate::clients::TokenProvider;
use crate::config::GatewayConfig;
use crate::services::MembershipService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub membership_service: Arc<dyn MembershipService>,
    pub token_provider: Arc<dyn TokenProvider>,
    pub config: GatewayConfig,
}

impl AppState {
    /// Create new app state.
    pub fn new(
        membership_service: Arc<dyn MembershipService>,
        token_provider: Arc<dyn TokenProvider>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            membership_service,
            token_provider,
            config,
        }
    }
}
