//! Group membership handlers.

use axum::{extract::State, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use common::{AppResult, ErrorResponse};
use domain::{
    FilterCriteria, GroupMembershipInformation, UserGroupMemberships, UserRecord,
    MAX_FILTER_VALUE_LENGTH,
};

use crate::extractors::ValidatedQuery;
use crate::state::AppState;

/// Prefix filters for the user listing. Blank values are ignored.
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MembershipQuery {
    /// Prefix of the user principal name
    #[validate(custom(function = "validate_filter_value"))]
    pub user_principal_name: Option<String>,
    /// Prefix of the given name
    #[validate(custom(function = "validate_filter_value"))]
    pub given_name: Option<String>,
    /// Prefix of the surname
    #[validate(custom(function = "validate_filter_value"))]
    pub surname: Option<String>,
}

impl MembershipQuery {
    /// True when any filter key was sent, even with a blank value
    pub fn has_filter_keys(&self) -> bool {
        self.user_principal_name.is_some() || self.given_name.is_some() || self.surname.is_some()
    }

    pub fn into_criteria(self) -> FilterCriteria {
        FilterCriteria::new(self.user_principal_name, self.given_name, self.surname)
    }
}

/// Blank values are dropped before filtering, so only non-blank ones are length-checked.
fn validate_filter_value(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() || value.chars().count() <= MAX_FILTER_VALUE_LENGTH {
        return Ok(());
    }

    let mut err = validator::ValidationError::new("filter_value_length");
    err.message = Some(
        format!(
            "Filter values must be at most {} characters",
            MAX_FILTER_VALUE_LENGTH
        )
        .into(),
    );
    Err(err)
}

/// Either response shape of `GET /GroupMembership`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum MembershipResponse {
    /// No filter keys: the configured user
    User(GroupMembershipInformation),
    /// Any filter key: every matched user
    Users(Vec<UserGroupMemberships>),
}

/// Create group membership routes
pub fn membership_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_group_membership))
        .route("/users", get(list_user_memberships))
}

/// Memberships of the configured user, or of filtered users when any filter is given
#[utoipa::path(
    get,
    path = "/GroupMembership",
    tag = "GroupMembership",
    params(MembershipQuery),
    responses(
        (status = 200, description = "Without filter keys: one object. With any filter key: an array of UserGroupMemberships", body = MembershipResponse),
        (status = 400, description = "Invalid filter value", body = ErrorResponse),
        (status = 401, description = "Token acquisition failed", body = ErrorResponse),
        (status = 404, description = "User or group not found", body = ErrorResponse),
        (status = 502, description = "Directory service error", body = ErrorResponse),
        (status = 503, description = "Directory service throttled or unavailable", body = ErrorResponse)
    )
)]
pub async fn get_group_membership(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<MembershipQuery>,
) -> AppResult<Json<MembershipResponse>> {
    if query.has_filter_keys() {
        let Json(users) = list_memberships(&state, query.into_criteria()).await?;
        return Ok(Json(MembershipResponse::Users(users)));
    }

    let user_id = state.config.membership_user_id.clone();
    debug!(%user_id, "Resolving memberships for configured user");

    let result = state
        .membership_service
        .resolve_memberships(UserRecord::with_id(user_id))
        .await?;

    Ok(Json(MembershipResponse::User(result.into())))
}

/// Memberships of every user matching the filters (all users when none is given)
#[utoipa::path(
    get,
    path = "/GroupMembership/users",
    tag = "GroupMembership",
    params(MembershipQuery),
    responses(
        (status = 200, description = "Matched users with their memberships", body = Vec<UserGroupMemberships>),
        (status = 400, description = "Invalid filter value", body = ErrorResponse),
        (status = 401, description = "Token acquisition failed", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 502, description = "Directory service error", body = ErrorResponse),
        (status = 503, description = "Directory service throttled or unavailable", body = ErrorResponse)
    )
)]
pub async fn list_user_memberships(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<MembershipQuery>,
) -> AppResult<Json<Vec<UserGroupMemberships>>> {
    list_memberships(&state, query.into_criteria()).await
}

async fn list_memberships(
    state: &AppState,
    criteria: FilterCriteria,
) -> AppResult<Json<Vec<UserGroupMemberships>>> {
    let results = state
        .membership_service
        .resolve_memberships_for_filter(&criteria)
        .await?;

    Ok(Json(results.into_iter().map(UserGroupMemberships::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use domain::{GroupRecord, MembershipResult};

    use crate::clients::MockTokenProvider;
    use crate::config::GatewayConfig;
    use crate::services::MockMembershipService;

    fn state_with(service: MockMembershipService, user_id: &str) -> AppState {
        let config = GatewayConfig {
            membership_user_id: user_id.to_string(),
            ..GatewayConfig::default()
        };
        AppState::new(Arc::new(service), Arc::new(MockTokenProvider::new()), config)
    }

    #[test]
    fn test_no_keys_selects_single_user() {
        assert!(!MembershipQuery::default().has_filter_keys());
    }

    #[test]
    fn test_blank_key_still_selects_listing() {
        let query = MembershipQuery {
            surname: Some(String::new()),
            ..MembershipQuery::default()
        };
        assert!(query.has_filter_keys());
        assert!(query.into_criteria().is_empty());
    }

    #[test]
    fn test_into_criteria_keeps_non_blank_values() {
        let query = MembershipQuery {
            given_name: Some("Jane".to_string()),
            surname: Some("  ".to_string()),
            ..MembershipQuery::default()
        };
        assert_eq!(
            query.into_criteria(),
            FilterCriteria::default().with_given_name("Jane")
        );
    }

    #[test]
    fn test_overlong_blank_value_passes_validation() {
        let query = MembershipQuery {
            surname: Some(" ".repeat(MAX_FILTER_VALUE_LENGTH + 44)),
            ..MembershipQuery::default()
        };
        assert!(query.validate().is_ok());
        assert!(query.has_filter_keys());
        assert!(query.into_criteria().is_empty());
    }

    #[test]
    fn test_value_at_limit_passes_validation() {
        let query = MembershipQuery {
            given_name: Some("x".repeat(MAX_FILTER_VALUE_LENGTH)),
            ..MembershipQuery::default()
        };
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_overlong_value_fails_validation() {
        let query = MembershipQuery {
            user_principal_name: Some("x".repeat(MAX_FILTER_VALUE_LENGTH + 1)),
            ..MembershipQuery::default()
        };
        assert!(query.validate().is_err());
    }

    #[tokio::test]
    async fn test_single_user_lookup_uses_configured_id() {
        let mut service = MockMembershipService::new();
        service
            .expect_resolve_memberships()
            .withf(|user| user.id == "jane@contoso.com")
            .times(1)
            .returning(|user| {
                Ok(MembershipResult::new(
                    user,
                    vec![GroupRecord::new("g1", "Engineering")],
                ))
            });
        service.expect_resolve_memberships_for_filter().never();

        let Json(response) = get_group_membership(
            State(state_with(service, "jane@contoso.com")),
            ValidatedQuery(MembershipQuery::default()),
        )
        .await
        .unwrap();

        match response {
            MembershipResponse::User(info) => {
                assert_eq!(info.user_id, "jane@contoso.com");
                assert_eq!(info.group_memberships[0].group_id, "g1");
            }
            other => panic!("expected single-user response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_filter_keys_switch_to_listing() {
        let mut service = MockMembershipService::new();
        service.expect_resolve_memberships().never();
        service
            .expect_resolve_memberships_for_filter()
            .withf(|filter| *filter == FilterCriteria::default().with_given_name("Jane"))
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let query = MembershipQuery {
            given_name: Some("Jane".to_string()),
            ..MembershipQuery::default()
        };
        let Json(response) = get_group_membership(
            State(state_with(service, "unused@contoso.com")),
            ValidatedQuery(query),
        )
        .await
        .unwrap();

        assert!(matches!(response, MembershipResponse::Users(ref users) if users.is_empty()));
    }
}
