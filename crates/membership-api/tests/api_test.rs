//! Integration tests for API endpoints.
//!
//! These tests drive the router with an in-memory directory, so no identity
//! provider or Graph endpoint is needed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{AppError, AppResult, FanOutConfig, Stage};
use domain::{FilterCriteria, FilterField, GroupRecord, UserRecord};
use membership_api::clients::{AccessToken, DirectoryClient, TokenProvider};
use membership_api::config::GatewayConfig;
use membership_api::routes::create_router;
use membership_api::services::MembershipAggregator;
use membership_api::state::AppState;

// =============================================================================
// In-memory collaborators
// =============================================================================

/// Directory holding a fixed set of users, memberships and groups
#[derive(Default)]
struct InMemoryDirectory {
    users: Vec<UserRecord>,
    memberships: HashMap<String, Vec<String>>,
    groups: HashMap<String, String>,
}

impl InMemoryDirectory {
    fn with_user(mut self, user: UserRecord, group_ids: &[&str]) -> Self {
        self.memberships.insert(
            user.id.clone(),
            group_ids.iter().map(|g| g.to_string()).collect(),
        );
        self.users.push(user);
        self
    }

    fn with_membership(mut self, user_id: &str, group_ids: &[&str]) -> Self {
        self.memberships.insert(
            user_id.to_string(),
            group_ids.iter().map(|g| g.to_string()).collect(),
        );
        self
    }

    fn with_group(mut self, id: &str, name: &str) -> Self {
        self.groups.insert(id.to_string(), name.to_string());
        self
    }

    fn matches(user: &UserRecord, filter: &FilterCriteria) -> bool {
        filter.predicates().all(|(field, prefix)| {
            let value = match field {
                FilterField::UserPrincipalName => Some(user.id.as_str()),
                FilterField::GivenName => user.given_name.as_deref(),
                FilterField::Surname => user.surname.as_deref(),
            };
            value.is_some_and(|v| v.starts_with(prefix))
        })
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn list_users(&self, filter: &FilterCriteria) -> AppResult<Vec<UserRecord>> {
        // Same expression rules as the Graph client
        filter.to_expression()?;
        Ok(self
            .users
            .iter()
            .filter(|user| Self::matches(user, filter))
            .cloned()
            .collect())
    }

    async fn list_group_ids_for_user(&self, user_id: &str) -> AppResult<Vec<String>> {
        self.memberships
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(Stage::MembershipListing, format!("User {}", user_id)))
    }

    async fn get_group(&self, group_id: &str) -> AppResult<GroupRecord> {
        self.groups
            .get(group_id)
            .map(|name| GroupRecord::new(group_id, name.as_str()))
            .ok_or_else(|| AppError::not_found(Stage::GroupResolution, format!("Group {}", group_id)))
    }
}

/// Token provider that either always succeeds or always fails
struct StaticTokenProvider {
    healthy: bool,
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn acquire_token(&self, _scopes: &[String]) -> AppResult<AccessToken> {
        if self.healthy {
            Ok(AccessToken::new("test-token", Utc::now() + Duration::hours(1)))
        } else {
            Err(AppError::auth("invalid_client"))
        }
    }
}

fn user(id: &str, given_name: &str, surname: &str) -> UserRecord {
    UserRecord {
        given_name: Some(given_name.to_string()),
        surname: Some(surname.to_string()),
        mail: Some(format!("{}@contoso.com", id)),
        ..UserRecord::with_id(id)
    }
}

fn directory() -> InMemoryDirectory {
    InMemoryDirectory::default()
        .with_user(user("u1", "Jane", "Doe"), &["g1", "g2"])
        .with_user(user("u2", "John", "Smith"), &["g2"])
        .with_membership("john@contoso.com", &[])
        .with_group("g1", "Engineering")
        .with_group("g2", "Sales")
}

fn app_with(directory: InMemoryDirectory, config: GatewayConfig, healthy: bool) -> axum::Router {
    let service = Arc::new(MembershipAggregator::new(
        Arc::new(directory),
        FanOutConfig::default(),
    ));
    let tokens = Arc::new(StaticTokenProvider { healthy });
    create_router(AppState::new(service, tokens, config))
}

fn app() -> axum::Router {
    app_with(directory(), GatewayConfig::default(), true)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// =============================================================================
// GroupMembership
// =============================================================================

#[tokio::test]
async fn test_single_user_without_groups() {
    let (status, body) = get(app(), "/GroupMembership").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"UserId": "john@contoso.com", "GroupMemberships": []})
    );
}

#[tokio::test]
async fn test_single_user_uses_configured_identity() {
    let config = GatewayConfig {
        membership_user_id: "u1".to_string(),
        ..GatewayConfig::default()
    };
    let (status, body) = get(app_with(directory(), config, true), "/GroupMembership").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["UserId"], "u1");
    assert_eq!(
        body["GroupMemberships"],
        json!([
            {"GroupId": "g1", "DisplayName": "Engineering"},
            {"GroupId": "g2", "DisplayName": "Sales"}
        ])
    );
}

#[tokio::test]
async fn test_unfiltered_listing_returns_every_user() {
    let directory = InMemoryDirectory::default()
        .with_user(UserRecord::with_id("u1"), &["g1", "g2"])
        .with_group("g1", "Engineering")
        .with_group("g2", "Sales");

    let (status, body) = get(
        app_with(directory, GatewayConfig::default(), true),
        "/GroupMembership/users",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "Id": "u1",
            "GivenName": null,
            "Surname": null,
            "BusinessPhones": [],
            "MobilePhone": null,
            "Mail": null,
            "GroupMemberships": [
                {"GroupId": "g1", "DisplayName": "Engineering"},
                {"GroupId": "g2", "DisplayName": "Sales"}
            ]
        }])
    );
}

#[tokio::test]
async fn test_filter_selects_matching_users() {
    let (status, body) = get(app(), "/GroupMembership?givenName=Ja").await;

    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["Id"], "u1");
    assert_eq!(users[0]["GivenName"], "Jane");
    assert_eq!(users[0]["Mail"], "u1@contoso.com");
    assert_eq!(users[0]["GroupMemberships"][1]["DisplayName"], "Sales");
}

#[tokio::test]
async fn test_blank_filter_key_lists_all_users() {
    let (status, body) = get(app(), "/GroupMembership?surname=").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["Id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["u1", "u2"]);
}

#[tokio::test]
async fn test_filter_without_matches_is_empty_array() {
    let (status, body) = get(app(), "/GroupMembership/users?surname=Nobody").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_truncated_memberships_are_flagged() {
    let config = GatewayConfig {
        fan_out: FanOutConfig {
            max_memberships_per_user: 1,
            ..FanOutConfig::default()
        },
        ..GatewayConfig::default()
    };
    let service = Arc::new(MembershipAggregator::new(
        Arc::new(directory()),
        config.fan_out.clone(),
    ));
    let app = create_router(AppState::new(
        service,
        Arc::new(StaticTokenProvider { healthy: true }),
        config,
    ));

    let (status, body) = get(app, "/GroupMembership/users?givenName=Jane").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["Truncated"], true);
    assert_eq!(body[0]["GroupMemberships"].as_array().unwrap().len(), 1);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_unknown_configured_user_is_not_found() {
    let config = GatewayConfig {
        membership_user_id: "ghost@contoso.com".to_string(),
        ..GatewayConfig::default()
    };
    let (status, body) = get(app_with(directory(), config, true), "/GroupMembership").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["stage"], "membership_listing");
}

#[tokio::test]
async fn test_missing_group_fails_whole_request() {
    let directory = directory().with_user(user("u3", "Lost", "Member"), &["g1", "gone"]);
    let (status, body) = get(
        app_with(directory, GatewayConfig::default(), true),
        "/GroupMembership/users?givenName=Lost",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["stage"], "group_resolution");
    assert_eq!(
        body["error"]["message"],
        "Group gone not found during group resolution"
    );
}

#[tokio::test]
async fn test_overlong_filter_value_is_rejected() {
    let uri = format!("/GroupMembership?givenName={}", "a".repeat(300));
    let (status, body) = get(app(), &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_overlong_blank_filter_value_is_dropped() {
    let uri = format!("/GroupMembership?surname={}", "%20".repeat(300));
    let (status, body) = get(app(), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_control_character_in_filter_is_rejected() {
    let (status, body) = get(app(), "/GroupMembership/users?surname=Do%0Ae").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "FILTER_ERROR");
}

// =============================================================================
// Health & docs
// =============================================================================

#[tokio::test]
async fn test_health_with_working_credentials() {
    let (status, body) = get(app(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_health_with_rejected_credentials() {
    let (status, body) = get(
        app_with(directory(), GatewayConfig::default(), false),
        "/health",
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert!(body["error"].as_str().unwrap().contains("invalid_client"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (status, body) = get(app(), "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/GroupMembership"].is_object());
}
