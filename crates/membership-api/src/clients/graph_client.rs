//! Microsoft Graph directory client with continuation-link paging.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use common::{AppError, AppResult, GraphConfig, Stage};
use domain::{FilterCriteria, GroupRecord, UserRecord};

use super::token_provider::TokenProvider;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User attributes requested from the directory
const USER_SELECT: &str = "id,givenName,surname,mail,businessPhones,mobilePhone,userPrincipalName";

/// Group attributes requested from the directory
const GROUP_SELECT: &str = "id,displayName";

/// Typed directory operations used by membership resolution.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// List every user matching `filter`, following all pages.
    async fn list_users(&self, filter: &FilterCriteria) -> AppResult<Vec<UserRecord>>;

    /// All group IDs the user is a direct or transitive member of, in page order.
    async fn list_group_ids_for_user(&self, user_id: &str) -> AppResult<Vec<String>>;

    /// Look up a single group.
    async fn get_group(&self, group_id: &str) -> AppResult<GroupRecord>;
}

/// `OData` error response from Graph.
#[derive(Debug, Deserialize)]
struct ODataError {
    error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
struct ODataErrorBody {
    code: String,
    message: String,
}

/// One page of a collection response.
#[derive(Debug, Deserialize)]
struct ODataPage<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    id: String,
    given_name: Option<String>,
    surname: Option<String>,
    mail: Option<String>,
    business_phones: Option<Vec<String>>,
    mobile_phone: Option<String>,
}

impl From<GraphUser> for UserRecord {
    fn from(user: GraphUser) -> Self {
        Self {
            id: user.id,
            given_name: user.given_name,
            surname: user.surname,
            mail: user.mail,
            business_phones: user.business_phones.unwrap_or_default(),
            mobile_phone: user.mobile_phone,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphGroup {
    id: String,
    display_name: Option<String>,
}

impl From<GraphGroup> for GroupRecord {
    fn from(group: GraphGroup) -> Self {
        Self {
            id: group.id,
            display_name: group.display_name,
        }
    }
}

/// Body of the `getMemberGroups` action.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetMemberGroupsRequest {
    security_enabled_only: bool,
}

/// Graph API client.
pub struct GraphClient {
    http_client: reqwest::Client,
    base_url: Url,
    token_provider: Arc<dyn TokenProvider>,
    scopes: Vec<String>,
    page_size: u32,
}

impl GraphClient {
    /// Create a client for the configured Graph endpoint.
    pub fn new(config: &GraphConfig, token_provider: Arc<dyn TokenProvider>) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::config(format!("Invalid Graph base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::config(format!(
                "Graph base URL cannot carry a path: {}",
                base_url
            )));
        }

        Ok(Self {
            http_client,
            base_url,
            token_provider,
            scopes: config.scopes.clone(),
            page_size: config.page_size,
        })
    }

    /// Base URL plus percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config(format!("Invalid Graph base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// First page URL of a user listing.
    fn users_url(&self, filter: &FilterCriteria) -> AppResult<Url> {
        let expression = filter.to_expression()?;
        let mut url = self.endpoint(&["users"])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("$select", USER_SELECT)
                .append_pair("$top", &self.page_size.to_string());
            if let Some(expression) = expression {
                query.append_pair("$filter", &expression);
            }
        }
        Ok(url)
    }

    /// Send a request with the bearer token and decode the JSON body.
    ///
    /// A 404 becomes `NotFound` for `resource` when one is given; every other
    /// non-success status is an upstream error tagged with `stage`.
    async fn send<T: DeserializeOwned>(
        &self,
        stage: Stage,
        request: reqwest::RequestBuilder,
        resource: Option<String>,
    ) -> AppResult<T> {
        let token = self.token_provider.acquire_token(&self.scopes).await?;

        let response = request
            .header(AUTHORIZATION, token.authorization_header())
            .send()
            .await
            .map_err(|e| AppError::upstream(stage, None, format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| {
                AppError::upstream(
                    stage,
                    Some(status.as_u16()),
                    format!("Malformed response: {}", e),
                )
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ODataError>(&body) {
            Ok(odata) => format!("{} - {}", odata.error.code, odata.error.message),
            Err(_) => format!("{}: {}", status, body),
        };

        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(resource) = resource {
                debug!(%stage, "{} not found: {}", resource, message);
                return Err(AppError::not_found(stage, resource));
            }
        }

        warn!(%stage, status = status.as_u16(), "Directory request failed: {}", message);
        Err(AppError::upstream(stage, Some(status.as_u16()), message))
    }

    /// Continuation URL, only followed on the configured Graph origin.
    fn next_page(&self, stage: Stage, next_link: Option<String>) -> AppResult<Option<Url>> {
        let Some(link) = next_link else {
            return Ok(None);
        };

        let url = Url::parse(&link)
            .map_err(|e| AppError::upstream(stage, None, format!("Invalid next link: {}", e)))?;
        if url.origin() != self.base_url.origin() {
            warn!(%stage, "Refusing next link outside {}", self.base_url);
            return Err(AppError::upstream(
                stage,
                None,
                format!(
                    "Next link points outside the Graph endpoint: {}",
                    url.origin().ascii_serialization()
                ),
            ));
        }

        Ok(Some(url))
    }

    async fn fetch_user_page(&self, url: Url) -> AppResult<(Vec<UserRecord>, Option<Url>)> {
        debug!("Fetching user page: {}", url);
        let page: ODataPage<GraphUser> = self
            .send(Stage::UserListing, self.http_client.get(url), None)
            .await?;

        let next = self.next_page(Stage::UserListing, page.next_link)?;
        let users = page.value.into_iter().map(UserRecord::from).collect();
        Ok((users, next))
    }

    /// Lazily fetched pages of users matching `filter`.
    ///
    /// The next page is only requested when the stream is polled past the
    /// current one.
    pub fn user_pages(&self, filter: &FilterCriteria) -> BoxStream<'_, AppResult<Vec<UserRecord>>> {
        let first = match self.users_url(filter) {
            Ok(url) => url,
            Err(e) => return stream::once(async move { Err::<Vec<UserRecord>, _>(e) }).boxed(),
        };

        stream::try_unfold(Some(first), move |next: Option<Url>| async move {
            match next {
                Some(url) => self.fetch_user_page(url).await.map(Some),
                None => Ok(None),
            }
        })
        .boxed()
    }
}

#[async_trait]
impl DirectoryClient for GraphClient {
    #[instrument(skip(self))]
    async fn list_users(&self, filter: &FilterCriteria) -> AppResult<Vec<UserRecord>> {
        let users: Vec<UserRecord> = self.user_pages(filter).try_concat().await?;
        debug!(count = users.len(), "Listed users");
        Ok(users)
    }

    #[instrument(skip(self))]
    async fn list_group_ids_for_user(&self, user_id: &str) -> AppResult<Vec<String>> {
        let body = GetMemberGroupsRequest {
            security_enabled_only: false,
        };
        let mut url = self.endpoint(&["users", user_id, "getMemberGroups"])?;
        let mut group_ids = Vec::new();

        loop {
            debug!("Fetching membership page: {}", url);
            let page: ODataPage<String> = self
                .send(
                    Stage::MembershipListing,
                    self.http_client.post(url).json(&body),
                    Some(format!("User {}", user_id)),
                )
                .await?;

            group_ids.extend(page.value);

            match self.next_page(Stage::MembershipListing, page.next_link)? {
                Some(next) => url = next,
                None => break,
            }
        }

        debug!(count = group_ids.len(), "Listed group memberships");
        Ok(group_ids)
    }

    #[instrument(skip(self))]
    async fn get_group(&self, group_id: &str) -> AppResult<GroupRecord> {
        let mut url = self.endpoint(&["groups", group_id])?;
        url.query_pairs_mut().append_pair("$select", GROUP_SELECT);

        let group: GraphGroup = self
            .send(
                Stage::GroupResolution,
                self.http_client.get(url),
                Some(format!("Group {}", group_id)),
            )
            .await?;

        Ok(group.into())
    }
}
