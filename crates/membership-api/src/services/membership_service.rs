//! Membership service - resolves users to the groups they belong to.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use common::{AppResult, FanOutConfig};
use domain::{FilterCriteria, GroupRecord, MembershipResult, UserRecord};

use super::parallel;
use crate::clients::DirectoryClient;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Membership resolution for a single user or a filtered set of users.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait MembershipService: Send + Sync {
    /// Resolve every group `user` belongs to.
    ///
    /// Groups appear in the order the directory listed their IDs. Any
    /// failed lookup fails the whole resolution.
    async fn resolve_memberships(&self, user: UserRecord) -> AppResult<MembershipResult>;

    /// Resolve memberships for every user matching `filter`, in listing order.
    async fn resolve_memberships_for_filter(
        &self,
        filter: &FilterCriteria,
    ) -> AppResult<Vec<MembershipResult>>;
}

/// Directory-backed implementation with bounded fan-out.
pub struct MembershipAggregator<D: DirectoryClient> {
    directory: Arc<D>,
    fan_out: FanOutConfig,
}

impl<D: DirectoryClient> MembershipAggregator<D> {
    pub fn new(directory: Arc<D>, fan_out: FanOutConfig) -> Self {
        Self { directory, fan_out }
    }
}

#[async_trait]
impl<D: DirectoryClient> MembershipService for MembershipAggregator<D> {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn resolve_memberships(&self, user: UserRecord) -> AppResult<MembershipResult> {
        let mut group_ids = self.directory.list_group_ids_for_user(&user.id).await?;

        let limit = self.fan_out.max_memberships_per_user;
        let truncated = group_ids.len() > limit;
        if truncated {
            warn!(
                total = group_ids.len(),
                limit, "Membership list exceeds cap, truncating"
            );
            group_ids.truncate(limit);
        }

        let groups: Pin<Box<dyn Future<Output = AppResult<Vec<GroupRecord>>> + Send + '_>> =
            Box::pin(parallel::join_all_ordered(
                group_ids.iter().map(|id| self.directory.get_group(id)),
                self.fan_out.group_concurrency,
            ));
        let groups = groups.await?;

        debug!(groups = groups.len(), "Resolved memberships");
        Ok(MembershipResult::new(user, groups).truncated(truncated))
    }

    #[instrument(skip(self))]
    async fn resolve_memberships_for_filter(
        &self,
        filter: &FilterCriteria,
    ) -> AppResult<Vec<MembershipResult>> {
        let users = self.directory.list_users(filter).await?;
        debug!(users = users.len(), "Resolving memberships for matched users");

        parallel::join_all_ordered(
            users.into_iter().map(|user| self.resolve_memberships(user)),
            self.fan_out.user_concurrency,
        )
        .await
    }
}
