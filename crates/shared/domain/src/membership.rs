//! Membership response DTOs (safe to return to client).
//!
//! Field names are PascalCase on the wire.

use serde::{Deserialize, Serialize};

use crate::directory::{GroupRecord, MembershipResult};

/// A group the user is a member of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "PascalCase")]
pub struct GroupMembership {
    /// Group object identifier
    pub group_id: String,
    /// Group display name
    pub display_name: Option<String>,
}

impl From<GroupRecord> for GroupMembership {
    fn from(group: GroupRecord) -> Self {
        Self {
            group_id: group.id,
            display_name: group.display_name,
        }
    }
}

/// Memberships of a single user identified by ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "PascalCase")]
pub struct GroupMembershipInformation {
    /// User identifier the lookup was made for
    pub user_id: String,
    /// Groups in resolution order
    pub group_memberships: Vec<GroupMembership>,
    /// Present (true) only when the list was cut at the membership cap
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl From<MembershipResult> for GroupMembershipInformation {
    fn from(result: MembershipResult) -> Self {
        Self {
            user_id: result.user.id,
            group_memberships: result
                .group_memberships
                .into_iter()
                .map(GroupMembership::from)
                .collect(),
            truncated: result.truncated,
        }
    }
}

/// A filtered user with profile fields and memberships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "PascalCase")]
pub struct UserGroupMemberships {
    /// User object identifier
    pub id: String,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    #[serde(default)]
    pub business_phones: Vec<String>,
    pub mobile_phone: Option<String>,
    /// Mailbox address
    pub mail: Option<String>,
    /// Groups in resolution order
    pub group_memberships: Vec<GroupMembership>,
    /// Present (true) only when the list was cut at the membership cap
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl From<MembershipResult> for UserGroupMemberships {
    fn from(result: MembershipResult) -> Self {
        let user = result.user;
        Self {
            id: user.id,
            given_name: user.given_name,
            surname: user.surname,
            business_phones: user.business_phones,
            mobile_phone: user.mobile_phone,
            mail: user.mail,
            group_memberships: result
                .group_memberships
                .into_iter()
                .map(GroupMembership::from)
                .collect(),
            truncated: result.truncated,
        }
    }
}
