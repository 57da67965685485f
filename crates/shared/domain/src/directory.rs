//! Directory records resolved from the directory service.
//!
//! All records are request-scoped: they are built from a live lookup and
//! never persisted.

use serde::{Deserialize, Serialize};

/// A directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Object identifier (or principal name when only that is known)
    pub id: String,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    /// Mailbox address
    pub mail: Option<String>,
    #[serde(default)]
    pub business_phones: Vec<String>,
    pub mobile_phone: Option<String>,
}

impl UserRecord {
    /// A user known only by identifier.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            given_name: None,
            surname: None,
            mail: None,
            business_phones: Vec::new(),
            mobile_phone: None,
        }
    }
}

/// A directory group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    pub display_name: Option<String>,
}

impl GroupRecord {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(display_name.into()),
        }
    }
}

/// A user with the groups it is a member of, in resolution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipResult {
    pub user: UserRecord,
    pub group_memberships: Vec<GroupRecord>,
    /// Set when the membership list was cut at the per-user cap
    #[serde(default)]
    pub truncated: bool,
}

impl MembershipResult {
    pub fn new(user: UserRecord, group_memberships: Vec<GroupRecord>) -> Self {
        Self {
            user,
            group_memberships,
            truncated: false,
        }
    }

    /// Mark the result as truncated
    pub fn truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }
}
