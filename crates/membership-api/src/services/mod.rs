//! Business logic layer.

pub mod membership_service;
pub mod parallel;

pub use membership_service::{MembershipAggregator, MembershipService};

#[cfg(any(test, feature = "test-utils"))]
pub use membership_service::MockMembershipService;
