//! Domain layer - Directory records, filter criteria and response DTOs.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.

pub mod constants;
pub mod directory;
pub mod error;
pub mod filter;
pub mod membership;

pub use constants::*;
pub use directory::{GroupRecord, MembershipResult, UserRecord};
pub use error::{DomainError, DomainResult};
pub use filter::{FilterCriteria, FilterField};
pub use membership::{GroupMembership, GroupMembershipInformation, UserGroupMemberships};
