//! Domain-level errors.
//!
//! These errors represent rule violations in the directory model itself.
//! They are independent of infrastructure concerns (HTTP, Graph, tokens).

use thiserror::Error;

/// Domain-specific errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A filter value cannot be turned into a safe filter expression
    #[error("Filter error: {0}")]
    Filter(String),
}

impl DomainError {
    /// Create a filter error
    pub fn filter(msg: impl Into<String>) -> Self {
        DomainError::Filter(msg.into())
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
