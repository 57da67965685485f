//! Domain-level constants.
//!
//! Directory attribute names and the limits applied to filter input.

// =============================================================================
// Directory Attributes
// =============================================================================

/// User principal name attribute (sign-in name)
pub const ATTR_USER_PRINCIPAL_NAME: &str = "userPrincipalName";

/// Given name attribute
pub const ATTR_GIVEN_NAME: &str = "givenName";

/// Surname attribute
pub const ATTR_SURNAME: &str = "surname";

// =============================================================================
// Filter Expressions
// =============================================================================

/// Keyword joining sub-predicates of a filter expression
pub const FILTER_JOIN: &str = " and ";

/// Maximum length (in characters) of a single filter value
pub const MAX_FILTER_VALUE_LENGTH: usize = 256;
