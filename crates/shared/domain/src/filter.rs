//! User filter criteria and the directory filter expression built from them.

use crate::constants::{
    ATTR_GIVEN_NAME, ATTR_SURNAME, ATTR_USER_PRINCIPAL_NAME, FILTER_JOIN, MAX_FILTER_VALUE_LENGTH,
};
use crate::error::{DomainError, DomainResult};

/// Attributes a user listing can be filtered on.
///
/// Declaration order is the order clauses appear in the expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    UserPrincipalName,
    GivenName,
    Surname,
}

impl FilterField {
    /// Directory attribute name used in the filter expression
    pub fn attribute(&self) -> &'static str {
        match self {
            FilterField::UserPrincipalName => ATTR_USER_PRINCIPAL_NAME,
            FilterField::GivenName => ATTR_GIVEN_NAME,
            FilterField::Surname => ATTR_SURNAME,
        }
    }
}

impl std::fmt::Display for FilterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.attribute())
    }
}

/// Prefix predicates combined with logical AND.
///
/// Blank values are dropped on construction, so an absent predicate never
/// turns into a clause matching the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    user_principal_name: Option<String>,
    given_name: Option<String>,
    surname: Option<String>,
}

impl FilterCriteria {
    /// Build criteria from optional raw inputs, dropping blank ones.
    pub fn new(
        user_principal_name: Option<String>,
        given_name: Option<String>,
        surname: Option<String>,
    ) -> Self {
        Self {
            user_principal_name: non_blank(user_principal_name),
            given_name: non_blank(given_name),
            surname: non_blank(surname),
        }
    }

    pub fn with_user_principal_name(mut self, value: impl Into<String>) -> Self {
        self.user_principal_name = non_blank(Some(value.into()));
        self
    }

    pub fn with_given_name(mut self, value: impl Into<String>) -> Self {
        self.given_name = non_blank(Some(value.into()));
        self
    }

    pub fn with_surname(mut self, value: impl Into<String>) -> Self {
        self.surname = non_blank(Some(value.into()));
        self
    }

    /// Present predicates in expression order.
    pub fn predicates(&self) -> impl Iterator<Item = (FilterField, &str)> {
        [
            (FilterField::UserPrincipalName, self.user_principal_name.as_deref()),
            (FilterField::GivenName, self.given_name.as_deref()),
            (FilterField::Surname, self.surname.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
    }

    /// True when no predicate is present (the listing is unfiltered)
    pub fn is_empty(&self) -> bool {
        self.predicates().next().is_none()
    }

    /// Render the directory filter expression.
    ///
    /// Returns `Ok(None)` for empty criteria. Each present predicate becomes
    /// `startsWith(<attribute>, '<value>')`, joined with `and`.
    pub fn to_expression(&self) -> DomainResult<Option<String>> {
        let clauses = self
            .predicates()
            .map(|(field, value)| starts_with_clause(field, value))
            .collect::<DomainResult<Vec<_>>>()?;

        if clauses.is_empty() {
            Ok(None)
        } else {
            Ok(Some(clauses.join(FILTER_JOIN)))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn starts_with_clause(field: FilterField, value: &str) -> DomainResult<String> {
    if value.chars().count() > MAX_FILTER_VALUE_LENGTH {
        return Err(DomainError::filter(format!(
            "{} must be at most {} characters",
            field, MAX_FILTER_VALUE_LENGTH
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(DomainError::filter(format!(
            "{} contains control characters",
            field
        )));
    }

    // String literals are single-quoted; a quote is escaped by doubling it.
    let escaped = value.replace('\'', "''");
    Ok(format!("startsWith({}, '{}')", field.attribute(), escaped))
}
