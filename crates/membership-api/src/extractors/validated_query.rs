//! Validated query-string extractor.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use common::AppError;

/// Query extractor that validates the parsed parameters.
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;

        value.validate().map_err(|e| {
            // First field error wins
            let message = e
                .field_errors()
                .values()
                .next()
                .and_then(|errors| errors.first())
                .and_then(|error| error.message.as_ref())
                .map(|msg| msg.to_string())
                .unwrap_or_else(|| "Validation failed".to_string());
            AppError::validation(message)
        })?;

        Ok(ValidatedQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Params {
        #[validate(length(max = 4, message = "name is too long"))]
        name: Option<String>,
    }

    async fn extract(uri: &str) -> Result<ValidatedQuery<Params>, AppError> {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        ValidatedQuery::<Params>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_query() {
        let ValidatedQuery(params) = extract("/?name=abc").await.unwrap();
        assert_eq!(params.name.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_missing_parameter_is_allowed() {
        let ValidatedQuery(params) = extract("/").await.unwrap();
        assert!(params.name.is_none());
    }

    #[tokio::test]
    async fn test_invalid_query_is_rejected() {
        let result = extract("/?name=abcdef").await;
        assert!(matches!(result, Err(AppError::Validation(ref msg)) if msg == "name is too long"));
    }
}
