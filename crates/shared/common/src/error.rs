//! Unified error handling.
//!
//! Provides a single error type for everything crossing the HTTP boundary.
//! Errors raised by a directory call carry the [`Stage`] that failed, so
//! callers can tell token acquisition apart from user listing or group
//! resolution.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Step of a membership lookup that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    TokenAcquisition,
    UserListing,
    MembershipListing,
    GroupResolution,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::TokenAcquisition => "token acquisition",
            Stage::UserListing => "user listing",
            Stage::MembershipListing => "membership listing",
            Stage::GroupResolution => "group resolution",
        };
        f.write_str(name)
    }
}

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication
    #[error("Token acquisition failed: {0}")]
    Auth(String),

    // Resource errors
    #[error("{resource} not found during {stage}")]
    NotFound { stage: Stage, resource: String },

    // Directory service errors
    #[error("Directory service error during {stage}: {message}")]
    Upstream {
        stage: Stage,
        /// Upstream HTTP status, absent for transport and decoding failures
        status: Option<u16>,
        message: String,
    },

    // Validation
    #[error("{0}")]
    Filter(String),

    #[error("{0}")]
    Validation(String),

    // Startup
    #[error("Configuration error: {0}")]
    Config(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body for HTTP
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Upstream { .. } => "UPSTREAM_ERROR",
            AppError::Filter(_) => "FILTER_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Upstream {
                status: Some(429 | 503),
                ..
            } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Filter(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stage of the lookup that failed, if the error came from one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AppError::Auth(_) => Some(Stage::TokenAcquisition),
            AppError::NotFound { stage, .. } | AppError::Upstream { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Filter(msg) | AppError::Validation(msg) => msg.clone(),

            AppError::Auth(msg) => {
                tracing::warn!("Token acquisition failed: {}", msg);
                self.to_string()
            }
            AppError::Upstream { stage, status, message } => {
                tracing::warn!(%stage, ?status, "Directory service error: {}", message);
                self.to_string()
            }

            // Hide details for internal errors
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                "The service is misconfigured".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }
}

// =============================================================================
// HTTP Response (Axum)
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
                stage: self.stage(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Filter(msg) => AppError::Filter(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors
impl AppError {
    pub fn auth(msg: impl Into<String>) -> Self {
        AppError::Auth(msg.into())
    }

    pub fn not_found(stage: Stage, resource: impl Into<String>) -> Self {
        AppError::NotFound {
            stage,
            resource: resource.into(),
        }
    }

    pub fn upstream(stage: Stage, status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::Upstream {
            stage,
            status,
            message: message.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
