//! Error types and handling
//!
//! Every failure the bridge can produce is an [`AppError`]. Precondition
//! failures of the command adapter, storage and transport faults, and the
//! HTTP surface errors all share the same JSON response shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// No action handler is registered under the requested name (404)
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The tenant is unknown or no longer accessible (404)
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// The actor is not a member of the tenant (403)
    #[error("Actor {actor_id} is not a member of tenant {tenant_id}")]
    ActorNotInTenant { tenant_id: String, actor_id: String },

    /// The feature owning the action is disabled for the tenant (403)
    #[error("Feature '{feature}' is disabled for tenant {tenant_id}")]
    FeatureDisabled { tenant_id: String, feature: String },

    /// Bad request - invalid input (400)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Persistence failure (500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Bridge connect/publish failure (503)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Raised by an action's own logic (500)
    #[error("{0}")]
    Handler(String),

    /// Missing or mismatched service credential (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable snake_case identifier for programmatic handling
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::UnknownAction(_) => "unknown_action",
            AppError::TenantNotFound(_) => "tenant_not_found",
            AppError::ActorNotInTenant { .. } => "actor_not_in_tenant",
            AppError::FeatureDisabled { .. } => "feature_disabled",
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::Storage(_) => "storage_error",
            AppError::Transport(_) => "transport_error",
            AppError::Handler(_) => "handler_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Config(_) => "config_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Whether the error was rejected before any handler ran
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AppError::UnknownAction(_)
                | AppError::TenantNotFound(_)
                | AppError::ActorNotInTenant { .. }
                | AppError::FeatureDisabled { .. }
                | AppError::InvalidArgument(_)
        )
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidArgument(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownAction(_) | AppError::TenantNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ActorNotInTenant { .. } | AppError::FeatureDisabled { .. } => {
                StatusCode::FORBIDDEN
            }
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_)
            | AppError::Handler(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Always `false`; mirrors the success flag of invocation results
    pub success: bool,
    /// Human-readable error message
    pub error: String,
    /// Error kind for programmatic handling
    pub code: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Add details to the error response
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, error_type = self.kind(), "Request error");
        }

        let body = ErrorResponse::new(self.kind(), self.to_string());

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidArgument(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidArgument(err.to_string())
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;
