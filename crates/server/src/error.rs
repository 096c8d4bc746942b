use crate::auth::{ProviderError, StateError};
use crate::session::SessionError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Failures of the login flow as seen by HTTP clients.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth provider `{0}` is not registered")]
    ProviderNotFound(String),
    #[error("auth provider not configured")]
    NotConfigured,
    #[error("invalid request: {description}")]
    InvalidRequest {
        error: &'static str,
        description: String,
    },
    #[error("code exchange failed: {0}")]
    UpstreamExchange(String),
    #[error("session creation failed: {0}")]
    SessionCreation(String),
    #[error("login capacity exceeded: {0}")]
    LoginCapacity(String),
}

impl AuthError {
    pub fn invalid_request(error: &'static str, description: impl Into<String>) -> Self {
        Self::InvalidRequest {
            error,
            description: description.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::ProviderNotFound(_) => StatusCode::NOT_FOUND,
            AuthError::NotConfigured => StatusCode::NOT_IMPLEMENTED,
            AuthError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            AuthError::UpstreamExchange(_) => StatusCode::BAD_GATEWAY,
            AuthError::SessionCreation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::LoginCapacity(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable code placed in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::ProviderNotFound(_) => "provider_not_configured",
            AuthError::NotConfigured => "auth_not_configured",
            AuthError::InvalidRequest { error, .. } => *error,
            AuthError::UpstreamExchange(_) => "exchange_failed",
            AuthError::SessionCreation(_) => "session_error",
            AuthError::LoginCapacity(_) => "too_many_pending_logins",
        }
    }

    fn description(&self) -> Option<String> {
        match self {
            AuthError::ProviderNotFound(_) => None,
            AuthError::NotConfigured => {
                Some("Authentication provider is not configured yet.".into())
            }
            AuthError::InvalidRequest { description, .. } => Some(description.clone()),
            // upstream and internal details stay in the logs
            AuthError::UpstreamExchange(_) | AuthError::SessionCreation(_) => None,
            AuthError::LoginCapacity(_) => {
                Some("Too many logins are in progress, try again shortly.".into())
            }
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured => AuthError::NotConfigured,
            other => AuthError::UpstreamExchange(other.to_string()),
        }
    }
}

impl From<StateError> for AuthError {
    fn from(err: StateError) -> Self {
        AuthError::LoginCapacity(err.to_string())
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        AuthError::SessionCreation(err.to_string())
    }
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Error code (e.g., "missing_code", "exchange_failed")
    pub error: String,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code().to_string(),
            error_description: self.description(),
        };
        (self.status(), Json(body)).into_response()
    }
}
