//! External identity providers.
//!
//! A [`Provider`] knows how to send a browser to an authorization page and how
//! to turn the code it comes back with into an [`Identity`]. Providers are kept
//! in a [`ProviderRegistry`] keyed by normalized name; the session layer never
//! talks to them directly.

pub mod provider;
pub mod registry;
pub mod state;

pub use provider::{DemoProvider, NotConfiguredProvider};
pub use registry::ProviderRegistry;
pub use state::{STATE_COOKIE_NAME, StateError, StateStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Verified user profile returned by a successful code exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Provider-scoped unique id
    pub subject: String,
    pub email: String,
    pub full_name: String,
    #[serde(rename = "pictureURL")]
    pub picture_url: String,
    pub provider: String,
    pub access_token: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("auth provider not configured")]
    NotConfigured,
    #[error("invalid code")]
    InvalidCode,
    #[error("code exchange failed: {0}")]
    Exchange(String),
    #[error("code exchange timed out after {0:?}")]
    Timeout(Duration),
}

/// Two-step external authentication capability.
///
/// Implementations must not touch session state. `exchange` may suspend on
/// network I/O; callers bound it with the request's lifetime and a deadline.
#[async_trait]
pub trait Provider: Send + Sync {
    /// URL the browser is redirected to in order to authorize. `state` is
    /// round-tripped back to the callback untouched.
    fn auth_code_url(&self, state: &str) -> Result<String, ProviderError>;

    /// Trade an authorization code for the user's identity.
    async fn exchange(&self, code: &str) -> Result<Identity, ProviderError>;
}

/// Canonical registry key: trimmed and lower-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
