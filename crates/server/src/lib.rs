//! Identity and session management for the shanraq marketplace.
//!
//! External identity providers sit behind the [`auth::Provider`] trait and are
//! looked up by name in an [`auth::ProviderRegistry`]. A successful login is
//! turned into an opaque, cookie-bound session by [`session::SessionManager`];
//! [`session::resolve_session`] makes the resulting [`auth::Identity`]
//! available to every downstream handler.

use std::sync::Arc;

use crate::auth::{DemoProvider, Provider, ProviderRegistry, StateStore};
use crate::config::{AppConfig, AuthConfig};
use crate::error::AuthError;
use crate::session::SessionManager;

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod session;

/// Process-wide auth components, built once at start-up and shared by handle.
#[derive(Clone, Debug)]
pub struct AppResources {
    pub registry: Arc<ProviderRegistry>,
    pub sessions: Arc<SessionManager>,
    pub states: Arc<StateStore>,
    pub config: Arc<AppConfig>,
}

impl AppResources {
    pub fn new(config: AppConfig) -> Self {
        let registry = build_registry(&config.auth);
        let sessions = SessionManager::new(
            config.auth.session.ttl(),
            &config.auth.session.cookie_name,
        )
        .with_secure_cookie(config.cookie_secure());
        let states = StateStore::new(config.auth.state.ttl(), config.auth.state.max_pending);

        Self {
            registry: Arc::new(registry),
            sessions: Arc::new(sessions),
            states: Arc::new(states),
            config: Arc::new(config),
        }
    }

    /// Provider bound to `name`, or [`AuthError::ProviderNotFound`].
    pub fn provider(&self, name: &str) -> Result<Arc<dyn Provider>, AuthError> {
        self.registry.get(name).map_err(|err| {
            tracing::warn!(provider = %name, error = %err, "auth_provider_not_available");
            AuthError::ProviderNotFound(name.to_owned())
        })
    }
}

/// Registers every configured provider name, first as a not-configured
/// placeholder, then (in demo mode) bound to [`DemoProvider`].
pub fn build_registry(auth: &AuthConfig) -> ProviderRegistry {
    let names = auth.provider_names();
    let registry = ProviderRegistry::with_placeholders(&names);
    if auth.demo_mode {
        for name in &names {
            registry.register(name, Arc::new(DemoProvider::new(name)));
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_mode_binds_demo_providers() {
        let mut auth = AuthConfig::default();
        auth.provider = "Acme".into();
        let registry = build_registry(&auth);

        assert_eq!(registry.list(), vec!["acme", "facebook", "google"]);
        assert!(registry.get("acme").unwrap().auth_code_url("s").is_ok());
    }

    #[test]
    fn placeholders_without_demo_mode() {
        let auth = AuthConfig {
            demo_mode: false,
            ..Default::default()
        };
        let registry = build_registry(&auth);

        assert_eq!(registry.list(), vec!["facebook", "google"]);
        assert!(registry.get("google").unwrap().auth_code_url("s").is_err());
    }

    #[test]
    fn resources_apply_session_config() {
        let mut config = AppConfig {
            public_base_url: "https://shanraq.com".into(),
            ..Default::default()
        };
        config.auth.session.cookie_name = "sid".into();
        let resources = AppResources::new(config);

        assert_eq!(resources.sessions.cookie_name(), "sid");
        let (_, cookie) = resources
            .sessions
            .create(crate::auth::Identity::default())
            .unwrap();
        assert_eq!(cookie.secure(), Some(true));
        assert!(matches!(
            resources.provider("nope"),
            Err(AuthError::ProviderNotFound(_))
        ));
    }
}
