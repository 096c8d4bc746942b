use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::session::{DEFAULT_COOKIE_NAME, DEFAULT_TTL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Default logout destination. An `https` URL also turns on `Secure`
    /// session cookies unless `auth.session.cookie_secure` says otherwise.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Deployment environment; picks the default log level.
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            public_base_url: default_public_base_url(),
            environment: default_environment(),
            auth: AuthConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AuthConfig {
    /// Provider names registered at start-up.
    #[serde(default = "default_supported_providers")]
    pub supported_providers: Vec<String>,
    /// Primary provider, registered in addition to `supported_providers`.
    #[serde(default)]
    pub provider: String,
    /// Bind every provider name to the demo provider instead of leaving a
    /// not-configured placeholder.
    #[serde(default = "default_true")]
    pub demo_mode: bool,
    #[serde(default = "default_exchange_timeout_secs")]
    pub exchange_timeout_secs: u64,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub state: StateConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            supported_providers: default_supported_providers(),
            provider: String::new(),
            demo_mode: true,
            exchange_timeout_secs: default_exchange_timeout_secs(),
            session: SessionConfig::default(),
            state: StateConfig::default(),
        }
    }
}

impl AuthConfig {
    /// `supported_providers` plus `provider`, without blanks.
    pub fn provider_names(&self) -> Vec<String> {
        self.supported_providers
            .iter()
            .chain(std::iter::once(&self.provider))
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .collect()
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// `None` derives the flag from the scheme of `public_base_url`.
    #[serde(default)]
    pub cookie_secure: Option<bool>,
    /// Background purge interval; 0 disables the sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            cookie_name: default_cookie_name(),
            cookie_secure: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StateConfig {
    /// Reject callbacks whose `state` was not issued by a login on this
    /// server, or was already used.
    #[serde(default)]
    pub enforce: bool,
    #[serde(default = "default_state_ttl_secs")]
    pub ttl_secs: u64,
    /// Upper bound on logins awaiting their callback.
    #[serde(default = "default_state_max_pending")]
    pub max_pending: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            enforce: false,
            ttl_secs: default_state_ttl_secs(),
            max_pending: default_state_max_pending(),
        }
    }
}

impl StateConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl AppConfig {
    /// Effective `Secure` attribute for session cookies.
    pub fn cookie_secure(&self) -> bool {
        self.auth
            .session
            .cookie_secure
            .unwrap_or_else(|| self.public_base_url.starts_with("https://"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Validation(format!("listen_addr `{}`: {e}", self.listen_addr))
        })?;
        url::Url::parse(&self.public_base_url).map_err(|e| {
            ConfigError::Validation(format!("public_base_url `{}`: {e}", self.public_base_url))
        })?;

        let session = &self.auth.session;
        if session.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "auth.session.ttl_secs must be > 0".into(),
            ));
        }
        if !is_cookie_token(&session.cookie_name) {
            return Err(ConfigError::Validation(format!(
                "auth.session.cookie_name `{}` is not a valid cookie name",
                session.cookie_name
            )));
        }
        if self.auth.state.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "auth.state.ttl_secs must be > 0".into(),
            ));
        }
        if self.auth.state.max_pending == 0 {
            return Err(ConfigError::Validation(
                "auth.state.max_pending must be > 0".into(),
            ));
        }
        if self.auth.exchange_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "auth.exchange_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// RFC 6265 cookie-name: a non-empty HTTP token.
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_public_base_url() -> String {
    "http://localhost:8080".into()
}

fn default_environment() -> String {
    "development".into()
}

fn default_supported_providers() -> Vec<String> {
    vec!["google".into(), "facebook".into()]
}

fn default_true() -> bool {
    true
}

fn default_exchange_timeout_secs() -> u64 {
    15
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.into()
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_state_ttl_secs() -> u64 {
    600
}

fn default_state_max_pending() -> usize {
    10_000
}

/// Load application configuration from an optional `config.yaml` + environment overrides.
///
/// Environment variables override file values using the key path separated by
/// double underscores (e.g. `AUTH__SESSION__TTL_SECS`). Every key has a default,
/// so the file may be absent.
///
/// Returns a `ConfigError` instead of panicking so the caller can decide how to fail.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(
            Environment::default()
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("auth.supported_providers")
                .try_parsing(true),
        )
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.auth.session.ttl(), Duration::from_secs(12 * 60 * 60));
        assert_eq!(cfg.auth.session.cookie_name, "shanraq_session");
        assert!(!cfg.cookie_secure());
    }

    #[test]
    fn secure_cookie_follows_base_url_scheme() {
        let mut cfg = AppConfig {
            public_base_url: "https://shanraq.com".into(),
            ..Default::default()
        };
        assert!(cfg.cookie_secure());
        cfg.auth.session.cookie_secure = Some(false);
        assert!(!cfg.cookie_secure());
    }

    #[test]
    fn provider_names_skip_blank_primary() {
        let mut auth = AuthConfig::default();
        assert_eq!(auth.provider_names(), vec!["google", "facebook"]);
        auth.provider = "Demo".into();
        assert_eq!(auth.provider_names(), vec!["google", "facebook", "Demo"]);
    }

    #[test]
    fn rejects_bad_cookie_name() {
        let mut cfg = AppConfig::default();
        cfg.auth.session.cookie_name = "bad name;".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
        cfg.auth.session.cookie_name = String::new();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_zero_ttl() {
        let mut cfg = AppConfig::default();
        cfg.auth.session.ttl_secs = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_zero_pending_state_capacity() {
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.auth.state.max_pending, 10_000);
        cfg.auth.state.max_pending = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_unparseable_addresses() {
        let cfg = AppConfig {
            listen_addr: "not-an-addr".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = AppConfig {
            public_base_url: "/relative".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
