//! In-memory session store.
//!
//! Tokens are 256-bit random values, URL-safe base64 without padding, carried
//! in an `HttpOnly` cookie. Expiry is fixed at creation (no sliding window) and
//! checked on every lookup; [`SessionManager::purge_expired`] reclaims entries
//! that are never looked up again.

use crate::auth::Identity;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use time::OffsetDateTime;

pub const DEFAULT_COOKIE_NAME: &str = "shanraq_session";
pub const DEFAULT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("secure random source unavailable: {0}")]
    Entropy(String),
}

/// Generate a secure random token.
///
/// Fails instead of falling back to a weaker source when the OS RNG is
/// unavailable.
pub fn random_token() -> Result<String, SessionError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::fill(&mut bytes).map_err(|e| SessionError::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[derive(Debug, Clone)]
struct SessionEntry {
    identity: Identity,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct SessionManager {
    store: DashMap<String, SessionEntry>,
    ttl: Duration,
    cookie_name: String,
    cookie_secure: bool,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_COOKIE_NAME)
    }
}

impl SessionManager {
    /// A zero `ttl` or empty `cookie_name` falls back to the defaults.
    pub fn new(ttl: Duration, cookie_name: &str) -> Self {
        Self {
            store: DashMap::new(),
            ttl: if ttl.is_zero() { DEFAULT_TTL } else { ttl },
            cookie_name: if cookie_name.is_empty() {
                DEFAULT_COOKIE_NAME.to_owned()
            } else {
                cookie_name.to_owned()
            },
            cookie_secure: false,
        }
    }

    /// Sets the `Secure` attribute on issued cookies.
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Stores `identity` under a fresh token and returns the token together
    /// with the cookie that carries it.
    pub fn create(&self, identity: Identity) -> Result<(String, Cookie<'static>), SessionError> {
        let token = random_token()?;
        tracing::info!(
            subject = %identity.subject,
            provider = %identity.provider,
            ttl_secs = self.ttl.as_secs(),
            "session created"
        );
        self.store.insert(
            token.clone(),
            SessionEntry {
                identity,
                expires_at: Instant::now() + self.ttl,
            },
        );
        let cookie = self.session_cookie(token.clone());
        Ok((token, cookie))
    }

    /// Identity bound to `token`, if the session exists and has not expired.
    /// An expired entry is removed on the way out.
    pub fn identity(&self, token: &str) -> Option<Identity> {
        let now = Instant::now();
        match self.store.get(token) {
            None => return None,
            Some(entry) if now < entry.expires_at => return Some(entry.identity.clone()),
            Some(_) => {}
        }
        self.store.remove_if(token, |_, entry| now >= entry.expires_at);
        None
    }

    /// Removes the session (if any) and returns a cookie that clears it.
    pub fn destroy(&self, token: &str) -> Cookie<'static> {
        if self.store.remove(token).is_some() {
            tracing::info!("session destroyed");
        }
        self.clearing_cookie()
    }

    /// Session token carried by the request's cookies. A missing or empty
    /// cookie means "no token".
    pub fn token_from_jar(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.cookie_name)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty())
    }

    /// Identity for the request's session cookie.
    pub fn identity_from_jar(&self, jar: &CookieJar) -> Option<Identity> {
        self.token_from_jar(jar)
            .and_then(|token| self.identity(&token))
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.store.len();
        self.store.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.store.len())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn session_cookie(&self, token: String) -> Cookie<'static> {
        let max_age = time::Duration::try_from(self.ttl).unwrap_or(time::Duration::MAX);
        let mut cookie = Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build();
        if let Some(expires) = OffsetDateTime::now_utc().checked_add(max_age) {
            cookie.set_expires(expires);
        }
        cookie
    }

    /// Cookie that makes the browser drop its session cookie.
    pub fn clearing_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn identity(subject: &str) -> Identity {
        Identity {
            subject: subject.into(),
            email: format!("{subject}@example.com"),
            full_name: "Test User".into(),
            provider: "demo".into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_then_lookup_round_trips() {
        let manager = SessionManager::new(Duration::from_secs(3600), "");
        let original = identity("user-123");
        let (token, _) = manager.create(original.clone()).unwrap();

        assert!(!token.is_empty());
        assert_eq!(manager.identity(&token), Some(original));
    }

    #[test]
    fn cookie_attributes() {
        let manager = SessionManager::default();
        let (token, cookie) = manager.create(identity("u1")).unwrap();

        assert_eq!(cookie.name(), "shanraq_session");
        assert_eq!(cookie.value(), token);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(12)));
        assert!(cookie.expires_datetime().is_some());
    }

    #[test]
    fn secure_flag_is_configurable() {
        let manager = SessionManager::new(DEFAULT_TTL, "sid").with_secure_cookie(true);
        let (_, cookie) = manager.create(identity("u1")).unwrap();
        assert_eq!(cookie.name(), "sid");
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn token_is_cookie_safe() {
        let token = random_token().unwrap();
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn destroy_removes_session() {
        let manager = SessionManager::default();
        let (token, _) = manager.create(identity("destroy-me")).unwrap();

        let cleared = manager.destroy(&token);
        assert_eq!(manager.identity(&token), None);
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.max_age(), Some(time::Duration::ZERO));

        // idempotent
        manager.destroy(&token);
        manager.destroy("never-existed");
    }

    #[test]
    fn expired_session_is_absent_and_evicted() {
        let manager = SessionManager::new(Duration::from_millis(10), "");
        let (token, _) = manager.create(identity("expiring-user")).unwrap();
        assert_eq!(manager.len(), 1);

        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(manager.identity(&token), None);
        assert!(manager.is_empty());
    }

    #[test]
    fn lookup_does_not_extend_ttl() {
        let manager = SessionManager::new(Duration::from_millis(40), "");
        let (token, _) = manager.create(identity("u1")).unwrap();

        std::thread::sleep(Duration::from_millis(25));
        assert!(manager.identity(&token).is_some());
        std::thread::sleep(Duration::from_millis(25));
        assert!(manager.identity(&token).is_none());
    }

    #[test]
    fn purge_removes_only_expired() {
        let manager = SessionManager::new(Duration::from_millis(10), "");
        manager.create(identity("a")).unwrap();
        manager.create(identity("b")).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let long_lived = SessionManager::new(Duration::from_secs(60), "");
        long_lived.create(identity("c")).unwrap();

        assert_eq!(manager.purge_expired(), 2);
        assert!(manager.is_empty());
        assert_eq!(long_lived.purge_expired(), 0);
        assert_eq!(long_lived.len(), 1);
    }

    #[test]
    fn tokens_are_unique() {
        let manager = SessionManager::default();
        let tokens: HashSet<String> = (0..10_000)
            .map(|i| manager.create(identity(&format!("u{i}"))).unwrap().0)
            .collect();
        assert_eq!(tokens.len(), 10_000);
        assert_eq!(manager.len(), 10_000);
    }

    #[test]
    fn jar_without_cookie_has_no_token() {
        let manager = SessionManager::default();
        let jar = CookieJar::new();
        assert_eq!(manager.token_from_jar(&jar), None);

        let jar = jar.add(Cookie::new("other", "value"));
        assert_eq!(manager.identity_from_jar(&jar), None);
    }

    #[test]
    fn jar_lookup_resolves_identity() {
        let manager = SessionManager::default();
        let (token, cookie) = manager.create(identity("u1")).unwrap();
        let jar = CookieJar::new().add(cookie);

        assert_eq!(manager.token_from_jar(&jar), Some(token));
        assert_eq!(manager.identity_from_jar(&jar).unwrap().subject, "u1");
    }

    #[test]
    fn concurrent_sessions_round_trip() {
        let manager = Arc::new(SessionManager::default());
        let handles: Vec<_> = (0..16)
            .map(|t| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let subject = format!("t{t}-{i}");
                        let (token, _) = manager.create(identity(&subject)).unwrap();
                        assert_eq!(manager.identity(&token).unwrap().subject, subject);
                        manager.destroy(&token);
                        assert!(manager.identity(&token).is_none());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(manager.is_empty());
    }
}
