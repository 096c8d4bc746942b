//! Built-in providers.
//!
//! Real OAuth integrations implement [`Provider`] in their own modules; the two
//! here cover "nothing configured yet" and local development.

use super::{Identity, Provider, ProviderError, normalize_name};
use async_trait::async_trait;

/// Placeholder bound for provider names that have no credentials yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotConfiguredProvider;

#[async_trait]
impl Provider for NotConfiguredProvider {
    fn auth_code_url(&self, _state: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured)
    }

    async fn exchange(&self, _code: &str) -> Result<Identity, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}

/// Simulated OAuth provider that immediately redirects to its own callback.
///
/// The identity is derived from the code alone, so the same code always yields
/// the same subject, email and name. Never performs I/O.
#[derive(Debug, Clone)]
pub struct DemoProvider {
    name: String,
}

impl DemoProvider {
    pub const EMAIL_DOMAIN: &'static str = "demo.shanraq.com";

    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_name(name),
        }
    }
}

#[async_trait]
impl Provider for DemoProvider {
    fn auth_code_url(&self, state: &str) -> Result<String, ProviderError> {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("code", &format!("demo-{}-user", self.name));
        if !state.is_empty() {
            query.append_pair("state", state);
        }
        Ok(format!("/auth/{}/callback?{}", self.name, query.finish()))
    }

    async fn exchange(&self, code: &str) -> Result<Identity, ProviderError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ProviderError::InvalidCode);
        }
        let slug = code.replace(' ', "-");
        let display = code.strip_prefix("demo-").unwrap_or(code).replace('-', " ");

        Ok(Identity {
            subject: format!("demo-{}-{}", self.name, slug),
            email: format!("{slug}@{}", Self::EMAIL_DOMAIN),
            full_name: title_case(&display),
            picture_url: String::new(),
            provider: self.name.clone(),
            access_token: format!("token-{code}"),
        })
    }
}

/// Upper-cases the first letter of every word. Anything that is not
/// alphanumeric or `_` separates words.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}
