//! OpenAPI/Utoipa configuration.

use crate::api::{auth::AUTH_TAG, health::MISC_TAG};
use crate::session::DEFAULT_COOKIE_NAME;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

/// Documents the session cookie as the API's credential.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    #[tracing::instrument(skip(self, openapi))]
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let cookie = ApiKey::Cookie(ApiKeyValue::with_description(
                DEFAULT_COOKIE_NAME,
                "Session cookie issued by `/auth/{provider}/callback`.",
            ));
            components.add_security_scheme("SessionCookie", SecurityScheme::ApiKey(cookie));
        }
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Shanraq Auth API",
        version = "1.0.0",
        description = "Identity provider login, session cookies and session introspection."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = AUTH_TAG, description = "Login, callback, logout and session endpoints")
    )
)]
pub struct ApiDoc;
