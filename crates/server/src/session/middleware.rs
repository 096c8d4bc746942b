//! Per-request session resolution.
//!
//! The middleware never rejects. Handlers that need a signed-in user check
//! [`CurrentIdentity`] themselves.

use super::SessionManager;
use crate::auth::Identity;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::convert::Infallible;
use std::sync::Arc;

/// Resolves the session cookie and stores the [`Identity`] in the request
/// extensions when the session is live.
///
/// ```ignore
/// router.layer(axum::middleware::from_fn_with_state(sessions, resolve_session))
/// ```
pub async fn resolve_session(
    State(sessions): State<Arc<SessionManager>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(identity) = sessions.identity_from_jar(&jar) {
        tracing::debug!(subject = %identity.subject, "request authenticated by session");
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}

/// Identity resolved by [`resolve_session`], `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentIdentity(parts.extensions.get::<Identity>().cloned()))
    }
}
