//! Login flow endpoints.
//!
//! A login runs over independent requests:
//! - `GET /{provider}/login` redirects the browser to the provider with a `state`
//! - `GET /{provider}/callback` exchanges the code and issues the session cookie
//! - `POST /logout` destroys the session
//!
//! Nothing about a flow is held here between requests except, when state
//! enforcement is on, the pending `state` values in
//! [`StateStore`](crate::auth::StateStore) and the matching state cookie.

use crate::{
    AppResources,
    auth::{Identity, ProviderError, STATE_COOKIE_NAME},
    error::{AuthError, ErrorBody},
    session::random_token,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const AUTH_TAG: &str = "Authentication";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProvidersResponse {
    pub providers: Vec<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginParams {
    /// Opaque value echoed back at the callback. Generated when absent, and
    /// always generated when state enforcement is on.
    pub state: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Authorization code issued by the provider.
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallbackResponse {
    pub state: String,
    pub identity: Identity,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogoutParams {
    /// Where the client should go next. Defaults to the public base URL.
    #[serde(rename = "return")]
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
    pub return_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

/// Creates the auth router.
pub fn router(resources: AppResources) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_providers))
        .routes(routes!(login))
        .routes(routes!(callback))
        .routes(routes!(logout))
        .routes(routes!(session))
        .with_state(resources)
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/providers",
    tag = AUTH_TAG,
    operation_id = "List Auth Providers",
    summary = "List registered identity providers",
    responses(
        (status = 200, description = "Registered provider names in lexicographic order", body = ProvidersResponse)
    )
)]
async fn list_providers(State(resources): State<AppResources>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: resources.registry.list(),
    })
}

#[tracing::instrument(skip(resources, params, jar))]
#[utoipa::path(
    get,
    path = "/{provider}/login",
    tag = AUTH_TAG,
    operation_id = "Start Login",
    summary = "Redirect to the provider's authorization page",
    description = "Resolves the provider and redirects the browser to its authorization URL. \
                   A random `state` is generated when the caller does not supply one. With state \
                   enforcement on, the state is always generated, recorded as pending and bound to \
                   the browser with a short-lived cookie.",
    params(
        ("provider" = String, Path, description = "Provider name (case-insensitive)"),
        LoginParams
    ),
    responses(
        (status = 307, description = "Redirect to the provider"),
        (status = 404, description = "Provider is not registered", body = ErrorBody),
        (status = 501, description = "Provider has no credentials configured", body = ErrorBody),
        (status = 503, description = "Too many logins are pending", body = ErrorBody),
    )
)]
async fn login(
    State(resources): State<AppResources>,
    Path(provider_name): Path<String>,
    Query(params): Query<LoginParams>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AuthError> {
    let provider = resources.provider(&provider_name)?;
    let enforce = resources.config.auth.state.enforce;

    // Caller-supplied states are only echoed when nothing checks them.
    let state = match params.state.filter(|s| !s.is_empty()) {
        Some(state) if !enforce => state,
        _ => random_token()?,
    };

    let auth_url = provider.auth_code_url(&state).map_err(|err| {
        tracing::warn!(provider = %provider_name, error = %err, "auth_login_not_configured");
        AuthError::from(err)
    })?;

    if !enforce {
        return Ok((jar, Redirect::temporary(&auth_url)));
    }

    resources.states.record(&state).map_err(|err| {
        tracing::warn!(provider = %provider_name, error = %err, "auth_login_rejected");
        AuthError::from(err)
    })?;
    let cookie = state_cookie(&resources, state);
    Ok((jar.add(cookie), Redirect::temporary(&auth_url)))
}

/// HttpOnly cookie tying a pending state to the browser that started the login.
fn state_cookie(resources: &AppResources, state: String) -> Cookie<'static> {
    let max_age = time::Duration::try_from(resources.states.ttl()).unwrap_or(time::Duration::MAX);
    Cookie::build((STATE_COOKIE_NAME, state))
        .path("/auth")
        .http_only(true)
        .secure(resources.config.cookie_secure())
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

#[tracing::instrument(skip(resources, jar, params))]
#[utoipa::path(
    get,
    path = "/{provider}/callback",
    tag = AUTH_TAG,
    operation_id = "Complete Login",
    summary = "Exchange the authorization code and start a session",
    description = "Exchanges `code` with the provider, stores the resulting identity in a new session \
                   and sets the session cookie. The received `state` is echoed back.",
    params(
        ("provider" = String, Path, description = "Provider name (case-insensitive)"),
        CallbackParams
    ),
    responses(
        (status = 200, description = "Session created", body = CallbackResponse),
        (status = 400, description = "Missing code or rejected state", body = ErrorBody),
        (status = 404, description = "Provider is not registered", body = ErrorBody),
        (status = 500, description = "Session could not be created", body = ErrorBody),
        (status = 501, description = "Provider has no credentials configured", body = ErrorBody),
        (status = 502, description = "Code exchange with the provider failed", body = ErrorBody),
    )
)]
async fn callback(
    State(resources): State<AppResources>,
    Path(provider_name): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<CallbackResponse>), AuthError> {
    let provider = resources.provider(&provider_name)?;

    let code = params.code.unwrap_or_default();
    if code.is_empty() {
        return Err(AuthError::invalid_request(
            "missing_code",
            "query parameter `code` is required",
        ));
    }

    let state = params.state.unwrap_or_default();
    let jar = check_state(&resources, &state, jar)?;

    // Dropping this future (client gone) abandons the exchange as well.
    let timeout = resources.config.auth.exchange_timeout();
    let exchanged = match tokio::time::timeout(timeout, provider.exchange(&code)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout)),
    };
    let identity = exchanged.map_err(|err| {
        tracing::error!(provider = %provider_name, error = %err, "auth_exchange_failed");
        AuthError::from(err)
    })?;

    let (_, cookie) = resources.sessions.create(identity.clone()).map_err(|err| {
        tracing::error!(error = %err, "create_session_failed");
        AuthError::from(err)
    })?;

    Ok((jar.add(cookie), Json(CallbackResponse { state, identity })))
}

/// With enforcement on, `state` must match both the browser's state cookie and
/// a pending login, and is consumed. Returns the jar with the state cookie
/// cleared. Without enforcement the state is only echoed.
fn check_state(
    resources: &AppResources,
    state: &str,
    jar: CookieJar,
) -> Result<CookieJar, AuthError> {
    if !resources.config.auth.state.enforce {
        return Ok(jar);
    }

    let bound = jar
        .get(STATE_COOKIE_NAME)
        .is_some_and(|cookie| cookie.value() == state);
    if !bound || state.is_empty() || !resources.states.consume(state) {
        tracing::warn!(bound, "callback state missing, unknown or already used");
        return Err(AuthError::invalid_request(
            "invalid_state",
            "state does not match a pending login",
        ));
    }
    Ok(jar.remove(Cookie::build(STATE_COOKIE_NAME).path("/auth")))
}

#[tracing::instrument(skip(resources, jar, params))]
#[utoipa::path(
    post,
    path = "/logout",
    tag = AUTH_TAG,
    operation_id = "Logout",
    summary = "Destroy the current session",
    description = "Removes the session (if any) and clears the session cookie. Safe to call without a session.",
    params(LogoutParams),
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
        (status = 400, description = "`return` is not a valid URL", body = ErrorBody),
    )
)]
async fn logout(
    State(resources): State<AppResources>,
    Query(params): Query<LogoutParams>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), AuthError> {
    let return_url = params
        .return_url
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| resources.config.public_base_url.clone());
    validate_return_url(&return_url, &resources.config.public_base_url)?;

    let cleared = match resources.sessions.token_from_jar(&jar) {
        Some(token) => resources.sessions.destroy(&token),
        None => resources.sessions.clearing_cookie(),
    };

    Ok((
        jar.add(cleared),
        Json(LogoutResponse {
            message: "logged_out".into(),
            return_url,
        }),
    ))
}

/// Accepts absolute URLs and references that resolve against `base`.
fn validate_return_url(raw: &str, base: &str) -> Result<(), AuthError> {
    let invalid = |e: url::ParseError| {
        AuthError::invalid_request(
            "invalid_return_url",
            format!("`return` is not a valid URL: {e}"),
        )
    };
    match Url::parse(raw) {
        Ok(_) => Ok(()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base)
            .and_then(|base| base.join(raw))
            .map(|_| ())
            .map_err(invalid),
        Err(e) => Err(invalid(e)),
    }
}

#[tracing::instrument(skip(resources, jar))]
#[utoipa::path(
    get,
    path = "/session",
    tag = AUTH_TAG,
    operation_id = "Current Session",
    summary = "Describe the current session",
    responses(
        (status = 200, description = "Authentication status and identity, if any", body = SessionResponse)
    )
)]
async fn session(State(resources): State<AppResources>, jar: CookieJar) -> Json<SessionResponse> {
    let identity = resources.sessions.identity_from_jar(&jar);
    Json(SessionResponse {
        authenticated: identity.is_some(),
        identity,
    })
}
