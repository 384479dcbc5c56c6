use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};

use stockroom_auth::{SESSION_COOKIE, SessionClaims, SessionSigner, User};
use stockroom_core::Entity;
use stockroom_infra::store::Documents;

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

/// Lifetime of a session cookie.
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Clone)]
pub struct AuthState {
    pub signer: SessionSigner,
    pub docs: Documents,
    /// Skip the user lookup and trust the signed claims.
    pub trust_cookie: bool,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session(req.headers()).ok_or_else(|| ApiError::unauthorized("not authenticated"))?;
    let claims = state.signer.verify(token, Utc::now())?;

    let principal = if state.trust_cookie {
        PrincipalContext::from(claims)
    } else {
        let user = state
            .docs
            .get::<User>(claims.id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("user not found"))?
            .into_inner();
        PrincipalContext::new(claims.id, user.email(), user.role())
    };

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Value of the session cookie, if the request carries one.
pub fn extract_session(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Sign a fresh session for `user` and build its `Set-Cookie` header.
pub fn issue_session(signer: &SessionSigner, user: &User) -> Result<HeaderValue, ApiError> {
    let claims = SessionClaims::new(
        user.id(),
        user.email(),
        user.role(),
        Utc::now(),
        Duration::hours(SESSION_TTL_HOURS),
    );
    let token = signer.sign(&claims)?;
    cookie_header(&token, SESSION_TTL_HOURS * 3600)
}

/// `Set-Cookie` header that removes the session cookie.
pub fn clear_session() -> Result<HeaderValue, ApiError> {
    cookie_header("", 0)
}

fn cookie_header(value: &str, max_age: i64) -> Result<HeaderValue, ApiError> {
    let cookie = format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    HeaderValue::from_str(&cookie).map_err(|_| ApiError::bad_request("invalid session cookie"))
}
