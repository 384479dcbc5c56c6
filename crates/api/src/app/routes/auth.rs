use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{StatusCode, header},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use stockroom_auth::{RegisterUser, Role, User, normalize_email};
use stockroom_core::{DomainError, UserId};
use stockroom_infra::DispatchError;

use crate::app::dto::{self, LoginRequest, RegisterRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;
use crate::middleware;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult {
    let email = dto::required("email", body.email)?;
    let password = dto::required("password", body.password)?;
    let role: Role = dto::required("role", body.role)?.parse()?;

    let user = User::register(RegisterUser {
        user_id: UserId::new(),
        email,
        name: body.name,
        password,
        role,
        occurred_at: Utc::now(),
    })?;

    if services.docs().find_unique::<User>(user.email()).await?.is_some() {
        return Err(DomainError::conflict("a user with this email already exists").into());
    }
    services.dispatcher.create(user.clone()).await?;
    tracing::info!(email = user.email(), role = %user.role(), "user registered");

    let cookie = middleware::issue_session(&services.signer, &user)?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "registered", "user": user.profile() })),
    )
        .into_response())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult {
    let email = normalize_email(&dto::required("email", body.email)?);
    let password = dto::required("password", body.password)?;

    let user = services
        .docs()
        .find_unique::<User>(&email)
        .await?
        .map(|v| v.into_inner())
        .filter(|user| user.verify_password(&password))
        .ok_or_else(|| ApiError::unauthorized("invalid email or password"))?;

    let cookie = middleware::issue_session(&services.signer, &user)?;
    tracing::info!(email = user.email(), "user logged in");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "logged in", "user": user.profile() })),
    )
        .into_response())
}

pub async fn logout() -> ApiResult {
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, middleware::clear_session()?)],
        Json(json!({ "message": "logged out" })),
    )
        .into_response())
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    let user = services.dispatcher.load::<User>(principal.user_id()).await;
    let body = match user {
        Ok(user) => json!({ "user": user.value.profile() }),
        // Trusted sessions may outlive the account; answer from the claims.
        Err(DispatchError::Domain(DomainError::NotFound(_))) if services.trust_cookie => json!({
            "user": {
                "id": principal.user_id(),
                "email": principal.email(),
                "role": principal.role(),
            }
        }),
        Err(e) => return Err(e.into()),
    };
    Ok(Json(body).into_response())
}
