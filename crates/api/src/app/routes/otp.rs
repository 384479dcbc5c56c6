//! One-time codes for e-mail verification and password reset.
//!
//! Codes are not mailed; they are written to the log for the operator.

use std::sync::Arc;

use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use stockroom_auth::{Otp, OtpPurpose, User, normalize_email};
use stockroom_core::{DomainError, Entity};
use stockroom_infra::store::{Documents, Versioned, WriteBatch};

use crate::app::dto::{self, OtpResetRequest, OtpSendRequest, OtpVerifyRequest};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/send", post(send_code))
        .route("/verify", post(verify_code))
        .route("/reset", post(reset_password))
}

async fn find_user(docs: &Documents, email: &str) -> ApiResult<Versioned<User>> {
    docs.find_unique::<User>(email)
        .await?
        .ok_or_else(|| DomainError::not_found("user").into())
}

/// The newest pending code for an address and purpose.
async fn latest_code(docs: &Documents, email: &str, purpose: OtpPurpose) -> ApiResult<Versioned<Otp>> {
    docs.list::<Otp>()
        .await?
        .into_iter()
        .find(|otp| otp.value.email() == email && otp.value.purpose() == purpose)
        .ok_or_else(|| DomainError::validation("invalid code").into())
}

/// Check `code` against the pending one. A failed attempt is persisted
/// before the error is returned.
async fn check_code(docs: &Documents, pending: &mut Versioned<Otp>, code: &str) -> ApiResult<()> {
    let before = pending.value.attempts();
    if let Err(e) = pending.value.check(code, Utc::now()) {
        if pending.value.attempts() != before {
            let mut batch = WriteBatch::new();
            batch.update(&pending.value, pending.expected())?;
            docs.commit(batch).await?;
        }
        return Err(DomainError::from(e).into());
    }
    Ok(())
}

pub async fn send_code(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<OtpSendRequest>,
) -> ApiResult {
    let email = normalize_email(&dto::required("email", body.email)?);
    let purpose: OtpPurpose = dto::required("type", body.purpose)?.parse()?;
    let docs = services.docs();
    find_user(docs, &email).await?;

    let otp = Otp::issue(email.clone(), purpose, Utc::now(), &mut rand::thread_rng());

    // Replace any earlier code for the same address and purpose.
    let mut batch = WriteBatch::new();
    for stale in docs.list::<Otp>().await? {
        if stale.value.email() == email && stale.value.purpose() == purpose {
            batch.delete::<Otp>(stale.value.id(), stale.expected());
        }
    }
    batch.insert(&otp)?;
    docs.commit(batch).await?;

    tracing::info!(
        email = %email,
        purpose = purpose.as_str(),
        code = otp.code(),
        expires_at = %otp.expires_at(),
        "one-time code issued"
    );
    Ok(Json(json!({ "message": "code sent" })).into_response())
}

pub async fn verify_code(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<OtpVerifyRequest>,
) -> ApiResult {
    let email = normalize_email(&dto::required("email", body.email)?);
    let code = dto::required("code", body.code)?;
    let purpose: OtpPurpose = dto::required("type", body.purpose)?.parse()?;
    let docs = services.docs();

    let mut pending = latest_code(docs, &email, purpose).await?;
    check_code(docs, &mut pending, &code).await?;

    if purpose == OtpPurpose::Verify {
        let user = find_user(docs, &email).await?;
        let expected = user.expected();
        let mut user = user.into_inner();
        user.mark_email_verified(Utc::now());

        let mut batch = WriteBatch::new();
        batch.update(&user, expected)?;
        batch.delete::<Otp>(pending.value.id(), pending.expected());
        docs.commit(batch).await?;
        tracing::info!(email = %email, "email verified");
    }

    Ok(Json(json!({ "message": "code verified", "verified": true })).into_response())
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<OtpResetRequest>,
) -> ApiResult {
    let email = normalize_email(&dto::required("email", body.email)?);
    let code = dto::required("code", body.code)?;
    let new_password = dto::required("newPassword", body.new_password)?;
    let docs = services.docs();

    let mut pending = latest_code(docs, &email, OtpPurpose::Forgot).await?;
    check_code(docs, &mut pending, &code).await?;

    let user = find_user(docs, &email).await?;
    let expected = user.expected();
    let mut user = user.into_inner();
    user.change_password(&new_password, Utc::now())?;

    let mut batch = WriteBatch::new();
    batch.update(&user, expected)?;
    batch.delete::<Otp>(pending.value.id(), pending.expected());
    docs.commit(batch).await?;
    tracing::info!(email = %email, "password reset");

    Ok(Json(json!({ "message": "password updated" })).into_response())
}
