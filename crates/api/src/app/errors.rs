use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use stockroom_auth::SessionError;
use stockroom_core::DomainError;
use stockroom_infra::DispatchError;
use stockroom_infra::store::StoreError;

/// Error returned by handlers; rendered as `{"error": code, "message": text}`.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    Store(StoreError),
    Session(SessionError),
}

pub type ApiResult<T = Response> = Result<T, ApiError>;

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Domain(e) => ApiError::Domain(e),
            DispatchError::Store(e) => ApiError::Store(e),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::Session(err)
    }
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::Domain(DomainError::validation(msg))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Domain(DomainError::unauthorized(msg))
    }
}

fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invariant_violation", msg)
        }
        e @ DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::BAD_REQUEST, "insufficient_stock", e.to_string())
        }
        e @ DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unauthorized(msg) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg),
    }
}

fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Duplicate(msg) => json_error(StatusCode::CONFLICT, "duplicate", msg),
        StoreError::Concurrency(msg) => {
            tracing::warn!(error = %msg, "giving up after concurrent writes");
            json_error(
                StatusCode::CONFLICT,
                "conflict",
                "the record was changed concurrently, please retry",
            )
        }
        StoreError::Serialization(msg) | StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal server error")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Domain(e) => domain_error_to_response(e),
            ApiError::Store(e) => store_error_to_response(e),
            ApiError::Session(SessionError::Key(msg)) => {
                tracing::error!(error = %msg, "session signing failure");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "session_error", "internal server error")
            }
            ApiError::Session(e) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", e.to_string()),
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(status_of(DomainError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(DomainError::invariant("x")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(DomainError::insufficient_stock("p", 5, 3)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(DomainError::not_found("receipt")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(DomainError::unauthorized("x")), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn store_errors_map_to_conflict_or_server_error() {
        assert_eq!(status_of(StoreError::Duplicate("sku".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DispatchError::Store(StoreError::Concurrency("stock".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StoreError::Backend("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn session_errors_are_unauthorized() {
        assert_eq!(status_of(SessionError::Expired), StatusCode::UNAUTHORIZED);
    }
}
