//! Single translation point from the workspace's `CoreError` taxonomy to
//! the HTTP status table,
//! `rest::error::RestError`/`IntoResponse` pattern (one boundary type, one
//! `match` into status + body, core crates never depend on `axum`).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kbr_core::CoreError;
use serde::Serialize;

/// The adapter-layer error type every handler in this crate returns.
#[derive(Debug)]
pub enum RestError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl std::fmt::Display for RestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestError::BadRequest(m) => write!(f, "bad request: {m}"),
            RestError::Forbidden(m) => write!(f, "forbidden: {m}"),
            RestError::NotFound(m) => write!(f, "not found: {m}"),
            RestError::Conflict(m) => write!(f, "conflict: {m}"),
            RestError::Internal(m) => write!(f, "internal error: {m}"),
        }
    }
}

impl std::error::Error for RestError {}

/// Maps the core taxonomy onto HTTP status codes: `400` validation, `403`
/// permission, `404` snapshot missing, `409` conflict, `500` internal.
/// `Transport`/`Degraded`/`Canceled` have no dedicated status and fall
/// back to `500`.
impl From<CoreError> for RestError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config(m) => RestError::BadRequest(m),
            CoreError::InvalidEntity { kind, message } => {
                RestError::BadRequest(format!("invalid entity of kind '{kind}': {message}"))
            }
            CoreError::PermissionDenied { realm, detail } => {
                RestError::Forbidden(format!("realm '{realm}': {detail}"))
            }
            CoreError::NotFound(m) => RestError::NotFound(m),
            CoreError::AlreadyExists(m) => RestError::Conflict(m),
            CoreError::RemoteRejected { status, message } if status == 409 => {
                RestError::Conflict(message)
            }
            CoreError::RemoteRejected { status, message } if (400..500).contains(&status) => {
                RestError::BadRequest(message)
            }
            CoreError::CyclicDependency(kinds) => {
                RestError::Internal(format!("cyclic dependency among kinds: {}", kinds.join(", ")))
            }
            other => RestError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RestError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid"),
            RestError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            RestError::NotFound(_) => (StatusCode::NOT_FOUND, "not-found"),
            RestError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            RestError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "exception"),
        };

        let body = ErrorBody {
            error: code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_core_error_maps_to_404() {
        let err: RestError = CoreError::NotFound("snap1".to_string()).into();
        assert!(matches!(err, RestError::NotFound(_)));
    }

    #[test]
    fn permission_denied_maps_to_forbidden() {
        let err: RestError = CoreError::PermissionDenied {
            realm: "acme".to_string(),
            detail: "missing role".to_string(),
        }
        .into();
        assert!(matches!(err, RestError::Forbidden(_)));
    }

    #[test]
    fn conflict_status_from_remote_rejected_maps_to_conflict() {
        let err: RestError = CoreError::RemoteRejected {
            status: 409,
            message: "exists".to_string(),
        }
        .into();
        assert!(matches!(err, RestError::Conflict(_)));
    }
}
