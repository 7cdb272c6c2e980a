//! Shared error rendering for API handlers.
//!
//! Every handler funnels its [`ServiceError`]s through [`render_error`] so
//! the status mapping lives in exactly one place.

use salvo::Response;
use salvo::http::StatusCode;
use salvo::writing::Json;
use serde::Serialize;

use mingle_service::error::ServiceError;

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps a service error to the HTTP status it answers with.
pub fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::ValidationError(_)
        | ServiceError::InvalidRecurrenceRule(_)
        | ServiceError::SelfRequest => StatusCode::BAD_REQUEST,
        ServiceError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        ServiceError::AuthorizationError(_) => StatusCode::FORBIDDEN,
        ServiceError::NotFound(_) | ServiceError::RequestNotFound => StatusCode::NOT_FOUND,
        ServiceError::Conflict(_)
        | ServiceError::DuplicateRequest
        | ServiceError::AlreadyFinalized => StatusCode::CONFLICT,
        ServiceError::DatabaseError(_)
        | ServiceError::CoreError(_)
        | ServiceError::InvalidConfiguration(_)
        | ServiceError::InvariantViolation(_)
        | ServiceError::DieselError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// ## Summary
/// Renders a service error as a JSON error payload.
///
/// Client errors carry the service message verbatim; internal errors are
/// logged and answered with an opaque body.
pub fn render_error(res: &mut Response, error: &ServiceError) {
    let status = status_for(error);
    res.status_code(status);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = ?error, "Request failed");
        res.render(Json(ErrorResponse {
            error: "Internal server error".to_string(),
        }));
    } else {
        res.render(Json(ErrorResponse {
            error: error.to_string(),
        }));
    }
}
