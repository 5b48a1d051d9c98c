//! HTTP error mapping for the authority (spec.md §7): wraps `fe_core::Error`
//! so every handler can return a `Result<_, ApiError>` and let axum render
//! the right status code and a uniform `fe_wire::dto::ErrorResponse` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fe_wire::dto::ErrorResponse;

/// Newtype so this crate can provide its own `IntoResponse` impl for the
/// shared `fe_core::Error` without an orphan-rule violation.
pub struct ApiError(pub fe_core::Error);

impl From<fe_core::Error> for ApiError {
    fn from(err: fe_core::Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.default_http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}
