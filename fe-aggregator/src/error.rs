//! HTTP error mapping for the aggregator (spec.md §7), mirroring
//! `fe-authority`'s `ApiError` newtype.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fe_wire::dto::ErrorResponse;

pub struct ApiError(pub fe_core::Error);

impl From<fe_core::Error> for ApiError {
    fn from(err: fe_core::Error) -> Self {
        ApiError(err)
    }
}

impl From<fe_wire::Error> for ApiError {
    fn from(err: fe_wire::Error) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.default_http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}
