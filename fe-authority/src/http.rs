//! Axum router for the authority node (spec.md §6.4 "authority" row).

use crate::error::ApiError;
use crate::state::AuthorityState;
use crate::task::AuthorityTask;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use fe_core::error::Error;
use fe_core::ids::{DecryptionParamsId, TaskId};
use fe_wire::dto::{
    AddRatesResponse, AuthorityTaskRequest, DecryptionStatusResponse, SchemaStatusResponse,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: AuthorityState) -> Router {
    Router::new()
        .route("/task", post(create_task))
        .route("/schema-status/{task_id}", get(schema_status))
        .route("/encryption/{task_id}/{sensor_idx}", get(encryption_params))
        .route("/rates/{task_id}", post(add_rates))
        .route("/decryption-status/{task_id}/{decryption_params_id}", get(decryption_status))
        .route("/decryption/{task_id}/{decryption_params_id}", get(decryption_params))
        .route("/rates", get(rates_catalog))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `POST /task` (spec.md §4.5, §4.1): create the task record and submit
/// its schema setup to the task daemon, returning immediately. Schema
/// params do not exist yet when this responds — callers poll
/// `GET /schema-status/{taskId}`.
async fn create_task(
    State(state): State<AuthorityState>,
    Json(req): Json<AuthorityTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = Arc::new(AuthorityTask::new(
        req.task_id,
        req.sensor_cnt,
        req.batch_params,
        req.max_sample_value,
        req.max_tariff_value,
        req.encryption_mode,
    ));
    state.insert(Arc::clone(&task));
    state.dispatch_setup(task)?;

    Ok((StatusCode::ACCEPTED, Json(SchemaStatusResponse { status: fe_core::status::SchemaStatus::Created })))
}

async fn schema_status(
    State(state): State<AuthorityState>,
    Path(task_id): Path<TaskId>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.get(task_id)?;
    Ok(Json(SchemaStatusResponse { status: task.schema_status() }))
}

async fn encryption_params(
    State(state): State<AuthorityState>,
    Path((task_id, sensor_idx)): Path<(TaskId, usize)>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.get(task_id)?;
    let params = task.encryption_params(sensor_idx)?;
    let bytes = fe_wire::codec::encode_encryption_params(&params)
        .map_err(|err| ApiError(Error::Internal(err.to_string())))?;
    Ok(([(axum::http::header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

/// `POST /rates/{taskId}`: body is a binary-codec rate vector, not JSON
/// (spec.md §6.2 — the BigInt-heavy path bypasses `serde_json`).
async fn add_rates(
    State(state): State<AuthorityState>,
    Path(task_id): Path<TaskId>,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.get(task_id)?;
    let rates = fe_wire::codec::decode_rates(&body).map_err(|err| ApiError(Error::misuse(err.to_string())))?;
    let decryption_params_id = task.add_decryption_params(rates)?;
    Ok((StatusCode::ACCEPTED, Json(AddRatesResponse { decryption_params_id })))
}

async fn decryption_status(
    State(state): State<AuthorityState>,
    Path((task_id, decryption_params_id)): Path<(TaskId, DecryptionParamsId)>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.get(task_id)?;
    let job = task
        .decryption_job(decryption_params_id)
        .ok_or_else(|| Error::not_found(format!("unknown decryption job {decryption_params_id}")))?;
    Ok(Json(DecryptionStatusResponse { status: job.status() }))
}

async fn decryption_params(
    State(state): State<AuthorityState>,
    Path((task_id, decryption_params_id)): Path<(TaskId, DecryptionParamsId)>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.get(task_id)?;
    let job = task
        .decryption_job(decryption_params_id)
        .ok_or_else(|| Error::not_found(format!("unknown decryption job {decryption_params_id}")))?;
    let params = job
        .params()
        .ok_or_else(|| Error::Protocol("decryption params not ready".to_string()))?;
    let bytes = fe_wire::codec::encode_decryption_params(params)
        .map_err(|err| ApiError(Error::Internal(err.to_string())))?;
    Ok(([(axum::http::header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

/// `GET /rates` (spec.md §4.5.1): a published rate catalog was never part
/// of this protocol's design — rates arrive per task from the aggregator,
/// there is nothing global to list. Stubbed `501` rather than omitted so
/// the route exists and fails loud instead of 404-ing silently.
async fn rates_catalog() -> impl IntoResponse {
    StatusCode::NOT_IMPLEMENTED
}
