//! Axum router for the sensor node (spec.md §6.4 "sensor" row).

use crate::error::ApiError;
use crate::state::SensorState;
use crate::task_worker::SensorTask;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use fe_core::ids::TaskId;
use fe_wire::dto::{
    BatchFillStatus, RegisterSensorRequest, RegisterSensorResponse, SamplesResponse, SensorTaskRequest,
    SetCustomerRequest, SetServerRequest,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: SensorState) -> Router {
    Router::new()
        .route("/server", post(set_server))
        .route("/customer", post(set_customer))
        .route("/register", get(registration_status))
        .route("/task", post(create_task))
        .route("/task/{id}/samples", get(task_samples))
        .route("/task/{id}/cancel", post(cancel_task))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn set_server(
    State(state): State<SensorState>,
    Json(req): Json<SetServerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.set_aggregator(format!("http://{}:{}", req.ip, req.port))?;
    Ok(StatusCode::OK)
}

async fn set_customer(
    State(state): State<SensorState>,
    Json(req): Json<SetCustomerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.set_customer(req.customer_id)?;
    Ok(StatusCode::OK)
}

/// `GET /register` (spec.md §4.3.2): POSTs this sensor's id and advertised
/// IP to the aggregator's `POST /customer/{customerId}/sensor`. Requires
/// both `/server` and `/customer` to have been set already.
async fn registration_status(State(state): State<SensorState>) -> Result<impl IntoResponse, ApiError> {
    let customer_id = state.customer_id()?;
    let aggregator = state.aggregator()?;
    aggregator
        .post_json_empty(
            &format!("/customer/{customer_id}/sensor"),
            &RegisterSensorRequest { sensor_id: state.sensor_id, ip: state.advertise_ip },
        )
        .await?;
    Ok(Json(RegisterSensorResponse { sensor_id: state.sensor_id }))
}

/// `POST /task` (spec.md §4.3, §4.1): accept a sensor task assignment and
/// submit its pipeline to the task daemon.
async fn create_task(
    State(state): State<SensorState>,
    Json(req): Json<SensorTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = Arc::new(SensorTask::new(
        req.task_id,
        req.customer_id,
        req.sensor_idx,
        req.sensor_cnt,
        req.batch_params,
        req.sampling_params,
        req.encryption_mode,
        req.authority_url.clone(),
    ));
    state.insert_task(Arc::clone(&task));

    let authority = fe_wire::RemoteClient::new(req.authority_url);
    let aggregator = state.aggregator()?;
    let encryption_params_poll = state.encryption_params_polling_interval;
    state.dispatch_run(crate::state::SensorTaskJob { task, authority, aggregator, encryption_params_poll })?;

    Ok(StatusCode::ACCEPTED)
}

async fn task_samples(
    State(state): State<SensorState>,
    Path(task_id): Path<TaskId>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.task(task_id)?;
    let batches = task
        .batch_fill_status()
        .into_iter()
        .map(|(batch_idx, received_samples_cnt, total_samples_cnt, is_submitted)| BatchFillStatus {
            batch_idx,
            received_samples_cnt,
            total_samples_cnt,
            is_submitted,
        })
        .collect();
    Ok(Json(SamplesResponse { task_id, batches }))
}

/// `POST /task/{id}/cancel` (spec.md §5.1): a no-op `204` for an unknown
/// or already-finished task, since the task's own Runnable may have
/// already reached a terminal state independently of this notification.
async fn cancel_task(State(state): State<SensorState>, Path(task_id): Path<TaskId>) -> impl IntoResponse {
    if let Ok(task) = state.task(task_id) {
        task.cancel();
    }
    StatusCode::NO_CONTENT
}
