//! Axum router for the aggregator node (spec.md §6.4 "aggregator" row).

use crate::error::ApiError;
use crate::state::AggregatorState;
use crate::task::AggregatorTask;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use fe_core::error::Error;
use fe_core::ids::{CustomerId, SensorId, TariffId, TaskId};
use fe_core::registry::Tariff;
use fe_core::task_model::{BatchParams, EncryptionMode, SamplingParams, TaskSpec};
use fe_wire::dto::{
    AddTariffRequest, AddTariffResponse, AggregatorTaskRequest, CreateCustomerResponse, CreateTaskResponse,
    CustomerDetailsResponse, RegisterSensorRequest, RegisteredSensor, RemoveSensorRequest, SensorSubmissionStatus,
    SetAuthorityRequest, TaskDetailsResponse,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: AggregatorState) -> Router {
    Router::new()
        .route("/customer", post(create_customer))
        .route("/customer/{id}", get(customer_details))
        .route("/customer/{id}/sensor", post(upsert_sensor).delete(remove_sensor))
        .route("/tariff", post(add_tariff))
        .route("/authority", post(set_authority))
        .route("/task", post(create_task))
        .route("/task/{id}", get(task_details))
        .route("/task/{task_id}/{sensor_id}", post(submit_cipher))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_customer(State(state): State<AggregatorState>) -> impl IntoResponse {
    let id = state.registry.create_customer();
    (StatusCode::CREATED, Json(CreateCustomerResponse { id }))
}

async fn customer_details(
    State(state): State<AggregatorState>,
    Path(id): Path<CustomerId>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state.registry.customer(id)?;
    Ok(Json(CustomerDetailsResponse {
        id: customer.id,
        sensors: customer
            .sensors
            .into_iter()
            .map(|s| RegisteredSensor { sensor_id: s.sensor_id, ip: s.ip.parse().unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)) })
            .collect(),
    }))
}

async fn upsert_sensor(
    State(state): State<AggregatorState>,
    Path(id): Path<CustomerId>,
    Json(req): Json<RegisterSensorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.registry.upsert_sensor(id, req.sensor_id, req.ip.to_string())?;
    Ok(StatusCode::OK)
}

async fn remove_sensor(
    State(state): State<AggregatorState>,
    Path(id): Path<CustomerId>,
    Json(req): Json<RemoveSensorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.registry.remove_sensor(id, req.sensor_id)?;
    Ok(StatusCode::OK)
}

async fn add_tariff(
    State(state): State<AggregatorState>,
    Json(req): Json<AddTariffRequest>,
) -> impl IntoResponse {
    let tariff_id = state.registry.add_tariff(Tariff {
        id: TariffId::new(),
        description: req.description,
        sampling_period_ms: req.sampling_period_ms,
        batch_size: req.batch_size,
        max_sample_value: req.max_sample_value,
        max_tariff_value: req.max_tariff_value,
    });
    (StatusCode::CREATED, Json(AddTariffResponse { tariff_id }))
}

/// `POST /authority` (spec.md §3.1): idempotent on a matching IP, `409`
/// on a conflicting one.
async fn set_authority(
    State(state): State<AggregatorState>,
    Json(req): Json<SetAuthorityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ip = format!("http://{}:{}", req.ip, req.port);
    state.registry.set_authority(ip).map_err(|err| match err {
        Error::Protocol(msg) => ApiError(Error::Protocol(msg)),
        other => ApiError(other),
    })?;
    Ok(StatusCode::OK)
}

/// `POST /task` (spec.md §4.4): derive `batchCnt` from the tariff's
/// sampling cadence and the requested duration, select the encryption
/// mode, then submit the orchestration run to the task daemon (spec.md
/// §4.1).
async fn create_task(
    State(state): State<AggregatorState>,
    Json(req): Json<AggregatorTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tariff = state.registry.tariff(req.tariff_id)?;
    if req.sensor_ids.is_empty() {
        return Err(ApiError(Error::misuse("task requires at least one sensor")));
    }

    let batch_span_ms = tariff.batch_size.max(1) as u64 * tariff.sampling_period_ms.max(1);
    if req.duration_ms % batch_span_ms != 0 {
        return Err(ApiError(Error::misuse(format!(
            "duration_ms {} is not a multiple of batchSize*samplingPeriod ({batch_span_ms})",
            req.duration_ms
        ))));
    }

    let batch_cnt = (req.duration_ms / batch_span_ms).max(1) as u32;
    let encryption_mode = EncryptionMode::select(batch_cnt, req.encryption_enabled);

    let spec = TaskSpec {
        task_id: TaskId::new(),
        sensor_ids: req.sensor_ids.clone(),
        batch_params: BatchParams { batch_size: tariff.batch_size, batch_cnt },
        sampling_params: SamplingParams {
            start_unix: req.start_unix,
            sampling_period_ms: tariff.sampling_period_ms,
            max_sample_value: tariff.max_sample_value,
        },
        max_tariff_value: tariff.max_tariff_value,
        tariff_id: req.tariff_id,
        encryption_mode,
    };
    let task_id = spec.task_id;

    let authority = state.authority_client()?;
    let sensors = state.sensor_clients(req.customer_id, &req.sensor_ids);

    let task = AggregatorTask::new(spec, req.customer_id);
    state.insert_task(Arc::clone(&task));

    let schema_poll = state.schema_params_polling_interval;
    let decryption_poll = state.decryption_params_polling_interval;
    state.dispatch_run(crate::state::AggregatorTaskJob {
        task,
        authority,
        sensors,
        schema_poll,
        decryption_poll,
    })?;

    Ok((StatusCode::ACCEPTED, Json(CreateTaskResponse { task_id })))
}

async fn task_details(
    State(state): State<AggregatorState>,
    Path(id): Path<TaskId>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.task(id)?;
    Ok(Json(TaskDetailsResponse {
        task_id: task.spec.task_id,
        customer_id: task.customer_id,
        sensors: task
            .submission_status()
            .into_iter()
            .map(|(sensor_id, task_submitted, submitted_cipher_cnt)| SensorSubmissionStatus {
                sensor_id,
                task_submitted,
                submitted_cipher_cnt,
            })
            .collect(),
        sampling_params: task.spec.sampling_params,
        remaining_slots: task.remaining_slots(),
        key_derivation_elapsed_ms: task.key_derivation_elapsed().map(|d| d.as_millis() as u64),
        result: task.result(),
    }))
}

/// `POST /task/{taskId}/{sensorId}`: body is a binary-codec ciphertext.
async fn submit_cipher(
    State(state): State<AggregatorState>,
    Path((task_id, sensor_id)): Path<(TaskId, SensorId)>,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.task(task_id)?;
    let cipher = fe_wire::codec::decode_cipher(&body).map_err(|err| ApiError(Error::misuse(err.to_string())))?;
    let poll = state.decryption_params_polling_interval;
    let wait_multiple = state.cipher_wait_poll_multiple;
    task.accept_cipher(sensor_id, cipher, poll, wait_multiple).await?;
    Ok(StatusCode::ACCEPTED)
}
