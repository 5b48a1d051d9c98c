//! JSON request/response bodies for every HTTP endpoint in the three-party
//! protocol (spec.md §6.2, §6.4). These ride over plain `serde_json`
//! rather than the binary codec in `codec` — they carry structural task
//! metadata, not the high-volume BigInt payloads the binary path exists
//! for.

use fe_core::ids::{CustomerId, DecryptionParamsId, SensorId, TariffId, TaskId};
use fe_core::status::{DecryptionStatus, SchemaStatus};
use fe_core::task_model::{BatchParams, EncryptionMode, SamplingParams};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

// -- Authority: POST /task -------------------------------------------------

/// Body of `POST /task` against the authority. Mirrors the aggregator's
/// own task-provisioning request one level up the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityTaskRequest {
    pub task_id: TaskId,
    pub sensor_cnt: usize,
    pub batch_params: BatchParams,
    pub max_sample_value: u64,
    pub max_tariff_value: u64,
    pub encryption_mode: EncryptionMode,
}

/// Body of `POST /rates/{taskId}` against the authority — a flat,
/// length-`totalRateCnt` rate vector encoded with the binary codec
/// (`codec::encode_rates`), not JSON; this DTO only carries the resulting
/// `decryptionParamsId` back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRatesResponse {
    pub decryption_params_id: DecryptionParamsId,
}

/// Body of `GET /schema-status/{taskId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaStatusResponse {
    pub status: SchemaStatus,
}

/// Body of `GET /decryption-status/{taskId}/{decryptionParamsId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptionStatusResponse {
    pub status: DecryptionStatus,
}

// -- Aggregator: customer / sensor registry --------------------------------

/// Body of `POST /customer` response — the new customer's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerResponse {
    pub id: CustomerId,
}

/// Body of `POST /group/{id}/sensor` (register or re-register a sensor
/// under a customer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSensorRequest {
    pub sensor_id: SensorId,
    pub ip: IpAddr,
}

/// Body of `DELETE /group/{id}/sensor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveSensorRequest {
    pub sensor_id: SensorId,
}

/// Body of `GET /customer/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetailsResponse {
    pub id: CustomerId,
    pub sensors: Vec<RegisteredSensor>,
}

/// One entry in `CustomerDetailsResponse::sensors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredSensor {
    pub sensor_id: SensorId,
    pub ip: IpAddr,
}

/// Body of `POST /tariff`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTariffRequest {
    pub description: String,
    pub sampling_period_ms: u64,
    pub batch_size: u32,
    pub max_sample_value: u64,
    pub max_tariff_value: u64,
}

/// Body of `POST /tariff` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTariffResponse {
    pub tariff_id: TariffId,
}

/// Body of `POST /authority` — tells the aggregator where its authority
/// lives. One-shot: a second call with a different address is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAuthorityRequest {
    pub ip: IpAddr,
    pub port: u16,
}

// -- Aggregator: task lifecycle --------------------------------------------

/// Body of `POST /task` against the aggregator — what a customer asks
/// for: a tariff, a duration, and which of their sensors to meter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorTaskRequest {
    pub customer_id: CustomerId,
    pub tariff_id: TariffId,
    pub sensor_ids: Vec<SensorId>,
    pub duration_ms: u64,
    pub start_unix: i64,
    pub encryption_enabled: bool,
}

/// Body of `POST /task` response — the new task's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    pub task_id: TaskId,
}

/// Body of `GET /task/{id}` — a point-in-time status snapshot (spec.md
/// §4.4.1): per-sensor submission/cipher progress plus decryptor stats and
/// the final result once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetailsResponse {
    pub task_id: TaskId,
    pub customer_id: CustomerId,
    pub sensors: Vec<SensorSubmissionStatus>,
    pub sampling_params: SamplingParams,
    pub remaining_slots: usize,
    pub key_derivation_elapsed_ms: Option<u64>,
    pub result: Option<i64>,
}

/// One sensor's submission state within `TaskDetailsResponse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSubmissionStatus {
    pub sensor_id: SensorId,
    pub task_submitted: bool,
    pub submitted_cipher_cnt: usize,
}

// -- Sensor -----------------------------------------------------------------

/// Body of `POST /task` against a sensor — what the aggregator hands
/// down once it has fan-out-submitted the task to every sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorTaskRequest {
    pub task_id: TaskId,
    pub customer_id: CustomerId,
    pub sensor_idx: usize,
    pub sensor_cnt: usize,
    pub batch_params: BatchParams,
    pub sampling_params: SamplingParams,
    pub max_sample_value: u64,
    pub encryption_mode: EncryptionMode,
    /// Base URL of the authority, so the sensor can fetch its own
    /// encryption params directly (spec.md §4.3: sensors poll the
    /// authority, not the aggregator, for key material).
    pub authority_url: String,
}

/// Body of `POST /customer` against a sensor (sets it once).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCustomerRequest {
    pub customer_id: CustomerId,
}

/// Body of `POST /server` against a sensor (sets its aggregator once).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetServerRequest {
    pub ip: IpAddr,
    pub port: u16,
}

/// Body of `GET /task/{id}/samples` — a debug endpoint exposing per-batch
/// fill state, independent of encryption mode (spec.md §4.3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplesResponse {
    pub task_id: TaskId,
    pub batches: Vec<BatchFillStatus>,
}

/// One batch's fill/submission state within `SamplesResponse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFillStatus {
    pub batch_idx: usize,
    pub received_samples_cnt: usize,
    pub total_samples_cnt: usize,
    pub is_submitted: bool,
}

/// Body of `GET /register` performed by the sensor against the
/// aggregator's `POST /customer/{customerId}/sensor` (spec.md §4.3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSensorResponse {
    pub sensor_id: SensorId,
}

/// Uniform error body returned by every node for non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_task_request_round_trips_through_json() {
        let req = AuthorityTaskRequest {
            task_id: TaskId::new(),
            sensor_cnt: 2,
            batch_params: BatchParams { batch_size: 4, batch_cnt: 1 },
            max_sample_value: 10,
            max_tariff_value: 5,
            encryption_mode: EncryptionMode::Multi,
        };
        let json = serde_json::to_string(&req).unwrap();
        let decoded: AuthorityTaskRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.task_id, req.task_id);
        assert_eq!(decoded.sensor_cnt, req.sensor_cnt);
    }

    #[test]
    fn error_response_round_trips() {
        let err = ErrorResponse { error: "invalid task uuid".to_string() };
        let json = serde_json::to_string(&err).unwrap();
        let decoded: ErrorResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.error, err.error);
    }
}
