//! Shared task data model (spec.md §3): the fields every node agrees on for
//! a given task, projected differently by each node's own task struct.

use crate::ids::{SensorId, TariffId, TaskId};
use serde::{Deserialize, Serialize};

/// `{batchSize, batchCnt}` — fixed at task creation, identical on all
/// three nodes for the lifetime of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchParams {
    /// Number of samples per batch.
    pub batch_size: u32,
    /// Number of batches each sensor produces over the task's duration.
    pub batch_cnt: u32,
}

impl BatchParams {
    /// Total number of FE plaintext vectors across `sensor_cnt` sensors.
    pub fn total_vectors(&self, sensor_cnt: usize) -> u64 {
        self.batch_cnt as u64 * sensor_cnt as u64
    }
}

/// `{start, samplingPeriod, maxSampleValue}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Wall-clock instant (unix seconds) sampling should begin.
    pub start_unix: i64,
    /// Spacing between samples, in milliseconds.
    pub sampling_period_ms: u64,
    /// Samples are drawn uniformly from `[0, max_sample_value)`.
    pub max_sample_value: u64,
}

/// Encryption mode selected at task-create time (spec.md §9 design note):
/// a tagged sum type rather than the source's empty polymorphic slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionMode {
    /// Encryption disabled; the aggregator uses the dummy (plaintext) decryptor.
    None,
    /// `batchCnt == 1`: single-input FE.
    Single,
    /// `batchCnt > 1`: multi-input FE.
    Multi,
}

impl EncryptionMode {
    /// Select the mode implied by `batchCnt` and whether encryption is enabled
    /// (spec.md §3: "single if batchCnt == 1, multi otherwise, none if
    /// encryption disabled").
    pub fn select(batch_cnt: u32, encryption_enabled: bool) -> Self {
        if !encryption_enabled {
            EncryptionMode::None
        } else if batch_cnt == 1 {
            EncryptionMode::Single
        } else {
            EncryptionMode::Multi
        }
    }
}

/// The immutable, cross-node-identical description of a task, created by
/// the aggregator and forwarded (in slightly different shapes) to the
/// authority and each sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Opaque task identifier, created by the aggregator.
    pub task_id: TaskId,
    /// Ordered sensor list; position is the stable `sensorIdx`.
    pub sensor_ids: Vec<SensorId>,
    /// Batch shape, fixed at creation.
    pub batch_params: BatchParams,
    /// Sampling cadence and bounds.
    pub sampling_params: SamplingParams,
    /// Upper bound on tariff rate values, needed by FE setup.
    pub max_tariff_value: u64,
    /// Tariff this task's rate vector is drawn from.
    pub tariff_id: TariffId,
    /// Encryption mode, derived once at creation and stable thereafter.
    pub encryption_mode: EncryptionMode,
}

impl TaskSpec {
    /// Index of `sensor_id` within `sensor_ids`, the stable identity used in
    /// FE key material (spec.md §3).
    pub fn sensor_idx(&self, sensor_id: SensorId) -> Option<usize> {
        self.sensor_ids.iter().position(|&s| s == sensor_id)
    }

    /// Length of the rate vector/matrix row the FE scheme expects.
    pub fn vector_len(&self) -> usize {
        (self.batch_params.batch_cnt as usize) * (self.batch_params.batch_size as usize)
    }

    /// Total rate count across all sensors (single: `vector_len`, multi and
    /// none: `vector_len · sensor_cnt`, spec.md §3 invariant). Single mode
    /// only ever applies to a lone sensor with `batchCnt == 1`, so its rate
    /// count never needs the sensor-count factor.
    pub fn total_rate_cnt(&self) -> usize {
        match self.encryption_mode {
            EncryptionMode::Single => self.vector_len(),
            EncryptionMode::Multi | EncryptionMode::None => {
                self.vector_len() * self.sensor_ids.len()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_selection_follows_batch_cnt() {
        assert_eq!(EncryptionMode::select(1, true), EncryptionMode::Single);
        assert_eq!(EncryptionMode::select(4, true), EncryptionMode::Multi);
        assert_eq!(EncryptionMode::select(4, false), EncryptionMode::None);
    }

    #[test]
    fn sensor_idx_is_position_in_list() {
        let a = SensorId::new();
        let b = SensorId::new();
        let spec = TaskSpec {
            task_id: TaskId::new(),
            sensor_ids: vec![a, b],
            batch_params: BatchParams { batch_size: 2, batch_cnt: 2 },
            sampling_params: SamplingParams { start_unix: 0, sampling_period_ms: 1000, max_sample_value: 10 },
            max_tariff_value: 5,
            tariff_id: TariffId::new(),
            encryption_mode: EncryptionMode::Multi,
        };
        assert_eq!(spec.sensor_idx(a), Some(0));
        assert_eq!(spec.sensor_idx(b), Some(1));
        assert_eq!(spec.total_rate_cnt(), 8);
    }
}
