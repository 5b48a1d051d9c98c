//! Trivial registries (spec.md §3.1, §6.4): customer directory, tariff
//! catalogue, and the authority/sensor address books the aggregator keeps.
//! Deliberately simple data structures; the interesting engineering is the
//! task pipeline, not these.

use crate::ids::{CustomerId, SensorId, TariffId};
use serde::{Deserialize, Serialize};

/// A sensor's network address as known to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Sensor identifier.
    pub sensor_id: SensorId,
    /// `scheme://host:port` the aggregator submits tasks to.
    pub ip: String,
}

/// A customer owns zero or more sensors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    /// Customer identifier.
    pub id: CustomerId,
    /// Sensors registered under this customer.
    pub sensors: Vec<SensorRecord>,
}

impl Customer {
    /// Insert or update a sensor record (spec.md §3.1: re-registration is
    /// an upsert — the IP is updated in place rather than rejected).
    pub fn upsert_sensor(&mut self, record: SensorRecord) {
        if let Some(existing) = self.sensors.iter_mut().find(|s| s.sensor_id == record.sensor_id) {
            existing.ip = record.ip;
        } else {
            self.sensors.push(record);
        }
    }

    /// Remove a sensor by id. Idempotent: absent ids are a no-op.
    pub fn remove_sensor(&mut self, sensor_id: SensorId) {
        self.sensors.retain(|s| s.sensor_id != sensor_id);
    }
}

/// A tariff definition: the short rate-per-sample description the
/// repeated-sequence generator expands into a full rate vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tariff {
    /// Tariff identifier.
    pub id: TariffId,
    /// Human-readable description.
    pub description: String,
    /// Sampling cadence this tariff expects, in milliseconds.
    pub sampling_period_ms: u64,
    /// Batch size this tariff expects.
    pub batch_size: u32,
    /// Upper bound on sample values.
    pub max_sample_value: u64,
    /// Upper bound on tariff rate values.
    pub max_tariff_value: u64,
}

/// The aggregator's singleton record of its authority peer (spec.md §3.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityRecord {
    /// `scheme://host:port` of the authority.
    pub ip: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_updates_ip_in_place() {
        let mut customer = Customer { id: CustomerId::new(), sensors: vec![] };
        let sensor_id = SensorId::new();
        customer.upsert_sensor(SensorRecord { sensor_id, ip: "http://a:1".into() });
        customer.upsert_sensor(SensorRecord { sensor_id, ip: "http://b:2".into() });
        assert_eq!(customer.sensors.len(), 1);
        assert_eq!(customer.sensors[0].ip, "http://b:2");
    }

    #[test]
    fn remove_is_idempotent() {
        let mut customer = Customer { id: CustomerId::new(), sensors: vec![] };
        let sensor_id = SensorId::new();
        customer.remove_sensor(sensor_id);
        assert!(customer.sensors.is_empty());
    }
}
