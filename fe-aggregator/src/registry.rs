//! Customer, tariff, and authority registries (spec.md §3.1, §6.4).

use dashmap::DashMap;
use fe_core::error::{Error, Result};
use fe_core::ids::{CustomerId, SensorId, TariffId};
use fe_core::registry::{AuthorityRecord, Customer, SensorRecord, Tariff};
use parking_lot::RwLock;

/// Customer directory plus tariff catalogue plus the single authority
/// address record (spec.md §3.1: "the aggregator keeps exactly one").
#[derive(Default)]
pub struct Registry {
    customers: DashMap<CustomerId, Customer>,
    tariffs: DashMap<TariffId, Tariff>,
    authority: RwLock<Option<AuthorityRecord>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_customer(&self) -> CustomerId {
        let id = CustomerId::new();
        self.customers.insert(id, Customer { id, sensors: Vec::new() });
        id
    }

    pub fn customer(&self, id: CustomerId) -> Result<Customer> {
        self.customers
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::not_found(format!("unknown customer {id}")))
    }

    pub fn upsert_sensor(&self, customer_id: CustomerId, sensor_id: SensorId, ip: String) -> Result<()> {
        let mut customer = self
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| Error::not_found(format!("unknown customer {customer_id}")))?;
        customer.upsert_sensor(SensorRecord { sensor_id, ip });
        Ok(())
    }

    pub fn remove_sensor(&self, customer_id: CustomerId, sensor_id: SensorId) -> Result<()> {
        let mut customer = self
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| Error::not_found(format!("unknown customer {customer_id}")))?;
        customer.remove_sensor(sensor_id);
        Ok(())
    }

    pub fn add_tariff(&self, tariff: Tariff) -> TariffId {
        let id = tariff.id;
        self.tariffs.insert(id, tariff);
        id
    }

    pub fn tariff(&self, id: TariffId) -> Result<Tariff> {
        self.tariffs.get(&id).map(|entry| entry.value().clone()).ok_or_else(|| Error::not_found(format!("unknown tariff {id}")))
    }

    /// `POST /authority` (spec.md §3.1): idempotent on a matching IP,
    /// `409`-mappable `Error::Protocol` on a conflicting one.
    pub fn set_authority(&self, ip: String) -> Result<()> {
        let mut slot = self.authority.write();
        match slot.as_ref() {
            Some(existing) if existing.ip == ip => Ok(()),
            Some(existing) => Err(Error::Protocol(format!(
                "authority already set to {}, refusing to change to {ip}",
                existing.ip
            ))),
            None => {
                *slot = Some(AuthorityRecord { ip });
                Ok(())
            }
        }
    }

    pub fn authority(&self) -> Result<AuthorityRecord> {
        self.authority.read().clone().ok_or_else(|| Error::not_found("authority not set".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_authority_is_idempotent_on_same_ip() {
        let registry = Registry::new();
        registry.set_authority("http://a:1".to_string()).unwrap();
        assert!(registry.set_authority("http://a:1".to_string()).is_ok());
    }

    #[test]
    fn set_authority_rejects_conflicting_ip() {
        let registry = Registry::new();
        registry.set_authority("http://a:1".to_string()).unwrap();
        let err = registry.set_authority("http://b:2".to_string()).unwrap_err();
        assert_eq!(err.category(), fe_core::ErrorCategory::Protocol);
    }

    #[test]
    fn sensor_upsert_requires_existing_customer() {
        let registry = Registry::new();
        let err = registry.upsert_sensor(CustomerId::new(), SensorId::new(), "http://s:1".into()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
