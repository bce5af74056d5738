//! Per-driver `config_json` shapes and the factory seam used to build a
//! [`crate::Subscriber`] from a [`crate::controlplane::types::Driver`]
//! record.
//!
//! Concrete bus drivers are out of scope for this crate (spec.md §1); the
//! factory registry below is the seam a caller's AMQP/NATS/Kafka adapter
//! plugs into, grounded on `SecretManager::init`'s backend-enum dispatch in
//! `server/src/data/secrets/mod.rs`.

mod config;

pub use config::{AmqpConfig, KafkaConfig, NatsConfig, SubscriberConfig};

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ConfigError, WorkerError};
use crate::subscriber::Subscriber;

/// Builds a [`Subscriber`] from a driver's name and parsed `config_json`.
/// Register one per driver name on [`crate::WorkerBuilder`].
pub trait SubscriberFactory: Send + Sync {
    fn build(&self, config: &SubscriberConfig) -> Result<Arc<dyn Subscriber>, WorkerError>;
}

impl<F> SubscriberFactory for F
where
    F: Fn(&SubscriberConfig) -> Result<Arc<dyn Subscriber>, WorkerError> + Send + Sync,
{
    fn build(&self, config: &SubscriberConfig) -> Result<Arc<dyn Subscriber>, WorkerError> {
        self(config)
    }
}

/// A registry of [`SubscriberFactory`] implementations keyed by driver name
/// (`amqp`, `nats`, `kafka`, or any caller-defined name).
#[derive(Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, Arc<dyn SubscriberFactory>>,
}

impl FactoryRegistry {
    pub fn register(&mut self, driver_name: impl Into<String>, factory: Arc<dyn SubscriberFactory>) {
        self.factories.insert(driver_name.into(), factory);
    }

    pub fn build(
        &self,
        driver_name: &str,
        config: &SubscriberConfig,
    ) -> Result<Arc<dyn Subscriber>, WorkerError> {
        let factory = self.factories.get(driver_name).ok_or_else(|| {
            WorkerError::Config(ConfigError::UnsupportedDriverName(driver_name.to_string()))
        })?;
        factory.build(config)
    }
}
