//! Driver-name-keyed `config_json` shapes (spec.md §6).

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, WorkerError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AmqpConfig {
    pub url: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(default, alias = "routingKeyTemplate")]
    pub routing_key_template: String,
    #[serde(default)]
    pub queue: String,
    #[serde(default, alias = "autoAck")]
    pub auto_ack: bool,
    #[serde(default, alias = "maxMessages")]
    pub max_messages: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NatsConfig {
    pub url: String,
    #[serde(default, alias = "subjectPrefix")]
    pub subject_prefix: String,
    #[serde(default, alias = "maxMessages")]
    pub max_messages: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KafkaConfig {
    #[serde(default)]
    pub brokers: Vec<String>,
    /// Singular fallback accepted when `brokers` is absent.
    #[serde(default)]
    pub broker: Option<String>,
    #[serde(default, alias = "groupId")]
    pub group_id: String,
    #[serde(default, alias = "topicPrefix")]
    pub topic_prefix: String,
    #[serde(default, alias = "maxMessages")]
    pub max_messages: Option<u32>,
}

impl KafkaConfig {
    /// Resolved broker list: `brokers`, falling back to the singular
    /// `broker` field.
    pub fn resolved_brokers(&self) -> Vec<String> {
        if !self.brokers.is_empty() {
            return self.brokers.clone();
        }
        self.broker.clone().into_iter().collect()
    }

    /// Kafka topic is `topic_prefix + topic`.
    pub fn topic_name(&self, topic: &str) -> String {
        format!("{}{}", self.topic_prefix, topic)
    }
}

/// Parsed `config_json` for one driver, tagged by the driver's name.
#[derive(Debug, Clone)]
pub enum SubscriberConfig {
    Amqp(AmqpConfig),
    Nats(NatsConfig),
    Kafka(KafkaConfig),
    /// A driver name this crate doesn't know the shape of; the raw JSON is
    /// preserved so a caller's factory can parse it itself.
    Other { driver_name: String, raw: serde_json::Value },
}

impl SubscriberConfig {
    /// Parse `config_json` keyed by driver name (`amqp`/`nats`/`kafka`, or
    /// anything else passed through as [`SubscriberConfig::Other`]).
    pub fn parse(driver_name: &str, config_json: &str) -> Result<Self, WorkerError> {
        let value: serde_json::Value = if config_json.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(config_json)
                .map_err(|e| WorkerError::Config(ConfigError::UnsupportedDriverName(format!(
                    "invalid config_json for driver '{driver_name}': {e}"
                ))))?
        };

        Ok(match driver_name {
            "amqp" => SubscriberConfig::Amqp(serde_json::from_value(value).map_err(|e| {
                WorkerError::Config(ConfigError::UnsupportedDriverName(format!(
                    "invalid amqp config: {e}"
                )))
            })?),
            "nats" => SubscriberConfig::Nats(serde_json::from_value(value).map_err(|e| {
                WorkerError::Config(ConfigError::UnsupportedDriverName(format!(
                    "invalid nats config: {e}"
                )))
            })?),
            "kafka" => SubscriberConfig::Kafka(serde_json::from_value(value).map_err(|e| {
                WorkerError::Config(ConfigError::UnsupportedDriverName(format!(
                    "invalid kafka config: {e}"
                )))
            })?),
            other => SubscriberConfig::Other {
                driver_name: other.to_string(),
                raw: value,
            },
        })
    }
}
