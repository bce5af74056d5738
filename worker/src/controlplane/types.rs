//! Wire types for the five control-plane RPCs (spec.md §6). Field names are
//! accepted in both `snake_case` and `camelCase`; timestamps accept
//! ISO-8601 or `{seconds: int}`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

fn deserialize_flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Seconds { seconds: i64 },
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom),
        Raw::Seconds { seconds } => Utc
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| serde::de::Error::custom("timestamp seconds out of range")),
    }
}

/// A control-plane rule: binds an event selector to emitted bus topics and
/// a driver.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub when: serde_json::Value,
    #[serde(default)]
    pub emit: Vec<String>,
    #[serde(alias = "driverId")]
    pub driver_id: String,
}

/// A named bus backend description with connection parameters opaque to
/// this crate, deserialized by [`crate::drivers::SubscriberConfig::parse`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "configJson")]
    pub config_json: String,
    #[serde(default)]
    pub enabled: bool,
}

/// The SCM client descriptor returned by `GetSCMClient`, consumed by a
/// caller-supplied `ClientProvider`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScmClient {
    pub provider: String,
    #[serde(alias = "apiBaseUrl")]
    pub api_base_url: String,
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "providerInstanceKey")]
    pub provider_instance_key: String,
    #[serde(alias = "expiresAt", deserialize_with = "deserialize_flexible_timestamp")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct GetRuleRequest {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListRulesResponse {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetRuleResponse {
    pub rule: Rule,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListDriversResponse {
    #[serde(default)]
    pub drivers: Vec<Driver>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateEventLogStatusRequest {
    pub log_id: String,
    pub status: String,
    pub error_message: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateEventLogStatusResponse {}

#[derive(Debug, Clone, Serialize, Default)]
pub struct GetScmClientRequest {
    pub provider: String,
    pub installation_id: String,
    pub provider_instance_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetScmClientResponse {
    pub client: ScmClient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_accepts_snake_and_camel_case() {
        let snake: Driver =
            serde_json::from_str(r#"{"id":"d1","name":"amqp-main","config_json":"{}","enabled":true}"#)
                .unwrap();
        let camel: Driver =
            serde_json::from_str(r#"{"id":"d1","name":"amqp-main","configJson":"{}","enabled":true}"#)
                .unwrap();
        assert_eq!(snake.config_json, camel.config_json);
    }

    #[test]
    fn timestamp_accepts_rfc3339_and_seconds() {
        let iso: ScmClient = serde_json::from_str(
            r#"{"provider":"github","api_base_url":"https://api.github.com","access_token":"t","provider_instance_key":"k","expires_at":"2026-07-27T00:00:00Z"}"#,
        )
        .unwrap();
        let seconds: ScmClient = serde_json::from_str(
            r#"{"provider":"github","api_base_url":"https://api.github.com","access_token":"t","provider_instance_key":"k","expires_at":{"seconds":1785110400}}"#,
        )
        .unwrap();
        assert_eq!(iso.expires_at.timestamp(), seconds.expires_at.timestamp());
    }

    #[test]
    fn rule_driver_id_camel_case_alias() {
        let rule: Rule =
            serde_json::from_str(r#"{"id":"r1","emit":["t"],"driverId":"d1"}"#).unwrap();
        assert_eq!(rule.driver_id, "d1");
    }
}
