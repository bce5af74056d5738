//! Decodes a [`RawMessage`] into an [`Event`].

use bytes::Bytes;
use prost::Message as _;
use serde::Deserialize;

use crate::error::CodecError;
use crate::message::{Event, RawMessage};

/// Decodes raw bus deliveries into [`Event`]s. Implement this to support a
/// wire format other than the protobuf-envelope-or-legacy-JSON default.
pub trait Codec: Send + Sync {
    fn decode(&self, message: &RawMessage) -> Result<Event, CodecError>;
}

/// The protobuf envelope wrapping a JSON body, hand-written in the shape
/// `{provider, name, payload}` (spec.md §4.3). No `.proto`/build.rs pipeline
/// is in scope here; field tags are assigned the same way prost-generated
/// types already vendored transitively (`opentelemetry-proto`) lay theirs
/// out: small integers in declaration order.
#[derive(Clone, PartialEq, prost::Message)]
pub struct EventEnvelope {
    #[prost(string, tag = "1")]
    pub provider: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

/// The legacy JSON fallback shape: `{provider, name, data}`.
#[derive(Debug, Deserialize)]
struct LegacyEnvelope {
    #[serde(default)]
    provider: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Parses a protobuf envelope first, falling back to the legacy JSON shape,
/// exactly as spec.md §4.3 describes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodec;

impl Codec for DefaultCodec {
    fn decode(&self, message: &RawMessage) -> Result<Event, CodecError> {
        if message.payload.is_empty() {
            return Err(CodecError::PayloadRequired);
        }

        let (provider, r#type, normalized) = decode_envelope(&message.payload)
            .or_else(|| decode_legacy_json(&message.payload))
            .unwrap_or_else(|| (String::new(), String::new(), None));

        let event = Event {
            provider,
            r#type,
            topic: String::new(),
            metadata: message.metadata.clone(),
            payload: message.payload.clone(),
            normalized,
            request_id: String::new(),
            installation_id: String::new(),
            log_id: String::new(),
            client: None,
        };

        Ok(event.finish(None, &message.topic))
    }
}

type Decoded = (String, String, Option<serde_json::Value>);

fn decode_envelope(payload: &Bytes) -> Option<Decoded> {
    let envelope = EventEnvelope::decode(payload.as_ref()).ok()?;
    if envelope.provider.is_empty() && envelope.name.is_empty() && envelope.payload.is_empty() {
        return None;
    }
    let normalized = serde_json::from_slice::<serde_json::Value>(&envelope.payload).ok();
    Some((envelope.provider, envelope.name, normalized))
}

fn decode_legacy_json(payload: &Bytes) -> Option<Decoded> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    if let Some(obj) = value.as_object() {
        if obj.contains_key("provider") || obj.contains_key("name") || obj.contains_key("data") {
            let legacy: LegacyEnvelope = serde_json::from_value(value).ok()?;
            return Some((legacy.provider, legacy.name, legacy.data));
        }
    }
    Some((String::new(), String::new(), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_payload_is_an_error() {
        let msg = RawMessage {
            topic: "t".into(),
            payload: Bytes::new(),
            metadata: HashMap::new(),
            content_type: String::new(),
        };
        let err = DefaultCodec.decode(&msg).unwrap_err();
        assert!(matches!(err, CodecError::PayloadRequired));
    }

    #[test]
    fn protobuf_envelope_round_trips() {
        let envelope = EventEnvelope {
            provider: "github".into(),
            name: "push".into(),
            payload: serde_json::to_vec(&serde_json::json!({"ref": "refs/heads/main"})).unwrap(),
        };
        let mut buf = Vec::new();
        envelope.encode(&mut buf).unwrap();

        let msg = RawMessage::new("repo-events", buf);
        let event = DefaultCodec.decode(&msg).unwrap();

        assert_eq!(event.provider, "github");
        assert_eq!(event.r#type, "push");
        assert_eq!(event.topic, "repo-events");
        assert_eq!(
            event.normalized.unwrap()["ref"],
            serde_json::json!("refs/heads/main")
        );
    }

    #[test]
    fn legacy_json_fallback() {
        let json = serde_json::json!({"provider": "gitlab", "name": "merge", "data": {"id": 7}});
        let msg = RawMessage::new("repo-events", serde_json::to_vec(&json).unwrap());
        let event = DefaultCodec.decode(&msg).unwrap();

        assert_eq!(event.provider, "gitlab");
        assert_eq!(event.r#type, "merge");
        assert_eq!(event.normalized.unwrap()["id"], serde_json::json!(7));
    }

    #[test]
    fn metadata_fallback_fills_blank_provider_and_type() {
        let msg = RawMessage::new("repo-events", b"not json or protobuf".to_vec())
            .with_metadata("provider", "bitbucket")
            .with_metadata("event", "tag_push");
        let event = DefaultCodec.decode(&msg).unwrap();

        assert_eq!(event.provider, "bitbucket");
        assert_eq!(event.r#type, "tag_push");
    }
}
