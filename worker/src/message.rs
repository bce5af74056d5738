//! Wire-level and decoded message types.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::core::constants::{
    METADATA_EVENT, METADATA_INSTALLATION_ID, METADATA_LOG_ID, METADATA_PROVIDER,
    METADATA_REQUEST_ID,
};

/// A raw delivery from a [`crate::Subscriber`], prior to decoding.
///
/// Metadata keys are case-sensitive and looked up by exact match.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub topic: String,
    pub payload: Bytes,
    pub metadata: HashMap<String, String>,
    pub content_type: String,
}

impl RawMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            metadata: HashMap::new(),
            content_type: String::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// `log_id` extracted from metadata, empty string if absent.
    pub fn log_id(&self) -> String {
        self.metadata.get(METADATA_LOG_ID).cloned().unwrap_or_default()
    }
}

/// A type-erased auxiliary client attached to an [`Event`] by a
/// [`crate::ClientProvider`] before handler dispatch (e.g. an SCM HTTP
/// client). Handlers downcast via [`Event::client_as`].
pub type AttachedClient = Arc<dyn Any + Send + Sync>;

/// A decoded event, produced once per message by a [`crate::Codec`] and
/// consumed by exactly one dispatch.
#[derive(Clone)]
pub struct Event {
    pub provider: String,
    pub r#type: String,
    pub topic: String,
    pub metadata: HashMap<String, String>,
    pub payload: Bytes,
    pub normalized: Option<serde_json::Value>,
    pub request_id: String,
    pub installation_id: String,
    pub log_id: String,
    pub client: Option<AttachedClient>,
}

impl Event {
    /// Post-process a freshly decoded event: fill blank `provider`/`type`
    /// from metadata, resolve ids from metadata, copy metadata verbatim.
    pub(crate) fn finish(mut self, explicit_topic: Option<&str>, message_topic: &str) -> Self {
        if self.provider.is_empty()
            && let Some(v) = self.metadata.get(METADATA_PROVIDER)
        {
            self.provider = v.clone();
        }
        if self.r#type.is_empty()
            && let Some(v) = self.metadata.get(METADATA_EVENT)
        {
            self.r#type = v.clone();
        }
        self.topic = explicit_topic
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| message_topic.to_string());
        if self.request_id.is_empty()
            && let Some(v) = self.metadata.get(METADATA_REQUEST_ID)
        {
            self.request_id = v.clone();
        }
        if self.installation_id.is_empty()
            && let Some(v) = self.metadata.get(METADATA_INSTALLATION_ID)
        {
            self.installation_id = v.clone();
        }
        if self.log_id.is_empty()
            && let Some(v) = self.metadata.get(METADATA_LOG_ID)
        {
            self.log_id = v.clone();
        }
        self
    }

    /// Downcast the attached client, if any, to the expected concrete type.
    pub fn client_as<T: 'static + Send + Sync>(&self) -> Option<Arc<T>> {
        self.client
            .as_ref()
            .and_then(|c| c.clone().downcast::<T>().ok())
    }
}

impl Default for Event {
    fn default() -> Self {
        Self {
            provider: String::new(),
            r#type: String::new(),
            topic: String::new(),
            metadata: HashMap::new(),
            payload: Bytes::new(),
            normalized: None,
            request_id: String::new(),
            installation_id: String::new(),
            log_id: String::new(),
            client: None,
        }
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("provider", &self.provider)
            .field("type", &self.r#type)
            .field("topic", &self.topic)
            .field("request_id", &self.request_id)
            .field("installation_id", &self.installation_id)
            .field("log_id", &self.log_id)
            .field("has_client", &self.client.is_some())
            .finish()
    }
}
