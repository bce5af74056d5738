//! Topic/type/rule handler registry, frozen once [`crate::Worker::run`]
//! begins. Grounded on `server/src/data/topics/mod.rs::TopicService`'s
//! `RwLock<HashMap<...>>` maps, populated during setup and read
//! concurrently afterwards.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::middleware::HandlerFn;

/// A handler bound to either an exact topic or an event type, plus the
/// driver id a topic-bound handler should run under.
#[derive(Default)]
pub struct Registry {
    topic_handlers: RwLock<HashMap<String, HandlerFn>>,
    topic_drivers: RwLock<HashMap<String, String>>,
    type_handlers: RwLock<HashMap<String, HandlerFn>>,
    pending_rules: RwLock<Vec<(String, HandlerFn)>>,
    allowed_topics: RwLock<HashSet<String>>,
    ordered_topics: RwLock<Vec<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-declares an allowed topic (the `topics` configuration option).
    pub fn allow_topic(&self, topic: impl Into<String>) {
        self.allowed_topics.write().insert(topic.into());
    }

    pub fn is_allowed(&self, topic: &str) -> bool {
        let allowed = self.allowed_topics.read();
        allowed.is_empty() || allowed.contains(topic)
    }

    /// `handle_topic(topic, driver_id?, handler)`. Trims inputs, rejects
    /// empty topics, and drops registrations for topics outside a non-empty
    /// allow-list (logging a warning), matching spec.md §4.1.
    pub fn handle_topic(
        &self,
        topic: &str,
        driver_id: Option<String>,
        default_driver_id: Option<&str>,
        handler: HandlerFn,
    ) {
        let topic = topic.trim();
        if topic.is_empty() {
            tracing::warn!("handle_topic called with empty topic, ignoring");
            return;
        }
        if !self.is_allowed(topic) {
            tracing::warn!(topic, "topic not in allowed_topics, ignoring registration");
            return;
        }

        let resolved_driver = driver_id.or_else(|| default_driver_id.map(str::to_string));
        if let Some(driver_id) = resolved_driver {
            self.topic_drivers.write().insert(topic.to_string(), driver_id);
        }

        let is_new = !self.topic_handlers.read().contains_key(topic);
        self.topic_handlers.write().insert(topic.to_string(), handler);
        if is_new {
            self.ordered_topics.write().push(topic.to_string());
        }
    }

    /// `handle_type(type, handler)`.
    pub fn handle_type(&self, r#type: &str, handler: HandlerFn) {
        let r#type = r#type.trim();
        if r#type.is_empty() {
            tracing::warn!("handle_type called with empty type, ignoring");
            return;
        }
        self.type_handlers.write().insert(r#type.to_string(), handler);
    }

    /// `handle_rule(rule_id, handler)`: queued for resolution during the
    /// `run()` prologue, not registered immediately.
    pub fn handle_rule(&self, rule_id: &str, handler: HandlerFn) {
        self.pending_rules.write().push((rule_id.to_string(), handler));
    }

    /// Drains the rules queued via [`Registry::handle_rule`] so `run()`'s
    /// prologue can resolve each against the control plane.
    pub fn take_pending_rules(&self) -> Vec<(String, HandlerFn)> {
        std::mem::take(&mut self.pending_rules.write())
    }

    /// Binds a rule's resolved emit-topic and driver id, overwriting any
    /// prior topic binding with a warning (spec.md §4.1, invariant 8).
    pub fn bind_rule_topic(&self, rule_id: &str, topic: &str, driver_id: &str, handler: HandlerFn) {
        let had_prior = self.topic_handlers.read().contains_key(topic);
        if had_prior {
            tracing::warn!(rule_id, topic, "rule handler overrides existing topic binding");
        }
        self.topic_drivers.write().insert(topic.to_string(), driver_id.to_string());
        self.topic_handlers.write().insert(topic.to_string(), handler);
        if !had_prior {
            self.ordered_topics.write().push(topic.to_string());
        }
    }

    /// Resolves a handler for a message: exact topic match first, else the
    /// event type (spec.md §3, §9 "topic-before-type precedence").
    pub fn resolve(&self, topic: &str, r#type: &str) -> Option<HandlerFn> {
        if let Some(h) = self.topic_handlers.read().get(topic) {
            return Some(h.clone());
        }
        self.type_handlers.read().get(r#type).cloned()
    }

    pub fn driver_for_topic(&self, topic: &str) -> Option<String> {
        self.topic_drivers.read().get(topic).cloned()
    }

    /// Registered topics in first-registration order.
    pub fn topics(&self) -> Vec<String> {
        self.ordered_topics.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_topics.read().is_empty()
    }
}
