//! The dispatch engine: owns the registry, builds subscribers, runs the
//! fan-out loop, and drives the per-message pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::client_provider::{ClientProvider, NoClientProvider};
use crate::codec::{Codec, DefaultCodec};
use crate::context::WorkerContext;
use crate::controlplane::{ControlPlaneApi, ControlPlaneClient};
use crate::core::cancellation::CancellationSignal;
use crate::core::config::{ConfigOverrides, Oauth2Config, WorkerConfig};
use crate::core::constants::{METADATA_DRIVER, REQUEUE_HONORING_DRIVER, STATUS_FAILED, STATUS_SUCCESS};
use crate::core::logging::{self, LoggerFn};
use crate::drivers::{FactoryRegistry, SubscriberConfig, SubscriberFactory};
use crate::error::{ConfigError, WorkerError};
use crate::listener::{Listener, ListenerSet};
use crate::message::RawMessage;
use crate::middleware::{self, HandlerFn, Middleware};
use crate::registry::Registry;
use crate::retry::{NoRetry, RetryDecision, RetryPolicy};
use crate::subscriber::{CompositeMember, CompositeSubscriber, DeliveryHandler, Subscriber};

/// Builds a [`Worker`]. Every setter documents the environment-variable
/// fallback applied at [`WorkerBuilder::build`] for options that have one.
pub struct WorkerBuilder {
    overrides: ConfigOverrides,
    subscriber: Option<Arc<dyn Subscriber>>,
    codec: Option<Arc<dyn Codec>>,
    logger: Option<LoggerFn>,
    middleware: Vec<Middleware>,
    retry: Option<Arc<dyn RetryPolicy>>,
    listeners: Vec<Arc<dyn Listener>>,
    client_provider: Option<Arc<dyn ClientProvider>>,
    driver_factories: FactoryRegistry,
    registry: Registry,
    control_plane: Option<Arc<dyn ControlPlaneApi>>,
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self {
            overrides: ConfigOverrides::default(),
            subscriber: None,
            codec: None,
            logger: None,
            middleware: Vec::new(),
            retry: None,
            listeners: Vec::new(),
            client_provider: None,
            driver_factories: FactoryRegistry::default(),
            registry: Registry::new(),
            control_plane: None,
        }
    }
}

impl WorkerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single pre-built subscriber, bypassing per-driver construction
    /// from control-plane `Driver` records.
    pub fn subscriber(mut self, subscriber: Arc<dyn Subscriber>) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    /// Pre-declares the allowed-topics list. When non-empty,
    /// [`WorkerBuilder::handle_topic`] registrations for any other topic
    /// are dropped with a warning.
    pub fn topics(self, topics: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for topic in topics {
            self.registry.allow_topic(topic.into());
        }
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// A printf-style sink, invoked alongside `tracing` for every
    /// pipeline-level log line.
    pub fn logger(mut self, logger: LoggerFn) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sizes the handler semaphore; clamped to at least 1.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.overrides.concurrency = Some(concurrency);
        self
    }

    /// Appends a middleware; first-registered is outermost.
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn retry(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Total attempts = `retry_count + 1`; clamped from negative to 0 by
    /// the `u32` type itself.
    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.overrides.retry_count = Some(retry_count);
        self
    }

    /// Appends a listener, invoked in registration order.
    pub fn listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn client_provider(mut self, provider: Arc<dyn ClientProvider>) -> Self {
        self.client_provider = Some(provider);
        self
    }

    /// Falls back to `GITHOOK_ENDPOINT` if left unset.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.overrides.endpoint = Some(endpoint.into());
        self
    }

    /// Falls back to `GITHOOK_API_BASE_URL` if left unset.
    pub fn api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.overrides.api_base_url = Some(api_base_url.into());
        self
    }

    /// Falls back to `GITHOOK_API_KEY` if left unset.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.overrides.api_key = Some(api_key.into());
        self
    }

    /// Falls back to `GITHOOK_OAUTH2_*` env vars field-by-field if left
    /// unset.
    pub fn oauth2(mut self, oauth2: Oauth2Config) -> Self {
        self.overrides.oauth2 = Some(oauth2);
        self
    }

    /// Falls back to `GITHOOK_TENANT_ID` if left unset.
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.overrides.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn default_driver_id(mut self, driver_id: impl Into<String>) -> Self {
        self.overrides.default_driver_id = Some(driver_id.into());
        self
    }

    /// When true (the default), topics are validated against control-plane
    /// rules before dispatch begins.
    pub fn validate_topics(mut self, validate: bool) -> Self {
        self.overrides.validate_topics = Some(validate);
        self
    }

    /// Registers a [`SubscriberFactory`] for a driver name (`amqp`, `nats`,
    /// `kafka`, or a caller-defined name), used to build per-driver
    /// subscribers from control-plane `Driver` records during [`Worker::run`].
    pub fn driver_factory(
        mut self,
        driver_name: impl Into<String>,
        factory: Arc<dyn SubscriberFactory>,
    ) -> Self {
        self.driver_factories.register(driver_name, factory);
        self
    }

    /// `handle_topic(topic, driver_id?, handler)`: see spec.md §4.1 for the
    /// full registration semantics (trimming, allow-list filtering,
    /// default-driver fallback).
    pub fn handle_topic(
        self,
        topic: impl AsRef<str>,
        driver_id: Option<String>,
        handler: HandlerFn,
    ) -> Self {
        let default_driver_id = self.overrides.default_driver_id.clone();
        self.registry.handle_topic(
            topic.as_ref(),
            driver_id,
            default_driver_id.as_deref(),
            handler,
        );
        self
    }

    pub fn handle_type(self, r#type: impl AsRef<str>, handler: HandlerFn) -> Self {
        self.registry.handle_type(r#type.as_ref(), handler);
        self
    }

    /// Queues a rule id for resolution during the `run()` prologue; the
    /// rule's first emit topic and driver id are bound once resolved.
    pub fn handle_rule(self, rule_id: impl AsRef<str>, handler: HandlerFn) -> Self {
        self.registry.handle_rule(rule_id.as_ref(), handler);
        self
    }

    /// Substitutes the control-plane RPC client, bypassing the real
    /// `reqwest`-backed [`ControlPlaneClient`]. Tests use this to inject a
    /// mock implementation.
    pub fn control_plane_client(mut self, client: Arc<dyn ControlPlaneApi>) -> Self {
        self.control_plane = Some(client);
        self
    }

    pub fn build(self) -> Result<Arc<Worker>, WorkerError> {
        let config = WorkerConfig::resolve(self.overrides);
        let control_plane = match self.control_plane {
            Some(client) => client,
            None => Arc::new(ControlPlaneClient::new(&config)?),
        };

        Ok(Arc::new(Worker {
            semaphore: Semaphore::new(config.concurrency),
            config,
            registry: self.registry,
            subscriber: self.subscriber,
            codec: self.codec.unwrap_or_else(|| Arc::new(DefaultCodec)),
            logger: self.logger,
            middleware: self.middleware,
            retry: self.retry.unwrap_or_else(|| Arc::new(NoRetry)),
            listeners: ListenerSet::new(self.listeners),
            client_provider: self.client_provider.unwrap_or_else(|| Arc::new(NoClientProvider)),
            driver_factories: self.driver_factories,
            control_plane,
        }))
    }
}

/// The dispatch engine. Build one via [`WorkerBuilder`], then [`Worker::run`]
/// it to completion (it returns once every subscriber fan-out task has
/// ended, typically on cancellation).
pub struct Worker {
    config: WorkerConfig,
    registry: Registry,
    subscriber: Option<Arc<dyn Subscriber>>,
    codec: Arc<dyn Codec>,
    logger: Option<LoggerFn>,
    middleware: Vec<Middleware>,
    retry: Arc<dyn RetryPolicy>,
    listeners: ListenerSet,
    client_provider: Arc<dyn ClientProvider>,
    driver_factories: FactoryRegistry,
    control_plane: Arc<dyn ControlPlaneApi>,
    semaphore: Semaphore,
}

impl Worker {
    /// Runs the worker to completion: rule prologue, topic requirement
    /// check, subscriber construction, optional topic validation, and
    /// fan-out across every `(subscriber, topic)` pair. Returns once the
    /// cancellation signal trips and every subscriber has closed, or once
    /// a fan-out task fails.
    ///
    /// `on_start`/`on_exit` bracket only the fan-out itself: a startup
    /// failure in the rule prologue or topic validation returns before
    /// either fires, matching the original's `notify_start` placement after
    /// `prepare_rule_subscriptions`/`validate_topics`.
    pub async fn run(self: &Arc<Self>, cancellation: CancellationSignal) -> Result<(), WorkerError> {
        let root_ctx = WorkerContext::root(self.config.tenant_id.clone(), cancellation.clone());
        self.run_inner(&root_ctx, &cancellation).await
    }

    async fn run_inner(
        self: &Arc<Self>,
        root_ctx: &WorkerContext,
        cancellation: &CancellationSignal,
    ) -> Result<(), WorkerError> {
        self.resolve_rule_prologue().await?;

        let topics = self.registry.topics();
        if topics.is_empty() {
            return Err(WorkerError::Config(ConfigError::NoTopics));
        }

        let members = if let Some(subscriber) = &self.subscriber {
            topics
                .into_iter()
                .map(|topic| CompositeMember {
                    subscriber: subscriber.clone(),
                    topic,
                })
                .collect()
        } else {
            self.build_driver_members(&topics).await?
        };

        let composite = Arc::new(CompositeSubscriber::new(members));

        self.listeners.on_start().await;

        let watcher_composite = composite.clone();
        let watcher_signal = cancellation.clone();
        let watcher = tokio::spawn(async move {
            watcher_signal.cancelled().await;
            watcher_composite.close().await;
        });

        let handler = self.delivery_handler(root_ctx.clone());
        let result = composite.start("", handler).await;

        cancellation.cancel();
        let _ = watcher.await;

        self.listeners.on_exit().await;

        result.map_err(WorkerError::from)
    }

    /// Resolves every rule queued via [`WorkerBuilder::handle_rule`]
    /// against the control plane, binding `emit[0] -> handler` and
    /// `topic -> driver_id`, overwriting any prior topic binding with a
    /// warning (spec.md §4.1 step 2, invariant 8).
    async fn resolve_rule_prologue(&self) -> Result<(), WorkerError> {
        for (rule_id, handler) in self.registry.take_pending_rules() {
            let rule = self.control_plane.get_rule(&rule_id).await?;
            let topic = rule.emit.first().filter(|t| !t.is_empty()).ok_or_else(|| {
                WorkerError::Config(ConfigError::RuleMissingEmit {
                    rule_id: rule_id.clone(),
                })
            })?;
            if rule.driver_id.is_empty() {
                return Err(WorkerError::Config(ConfigError::RuleMissingDriver { rule_id }));
            }
            self.registry.bind_rule_topic(&rule_id, topic, &rule.driver_id, handler);
        }
        Ok(())
    }

    /// Groups registered topics by driver id, fetches and validates the
    /// control-plane `Driver` record for each, builds one subscriber per
    /// distinct driver via the registered [`SubscriberFactory`], and
    /// optionally validates every topic against control-plane rules
    /// (spec.md §4.1 steps 5–6).
    async fn build_driver_members(&self, topics: &[String]) -> Result<Vec<CompositeMember>, WorkerError> {
        let mut topics_by_driver: HashMap<String, Vec<String>> = HashMap::new();
        for topic in topics {
            let driver_id = self
                .registry
                .driver_for_topic(topic)
                .or_else(|| self.config.default_driver_id.clone())
                .ok_or_else(|| {
                    WorkerError::Config(ConfigError::MissingDriverId { topic: topic.clone() })
                })?;
            topics_by_driver.entry(driver_id).or_default().push(topic.clone());
        }

        let drivers = self.control_plane.list_drivers().await?;
        let driver_by_id: HashMap<String, _> = drivers.into_iter().map(|d| (d.id.clone(), d)).collect();

        let mut driver_subs: HashMap<String, Arc<dyn Subscriber>> = HashMap::new();
        for driver_id in topics_by_driver.keys() {
            let driver = driver_by_id
                .get(driver_id)
                .ok_or_else(|| WorkerError::Config(ConfigError::UnknownDriver(driver_id.clone())))?;
            if !driver.enabled {
                return Err(WorkerError::Config(ConfigError::DriverDisabled(driver_id.clone())));
            }
            let subscriber_config = SubscriberConfig::parse(&driver.name, &driver.config_json)?;
            let subscriber = self.driver_factories.build(&driver.name, &subscriber_config)?;
            driver_subs.insert(driver_id.clone(), subscriber);
        }

        if self.config.validate_topics {
            self.validate_topics(&topics_by_driver).await?;
        }

        Ok(topics_by_driver
            .into_iter()
            .flat_map(|(driver_id, driver_topics)| {
                let subscriber = driver_subs
                    .get(&driver_id)
                    .expect("constructed above for every key in topics_by_driver")
                    .clone();
                driver_topics
                    .into_iter()
                    .map(move |topic| CompositeMember {
                        subscriber: subscriber.clone(),
                        topic,
                    })
            })
            .collect())
    }

    async fn validate_topics(
        &self,
        topics_by_driver: &HashMap<String, Vec<String>>,
    ) -> Result<(), WorkerError> {
        let rules = self.control_plane.list_rules().await?;
        let mut allowed_by_driver: HashMap<String, HashSet<String>> = HashMap::new();
        for rule in &rules {
            let entry = allowed_by_driver.entry(rule.driver_id.clone()).or_default();
            entry.extend(rule.emit.iter().cloned());
        }

        for (driver_id, driver_topics) in topics_by_driver {
            let allowed = allowed_by_driver.get(driver_id);
            for topic in driver_topics {
                let ok = allowed.is_some_and(|set| set.contains(topic));
                if !ok {
                    return Err(WorkerError::Config(ConfigError::TopicNotConfigured {
                        topic: topic.clone(),
                        driver_id: driver_id.clone(),
                    }));
                }
            }
        }
        Ok(())
    }

    fn delivery_handler(self: &Arc<Self>, root_ctx: WorkerContext) -> DeliveryHandler {
        let worker = self.clone();
        Arc::new(move |message: RawMessage| {
            let worker = worker.clone();
            let root_ctx = root_ctx.clone();
            Box::pin(async move { Ok(worker.dispatch_message(&root_ctx, message).await) })
        })
    }

    /// The per-message pipeline (spec.md §4.1, the central algorithm).
    /// Returns the requeue flag; dispatch failures are handled internally
    /// via listeners, status reporting, and the retry policy rather than
    /// propagated, so a [`crate::SubscriberError`] never originates here.
    async fn dispatch_message(self: &Arc<Self>, root_ctx: &WorkerContext, message: RawMessage) -> bool {
        let log_id = message.log_id();
        let driver_value = message.metadata.get(METADATA_DRIVER).cloned();

        logging::emit(self.logger.as_ref(), &format!("decoding message on topic {}", message.topic));

        let mut event = match self.codec.decode(&message) {
            Ok(event) => event,
            Err(err) => {
                let err = WorkerError::from(err);
                self.report_status(&log_id, Err(&err)).await;
                self.listeners.on_error(root_ctx, None, &err).await;
                let decision = self.retry.classify(root_ctx, None, &err).await;
                return self.requeue_flag(decision, driver_value.as_deref());
            }
        };

        let ctx = root_ctx.for_message(event.topic.clone(), event.request_id.clone(), event.log_id.clone());

        match self.client_provider.client_for(&ctx, &event).await {
            Ok(Some(client)) => event.client = Some(client),
            Ok(None) => {}
            Err(err) => {
                self.report_status(&event.log_id, Err(&err)).await;
                self.listeners.on_error(&ctx, Some(&event), &err).await;
                let decision = self.retry.classify(&ctx, Some(&event), &err).await;
                return self.requeue_flag(decision, driver_value.as_deref());
            }
        }

        if !event.request_id.is_empty() {
            tracing::debug!(request_id = %event.request_id, topic = %ctx.topic, "dispatching request");
        }

        self.listeners.on_message_start(&ctx, &event).await;

        let Some(handler) = self.registry.resolve(&ctx.topic, &event.r#type) else {
            tracing::debug!(topic = %ctx.topic, event_type = %event.r#type, "no handler registered");
            self.listeners.on_message_finish(&ctx, &event, None).await;
            self.report_status(&event.log_id, Ok(())).await;
            return false;
        };

        let wrapped = middleware::compose(&self.middleware, handler);
        let last_err = self.invoke_with_retry(&wrapped, &ctx, &event).await;

        match last_err {
            None => {
                self.listeners.on_message_finish(&ctx, &event, None).await;
                self.report_status(&event.log_id, Ok(())).await;
                false
            }
            Some(err) => {
                self.listeners.on_message_finish(&ctx, &event, Some(&err)).await;
                self.listeners.on_error(&ctx, Some(&event), &err).await;
                self.report_status(&event.log_id, Err(&err)).await;
                let decision = self.retry.classify(&ctx, Some(&event), &err).await;
                self.requeue_flag(decision, driver_value.as_deref())
            }
        }
    }

    /// Up to `retry_count + 1` attempts; breaks on first success. The
    /// handler semaphore is acquired only around the invocation itself, not
    /// decode or client attachment (spec.md §5).
    async fn invoke_with_retry(
        &self,
        handler: &HandlerFn,
        ctx: &WorkerContext,
        event: &crate::message::Event,
    ) -> Option<WorkerError> {
        let attempts = self.config.retry_count + 1;
        let mut last_err = None;
        for _ in 0..attempts {
            let permit = self
                .semaphore
                .acquire()
                .await
                .expect("semaphore is never closed");
            let result = handler(ctx.clone(), event.clone()).await;
            drop(permit);

            match result {
                Ok(()) => return None,
                Err(err) => last_err = Some(err),
            }
        }
        last_err
    }

    async fn report_status(&self, log_id: &str, outcome: Result<(), &WorkerError>) {
        if log_id.is_empty() {
            return;
        }
        let (status, error_message) = match outcome {
            Ok(()) => (STATUS_SUCCESS, String::new()),
            Err(err) => (STATUS_FAILED, err.message()),
        };
        if let Err(err) = self
            .control_plane
            .update_event_log_status(log_id, status, &error_message)
            .await
        {
            tracing::warn!(log_id, error = %err, "failed to report event log status");
        }
    }

    /// Translates a retry decision into a bus-level requeue signal, honored
    /// only for drivers whose metadata key equals `amqp`, case-insensitively
    /// — matching the original's `driver.lower() == "amqp"` (spec.md §4.1,
    /// invariant 9).
    fn requeue_flag(&self, decision: RetryDecision, driver: Option<&str>) -> bool {
        decision.requeue() && driver.is_some_and(|d| d.eq_ignore_ascii_case(REQUEUE_HONORING_DRIVER))
    }
}
