//! Crate-wide error types.

use thiserror::Error;

/// Errors surfaced while decoding a raw bus message into an [`crate::Event`].
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("payload required")]
    PayloadRequired,

    #[error("failed to parse envelope: {0}")]
    Envelope(String),

    #[error("failed to parse json body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by a [`crate::Subscriber`] implementation.
#[derive(Error, Debug)]
pub enum SubscriberError {
    #[error("transient delivery timeout")]
    Timeout,

    #[error("subscriber error: {0}")]
    Other(String),
}

/// Errors surfaced by the control-plane HTTP client.
#[derive(Error, Debug)]
pub enum ControlPlaneError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("control-plane returned an error response: {0}")]
    Response(String),

    #[error("oauth2 token request failed: {0}")]
    Oauth2(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Configuration errors surfaced from [`crate::Worker::run`]; fatal to
/// startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("at least one topic is required")]
    NoTopics,

    #[error("topic '{topic}' has no driver id and no default driver is configured")]
    MissingDriverId { topic: String },

    #[error("unknown driver id: {0}")]
    UnknownDriver(String),

    #[error("driver '{0}' is disabled")]
    DriverDisabled(String),

    #[error("unsupported driver name: {0}")]
    UnsupportedDriverName(String),

    #[error("topic {topic} not configured for driver {driver_id}")]
    TopicNotConfigured { topic: String, driver_id: String },

    #[error("rule '{rule_id}' has no emit topics")]
    RuleMissingEmit { rule_id: String },

    #[error("rule '{rule_id}' has no driver id")]
    RuleMissingDriver { rule_id: String },
}

/// The top-level error type returned from fallible public operations.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Subscriber(#[from] SubscriberError),

    #[error(transparent)]
    ControlPlane(#[from] ControlPlaneError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("client attachment failed: {0}")]
    ClientAttach(String),

    #[error("handler error: {0}")]
    Handler(String),
}

impl WorkerError {
    /// A stable, human-readable string suitable for event-log reporting.
    pub fn message(&self) -> String {
        self.to_string()
    }
}
