//! Dispatch engine for the githook event worker SDK.
//!
//! Subscribes to one or more message buses, decodes wire-format event
//! envelopes, dispatches them to user-registered handlers under bounded
//! concurrency with retries and observability, and reports per-event
//! outcome to a control-plane API.

pub mod client_provider;
pub mod codec;
pub mod context;
pub mod controlplane;
pub mod core;
pub mod drivers;
pub mod error;
pub mod listener;
pub mod message;
pub mod middleware;
pub mod registry;
pub mod retry;
pub mod subscriber;
pub mod worker;

pub use client_provider::ClientProvider;
pub use codec::{Codec, DefaultCodec};
pub use context::WorkerContext;
pub use controlplane::{ControlPlaneApi, ControlPlaneClient};
pub use error::WorkerError;
pub use listener::Listener;
pub use message::{Event, RawMessage};
pub use middleware::{HandlerFn, Middleware};
pub use retry::{NoRetry, RetryDecision, RetryPolicy};
pub use subscriber::{ChannelSubscriber, CompositeSubscriber, Subscriber, SubscriberError};
pub use worker::{Worker, WorkerBuilder};
