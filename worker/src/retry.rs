//! Retry classification.

use async_trait::async_trait;

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::message::Event;

/// Whether a failed dispatch should be retried and/or nacked back to the
/// bus. `retry ∨ nack` drives the requeue flag returned to the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryDecision {
    pub retry: bool,
    pub nack: bool,
}

impl RetryDecision {
    pub fn requeue(&self) -> bool {
        self.retry || self.nack
    }
}

/// Classifies a dispatch failure into a [`RetryDecision`].
///
/// Per the design notes accompanying this rewrite, only the structured
/// [`RetryDecision`] is accepted — the source SDK's "map with retry/nack
/// keys" convenience is a dynamic-typing accommodation this typed rewrite
/// drops (see DESIGN.md).
#[async_trait]
pub trait RetryPolicy: Send + Sync {
    async fn classify(
        &self,
        ctx: &WorkerContext,
        event: Option<&Event>,
        error: &WorkerError,
    ) -> RetryDecision;
}

/// Default policy: never retry, always nack.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

#[async_trait]
impl RetryPolicy for NoRetry {
    async fn classify(
        &self,
        _ctx: &WorkerContext,
        _event: Option<&Event>,
        _error: &WorkerError,
    ) -> RetryDecision {
        RetryDecision {
            retry: false,
            nack: true,
        }
    }
}
