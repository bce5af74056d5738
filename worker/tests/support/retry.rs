//! A configurable, call-recording [`githook_worker::RetryPolicy`].

use async_trait::async_trait;
use parking_lot::Mutex;

use githook_worker::{Event, RetryDecision, RetryPolicy, WorkerContext, WorkerError};

pub struct ScriptedRetry {
    decision: RetryDecision,
    invocations: Mutex<Vec<bool>>,
}

impl ScriptedRetry {
    pub fn new(decision: RetryDecision) -> Self {
        Self {
            decision,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().len()
    }
}

#[async_trait]
impl RetryPolicy for ScriptedRetry {
    async fn classify(&self, _ctx: &WorkerContext, event: Option<&Event>, _error: &WorkerError) -> RetryDecision {
        self.invocations.lock().push(event.is_some());
        self.decision
    }
}
