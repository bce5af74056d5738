//! Per-dispatch context, threaded through the pipeline and into handlers.

use crate::core::CancellationSignal;

/// Context for a single message dispatch, or the root context passed to
/// [`crate::Worker::run`]. Child contexts inherit `tenant_id` and the
/// cancellation signal from their parent; `topic`/`request_id`/`log_id` are
/// set per-message.
#[derive(Clone, Debug)]
pub struct WorkerContext {
    pub tenant_id: String,
    pub topic: String,
    pub request_id: String,
    pub log_id: String,
    cancellation: CancellationSignal,
}

impl WorkerContext {
    /// Root context for a worker run.
    pub fn root(tenant_id: impl Into<String>, cancellation: CancellationSignal) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            topic: String::new(),
            request_id: String::new(),
            log_id: String::new(),
            cancellation,
        }
    }

    /// Derive a per-message child context, inheriting tenant and cancellation.
    pub fn for_message(
        &self,
        topic: impl Into<String>,
        request_id: impl Into<String>,
        log_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: self.tenant_id.clone(),
            topic: topic.into(),
            request_id: request_id.into(),
            log_id: log_id.into(),
            cancellation: self.cancellation.clone(),
        }
    }

    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_inherits_tenant_and_cancellation() {
        let sig = CancellationSignal::new();
        let root = WorkerContext::root("acme", sig.clone());
        let child = root.for_message("t", "r1", "l1");
        assert_eq!(child.tenant_id, "acme");
        assert_eq!(child.topic, "t");
        assert_eq!(child.request_id, "r1");
        assert_eq!(child.log_id, "l1");
        sig.cancel();
        assert!(child.is_cancelled());
    }
}
