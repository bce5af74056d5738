//! A [`githook_worker::Listener`] that records every call, in order, so
//! tests can assert on invocation counts and ordering (spec.md §8
//! invariants 1-3).

use async_trait::async_trait;
use parking_lot::Mutex;

use githook_worker::{Event, Listener, WorkerContext, WorkerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start,
    Exit,
    MessageStart { topic: String },
    MessageFinish { topic: String, err: Option<String> },
    Error { has_event: bool, err: String },
}

#[derive(Default)]
pub struct RecordingListener {
    calls: Mutex<Vec<Call>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| f(c)).count()
    }
}

#[async_trait]
impl Listener for RecordingListener {
    async fn on_start(&self) {
        self.calls.lock().push(Call::Start);
    }

    async fn on_exit(&self) {
        self.calls.lock().push(Call::Exit);
    }

    async fn on_message_start(&self, ctx: &WorkerContext, _event: &Event) {
        self.calls.lock().push(Call::MessageStart {
            topic: ctx.topic.clone(),
        });
    }

    async fn on_message_finish(&self, ctx: &WorkerContext, _event: &Event, err: Option<&WorkerError>) {
        self.calls.lock().push(Call::MessageFinish {
            topic: ctx.topic.clone(),
            err: err.map(|e| e.message()),
        });
    }

    async fn on_error(&self, _ctx: &WorkerContext, event: Option<&Event>, err: &WorkerError) {
        self.calls.lock().push(Call::Error {
            has_event: event.is_some(),
            err: err.message(),
        });
    }
}
