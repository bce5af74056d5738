//! Dispatch lifecycle observers.

use async_trait::async_trait;

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::message::Event;

/// Side-effect observer over the dispatch pipeline. Every method defaults to
/// a no-op so implementors override only what they need, the same way
/// `SecretProvider::exists`/`health_check` default in the teacher repo.
///
/// Listeners never influence control flow: every method returns `()`, so a
/// listener has no value-level way to fail a dispatch, and [`ListenerSet`]
/// invokes every registered listener regardless of what earlier ones did.
/// A listener implementation that panics is not caught here and will unwind
/// the dispatch task — keep listener methods panic-free.
#[async_trait]
pub trait Listener: Send + Sync {
    async fn on_start(&self) {}
    async fn on_exit(&self) {}
    async fn on_message_start(&self, _ctx: &WorkerContext, _event: &Event) {}
    async fn on_message_finish(&self, _ctx: &WorkerContext, _event: &Event, _err: Option<&WorkerError>) {}
    async fn on_error(&self, _ctx: &WorkerContext, _event: Option<&Event>, _err: &WorkerError) {}
}

/// An ordered collection of listeners, invoked in registration order.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Vec<std::sync::Arc<dyn Listener>>,
}

impl ListenerSet {
    pub fn new(listeners: Vec<std::sync::Arc<dyn Listener>>) -> Self {
        Self { listeners }
    }

    pub async fn on_start(&self) {
        for l in &self.listeners {
            l.on_start().await;
        }
    }

    pub async fn on_exit(&self) {
        for l in &self.listeners {
            l.on_exit().await;
        }
    }

    pub async fn on_message_start(&self, ctx: &WorkerContext, event: &Event) {
        for l in &self.listeners {
            l.on_message_start(ctx, event).await;
        }
    }

    pub async fn on_message_finish(&self, ctx: &WorkerContext, event: &Event, err: Option<&WorkerError>) {
        for l in &self.listeners {
            l.on_message_finish(ctx, event, err).await;
        }
    }

    pub async fn on_error(&self, ctx: &WorkerContext, event: Option<&Event>, err: &WorkerError) {
        for l in &self.listeners {
            l.on_error(ctx, event, err).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingListener {
        starts: Arc<AtomicU32>,
        finishes: Arc<AtomicU32>,
        order: Arc<parking_lot::Mutex<Vec<&'static str>>>,
        label: &'static str,
    }

    #[async_trait]
    impl Listener for CountingListener {
        async fn on_message_start(&self, _ctx: &WorkerContext, _event: &Event) {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.order.lock().push(self.label);
        }

        async fn on_message_finish(&self, _ctx: &WorkerContext, _event: &Event, _err: Option<&WorkerError>) {
            self.finishes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn invoked_in_registration_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let starts = Arc::new(AtomicU32::new(0));
        let finishes = Arc::new(AtomicU32::new(0));

        let set = ListenerSet::new(vec![
            Arc::new(CountingListener {
                starts: starts.clone(),
                finishes: finishes.clone(),
                order: order.clone(),
                label: "first",
            }),
            Arc::new(CountingListener {
                starts: starts.clone(),
                finishes: finishes.clone(),
                order: order.clone(),
                label: "second",
            }),
        ]);

        let ctx = WorkerContext::root("t", crate::core::CancellationSignal::new());
        let event = Event::default();
        set.on_message_start(&ctx, &event).await;
        set.on_message_finish(&ctx, &event, None).await;

        assert_eq!(*order.lock(), vec!["first", "second"]);
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        assert_eq!(finishes.load(Ordering::SeqCst), 2);
    }
}
