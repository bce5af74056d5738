//! Subscriber contract: a per-driver delivery loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{Mutex, mpsc};

use crate::core::cancellation::CancellationSignal;
use crate::core::constants::DEFAULT_SHUTDOWN_JOIN_TIMEOUT_SECS;
use crate::message::RawMessage;
use crate::middleware::BoxFuture;

pub use crate::error::SubscriberError;

/// Invoked by a [`Subscriber`] for every delivered message; returns `true`
/// to request requeue (AMQP-style), `false` to ack.
pub type DeliveryHandler =
    Arc<dyn Fn(RawMessage) -> BoxFuture<'static, Result<bool, SubscriberError>> + Send + Sync>;

/// Per-driver delivery loop. `start` blocks the caller until `close` is
/// called or an unrecoverable error occurs; a [`SubscriberError::Timeout`]
/// is retried internally by re-entering rather than propagated.
///
/// Concrete bus drivers (AMQP/NATS/Kafka) are out of scope for this crate —
/// this trait is the seam a caller's driver adapter implements.
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn start(&self, topic: &str, handler: DeliveryHandler) -> Result<(), SubscriberError>;

    /// Idempotent; safe to call from any task. After `close`, in-flight
    /// `start` calls must return promptly.
    async fn close(&self);
}

/// One `(subscriber, topic)` binding owned by a [`CompositeSubscriber`].
pub struct CompositeMember {
    pub subscriber: Arc<dyn Subscriber>,
    pub topic: String,
}

/// Multiplexes several per-driver subscribers by running each `start()`
/// concurrently and joining on all, presenting a single [`Subscriber`] to
/// the caller. [`crate::Worker::run`] builds one of these per run so its
/// fan-out and shutdown watcher have a single handle to drive.
pub struct CompositeSubscriber {
    members: Vec<CompositeMember>,
    join_timeout: Duration,
}

impl CompositeSubscriber {
    pub fn new(members: Vec<CompositeMember>) -> Self {
        Self {
            members,
            join_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_JOIN_TIMEOUT_SECS),
        }
    }

    /// Escape hatch for the open question in spec.md §9: if a driver's
    /// `close()` doesn't unblock its `start()` promptly, the composite's
    /// join no longer waits forever.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl Subscriber for CompositeSubscriber {
    /// Runs every member concurrently. On the first member error, `close()`
    /// is called immediately so blocked siblings unwind rather than waiting
    /// for an external cancellation (spec.md §4.1 fan-out, §5, §7
    /// propagation) — the same `ctx.signal.set()`-on-exception shape as the
    /// original's `_run_tasks.wrap`. The first observed error is returned
    /// once every member has drained.
    async fn start(&self, _topic: &str, handler: DeliveryHandler) -> Result<(), SubscriberError> {
        let mut futures: FuturesUnordered<_> = self
            .members
            .iter()
            .map(|member| {
                let handler = handler.clone();
                let subscriber = member.subscriber.clone();
                let topic = member.topic.clone();
                async move { subscriber.start(&topic, handler).await }
            })
            .collect();

        let mut first_err = None;
        while let Some(result) = futures.next().await {
            if let Err(err) = result
                && first_err.is_none()
            {
                first_err = Some(err);
                self.close().await;
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn close(&self) {
        let closes = self.members.iter().map(|m| m.subscriber.close());
        let _ = tokio::time::timeout(self.join_timeout, join_all(closes)).await;
    }
}

/// An in-memory [`Subscriber`] backed by an unbounded `tokio::mpsc` channel,
/// for tests and for embedding callers who feed messages programmatically
/// rather than through a real bus. Grounded on the shape of the teacher's
/// `MemoryTopicBackend` (`server/src/data/topics/memory.rs`), simplified to
/// a single queue since this crate doesn't model consumer groups.
pub struct ChannelSubscriber {
    receiver: Mutex<mpsc::UnboundedReceiver<RawMessage>>,
    closed: CancellationSignal,
}

impl ChannelSubscriber {
    /// Builds a subscriber paired with the sender used to feed it messages.
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedSender<RawMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Arc::new(Self {
            receiver: Mutex::new(rx),
            closed: CancellationSignal::new(),
        });
        (subscriber, tx)
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    async fn start(&self, _topic: &str, handler: DeliveryHandler) -> Result<(), SubscriberError> {
        let mut receiver = self.receiver.lock().await;
        loop {
            tokio::select! {
                _ = self.closed.cancelled() => return Ok(()),
                received = receiver.recv() => {
                    match received {
                        Some(message) => {
                            handler(message).await?;
                        }
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    async fn close(&self) {
        self.closed.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Notify;

    struct MockSubscriber {
        started: Arc<AtomicU32>,
        closed: Arc<AtomicU32>,
        notify: Arc<Notify>,
    }

    #[async_trait]
    impl Subscriber for MockSubscriber {
        async fn start(&self, _topic: &str, _handler: DeliveryHandler) -> Result<(), SubscriberError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.notify.notified().await;
            Ok(())
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
            self.notify.notify_waiters();
        }
    }

    #[tokio::test]
    async fn composite_starts_all_members_and_closes_all() {
        let started = Arc::new(AtomicU32::new(0));
        let closed = Arc::new(AtomicU32::new(0));
        let notify = Arc::new(Notify::new());

        let members = (0..3)
            .map(|i| CompositeMember {
                subscriber: Arc::new(MockSubscriber {
                    started: started.clone(),
                    closed: closed.clone(),
                    notify: notify.clone(),
                }),
                topic: format!("topic-{i}"),
            })
            .collect();

        let composite = Arc::new(CompositeSubscriber::new(members));
        let handler: DeliveryHandler = Arc::new(|_msg| Box::pin(async { Ok(false) }));

        let composite_clone = composite.clone();
        let run = tokio::spawn(async move { composite_clone.start("", handler).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(started.load(Ordering::SeqCst), 3);

        composite.close().await;
        run.await.unwrap().unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 3);
    }

    struct FailingSubscriber;

    #[async_trait]
    impl Subscriber for FailingSubscriber {
        async fn start(&self, _topic: &str, _handler: DeliveryHandler) -> Result<(), SubscriberError> {
            Err(SubscriberError::Other("boom".into()))
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn composite_error_from_one_member_unblocks_siblings_and_surfaces_first_error() {
        let started = Arc::new(AtomicU32::new(0));
        let closed = Arc::new(AtomicU32::new(0));
        let notify = Arc::new(Notify::new());

        let blocked = CompositeMember {
            subscriber: Arc::new(MockSubscriber {
                started: started.clone(),
                closed: closed.clone(),
                notify: notify.clone(),
            }),
            topic: "blocked".into(),
        };
        let failing = CompositeMember {
            subscriber: Arc::new(FailingSubscriber),
            topic: "failing".into(),
        };

        let composite = CompositeSubscriber::new(vec![blocked, failing]);
        let handler: DeliveryHandler = Arc::new(|_msg| Box::pin(async { Ok(false) }));

        let result = tokio::time::timeout(Duration::from_millis(500), composite.start("", handler))
            .await
            .expect("a member error must unblock siblings rather than waiting on external cancellation");

        assert!(matches!(result, Err(SubscriberError::Other(ref msg)) if msg == "boom"));
        assert_eq!(closed.load(Ordering::SeqCst), 1, "the blocked sibling's close() must run to unblock it");
    }

    #[tokio::test]
    async fn channel_subscriber_delivers_until_closed() {
        let (subscriber, tx) = ChannelSubscriber::channel();
        let delivered = Arc::new(AtomicU32::new(0));
        let delivered_clone = delivered.clone();
        let handler: DeliveryHandler = Arc::new(move |_msg| {
            delivered_clone.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(false) })
        });

        let run_subscriber = subscriber.clone();
        let run = tokio::spawn(async move { run_subscriber.start("t", handler).await });

        tx.send(RawMessage::new("t", b"one".to_vec())).unwrap();
        tx.send(RawMessage::new("t", b"two".to_vec())).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 2);

        subscriber.close().await;
        run.await.unwrap().unwrap();
    }
}
