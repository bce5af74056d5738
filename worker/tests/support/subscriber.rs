//! A channel-backed [`githook_worker::Subscriber`] that additionally records
//! the requeue flag the dispatch pipeline hands back for every delivery, so
//! tests can assert on spec.md §8 invariant 9 without a real bus.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use githook_worker::core::CancellationSignal;
use githook_worker::subscriber::{DeliveryHandler, SubscriberError};
use githook_worker::{RawMessage, Subscriber};

pub struct RecordingSubscriber {
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<RawMessage>>,
    closed: CancellationSignal,
    requeues: Mutex<Vec<bool>>,
}

impl RecordingSubscriber {
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedSender<RawMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Arc::new(Self {
            receiver: tokio::sync::Mutex::new(rx),
            closed: CancellationSignal::new(),
            requeues: Mutex::new(Vec::new()),
        });
        (subscriber, tx)
    }

    pub fn requeues(&self) -> Vec<bool> {
        self.requeues.lock().clone()
    }
}

#[async_trait]
impl Subscriber for RecordingSubscriber {
    async fn start(&self, _topic: &str, handler: DeliveryHandler) -> Result<(), SubscriberError> {
        let mut receiver = self.receiver.lock().await;
        loop {
            tokio::select! {
                _ = self.closed.cancelled() => return Ok(()),
                received = receiver.recv() => {
                    match received {
                        Some(message) => {
                            let requeue = handler(message).await?;
                            self.requeues.lock().push(requeue);
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
