mod error;

pub use error::Error;

use std::sync::Arc;

use async_trait::async_trait;
use courier_pubsub::acker::{Acker, Acknowledge};
use courier_pubsub::handler::PullHandler;
use courier_pubsub::message::InboundMessage;
use courier_pubsub::stream::PullStream;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::warn;

use crate::StoredMessage;

// Stands in for the real broker's redelivery backoff after a nack.
const REDELIVERY_DELAY: Duration = Duration::from_millis(50);

/// Handle to an in-process pull loop.
#[derive(Clone, Debug)]
pub struct MemoryPullStream {
    stop_sender: watch::Sender<()>,
    tracker: TaskTracker,
}

impl MemoryPullStream {
    pub(crate) fn spawn<X>(
        subscription: String,
        max_in_flight: usize,
        mut delivery_rx: mpsc::UnboundedReceiver<StoredMessage>,
        requeue_tx: mpsc::UnboundedSender<StoredMessage>,
        handler: X,
    ) -> Self
    where
        X: PullHandler,
    {
        let (stop_sender, mut stop_receiver) = watch::channel(());
        let tracker = TaskTracker::new();
        let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));

        tracker.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop_receiver.changed() => break,
                    message = delivery_rx.recv() => {
                        let Some(stored) = message else { break };

                        // Bounds in-flight handler invocations; the permit
                        // travels with the spawned invocation below.
                        let permit = tokio::select! {
                            biased;
                            _ = stop_receiver.changed() => break,
                            permit = permits.clone().acquire_owned() => {
                                let Ok(permit) = permit else { break };
                                permit
                            }
                        };

                        let inbound = InboundMessage {
                            subscription: subscription.clone(),
                            data: stored.data.clone(),
                            publish_time: Some(stored.publish_time),
                            delivery_attempt: stored.delivery_attempt,
                        };
                        let acker = Acker::new(Arc::new(MemoryAcker {
                            requeue_tx: requeue_tx.clone(),
                            stored,
                        }));
                        let handler = handler.clone();
                        let subscription_name = subscription.clone();

                        tokio::spawn(async move {
                            if let Err(e) = handler.handle(inbound, acker).await {
                                warn!(subscription = %subscription_name, error = %e, "pull handler failed");
                            }
                            drop(permit);
                        });
                    }
                }
            }
        });
        tracker.close();

        Self {
            stop_sender,
            tracker,
        }
    }
}

#[async_trait]
impl PullStream for MemoryPullStream {
    type Error = Error;

    async fn close(&self) -> Result<(), Self::Error> {
        // Loop may already have exited; a dead receiver is fine.
        let _ = self.stop_sender.send(());
        self.tracker.wait().await;

        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.tracker.is_empty()
    }
}

#[derive(Debug)]
struct MemoryAcker {
    requeue_tx: mpsc::UnboundedSender<StoredMessage>,
    stored: StoredMessage,
}

#[async_trait]
impl Acknowledge for MemoryAcker {
    async fn ack(&self) {}

    async fn nack(&self) {
        let requeue_tx = self.requeue_tx.clone();
        let mut stored = self.stored.clone();
        stored.delivery_attempt += 1;

        // Redelivery happens off the handler's execution path.
        tokio::spawn(async move {
            tokio::time::sleep(REDELIVERY_DELAY).await;
            let _ = requeue_tx.send(stored);
        });
    }
}
