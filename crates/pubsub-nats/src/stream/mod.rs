mod error;

pub use error::Error;

use std::sync::Arc;

use async_nats::jetstream::AckKind;
use async_nats::jetstream::Message as NatsMessage;
use async_nats::jetstream::consumer::Consumer as NatsConsumer;
use async_nats::jetstream::consumer::pull::Config as NatsConsumerConfig;
use async_trait::async_trait;
use courier_pubsub::acker::{Acker, Acknowledge};
use courier_pubsub::handler::PullHandler;
use courier_pubsub::message::InboundMessage;
use courier_pubsub::stream::PullStream;
use futures::StreamExt;
use tokio::sync::{Semaphore, watch};
use tokio::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{error, warn};

// Bounds how often a dropped message stream is re-opened before the
// subscription's loop gives up; other subscriptions are unaffected.
const RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Handle to a JetStream pull loop.
#[derive(Clone, Debug)]
pub struct NatsPullStream {
    stop_sender: watch::Sender<()>,
    tracker: TaskTracker,
}

impl NatsPullStream {
    pub(crate) fn spawn<X>(
        subscription: String,
        max_in_flight: usize,
        consumer: NatsConsumer<NatsConsumerConfig>,
        handler: X,
    ) -> Self
    where
        X: PullHandler,
    {
        let (stop_sender, stop_receiver) = watch::channel(());
        let tracker = TaskTracker::new();

        tracker.spawn(Self::process_messages(
            subscription,
            max_in_flight,
            consumer,
            handler,
            stop_receiver,
        ));
        tracker.close();

        Self {
            stop_sender,
            tracker,
        }
    }

    async fn process_messages<X>(
        subscription: String,
        max_in_flight: usize,
        consumer: NatsConsumer<NatsConsumerConfig>,
        handler: X,
        mut stop_receiver: watch::Receiver<()>,
    ) where
        X: PullHandler,
    {
        let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
        let mut reopen_attempts: u32 = 0;

        'outer: loop {
            let mut messages = match consumer.messages().await {
                Ok(messages) => {
                    reopen_attempts = 0;
                    messages
                }
                Err(e) => {
                    reopen_attempts += 1;
                    if reopen_attempts > RECONNECT_ATTEMPTS {
                        error!(
                            subscription = %subscription,
                            error = %e,
                            "message stream could not be re-opened, stopping subscription"
                        );
                        break;
                    }
                    warn!(
                        subscription = %subscription,
                        error = %e,
                        attempt = reopen_attempts,
                        "failed to open message stream, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = stop_receiver.changed() => break 'outer,
                        () = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                    continue;
                }
            };

            loop {
                tokio::select! {
                    biased;
                    _ = stop_receiver.changed() => break 'outer,
                    next = messages.next() => {
                        let message = match next {
                            Some(Ok(message)) => message,
                            Some(Err(e)) => {
                                warn!(
                                    subscription = %subscription,
                                    error = %e,
                                    "message stream error, re-opening"
                                );
                                continue 'outer;
                            }
                            None => {
                                warn!(subscription = %subscription, "message stream ended, re-opening");
                                continue 'outer;
                            }
                        };

                        // Bounds in-flight handler invocations; the permit
                        // travels with the spawned invocation below.
                        let permit = tokio::select! {
                            biased;
                            _ = stop_receiver.changed() => break 'outer,
                            permit = permits.clone().acquire_owned() => {
                                let Ok(permit) = permit else { break 'outer };
                                permit
                            }
                        };

                        let (publish_time, delivery_attempt) = match message.info() {
                            Ok(info) => (
                                Some(info.published.into()),
                                u32::try_from(info.delivered).unwrap_or(u32::MAX),
                            ),
                            Err(e) => {
                                warn!(subscription = %subscription, error = %e, "missing delivery info");
                                (None, 1)
                            }
                        };

                        let inbound = InboundMessage {
                            subscription: subscription.clone(),
                            data: message.payload.clone(),
                            publish_time,
                            delivery_attempt,
                        };
                        let acker = Acker::new(Arc::new(NatsAcker {
                            message: message.clone(),
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
        }
    }
}

#[async_trait]
impl PullStream for NatsPullStream {
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
struct NatsAcker {
    message: NatsMessage,
}

#[async_trait]
impl Acknowledge for NatsAcker {
    async fn ack(&self) {
        if let Err(e) = self.message.ack().await {
            warn!(error = %e, "failed to ack delivery");
        }
    }

    async fn nack(&self) {
        if let Err(e) = self.message.ack_with(AckKind::Nak(None)).await {
            warn!(error = %e, "failed to nack delivery");
        }
    }
}
