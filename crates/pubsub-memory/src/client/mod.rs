mod error;

pub use error::Error;

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use courier_pubsub::client::{BrokerClient, SubscriptionSpec};
use courier_pubsub::handler::PullHandler;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::stream::MemoryPullStream;
use crate::{BrokerState, StoredMessage, SubscriptionState};

/// An in-process broker client backed by per-subscription queues.
///
/// State lives on the instance; cloning shares it, constructing a new broker
/// does not.
#[derive(Clone, Debug, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    /// Creates a broker with no topics or subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BrokerClient for MemoryBroker {
    type Error = Error;

    type Stream = MemoryPullStream;

    async fn ensure_topic(&self, topic: &str) -> Result<(), Self::Error> {
        if topic.is_empty() {
            return Err(Error::InvalidName(topic.to_string()));
        }

        let mut state = self.state.lock().await;
        if state.topics.insert(topic.to_string()) {
            debug!(topic, "created topic");
        }

        Ok(())
    }

    async fn ensure_subscription(&self, spec: &SubscriptionSpec) -> Result<(), Self::Error> {
        if spec.name.is_empty() {
            return Err(Error::InvalidName(spec.name.clone()));
        }

        let mut state = self.state.lock().await;
        if !state.topics.contains(&spec.topic) {
            return Err(Error::TopicNotFound(spec.topic.clone()));
        }

        if let Some(existing) = state.subscriptions.get(&spec.name) {
            if existing.topic == spec.topic {
                return Ok(());
            }
            return Err(Error::SubscriptionConflict {
                name: spec.name.clone(),
                topic: existing.topic.clone(),
            });
        }

        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        state.subscriptions.insert(
            spec.name.clone(),
            SubscriptionState {
                topic: spec.topic.clone(),
                max_in_flight: spec.max_in_flight.max(1),
                delivery_tx,
                delivery_rx: Some(delivery_rx),
            },
        );
        debug!(subscription = %spec.name, topic = %spec.topic, "created subscription");

        Ok(())
    }

    async fn publish(&self, topic: &str, data: Bytes) -> Result<(), Self::Error> {
        let state = self.state.lock().await;
        if !state.topics.contains(topic) {
            return Err(Error::TopicNotFound(topic.to_string()));
        }

        let message = StoredMessage {
            data,
            publish_time: SystemTime::now(),
            delivery_attempt: 1,
        };

        for subscription in state.subscriptions.values().filter(|s| s.topic == topic) {
            // Send failure means the queue is gone entirely; the message is
            // simply dropped, as a real broker would for a deleted subscription.
            let _ = subscription.delivery_tx.send(message.clone());
        }

        Ok(())
    }

    async fn pull<X>(&self, spec: &SubscriptionSpec, handler: X) -> Result<Self::Stream, Self::Error>
    where
        X: PullHandler,
    {
        let mut state = self.state.lock().await;
        let subscription = state
            .subscriptions
            .get_mut(&spec.name)
            .ok_or_else(|| Error::SubscriptionNotFound(spec.name.clone()))?;

        let delivery_rx = subscription
            .delivery_rx
            .take()
            .ok_or_else(|| Error::AlreadyPulling(spec.name.clone()))?;

        Ok(MemoryPullStream::spawn(
            spec.name.clone(),
            subscription.max_in_flight,
            delivery_rx,
            subscription.delivery_tx.clone(),
            handler,
        ))
    }
}
