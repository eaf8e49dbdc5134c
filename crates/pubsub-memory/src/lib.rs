//! In-process implementation of the broker client interface.
//!
//! Backs tests and local development. Every [`client::MemoryBroker`] owns its
//! own topics, subscriptions, and queues; independent brokers in one process
//! never share state.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Broker client.
pub mod client;

/// Pull streams.
pub mod stream;

use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use bytes::Bytes;
use tokio::sync::mpsc;

#[derive(Clone, Debug)]
struct StoredMessage {
    data: Bytes,
    publish_time: SystemTime,
    delivery_attempt: u32,
}

#[derive(Debug)]
struct SubscriptionState {
    topic: String,
    max_in_flight: usize,
    delivery_tx: mpsc::UnboundedSender<StoredMessage>,
    // Taken by the first pull; present means no loop is consuming yet.
    delivery_rx: Option<mpsc::UnboundedReceiver<StoredMessage>>,
}

#[derive(Debug, Default)]
struct BrokerState {
    topics: HashSet<String>,
    subscriptions: HashMap<String, SubscriptionState>,
}

#[cfg(test)]
mod tests {
    use super::client::MemoryBroker;

    use std::convert::Infallible;

    use async_trait::async_trait;
    use bytes::Bytes;
    use courier_pubsub::acker::Acker;
    use courier_pubsub::client::{BrokerClient, SubscriptionSpec};
    use courier_pubsub::handler::PullHandler;
    use courier_pubsub::message::InboundMessage;
    use courier_pubsub::stream::PullStream;
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::Receiver;
    use tokio::time::{Duration, timeout};

    #[derive(Clone, Debug)]
    struct RecordingHandler {
        sender: mpsc::Sender<InboundMessage>,
        nack_first_attempt: bool,
    }

    #[async_trait]
    impl PullHandler for RecordingHandler {
        type Error = Infallible;

        async fn handle(&self, message: InboundMessage, acker: Acker) -> Result<(), Infallible> {
            if self.nack_first_attempt && message.delivery_attempt == 1 {
                acker.nack().await;
            } else {
                acker.ack().await;
            }
            let _ = self.sender.send(message).await;
            Ok(())
        }
    }

    fn setup_handler(nack_first_attempt: bool) -> (RecordingHandler, Receiver<InboundMessage>) {
        let (sender, receiver) = mpsc::channel(10);
        (
            RecordingHandler {
                sender,
                nack_first_attempt,
            },
            receiver,
        )
    }

    fn spec(name: &str, topic: &str) -> SubscriptionSpec {
        SubscriptionSpec {
            name: name.to_string(),
            topic: topic.to_string(),
            max_in_flight: 1,
        }
    }

    async fn provision(broker: &MemoryBroker, spec: &SubscriptionSpec) {
        broker.ensure_topic(&spec.topic).await.unwrap();
        broker.ensure_subscription(spec).await.unwrap();
    }

    #[tokio::test]
    async fn publish_reaches_subscription() {
        let broker = MemoryBroker::new();
        let spec = spec("orders", "orders");
        provision(&broker, &spec).await;

        let (handler, mut receiver) = setup_handler(false);
        let _stream = broker.pull(&spec, handler).await.unwrap();

        broker
            .publish("orders", Bytes::from_static(b"{\"id\":1}"))
            .await
            .unwrap();
        broker
            .publish("orders", Bytes::from_static(b"{\"id\":2}"))
            .await
            .unwrap();

        let first = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.data, Bytes::from_static(b"{\"id\":1}"));
        assert_eq!(first.subscription, "orders");
        assert_eq!(first.delivery_attempt, 1);

        let second = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.data, Bytes::from_static(b"{\"id\":2}"));
    }

    #[tokio::test]
    async fn fan_out_across_subscriptions() {
        let broker = MemoryBroker::new();
        let first = spec("orders", "orders");
        let second = spec("orders-2", "orders");
        provision(&broker, &first).await;
        provision(&broker, &second).await;

        let (handler_a, mut receiver_a) = setup_handler(false);
        let (handler_b, mut receiver_b) = setup_handler(false);
        let _stream_a = broker.pull(&first, handler_a).await.unwrap();
        let _stream_b = broker.pull(&second, handler_b).await.unwrap();

        broker
            .publish("orders", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        let got_a = timeout(Duration::from_secs(1), receiver_a.recv())
            .await
            .unwrap()
            .unwrap();
        let got_b = timeout(Duration::from_secs(1), receiver_b.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got_a.subscription, "orders");
        assert_eq!(got_b.subscription, "orders-2");
    }

    #[tokio::test]
    async fn nack_triggers_delayed_redelivery() {
        let broker = MemoryBroker::new();
        let spec = spec("orders", "orders");
        provision(&broker, &spec).await;

        let (handler, mut receiver) = setup_handler(true);
        let _stream = broker.pull(&spec, handler).await.unwrap();

        broker
            .publish("orders", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        let first = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.delivery_attempt, 1);

        let second = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.delivery_attempt, 2);
    }

    #[tokio::test]
    async fn close_stops_delivery_of_buffered_messages() {
        let broker = MemoryBroker::new();
        let spec = spec("orders", "orders");
        provision(&broker, &spec).await;

        let (handler, mut receiver) = setup_handler(false);
        let stream = broker.pull(&spec, handler).await.unwrap();

        stream.close().await.unwrap();
        assert!(stream.is_closed());

        broker
            .publish("orders", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        assert!(
            timeout(Duration::from_millis(200), receiver.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn provisioning_is_idempotent() {
        let broker = MemoryBroker::new();
        let spec = spec("orders", "orders");
        provision(&broker, &spec).await;
        provision(&broker, &spec).await;

        let conflicting = SubscriptionSpec {
            topic: "billing".to_string(),
            ..spec.clone()
        };
        broker.ensure_topic("billing").await.unwrap();
        assert!(broker.ensure_subscription(&conflicting).await.is_err());
    }

    #[tokio::test]
    async fn brokers_do_not_share_state() {
        let broker_a = MemoryBroker::new();
        let broker_b = MemoryBroker::new();
        let spec_a = spec("orders", "orders");
        provision(&broker_a, &spec_a).await;

        let (handler, mut receiver) = setup_handler(false);
        let _stream = broker_a.pull(&spec_a, handler).await.unwrap();

        assert!(
            broker_b
                .publish("orders", Bytes::from_static(b"{}"))
                .await
                .is_err()
        );
        assert!(
            timeout(Duration::from_millis(200), receiver.recv())
                .await
                .is_err()
        );
    }
}
