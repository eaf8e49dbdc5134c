mod error;

pub use error::Error;

use async_nats::Client as NatsClient;
use async_nats::jetstream::Context as JetStreamContext;
use async_nats::jetstream::consumer::pull::Config as NatsConsumerConfig;
use async_nats::jetstream::consumer::{AckPolicy, Consumer as NatsConsumer};
use async_nats::jetstream::stream::Config as NatsStreamConfig;
use async_trait::async_trait;
use bytes::Bytes;
use courier_pubsub::client::{BrokerClient, SubscriptionSpec};
use courier_pubsub::handler::PullHandler;

use crate::stream::NatsPullStream;

/// A broker client backed by NATS JetStream.
///
/// The underlying connection is shared across every subscription and the
/// publish path; `async-nats` handles reconnection on its own.
#[derive(Clone, Debug)]
pub struct NatsBroker {
    client: NatsClient,
    jetstream: JetStreamContext,
}

impl NatsBroker {
    /// Wraps a connected NATS client.
    #[must_use]
    pub fn new(client: NatsClient) -> Self {
        let jetstream = async_nats::jetstream::new(client.clone());

        Self { client, jetstream }
    }

    /// The underlying NATS client.
    #[must_use]
    pub const fn client(&self) -> &NatsClient {
        &self.client
    }

    async fn consumer(
        &self,
        spec: &SubscriptionSpec,
    ) -> Result<NatsConsumer<NatsConsumerConfig>, Error> {
        // Creating a durable consumer with an unchanged configuration is an
        // upsert on the server, so this doubles as the existence check.
        self.jetstream
            .create_consumer_on_stream(
                NatsConsumerConfig {
                    durable_name: Some(spec.name.clone()),
                    ack_policy: AckPolicy::Explicit,
                    max_ack_pending: i64::try_from(spec.max_in_flight).unwrap_or(i64::MAX),
                    ..Default::default()
                },
                spec.topic.as_str(),
            )
            .await
            .map_err(|e| Error::CreateConsumer(e.kind()))
    }
}

#[async_trait]
impl BrokerClient for NatsBroker {
    type Error = Error;

    type Stream = NatsPullStream;

    async fn ensure_topic(&self, topic: &str) -> Result<(), Self::Error> {
        validate_name(topic)?;

        self.jetstream
            .get_or_create_stream(NatsStreamConfig {
                name: topic.to_string(),
                subjects: vec![topic.to_string().into()],
                ..Default::default()
            })
            .await
            .map_err(|e| Error::CreateStream(e.kind()))?;

        Ok(())
    }

    async fn ensure_subscription(&self, spec: &SubscriptionSpec) -> Result<(), Self::Error> {
        validate_name(&spec.name)?;
        validate_name(&spec.topic)?;

        self.consumer(spec).await?;

        Ok(())
    }

    async fn publish(&self, topic: &str, data: Bytes) -> Result<(), Self::Error> {
        self.jetstream
            .publish(topic.to_string(), data)
            .await
            .map_err(|e| Error::Publish(e.kind()))?
            .await
            .map_err(|e| Error::Publish(e.kind()))?;

        Ok(())
    }

    async fn pull<X>(&self, spec: &SubscriptionSpec, handler: X) -> Result<Self::Stream, Self::Error>
    where
        X: PullHandler,
    {
        let consumer = self.consumer(spec).await?;

        Ok(NatsPullStream::spawn(
            spec.name.clone(),
            spec.max_in_flight,
            consumer,
            handler,
        ))
    }
}

// JetStream stream names and single-token subjects share the same reserved
// characters.
fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty() || name.contains(['.', '*', '>', ' ']) {
        return Err(Error::InvalidName(name.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_reject_reserved_characters() {
        for name in ["", "orders.new", "orders*", "orders>", "or ders"] {
            assert!(
                matches!(validate_name(name), Err(Error::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn names_allow_the_prefix_delimiter() {
        assert!(validate_name("test-app%orders").is_ok());
        assert!(validate_name("orders-2").is_ok());
    }
}
