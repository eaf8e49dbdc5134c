use courier_pubsub::client::BrokerClientError;
use thiserror::Error;

/// Errors that can occur in the JetStream broker client.
#[derive(Debug, Error)]
pub enum Error {
    /// Consumer creation or lookup failed.
    #[error("failed to create consumer: {0}")]
    CreateConsumer(async_nats::jetstream::stream::ConsumerErrorKind),

    /// Stream creation or lookup failed.
    #[error("failed to create stream: {0}")]
    CreateStream(async_nats::jetstream::context::CreateStreamErrorKind),

    /// Name is empty or contains characters reserved by NATS.
    #[error("invalid resource name: {0:?}")]
    InvalidName(String),

    /// The broker did not acknowledge a published message.
    #[error("failed to publish: {0}")]
    Publish(async_nats::jetstream::context::PublishErrorKind),
}

impl BrokerClientError for Error {}
