use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

use crate::handler::PullHandler;
use crate::stream::PullStream;

/// Marker trait for broker client errors.
pub trait BrokerClientError: Error + Send + Sync + 'static {}

/// Provisioning and streaming parameters for one physical subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionSpec {
    /// Physical subscription name.
    pub name: String,

    /// Topic the subscription is bound to.
    pub topic: String,

    /// Maximum handler invocations in flight on this subscription's loop.
    pub max_in_flight: usize,
}

/// Thin facade over a managed publish/subscribe service.
///
/// Creation calls are idempotent: ensuring a topic or subscription that
/// already exists is a success, so repeated provisioning passes (and races
/// between processes) are tolerated.
#[async_trait]
pub trait BrokerClient: Clone + Debug + Send + Sync + 'static {
    /// The error type for the client.
    type Error: BrokerClientError;

    /// The stream handle type returned by [`pull`](Self::pull).
    type Stream: PullStream;

    /// Checks for the topic and creates it if absent.
    async fn ensure_topic(&self, topic: &str) -> Result<(), Self::Error>;

    /// Checks for the subscription and creates it if absent.
    ///
    /// The subscription's topic must already exist.
    async fn ensure_subscription(&self, spec: &SubscriptionSpec) -> Result<(), Self::Error>;

    /// Publishes serialized payload bytes to a topic.
    ///
    /// Resolves once the broker acknowledges receipt; downstream processing
    /// is fire-and-forget from the caller's perspective.
    async fn publish(&self, topic: &str, data: Bytes) -> Result<(), Self::Error>;

    /// Opens a persistent streaming pull on the subscription.
    ///
    /// The handler is invoked for every inbound message, with at most
    /// `spec.max_in_flight` invocations in flight concurrently. The returned
    /// handle stops the loop when closed.
    async fn pull<X>(&self, spec: &SubscriptionSpec, handler: X) -> Result<Self::Stream, Self::Error>
    where
        X: PullHandler;
}
