use std::convert::Infallible;
use std::error::Error as StdError;
use std::time::SystemTime;

use async_trait::async_trait;
use courier_pubsub::acker::Acker;
use courier_pubsub::payload::EventPayload;

/// Marker trait for event handler errors.
pub trait EventHandlerError: StdError + Send + Sync + 'static {}

impl EventHandlerError for Infallible {}

/// Delivery metadata and acknowledgment control for one handler invocation.
#[derive(Clone, Debug)]
pub struct EventContext {
    /// Logical topic the event was published to.
    pub topic: String,

    /// Physical subscription the event arrived on.
    pub subscription: String,

    /// Broker-attached publish timestamp, when available.
    pub publish_time: Option<SystemTime>,

    /// How many times the broker has delivered this message, starting at 1.
    pub delivery_attempt: u32,

    acker: Acker,
}

impl EventContext {
    pub(crate) const fn new(
        topic: String,
        subscription: String,
        publish_time: Option<SystemTime>,
        delivery_attempt: u32,
        acker: Acker,
    ) -> Self {
        Self {
            topic,
            subscription,
            publish_time,
            delivery_attempt,
            acker,
        }
    }

    /// Explicitly rejects the delivery.
    ///
    /// Overrides the automatic acknowledgment on normal return; the broker's
    /// retry policy governs redelivery.
    pub async fn nack(&self) {
        self.acker.nack().await;
    }
}

/// An application callback bound to a topic.
///
/// Returning `Ok` acknowledges the delivery unless the handler already nacked
/// it through the context; returning `Err` rejects it. Handlers must be
/// idempotent: the broker may redeliver a message that was nacked or that
/// timed out without acknowledgment.
#[async_trait]
pub trait EventHandler: Clone + Send + Sync + 'static {
    /// The error type for the handler.
    type Error: EventHandlerError;

    /// Handles one decoded event.
    async fn handle(&self, event: EventPayload, ctx: EventContext) -> Result<(), Self::Error>;
}

pub(crate) type BoxedHandlerError = Box<dyn StdError + Send + Sync>;

/// Object-safe shim so differently-typed handlers share one routing table.
#[async_trait]
pub(crate) trait ErasedEventHandler: Send + Sync {
    async fn call(&self, event: EventPayload, ctx: EventContext) -> Result<(), BoxedHandlerError>;
}

#[async_trait]
impl<H> ErasedEventHandler for H
where
    H: EventHandler,
{
    async fn call(&self, event: EventPayload, ctx: EventContext) -> Result<(), BoxedHandlerError> {
        self.handle(event, ctx)
            .await
            .map_err(|e| Box::new(e) as BoxedHandlerError)
    }
}
