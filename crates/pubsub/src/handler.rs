use std::convert::Infallible;
use std::error::Error;

use async_trait::async_trait;

use crate::acker::Acker;
use crate::message::InboundMessage;

/// Marker trait for pull handler errors.
pub trait PullHandlerError: Error + Send + Sync + 'static {}

impl PullHandlerError for Infallible {}

/// Processes messages delivered over a streaming pull.
///
/// A handler error is reported by the pull loop but never tears it down;
/// settlement of the delivery is the handler's responsibility via the
/// [`Acker`].
#[async_trait]
pub trait PullHandler: Clone + Send + Sync + 'static {
    /// The error type for the handler.
    type Error: PullHandlerError;

    /// Handles a single delivery.
    async fn handle(&self, message: InboundMessage, acker: Acker) -> Result<(), Self::Error>;
}
