use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use courier_pubsub::acker::Acker;
use courier_pubsub::handler::PullHandler;
use courier_pubsub::message::InboundMessage;
use courier_pubsub::payload::EventPayload;
use tracing::{debug, error, warn};

use crate::handler::EventContext;
use crate::router::HandlerRouter;

/// Per-message pipeline for one subscription's pull loop: decode, route,
/// invoke, settle.
///
/// Every failure is contained to the affected delivery; the loop itself never
/// sees an error from here.
#[derive(Clone)]
pub(crate) struct Listener {
    router: Arc<HandlerRouter>,
    debug: bool,
}

impl Listener {
    pub(crate) const fn new(router: Arc<HandlerRouter>, debug: bool) -> Self {
        Self { router, debug }
    }
}

#[async_trait]
impl PullHandler for Listener {
    type Error = Infallible;

    async fn handle(&self, message: InboundMessage, acker: Acker) -> Result<(), Self::Error> {
        let payload = match EventPayload::try_from(message.data.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    subscription = %message.subscription,
                    error = %e,
                    "failed to decode inbound payload"
                );
                acker.nack().await;
                return Ok(());
            }
        };

        let Some(route) = self.router.route(&message.subscription) else {
            warn!(subscription = %message.subscription, "no handler bound to subscription");
            acker.nack().await;
            return Ok(());
        };

        if self.debug {
            debug!(
                subscription = %message.subscription,
                topic = %route.topic,
                attempt = message.delivery_attempt,
                "dispatching event"
            );
        }

        let ctx = EventContext::new(
            route.topic.clone(),
            message.subscription.clone(),
            message.publish_time,
            message.delivery_attempt,
            acker.clone(),
        );

        match route.handler.call(payload, ctx).await {
            // No-op if the handler nacked explicitly through the context.
            Ok(()) => acker.ack().await,
            Err(e) => {
                warn!(
                    subscription = %message.subscription,
                    error = %e,
                    "handler failed, delivery nacked"
                );
                acker.nack().await;
            }
        }

        Ok(())
    }
}
