use std::sync::Arc;

use bytes::Bytes;
use courier_pubsub::client::BrokerClient;
use courier_pubsub::payload::EventPayload;
use courier_pubsub::stream::PullStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{DispatcherConfig, SUBSCRIPTION_DELIMITER};
use crate::error::Error;
use crate::handler::EventHandler;
use crate::listener::Listener;
use crate::registry::{SubscriptionRegistry, SubscriptionState};
use crate::router::HandlerRouter;

/// Lifecycle of the dispatcher. Strictly forward, no cycles.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum LifecycleState {
    /// Configuration captured; no network I/O has happened.
    Created,

    /// Topics and subscriptions are being ensured on the broker.
    Provisioning,

    /// One pull stream per subscription is active.
    Listening,

    /// Pull streams are closing; in-flight invocations may still finish.
    Draining,

    /// Terminal. Publishing still works; no handler ever fires again.
    Stopped,
}

struct Inner<C>
where
    C: BrokerClient,
{
    state: LifecycleState,
    registry: SubscriptionRegistry,
    router: HandlerRouter,
    streams: Vec<C::Stream>,
}

/// Orchestrates provisioning, listening, publishing, and shutdown over a
/// broker client.
///
/// All broker state is scoped to the instance: independent dispatchers (and
/// the brokers handed to them) never share subscriptions or pull streams.
#[derive(Clone)]
pub struct EventDispatcher<C>
where
    C: BrokerClient,
{
    client: C,
    config: DispatcherConfig,
    inner: Arc<Mutex<Inner<C>>>,
}

impl<C> EventDispatcher<C>
where
    C: BrokerClient,
{
    /// Creates a dispatcher in the [`LifecycleState::Created`] state.
    #[must_use]
    pub fn new(client: C, config: DispatcherConfig) -> Self {
        let registry = SubscriptionRegistry::new(&config);

        Self {
            client,
            config,
            inner: Arc::new(Mutex::new(Inner {
                state: LifecycleState::Created,
                registry,
                router: HandlerRouter::default(),
                streams: Vec::new(),
            })),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> LifecycleState {
        self.inner.lock().await.state
    }

    /// Physical names of all registered subscriptions, in registration order.
    pub async fn subscription_names(&self) -> Vec<String> {
        self.inner.lock().await.registry.subscription_names()
    }

    /// Binds a handler to a topic.
    ///
    /// Every call owns a fresh subscription once `start()` provisions it, so
    /// binding two handlers to one topic fans each published message out to
    /// both.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegistrationClosed`] once `start()` has been called
    /// and [`Error::InvalidTopic`] for names the naming scheme reserves.
    pub async fn bind<H>(&self, topic: &str, handler: H) -> Result<(), Error>
    where
        H: EventHandler,
    {
        validate_topic(topic)?;

        let mut inner = self.inner.lock().await;
        if inner.state != LifecycleState::Created {
            return Err(Error::RegistrationClosed);
        }

        let descriptor = inner.registry.register(topic);
        inner
            .router
            .bind(descriptor.name().to_string(), topic.to_string(), Arc::new(handler));
        debug!(topic, subscription = %descriptor.name(), "bound handler");

        Ok(())
    }

    /// Ensures every topic and subscription exists, then opens one pull
    /// stream per subscription.
    ///
    /// Idempotent while listening: a second call neither re-creates
    /// subscriptions nor errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provisioning`] if any creation or existence check
    /// fails; startup aborts entirely and nothing is left listening. Returns
    /// [`Error::Stopped`] after `close()`.
    pub async fn start(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            LifecycleState::Created => {}
            LifecycleState::Provisioning | LifecycleState::Listening => return Ok(()),
            LifecycleState::Draining | LifecycleState::Stopped => return Err(Error::Stopped),
        }

        inner.state = LifecycleState::Provisioning;
        info!(project = %self.config.project_id, "provisioning broker resources");

        if let Err(e) = self.provision(&mut inner).await {
            inner.state = LifecycleState::Stopped;
            inner.registry.mark_all(SubscriptionState::Stopped);
            return Err(e);
        }

        let router = Arc::new(inner.router.clone());
        let descriptors = inner.registry.descriptors().to_vec();
        for descriptor in descriptors {
            let listener = Listener::new(router.clone(), self.config.debug);
            match self.client.pull(&descriptor.spec(), listener).await {
                Ok(stream) => {
                    inner.registry.mark(descriptor.name(), SubscriptionState::Active);
                    inner.streams.push(stream);
                }
                Err(e) => {
                    // No partial listening state: tear down whatever opened.
                    Self::close_streams(&mut inner).await;
                    inner.state = LifecycleState::Stopped;
                    inner.registry.mark_all(SubscriptionState::Stopped);
                    return Err(Error::Provisioning(Box::new(e)));
                }
            }
        }

        inner.state = LifecycleState::Listening;
        info!(subscriptions = inner.streams.len(), "listening");

        Ok(())
    }

    /// Publishes a payload to a topic, resolving once the broker confirms
    /// receipt.
    ///
    /// Usable in every lifecycle state; the publish path does not depend on
    /// the listeners.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if the payload cannot be serialized and
    /// [`Error::Publish`] if the broker rejects the message.
    pub async fn emit(&self, topic: &str, payload: EventPayload) -> Result<(), Error> {
        let data = Bytes::try_from(payload)?;
        self.client
            .publish(topic, data)
            .await
            .map_err(|e| Error::Publish(Box::new(e)))?;

        if self.config.debug {
            debug!(topic, "emitted event");
        }

        Ok(())
    }

    /// Closes every pull stream and stops the dispatcher.
    ///
    /// Resolves once all stream handles have reported closed. In-flight
    /// handler invocations are not awaited; draining is best-effort.
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; stream close failures are logged and
    /// do not prevent the transition to [`LifecycleState::Stopped`].
    pub async fn close(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            LifecycleState::Stopped => return Ok(()),
            LifecycleState::Created | LifecycleState::Provisioning | LifecycleState::Draining => {
                inner.state = LifecycleState::Stopped;
                inner.registry.mark_all(SubscriptionState::Stopped);
                return Ok(());
            }
            LifecycleState::Listening => {}
        }

        inner.state = LifecycleState::Draining;
        inner.registry.mark_all(SubscriptionState::Draining);
        Self::close_streams(&mut inner).await;
        inner.state = LifecycleState::Stopped;
        inner.registry.mark_all(SubscriptionState::Stopped);
        info!("dispatcher stopped");

        Ok(())
    }

    async fn provision(&self, inner: &mut Inner<C>) -> Result<(), Error> {
        // Configured topics first, in order, then binding topics not already
        // covered.
        let mut topics = self.config.topic_names.clone();
        for topic in inner.registry.topics() {
            if !topics.contains(&topic) {
                topics.push(topic);
            }
        }

        for topic in &topics {
            validate_topic(topic)?;
            self.client
                .ensure_topic(topic)
                .await
                .map_err(|e| Error::Provisioning(Box::new(e)))?;
        }

        for descriptor in inner.registry.descriptors() {
            self.client
                .ensure_subscription(&descriptor.spec())
                .await
                .map_err(|e| Error::Provisioning(Box::new(e)))?;
        }

        Ok(())
    }

    async fn close_streams(inner: &mut Inner<C>) {
        for stream in inner.streams.drain(..) {
            if let Err(e) = stream.close().await {
                warn!(error = %e, "pull stream did not close cleanly");
            }
        }
    }
}

// The delimiter separates a configured prefix from the base name, so a topic
// carrying it would collide with prefixed subscription names.
fn validate_topic(topic: &str) -> Result<(), Error> {
    if topic.is_empty() || topic.contains(SUBSCRIPTION_DELIMITER) {
        return Err(Error::InvalidTopic(topic.to_string()));
    }

    Ok(())
}
