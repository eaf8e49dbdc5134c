use courier_pubsub::client::BrokerClientError;
use thiserror::Error;

/// Errors that can occur in the in-process broker client.
#[derive(Debug, Error)]
pub enum Error {
    /// A pull stream is already consuming the subscription.
    #[error("subscription {0} already has an active pull stream")]
    AlreadyPulling(String),

    /// Resource name is empty or otherwise unusable.
    #[error("invalid resource name: {0:?}")]
    InvalidName(String),

    /// Subscription exists but is bound to a different topic.
    #[error("subscription {name} is already bound to topic {topic}")]
    SubscriptionConflict {
        /// Physical subscription name.
        name: String,
        /// Topic the existing subscription is bound to.
        topic: String,
    },

    /// Subscription does not exist.
    #[error("subscription {0} does not exist")]
    SubscriptionNotFound(String),

    /// Topic does not exist.
    #[error("topic {0} does not exist")]
    TopicNotFound(String),
}

impl BrokerClientError for Error {}
