use std::error::Error as StdError;

use courier_pubsub::payload::EncodeError;
use thiserror::Error;

/// Errors surfaced by the event dispatcher.
///
/// Runtime per-message failures (decode errors, handler errors) are contained
/// to the affected delivery and reported through logging only; they never
/// appear here.
#[derive(Debug, Error)]
pub enum Error {
    /// Payload could not be serialized for publishing.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Topic name is empty or contains the reserved prefix delimiter.
    #[error("invalid topic name: {0:?}")]
    InvalidTopic(String),

    /// Topic or subscription provisioning failed during startup. Fatal: no
    /// subset of subscriptions is left listening.
    #[error("provisioning failed: {0}")]
    Provisioning(#[source] Box<dyn StdError + Send + Sync>),

    /// The broker did not accept a published message.
    #[error("publish failed: {0}")]
    Publish(#[source] Box<dyn StdError + Send + Sync>),

    /// Handlers can only be bound before listening starts.
    #[error("handler registration is closed once listening has started")]
    RegistrationClosed,

    /// The lifecycle is strictly forward; a stopped dispatcher cannot be
    /// started again.
    #[error("dispatcher is stopped")]
    Stopped,
}
