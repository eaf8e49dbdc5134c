//! Broker-backed event dispatch.
//!
//! Turns a managed publish/subscribe service (behind
//! [`courier_pubsub::client::BrokerClient`]) into an application-level
//! event-dispatch layer: topics and subscriptions are provisioned on demand,
//! one listening loop runs per subscription, inbound messages are decoded and
//! routed to registered handlers, and handler outcome decides ack or nack.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Immutable construction options.
pub mod config;

/// The lifecycle controller: `start`, `emit`, `close`.
pub mod dispatcher;

/// Errors surfaced to collaborators.
pub mod error;

/// Application-facing event handlers and their invocation context.
pub mod handler;

/// Logical topic to physical subscription bookkeeping.
pub mod registry;

mod listener;
mod router;
