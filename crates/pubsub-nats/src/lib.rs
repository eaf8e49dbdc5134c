//! NATS JetStream implementation of the broker client interface.
//!
//! Topics map to JetStream streams (one subject each), subscriptions map to
//! durable pull consumers on the owning stream. Every consumer receives its
//! own copy of each published message, which is what gives independent
//! handler bindings fan-out rather than competing-consumer semantics.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Broker client.
pub mod client;

/// Pull streams.
pub mod stream;
