//! Abstract interface for broker-backed event transport.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Acknowledgment controls decide whether a delivery is settled or redelivered.
pub mod acker;

/// Broker clients provision topics and subscriptions, publish, and open pull streams.
pub mod client;

/// Pull handlers process messages delivered over a streaming pull.
pub mod handler;

/// Inbound messages are raw broker deliveries plus transport metadata.
pub mod message;

/// Payloads are structured field-to-value mappings serialized as UTF-8 JSON.
pub mod payload;

/// Pull streams are closable handles to per-subscription listening loops.
pub mod stream;
