use std::time::SystemTime;

use bytes::Bytes;

/// A raw message delivered by the broker over a streaming pull.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Physical name of the subscription the message arrived on.
    pub subscription: String,

    /// Serialized payload bytes as published.
    pub data: Bytes,

    /// Broker-attached publish timestamp, when the backend exposes one.
    pub publish_time: Option<SystemTime>,

    /// How many times the broker has delivered this message, starting at 1.
    pub delivery_attempt: u32,
}
