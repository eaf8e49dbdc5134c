/// Reserved delimiter between a configured prefix and a subscription's base
/// name. Not otherwise valid in topic names.
pub const SUBSCRIPTION_DELIMITER: char = '%';

/// Streaming options applied to every subscription's pull loop.
#[derive(Clone, Copy, Debug)]
pub struct ListenOptions {
    /// Maximum handler invocations in flight per subscription.
    pub max_in_flight: usize,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self { max_in_flight: 1 }
    }
}

/// Immutable construction options for an [`EventDispatcher`].
///
/// [`EventDispatcher`]: crate::dispatcher::EventDispatcher
#[derive(Clone, Debug, Default)]
pub struct DispatcherConfig {
    /// Project identifier, recorded for provisioning and logging.
    pub project_id: String,

    /// Logical topics provisioned at `start()` even if nothing is bound to
    /// them, in order.
    pub topic_names: Vec<String>,

    /// Optional prefix applied to every physical subscription name as
    /// `prefix` + [`SUBSCRIPTION_DELIMITER`] + base name.
    pub subscription_prefix: Option<String>,

    /// Per-subscription streaming options.
    pub listen: ListenOptions,

    /// Enables verbose per-message logging. No behavioral effect.
    pub debug: bool,
}
