use courier_pubsub::client::SubscriptionSpec;

use crate::config::{DispatcherConfig, ListenOptions, SUBSCRIPTION_DELIMITER};

/// Lifecycle of one physical subscription, strictly forward.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum SubscriptionState {
    /// Registered but not yet confirmed to exist on the broker.
    Pending,

    /// Confirmed present with an open pull stream.
    Active,

    /// Pull stream closing; in-flight invocations may still finish.
    Draining,

    /// Terminal. No handler fires for this subscription again.
    Stopped,
}

/// Bookkeeping for one (topic, handler-binding) pair.
#[derive(Clone, Debug)]
pub struct SubscriptionDescriptor {
    name: String,
    topic: String,
    max_in_flight: usize,
    state: SubscriptionState,
}

impl SubscriptionDescriptor {
    /// Physical subscription name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning topic name.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Provisioning and streaming parameters for the broker client.
    #[must_use]
    pub fn spec(&self) -> SubscriptionSpec {
        SubscriptionSpec {
            name: self.name.clone(),
            topic: self.topic.clone(),
            max_in_flight: self.max_in_flight,
        }
    }

    fn advance(&mut self, state: SubscriptionState) {
        if state > self.state {
            self.state = state;
        }
    }
}

/// Maps logical topics to the physical subscriptions provisioned for them.
///
/// Naming rule: the first binding on a topic takes the topic name as its base
/// name; each further binding on the same topic appends `-<ordinal>` so every
/// (topic, binding) pair owns a distinct subscription. A configured prefix is
/// applied to every base name as `prefix` + `%` + base.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionRegistry {
    prefix: Option<String>,
    listen: ListenOptions,
    descriptors: Vec<SubscriptionDescriptor>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry using the dispatcher's naming and listening
    /// options.
    #[must_use]
    pub fn new(config: &DispatcherConfig) -> Self {
        Self {
            prefix: config.subscription_prefix.clone(),
            listen: config.listen,
            descriptors: Vec::new(),
        }
    }

    /// Registers a fresh binding on `topic` and returns its descriptor.
    pub fn register(&mut self, topic: &str) -> SubscriptionDescriptor {
        let ordinal = self.descriptors.iter().filter(|d| d.topic == topic).count();
        let base = if ordinal == 0 {
            topic.to_string()
        } else {
            format!("{topic}-{}", ordinal + 1)
        };

        let descriptor = SubscriptionDescriptor {
            name: self.physical_name(&base),
            topic: topic.to_string(),
            max_in_flight: self.listen.max_in_flight,
            state: SubscriptionState::Pending,
        };
        self.descriptors.push(descriptor.clone());

        descriptor
    }

    /// Looks a descriptor up by physical subscription name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&SubscriptionDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// All descriptors, in registration order.
    #[must_use]
    pub fn descriptors(&self) -> &[SubscriptionDescriptor] {
        &self.descriptors
    }

    /// Physical names of all registered subscriptions, in registration order.
    #[must_use]
    pub fn subscription_names(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.name.clone()).collect()
    }

    /// Unique topics with at least one binding, in registration order.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = Vec::new();
        for descriptor in &self.descriptors {
            if !topics.contains(&descriptor.topic) {
                topics.push(descriptor.topic.clone());
            }
        }
        topics
    }

    /// Advances the named descriptor's state. Transitions are forward-only;
    /// regressions are ignored.
    pub fn mark(&mut self, name: &str, state: SubscriptionState) {
        if let Some(descriptor) = self.descriptors.iter_mut().find(|d| d.name == name) {
            descriptor.advance(state);
        }
    }

    /// Advances every descriptor's state, forward-only.
    pub fn mark_all(&mut self, state: SubscriptionState) {
        for descriptor in &mut self.descriptors {
            descriptor.advance(state);
        }
    }

    fn physical_name(&self, base: &str) -> String {
        self.prefix.as_ref().map_or_else(
            || base.to_string(),
            |prefix| format!("{prefix}{SUBSCRIPTION_DELIMITER}{base}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(prefix: Option<&str>) -> DispatcherConfig {
        DispatcherConfig {
            project_id: "test-project".to_string(),
            subscription_prefix: prefix.map(str::to_string),
            ..DispatcherConfig::default()
        }
    }

    #[test]
    fn bare_name_without_prefix() {
        let mut registry = SubscriptionRegistry::new(&config(None));
        let descriptor = registry.register("orders");

        assert_eq!(descriptor.name(), "orders");
        assert_eq!(descriptor.topic(), "orders");
    }

    #[test]
    fn prefix_is_joined_with_delimiter() {
        let mut registry = SubscriptionRegistry::new(&config(Some("test-app")));
        let descriptor = registry.register("orders");

        assert_eq!(descriptor.name(), "test-app%orders");
    }

    #[test]
    fn repeated_bindings_get_ordinal_suffixes() {
        let mut registry = SubscriptionRegistry::new(&config(Some("app")));
        registry.register("orders");
        registry.register("orders");
        registry.register("orders");

        assert_eq!(
            registry.subscription_names(),
            vec!["app%orders", "app%orders-2", "app%orders-3"]
        );
        assert_eq!(registry.topics(), vec!["orders"]);
    }

    #[test]
    fn resolve_finds_registered_descriptors() {
        let mut registry = SubscriptionRegistry::new(&config(None));
        registry.register("orders");

        assert!(registry.resolve("orders").is_some());
        assert!(registry.resolve("billing").is_none());
    }

    #[test]
    fn state_transitions_are_forward_only() {
        let mut registry = SubscriptionRegistry::new(&config(None));
        let descriptor = registry.register("orders");

        registry.mark(descriptor.name(), SubscriptionState::Active);
        registry.mark(descriptor.name(), SubscriptionState::Pending);

        assert_eq!(
            registry.resolve("orders").unwrap().state(),
            SubscriptionState::Active
        );
    }
}
