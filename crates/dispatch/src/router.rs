use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::handler::ErasedEventHandler;

/// A routed binding: the owning topic plus the bound callback.
#[derive(Clone)]
pub(crate) struct Route {
    pub(crate) topic: String,
    pub(crate) handler: Arc<dyn ErasedEventHandler>,
}

/// Maps each physical subscription name to its single bound handler.
///
/// Fan-out lives one level up: every binding gets its own subscription, so a
/// subscription never has more than one handler.
#[derive(Clone, Default)]
pub(crate) struct HandlerRouter {
    routes: HashMap<String, Route>,
}

impl HandlerRouter {
    pub(crate) fn bind(
        &mut self,
        subscription: String,
        topic: String,
        handler: Arc<dyn ErasedEventHandler>,
    ) {
        self.routes.insert(subscription, Route { topic, handler });
    }

    pub(crate) fn route(&self, subscription: &str) -> Option<&Route> {
        self.routes.get(subscription)
    }
}

impl Debug for HandlerRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRouter")
            .field("subscriptions", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}
