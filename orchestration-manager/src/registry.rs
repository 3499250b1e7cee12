//! The closed-set adapter registry the Manager dispatches against
//! (spec.md §9: adapters are matched by `Provider` enum, never loaded as
//! runtime plugins).

use provider_model::event::Provider;
use provider_model::ProviderAdapter;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each [`Provider`] to the adapter instance that serves it.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` for `provider`, replacing any prior registration.
    pub fn register(&mut self, provider: Provider, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(provider, adapter);
    }

    /// Looks up the adapter registered for `provider`, if any.
    #[must_use]
    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }
}
