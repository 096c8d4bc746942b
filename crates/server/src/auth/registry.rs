//! Name → provider bindings.

use super::{NotConfiguredProvider, Provider, ProviderError, normalize_name};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Concurrency-safe map from normalized provider name to provider.
///
/// The lock only guards the map; callers receive an `Arc` and invoke the
/// provider after the guard is gone.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<BTreeMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every name bound to [`NotConfiguredProvider`].
    pub fn with_placeholders<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registry = Self::new();
        for name in names {
            registry.register(name.as_ref(), Arc::new(NotConfiguredProvider));
        }
        registry
    }

    /// Binds `name` to `provider`, replacing any previous binding.
    pub fn register(&self, name: &str, provider: Arc<dyn Provider>) {
        let name = normalize_name(name);
        tracing::debug!(provider = %name, "registering auth provider");
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, provider);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, ProviderError> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_name(name))
            .cloned()
            .ok_or(ProviderError::NotConfigured)
    }

    /// Snapshot of bound names in lexicographic order.
    pub fn list(&self) -> Vec<String> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list())
            .finish()
    }
}
