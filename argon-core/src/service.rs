//! Service locator for dependency-injected parameters.
//!
//! Injected-service parameters are resolved here by type, never from
//! tokens. A service missing for a declared parameter is a configuration
//! error surfaced before dispatch, not a per-invocation parse error.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-keyed registry of shared service instances.
#[derive(Clone, Default)]
pub struct ServiceLocator {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service instance under its concrete type.
    pub fn with<T: Any + Send + Sync>(mut self, service: T) -> Self {
        self.services.insert(TypeId::of::<T>(), Arc::new(service));
        self
    }

    /// Register an already-shared service instance.
    pub fn with_arc<T: Any + Send + Sync>(mut self, service: Arc<T>) -> Self {
        self.services.insert(TypeId::of::<T>(), service);
        self
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.services.contains_key(&id)
    }

    /// Resolve the type-erased handle for a service key.
    pub fn resolve_raw(&self, id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.services.get(&id).cloned()
    }

    /// Resolve a service by its concrete type.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.resolve_raw(TypeId::of::<T>())
            .and_then(|handle| handle.downcast::<T>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeter {
        prefix: String,
    }

    #[test]
    fn resolves_by_type() {
        let locator = ServiceLocator::new().with(Greeter {
            prefix: "hi".to_string(),
        });

        let greeter = locator.resolve::<Greeter>().unwrap();
        assert_eq!(greeter.prefix, "hi");
        assert!(locator.resolve::<String>().is_none());
    }
}
