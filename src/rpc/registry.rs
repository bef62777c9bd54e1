//! Process-wide cache of interface descriptors.
//!
//! Descriptor construction is deterministic, so two threads racing to
//! describe the same interface is benign: both compute the same value and
//! the map keeps one. Only the insert itself needs to be concurrent-safe.

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::rpc::InterfaceDef;

pub struct InterfaceRegistry {
    cache: papaya::HashMap<String, Arc<InterfaceDef>>,
}

impl InterfaceRegistry {
    pub fn new() -> InterfaceRegistry {
        InterfaceRegistry {
            cache: papaya::HashMap::new(),
        }
    }

    /// Fetch the descriptor for `name`, running `init` to build it on
    /// first use.
    pub fn resolve(&self, name: &str, init: impl FnOnce() -> InterfaceDef) -> Arc<InterfaceDef> {
        let cache = self.cache.pin();
        if let Some(def) = cache.get(name) {
            return def.clone();
        }
        cache
            .get_or_insert_with(name.to_string(), || Arc::new(init()))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<InterfaceDef>> {
        self.cache.pin().get(name).cloned()
    }
}

impl Default for InterfaceRegistry {
    fn default() -> Self {
        InterfaceRegistry::new()
    }
}

lazy_static! {
    static ref GLOBAL: InterfaceRegistry = InterfaceRegistry::new();
}

/// The default process-wide registry. Services may also own a private
/// registry, e.g. for test isolation.
pub fn global() -> &'static InterfaceRegistry {
    &GLOBAL
}
