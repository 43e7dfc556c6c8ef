//! Name to provider mapping used by the orchestrator

use crate::handle::{ProviderHandle, TypedHandle};
use crate::traits::ComponentProvider;
use std::sync::Arc;
use strata_core::{Error, Result};

/// Registered component providers, in registration order
///
/// Bulk operations (delete, teardown) visit providers in this order.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    handles: Vec<Arc<dyn ProviderHandle>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed provider under its own name
    pub fn register<P: ComponentProvider>(&mut self, provider: P) -> Result<()> {
        self.register_arc(Arc::new(provider))
    }

    pub fn register_arc<P: ComponentProvider>(&mut self, provider: Arc<P>) -> Result<()> {
        self.register_handle(Arc::new(TypedHandle::new(provider)))
    }

    /// Register an already erased handle
    pub fn register_handle(&mut self, handle: Arc<dyn ProviderHandle>) -> Result<()> {
        if self.contains(handle.name()) {
            return Err(Error::conflict(format!(
                "provider '{}' is already registered",
                handle.name()
            )));
        }
        self.handles.push(handle);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ProviderHandle>> {
        self.handles.iter().find(|h| h.name() == name)
    }

    /// Like [`get`](Self::get), failing with `UnknownProviderHandler`
    pub fn require(&self, name: &str) -> Result<&Arc<dyn ProviderHandle>> {
        self.get(name)
            .ok_or_else(|| Error::unknown_provider_handler(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handles.iter().map(|h| h.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ProviderHandle>> {
        self.handles.iter()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
