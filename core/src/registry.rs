use crate::{FilesystemAdapter, FilesystemKind};
use std::sync::Arc;

/// Filesystem adapters in priority order; the first registered is tried first.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn FilesystemAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Appends `adapter` at the lowest priority. Registering a kind twice
    /// replaces the earlier adapter in place.
    pub fn register(&mut self, adapter: Arc<dyn FilesystemAdapter>) {
        let kind = adapter.kind();
        match self.adapters.iter_mut().find(|a| a.kind() == kind) {
            Some(slot) => *slot = adapter,
            None => self.adapters.push(adapter),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FilesystemAdapter>> {
        self.adapters.iter()
    }

    pub fn kinds(&self) -> Vec<FilesystemKind> {
        self.adapters.iter().map(|a| a.kind()).collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
