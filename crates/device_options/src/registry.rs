//! Option registry

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use contracts::{OptionHandle, OptionId, OptionSource};
use tracing::debug;

/// Handles keyed by option id.
///
/// Lookups take a read lock only; options may be added or removed while frames flow.
#[derive(Default)]
pub struct OptionRegistry {
    handles: RwLock<HashMap<OptionId, Arc<dyn OptionHandle>>>,
}

impl OptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under its own option id, replacing any previous one
    pub fn register(&self, handle: Arc<dyn OptionHandle>) {
        let id = handle.option_id().clone();
        debug!(option_id = %id, "option registered");
        self.handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, handle);
    }

    /// Remove a handle, returning it if present
    pub fn remove(&self, id: &OptionId) -> Option<Arc<dyn OptionHandle>> {
        self.handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id.as_str())
    }

    pub fn contains(&self, id: &OptionId) -> bool {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id.as_str())
    }

    pub fn len(&self) -> usize {
        self.handles.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OptionSource for OptionRegistry {
    fn option_handle(&self, id: &OptionId) -> Option<Arc<dyn OptionHandle>> {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.as_str())
            .cloned()
    }
}
