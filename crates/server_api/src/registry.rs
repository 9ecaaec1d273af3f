use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
};

use thiserror::Error;

use crate::handler::ActionHandler;

pub type HandlerRef = Arc<dyn ActionHandler>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("action `{0}` is registered more than once")]
    Duplicate(String),
    #[error("action identifier must not be empty")]
    EmptyId,
}

/// Collects routes before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    routes: HashMap<String, Option<HandlerRef>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        action_id: impl Into<String>,
        handler: impl ActionHandler + 'static,
    ) -> Result<&mut Self, RegistryError> {
        self.insert(action_id.into(), Some(Arc::new(handler)))
    }

    pub fn register_ref(
        &mut self,
        action_id: impl Into<String>,
        handler: HandlerRef,
    ) -> Result<&mut Self, RegistryError> {
        self.insert(action_id.into(), Some(handler))
    }

    /// Reserves an identifier that has no implementation yet. Resolving it
    /// behaves exactly like an unknown action.
    pub fn declare(&mut self, action_id: impl Into<String>) -> Result<&mut Self, RegistryError> {
        self.insert(action_id.into(), None)
    }

    pub fn build(self) -> ActionRegistry {
        ActionRegistry {
            routes: self.routes,
        }
    }

    fn insert(
        &mut self,
        action_id: String,
        route: Option<HandlerRef>,
    ) -> Result<&mut Self, RegistryError> {
        if action_id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if self.routes.contains_key(&action_id) {
            return Err(RegistryError::Duplicate(action_id));
        }
        self.routes.insert(action_id, route);
        Ok(self)
    }
}

/// Immutable action identifier to handler map. Shared across requests
/// without locking.
pub struct ActionRegistry {
    routes: HashMap<String, Option<HandlerRef>>,
}

impl ActionRegistry {
    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, action_id: &str) -> Option<HandlerRef> {
        self.routes.get(action_id).and_then(Clone::clone)
    }

    pub fn action_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.action_ids())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
