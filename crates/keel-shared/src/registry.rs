//! State registry and load instances
//!
//! A [`StateRegistry`] is created once per process and handed to every
//! loaded copy of the layer. Each copy is a [`LoadInstance`]; instances that
//! agree on the versioned key converge on the same [`SharedState`].

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::config::KeelConfig;
use crate::host::{BasicHost, Host};
use crate::key::VersionedKey;
use crate::state::SharedState;

/// How [`StateRegistry::get_or_create`] obtained its state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Created,
    Reloaded,
}

/// Store lookup failures; never surfaced past the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry store is busy")]
    Unavailable,

    #[error("no shared state registered under '{0}'")]
    Missing(String),

    #[error("entry under '{0}' is not a shared state")]
    Mismatch(String),
}

/// Process-wide table of shared states
#[derive(Default)]
pub struct StateRegistry {
    store: RefCell<FxHashMap<String, Rc<dyn Any>>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &VersionedKey) -> Result<Rc<SharedState>, RegistryError> {
        let name = key.to_string();
        let entry = {
            let store = self
                .store
                .try_borrow()
                .map_err(|_| RegistryError::Unavailable)?;
            store
                .get(&name)
                .cloned()
                .ok_or_else(|| RegistryError::Missing(name.clone()))?
        };
        entry
            .downcast::<SharedState>()
            .map_err(|_| RegistryError::Mismatch(name))
    }

    /// The state registered under `key`, creating it when absent
    ///
    /// A state found in the store is marked reloaded. Lookup failures are
    /// logged and treated as absence.
    pub fn get_or_create(
        &self,
        key: &VersionedKey,
        host: impl FnOnce() -> Rc<dyn Host>,
    ) -> (Rc<SharedState>, Origin) {
        match self.lookup(key) {
            Ok(state) => {
                state.mark_reloaded();
                tracing::debug!(key = %key, "reusing shared state");
                return (state, Origin::Reloaded);
            }
            Err(RegistryError::Missing(_)) => {}
            Err(err) => tracing::debug!(key = %key, error = %err, "shared state lookup failed"),
        }

        let state = SharedState::new(key.clone(), host());
        self.store_entry(key.to_string(), state.clone());
        tracing::debug!(key = %key, "created shared state");
        (state, Origin::Created)
    }

    /// Put an arbitrary entry in the store; returns `false` if the store is busy
    pub fn store_entry(&self, name: String, entry: Rc<dyn Any>) -> bool {
        match self.store.try_borrow_mut() {
            Ok(mut store) => {
                store.insert(name, entry);
                true
            }
            Err(_) => {
                tracing::debug!(name = %name, "registry store is busy, entry not stored");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One loaded copy of the instrumentation layer
pub struct LoadInstance {
    key: VersionedKey,
    host: Rc<dyn Host>,
    shared: Option<Rc<SharedState>>,
}

impl LoadInstance {
    pub fn new(key: VersionedKey, host: Rc<dyn Host>) -> Self {
        Self {
            key,
            host,
            shared: None,
        }
    }

    pub fn from_config(config: &KeelConfig) -> Self {
        Self::new(config.versioned_key(), BasicHost::from_config(config))
    }

    pub fn key(&self) -> &VersionedKey {
        &self.key
    }

    /// The shared state for this instance's key
    ///
    /// Repeated calls on the same instance mark the state active
    /// (`inited`, not `reloaded`).
    pub fn shared(&mut self, registry: &StateRegistry) -> Rc<SharedState> {
        if let Some(state) = &self.shared {
            state.mark_active();
            return state.clone();
        }
        let host = self.host.clone();
        let (state, _) = registry.get_or_create(&self.key, move || host);
        self.shared = Some(state.clone());
        state
    }
}
