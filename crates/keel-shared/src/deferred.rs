//! Lazily computed, cached-once values
//!
//! A [`Deferred`] holds a named producer. The first successful read runs the
//! producer and caches its result for the lifetime of the slot; later reads
//! return the cached value. A failing producer is not cached, so the next
//! read tries again.

use std::fmt;

use once_cell::unsync::OnceCell;
use thiserror::Error;

/// Errors raised by deferred producers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// The producer ran and failed
    #[error("probe '{probe}' failed: {reason}")]
    Failed { probe: &'static str, reason: String },

    /// The state owning the slot was dropped before the read
    #[error("owner of probe '{0}' is no longer alive")]
    OwnerDropped(&'static str),
}

type Producer<T> = Box<dyn Fn() -> Result<T, ProbeError>>;

/// A named slot computed on first read
pub struct Deferred<T> {
    name: &'static str,
    cell: OnceCell<T>,
    producer: Producer<T>,
}

impl<T> Deferred<T> {
    pub fn new(name: &'static str, producer: impl Fn() -> Result<T, ProbeError> + 'static) -> Self {
        Self {
            name,
            cell: OnceCell::new(),
            producer: Box::new(producer),
        }
    }

    /// Slot that is already resolved
    pub fn resolved(name: &'static str, value: T) -> Self {
        Self {
            name,
            cell: OnceCell::with_value(value),
            producer: Box::new(move || Err(ProbeError::Failed {
                probe: name,
                reason: "slot was created resolved".to_string(),
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Read the value, running the producer if needed
    pub fn get(&self) -> Result<&T, ProbeError> {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let result = self.cell.get_or_try_init(|| (self.producer)());
        match &result {
            Ok(_) => tracing::debug!(probe = self.name, "deferred value resolved"),
            Err(err) => tracing::debug!(probe = self.name, error = %err, "deferred value failed, will retry"),
        }
        result
    }
}

impl<T: Clone + Default> Deferred<T> {
    /// Read the value, falling back to `T::default()` on failure
    pub fn get_or_default(&self) -> T {
        self.get().cloned().unwrap_or_default()
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("name", &self.name)
            .field("value", &self.cell.get())
            .finish()
    }
}
