//! Stack-trace masking
//!
//! Errors thrown from inside the layer carry stack frames that point at
//! its own sources. Before an error is formatted, those frames are removed
//! from its `stack` so users only see their own code.

use std::rc::Rc;

use keel_shared::SharedState;
use keel_value::{Object, ObjectClass, Value};

/// Redacts internal frames from error stacks
pub trait StackMasker {
    fn is_masked(&self, error: &Object) -> bool;

    /// Redact `error`'s stack in place
    fn mask(&self, error: &Object);
}

/// Masker dropping every stack line that contains an internal marker
pub struct InternalFrameMasker {
    shared: Rc<SharedState>,
    markers: Vec<String>,
}

impl InternalFrameMasker {
    pub fn new(shared: Rc<SharedState>, markers: Vec<String>) -> Self {
        Self { shared, markers }
    }

    /// Masker using the `/<prefix>/` marker of the shared state's key
    pub fn for_prefix(shared: Rc<SharedState>) -> Self {
        let markers = vec![format!("/{}/", shared.key().prefix)];
        Self::new(shared, markers)
    }

    fn is_internal(&self, line: &str) -> bool {
        self.markers.iter().any(|marker| line.contains(marker.as_str()))
    }
}

impl StackMasker for InternalFrameMasker {
    fn is_masked(&self, error: &Object) -> bool {
        self.shared.memoize.masked_stacks.contains(error)
    }

    fn mask(&self, error: &Object) {
        if error.class() != ObjectClass::Error {
            return;
        }
        if let Ok(Value::String(stack)) = error.get("stack") {
            let kept: Vec<&str> = stack.lines().filter(|line| !self.is_internal(line)).collect();
            let removed = stack.lines().count() - kept.len();
            if removed > 0 {
                error.define_hidden("stack", kept.join("\n"));
                tracing::debug!(removed, "masked internal stack frames");
            }
        }
        self.shared.memoize.masked_stacks.insert(error, ());
    }
}
