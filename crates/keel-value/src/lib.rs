//! Keel Value Model
//!
//! This crate provides the dynamic values the Keel runtime hands to its
//! instrumentation layer:
//! - Primitive values, symbols and property keys
//! - Objects behind the [`ObjectBehavior`] protocol (ordinary objects,
//!   arrays, functions, errors)
//! - Module namespaces whose bindings may still be uninitialized
//! - Proxies with a `get` trap
//! - The baseline [`Formatter`] used to render values as text

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod format;
pub mod namespace;
pub mod object;
pub mod property;
pub mod proxy;
pub mod symbol;
pub mod value;

pub use format::{BasicFormatter, Depth, Formatter, InspectOptions, ResolvedOptions, StyleTable};
pub use namespace::{BindingCell, ModuleNamespace};
pub use object::{NativeFn, Object, ObjectBehavior, ObjectClass, OrdinaryObject, WeakObject};
pub use property::{PropertyDescriptor, PropertyKey, PropertySlot};
pub use proxy::{ProxyDetails, ProxyObject};
pub use symbol::Symbol;
pub use value::Value;

/// Exceptions raised while reading or calling values
#[derive(Debug, Clone, thiserror::Error)]
pub enum Exception {
    /// Access to a binding that is not initialized yet
    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    /// Operation applied to a value of the wrong kind
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Source text the host refused to compile
    #[error("SyntaxError: {0}")]
    SyntaxError(String),

    /// Arbitrary value thrown by user code
    #[error("Uncaught {0:?}")]
    Thrown(Value),
}

/// Result of an operation that may raise an [`Exception`]
pub type ValueResult<T> = Result<T, Exception>;
