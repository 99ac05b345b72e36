//! Keel Inspect
//!
//! Safe value inspection for the Keel runtime. [`Inspector::inspect`] renders
//! values through the host [`Formatter`](keel_value::Formatter) and falls back
//! to a protective [`InspectView`] when a value could otherwise:
//! - read a module namespace binding that is not initialized yet
//! - expose the internals of a foreign proxy
//! - recurse into itself through wrapped objects

#![warn(rust_2018_idioms)]

pub mod classify;
pub mod details;
pub mod inspector;
pub mod mask;
pub mod style;
pub mod view;

pub use classify::{is_namespace_like, is_updatable_get, is_wrappable};
pub use details::{CachedProxyDetails, ProxyDetailExtractor};
pub use inspector::{Inspector, OptionsArg, UNINITIALIZED};
pub use mask::{InternalFrameMasker, StackMasker};
pub use style::stylize;
pub use view::InspectView;
