//! Keel Shared State
//!
//! Every loaded copy of the Keel instrumentation layer converges on one
//! [`SharedState`] per versioned key. The state carries:
//! - capability probes computed at most once ([`Deferred`])
//! - memoization tables keyed by value or by object identity
//! - the registered-symbol identifier table
//! - the host collaborators (host environment, formatter, installed inspect function)
//!
//! States live in an explicit [`StateRegistry`] created once per process and
//! handed to each [`LoadInstance`].

#![warn(rust_2018_idioms)]

pub mod cache;
pub mod config;
pub mod deferred;
pub mod host;
pub mod key;
pub mod probe;
pub mod registry;
pub mod semver;
pub mod state;

pub use cache::{CacheTable, IdentityCache};
pub use config::{ConfigError, HostConfig, InspectConfig, KeelConfig, MaskConfig, PackageConfig};
pub use deferred::{Deferred, ProbeError};
pub use host::{BasicHost, Host};
pub use key::{VersionedKey, PACKAGE_PREFIX};
pub use registry::{LoadInstance, Origin, RegistryError, StateRegistry};
pub use semver::{Constraint, Range, SemverError, Version};
pub use state::{Memoize, ModuleTable, SharedState, Support, SymbolTable, UtilBinding};
