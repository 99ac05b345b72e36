//! Versioned registry keys

use std::fmt;

/// Package prefix used for registry keys and registered symbols
pub const PACKAGE_PREFIX: &str = "keel";

/// Identifier of one shared state: package prefix plus exact version
///
/// Rendered as `"<prefix>@<version>:shared"`. Copies of the layer with
/// different versions never share state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionedKey {
    pub prefix: String,
    pub version: String,
}

impl VersionedKey {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            version: version.into(),
        }
    }

    /// Key of this build of the layer
    pub fn current() -> Self {
        Self::new(PACKAGE_PREFIX, env!("CARGO_PKG_VERSION"))
    }

    /// Registered-symbol name for an identifier under this prefix
    pub fn symbol_name(&self, name: &str) -> String {
        format!("{}:{}", self.prefix, name)
    }
}

impl fmt::Display for VersionedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:shared", self.prefix, self.version)
    }
}
