//! Configuration (keel.toml)
//!
//! Every section is optional. A missing file section falls back to the
//! built-in defaults, which match a layer keyed by this crate's own version.

use std::path::Path;

use keel_value::{Depth, InspectOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::key::{VersionedKey, PACKAGE_PREFIX};

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct KeelConfig {
    pub package: PackageConfig,
    pub mask: MaskConfig,
    pub inspect: InspectConfig,
    pub host: HostConfig,
}

/// Identity of the layer: registry prefix and version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct PackageConfig {
    pub prefix: String,
    pub version: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            prefix: PACKAGE_PREFIX.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Stack-trace masking
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct MaskConfig {
    /// Substrings identifying internal stack frames; empty means the
    /// default `/<prefix>/` marker
    pub internal_markers: Vec<String>,
}

/// Formatter defaults; unset fields keep the formatter's own defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct InspectConfig {
    /// Recursion limit; a negative value means unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_inspect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_proxy: Option<bool>,
}

/// Facts about the in-process host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct HostConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub globals: Option<Vec<String>>,
    pub async_await: bool,
    pub cached_data: bool,
    pub proxy_source_text: bool,
    pub strict_native_receivers: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            version: None,
            globals: None,
            async_await: true,
            cached_data: true,
            proxy_source_text: true,
            strict_native_receivers: false,
        }
    }
}

impl KeelConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn versioned_key(&self) -> VersionedKey {
        VersionedKey::new(self.package.prefix.clone(), self.package.version.clone())
    }

    /// Configured internal-frame markers, or the default `/<prefix>/`
    pub fn internal_markers(&self) -> Vec<String> {
        if self.mask.internal_markers.is_empty() {
            vec![format!("/{}/", self.package.prefix)]
        } else {
            self.mask.internal_markers.clone()
        }
    }
}

impl InspectConfig {
    pub fn to_options(&self) -> InspectOptions {
        InspectOptions {
            depth: self.depth.map(|depth| match u32::try_from(depth) {
                Ok(limit) => Depth::Limited(limit),
                Err(_) => Depth::Infinite,
            }),
            colors: self.colors,
            show_hidden: self.show_hidden,
            custom_inspect: self.custom_inspect,
            show_proxy: self.show_proxy,
        }
    }
}
