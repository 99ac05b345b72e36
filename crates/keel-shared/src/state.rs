//! The per-key shared state
//!
//! One [`SharedState`] exists per versioned key in a registry. It is
//! created once, mutated in place and never replaced; every load instance
//! holding the key sees the same `Rc`.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use keel_value::{Formatter, PropertyKey, ProxyDetails, Symbol, Value};

use crate::cache::{CacheTable, IdentityCache};
use crate::deferred::{Deferred, ProbeError};
use crate::host::Host;
use crate::key::VersionedKey;
use crate::probe;
use crate::semver::{Range, Version};

/// Capability map: whether the host supports each feature
pub struct Support {
    wasm: bool,
    await_syntax: Deferred<bool>,
    create_cached_data: Deferred<bool>,
    inspect_proxies: Deferred<bool>,
    lookup_shadowed: Deferred<bool>,
    native_proxy_receiver: Deferred<bool>,
    repl_show_proxy: Deferred<bool>,
}

impl Support {
    pub fn wasm(&self) -> bool {
        self.wasm
    }

    pub fn await_syntax(&self) -> bool {
        self.await_syntax.get_or_default()
    }

    pub fn create_cached_data(&self) -> bool {
        self.create_cached_data.get_or_default()
    }

    pub fn inspect_proxies(&self) -> bool {
        self.inspect_proxies.get_or_default()
    }

    pub fn lookup_shadowed(&self) -> bool {
        self.lookup_shadowed.get_or_default()
    }

    pub fn native_proxy_receiver(&self) -> bool {
        self.native_proxy_receiver.get_or_default()
    }

    pub fn repl_show_proxy(&self) -> bool {
        self.repl_show_proxy.get_or_default()
    }

    /// Whether the named probe has already run successfully
    pub fn is_resolved(&self, name: &str) -> bool {
        self.probes()
            .iter()
            .any(|probe| probe.name() == name && probe.is_resolved())
    }

    fn probes(&self) -> [&Deferred<bool>; 6] {
        [
            &self.await_syntax,
            &self.create_cached_data,
            &self.inspect_proxies,
            &self.lookup_shadowed,
            &self.native_proxy_receiver,
            &self.repl_show_proxy,
        ]
    }
}

/// Version-gated facts about the host's utility bindings
pub struct UtilBinding {
    error_decorated_key: Deferred<PropertyKey>,
    hidden_key_type: Deferred<&'static str>,
}

impl UtilBinding {
    /// Key under which decorated errors are flagged
    pub fn error_decorated_key(&self) -> PropertyKey {
        self.error_decorated_key
            .get()
            .cloned()
            .unwrap_or_else(|_| PropertyKey::from(probe::DECORATED_KEY))
    }

    /// `"string"` or `"symbol"`, matching [`UtilBinding::error_decorated_key`]
    pub fn hidden_key_type(&self) -> &'static str {
        self.hidden_key_type.get().copied().unwrap_or("string")
    }
}

/// Memoization tables
#[derive(Default)]
pub struct Memoize {
    pub satisfies: CacheTable<(String, String), bool>,
    pub constraints: CacheTable<String, Option<Range>>,
    pub max_satisfying: CacheTable<(Vec<String>, String), Option<String>>,
    pub fs_realpath: CacheTable<PathBuf, PathBuf>,
    pub proxy_details: IdentityCache<Option<ProxyDetails>>,
    pub masked_stacks: IdentityCache<()>,
}

/// Registered symbols derived from the package prefix
#[derive(Debug, Clone)]
pub struct SymbolTable {
    pub compile: Symbol,
    pub entry: Symbol,
    pub mjs: Symbol,
    pub namespace: Symbol,
    pub package: Symbol,
    pub real_get_proxy_details: Symbol,
    pub real_require: Symbol,
    pub runtime: Symbol,
    pub shared: Symbol,
    pub wrapper: Symbol,
}

impl SymbolTable {
    pub fn new(key: &VersionedKey) -> Self {
        let symbol = |name: &str| Symbol::for_key(&key.symbol_name(name));
        Self {
            compile: symbol("_compile"),
            entry: symbol("entry"),
            mjs: symbol("mjs"),
            namespace: symbol("namespace"),
            package: symbol("package"),
            real_get_proxy_details: symbol("realGetProxyDetails"),
            real_require: symbol("realRequire"),
            runtime: symbol("runtime"),
            shared: Symbol::for_key(&key.to_string()),
            wrapper: symbol("wrapper"),
        }
    }
}

/// Host collaborators
pub struct ModuleTable {
    host: Rc<dyn Host>,
    formatter: Rc<dyn Formatter>,
    util_inspect: RefCell<Option<Value>>,
}

impl ModuleTable {
    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    pub fn formatter(&self) -> &Rc<dyn Formatter> {
        &self.formatter
    }

    /// The installed inspect function, if any
    pub fn util_inspect(&self) -> Option<Value> {
        self.util_inspect.borrow().clone()
    }

    pub fn set_util_inspect(&self, function: Value) {
        *self.util_inspect.borrow_mut() = Some(function);
    }

    /// Whether `value` is the installed inspect function
    pub fn is_util_inspect(&self, value: &Value) -> bool {
        self.util_inspect
            .borrow()
            .as_ref()
            .is_some_and(|installed| installed.same_value(value))
    }
}

/// Canonical runtime state shared by every load instance of one key
pub struct SharedState {
    key: VersionedKey,
    inited: Cell<bool>,
    reloaded: Cell<bool>,
    pub support: Support,
    pub util_binding: UtilBinding,
    pub memoize: Memoize,
    pub symbols: SymbolTable,
    pub module: ModuleTable,
    circular_error_message: Deferred<String>,
    custom_inspect_key: Deferred<PropertyKey>,
    runtime_name: Deferred<String>,
    proxy_native_source_text: Deferred<bool>,
}

fn deferred<T: 'static>(
    owner: &Weak<SharedState>,
    name: &'static str,
    probe: fn(&SharedState) -> T,
) -> Deferred<T> {
    let owner = owner.clone();
    Deferred::new(name, move || {
        let state = owner.upgrade().ok_or(ProbeError::OwnerDropped(name))?;
        Ok(probe(&state))
    })
}

impl SharedState {
    pub fn new(key: VersionedKey, host: Rc<dyn Host>) -> Rc<Self> {
        let formatter = host.formatter();
        let wasm = probe::wasm(host.as_ref());
        let symbols = SymbolTable::new(&key);
        Rc::new_cyclic(|owner| SharedState {
            key,
            inited: Cell::new(false),
            reloaded: Cell::new(false),
            support: Support {
                wasm,
                await_syntax: deferred(owner, "await_syntax", probe::await_syntax),
                create_cached_data: deferred(owner, "create_cached_data", probe::create_cached_data),
                inspect_proxies: deferred(owner, "inspect_proxies", probe::inspect_proxies),
                lookup_shadowed: deferred(owner, "lookup_shadowed", probe::lookup_shadowed),
                native_proxy_receiver: deferred(
                    owner,
                    "native_proxy_receiver",
                    probe::native_proxy_receiver,
                ),
                repl_show_proxy: deferred(owner, "repl_show_proxy", probe::repl_show_proxy),
            },
            util_binding: UtilBinding {
                error_decorated_key: deferred(owner, "error_decorated_key", probe::error_decorated_key),
                hidden_key_type: deferred(owner, "hidden_key_type", probe::hidden_key_type),
            },
            memoize: Memoize::default(),
            symbols,
            module: ModuleTable {
                host,
                formatter,
                util_inspect: RefCell::new(None),
            },
            circular_error_message: deferred(
                owner,
                "circular_error_message",
                probe::circular_error_message,
            ),
            custom_inspect_key: deferred(owner, "custom_inspect_key", probe::custom_inspect_key),
            runtime_name: deferred(owner, "runtime_name", probe::runtime_name),
            proxy_native_source_text: deferred(
                owner,
                "proxy_native_source_text",
                probe::proxy_native_source_text,
            ),
        })
    }

    pub fn key(&self) -> &VersionedKey {
        &self.key
    }

    pub fn host(&self) -> &dyn Host {
        self.module.host.as_ref()
    }

    pub fn formatter(&self) -> &Rc<dyn Formatter> {
        &self.module.formatter
    }

    pub fn is_inited(&self) -> bool {
        self.inited.get()
    }

    pub fn is_reloaded(&self) -> bool {
        self.reloaded.get()
    }

    /// Accessed again by the load instance that already holds it
    pub fn mark_active(&self) {
        self.inited.set(true);
        self.reloaded.set(false);
    }

    /// Found in the registry by a load instance that did not create it
    pub fn mark_reloaded(&self) {
        self.reloaded.set(true);
    }

    /// Key under which objects expose a custom inspector
    pub fn custom_inspect_key(&self) -> PropertyKey {
        self.custom_inspect_key
            .get()
            .cloned()
            .unwrap_or_else(|_| PropertyKey::from("inspect"))
    }

    /// What the host says when asked to serialize a circular structure
    pub fn circular_error_message(&self) -> String {
        self.circular_error_message.get_or_default()
    }

    /// Short name derived once per state
    pub fn runtime_name(&self) -> String {
        self.runtime_name.get_or_default()
    }

    /// Whether the host can print the source text of a proxied function
    pub fn proxy_native_source_text(&self) -> bool {
        self.proxy_native_source_text.get_or_default()
    }

    /// Whether `version` satisfies `range`; unparsable input never does
    pub fn satisfies(&self, version: &str, range: &str) -> bool {
        let key = (version.to_string(), range.to_string());
        self.memoize.satisfies.get_or_insert_with(key, || {
            let Some(range) = self.range(range) else {
                return false;
            };
            match Version::parse(version) {
                Ok(version) => range.matches(&version),
                Err(err) => {
                    tracing::debug!(version, error = %err, "unparsable version");
                    false
                }
            }
        })
    }

    /// Highest of `versions` satisfying `range`
    pub fn max_satisfying(&self, versions: &[&str], range: &str) -> Option<String> {
        let key = (
            versions.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
            range.to_string(),
        );
        self.memoize.max_satisfying.get_or_insert_with(key, || {
            let range = self.range(range)?;
            versions
                .iter()
                .filter_map(|raw| Version::parse(raw).ok().map(|parsed| (parsed, *raw)))
                .filter(|(parsed, _)| range.matches(parsed))
                .max_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(_, raw)| raw.to_string())
        })
    }

    /// Canonical form of `path`, or `path` itself when it cannot be resolved
    pub fn realpath(&self, path: &Path) -> PathBuf {
        self.memoize
            .fs_realpath
            .get_or_insert_with(path.to_path_buf(), || {
                std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
            })
    }

    fn range(&self, range: &str) -> Option<Range> {
        self.memoize
            .constraints
            .get_or_insert_with(range.to_string(), || match Range::parse(range) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    tracing::debug!(range, error = %err, "unparsable version range");
                    None
                }
            })
    }
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("key", &self.key.to_string())
            .field("inited", &self.inited.get())
            .field("reloaded", &self.reloaded.get())
            .finish_non_exhaustive()
    }
}
