//! Capability probes
//!
//! Each probe asks the host one question and answers with a plain value.
//! Probes never fail: anything that goes wrong while probing counts as
//! "capability absent".

use std::time::UNIX_EPOCH;

use keel_value::{Depth, Exception, InspectOptions, Object, PropertyKey, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::host::Host;
use crate::state::SharedState;

/// Key used to decorate errors on hosts without the private symbol
pub const DECORATED_KEY: &str = "node:decorated";

static ILLEGAL_INVOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Illegal").expect("illegal-invocation pattern is valid"));

/// Answered eagerly, before the state exists
pub(crate) fn wasm(host: &dyn Host) -> bool {
    host.has_global("WebAssembly")
}

pub(crate) fn await_syntax(state: &SharedState) -> bool {
    state.host().run_script("async () => await 1").is_ok()
}

pub(crate) fn create_cached_data(state: &SharedState) -> bool {
    state.host().supports_cached_data()
}

/// Whether the formatter can display proxy internals
pub(crate) fn inspect_proxies(state: &SharedState) -> bool {
    let prefix = state.key().prefix.as_str();
    let target = Object::function("", |_, _| Ok(Value::Undefined));
    let handler = Object::from_entries([(prefix, 1)]);
    let proxy = Value::from(Object::proxy(target, handler));
    let options = InspectOptions::default()
        .depth(Depth::Limited(1))
        .show_proxy(true);
    match state.formatter().format(&proxy, &options) {
        Ok(text) => text.contains("Proxy") && text.contains(prefix),
        Err(_) => false,
    }
}

/// Whether accessor lookup stops at a shadowing data property
pub(crate) fn lookup_shadowed(_state: &SharedState) -> bool {
    let accessor = Object::function("", |_, _| Ok(Value::Undefined));
    let proto = Object::plain();
    proto.define_accessor("a", Some(accessor.clone()), Some(accessor));
    let object = Object::with_prototype(proto);
    object.put("a", 1);
    let key = PropertyKey::from("a");
    object.lookup_getter(&key).is_none() && object.lookup_setter(&key).is_none()
}

/// Whether native methods accept a proxy of their object as receiver
pub(crate) fn native_proxy_receiver(state: &SharedState) -> bool {
    let Value::Object(buffer) = state.host().alloc_buffer() else {
        return false;
    };
    let handler = Object::plain();
    handler.put(
        "get",
        Object::function("get", |_, args| {
            match (args.first(), args.get(1).and_then(PropertyKey::from_value)) {
                (Some(Value::Object(target)), Some(key)) => target.get(key),
                _ => Ok(Value::Undefined),
            }
        }),
    );
    let proxy = Object::proxy(buffer, handler);
    let receiver = Value::from(proxy.clone());
    let Ok(Value::Object(to_string)) = proxy.get("toString") else {
        return false;
    };
    match to_string.call(&receiver, &[]) {
        Ok(result) => result.as_str().is_some(),
        Err(err) => !ILLEGAL_INVOCATION.is_match(&err.to_string()),
    }
}

pub(crate) fn repl_show_proxy(state: &SharedState) -> bool {
    state.satisfies(state.host().version(), ">=10")
}

pub(crate) fn error_decorated_key(state: &SharedState) -> PropertyKey {
    if state.satisfies(state.host().version(), "<7") {
        return PropertyKey::from(DECORATED_KEY);
    }
    match state.host().private_symbol("decorated_private_symbol") {
        Some(symbol) => PropertyKey::Symbol(symbol),
        None => PropertyKey::from(DECORATED_KEY),
    }
}

pub(crate) fn hidden_key_type(state: &SharedState) -> &'static str {
    match state.util_binding.error_decorated_key() {
        PropertyKey::String(_) => "string",
        PropertyKey::Symbol(_) => "symbol",
    }
}

pub(crate) fn custom_inspect_key(state: &SharedState) -> PropertyKey {
    match state.formatter().custom_inspect_symbol() {
        Some(symbol) => PropertyKey::Symbol(symbol),
        None => PropertyKey::from("inspect"),
    }
}

/// `_` followed by three hex digits of a digest of the current time
pub(crate) fn runtime_name(state: &SharedState) -> String {
    let millis = state
        .host()
        .now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let digest = hex::encode(Sha256::digest(millis.to_string().as_bytes()));
    format!("_{}", &digest[..3])
}

/// The host's message for serializing a self-referencing object
pub(crate) fn circular_error_message(state: &SharedState) -> String {
    let object = Object::plain();
    object.put("a", object.clone());
    let message = match state.host().stringify(&Value::from(object.clone())) {
        Ok(_) => String::new(),
        Err(Exception::TypeError(message)) => message,
        Err(err) => err.to_string(),
    };
    object.put("a", Value::Undefined);
    message
}

pub(crate) fn proxy_native_source_text(state: &SharedState) -> bool {
    let target = Object::function("", |_, _| Ok(Value::Undefined));
    let proxy = Value::from(Object::proxy(target, Object::plain()));
    state.host().function_source_text(&proxy).is_ok()
}
