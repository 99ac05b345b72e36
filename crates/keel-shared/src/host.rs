//! Host environment
//!
//! The [`Host`] trait is everything the shared state needs to know about
//! the runtime it runs in: its version, which globals exist, whether it can
//! compile a given source, how it formats values, and a few objects used by
//! capability probes. [`BasicHost`] is a configurable in-process
//! implementation.

use std::rc::Rc;
use std::time::SystemTime;

use keel_value::{
    BasicFormatter, Exception, Formatter, Object, ObjectClass, Symbol, Value, ValueResult,
};
use rustc_hash::FxHashMap;

use crate::config::KeelConfig;

/// The runtime hosting the instrumentation layer
pub trait Host {
    /// Runtime version string, e.g. `"v20.11.0"`
    fn version(&self) -> &str;

    /// Whether a global binding with this name exists
    fn has_global(&self, name: &str) -> bool;

    /// Compile and run a snippet of source text
    fn run_script(&self, source: &str) -> ValueResult<Value>;

    /// Whether compiled scripts can produce a code cache
    fn supports_cached_data(&self) -> bool;

    /// The host's value formatter
    fn formatter(&self) -> Rc<dyn Formatter>;

    /// A fresh native buffer object with a receiver-checked `toString`
    fn alloc_buffer(&self) -> Value;

    /// Host-private symbol with the given name, if the host exposes one
    fn private_symbol(&self, name: &str) -> Option<Symbol>;

    /// Source text of a function value
    fn function_source_text(&self, function: &Value) -> ValueResult<String>;

    /// JSON text of a value; fails on circular structures
    fn stringify(&self, value: &Value) -> ValueResult<String>;

    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// In-process [`Host`] with switchable capabilities
pub struct BasicHost {
    version: String,
    globals: Vec<String>,
    async_await: bool,
    cached_data: bool,
    proxy_source_text: bool,
    strict_native_receivers: bool,
    formatter: Rc<dyn Formatter>,
    private_symbols: FxHashMap<String, Symbol>,
}

/// Builder for [`BasicHost`]
pub struct BasicHostBuilder {
    version: String,
    globals: Vec<String>,
    async_await: bool,
    cached_data: bool,
    proxy_source_text: bool,
    strict_native_receivers: bool,
    formatter: Option<Rc<dyn Formatter>>,
}

impl Default for BasicHostBuilder {
    fn default() -> Self {
        Self {
            version: "v20.11.0".to_string(),
            globals: vec!["WebAssembly".to_string()],
            async_await: true,
            cached_data: true,
            proxy_source_text: true,
            strict_native_receivers: false,
            formatter: None,
        }
    }
}

impl BasicHostBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn globals<I, S>(mut self, globals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.globals = globals.into_iter().map(Into::into).collect();
        self
    }

    pub fn async_await(mut self, enabled: bool) -> Self {
        self.async_await = enabled;
        self
    }

    pub fn cached_data(mut self, enabled: bool) -> Self {
        self.cached_data = enabled;
        self
    }

    pub fn proxy_source_text(mut self, enabled: bool) -> Self {
        self.proxy_source_text = enabled;
        self
    }

    /// Native methods reject receivers that are not the native object itself
    pub fn strict_native_receivers(mut self, enabled: bool) -> Self {
        self.strict_native_receivers = enabled;
        self
    }

    pub fn formatter(mut self, formatter: Rc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn build(self) -> Rc<BasicHost> {
        let formatter: Rc<dyn Formatter> = match self.formatter {
            Some(formatter) => formatter,
            None => BasicFormatter::new(),
        };
        let private_symbols = ["decorated_private_symbol", "arrow_message_private_symbol"]
            .into_iter()
            .map(|name| (name.to_string(), Symbol::new(name)))
            .collect();
        Rc::new(BasicHost {
            version: self.version,
            globals: self.globals,
            async_await: self.async_await,
            cached_data: self.cached_data,
            proxy_source_text: self.proxy_source_text,
            strict_native_receivers: self.strict_native_receivers,
            formatter,
            private_symbols,
        })
    }
}

impl BasicHost {
    pub fn builder() -> BasicHostBuilder {
        BasicHostBuilder::default()
    }

    /// Host with every capability enabled
    pub fn new() -> Rc<BasicHost> {
        Self::builder().build()
    }

    /// Host described by the `[host]` and `[inspect]` configuration sections
    pub fn from_config(config: &KeelConfig) -> Rc<BasicHost> {
        let formatter = BasicFormatter::with_defaults(config.inspect.to_options());
        let config = &config.host;
        let mut builder = Self::builder()
            .formatter(formatter)
            .async_await(config.async_await)
            .cached_data(config.cached_data)
            .proxy_source_text(config.proxy_source_text)
            .strict_native_receivers(config.strict_native_receivers);
        if let Some(version) = &config.version {
            builder = builder.version(version.clone());
        }
        if let Some(globals) = &config.globals {
            builder = builder.globals(globals.iter().cloned());
        }
        builder.build()
    }
}

impl Host for BasicHost {
    fn version(&self) -> &str {
        &self.version
    }

    fn has_global(&self, name: &str) -> bool {
        self.globals.iter().any(|global| global == name)
    }

    fn run_script(&self, source: &str) -> ValueResult<Value> {
        if !self.async_await && source.contains("await") {
            return Err(Exception::SyntaxError(
                "await is only valid in async functions".to_string(),
            ));
        }
        Ok(Value::Undefined)
    }

    fn supports_cached_data(&self) -> bool {
        self.cached_data
    }

    fn formatter(&self) -> Rc<dyn Formatter> {
        self.formatter.clone()
    }

    fn alloc_buffer(&self) -> Value {
        let buffer = Object::plain();
        let strict = self.strict_native_receivers;
        let owner = buffer.downgrade();
        let to_string = Object::function("toString", move |this, _args| {
            let is_buffer = match (this, owner.upgrade()) {
                (Value::Object(receiver), Some(buffer)) => receiver.ptr_eq(&buffer),
                _ => false,
            };
            if strict && !is_buffer {
                return Err(Exception::TypeError("Illegal invocation".to_string()));
            }
            Ok(Value::from(""))
        });
        buffer.define_hidden("toString", to_string);
        buffer.put("length", 0);
        Value::Object(buffer)
    }

    fn private_symbol(&self, name: &str) -> Option<Symbol> {
        self.private_symbols.get(name).cloned()
    }

    fn function_source_text(&self, function: &Value) -> ValueResult<String> {
        let Value::Object(object) = function else {
            return Err(Exception::TypeError("not a function".to_string()));
        };
        if !object.is_callable() {
            return Err(Exception::TypeError("not a function".to_string()));
        }
        if object.proxy_details().is_some() && !self.proxy_source_text {
            return Err(Exception::TypeError(
                "Function.prototype.toString requires that 'this' be a Function".to_string(),
            ));
        }
        let name = object.function_name().unwrap_or_else(|| Rc::from(""));
        Ok(format!("function {}() {{ [native code] }}", name))
    }

    fn stringify(&self, value: &Value) -> ValueResult<String> {
        let json = to_json(value, &mut Vec::new())?.unwrap_or(serde_json::Value::Null);
        serde_json::to_string(&json).map_err(|err| Exception::TypeError(err.to_string()))
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// `None` for values JSON skips (undefined, functions, symbols)
fn to_json(value: &Value, seen: &mut Vec<usize>) -> ValueResult<Option<serde_json::Value>> {
    let object = match value {
        Value::Undefined | Value::Symbol(_) => return Ok(None),
        Value::Null => return Ok(Some(serde_json::Value::Null)),
        Value::Bool(flag) => return Ok(Some(serde_json::Value::Bool(*flag))),
        Value::Number(number) if number.fract() == 0.0 && number.abs() < MAX_SAFE_INTEGER => {
            return Ok(Some(serde_json::Value::from(*number as i64)));
        }
        Value::Number(number) => {
            let json = serde_json::Number::from_f64(*number)
                .map_or(serde_json::Value::Null, serde_json::Value::Number);
            return Ok(Some(json));
        }
        Value::String(text) => return Ok(Some(serde_json::Value::String(text.to_string()))),
        Value::Object(object) if object.is_callable() => return Ok(None),
        Value::Object(object) => object,
    };

    if seen.contains(&object.addr()) {
        return Err(Exception::TypeError(
            "Converting circular structure to JSON".to_string(),
        ));
    }
    seen.push(object.addr());

    let mut entries = serde_json::Map::new();
    let mut items = Vec::new();
    let is_array = object.class() == ObjectClass::Array;
    for key in object.own_keys() {
        let Some(descriptor) = object.get_own_property(&key)? else {
            continue;
        };
        if !descriptor.enumerable {
            continue;
        }
        let element = to_json(&object.get(key.clone())?, seen)?;
        if is_array {
            if key.as_index().is_some() {
                items.push(element.unwrap_or(serde_json::Value::Null));
            }
        } else if let (Some(name), Some(element)) = (key.as_str(), element) {
            entries.insert(name.to_string(), element);
        }
    }

    seen.pop();
    Ok(Some(if is_array {
        serde_json::Value::Array(items)
    } else {
        serde_json::Value::Object(entries)
    }))
}

impl std::fmt::Debug for BasicHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicHost")
            .field("version", &self.version)
            .field("globals", &self.globals)
            .field("async_await", &self.async_await)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let host = BasicHost::new();
        assert_eq!(host.version(), "v20.11.0");
        assert!(host.has_global("WebAssembly"));
        assert!(!host.has_global("Deno"));
        assert!(host.supports_cached_data());
        assert!(host.run_script("async () => await 1").is_ok());
    }

    #[test]
    fn test_await_rejected_when_disabled() {
        let host = BasicHost::builder().async_await(false).build();
        let err = host.run_script("async () => await 1").unwrap_err();
        assert!(matches!(err, Exception::SyntaxError(_)));
    }

    #[test]
    fn test_strict_buffer_receiver() {
        let host = BasicHost::builder().strict_native_receivers(true).build();
        let buffer = host.alloc_buffer();
        let object = buffer.as_object().unwrap();
        let Value::Object(to_string) = object.get("toString").unwrap() else {
            panic!("toString must be a function");
        };
        assert!(to_string.call(&buffer, &[]).is_ok());
        let err = to_string.call(&Value::from(Object::plain()), &[]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Illegal invocation");
    }

    #[test]
    fn test_private_symbols() {
        let host = BasicHost::new();
        let symbol = host.private_symbol("decorated_private_symbol").unwrap();
        assert_eq!(symbol.description(), Some("decorated_private_symbol"));
        assert!(host.private_symbol("missing").is_none());
    }

    #[test]
    fn test_proxy_source_text() {
        let target = Object::function("f", |_, _| Ok(Value::Undefined));
        let proxy = Value::from(Object::proxy(target, Object::plain()));
        assert!(BasicHost::new().function_source_text(&proxy).is_ok());
        let host = BasicHost::builder().proxy_source_text(false).build();
        assert!(host.function_source_text(&proxy).is_err());
    }

    #[test]
    fn test_stringify() {
        let host = BasicHost::new();
        let object = Object::from_entries([("a", Value::from(1)), ("b", Value::from("x"))]);
        object.define_hidden("h", 2);
        object.put("f", Object::function("f", |_, _| Ok(Value::Undefined)));
        assert_eq!(host.stringify(&Value::from(object)).unwrap(), r#"{"a":1,"b":"x"}"#);

        let cyclic = Object::plain();
        cyclic.put("a", cyclic.clone());
        let err = host.stringify(&Value::from(cyclic)).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Converting circular structure to JSON");
    }
}
