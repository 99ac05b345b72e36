//! Baseline value formatter
//!
//! Renders values in the familiar single-line inspection style:
//! `{ a: 1, b: [ 'x' ] }`, `[Function: f]`, `Proxy [ target, handler ]`.
//!
//! The formatter walks objects structurally through
//! [`ObjectBehavior::own_keys`](crate::ObjectBehavior::own_keys) and
//! property descriptors, honors objects that provide their own inspection
//! function under the custom-inspect key, and stops at the configured depth.
//! It does not guard against values that raise while being read; reading an
//! uninitialized namespace binding, for instance, propagates the exception.

use std::rc::{Rc, Weak};

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::object::{Object, ObjectClass};
use crate::property::{PropertyDescriptor, PropertyKey, PropertySlot};
use crate::proxy::ProxyDetails;
use crate::symbol::Symbol;
use crate::value::Value;
use crate::{Exception, ValueResult};

/// Registered symbol key under which objects expose a custom inspector
pub const CUSTOM_INSPECT_SYMBOL: &str = "nodejs.util.inspect.custom";

/// Default recursion limit
pub const DEFAULT_DEPTH: u32 = 2;

/// Array entries (values or runs of holes) shown before the rest is summarized
pub const MAX_ARRAY_ITEMS: usize = 100;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z_0-9]*$").expect("identifier pattern is valid")
});

/// Recursion limit for nested objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Stop after this many nested levels
    Limited(u32),
    /// Never stop
    Infinite,
}

impl Depth {
    /// Read a depth from an option value (`null` means infinite)
    pub fn from_value(value: &Value) -> Option<Depth> {
        match value {
            Value::Null => Some(Depth::Infinite),
            Value::Number(n) if n.is_infinite() && *n > 0.0 => Some(Depth::Infinite),
            Value::Number(n) if n.is_finite() => Some(Depth::Limited(n.max(0.0) as u32)),
            _ => None,
        }
    }

    /// Encode the depth as an option value
    pub fn to_value(self) -> Value {
        match self {
            Depth::Limited(n) => Value::from(n),
            Depth::Infinite => Value::Null,
        }
    }
}

/// Formatting options; `None` means "not given, use the default"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectOptions {
    /// Recursion limit
    pub depth: Option<Depth>,
    /// Emit ANSI color escapes
    pub colors: Option<bool>,
    /// Include non-enumerable properties
    pub show_hidden: Option<bool>,
    /// Honor custom inspection functions
    pub custom_inspect: Option<bool>,
    /// Show proxies as `Proxy [ target, handler ]`
    pub show_proxy: Option<bool>,
}

impl InspectOptions {
    /// Set the recursion limit
    pub fn depth(mut self, depth: Depth) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Enable or disable colors
    pub fn colors(mut self, colors: bool) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Show or hide non-enumerable properties
    pub fn show_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = Some(show_hidden);
        self
    }

    /// Honor or ignore custom inspection functions
    pub fn custom_inspect(mut self, custom_inspect: bool) -> Self {
        self.custom_inspect = Some(custom_inspect);
        self
    }

    /// Show or hide proxy internals
    pub fn show_proxy(mut self, show_proxy: bool) -> Self {
        self.show_proxy = Some(show_proxy);
        self
    }

    /// Fill every unset field from `fallback`
    pub fn or(&self, fallback: &InspectOptions) -> InspectOptions {
        InspectOptions {
            depth: self.depth.or(fallback.depth),
            colors: self.colors.or(fallback.colors),
            show_hidden: self.show_hidden.or(fallback.show_hidden),
            custom_inspect: self.custom_inspect.or(fallback.custom_inspect),
            show_proxy: self.show_proxy.or(fallback.show_proxy),
        }
    }

    /// Concrete options after applying `defaults`
    pub fn resolve(&self, defaults: &InspectOptions) -> ResolvedOptions {
        let merged = self.or(defaults);
        ResolvedOptions {
            depth: merged.depth.unwrap_or(Depth::Limited(DEFAULT_DEPTH)),
            colors: merged.colors.unwrap_or(false),
            show_hidden: merged.show_hidden.unwrap_or(false),
            custom_inspect: merged.custom_inspect.unwrap_or(true),
            show_proxy: merged.show_proxy.unwrap_or(false),
        }
    }

    /// Encode the given fields as an options object
    pub fn to_value(&self) -> Value {
        let object = Object::plain();
        if let Some(depth) = self.depth {
            object.put("depth", depth.to_value());
        }
        let flags = [
            ("colors", self.colors),
            ("showHidden", self.show_hidden),
            ("customInspect", self.custom_inspect),
            ("showProxy", self.show_proxy),
        ];
        for (name, flag) in flags {
            if let Some(flag) = flag {
                object.put(name, flag);
            }
        }
        Value::Object(object)
    }

    /// Decode an options object; unknown or unreadable fields stay unset
    pub fn from_value(value: &Value) -> InspectOptions {
        let Value::Object(object) = value else {
            return InspectOptions::default();
        };
        let read = |name: &str| object.get(name).unwrap_or_default();
        InspectOptions {
            depth: Depth::from_value(&read("depth")),
            colors: read("colors").as_bool(),
            show_hidden: read("showHidden").as_bool(),
            custom_inspect: read("customInspect").as_bool(),
            show_proxy: read("showProxy").as_bool(),
        }
    }
}

/// Options with every field decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Recursion limit
    pub depth: Depth,
    /// Emit ANSI color escapes
    pub colors: bool,
    /// Include non-enumerable properties
    pub show_hidden: bool,
    /// Honor custom inspection functions
    pub custom_inspect: bool,
    /// Show proxy internals
    pub show_proxy: bool,
}

impl ResolvedOptions {
    fn to_options(self) -> InspectOptions {
        InspectOptions {
            depth: Some(self.depth),
            colors: Some(self.colors),
            show_hidden: Some(self.show_hidden),
            custom_inspect: Some(self.custom_inspect),
            show_proxy: Some(self.show_proxy),
        }
    }
}

/// Style names mapped to ANSI color pairs
#[derive(Debug, Clone)]
pub struct StyleTable {
    styles: FxHashMap<&'static str, &'static str>,
    colors: FxHashMap<&'static str, (u8, u8)>,
}

impl Default for StyleTable {
    fn default() -> Self {
        let styles = [
            ("special", "cyan"),
            ("number", "yellow"),
            ("bigint", "yellow"),
            ("boolean", "yellow"),
            ("undefined", "grey"),
            ("null", "bold"),
            ("string", "green"),
            ("symbol", "green"),
            ("date", "magenta"),
            ("regexp", "red"),
            ("module", "underline"),
        ];
        let colors = [
            ("bold", (1, 22)),
            ("italic", (3, 23)),
            ("underline", (4, 24)),
            ("inverse", (7, 27)),
            ("white", (37, 39)),
            ("grey", (90, 39)),
            ("black", (30, 39)),
            ("blue", (34, 39)),
            ("cyan", (36, 39)),
            ("green", (32, 39)),
            ("magenta", (35, 39)),
            ("red", (31, 39)),
            ("yellow", (33, 39)),
        ];
        Self {
            styles: styles.into_iter().collect(),
            colors: colors.into_iter().collect(),
        }
    }
}

impl StyleTable {
    /// Color name assigned to a style type
    pub fn style(&self, style_type: &str) -> Option<&'static str> {
        self.styles.get(style_type).copied()
    }

    /// Opening and closing SGR codes for a style type
    pub fn codes(&self, style_type: &str) -> Option<(u8, u8)> {
        let color = self.style(style_type)?;
        self.colors.get(color).copied()
    }

    /// Assign a color to a style type
    pub fn set_style(&mut self, style_type: &'static str, color: &'static str) {
        self.styles.insert(style_type, color);
    }
}

/// A value-to-text routine
pub trait Formatter {
    /// Render `value`
    fn format(&self, value: &Value, options: &InspectOptions) -> ValueResult<String>;

    /// Defaults applied to unset options
    fn defaults(&self) -> &InspectOptions;

    /// Style table used for colors
    fn styles(&self) -> &StyleTable;

    /// The formatter as a callable value; objects exposing this exact
    /// function as their custom inspector are formatted normally
    fn function(&self) -> Value;

    /// Symbol under which objects expose a custom inspector, if supported
    fn custom_inspect_symbol(&self) -> Option<Symbol>;

    /// Key looked up for custom inspectors
    fn custom_inspect_key(&self) -> PropertyKey {
        match self.custom_inspect_symbol() {
            Some(symbol) => PropertyKey::Symbol(symbol),
            None => PropertyKey::from("inspect"),
        }
    }
}

/// The default [`Formatter`]
pub struct BasicFormatter {
    defaults: InspectOptions,
    styles: StyleTable,
    custom_symbol: Option<Symbol>,
    function: Object,
}

impl BasicFormatter {
    /// Formatter with the standard defaults
    pub fn new() -> Rc<Self> {
        Self::with_defaults(InspectOptions::default())
    }

    /// Formatter whose defaults are overridden by `overrides`
    pub fn with_defaults(overrides: InspectOptions) -> Rc<Self> {
        Self::build(overrides, Some(Symbol::for_key(CUSTOM_INSPECT_SYMBOL)))
    }

    /// Formatter without custom-inspect symbol support; custom inspectors
    /// are looked up under the plain `"inspect"` key instead
    pub fn legacy() -> Rc<Self> {
        Self::build(InspectOptions::default(), None)
    }

    fn build(overrides: InspectOptions, custom_symbol: Option<Symbol>) -> Rc<Self> {
        let defaults = overrides.or(&InspectOptions {
            depth: Some(Depth::Limited(DEFAULT_DEPTH)),
            colors: Some(false),
            show_hidden: Some(false),
            custom_inspect: Some(true),
            show_proxy: Some(false),
        });
        Rc::new_cyclic(|weak: &Weak<BasicFormatter>| {
            let weak = weak.clone();
            let function = Object::function("inspect", move |_this, args| {
                let formatter = weak.upgrade().ok_or_else(|| {
                    Exception::TypeError("formatter is no longer available".to_string())
                })?;
                let value = args.first().cloned().unwrap_or_default();
                let options = args
                    .get(1)
                    .map(InspectOptions::from_value)
                    .unwrap_or_default();
                formatter.format(&value, &options).map(Value::from)
            });
            BasicFormatter {
                defaults,
                styles: StyleTable::default(),
                custom_symbol,
                function,
            }
        })
    }
}

impl Formatter for BasicFormatter {
    fn format(&self, value: &Value, options: &InspectOptions) -> ValueResult<String> {
        let mut renderer = Renderer {
            formatter: self,
            options: options.resolve(&self.defaults),
            custom_key: self.custom_inspect_key(),
            seen: Vec::new(),
        };
        renderer.value(value, 0)
    }

    fn defaults(&self) -> &InspectOptions {
        &self.defaults
    }

    fn styles(&self) -> &StyleTable {
        &self.styles
    }

    fn function(&self) -> Value {
        Value::Object(self.function.clone())
    }

    fn custom_inspect_symbol(&self) -> Option<Symbol> {
        self.custom_symbol.clone()
    }
}

struct Renderer<'a> {
    formatter: &'a BasicFormatter,
    options: ResolvedOptions,
    custom_key: PropertyKey,
    seen: Vec<Object>,
}

impl Renderer<'_> {
    fn value(&mut self, value: &Value, recurse: u32) -> ValueResult<String> {
        let Value::Object(object) = value else {
            return Ok(self.primitive(value));
        };

        if self.options.show_proxy {
            if let Some(details) = object.proxy_details() {
                return self.proxy(&details, recurse);
            }
        }

        if let Depth::Limited(limit) = self.options.depth {
            if recurse > limit {
                let marker = match object.class() {
                    ObjectClass::Array => "[Array]",
                    ObjectClass::Function => "[Function]",
                    _ => "[Object]",
                };
                return Ok(self.paint(marker, "special"));
            }
        }

        if self.options.custom_inspect {
            if let Some(rendered) = self.custom(object, value, recurse)? {
                return Ok(rendered);
            }
        }

        if self.seen.iter().any(|seen| seen.ptr_eq(object)) {
            return Ok(self.paint("[Circular]", "special"));
        }

        self.seen.push(object.clone());
        let result = self.raw(object, recurse);
        self.seen.pop();
        result
    }

    fn custom(&mut self, object: &Object, value: &Value, recurse: u32) -> ValueResult<Option<String>> {
        let Value::Object(inspector) = object.get(self.custom_key.clone())? else {
            return Ok(None);
        };
        if !inspector.is_callable() || inspector.ptr_eq(&self.formatter.function) {
            return Ok(None);
        }
        let remaining = match self.options.depth {
            Depth::Limited(limit) => Depth::Limited(limit - recurse),
            Depth::Infinite => Depth::Infinite,
        };
        let context = self.options.to_options().to_value();
        let result = inspector.call(value, &[remaining.to_value(), context])?;
        if result.same_value(value) {
            return Ok(None);
        }
        match result {
            Value::String(s) => Ok(Some(s.to_string())),
            other => self.value(&other, recurse).map(Some),
        }
    }

    fn proxy(&mut self, details: &ProxyDetails, recurse: u32) -> ValueResult<String> {
        let target = self.value(&Value::Object(details.target.clone()), recurse + 1)?;
        let handler = self.value(&Value::Object(details.handler.clone()), recurse + 1)?;
        Ok(format!("Proxy [ {}, {} ]", target, handler))
    }

    fn raw(&mut self, object: &Object, recurse: u32) -> ValueResult<String> {
        let class = object.class();
        let mut entries = Vec::new();

        if class == ObjectClass::Array {
            entries = self.array_items(object, recurse)?;
        }

        for key in object.own_keys() {
            if class == ObjectClass::Array
                && (key.as_index().is_some() || key.as_str() == Some("length"))
            {
                continue;
            }
            let Some(descriptor) = object.get_own_property(&key)? else {
                continue;
            };
            if !descriptor.enumerable && !self.options.show_hidden {
                continue;
            }
            entries.push(self.property(&key, &descriptor, recurse)?);
        }

        let body = if entries.is_empty() {
            None
        } else {
            Some(entries.join(", "))
        };

        Ok(match class {
            ObjectClass::Array => match body {
                Some(body) => format!("[ {} ]", body),
                None => "[]".to_string(),
            },
            ObjectClass::Function | ObjectClass::Error => {
                let base = if class == ObjectClass::Function {
                    self.function_base(object)
                } else {
                    self.error_base(object)?
                };
                match body {
                    Some(body) => format!("{} {{ {} }}", base, body),
                    None => base,
                }
            }
            ObjectClass::Namespace => match body {
                Some(body) => format!("[Module: null prototype] {{ {} }}", body),
                None => "[Module: null prototype] {}".to_string(),
            },
            ObjectClass::Object => {
                let tag = object.to_string_tag();
                let prefix = if &*tag == "Object" {
                    String::new()
                } else {
                    format!("Object [{}] ", tag)
                };
                match body {
                    Some(body) => format!("{}{{ {} }}", prefix, body),
                    None => format!("{}{{}}", prefix),
                }
            }
        })
    }

    fn array_items(&mut self, array: &Object, recurse: u32) -> ValueResult<Vec<String>> {
        let length = array
            .get("length")?
            .as_number()
            .map(|n| n.max(0.0) as usize)
            .unwrap_or(0);
        let mut indices: Vec<usize> = array
            .own_keys()
            .iter()
            .filter_map(PropertyKey::as_index)
            .filter(|index| *index < length)
            .collect();
        indices.sort_unstable();

        // Holes are counted from the gaps between own indices, so a huge
        // `length` costs nothing beyond the entries actually present.
        let mut items = Vec::new();
        let mut next = 0usize;
        for index in indices {
            if items.len() >= MAX_ARRAY_ITEMS {
                break;
            }
            if index > next {
                items.push(self.holes(index - next));
                next = index;
                if items.len() >= MAX_ARRAY_ITEMS {
                    break;
                }
            }
            if let Some(descriptor) = array.get_own_property(&PropertyKey::from(index))? {
                items.push(self.slot(&descriptor.slot, recurse)?);
            }
            next = index + 1;
        }
        if next < length && items.len() < MAX_ARRAY_ITEMS {
            items.push(self.holes(length - next));
            next = length;
        }
        if next < length {
            let remaining = length - next;
            let plural = if remaining == 1 { "" } else { "s" };
            items.push(format!("... {} more item{}", remaining, plural));
        }
        Ok(items)
    }

    fn holes(&self, count: usize) -> String {
        let plural = if count == 1 { "" } else { "s" };
        self.paint(&format!("<{} empty item{}>", count, plural), "undefined")
    }

    fn property(
        &mut self,
        key: &PropertyKey,
        descriptor: &PropertyDescriptor,
        recurse: u32,
    ) -> ValueResult<String> {
        let mut name = match key {
            PropertyKey::String(s) if IDENTIFIER.is_match(s) => s.to_string(),
            PropertyKey::String(s) => self.paint(&quote(s), "string"),
            PropertyKey::Symbol(symbol) => format!("[{}]", self.paint(&symbol.to_string(), "symbol")),
        };
        if !descriptor.enumerable {
            name = format!("[{}]", name);
        }
        let value = self.slot(&descriptor.slot, recurse)?;
        Ok(format!("{}: {}", name, value))
    }

    fn slot(&mut self, slot: &PropertySlot, recurse: u32) -> ValueResult<String> {
        match slot {
            PropertySlot::Data { value, .. } => self.value(value, recurse + 1),
            PropertySlot::Accessor { get, set } => {
                let label = match (get.is_some(), set.is_some()) {
                    (true, true) => "[Getter/Setter]",
                    (true, false) => "[Getter]",
                    (false, true) => "[Setter]",
                    (false, false) => "undefined",
                };
                Ok(self.paint(label, "special"))
            }
        }
    }

    fn function_base(&self, function: &Object) -> String {
        let base = match function.function_name() {
            Some(name) if !name.is_empty() => format!("[Function: {}]", name),
            _ => "[Function (anonymous)]".to_string(),
        };
        self.paint(&base, "special")
    }

    fn error_base(&self, error: &Object) -> ValueResult<String> {
        if let Value::String(stack) = error.get("stack")? {
            return Ok(stack.to_string());
        }
        let name = match error.get("name")? {
            Value::String(name) => name.to_string(),
            _ => "Error".to_string(),
        };
        Ok(match error.get("message")? {
            Value::String(message) if !message.is_empty() => format!("[{}: {}]", name, message),
            _ => format!("[{}]", name),
        })
    }

    fn primitive(&self, value: &Value) -> String {
        match value {
            Value::Undefined => self.paint("undefined", "undefined"),
            Value::Null => self.paint("null", "null"),
            Value::Bool(b) => self.paint(&b.to_string(), "boolean"),
            Value::Number(n) => self.paint(&format_number(*n), "number"),
            Value::String(s) => self.paint(&quote(s), "string"),
            Value::Symbol(s) => self.paint(&s.to_string(), "symbol"),
            Value::Object(object) => format!("{:?}", object),
        }
    }

    fn paint(&self, text: &str, style_type: &str) -> String {
        if !self.options.colors {
            return text.to_string();
        }
        match self.formatter.styles.codes(style_type) {
            Some((open, close)) => format!("\u{1b}[{}m{}\u{1b}[{}m", open, text, close),
            None => text.to_string(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 && n.is_sign_negative() {
        "-0".to_string()
    } else {
        n.to_string()
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
