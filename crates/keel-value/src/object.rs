//! Object Model
//!
//! Every object is reached through an [`Object`] handle, a cloneable,
//! identity-compared reference to some implementation of
//! [`ObjectBehavior`]. The behavior trait is the whole read/enumerate
//! protocol: anything that implements it (ordinary objects, namespaces,
//! proxies, wrappers built by higher layers) can be formatted and inspected
//! the same way.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::property::{PropertyDescriptor, PropertyKey, PropertySlot};
use crate::proxy::{ProxyDetails, ProxyObject};
use crate::value::Value;
use crate::{Exception, ValueResult};

/// Native function body: `(this, args) -> result`
pub type NativeFn = Rc<dyn Fn(&Value, &[Value]) -> ValueResult<Value>>;

/// Coarse classification of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    /// Ordinary object
    Object,
    /// Array exotic object
    Array,
    /// Callable object
    Function,
    /// Error instance
    Error,
    /// Module namespace exotic object
    Namespace,
}

/// The read/enumerate protocol shared by every object kind
pub trait ObjectBehavior: Any {
    /// Classification used for formatting and `typeof`
    fn class(&self) -> ObjectClass;

    /// Tag reported by `Object.prototype.toString` (`"Object"`, `"Array"`, ...)
    fn to_string_tag(&self) -> Rc<str>;

    /// Look up an own property
    fn get_own_property(&self, key: &PropertyKey) -> ValueResult<Option<PropertyDescriptor>>;

    /// Own property keys: strings in insertion order, then symbols
    fn own_keys(&self) -> Vec<PropertyKey>;

    /// Prototype object, if any
    fn prototype(&self) -> Option<Object> {
        None
    }

    /// `[[Get]]` with an explicit receiver
    fn get(&self, key: &PropertyKey, receiver: &Value) -> ValueResult<Value> {
        match self.get_own_property(key)? {
            Some(descriptor) => descriptor.read(receiver),
            None => match self.prototype() {
                Some(proto) => proto.get_with_receiver(key, receiver),
                None => Ok(Value::Undefined),
            },
        }
    }

    /// Define or replace an own property; returns `false` when refused
    fn define_own_property(
        &self,
        _key: PropertyKey,
        _descriptor: PropertyDescriptor,
    ) -> ValueResult<bool> {
        Ok(false)
    }

    /// `[[Set]]`
    fn set(&self, key: PropertyKey, value: Value, receiver: &Value) -> ValueResult<bool> {
        match self.get_own_property(&key)? {
            Some(PropertyDescriptor {
                slot: PropertySlot::Data { writable: false, .. },
                ..
            }) => Ok(false),
            Some(PropertyDescriptor {
                slot: PropertySlot::Accessor { set, .. },
                ..
            }) => match set {
                Some(Value::Object(setter)) => setter.call(receiver, &[value]).map(|_| true),
                _ => Ok(false),
            },
            Some(mut descriptor) => {
                descriptor.slot = PropertySlot::Data {
                    value,
                    writable: true,
                };
                self.define_own_property(key, descriptor)
            }
            None => self.define_own_property(key, PropertyDescriptor::data(value)),
        }
    }

    /// `[[Call]]`
    fn call(&self, _this: &Value, _args: &[Value]) -> ValueResult<Value> {
        Err(Exception::TypeError("object is not a function".to_string()))
    }

    /// Name of a callable object
    fn function_name(&self) -> Option<Rc<str>> {
        None
    }

    /// Target and handler, when this object is a proxy
    fn proxy_details(&self) -> Option<ProxyDetails> {
        None
    }

    /// Downcasting support
    fn as_any(&self) -> &dyn Any;
}

/// Cloneable, identity-compared handle to an object
#[derive(Clone)]
pub struct Object(Rc<dyn ObjectBehavior>);

/// Non-owning handle to an object
#[derive(Clone)]
pub struct WeakObject(Weak<dyn ObjectBehavior>);

impl Object {
    /// Wrap a behavior implementation
    pub fn new<T: ObjectBehavior>(behavior: T) -> Self {
        Object(Rc::new(behavior))
    }

    /// Wrap a behavior that needs a weak handle to itself
    pub fn new_cyclic<T: ObjectBehavior>(build: impl FnOnce(WeakObject) -> T) -> Self {
        let rc: Rc<T> = Rc::new_cyclic(|weak: &Weak<T>| {
            let weak: Weak<dyn ObjectBehavior> = weak.clone();
            build(WeakObject(weak))
        });
        Object(rc)
    }

    /// New empty ordinary object
    pub fn plain() -> Self {
        Object::new(OrdinaryObject::new(ObjectClass::Object))
    }

    /// New ordinary object whose string tag is `tag`
    pub fn tagged(tag: &str) -> Self {
        Object::new(OrdinaryObject::new(ObjectClass::Object).with_tag(tag))
    }

    /// New ordinary object inheriting from `proto`
    pub fn with_prototype(proto: Object) -> Self {
        Object::new(OrdinaryObject::new(ObjectClass::Object).with_prototype(proto))
    }

    /// New ordinary object holding the given enumerable properties
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<PropertyKey>,
        V: Into<Value>,
    {
        let object = Object::plain();
        for (key, value) in entries {
            object.put(key, value);
        }
        object
    }

    /// New array holding `values`
    pub fn array(values: impl IntoIterator<Item = Value>) -> Self {
        let array = OrdinaryObject::new(ObjectClass::Array);
        let mut length = 0usize;
        {
            let mut properties = array.properties.borrow_mut();
            for (index, value) in values.into_iter().enumerate() {
                properties.insert(PropertyKey::from(index), PropertyDescriptor::data(value));
                length = index + 1;
            }
            properties.insert(
                PropertyKey::from("length"),
                PropertyDescriptor {
                    enumerable: false,
                    configurable: false,
                    ..PropertyDescriptor::data(length as f64)
                },
            );
        }
        Object::new(array)
    }

    /// New native function
    pub fn function<F>(name: &str, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> ValueResult<Value> + 'static,
    {
        let function = OrdinaryObject::new(ObjectClass::Function).with_body(name, Rc::new(body));
        function.properties.borrow_mut().insert(
            PropertyKey::from("name"),
            PropertyDescriptor {
                slot: PropertySlot::Data {
                    value: Value::from(name),
                    writable: false,
                },
                enumerable: false,
                configurable: true,
            },
        );
        Object::new(function)
    }

    /// New error whose stack is just its header line
    pub fn error(name: &str, message: &str) -> Self {
        let header = if message.is_empty() {
            name.to_string()
        } else {
            format!("{}: {}", name, message)
        };
        Object::error_with_stack(name, message, &header)
    }

    /// New error with an explicit stack trace
    pub fn error_with_stack(name: &str, message: &str, stack: &str) -> Self {
        let error = Object::new(OrdinaryObject::new(ObjectClass::Error));
        error.define_hidden("stack", stack);
        error.define_hidden("message", message);
        error.define_hidden("name", name);
        error
    }

    /// New proxy over `target` driven by `handler`
    pub fn proxy(target: Object, handler: Object) -> Self {
        Object::new(ProxyObject::new(target, handler))
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Object) -> bool {
        self.addr() == other.addr()
    }

    /// Address of the underlying allocation, stable while the object lives
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Create a weak handle
    pub fn downgrade(&self) -> WeakObject {
        WeakObject(Rc::downgrade(&self.0))
    }

    /// Downcast to a concrete behavior
    pub fn downcast_ref<T: ObjectBehavior>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// See [`ObjectBehavior::class`]
    pub fn class(&self) -> ObjectClass {
        self.0.class()
    }

    /// See [`ObjectBehavior::to_string_tag`]
    pub fn to_string_tag(&self) -> Rc<str> {
        self.0.to_string_tag()
    }

    /// Whether the object can be called
    pub fn is_callable(&self) -> bool {
        self.class() == ObjectClass::Function
    }

    /// See [`ObjectBehavior::prototype`]
    pub fn prototype(&self) -> Option<Object> {
        self.0.prototype()
    }

    /// `[[Get]]` with the object itself as receiver
    pub fn get(&self, key: impl Into<PropertyKey>) -> ValueResult<Value> {
        self.0.get(&key.into(), &Value::Object(self.clone()))
    }

    /// `[[Get]]` with an explicit receiver
    pub fn get_with_receiver(&self, key: &PropertyKey, receiver: &Value) -> ValueResult<Value> {
        self.0.get(key, receiver)
    }

    /// See [`ObjectBehavior::get_own_property`]
    pub fn get_own_property(&self, key: &PropertyKey) -> ValueResult<Option<PropertyDescriptor>> {
        self.0.get_own_property(key)
    }

    /// See [`ObjectBehavior::own_keys`]
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        self.0.own_keys()
    }

    /// See [`ObjectBehavior::define_own_property`]
    pub fn define_own_property(
        &self,
        key: impl Into<PropertyKey>,
        descriptor: PropertyDescriptor,
    ) -> ValueResult<bool> {
        self.0.define_own_property(key.into(), descriptor)
    }

    /// `[[Set]]` with the object itself as receiver
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> ValueResult<bool> {
        self.0
            .set(key.into(), value.into(), &Value::Object(self.clone()))
    }

    /// Define an enumerable data property, returning whether it was accepted
    pub fn put(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> bool {
        self.define_own_property(key, PropertyDescriptor::data(value))
            .unwrap_or(false)
    }

    /// Define a non-enumerable data property
    pub fn define_hidden(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> bool {
        self.define_own_property(key, PropertyDescriptor::hidden(value))
            .unwrap_or(false)
    }

    /// Define an accessor property
    pub fn define_accessor(
        &self,
        key: impl Into<PropertyKey>,
        get: Option<Object>,
        set: Option<Object>,
    ) -> bool {
        let descriptor =
            PropertyDescriptor::accessor(get.map(Value::Object), set.map(Value::Object));
        self.define_own_property(key, descriptor).unwrap_or(false)
    }

    /// `[[Call]]`
    pub fn call(&self, this: &Value, args: &[Value]) -> ValueResult<Value> {
        self.0.call(this, args)
    }

    /// See [`ObjectBehavior::function_name`]
    pub fn function_name(&self) -> Option<Rc<str>> {
        self.0.function_name()
    }

    /// See [`ObjectBehavior::proxy_details`]
    pub fn proxy_details(&self) -> Option<ProxyDetails> {
        self.0.proxy_details()
    }

    /// Getter found for `key` along the prototype chain, honoring shadowing
    /// by data properties
    pub fn lookup_getter(&self, key: &PropertyKey) -> Option<Value> {
        match self.lookup_accessor(key)? {
            PropertySlot::Accessor { get, .. } => get,
            PropertySlot::Data { .. } => None,
        }
    }

    /// Setter found for `key` along the prototype chain, honoring shadowing
    /// by data properties
    pub fn lookup_setter(&self, key: &PropertyKey) -> Option<Value> {
        match self.lookup_accessor(key)? {
            PropertySlot::Accessor { set, .. } => set,
            PropertySlot::Data { .. } => None,
        }
    }

    fn lookup_accessor(&self, key: &PropertyKey) -> Option<PropertySlot> {
        let mut current = Some(self.clone());
        while let Some(object) = current {
            match object.get_own_property(key) {
                Ok(Some(descriptor)) => return Some(descriptor.slot),
                Ok(None) => current = object.prototype(),
                Err(_) => return None,
            }
        }
        None
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {}]@{:#x}", self.to_string_tag(), self.addr())
    }
}

impl WeakObject {
    /// Recover a strong handle if the object is still alive
    pub fn upgrade(&self) -> Option<Object> {
        self.0.upgrade().map(Object)
    }

    /// Whether the object is still alive
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Whether this handle refers to `object`
    pub fn refers_to(&self, object: &Object) -> bool {
        self.0.as_ptr() as *const () as usize == object.addr()
    }
}

struct FunctionData {
    name: Rc<str>,
    body: NativeFn,
}

/// Plain objects, arrays, functions and errors
pub struct OrdinaryObject {
    class: ObjectClass,
    tag: Option<Rc<str>>,
    prototype: RefCell<Option<Object>>,
    properties: RefCell<IndexMap<PropertyKey, PropertyDescriptor>>,
    function: Option<FunctionData>,
}

impl OrdinaryObject {
    /// Create an empty object of the given class
    pub fn new(class: ObjectClass) -> Self {
        Self {
            class,
            tag: None,
            prototype: RefCell::new(None),
            properties: RefCell::new(IndexMap::new()),
            function: None,
        }
    }

    /// Override the reported string tag
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(Rc::from(tag));
        self
    }

    /// Set the prototype
    pub fn with_prototype(self, proto: Object) -> Self {
        *self.prototype.borrow_mut() = Some(proto);
        self
    }

    fn with_body(mut self, name: &str, body: NativeFn) -> Self {
        self.function = Some(FunctionData {
            name: Rc::from(name),
            body,
        });
        self
    }

    /// Replace the prototype
    pub fn set_prototype(&self, proto: Option<Object>) {
        *self.prototype.borrow_mut() = proto;
    }
}

impl ObjectBehavior for OrdinaryObject {
    fn class(&self) -> ObjectClass {
        self.class
    }

    fn to_string_tag(&self) -> Rc<str> {
        if let Some(tag) = &self.tag {
            return tag.clone();
        }
        Rc::from(match self.class {
            ObjectClass::Object => "Object",
            ObjectClass::Array => "Array",
            ObjectClass::Function => "Function",
            ObjectClass::Error => "Error",
            ObjectClass::Namespace => "Module",
        })
    }

    fn get_own_property(&self, key: &PropertyKey) -> ValueResult<Option<PropertyDescriptor>> {
        Ok(self.properties.borrow().get(key).cloned())
    }

    fn own_keys(&self) -> Vec<PropertyKey> {
        let properties = self.properties.borrow();
        let strings = properties
            .keys()
            .filter(|k| matches!(k, PropertyKey::String(_)));
        let symbols = properties
            .keys()
            .filter(|k| matches!(k, PropertyKey::Symbol(_)));
        strings.chain(symbols).cloned().collect()
    }

    fn prototype(&self) -> Option<Object> {
        self.prototype.borrow().clone()
    }

    fn define_own_property(
        &self,
        key: PropertyKey,
        descriptor: PropertyDescriptor,
    ) -> ValueResult<bool> {
        let mut properties = self.properties.borrow_mut();
        if let Some(existing) = properties.get(&key) {
            if !existing.configurable && !existing.is_writable() {
                return Ok(false);
            }
        }
        properties.insert(key, descriptor);
        Ok(true)
    }

    fn call(&self, this: &Value, args: &[Value]) -> ValueResult<Value> {
        match &self.function {
            Some(function) => (function.body)(this, args),
            None => Err(Exception::TypeError("object is not a function".to_string())),
        }
    }

    fn function_name(&self) -> Option<Rc<str>> {
        self.function.as_ref().map(|f| f.name.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let object = Object::plain();
        assert!(object.put("a", 1));
        assert_eq!(object.get("a").unwrap().as_number(), Some(1.0));
        assert!(object.get("missing").unwrap().is_undefined());
    }

    #[test]
    fn test_prototype_lookup() {
        let proto = Object::from_entries([("inherited", "yes")]);
        let object = Object::with_prototype(proto);
        assert_eq!(object.get("inherited").unwrap().as_str(), Some("yes"));
        assert!(object.own_keys().is_empty());
    }

    #[test]
    fn test_own_keys_order_strings_before_symbols() {
        let object = Object::plain();
        let sym = crate::Symbol::new("s");
        object.put(sym.clone(), 1);
        object.put("b", 2);
        object.put("a", 3);
        let keys = object.own_keys();
        assert_eq!(
            keys,
            vec![
                PropertyKey::from("b"),
                PropertyKey::from("a"),
                PropertyKey::Symbol(sym)
            ]
        );
    }

    #[test]
    fn test_array_length() {
        let array = Object::array([Value::from(1), Value::from(2)]);
        assert_eq!(array.class(), ObjectClass::Array);
        assert_eq!(array.get("length").unwrap().as_number(), Some(2.0));
        assert_eq!(array.get(1usize).unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn test_function_call_and_name() {
        let f = Object::function("double", |_, args| {
            let n = args.first().and_then(Value::as_number).unwrap_or(0.0);
            Ok(Value::from(n * 2.0))
        });
        assert!(f.is_callable());
        assert_eq!(f.function_name().as_deref(), Some("double"));
        let result = f.call(&Value::Undefined, &[Value::from(21)]).unwrap();
        assert_eq!(result.as_number(), Some(42.0));
    }

    #[test]
    fn test_calling_plain_object_fails() {
        let err = Object::plain().call(&Value::Undefined, &[]).unwrap_err();
        assert!(matches!(err, Exception::TypeError(_)));
    }

    #[test]
    fn test_accessor_runs_with_receiver() {
        let object = Object::plain();
        object.put("x", 5);
        let getter = Object::function("get", |this, _| match this {
            Value::Object(o) => o.get("x"),
            _ => Ok(Value::Undefined),
        });
        object.define_accessor("y", Some(getter), None);
        assert_eq!(object.get("y").unwrap().as_number(), Some(5.0));
    }

    #[test]
    fn test_lookup_getter_respects_shadowing() {
        let proto = Object::plain();
        let getter = Object::function("get", |_, _| Ok(Value::Undefined));
        proto.define_accessor("a", Some(getter), None);
        let object = Object::with_prototype(proto.clone());
        assert!(object.lookup_getter(&PropertyKey::from("a")).is_some());
        object.put("a", 1);
        assert!(object.lookup_getter(&PropertyKey::from("a")).is_none());
    }

    #[test]
    fn test_frozen_property_rejects_redefinition() {
        let object = Object::plain();
        object
            .define_own_property("k", PropertyDescriptor::frozen(1))
            .unwrap();
        assert!(!object.put("k", 2));
        assert!(!object.set("k", 2).unwrap());
        assert_eq!(object.get("k").unwrap().as_number(), Some(1.0));
    }

    #[test]
    fn test_weak_handles() {
        let object = Object::plain();
        let weak = object.downgrade();
        assert!(weak.refers_to(&object));
        assert!(weak.upgrade().is_some());
        drop(object);
        assert!(!weak.is_alive());
    }
}
