//! Proxy Object Support
//!
//! A proxy forwards every operation to its target, except property reads
//! when the handler defines a `get` trap. The trap is called as
//! `get(target, propertyKey, receiver)`.

use std::any::Any;
use std::rc::Rc;

use crate::object::{Object, ObjectBehavior, ObjectClass};
use crate::property::{PropertyDescriptor, PropertyKey};
use crate::value::Value;
use crate::ValueResult;

/// Target and handler of a proxy
#[derive(Debug, Clone)]
pub struct ProxyDetails {
    /// The underlying target object
    pub target: Object,
    /// The handler object with trap methods
    pub handler: Object,
}

/// Foreign proxy object
pub struct ProxyObject {
    target: Object,
    handler: Object,
}

impl ProxyObject {
    /// Create a proxy over `target`
    pub fn new(target: Object, handler: Object) -> Self {
        Self { target, handler }
    }

    /// The proxied object
    pub fn target(&self) -> &Object {
        &self.target
    }

    /// The trap table
    pub fn handler(&self) -> &Object {
        &self.handler
    }
}

impl ObjectBehavior for ProxyObject {
    fn class(&self) -> ObjectClass {
        self.target.class()
    }

    fn to_string_tag(&self) -> Rc<str> {
        self.target.to_string_tag()
    }

    fn get_own_property(&self, key: &PropertyKey) -> ValueResult<Option<PropertyDescriptor>> {
        self.target.get_own_property(key)
    }

    fn own_keys(&self) -> Vec<PropertyKey> {
        self.target.own_keys()
    }

    fn prototype(&self) -> Option<Object> {
        self.target.prototype()
    }

    fn get(&self, key: &PropertyKey, receiver: &Value) -> ValueResult<Value> {
        match self.handler.get("get")? {
            Value::Object(trap) if trap.is_callable() => trap.call(
                &Value::Object(self.handler.clone()),
                &[
                    Value::Object(self.target.clone()),
                    key.to_value(),
                    receiver.clone(),
                ],
            ),
            _ => self.target.get_with_receiver(key, receiver),
        }
    }

    fn define_own_property(
        &self,
        key: PropertyKey,
        descriptor: PropertyDescriptor,
    ) -> ValueResult<bool> {
        self.target.define_own_property(key, descriptor)
    }

    fn call(&self, this: &Value, args: &[Value]) -> ValueResult<Value> {
        self.target.call(this, args)
    }

    fn function_name(&self) -> Option<Rc<str>> {
        self.target.function_name()
    }

    fn proxy_details(&self) -> Option<ProxyDetails> {
        Some(ProxyDetails {
            target: self.target.clone(),
            handler: self.handler.clone(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwards_without_trap() {
        let target = Object::from_entries([("x", 1)]);
        let proxy = Object::proxy(target.clone(), Object::plain());
        assert_eq!(proxy.get("x").unwrap().as_number(), Some(1.0));
        assert_eq!(proxy.own_keys(), target.own_keys());
        assert_eq!(proxy.class(), ObjectClass::Object);
    }

    #[test]
    fn test_get_trap_intercepts_reads() {
        let handler = Object::plain();
        handler.put(
            "get",
            Object::function("get", |_, args| {
                let key = args.get(1).and_then(Value::as_str).unwrap_or("");
                Ok(Value::from(format!("trapped {}", key)))
            }),
        );
        let proxy = Object::proxy(Object::plain(), handler);
        assert_eq!(proxy.get("y").unwrap().as_str(), Some("trapped y"));
    }

    #[test]
    fn test_details_expose_target_and_handler() {
        let target = Object::plain();
        let handler = Object::plain();
        let proxy = Object::proxy(target.clone(), handler.clone());
        let details = proxy.proxy_details().unwrap();
        assert!(details.target.ptr_eq(&target));
        assert!(details.handler.ptr_eq(&handler));
        assert!(target.proxy_details().is_none());
    }
}
