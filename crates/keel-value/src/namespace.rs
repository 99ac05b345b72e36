//! Module namespace objects
//!
//! A namespace exposes a module's exports as live bindings. Until a binding
//! is initialized, reading it raises a `ReferenceError`, and so does asking
//! for its property descriptor. Code that walks a namespace naively (for
//! example to print it) must be prepared for that.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::object::{Object, ObjectBehavior, ObjectClass};
use crate::property::{PropertyDescriptor, PropertyKey, PropertySlot};
use crate::symbol::Symbol;
use crate::value::Value;
use crate::{Exception, ValueResult};

/// Shared slot of a single export binding
#[derive(Clone, Default)]
pub struct BindingCell(Rc<RefCell<Option<Value>>>);

impl BindingCell {
    /// Set the binding's value, ending its uninitialized state
    pub fn initialize(&self, value: impl Into<Value>) {
        *self.0.borrow_mut() = Some(value.into());
    }

    /// Whether the binding holds a value
    pub fn is_initialized(&self) -> bool {
        self.0.borrow().is_some()
    }

    fn read(&self, name: &str) -> ValueResult<Value> {
        self.0.borrow().clone().ok_or_else(|| {
            Exception::ReferenceError(format!("Cannot access '{}' before initialization", name))
        })
    }
}

/// Module namespace exotic object
#[derive(Default)]
pub struct ModuleNamespace {
    bindings: BTreeMap<Rc<str>, BindingCell>,
}

impl ModuleNamespace {
    /// Create a namespace without exports
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an initialized export
    pub fn export(mut self, name: &str, value: impl Into<Value>) -> Self {
        let cell = BindingCell::default();
        cell.initialize(value);
        self.bindings.insert(Rc::from(name), cell);
        self
    }

    /// Add an export whose binding is not initialized yet
    pub fn uninitialized(mut self, name: &str) -> Self {
        self.bindings.insert(Rc::from(name), BindingCell::default());
        self
    }

    /// Handle to an export's binding
    pub fn binding(&self, name: &str) -> Option<BindingCell> {
        self.bindings.get(name).cloned()
    }

    /// Finish building
    pub fn into_object(self) -> Object {
        Object::new(self)
    }
}

impl ObjectBehavior for ModuleNamespace {
    fn class(&self) -> ObjectClass {
        ObjectClass::Namespace
    }

    fn to_string_tag(&self) -> Rc<str> {
        Rc::from("Module")
    }

    fn get_own_property(&self, key: &PropertyKey) -> ValueResult<Option<PropertyDescriptor>> {
        match key {
            PropertyKey::String(name) => match self.bindings.get(name.as_ref()) {
                Some(cell) => Ok(Some(PropertyDescriptor {
                    slot: PropertySlot::Data {
                        value: cell.read(name)?,
                        writable: true,
                    },
                    enumerable: true,
                    configurable: false,
                })),
                None => Ok(None),
            },
            PropertyKey::Symbol(symbol) if *symbol == Symbol::to_string_tag() => {
                Ok(Some(PropertyDescriptor::frozen("Module")))
            }
            PropertyKey::Symbol(_) => Ok(None),
        }
    }

    fn own_keys(&self) -> Vec<PropertyKey> {
        self.bindings
            .keys()
            .map(|name| PropertyKey::String(name.clone()))
            .chain(std::iter::once(PropertyKey::Symbol(Symbol::to_string_tag())))
            .collect()
    }

    fn set(&self, _key: PropertyKey, _value: Value, _receiver: &Value) -> ValueResult<bool> {
        Ok(false)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
