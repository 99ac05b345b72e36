//! Property keys and descriptors

use std::fmt;
use std::rc::Rc;

use crate::symbol::Symbol;
use crate::value::Value;
use crate::ValueResult;

/// The key of an object property
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String-named property
    String(Rc<str>),
    /// Symbol-keyed property
    Symbol(Symbol),
}

impl PropertyKey {
    /// Borrow the string name, if this is a string key
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyKey::String(s) => Some(s),
            PropertyKey::Symbol(_) => None,
        }
    }

    /// Array index encoded by this key, if any
    pub fn as_index(&self) -> Option<usize> {
        let s = self.as_str()?;
        if s.len() > 1 && s.starts_with('0') {
            return None;
        }
        s.parse().ok()
    }

    /// Convert the key into a value (string or symbol)
    pub fn to_value(&self) -> Value {
        match self {
            PropertyKey::String(s) => Value::String(s.clone()),
            PropertyKey::Symbol(s) => Value::Symbol(s.clone()),
        }
    }

    /// Convert a value into a key; numbers become their decimal string
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(PropertyKey::String(s.clone())),
            Value::Symbol(s) => Some(PropertyKey::Symbol(s.clone())),
            Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => {
                Some(PropertyKey::from(format!("{}", *n as u64)))
            }
            _ => None,
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(Rc::from(s))
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(Rc::from(s))
    }
}

impl From<usize> for PropertyKey {
    fn from(index: usize) -> Self {
        PropertyKey::String(Rc::from(index.to_string()))
    }
}

impl From<Symbol> for PropertyKey {
    fn from(s: Symbol) -> Self {
        PropertyKey::Symbol(s)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Symbol(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{:?}", s),
            PropertyKey::Symbol(s) => write!(f, "{}", s),
        }
    }
}

/// Storage of a property: a plain value or an accessor pair
#[derive(Debug, Clone)]
pub enum PropertySlot {
    /// Data property
    Data {
        /// Stored value
        value: Value,
        /// Whether assignment may change the value
        writable: bool,
    },
    /// Accessor property
    Accessor {
        /// Getter function
        get: Option<Value>,
        /// Setter function
        set: Option<Value>,
    },
}

/// Full description of an own property
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    /// Value or accessor pair
    pub slot: PropertySlot,
    /// Whether the property shows up during enumeration
    pub enumerable: bool,
    /// Whether the property may be redefined or deleted
    pub configurable: bool,
}

impl PropertyDescriptor {
    /// Writable, enumerable, configurable data property
    pub fn data(value: impl Into<Value>) -> Self {
        Self {
            slot: PropertySlot::Data {
                value: value.into(),
                writable: true,
            },
            enumerable: true,
            configurable: true,
        }
    }

    /// Writable, configurable data property excluded from enumeration
    pub fn hidden(value: impl Into<Value>) -> Self {
        Self {
            enumerable: false,
            ..Self::data(value)
        }
    }

    /// Read-only, non-configurable, non-enumerable data property
    pub fn frozen(value: impl Into<Value>) -> Self {
        Self {
            slot: PropertySlot::Data {
                value: value.into(),
                writable: false,
            },
            enumerable: false,
            configurable: false,
        }
    }

    /// Enumerable, configurable accessor property
    pub fn accessor(get: Option<Value>, set: Option<Value>) -> Self {
        Self {
            slot: PropertySlot::Accessor { get, set },
            enumerable: true,
            configurable: true,
        }
    }

    /// The stored value of a data property
    pub fn value(&self) -> Option<&Value> {
        match &self.slot {
            PropertySlot::Data { value, .. } => Some(value),
            PropertySlot::Accessor { .. } => None,
        }
    }

    /// Whether this is a data property
    pub fn is_data(&self) -> bool {
        matches!(self.slot, PropertySlot::Data { .. })
    }

    /// Whether this is a writable data property
    pub fn is_writable(&self) -> bool {
        matches!(self.slot, PropertySlot::Data { writable: true, .. })
    }

    /// A data property whose value may legitimately be replaced when
    /// reported through a wrapper (configurable or writable)
    pub fn is_updatable(&self) -> bool {
        self.is_data() && (self.configurable || self.is_writable())
    }

    /// Read the property as seen from `receiver`, running the getter if any
    pub fn read(&self, receiver: &Value) -> ValueResult<Value> {
        match &self.slot {
            PropertySlot::Data { value, .. } => Ok(value.clone()),
            PropertySlot::Accessor {
                get: Some(Value::Object(getter)),
                ..
            } => getter.call(receiver, &[]),
            PropertySlot::Accessor { .. } => Ok(Value::Undefined),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_keys() {
        assert_eq!(PropertyKey::from("3").as_index(), Some(3));
        assert_eq!(PropertyKey::from("03").as_index(), None);
        assert_eq!(PropertyKey::from("x").as_index(), None);
        assert_eq!(PropertyKey::from(7usize).as_index(), Some(7));
    }

    #[test]
    fn test_updatable_descriptors() {
        assert!(PropertyDescriptor::data(1).is_updatable());
        assert!(PropertyDescriptor::hidden(1).is_updatable());
        assert!(!PropertyDescriptor::frozen(1).is_updatable());
        assert!(!PropertyDescriptor::accessor(None, None).is_updatable());
    }

    #[test]
    fn test_key_from_value() {
        assert_eq!(
            PropertyKey::from_value(&Value::from(2)),
            Some(PropertyKey::from("2"))
        );
        assert_eq!(PropertyKey::from_value(&Value::Null), None);
    }
}
