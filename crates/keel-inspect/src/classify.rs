//! Value classification used by the inspector

use keel_shared::SharedState;
use keel_value::{ModuleNamespace, Object, ObjectClass, PropertyKey};

/// A real module namespace object
pub fn is_namespace(object: &Object) -> bool {
    object.downcast_ref::<ModuleNamespace>().is_some()
}

/// A module namespace or a namespace-shaped stand-in
pub fn is_namespace_like(object: &Object, shared: &SharedState) -> bool {
    if is_namespace(object) || &*object.to_string_tag() == "Module" {
        return true;
    }
    let marker = PropertyKey::Symbol(shared.symbols.namespace.clone());
    matches!(object.get_own_property(&marker), Ok(Some(_)))
}

/// Objects whose formatting may need the protective view: functions,
/// arrays, plain objects and namespace-like objects
pub fn is_wrappable(object: &Object, shared: &SharedState) -> bool {
    match object.class() {
        ObjectClass::Function | ObjectClass::Array => true,
        ObjectClass::Object if &*object.to_string_tag() == "Object" => true,
        _ => is_namespace_like(object, shared),
    }
}

/// Whether a substitute may be reported for `key` without contradicting
/// the object's own property (absent, configurable or writable)
pub fn is_updatable_get(object: &Object, key: &PropertyKey) -> bool {
    match object.get_own_property(key) {
        Ok(None) | Err(_) => true,
        Ok(Some(descriptor)) => descriptor.configurable || descriptor.is_writable(),
    }
}
