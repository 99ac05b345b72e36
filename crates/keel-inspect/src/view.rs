//! The protective view handed to the formatter
//!
//! An [`InspectView`] decorates one target object. Reads go through the
//! target, except that the formatter's lookups of the custom-inspect key are
//! answered with a one-shot callback which renders the target on the
//! inspector's terms (namespaces binding by binding, proxies through
//! stand-ins). Nested objects reached through own-property descriptors are
//! wrapped in views of their own.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use keel_value::{
    Depth, InspectOptions, Object, ObjectBehavior, ObjectClass, PropertyDescriptor, PropertyKey,
    PropertySlot, Value, ValueResult, WeakObject,
};

use crate::classify::{is_namespace, is_updatable_get};
use crate::inspector::Inspector;

/// Decorator over a wrappable object
pub struct InspectView {
    me: WeakObject,
    target: Object,
    inspector: Inspector,
    options: InspectOptions,
    custom_inspect: bool,
    show_proxy: bool,
    inspecting: Rc<Cell<bool>>,
}

impl InspectView {
    pub(crate) fn wrap(
        inspector: Inspector,
        target: Object,
        options: InspectOptions,
        custom_inspect: bool,
        show_proxy: bool,
    ) -> Object {
        Object::new_cyclic(|me| InspectView {
            me,
            target,
            inspector,
            options,
            custom_inspect,
            show_proxy,
            inspecting: Rc::new(Cell::new(false)),
        })
    }

    /// The decorated object
    pub fn target(&self) -> &Object {
        &self.target
    }

    /// Whether this view's inspection callback is running
    pub fn is_inspecting(&self) -> bool {
        self.inspecting.get()
    }

    fn nested(&self, object: Object) -> Object {
        Self::wrap(
            self.inspector.clone(),
            object,
            self.options.clone(),
            self.custom_inspect,
            self.show_proxy,
        )
    }

    fn callback(&self, own_inspector: Value) -> Object {
        let shot = OneShot {
            view: self.me.clone(),
            target: self.target.clone(),
            own_inspector,
            inspector: self.inspector.clone(),
            custom_inspect: self.custom_inspect,
            show_proxy: self.show_proxy,
            inspecting: self.inspecting.clone(),
        };
        Object::function("", move |_this, args| shot.call(args))
    }

    fn bound_to_string(&self, function: Object) -> Object {
        let receiver = Value::Object(self.target.clone());
        Object::function("bound toString", move |_this, args| {
            function.call(&receiver, args)
        })
    }

    fn unwrap_receiver(&self, value: &Value) -> Value {
        match value {
            Value::Object(object) if self.me.refers_to(object) => Value::Object(self.target.clone()),
            other => other.clone(),
        }
    }
}

impl ObjectBehavior for InspectView {
    fn class(&self) -> ObjectClass {
        self.target.class()
    }

    fn to_string_tag(&self) -> Rc<str> {
        self.target.to_string_tag()
    }

    fn get_own_property(&self, key: &PropertyKey) -> ValueResult<Option<PropertyDescriptor>> {
        let Some(mut descriptor) = self.target.get_own_property(key)? else {
            return Ok(None);
        };
        if descriptor.is_updatable() {
            if let PropertySlot::Data {
                value: Value::Object(object),
                ..
            } = &mut descriptor.slot
            {
                *object = self.nested(object.clone());
            }
        }
        Ok(Some(descriptor))
    }

    fn own_keys(&self) -> Vec<PropertyKey> {
        self.target.own_keys()
    }

    fn prototype(&self) -> Option<Object> {
        self.target.prototype()
    }

    fn get(&self, key: &PropertyKey, receiver: &Value) -> ValueResult<Value> {
        let receiver = self.unwrap_receiver(receiver);
        let value = self.target.get_with_receiver(key, &receiver)?;
        let shared = self.inspector.shared();
        let custom_key = shared.custom_inspect_key();

        let substitute = if *key == custom_key || key.as_str() == Some("inspect") {
            if shared.module.is_util_inspect(&value) {
                Some(self.inspector.formatter().function())
            } else if !self.inspecting.get() && *key == custom_key {
                Some(Value::Object(self.callback(value.clone())))
            } else {
                None
            }
        } else if key.as_str() == Some("toString") {
            match &value {
                Value::Object(function) if function.is_callable() => {
                    Some(Value::Object(self.bound_to_string(function.clone())))
                }
                _ => None,
            }
        } else {
            None
        };

        match substitute {
            Some(substitute) if is_updatable_get(&self.target, key) => Ok(substitute),
            _ => Ok(self.inspector.prepare(value)),
        }
    }

    fn define_own_property(
        &self,
        key: PropertyKey,
        descriptor: PropertyDescriptor,
    ) -> ValueResult<bool> {
        self.target.define_own_property(key, descriptor)
    }

    fn set(&self, key: PropertyKey, value: Value, _receiver: &Value) -> ValueResult<bool> {
        self.target.set(key, value)
    }

    fn call(&self, this: &Value, args: &[Value]) -> ValueResult<Value> {
        self.target.call(&self.unwrap_receiver(this), args)
    }

    fn function_name(&self) -> Option<Rc<str>> {
        self.target.function_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Sets a reentrancy flag for the lifetime of the guard
struct Reentered<'a>(&'a Cell<bool>);

impl<'a> Reentered<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Reentered(flag)
    }
}

impl Drop for Reentered<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// The callback a view answers custom-inspect lookups with
struct OneShot {
    view: WeakObject,
    target: Object,
    /// What the target itself holds under the custom-inspect key
    own_inspector: Value,
    inspector: Inspector,
    custom_inspect: bool,
    show_proxy: bool,
    inspecting: Rc<Cell<bool>>,
}

impl OneShot {
    fn call(&self, args: &[Value]) -> ValueResult<Value> {
        let _reentered = Reentered::enter(&self.inspecting);

        let mut options = args
            .get(1)
            .map(InspectOptions::from_value)
            .unwrap_or_default();
        options.custom_inspect = Some(self.custom_inspect);
        options.show_proxy = Some(self.show_proxy);
        if let Some(depth) = args.first().and_then(Depth::from_value) {
            options.depth = Some(depth);
        }

        if self.target.ptr_eq(self.inspector.uninitialized()) {
            return self.inspector.render_uninitialized(args);
        }

        let Some(_active) = self.inspector.enter(&self.target) else {
            let colors = options.colors.unwrap_or(false);
            return Ok(Value::from(self.inspector.paint("[Circular]", "special", colors)));
        };

        if is_namespace(&self.target) {
            return self
                .inspector
                .format_namespace(&self.target, options)
                .map(Value::from);
        }

        let details = if self.show_proxy && !self.inspector.is_view(&self.target) {
            self.inspector.proxy_details(&self.target)
        } else {
            None
        };

        let rendered = match details {
            Some(details) => self.inspector.format_proxy(details, options)?,
            None => {
                if !self.own_inspector.is_callable() {
                    options.custom_inspect = Some(true);
                }
                options.show_proxy = Some(false);
                let view = self.view.upgrade().unwrap_or_else(|| self.target.clone());
                self.inspector
                    .formatter()
                    .format(&Value::Object(view), &options)?
            }
        };
        Ok(Value::from(rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_shared::{BasicHost, SharedState, VersionedKey};
    use keel_value::Exception;

    fn inspector() -> Inspector {
        let shared = SharedState::new(VersionedKey::new("keel", "0.0.0"), BasicHost::new());
        Inspector::new(shared)
    }

    fn view_of(inspector: &Inspector, target: &Object) -> Object {
        inspector.wrap(target, InspectOptions::default(), true, false)
    }

    #[test]
    fn test_view_reports_target_shape() {
        let inspector = inspector();
        let target = Object::array([Value::from(1)]);
        let view = view_of(&inspector, &target);
        assert_eq!(view.class(), ObjectClass::Array);
        assert_eq!(&*view.to_string_tag(), "Array");
        assert_eq!(view.own_keys(), target.own_keys());
        assert!(view.proxy_details().is_none());
    }

    #[test]
    fn test_custom_key_yields_callback_until_inspecting() {
        let inspector = inspector();
        let target = Object::from_entries([("a", 1)]);
        let view = view_of(&inspector, &target);
        let key = inspector.shared().custom_inspect_key();
        let callback = view.get(key.clone()).unwrap();
        assert!(callback.is_callable());

        let inner = view.downcast_ref::<InspectView>().unwrap();
        inner.inspecting.set(true);
        assert!(view.get(key).unwrap().is_undefined());
        inner.inspecting.set(false);
    }

    #[test]
    fn test_frozen_custom_key_is_not_substituted() {
        let inspector = inspector();
        let key = inspector.shared().custom_inspect_key();
        let own = Object::function("own", |_, _| Ok(Value::from("own")));
        let target = Object::plain();
        target
            .define_own_property(key.clone(), PropertyDescriptor::frozen(own.clone()))
            .unwrap();
        let view = view_of(&inspector, &target);
        let read = view.get(key).unwrap();
        assert!(read.same_value(&Value::Object(own)));
    }

    #[test]
    fn test_nested_descriptors_are_wrapped() {
        let inspector = inspector();
        let inner = Object::from_entries([("b", 1)]);
        let target = Object::from_entries([("a", inner.clone())]);
        let view = view_of(&inspector, &target);
        let descriptor = view
            .get_own_property(&PropertyKey::from("a"))
            .unwrap()
            .unwrap();
        let Some(Value::Object(nested)) = descriptor.value() else {
            panic!("expected an object value");
        };
        let nested = nested.downcast_ref::<InspectView>().unwrap();
        assert!(nested.target().ptr_eq(&inner));
    }

    #[test]
    fn test_frozen_nested_values_are_left_alone() {
        let inspector = inspector();
        let inner = Object::plain();
        let target = Object::plain();
        target
            .define_own_property("a", PropertyDescriptor::frozen(inner.clone()))
            .unwrap();
        let view = view_of(&inspector, &target);
        let descriptor = view
            .get_own_property(&PropertyKey::from("a"))
            .unwrap()
            .unwrap();
        assert!(descriptor
            .value()
            .unwrap()
            .same_value(&Value::Object(inner)));
    }

    #[test]
    fn test_flag_cleared_after_failed_callback() {
        let inspector = inspector();
        let key = inspector.shared().custom_inspect_key();
        let thrower = Object::plain();
        thrower.define_hidden(
            key.clone(),
            Object::function("boom", |_, _| {
                Err(Exception::TypeError("boom".to_string()))
            }),
        );
        let target = Object::from_entries([("bad", thrower)]);
        let view = view_of(&inspector, &target);
        let Value::Object(callback) = view.get(key).unwrap() else {
            panic!("expected a callback");
        };
        let err = callback
            .call(&Value::Object(view.clone()), &[Value::from(2)])
            .unwrap_err();
        assert!(matches!(err, Exception::TypeError(_)));
        assert!(!view.downcast_ref::<InspectView>().unwrap().is_inspecting());
    }
}
