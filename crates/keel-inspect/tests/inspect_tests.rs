//! Integration tests for the inspector
//!
//! Covers namespaces with uninitialized bindings, foreign proxies, values
//! that must render exactly like the plain formatter, and recovery after
//! failures inside nested inspection.

use std::rc::Rc;

use keel_inspect::{InspectView, Inspector, OptionsArg};
use keel_shared::{BasicHost, KeelConfig, SharedState, VersionedKey};
use keel_value::{
    BasicFormatter, Depth, Exception, Formatter, InspectOptions, ModuleNamespace, Object, Value,
};

fn shared() -> Rc<SharedState> {
    SharedState::new(VersionedKey::new("keel", "0.0.0"), BasicHost::new())
}

fn inspector() -> Inspector {
    Inspector::new(shared())
}

fn partial_namespace() -> Object {
    ModuleNamespace::new()
        .export("a", 1)
        .uninitialized("b")
        .into_object()
}

fn inspect(inspector: &Inspector, value: impl Into<Value>) -> String {
    inspector
        .inspect(&value.into(), OptionsArg::Absent, None)
        .unwrap()
}

#[test]
fn test_namespace_with_uninitialized_binding() {
    let inspector = inspector();
    assert_eq!(
        inspect(&inspector, partial_namespace()),
        "[Module] { a: 1, b: <uninitialized> }"
    );
}

#[test]
fn test_empty_namespace() {
    let inspector = inspector();
    let namespace = ModuleNamespace::new().into_object();
    assert_eq!(inspect(&inspector, namespace), "[Module] {}");
}

#[test]
fn test_namespace_nested_in_object() {
    let inspector = inspector();
    let holder = Object::from_entries([("ns", partial_namespace())]);
    assert_eq!(
        inspect(&inspector, holder),
        "{ ns: [Module] { a: 1, b: <uninitialized> } }"
    );
}

#[test]
fn test_namespace_binding_initialized_later() {
    let inspector = inspector();
    let namespace = ModuleNamespace::new().uninitialized("b");
    let binding = namespace.binding("b").unwrap();
    let namespace = namespace.into_object();
    assert_eq!(
        inspect(&inspector, namespace.clone()),
        "[Module] { b: <uninitialized> }"
    );

    binding.initialize("ready");
    assert_eq!(inspect(&inspector, namespace), "[Module] { b: 'ready' }");
}

#[test]
fn test_colored_namespace() {
    let inspector = inspector();
    let out = inspector
        .inspect(
            &Value::from(partial_namespace()),
            InspectOptions::default().colors(true),
            None,
        )
        .unwrap();
    assert_eq!(
        out,
        "[Module] { a: \u{1b}[33m1\u{1b}[39m, b: \u{1b}[36m<uninitialized>\u{1b}[39m }"
    );
}

#[test]
fn test_foreign_proxy_display() {
    let inspector = inspector();
    let proxy = Object::proxy(Object::from_entries([("x", 1)]), Object::plain());
    let out = inspector
        .inspect(
            &Value::from(proxy),
            InspectOptions::default().show_proxy(true),
            None,
        )
        .unwrap();
    assert_eq!(out, "Proxy [ { x: 1 }, {} ]");
}

#[test]
fn test_proxy_without_display() {
    let inspector = inspector();
    let proxy = Object::proxy(Object::from_entries([("x", 1)]), Object::plain());
    assert_eq!(inspect(&inspector, proxy), "{ x: 1 }");
}

#[test]
fn test_proxy_inside_function() {
    let inspector = inspector();
    let function = Object::function("f", |_, _| Ok(Value::Undefined));
    function.put(
        "p",
        Object::proxy(Object::from_entries([("x", 1)]), Object::plain()),
    );
    let out = inspector
        .inspect(
            &Value::from(function),
            InspectOptions::default().show_proxy(true),
            None,
        )
        .unwrap();
    assert_eq!(out, "[Function: f] { p: Proxy [ { x: 1 }, {} ] }");
}

#[test]
fn test_self_referential_proxy_terminates() {
    let inspector = inspector();
    let target = Object::plain();
    let proxy = Object::proxy(target.clone(), Object::plain());
    target.put("p", proxy.clone());

    let options = InspectOptions::default().show_proxy(true);
    let out = inspector
        .inspect(&Value::from(proxy.clone()), options.clone(), None)
        .unwrap();
    assert_eq!(out, "Proxy [ { p: [Circular] }, {} ]");

    let unlimited = options.depth(Depth::Infinite);
    let out = inspector
        .inspect(&Value::from(proxy), unlimited, None)
        .unwrap();
    assert_eq!(out, "Proxy [ { p: [Circular] }, {} ]");
}

fn without_custom_inspect() -> InspectOptions {
    InspectOptions::default()
        .show_proxy(true)
        .custom_inspect(false)
}

fn with_own_inspector(object: &Object, inspector: &Inspector) -> Object {
    let key = inspector.shared().custom_inspect_key();
    object.define_hidden(
        key,
        Object::function("custom", |_, _| Ok(Value::from("CUSTOM"))),
    );
    object.clone()
}

#[test]
fn test_own_inspector_skipped_when_custom_inspect_disabled() {
    let inspector = inspector();
    let object = with_own_inspector(
        &Object::from_entries([(
            "p",
            Object::proxy(Object::from_entries([("x", 1)]), Object::plain()),
        )]),
        &inspector,
    );
    let out = inspector
        .inspect(&Value::from(object), without_custom_inspect(), None)
        .unwrap();
    assert_eq!(out, "{ p: { x: 1 } }");
}

#[test]
fn test_function_keeps_proxy_display_when_custom_inspect_disabled() {
    let inspector = inspector();
    let function = Object::function("f", |_, _| Ok(Value::Undefined));
    function.put(
        "p",
        Object::proxy(Object::from_entries([("x", 1)]), Object::plain()),
    );
    let out = inspector
        .inspect(&Value::from(function), without_custom_inspect(), None)
        .unwrap();
    assert_eq!(out, "[Function: f] { p: Proxy [ { x: 1 }, {} ] }");
}

#[test]
fn test_proxy_pieces_honor_disabled_custom_inspect() {
    let inspector = inspector();
    let target = with_own_inspector(&Object::from_entries([("x", 1)]), &inspector);
    let proxy = Value::from(Object::proxy(target, Object::plain()));

    let direct = inspector
        .formatter()
        .format(&proxy, &without_custom_inspect())
        .unwrap();
    assert_eq!(direct, "Proxy [ { x: 1 }, {} ]");
    let out = inspector
        .inspect(&proxy, without_custom_inspect(), None)
        .unwrap();
    assert_eq!(out, direct);
}

#[test]
fn test_proxy_pieces_use_own_inspector_by_default() {
    let inspector = inspector();
    let target = with_own_inspector(&Object::from_entries([("x", 1)]), &inspector);
    let proxy = Value::from(Object::proxy(target, Object::plain()));
    let out = inspector
        .inspect(&proxy, InspectOptions::default().show_proxy(true), None)
        .unwrap();
    assert_eq!(out, "Proxy [ CUSTOM, {} ]");
}

#[test]
fn test_primitive_matches_formatter() {
    let inspector = inspector();
    let direct = inspector
        .formatter()
        .format(&Value::from(42), &InspectOptions::default())
        .unwrap();
    assert_eq!(direct, "42");
    assert_eq!(inspect(&inspector, 42), direct);
}

#[test]
fn test_unwrapped_values_match_formatter() {
    let inspector = inspector();
    let tagged = Object::tagged("Map");
    tagged.put("k", 1);
    let plain = Object::from_entries([
        ("list", Value::from(Object::array([Value::from(1), Value::from(2)]))),
        ("name", Value::from("keel")),
    ]);

    for value in [Value::from(tagged), Value::from(plain)] {
        let direct = inspector
            .formatter()
            .format(&value, &InspectOptions::default())
            .unwrap();
        let inspected = inspector
            .inspect(&value, OptionsArg::Absent, None)
            .unwrap();
        assert_eq!(inspected, direct);
    }
}

#[test]
fn test_inspection_is_idempotent() {
    let inspector = inspector();
    let holder = Object::from_entries([
        ("ns", Value::from(partial_namespace())),
        (
            "p",
            Value::from(Object::proxy(Object::from_entries([("x", 1)]), Object::plain())),
        ),
    ]);
    let value = Value::from(holder);
    let options = InspectOptions::default().show_proxy(true);
    let first = inspector.inspect(&value, options.clone(), None).unwrap();
    let second = inspector.inspect(&value, options, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_failure_inside_nested_inspection_propagates_and_recovers() {
    let inspector = inspector();
    let key = inspector.shared().custom_inspect_key();
    let thrower = Object::plain();
    thrower.define_hidden(
        key,
        Object::function("boom", |_, _| Err(Exception::TypeError("boom".to_string()))),
    );
    let holder = Value::from(Object::from_entries([("bad", thrower)]));

    for _ in 0..2 {
        let err = inspector
            .inspect(&holder, OptionsArg::Absent, None)
            .unwrap_err();
        assert!(matches!(err, Exception::TypeError(ref message) if message == "boom"));
    }
}

#[test]
fn test_depth_argument_adopted() {
    let inspector = inspector();
    let deep = Value::from(Object::from_entries([(
        "a",
        Object::from_entries([("b", Object::plain())]),
    )]));
    let shallow = inspector
        .inspect(&deep, OptionsArg::Absent, Some(Depth::Limited(0)))
        .unwrap();
    assert_eq!(shallow, "{ a: [Object] }");

    let explicit = inspector
        .inspect(
            &deep,
            InspectOptions::default().depth(Depth::Limited(1)),
            Some(Depth::Limited(0)),
        )
        .unwrap();
    assert_eq!(explicit, "{ a: { b: [Object] } }");
}

#[test]
fn test_show_hidden_flag() {
    let inspector = inspector();
    let object = Object::from_entries([("a", 1)]);
    object.define_hidden("h", 2);
    let value = Value::from(object);
    assert_eq!(
        inspector.inspect(&value, OptionsArg::Absent, None).unwrap(),
        "{ a: 1 }"
    );
    for flag in [true, false] {
        assert_eq!(
            inspector.inspect(&value, flag, None).unwrap(),
            "{ a: 1, [h]: 2 }"
        );
    }
}

#[test]
fn test_installed_function() {
    let inspector = inspector();
    let installed = inspector.install();
    assert!(inspector.shared().module.is_util_inspect(&installed));

    let Value::Object(function) = installed else {
        panic!("expected a function");
    };
    let object = Object::from_entries([("a", 1)]);
    object.define_hidden("h", 2);
    let out = function
        .call(&Value::Undefined, &[Value::from(object), Value::from(true)])
        .unwrap();
    assert_eq!(out.as_str(), Some("{ a: 1, [h]: 2 }"));

    let out = function
        .call(&Value::Undefined, &[Value::from(partial_namespace())])
        .unwrap();
    assert_eq!(out.as_str(), Some("[Module] { a: 1, b: <uninitialized> }"));
}

#[test]
fn test_view_substitutes_formatter_for_installed_function() {
    let inspector = inspector();
    let installed = inspector.install();
    let key = inspector.shared().custom_inspect_key();
    let target = Object::plain();
    target.define_hidden(key.clone(), installed.clone());
    target.define_hidden("inspect", installed);

    let view = inspector.wrap(&target, InspectOptions::default(), true, false);
    let formatter_function = inspector.formatter().function();
    assert!(view.get(key).unwrap().same_value(&formatter_function));
    assert!(view.get("inspect").unwrap().same_value(&formatter_function));
}

#[test]
fn test_to_string_bound_to_target() {
    let inspector = inspector();
    let target = Object::plain();
    let probe = target.downgrade();
    target.define_hidden(
        "toString",
        Object::function("toString", move |this, _| {
            Ok(Value::from(
                this.as_object().is_some_and(|object| probe.refers_to(object)),
            ))
        }),
    );

    let view = inspector.wrap(&target, InspectOptions::default(), true, false);
    assert!(view.downcast_ref::<InspectView>().is_some());
    let Value::Object(to_string) = view.get("toString").unwrap() else {
        panic!("expected a function");
    };
    assert_eq!(to_string.function_name().as_deref(), Some("bound toString"));
    let result = to_string.call(&Value::from(view.clone()), &[]).unwrap();
    assert_eq!(result.as_bool(), Some(true));
}

#[test]
fn test_error_stack_masked_before_formatting() {
    let inspector = inspector();
    let error = Object::error_with_stack(
        "Error",
        "boom",
        "Error: boom\n    at wrap (/app/node_modules/keel/index.js:9:1)\n    at main (/app/main.js:3:5)",
    );
    let out = inspect(&inspector, error.clone());
    assert_eq!(out, "Error: boom\n    at main (/app/main.js:3:5)");
    assert!(inspector.shared().memoize.masked_stacks.contains(&error));
}

#[test]
fn test_configured_internal_markers() {
    let config =
        KeelConfig::from_toml_str("[mask]\ninternal-markers = [\"/vendor/\"]\n").unwrap();
    let shared = SharedState::new(config.versioned_key(), BasicHost::from_config(&config));
    let inspector = Inspector::from_config(shared, &config);
    let error = Object::error_with_stack(
        "Error",
        "x",
        "Error: x\n    at /app/vendor/lib.js:1:1\n    at /app/main.js:1:1",
    );
    assert_eq!(inspect(&inspector, error), "Error: x\n    at /app/main.js:1:1");
}

#[test]
fn test_legacy_custom_inspect_key() {
    let host = BasicHost::builder()
        .formatter(BasicFormatter::legacy())
        .build();
    let shared = SharedState::new(VersionedKey::new("keel", "0.0.0"), host);
    let inspector = Inspector::new(shared);
    assert_eq!(
        inspector.shared().custom_inspect_key().as_str(),
        Some("inspect")
    );
    assert_eq!(
        inspect(&inspector, partial_namespace()),
        "[Module] { a: 1, b: <uninitialized> }"
    );
}

#[test]
fn test_stylize_uses_formatter_styles() {
    let inspector = inspector();
    assert_eq!(
        inspector.stylize("<uninitialized>", "special"),
        "\u{1b}[36m<uninitialized>\u{1b}[39m"
    );
    assert_eq!(inspector.stylize("x", "unknown"), "x");
}
