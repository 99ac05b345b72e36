//! Integration tests for state convergence across load instances

use std::rc::Rc;

use keel_shared::{BasicHost, Host, KeelConfig, LoadInstance, StateRegistry, VersionedKey};

fn host() -> Rc<dyn Host> {
    BasicHost::new()
}

#[test]
fn test_instances_converge_on_one_state() {
    let registry = StateRegistry::new();
    let key = VersionedKey::current();
    let mut instances: Vec<LoadInstance> = (0..4).map(|_| LoadInstance::new(key.clone(), host())).collect();
    let states: Vec<_> = instances.iter_mut().map(|i| i.shared(&registry)).collect();
    assert!(states.windows(2).all(|pair| Rc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(registry.len(), 1);
    assert!(states[0].is_reloaded());
}

#[test]
fn test_first_instance_reactivates_state() {
    let registry = StateRegistry::new();
    let key = VersionedKey::new("keel", "9.9.9");
    let mut first = LoadInstance::new(key.clone(), host());
    let mut second = LoadInstance::new(key, host());

    let state = first.shared(&registry);
    second.shared(&registry);
    assert!(state.is_reloaded());

    first.shared(&registry);
    assert!(state.is_inited());
    assert!(!state.is_reloaded());
}

#[test]
fn test_state_is_shared_not_copied() {
    let registry = StateRegistry::new();
    let key = VersionedKey::new("keel", "1.0.0");
    let mut first = LoadInstance::new(key.clone(), host());
    let mut second = LoadInstance::new(key, host());

    let a = first.shared(&registry);
    assert!(a.satisfies("v20.0.0", ">=10"));
    let b = second.shared(&registry);
    assert_eq!(b.memoize.satisfies.len(), 1);
    assert_eq!(a.runtime_name(), b.runtime_name());
}

#[test]
fn test_first_host_wins() {
    let registry = StateRegistry::new();
    let key = VersionedKey::new("keel", "1.0.0");
    let old: Rc<dyn Host> = BasicHost::builder().version("v6.0.0").build();
    let mut first = LoadInstance::new(key.clone(), old);
    let mut second = LoadInstance::new(key, host());
    first.shared(&registry);
    let state = second.shared(&registry);
    assert_eq!(state.host().version(), "v6.0.0");
    assert!(!state.support.repl_show_proxy());
}

#[test]
fn test_instance_from_config() {
    let config = KeelConfig::from_toml_str(
        r#"
[package]
prefix = "acme"
version = "1.2.3"

[host]
version = "v8.0.0"
"#,
    )
    .unwrap();
    let registry = StateRegistry::new();
    let mut instance = LoadInstance::from_config(&config);
    assert_eq!(instance.key().to_string(), "acme@1.2.3:shared");
    let state = instance.shared(&registry);
    assert_eq!(state.host().version(), "v8.0.0");
    assert_eq!(state.symbols.entry.description(), Some("acme:entry"));
    assert!(registry.lookup(&config.versioned_key()).is_ok());
}
