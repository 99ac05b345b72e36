use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keel_inspect::{Inspector, OptionsArg};
use keel_shared::{BasicHost, SharedState, VersionedKey};
use keel_value::{InspectOptions, ModuleNamespace, Object, Value};

fn inspector() -> Inspector {
    let shared = SharedState::new(VersionedKey::new("keel", "0.0.0"), BasicHost::new());
    Inspector::new(shared)
}

fn bench_fast_path(c: &mut Criterion) {
    let inspector = inspector();
    let mut group = c.benchmark_group("fast_path");

    let number = Value::from(42);
    group.bench_with_input(BenchmarkId::new("primitive", "42"), &number, |b, value| {
        b.iter(|| inspector.inspect(black_box(value), OptionsArg::Absent, None).unwrap());
    });

    let plain = Value::from(Object::from_entries([
        ("a", Value::from(1)),
        ("b", Value::from("two")),
        ("c", Value::from(Object::array([Value::from(3), Value::from(4)]))),
    ]));
    group.bench_with_input(BenchmarkId::new("plain", "3 keys"), &plain, |b, value| {
        b.iter(|| inspector.inspect(black_box(value), OptionsArg::Absent, None).unwrap());
    });

    group.finish();
}

fn bench_wrapped(c: &mut Criterion) {
    let inspector = inspector();
    let mut group = c.benchmark_group("wrapped");

    let namespace = Value::from(
        ModuleNamespace::new()
            .export("a", 1)
            .export("b", "two")
            .uninitialized("c")
            .into_object(),
    );
    group.bench_with_input(BenchmarkId::new("namespace", "3 bindings"), &namespace, |b, value| {
        b.iter(|| inspector.inspect(black_box(value), OptionsArg::Absent, None).unwrap());
    });

    let proxy = Value::from(Object::proxy(
        Object::from_entries([("x", 1)]),
        Object::plain(),
    ));
    let show_proxy = InspectOptions::default().show_proxy(true);
    group.bench_with_input(BenchmarkId::new("proxy", "show_proxy"), &proxy, |b, value| {
        b.iter(|| {
            inspector
                .inspect(black_box(value), show_proxy.clone(), None)
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fast_path, bench_wrapped);
criterion_main!(benches);
