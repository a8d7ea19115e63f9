//! Benchmarks for digest convergence cost.
//!
//! Run with: cargo bench -p watchloop --bench digest_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use watchloop::{Equality, Scope, Value};

/// A scope with `n` independent watchers, already settled by one digest.
fn settled_scope(n: usize) -> Scope<Vec<f64>> {
    let (scope, _scheduler) = Scope::with_manual_scheduler((0..n).map(|i| i as f64).collect());
    for i in 0..n {
        scope.watch(
            move |scope: &Scope<Vec<f64>>| scope.with(|v| Value::from(v[i])),
            |_, _, _| {},
        );
    }
    scope.digest().expect("settling digest converges");
    scope
}

fn bench_clean_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest/clean");

    for n in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(n as u64));
        let scope = settled_scope(n);
        group.bench_with_input(BenchmarkId::new("watchers", n), &(), |b, _| {
            b.iter(|| black_box(scope.digest()))
        });
    }

    group.finish();
}

fn bench_single_dirty_watcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest/one_dirty");

    for n in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(n as u64));
        let scope = settled_scope(n);
        group.bench_with_input(BenchmarkId::new("watchers", n), &(), |b, _| {
            b.iter(|| {
                scope.with_mut(|v| v[0] += 1.0);
                black_box(scope.digest())
            })
        });
    }

    group.finish();
}

fn bench_deep_equality_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest/deep_equality");

    for len in [8usize, 64, 512] {
        group.throughput(Throughput::Elements(len as u64));
        let (scope, _scheduler) = Scope::with_manual_scheduler(Value::list(
            (0..len).map(|i| Value::from(i as f64)),
        ));
        scope.watch_with(
            Equality::Deep,
            |scope: &Scope<Value>| scope.with(Value::clone),
            |_, _, _| {},
        );
        scope.digest().expect("settling digest converges");

        group.bench_with_input(BenchmarkId::new("list_len", len), &(), |b, _| {
            b.iter(|| black_box(scope.digest()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_clean_digest,
    bench_single_dirty_watcher,
    bench_deep_equality_digest,
);

criterion_main!(benches);
