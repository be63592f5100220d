//! URL normalization and pattern compilation benchmarks.
#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mock_xhr::normalize::normalize_url;
use mock_xhr::pattern::{Matcher, compile};
use mock_xhr::{MemoryStore, MockConfig, MockSystem, Times};
use serde_json::json;

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize_absolute", |b| {
        b.iter(|| normalize_url(black_box("https://api.example.com/v1/users/:id/posts/:post?x=1")));
    });

    c.bench_function("normalize_relative", |b| {
        b.iter(|| normalize_url(black_box("/users/:id/search:?search/")));
    });
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_literal", |b| {
        b.iter(|| compile(black_box("https://api.example.com/v1"), black_box("/health")));
    });

    // Warm: the regex cache serves repeats.
    c.bench_function("compile_tokens_cached", |b| {
        b.iter(|| {
            compile(
                black_box("https://api.example.com/v1"),
                black_box("/users/{{param}}/posts{{search?}}"),
            )
        });
    });
}

fn bench_match(c: &mut Criterion) {
    let Ok(matcher @ Matcher::Regex(_)) = compile("/", "/users/{{param}}/posts{{search?}}") else {
        return;
    };

    c.bench_function("match_token_regex", |b| {
        b.iter(|| matcher.matches(black_box("https://api.example.com/users/ab-12/posts?page=2")));
    });
}

fn bench_load_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_all");

    for size in &[10, 100, 500] {
        let mut system = MockSystem::new(MemoryStore::new(), MockConfig::default());
        for i in 0..*size {
            let times = if i % 3 == 0 {
                Times::Always
            } else {
                Times::Count(i % 7 + 1)
            };
            let _ = system
                .get(format!("/resource/{i}/:id"))
                .times(times)
                .success(Some(json!({"i": i})), None);
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| system.store().load_all());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_normalize,
    bench_compile,
    bench_match,
    bench_load_all,
);

criterion_main!(benches);
