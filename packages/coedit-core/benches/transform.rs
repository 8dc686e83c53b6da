use criterion::{black_box, criterion_group, criterion_main, Criterion};

use coedit_core::{compose, generate_delta, transform_pair, DiffOptions};

fn paragraph(words: usize, tag: &str) -> String {
    (0..words).map(|i| format!("{tag}{i} ")).collect()
}

fn bench_delta(c: &mut Criterion) {
    let old = paragraph(400, "w");
    let mut new = old.clone();
    new.replace_range(400..600, &paragraph(30, "pasted"));

    c.bench_function("delta/prefix_suffix", |b| {
        let options = DiffOptions {
            myers_threshold: usize::MAX,
            ..DiffOptions::default()
        };
        b.iter(|| coedit_core::generate_delta_with(black_box(&old), black_box(&new), &options))
    });
    c.bench_function("delta/myers", |b| {
        b.iter(|| generate_delta(black_box(&old), black_box(&new)))
    });
}

fn bench_transform(c: &mut Criterion) {
    let base = paragraph(400, "w");
    let left = generate_delta(&base, &format!("start {base}"));
    let right = generate_delta(&base, &format!("{base} end"));
    let follow = generate_delta(&format!("start {base}"), &format!("start {base}!"));

    c.bench_function("transform/pair", |b| {
        b.iter(|| transform_pair(black_box(&left), black_box(&right)).unwrap())
    });
    c.bench_function("compose/two", |b| {
        b.iter(|| compose(black_box(&left), black_box(&follow)).unwrap())
    });
}

criterion_group!(benches, bench_delta, bench_transform);
criterion_main!(benches);
