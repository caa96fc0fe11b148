//! Benchmarks for trie index lookups.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lexis_core::{BitPackedArray, KeyEncoding, TrieIndex};

fn generate_words(n: usize) -> Vec<String> {
    let stems = ["gat", "perr", "cas", "libr", "mes"];
    let endings = ["o", "a", "os", "as", "ito", "ita"];
    (0..n)
        .map(|i| {
            let stem = stems[i % stems.len()];
            let ending = endings[(i / stems.len()) % endings.len()];
            format!("{stem}{i}{ending}")
        })
        .collect()
}

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("find");

    for size in [1_000, 10_000, 100_000] {
        let words = generate_words(size);
        let index: TrieIndex =
            TrieIndex::build(words.iter().enumerate().map(|(i, w)| (w.as_str(), i as u64)))
                .expect("build");

        group.bench_with_input(BenchmarkId::new("TrieIndex", size), &words, |b, words| {
            b.iter(|| {
                for word in words.iter().step_by(7) {
                    black_box(index.find(word));
                }
            });
        });
    }

    group.finish();
}

fn bench_prefix(c: &mut Criterion) {
    let words = generate_words(50_000);
    let index: TrieIndex =
        TrieIndex::build(words.iter().enumerate().map(|(i, w)| (w.as_str(), i as u64)))
            .expect("build");

    c.bench_function("prefix_gat1", |b| {
        b.iter(|| black_box(index.prefix("gat1").count()));
    });
}

fn bench_encoding_choice(c: &mut Criterion) {
    let words = generate_words(200_000);
    c.bench_function("choose_encoding_sampled", |b| {
        b.iter(|| black_box(KeyEncoding::choose(words.iter().map(String::as_str))));
    });
}

fn bench_bitpack_read(c: &mut Criterion) {
    let values: Vec<u64> = (0..100_000u64).map(|i| i * 37 % 5000).collect();
    let packed = BitPackedArray::from_values(&values).freeze();
    c.bench_function("bitpack_get", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for i in (0..packed.len()).step_by(3) {
                sum += packed.get(i).unwrap_or(0);
            }
            black_box(sum)
        });
    });
}

criterion_group!(
    benches,
    bench_find,
    bench_prefix,
    bench_encoding_choice,
    bench_bitpack_read
);
criterion_main!(benches);
