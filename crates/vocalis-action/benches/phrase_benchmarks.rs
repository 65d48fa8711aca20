//! Benchmarks for phrase index construction and lookup.
//!
//! Lookup runs on the recognition path for every utterance, so it should
//! stay flat as the grammar grows.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use vocalis_action::PhraseIndex;
use vocalis_core::{ActionBinding, Grammar};

/// A grammar with `verbs` verbs of `nouns` nouns each.
fn generate_grammar(verbs: usize, nouns: usize) -> Grammar {
    let mut grammar = Grammar::new();
    for v in 0..verbs {
        for n in 0..nouns {
            grammar.bind(
                &format!("Verb{}", v),
                format!("Noun{}", n),
                ActionBinding::new("log"),
            );
        }
    }
    grammar
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("phrase_index_build");
    group.measurement_time(Duration::from_secs(5));

    for size in [10usize, 50, 200] {
        let grammar = generate_grammar(size, 20);
        group.bench_with_input(BenchmarkId::from_parameter(size * 20), &grammar, |b, g| {
            b.iter(|| PhraseIndex::build(g));
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let grammar = generate_grammar(200, 20);
    let index = PhraseIndex::build(&grammar);

    // Spoken forms arrive with arbitrary case and padding.
    let hits: Vec<(String, String)> = (0..1000)
        .map(|i| (format!(" VERB{} ", i % 200), format!("noun{}", i % 20)))
        .collect();

    let mut group = c.benchmark_group("phrase_lookup");
    group.sample_size(200);

    group.bench_function("hit", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let (verb, noun) = &hits[idx % hits.len()];
            idx += 1;
            index.lookup(verb, noun).is_some()
        });
    });

    group.bench_function("miss", |b| {
        b.iter(|| index.lookup("verb3", "nothing").is_some());
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_lookup);
criterion_main!(benches);
