//! Throughput of the matching pipeline's cascade (spec.md §4.1): keyword
//! prefilter, DFA, and the full `regex_confirm` leftmost-longest pass,
//! across patterns that land at different stages of the cascade.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use pargrep::config::Config;
use pargrep::matcher::CompiledMatcher;
use pargrep::pattern::PatternSet;

fn matcher_for(pattern: &str, config: &Config) -> CompiledMatcher {
    let mut patterns = PatternSet::new();
    patterns.add_command_line(pattern);
    CompiledMatcher::compile(&patterns, config).unwrap()
}

fn corpus_with_match_density(lines: usize, match_every: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(lines * 32);
    for i in 0..lines {
        if i % match_every == 0 {
            buf.extend_from_slice(b"the quick needle jumps over the lazy dog\n");
        } else {
            buf.extend_from_slice(b"the quick brown fox jumps over the lazy dog\n");
        }
    }
    buf
}

fn bench_literal(c: &mut Criterion) {
    let config = Config::default();
    let matcher = matcher_for("needle", &config);
    let corpus = corpus_with_match_density(10_000, 50);

    let mut group = c.benchmark_group("literal_keyword_hit");
    group.throughput(Throughput::Bytes(corpus.len() as u64));
    group.bench_function("execute_whole_corpus", |b| {
        b.iter(|| {
            let mut hits = 0;
            let mut pos = 0;
            while let Some(m) = matcher.execute(black_box(&corpus), Some(pos)) {
                hits += 1;
                pos = if m.end > m.start { m.end } else { m.end + 1 };
                if pos >= corpus.len() {
                    break;
                }
            }
            black_box(hits)
        });
    });
    group.finish();
}

fn bench_regex(c: &mut Criterion) {
    let config = Config::default();
    let matcher = matcher_for(r"[a-z]+ jumps", &config);
    let corpus = corpus_with_match_density(10_000, 1);

    let mut group = c.benchmark_group("regex_confirm_every_line");
    group.throughput(Throughput::Bytes(corpus.len() as u64));
    group.bench_function("execute_whole_corpus", |b| {
        b.iter(|| {
            let mut hits = 0;
            let mut pos = 0;
            while let Some(m) = matcher.execute(black_box(&corpus), Some(pos)) {
                hits += 1;
                pos = if m.end > m.start { m.end } else { m.end + 1 };
                if pos >= corpus.len() {
                    break;
                }
            }
            black_box(hits)
        });
    });
    group.finish();
}

fn bench_no_match(c: &mut Criterion) {
    let config = Config::default();
    let matcher = matcher_for("absent_keyword", &config);
    let corpus = corpus_with_match_density(10_000, usize::MAX);

    let mut group = c.benchmark_group("keyword_reject_whole_corpus");
    group.throughput(Throughput::Bytes(corpus.len() as u64));
    group.bench_function("execute_once", |b| {
        b.iter(|| black_box(matcher.execute(black_box(&corpus), Some(0))));
    });
    group.finish();
}

criterion_group!(benches, bench_literal, bench_regex, bench_no_match);
criterion_main!(benches);
