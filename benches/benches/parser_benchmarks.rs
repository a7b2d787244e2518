//! Front-end Performance Benchmarks
//!
//! - Lexer throughput (bytes/second), with and without comment tokens
//! - Parser throughput over whole programs
//! - Printing a parsed program back to source

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// Fixtures are compiled in so every run measures the same input
const SMALL_PROGRAM: &str = include_str!("../fixtures/small.onyx");
const MEDIUM_PROGRAM: &str = include_str!("../fixtures/medium.onyx");
const LARGE_PROGRAM: &str = include_str!("../fixtures/large.onyx");

const PROGRAMS: [(&str, &str); 3] = [
    ("small", SMALL_PROGRAM),
    ("medium", MEDIUM_PROGRAM),
    ("large", LARGE_PROGRAM),
];

// ============================================================================
// Lexer Benchmarks
// ============================================================================

fn bench_lexer_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_throughput");

    for (name, source) in PROGRAMS.iter() {
        group.throughput(Throughput::Bytes(source.len() as u64));

        group.bench_with_input(BenchmarkId::new("tokenize", name), source, |b, source| {
            b.iter(|| {
                let lexer = onyx_lexer::Lexer::new(black_box(source));
                let (tokens, _errors) = lexer.tokenize();
                black_box(tokens)
            })
        });

        group.bench_with_input(
            BenchmarkId::new("tokenize_filtered", name),
            source,
            |b, source| {
                b.iter(|| {
                    let lexer = onyx_lexer::Lexer::new(black_box(source));
                    let (tokens, _errors) = lexer.tokenize_filtered();
                    black_box(tokens)
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Parser Benchmarks
// ============================================================================

fn bench_parser_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_throughput");

    for (name, source) in PROGRAMS.iter() {
        group.throughput(Throughput::Bytes(source.len() as u64));

        group.bench_with_input(BenchmarkId::new("parse", name), source, |b, source| {
            b.iter(|| {
                let (program, errors) = onyx_parser::parse(black_box(source));
                black_box((program, errors))
            })
        });
    }

    group.finish();
}

fn bench_deep_nesting(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_nesting");

    for depth in [8, 24, onyx_parser::DEFAULT_MAX_DEPTH - 1] {
        let source = format!("let x = {}1{}", "(".repeat(depth), ")".repeat(depth));
        group.bench_with_input(BenchmarkId::new("parens", depth), &source, |b, source| {
            b.iter(|| black_box(onyx_parser::parse(black_box(source))))
        });
    }

    group.finish();
}

fn bench_print(c: &mut Criterion) {
    let mut group = c.benchmark_group("print");

    for (name, source) in PROGRAMS.iter() {
        let (program, _errors) = onyx_parser::parse(source);
        group.bench_with_input(BenchmarkId::new("print_program", name), &program, |b, program| {
            b.iter(|| black_box(onyx_ast::printer::print_program(black_box(program))))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_lexer_throughput,
    bench_parser_throughput,
    bench_deep_nesting,
    bench_print
);
criterion_main!(benches);
