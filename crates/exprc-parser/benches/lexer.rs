use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use exprc_parser::tokenize;

fn bench_keywords(c: &mut Criterion) {
    let source = "var if else return new modify with true false null";

    c.bench_function("lex_keywords", |b| {
        b.iter(|| tokenize(black_box(source)).unwrap());
    });
}

fn bench_numbers(c: &mut Criterion) {
    let mut group = c.benchmark_group("numbers");

    let integers = "42 123 0 999 1000000";
    group.bench_with_input(BenchmarkId::new("integers", "simple"), &integers, |b, source| {
        b.iter(|| tokenize(black_box(source)).unwrap());
    });

    let suffixed = "42L 0B 0I 3.14f 3.14 1e10";
    group.bench_with_input(BenchmarkId::new("suffixed", "long_bigdecimal_biginteger"), &suffixed, |b, source| {
        b.iter(|| tokenize(black_box(source)).unwrap());
    });

    let temporal = "12h30m 1d 500ms 2h15m30s";
    group.bench_with_input(BenchmarkId::new("temporal", "durations"), &temporal, |b, source| {
        b.iter(|| tokenize(black_box(source)).unwrap());
    });

    group.finish();
}

fn bench_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("strings");

    let simple = r#""hello" "world" "test""#;
    group.bench_with_input(BenchmarkId::new("simple", "3 strings"), &simple, |b, source| {
        b.iter(|| tokenize(black_box(source)).unwrap());
    });

    let escapes = r#""line1\nline2" "tab\there" "quote\"test""#;
    group.bench_with_input(BenchmarkId::new("escapes", "basic"), &escapes, |b, source| {
        b.iter(|| tokenize(black_box(source)).unwrap());
    });

    group.finish();
}

fn bench_operators(c: &mut Criterion) {
    let source = "+ - * / % == != < > <= >= && || ! ~ & | ^ << >> >>> += -= *= /= %= &= |= ^= <<= >>= >>>= !. # ( ) { } [ ] ; , .";

    c.bench_function("lex_operators", |b| {
        b.iter(|| tokenize(black_box(source)).unwrap());
    });
}

fn bench_real_expression(c: &mut Criterion) {
    let mut group = c.benchmark_group("real_expression");

    let comparison = "influence > 50 && !atWar && stability > 30";
    group.throughput(Throughput::Bytes(comparison.len() as u64));
    group.bench_with_input(BenchmarkId::new("comparison", "scenario_1"), &comparison, |b, source| {
        b.iter(|| tokenize(black_box(source)).unwrap());
    });

    let block = "a = a + 1; b = b * 2; return a + b;";
    group.throughput(Throughput::Bytes(block.len() as u64));
    group.bench_with_input(BenchmarkId::new("block", "scenario_3"), &block, |b, source| {
        b.iter(|| tokenize(black_box(source)).unwrap());
    });

    group.finish();
}

fn bench_large_expression(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_expression");

    let mut source = String::new();
    for i in 0..100 {
        source.push_str(&format!("var v{i} = a{i}.getField(b{i}) + {i}; "));
    }

    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_with_input(
        BenchmarkId::new("100_declarations", format!("{} bytes", source.len())),
        &source,
        |b, source| {
            b.iter(|| tokenize(black_box(source)).unwrap());
        },
    );

    group.finish();
}

criterion_group!(
    benches,
    bench_keywords,
    bench_numbers,
    bench_strings,
    bench_operators,
    bench_real_expression,
    bench_large_expression
);
criterion_main!(benches);
