use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sqlembed::extract::extract;
use sqlembed::lexer::Lexer;
use sqlembed::{format_source, format_string, Language, Mode};

const SENTINEL: &str = ")))))__SQLEMBED_OUTPUT__(((((";

fn load_test_file(name: &str) -> String {
    let path = format!("tests/data/unformatted/{}", name);
    let content = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path, e));
    // Golden test files use a sentinel to separate input/expected; take only input
    match content.find(SENTINEL) {
        Some(pos) => content[..pos].to_string(),
        None => content,
    }
}

/// A synthetic module with many literals, about one in three holding SQL.
fn large_python_source() -> String {
    let mut source = String::new();
    for i in 0..500 {
        source.push_str(&format!(
            "LABEL_{i} = 'label number {i}'\n\
             fetch_{i}_sql = 'select id, name, email, status from users where id = {i} and active = true'\n\
             note_{i} = \"select the best option from the menu\"\n"
        ));
    }
    source
}

fn bench_format_small(c: &mut Criterion) {
    let sql = "SELECT a, b, c FROM my_table WHERE x = 1 AND y > 2 ORDER BY a";
    let mode = Mode::default();
    c.bench_function("format_small", |b| {
        b.iter(|| format_string(black_box(sql), black_box(&mode)).unwrap())
    });
}

fn bench_format_source_medium(c: &mut Criterion) {
    let source = load_test_file("102_block_literal.py");
    let mode = Mode::default();
    c.bench_function("format_source_medium", |b| {
        b.iter(|| format_source(black_box(&source), Language::Python, black_box(&mode)).unwrap())
    });
}

fn bench_format_source_large(c: &mut Criterion) {
    let source = large_python_source();
    let mode = Mode {
        line_length: 60,
        ..Mode::default()
    };
    c.bench_function("format_source_large", |b| {
        b.iter(|| format_source(black_box(&source), Language::Python, black_box(&mode)).unwrap())
    });
}

fn bench_extract_only(c: &mut Criterion) {
    let source = large_python_source();
    c.bench_function("extract_only", |b| {
        b.iter(|| extract(black_box(&source), Language::Python))
    });
}

fn bench_lex_only(c: &mut Criterion) {
    let lexer = Lexer::default();
    let sql = "select id, name, email, status from users where id = 42 and active = true \
               order by created_at desc limit 10";
    c.bench_function("lex_only", |b| b.iter(|| lexer.tokenize(black_box(sql))));
}

/// Formatting already-formatted source, where every literal is left as is.
fn bench_format_idempotent(c: &mut Criterion) {
    let mode = Mode::default();
    let formatted = format_source(&large_python_source(), Language::Python, &mode)
        .unwrap()
        .formatted;
    c.bench_function("format_idempotent", |b| {
        b.iter(|| format_source(black_box(&formatted), Language::Python, black_box(&mode)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_format_small,
    bench_format_source_medium,
    bench_format_source_large,
    bench_extract_only,
    bench_lex_only,
    bench_format_idempotent
);
criterion_main!(benches);
