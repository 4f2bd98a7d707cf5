//! Benchmarks for the full conversion.
//!
//! # Usage
//!
//! ```bash
//! cargo bench --bench extraction
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use standoff_tree::{AnnotationExport, Converter, RawRelation, RawSpan};

const SENTENCE: &str = "The mayor of Paris , Anna Smith , sold the old house to Ben on Monday .";

/// `n` copies of an annotated sentence with nested mentions, an event and
/// a coreference link to the previous copy.
fn synthetic_export(n: usize) -> AnnotationExport {
    let len = SENTENCE.chars().count() + 1;
    let mut text = String::with_capacity(len * n);
    let mut export = AnnotationExport::default();
    for i in 0..n {
        text.push_str(SENTENCE);
        text.push('\n');
        let o = i * len;
        let id = |name: &str| format!("{}{}", name, i);
        export.spans.extend([
            RawSpan::new(id("mayor"), o, o + 31, "nom.per").with_role("seller.1"),
            RawSpan::new(id("head"), o + 4, o + 9, "head"),
            RawSpan::new(id("paris"), o + 13, o + 18, "nam.loc"),
            RawSpan::new(id("att"), o + 21, o + 31, "att.alias"),
            RawSpan::new(id("sold"), o + 34, o + 38, "ev1.sale.past"),
            RawSpan::new(id("house"), o + 39, o + 52, "nom.obj").with_role("goods.1"),
            RawSpan::new(id("desc"), o + 43, o + 52, "desc.building"),
            RawSpan::new(id("ben"), o + 56, o + 59, "nam.per").with_role("buyer.1"),
            RawSpan::new(id("monday"), o + 63, o + 69, "val.date").with_role("time.1"),
        ]);
        if i > 0 {
            export.spans.push(RawSpan::new(id("pro"), o + 56, o + 59, "pro"));
            export.relations.push(RawRelation::new(
                id("coref"),
                "coref",
                id("pro"),
                format!("ben{}", i - 1),
            ));
        }
    }
    export.text = text;
    export
}

fn bench_convert(c: &mut Criterion) {
    let converter = Converter::default();
    let mut group = c.benchmark_group("convert");
    for n in [1usize, 10, 100] {
        let export = synthetic_export(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &export, |b, export| {
            b.iter(|| converter.convert(black_box(export.clone())).unwrap())
        });
    }
    group.finish();
}

fn bench_to_json(c: &mut Criterion) {
    let doc = Converter::default().convert(synthetic_export(100)).unwrap();
    c.bench_function("document_to_json_100", |b| b.iter(|| black_box(&doc).to_json(false).unwrap()));
}

criterion_group!(benches, bench_convert, bench_to_json);
criterion_main!(benches);
