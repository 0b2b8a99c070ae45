use criterion::{criterion_group, criterion_main, Criterion};
use hexa_core::{dictionary, Document, Object};

/// A single-revision PDF with `count` simple dictionary objects hung off an
/// otherwise-empty page tree, built through the public API so the benchmark
/// doesn't depend on checked-in fixture files.
fn build_sample(count: u32) -> Vec<u8> {
    let mut doc = Document::new();
    for i in 0..count {
        doc.add(dictionary! { "Type" => "TestObj", "Value" => i as i64 }.into(), None).unwrap();
    }
    let pages = doc.add(dictionary! { "Type" => "Pages", "Kids" => Vec::<Object>::new(), "Count" => 0 }.into(), None).unwrap();
    let catalog = doc.add(dictionary! { "Type" => "Catalog", "Pages" => pages.as_reference() }.into(), None).unwrap();
    doc.revisions.newest_mut().trailer_mut().set("Root", catalog.as_reference());

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn bench_parse_small(c: &mut Criterion) {
    let buffer = build_sample(20);
    c.bench_function("parse_small_document", |b| {
        b.iter(|| {
            Document::load(&buffer).unwrap();
        })
    });
}

fn bench_parse_large(c: &mut Criterion) {
    let buffer = build_sample(2_000);
    c.bench_function("parse_large_document", |b| {
        b.iter(|| {
            Document::load(&buffer).unwrap();
        })
    });
}

criterion_group!(benches, bench_parse_small, bench_parse_large);
criterion_main!(benches);
