use criterion::{criterion_group, criterion_main, Criterion};
use hexa_core::{dictionary, Document, Object};

fn build_large(count: u32) -> Vec<u8> {
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

/// A chain of `updates` incremental-update revisions, each adding a handful
/// of objects, so loading has to follow `/Prev` repeatedly (spec.md §4.7).
fn build_multi_revision(updates: u32) -> Vec<u8> {
    let mut doc = Document::load(&build_large(5)).unwrap();
    let mut bytes = Vec::new();
    for i in 0..updates {
        doc.add(dictionary! { "Type" => "Update", "Value" => i as i64 }.into(), None).unwrap();
        bytes.clear();
        doc.append_update(&mut bytes).unwrap();
        doc = Document::load(&bytes).unwrap();
    }
    bytes
}

fn bench_load_large(c: &mut Criterion) {
    let buffer = build_large(5_000);
    c.bench_function("load_large_document", |b| {
        b.iter(|| {
            Document::load(&buffer).unwrap();
        })
    });
}

fn bench_load_multi_revision(c: &mut Criterion) {
    let buffer = build_multi_revision(20);
    c.bench_function("load_multi_revision_document", |b| {
        b.iter(|| {
            Document::load(&buffer).unwrap();
        })
    });
}

criterion_group!(benches, bench_load_large, bench_load_multi_revision);
criterion_main!(benches);
