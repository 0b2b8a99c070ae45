use criterion::{criterion_group, criterion_main, Criterion};
use hexa_core::{dictionary, Document, Object};

fn build_sample(count: u32) -> Document {
    let mut doc = Document::new();
    for i in 0..count {
        doc.add(dictionary! { "Type" => "TestObj", "Value" => i as i64 }.into(), None).unwrap();
    }
    let pages = doc.add(dictionary! { "Type" => "Pages", "Kids" => Vec::<Object>::new(), "Count" => 0 }.into(), None).unwrap();
    let catalog = doc.add(dictionary! { "Type" => "Catalog", "Pages" => pages.as_reference() }.into(), None).unwrap();
    doc.revisions.newest_mut().trailer_mut().set("Root", catalog.as_reference());
    doc
}

fn bench_save_full(c: &mut Criterion) {
    let doc = build_sample(2_000);
    c.bench_function("save_full_document", |b| {
        b.iter(|| {
            let mut output = Vec::new();
            let mut doc_clone = doc.clone();
            doc_clone.save_to(&mut output).unwrap();
        })
    });
}

fn bench_save_incremental(c: &mut Criterion) {
    let mut seed = build_sample(2_000);
    let mut bytes = Vec::new();
    seed.save_to(&mut bytes).unwrap();
    let doc = Document::load(&bytes).unwrap();

    c.bench_function("save_incremental_update", |b| {
        b.iter(|| {
            let mut doc_clone = doc.clone();
            doc_clone.add(dictionary! { "Type" => "TestObj", "Value" => 1 }.into(), None).unwrap();
            let mut output = Vec::new();
            doc_clone.append_update(&mut output).unwrap();
        })
    });
}

criterion_group!(benches, bench_save_full, bench_save_incremental);
criterion_main!(benches);
