use criterion::{criterion_group, criterion_main, Criterion};
use hexa_core::dictionary;
use hexa_core::object::{Object, Stream};
use hexa_core::object_stream::ObjectStream;

/// Hand-assembles a compressed object stream holding `count` small
/// dictionaries, the same shape `Document::load` decodes through
/// `XrefEntry::Compressed` (spec.md §4.6).
fn build_object_stream(count: u32) -> Stream {
    let mut header = String::new();
    let mut bodies = String::new();
    for i in 0..count {
        let body = format!("<</Type/TestObj/Value {i}>>");
        header.push_str(&format!("{} {} ", i + 1, bodies.len()));
        bodies.push_str(&body);
    }
    let first = header.len() as i64;
    let content = format!("{header}{bodies}").into_bytes();

    let dict = dictionary! {
        "Type" => Object::Name(b"ObjStm".to_vec()),
        "N" => count as i64,
        "First" => first,
        "Filter" => Object::Name(b"FlateDecode".to_vec()),
    };
    let encoded = hexa_core::filters::encode_stream(&dict, &content).unwrap();
    let mut stream = Stream::new(dict, encoded);
    stream.allows_compression = true;
    stream
}

fn bench_object_stream_parse(c: &mut Criterion) {
    let stream = build_object_stream(200);
    c.bench_function("object_stream_parse_header", |b| {
        b.iter(|| {
            ObjectStream::parse(&stream).unwrap();
        })
    });
}

fn bench_object_stream_iterate(c: &mut Criterion) {
    let stream = build_object_stream(200);
    c.bench_function("object_stream_iterate_all", |b| {
        b.iter(|| {
            let object_stream = ObjectStream::parse(&stream).unwrap();
            for (_, value) in object_stream.iter() {
                value.unwrap();
            }
        })
    });
}

criterion_group!(benches, bench_object_stream_parse, bench_object_stream_iterate);
criterion_main!(benches);
