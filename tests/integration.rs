//! End-to-end scenarios spanning the tokenizer, serializer, and document
//! facade together, as opposed to the unit tests colocated with each module.

use hexa_core::serializer::Serializer;
use hexa_core::tokenizer::{Token, Tokenizer};
use hexa_core::{Dictionary, Document, Object, ObjectId, StringFormat};

#[test]
fn simple_integer_tokenizes_as_integer() {
    let mut tokenizer = Tokenizer::new(b"42 ");
    let mut on_correctable = |_: &str, _: usize| false;
    let token = tokenizer.next_token(&mut on_correctable).unwrap();
    assert_eq!(token, Token::Integer(42));
}

#[test]
fn adjacent_integers_followed_by_r_collapse_into_a_reference() {
    let mut tokenizer = Tokenizer::new(b"3 0 R");
    let mut on_correctable = |_: &str, _: usize| false;
    let token = tokenizer.next_token(&mut on_correctable).unwrap();
    assert_eq!(token, Token::Reference((3, 0)));
}

#[test]
fn dictionary_with_a_null_entry_drops_it_and_keeps_tight_spacing() {
    let mut dict = Dictionary::new();
    dict.set("A", Object::Integer(1));
    dict.set("B", Object::Null);
    dict.set("C", Object::Integer(3));

    let mut serializer = Serializer::new(None);
    let mut out = Vec::new();
    serializer.serialize_value(&Object::Dictionary(dict), &mut out).unwrap();

    assert_eq!(out, b"<</A 1/C 3>>");
}

#[test]
fn hex_string_round_trips_through_the_tokenizer_and_serializer() {
    let mut tokenizer = Tokenizer::new(b"<48 65 6C>");
    let mut on_correctable = |_: &str, _: usize| false;
    let token = tokenizer.next_token(&mut on_correctable).unwrap();
    assert_eq!(token, Token::HexString(b"Hel".to_vec()));

    let value = Object::String(b"Hel".to_vec(), StringFormat::Hexadecimal);
    let mut serializer = Serializer::new(None);
    let mut out = Vec::new();
    serializer.serialize_value(&value, &mut out).unwrap();
    assert_eq!(out, b"(Hel)");
}

#[test]
fn a_second_revision_replacing_an_object_wins_the_lookup_and_is_listed_once() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"%PDF-1.4\n");
    let obj1_offset = bytes.len();
    bytes.extend_from_slice(b"1 0 obj\n<</Type/Catalog/Pages 2 0 R>>\nendobj\n");
    let obj2_offset = bytes.len();
    bytes.extend_from_slice(b"2 0 obj\n<</Type/Pages/Kids[]/Count 0>>\nendobj\n");
    let rev1_xref_pos = bytes.len();
    bytes.extend_from_slice(b"xref\n0 3\n0000000000 65535 f \n");
    bytes.extend_from_slice(format!("{obj1_offset:010} 00000 n \n").as_bytes());
    bytes.extend_from_slice(format!("{obj2_offset:010} 00000 n \n").as_bytes());
    bytes.extend_from_slice(b"trailer\n<</Size 3/Root 1 0 R>>\nstartxref\n");
    bytes.extend_from_slice(format!("{rev1_xref_pos}\n").as_bytes());
    bytes.extend_from_slice(b"%%EOF\n");

    let obj5_offset = bytes.len();
    bytes.extend_from_slice(b"5 0 obj\n<</Type/Pages/Kids[]/Count 1>>\nendobj\n");
    let rev2_xref_offset = bytes.len();
    bytes.extend_from_slice(b"xref\n5 1\n");
    bytes.extend_from_slice(format!("{obj5_offset:010} 00000 n \n").as_bytes());
    bytes.extend_from_slice(format!("trailer\n<</Size 6/Root 1 0 R/Prev {rev1_xref_pos}>>\nstartxref\n").as_bytes());
    bytes.extend_from_slice(format!("{rev2_xref_offset}\n").as_bytes());
    bytes.extend_from_slice(b"%%EOF");

    let doc = Document::load(&bytes).unwrap();
    let replaced: ObjectId = (5, 0);
    let value = doc.object(replaced).unwrap();
    assert_eq!(value.as_dict().unwrap().get(b"Count").unwrap(), &Object::Integer(1));

    let all = doc.each(true).unwrap();
    let occurrences = all.iter().filter(|(id, _)| *id == replaced).count();
    assert_eq!(occurrences, 1);
}

#[test]
fn a_file_missing_startxref_is_reconstructed_from_object_headers() {
    let bytes = b"%PDF-1.4\n5 0 obj\n<</Type/Catalog/Pages 6 0 R>>\nendobj\n6 0 obj\n<</Type/Pages/Kids[]/Count 0>>\nendobj\ntrailer<</Root 5 0 R>>\n";
    let doc = Document::load(bytes).unwrap();
    let catalog = doc.catalog().unwrap();
    assert!(catalog.as_dict().unwrap().has_type(b"Catalog"));
}
