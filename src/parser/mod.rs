//! Object parser (spec.md §4.4, component C4): turns a token stream into
//! [`Object`] values, indirect objects, and cross-reference data.
//!
//! Grounded in the `lopdf`-family `nom` grammar (its handling of nested
//! arrays/dictionaries, the `stream`/`endstream` state machine, and the
//! `Length`-resolution fallback), re-expressed as hand-written recursive
//! descent over [`Tokenizer`] tokens so the parser can share the
//! tokenizer's assignable `pos` and correctable-error callback.

pub mod indirect;
pub mod xref;

use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError, Result};
use crate::object::{Object, ObjectId, Stream, StringFormat};
use crate::tokenizer::{OnCorrectable, Token, Tokenizer};

pub use indirect::{parse_indirect_object, IndirectObject};
pub use xref::{parse_xref_section_and_trailer, reconstruct_revision, startxref_offset, ParsedXref};

/// Resolves an indirect `/Length` reference to its integer value, without
/// triggering a full object load (the parser only needs the number).
pub type LengthResolver<'a> = dyn FnMut(ObjectId) -> Option<i64> + 'a;

/// Undoes the serializer's UTF-16BE textual-string encoding (spec.md §4.9
/// "String"): a leading `FE FF` byte-order mark means the remaining bytes
/// are UTF-16BE and should be decoded back to UTF-8 so that
/// `parse(serialize(v)) == v` holds. Bytes with no BOM, or a BOM followed by
/// invalid UTF-16, are kept as-is (plain binary/Latin text).
fn decode_utf16_bom(bytes: Vec<u8>) -> Vec<u8> {
    if bytes.len() < 2 || bytes[0] != 0xFE || bytes[1] != 0xFF {
        return bytes;
    }
    let units: Vec<u16> = bytes[2..].chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
    match String::from_utf16(&units) {
        Ok(s) => s.into_bytes(),
        Err(_) => bytes,
    }
}

/// Parses one direct (non-indirect) value: the recursive core shared by
/// array elements, dictionary values, and top-level indirect-object
/// bodies. Never itself promotes a trailing `stream` keyword into a
/// [`Stream`] — only [`parse_indirect_object`] does that, since a bare
/// direct object (inside an array, a dictionary value, or an object-stream
/// body) can never own a stream body per the PDF object grammar.
pub fn parse_direct_object(tokenizer: &mut Tokenizer, on_correctable: &mut OnCorrectable) -> Result<Object> {
    match tokenizer.next_token(on_correctable)? {
        Token::Null => Ok(Object::Null),
        Token::Boolean(b) => Ok(Object::Boolean(b)),
        Token::Integer(n) => Ok(Object::Integer(n)),
        Token::Real(f) => Ok(Object::Real(f)),
        Token::Name(n) => Ok(Object::Name(n)),
        Token::LiteralString(s) => Ok(Object::String(decode_utf16_bom(s), StringFormat::Literal)),
        Token::HexString(s) => Ok(Object::String(decode_utf16_bom(s), StringFormat::Hexadecimal)),
        Token::Reference(id) => Ok(Object::Reference(id)),
        Token::ArrayOpen => parse_array(tokenizer, on_correctable),
        Token::DictOpen => parse_dictionary(tokenizer, on_correctable).map(Object::Dictionary),
        Token::Keyword(k) if k == b"obj" || k.is_empty() => {
            Err(ParseError::Malformed { pos: tokenizer.pos(), message: "unexpected keyword".into() }.into())
        }
        Token::Keyword(_) => {
            // Unknown bareword where a value was expected; recoverable by
            // treating it as a null, mirroring the tokenizer's own
            // correctable-error policy (spec.md §4.1).
            if on_correctable("unexpected keyword in object position", tokenizer.pos()) {
                Err(ParseError::Malformed { pos: tokenizer.pos(), message: "unexpected keyword".into() }.into())
            } else {
                Ok(Object::Null)
            }
        }
        Token::ArrayClose | Token::DictClose => {
            Err(ParseError::Malformed { pos: tokenizer.pos(), message: "unexpected closing delimiter".into() }.into())
        }
        Token::Eof => Err(ParseError::EndOfInput.into()),
    }
}

fn parse_array(tokenizer: &mut Tokenizer, on_correctable: &mut OnCorrectable) -> Result<Object> {
    let mut items = Vec::new();
    loop {
        let checkpoint = tokenizer.pos();
        match tokenizer.next_token(on_correctable)? {
            Token::ArrayClose => return Ok(Object::Array(items)),
            Token::Eof => return Err(ParseError::EndOfInput.into()),
            _ => {
                tokenizer.set_pos(checkpoint);
                items.push(parse_direct_object(tokenizer, on_correctable)?);
            }
        }
    }
}

pub(crate) fn parse_dictionary(tokenizer: &mut Tokenizer, on_correctable: &mut OnCorrectable) -> Result<Dictionary> {
    let mut dict = Dictionary::new();
    loop {
        match tokenizer.next_token(on_correctable)? {
            Token::DictClose => return Ok(dict),
            Token::Name(key) => {
                let value = parse_direct_object(tokenizer, on_correctable)?;
                dict.set(key, value);
            }
            Token::Eof => return Err(ParseError::EndOfInput.into()),
            _ => return Err(ParseError::Malformed { pos: tokenizer.pos(), message: "expected a dictionary key".into() }.into()),
        }
    }
}

/// Parses the body following `dict stream` up to and including
/// `endstream`, resolving `/Length` (possibly indirect) via `resolver`.
/// When `/Length` can't be resolved, falls back to scanning for the next
/// literal `endstream`, the same relaxation the teacher's grammar applies
/// (spec.md §8: "`Length` missing in a stream -> parser scans to
/// `endstream` and synthesizes `Length`").
pub fn parse_stream_body(tokenizer: &mut Tokenizer, dict: Dictionary, resolver: &mut LengthResolver) -> Result<Stream> {
    tokenizer.skip_stream_eol();
    let data_start = tokenizer.pos();

    let declared_len = match dict.get(b"Length").ok() {
        Some(Object::Integer(n)) if *n >= 0 => Some(*n as usize),
        Some(Object::Reference(id)) => resolver(*id).filter(|n| *n >= 0).map(|n| n as usize),
        _ => None,
    };

    let data_end = match declared_len {
        Some(len) if data_start + len <= tokenizer.len() => {
            let candidate_end = data_start + len;
            // Trust the declared length only if `endstream` genuinely
            // follows (within a small EOL tolerance); otherwise fall back
            // to scanning, since some producers lie about Length.
            if looks_like_endstream_follows(tokenizer, candidate_end) {
                candidate_end
            } else {
                scan_for_endstream(tokenizer, data_start)?
            }
        }
        _ => scan_for_endstream(tokenizer, data_start)?,
    };

    let content = tokenizer.slice(data_start, data_end).to_vec();
    tokenizer.set_pos(data_end);
    skip_to_endstream_keyword(tokenizer)?;

    Ok(Stream::new(dict, content))
}

fn looks_like_endstream_follows(tokenizer: &Tokenizer, from: usize) -> bool {
    let mut probe = Tokenizer::with_pos(tokenizer.bytes(), from);
    let mut cb = |_: &str, _: usize| false;
    matches!(probe.next_token(&mut cb), Ok(Token::Keyword(k)) if k == b"endstream")
}

fn scan_for_endstream(tokenizer: &Tokenizer, data_start: usize) -> Result<usize> {
    let found = tokenizer
        .find_from(b"endstream", data_start)
        .ok_or_else(|| ParseError::Malformed { pos: data_start, message: "missing endstream".into() })?;
    // Trim one trailing EOL that belongs to the stream framing, not the
    // content itself.
    let mut end = found;
    if end > data_start && tokenizer.slice(end - 1, end) == b"\n" {
        end -= 1;
        if end > data_start && tokenizer.slice(end - 1, end) == b"\r" {
            end -= 1;
        }
    } else if end > data_start && tokenizer.slice(end - 1, end) == b"\r" {
        end -= 1;
    }
    Ok(end)
}

fn skip_to_endstream_keyword(tokenizer: &mut Tokenizer) -> Result<()> {
    let mut cb = |_: &str, _: usize| false;
    match tokenizer.next_token(&mut cb)? {
        Token::Keyword(k) if k == b"endstream" => Ok(()),
        _ => Err(ParseError::Malformed { pos: tokenizer.pos(), message: "expected endstream".into() }.into()),
    }
}

/// Promotes a parsed dictionary into a [`Stream`] if the tokenizer is
/// sitting right at a `stream` keyword, otherwise returns the dictionary
/// unchanged as `Object::Dictionary`.
pub fn maybe_promote_stream(tokenizer: &mut Tokenizer, dict: Dictionary, resolver: &mut LengthResolver) -> Result<Object> {
    let checkpoint = tokenizer.pos();
    let mut cb = |_: &str, _: usize| false;
    match tokenizer.next_token(&mut cb) {
        Ok(Token::Keyword(k)) if k == b"stream" => {
            tokenizer.set_pos(checkpoint);
            // re-consume the keyword properly so skip_stream_eol starts
            // right after it.
            let _ = tokenizer.next_token(&mut cb)?;
            Ok(Object::Stream(parse_stream_body(tokenizer, dict, resolver)?))
        }
        _ => {
            tokenizer.set_pos(checkpoint);
            Ok(Object::Dictionary(dict))
        }
    }
}

pub(crate) fn no_resolver() -> impl FnMut(ObjectId) -> Option<i64> {
    |_| None
}

pub(crate) fn err_from_oid(message: impl Into<String>) -> Error {
    Error::InvalidObject(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_array_and_dictionary() {
        let mut t = Tokenizer::new(b"[1 2.5 (hi) /Name <</K 3 0 R>>]");
        let mut cb = |_: &str, _: usize| false;
        let obj = parse_direct_object(&mut t, &mut cb).unwrap();
        let arr = obj.as_array().unwrap();
        assert_eq!(arr.len(), 5);
        assert_eq!(arr[0], Object::Integer(1));
        assert_eq!(arr[1], Object::Real(2.5));
        assert_eq!(arr[2], Object::String(b"hi".to_vec(), StringFormat::Literal));
        assert_eq!(arr[3], Object::Name(b"Name".to_vec()));
        let inner = arr[4].as_dict().unwrap();
        assert_eq!(inner.get(b"K").unwrap(), &Object::Reference((3, 0)));
    }

    #[test]
    fn dict_with_stream_promotes_using_declared_length() {
        let bytes = b"<</Length 5>>\nstream\nhello\nendstream";
        let mut t = Tokenizer::new(bytes);
        let mut cb = |_: &str, _: usize| false;
        let dict = match tokenizer_first_token(&mut t, &mut cb) {
            Token::DictOpen => parse_dictionary(&mut t, &mut cb).unwrap(),
            other => panic!("unexpected {other:?}"),
        };
        let mut resolver = no_resolver();
        let obj = maybe_promote_stream(&mut t, dict, &mut resolver).unwrap();
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.content, b"hello");
    }

    #[test]
    fn dict_with_stream_falls_back_to_scan_when_length_unresolvable() {
        let bytes = b"<</Length 9 0 R>>\nstream\nhello world\nendstream";
        let mut t = Tokenizer::new(bytes);
        let mut cb = |_: &str, _: usize| false;
        let dict = match tokenizer_first_token(&mut t, &mut cb) {
            Token::DictOpen => parse_dictionary(&mut t, &mut cb).unwrap(),
            other => panic!("unexpected {other:?}"),
        };
        let mut resolver = no_resolver();
        let obj = maybe_promote_stream(&mut t, dict, &mut resolver).unwrap();
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.content, b"hello world");
    }

    fn tokenizer_first_token(t: &mut Tokenizer, cb: &mut OnCorrectable) -> Token {
        t.next_token(cb).unwrap()
    }
}
