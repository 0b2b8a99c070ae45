//! Indirect-object parsing state machine (spec.md §4.4):
//!
//! ```text
//! start ─── oid gen 'obj' ──► body
//! body ─── value ──► after_value
//! after_value ─── 'endobj' ──► done
//! after_value ─── 'stream' ──► stream_body (reads dict.Length bytes)
//! stream_body ─── 'endstream' ──► after_value'
//! after_value' ─── 'endobj' ──► done
//! ```
//!
//! `stream`/`endstream` promotion is delegated to
//! [`crate::parser::maybe_promote_stream`]; this module only drives the
//! header/footer keywords and reports every relaxation through the
//! correctable-error callback, grounded in the teacher's `read_object`/
//! `object_loader` split (a fatal header mismatch vs. a missing `endobj`
//! that the teacher's own grammar silently tolerates).

use crate::error::{ParseError, Result};
use crate::object::{Object, ObjectId};
use crate::tokenizer::{OnCorrectable, Token, Tokenizer};

use super::{maybe_promote_stream, parse_direct_object, LengthResolver};

/// The result of parsing one `oid gen obj ... endobj` unit.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    pub id: ObjectId,
    pub value: Object,
}

/// Parses the indirect object starting at `offset` in `tokenizer`'s buffer.
/// `resolver` is consulted only when the stream's `/Length` is itself an
/// indirect reference (spec.md §4.4).
pub fn parse_indirect_object(
    tokenizer: &mut Tokenizer,
    offset: usize,
    resolver: &mut LengthResolver,
    on_correctable: &mut OnCorrectable,
) -> Result<IndirectObject> {
    tokenizer.set_pos(offset);

    let oid = expect_non_negative_integer(tokenizer, on_correctable, "object number")?;
    let gen = expect_non_negative_integer(tokenizer, on_correctable, "generation number")?;
    expect_keyword(tokenizer, b"obj", on_correctable, "expected 'obj' keyword")?;

    let body = parse_direct_object(tokenizer, on_correctable)?;
    let value = match body {
        Object::Dictionary(dict) => maybe_promote_stream(tokenizer, dict, resolver)?,
        other => other,
    };

    expect_endobj(tokenizer, on_correctable)?;

    Ok(IndirectObject { id: (oid as u32, gen as u16), value })
}

fn expect_non_negative_integer(
    tokenizer: &mut Tokenizer,
    on_correctable: &mut OnCorrectable,
    what: &str,
) -> Result<i64> {
    let pos = tokenizer.pos();
    match tokenizer.next_token(on_correctable)? {
        Token::Integer(n) if n >= 0 => Ok(n),
        other => Err(ParseError::Malformed {
            pos,
            message: format!("expected {what}, found {other:?}"),
        }
        .into()),
    }
}

fn expect_keyword(
    tokenizer: &mut Tokenizer,
    keyword: &[u8],
    on_correctable: &mut OnCorrectable,
    context: &str,
) -> Result<()> {
    let pos = tokenizer.pos();
    match tokenizer.next_token(on_correctable)? {
        Token::Keyword(k) if k == keyword => Ok(()),
        other => Err(ParseError::Malformed { pos, message: format!("{context}, found {other:?}") }.into()),
    }
}

/// `endobj` is expected but, per spec.md's correctable-error policy, a
/// missing or misplaced `endobj` is tolerated: some producers omit it or
/// leave trailing garbage before the next object. The callback decides
/// whether that should be raised as fatal.
fn expect_endobj(tokenizer: &mut Tokenizer, on_correctable: &mut OnCorrectable) -> Result<()> {
    let checkpoint = tokenizer.pos();
    match tokenizer.next_token(on_correctable) {
        Ok(Token::Keyword(k)) if k == b"endobj" => Ok(()),
        _ => {
            tokenizer.set_pos(checkpoint);
            if on_correctable("missing 'endobj' keyword", checkpoint) {
                Err(ParseError::Malformed { pos: checkpoint, message: "missing 'endobj' keyword".into() }.into())
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::no_resolver;

    #[test]
    fn parses_simple_indirect_object() {
        let bytes = b"1 0 obj\n<</A 1>>\nendobj\n";
        let mut t = Tokenizer::new(bytes);
        let mut resolver = no_resolver();
        let mut cb = |_: &str, _: usize| false;
        let obj = parse_indirect_object(&mut t, 0, &mut resolver, &mut cb).unwrap();
        assert_eq!(obj.id, (1, 0));
        assert_eq!(obj.value.as_dict().unwrap().get(b"A").unwrap(), &Object::Integer(1));
    }

    #[test]
    fn parses_stream_object_and_sets_content() {
        let bytes = b"2 0 obj\n<</Length 5>>\nstream\nhello\nendstream\nendobj\n";
        let mut t = Tokenizer::new(bytes);
        let mut resolver = no_resolver();
        let mut cb = |_: &str, _: usize| false;
        let obj = parse_indirect_object(&mut t, 0, &mut resolver, &mut cb).unwrap();
        assert_eq!(obj.id, (2, 0));
        assert_eq!(obj.value.as_stream().unwrap().content, b"hello");
    }

    #[test]
    fn tolerates_missing_endobj_when_not_raised() {
        let bytes = b"3 0 obj\n42\n";
        let mut t = Tokenizer::new(bytes);
        let mut resolver = no_resolver();
        let mut cb = |_: &str, _: usize| false;
        let obj = parse_indirect_object(&mut t, 0, &mut resolver, &mut cb).unwrap();
        assert_eq!(obj.value, Object::Integer(42));
    }

    #[test]
    fn raises_missing_endobj_when_callback_says_so() {
        let bytes = b"3 0 obj\n42\n";
        let mut t = Tokenizer::new(bytes);
        let mut resolver = no_resolver();
        let mut cb = |_: &str, _: usize| true;
        let err = parse_indirect_object(&mut t, 0, &mut resolver, &mut cb).unwrap_err();
        assert!(matches!(err, crate::error::Error::Parse(ParseError::Malformed { .. })));
    }
}
