//! Object-stream decoder (spec.md §4.6, component C6).
//!
//! Grounded in the pack's `doppioandante` object-stream module: an object
//! stream's decoded content is a header of `N` `(oid, byte_offset)` pairs
//! followed by `First`-relative object bodies; byte ranges are derived by
//! diffing consecutive offsets.

use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError, Result};
use crate::object::{Object, Stream};
use crate::tokenizer::{Token, Tokenizer};

pub struct ObjectStream {
    data: Vec<u8>,
    /// `(object number, byte offset within `data`, relative to `first`)`.
    offsets: Vec<(u32, usize)>,
    first: usize,
    /// `/Extends`, an optional reference to another object stream whose
    /// objects this one's trailer-merge logic may need (spec.md §4.6 does
    /// not require following it at this layer; callers consult §4.7).
    pub extends: Option<(u32, u16)>,
}

impl ObjectStream {
    /// Decodes an object stream's header and retains its decompressed
    /// content for on-demand slicing.
    pub fn parse(stream: &Stream) -> Result<Self> {
        let dict = &stream.dict;
        if !dict.has_type(b"ObjStm") {
            return Err(ParseError::Malformed { pos: 0, message: "stream is not an ObjStm".into() }.into());
        }
        let n = dict
            .get(b"N")
            .ok()
            .and_then(|o| o.as_i64())
            .ok_or_else(|| ParseError::Malformed { pos: 0, message: "ObjStm missing /N".into() })? as usize;
        let first = dict
            .get(b"First")
            .ok()
            .and_then(|o| o.as_i64())
            .ok_or_else(|| ParseError::Malformed { pos: 0, message: "ObjStm missing /First".into() })? as usize;
        let extends = extends_ref(dict);

        let data = stream.decompressed_content()?;
        let offsets = parse_header(&data, n)?;

        Ok(ObjectStream { data, offsets, first, extends })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn object_number_at(&self, index: usize) -> Option<u32> {
        self.offsets.get(index).map(|&(oid, _)| oid)
    }

    /// Byte range of the `index`-th object's body, relative to `/First`
    /// (doppioandante's `get_object_slice`): from this entry's offset up to
    /// the next entry's offset, or the end of the data for the last one.
    fn slice_for(&self, index: usize) -> Result<&[u8]> {
        let (_, start_rel) = *self
            .offsets
            .get(index)
            .ok_or_else(|| ParseError::Malformed { pos: 0, message: "ObjStm index out of range".into() })?;
        let start = self.first + start_rel;
        let end = match self.offsets.get(index + 1) {
            Some(&(_, next_rel)) => self.first + next_rel,
            None => self.data.len(),
        };
        if start > end || end > self.data.len() {
            return Err(ParseError::Malformed { pos: start, message: "ObjStm object range out of bounds".into() }.into());
        }
        Ok(&self.data[start..end])
    }

    /// Parses and returns the `index`-th compressed object's value. Objects
    /// inside an object stream are always direct values: no nested streams,
    /// no self-references (spec.md §4.6 implicit constraint carried from
    /// §6.1's xref-stream note on compressed entries never owning a gen).
    pub fn object_at(&self, index: usize) -> Result<Object> {
        let slice = self.slice_for(index)?;
        let mut tokenizer = Tokenizer::new(slice);
        let mut cb = |_: &str, _: usize| false;
        crate::parser::parse_direct_object(&mut tokenizer, &mut cb)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Result<Object>)> + '_ {
        (0..self.len()).map(move |i| (self.offsets[i].0, self.object_at(i)))
    }
}

fn extends_ref(dict: &Dictionary) -> Option<(u32, u16)> {
    match dict.get(b"Extends").ok()? {
        Object::Reference(id) => Some(*id),
        _ => None,
    }
}

/// Parses the `N` pairs of `oid offset` integers at the head of the
/// decoded stream content.
fn parse_header(data: &[u8], n: usize) -> Result<Vec<(u32, usize)>> {
    let mut tokenizer = Tokenizer::new(data);
    let mut cb = |_: &str, _: usize| false;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let oid = match tokenizer.next_token(&mut cb)? {
            Token::Integer(v) if v >= 0 => v as u32,
            _ => return Err(Error::InvalidObject("ObjStm header expected object number".into())),
        };
        let offset = match tokenizer.next_token(&mut cb)? {
            Token::Integer(v) if v >= 0 => v as usize,
            _ => return Err(Error::InvalidObject("ObjStm header expected byte offset".into())),
        };
        out.push((oid, offset));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    fn make_stream(n: i64, first: i64, header: &str, objects: &str) -> Stream {
        let content = format!("{header}{objects}");
        let dict = dictionary! {
            "Type" => Object::Name(b"ObjStm".to_vec()),
            "N" => n,
            "First" => first,
        };
        let mut s = Stream::new(dict, content.into_bytes());
        s.allows_compression = false;
        s
    }

    #[test]
    fn extracts_each_object_by_offset() {
        let header = "10 0 11 8 ";
        let objects = "123 true";
        let stream = make_stream(2, header.len() as i64, header, objects);
        let objstm = ObjectStream::parse(&stream).unwrap();
        assert_eq!(objstm.len(), 2);
        assert_eq!(objstm.object_number_at(0), Some(10));
        assert_eq!(objstm.object_at(0).unwrap(), Object::Integer(123));
        assert_eq!(objstm.object_at(1).unwrap(), Object::Boolean(true));
    }
}
