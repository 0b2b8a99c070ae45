//! The PDF value sum type and its small helpers (spec.md §3.1, §3.2, component C3).

use std::fmt;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};

/// Identity of an indirect object: `(object number, generation number)`.
/// `oid == 0` denotes a direct (inline) value.
pub type ObjectId = (u32, u16);

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    String(Vec<u8>, StringFormat),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        use Object::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Real(a), Real(b)) => a.to_bits() == b.to_bits(),
            (Name(a), Name(b)) => a == b,
            (String(a, _), String(b, _)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Dictionary(a), Dictionary(b)) => a == b,
            (Stream(a), Stream(b)) => a == b,
            (Reference(a), Reference(b)) => a == b,
            _ => false,
        }
    }
}

impl Object {
    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Object {
        Object::String(s.into(), StringFormat::Literal)
    }

    pub fn enum_variant(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::String(..) => "String",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(b) => Ok(*b),
            _ => Err(Error::ObjectType {
                expected: "Boolean",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(i) => Ok(*i),
            Object::Real(f) => Ok(*f as i64),
            _ => Err(Error::ObjectType {
                expected: "Integer",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(f) => Ok(*f),
            _ => Err(Error::ObjectType {
                expected: "Real",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(n) => Ok(n),
            _ => Err(Error::ObjectType {
                expected: "Name",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_name_str(&self) -> Result<&str> {
        self.as_name()
            .and_then(|n| std::str::from_utf8(n).map_err(|_| Error::InvalidObject("name is not valid UTF-8".into())))
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(Error::ObjectType {
                expected: "String",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            _ => Err(Error::ObjectType {
                expected: "Reference",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_array(&self) -> Result<&[Object]> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::ObjectType {
                expected: "Array",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::ObjectType {
                expected: "Array",
                found: "other",
            }),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&s.dict),
            _ => Err(Error::ObjectType {
                expected: "Dictionary",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&mut s.dict),
            _ => Err(Error::ObjectType {
                expected: "Dictionary",
                found: "other",
            }),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::ObjectType {
                expected: "Stream",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::ObjectType {
                expected: "Stream",
                found: "other",
            }),
        }
    }
}

impl From<bool> for Object {
    fn from(v: bool) -> Self {
        Object::Boolean(v)
    }
}
impl From<i64> for Object {
    fn from(v: i64) -> Self {
        Object::Integer(v)
    }
}
impl From<f64> for Object {
    fn from(v: f64) -> Self {
        Object::Real(v)
    }
}
impl From<&str> for Object {
    fn from(v: &str) -> Self {
        Object::Name(v.as_bytes().to_vec())
    }
}
impl From<Vec<Object>> for Object {
    fn from(v: Vec<Object>) -> Self {
        Object::Array(v)
    }
}
impl From<Dictionary> for Object {
    fn from(v: Dictionary) -> Self {
        Object::Dictionary(v)
    }
}
impl From<Stream> for Object {
    fn from(v: Stream) -> Self {
        Object::Stream(v)
    }
}
impl From<ObjectId> for Object {
    fn from(v: ObjectId) -> Self {
        Object::Reference(v)
    }
}

/// A stream object: its dictionary, plus raw (still-encoded) bytes.
///
/// `start_position` is set by the parser when the `Length` entry could not be
/// resolved at parse time (an indirect forward reference, or a missing/wrong
/// value) so that the content can be filled in later once the xref table and
/// sibling objects are available (spec.md 4.4, "If `Length` is wrong or
/// missing, scans forward to `endstream` and corrects").
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
    /// Offset of the raw stream body relative to the start of the indirect
    /// object, set when the content had to be filled in after the fact.
    pub start_position: Option<usize>,
    /// Whether `content` has already been filter-decoded.
    pub allows_compression: bool,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        Stream {
            dict,
            content,
            start_position: None,
            allows_compression: true,
        }
    }

    pub fn with_position(dict: Dictionary, position: usize) -> Self {
        Stream {
            dict,
            content: Vec::new(),
            start_position: Some(position),
            allows_compression: true,
        }
    }

    pub fn set_content(&mut self, content: Vec<u8>) {
        self.content = content;
        self.start_position = None;
    }

    /// Run the stream's declared filter chain in the decode direction
    /// (component C2), returning the user-visible bytes.
    pub fn decompressed_content(&self) -> Result<Vec<u8>> {
        crate::filters::decode_stream(&self.dict, &self.content)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Null => write!(f, "null"),
            Object::Boolean(b) => write!(f, "{b}"),
            Object::Integer(i) => write!(f, "{i}"),
            Object::Real(r) => write!(f, "{r}"),
            Object::Name(n) => write!(f, "/{}", String::from_utf8_lossy(n)),
            Object::String(s, _) => write!(f, "({})", String::from_utf8_lossy(s)),
            Object::Array(_) => write!(f, "[array]"),
            Object::Dictionary(_) => write!(f, "<<dictionary>>"),
            Object::Stream(_) => write!(f, "<<stream>>"),
            Object::Reference((oid, gen)) => write!(f, "{oid} {gen} R"),
        }
    }
}
