//! Crate-wide error taxonomy (spec.md §7).
//!
//! One top-level `Error` with nested per-subsystem enums, the same shape the
//! teacher crate uses (`Error` wrapping `ParseError`/`XrefError`).

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Xref(#[from] XrefError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    /// Syntactically valid object that is semantically impossible, e.g. a
    /// stream whose dictionary is missing.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("unsupported encryption: {0}")]
    UnsupportedEncryption(String),

    #[error("object {0:?} not found")]
    ObjectNotFound(crate::object::ObjectId),

    #[error("wrong object type: expected {expected}, found {found}")]
    ObjectType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("reference cycle detected resolving object {0:?}")]
    ReferenceCycle(crate::object::ObjectId),

    #[error("feature not implemented: {0}")]
    Unimplemented(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid file header")]
    InvalidFileHeader,

    #[error("malformed PDF at byte {pos}: {message}")]
    Malformed { pos: usize, message: String },

    #[error("unexpected end of input")]
    EndOfInput,

    #[error("indirect object at offset {offset} could not be parsed")]
    IndirectObject { offset: usize },

    #[error("object id in body does not match xref-declared id")]
    ObjectIdMismatch,

    #[error("literal string nesting exceeds the allowed depth")]
    StringNestingTooDeep,

    #[error("invalid cross-reference table")]
    InvalidXref,

    #[error("invalid trailer dictionary")]
    InvalidTrailer,

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("filter stream decode error: {0}")]
    FilterError(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XrefError {
    #[error("could not locate startxref / %%EOF")]
    Start,

    #[error("Prev offset in trailer is out of range")]
    PrevStart,

    #[error("XRefStm offset in trailer is out of range")]
    StreamStart,

    #[error("xref entry missing for requested object")]
    MissingEntry,

    #[error("could not reconstruct a cross-reference table for this file")]
    ReconstructionFailed,

    #[error("reconstruction could not locate the document Catalog")]
    CatalogNotFound,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required key {0} is missing")]
    MissingKey(&'static str),

    #[error("{0}")]
    Correctable(String),

    #[error("{0}")]
    Fatal(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("object already belongs to a different document")]
    DifferentDocument,

    #[error("object id {0:?} is already occupied by a different wrapper")]
    OidCollision(crate::object::ObjectId),

    #[error("cannot import an object that originates from this same document")]
    ForeignDocument,
}
