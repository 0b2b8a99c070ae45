//! A low-level PDF object system: tokenizer, filter pipeline, object model,
//! parser, cross-reference handling, object streams, revisions, a document
//! facade, and a serializer.
//!
//! This crate deliberately stops at the object layer: page-tree walking,
//! content-stream operator decoding, font/encoding tables, and cipher
//! implementations are left to a higher layer built on top of [`Document`].

pub mod config;
pub mod dictionary;
pub mod document;
pub mod error;
pub mod filters;
pub mod object;
pub mod object_stream;
pub mod parser;
pub mod rectangle;
pub mod revision;
pub mod security;
pub mod serializer;
pub mod tokenizer;
pub mod type_registry;
pub mod xref;

pub use config::Config;
pub use dictionary::Dictionary;
pub use document::{Addable, DeleteScope, Document, ObjectHandle};
pub use error::{Error, ParseError, Result, UsageError, ValidationError, XrefError};
pub use object::{Object, ObjectId, Stream, StringFormat};
pub use rectangle::Rectangle;
pub use security::SecurityHandler;
pub use type_registry::{PdfObjectType, TypeRegistry};
pub use xref::{XrefEntry, XrefSection};
