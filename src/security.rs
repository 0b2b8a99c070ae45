//! Security handler contract (spec.md §6.2). The core calls through this
//! trait only; no concrete cipher is implemented here — that belongs to a
//! higher layer the spec treats as an external collaborator.

use crate::error::Result;
use crate::object::{ObjectId, Stream};

pub trait SecurityHandler: std::fmt::Debug + Send + Sync {
    /// Encrypt a string's bytes given the indirect object that owns it.
    fn encrypt_string(&self, bytes: &[u8], owning_object: ObjectId) -> Result<Vec<u8>>;

    /// Produce a chunk-yielding encoder for a stream's bytes.
    fn encrypt_stream(&self, stream: &Stream, owning_object: ObjectId) -> Result<Vec<u8>>;

    /// Decrypt an already-parsed object's strings/stream in place.
    fn decrypt(&self, id: ObjectId, bytes: &[u8]) -> Result<Vec<u8>>;

    fn encryption_key_valid(&self) -> bool;
}
