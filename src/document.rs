//! Document facade (spec.md §3.5, §4.8, component C8): orchestrates
//! revisions, the parser, and the serializer behind a single owning type.
//!
//! Grounded in the teacher's `Reader::read` for the load-time xref/`Prev`
//! chain walk (cycle guard via a visited-offsets set, hybrid `XRefStm`
//! handling, `Size` correction with a `log::warn!`) and in its
//! `#[cfg(feature = "rayon")]` / serial split for bulk object work, applied
//! here to `Document::validate`.

use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::warn;

use crate::config::Config;
use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError, Result, UsageError, XrefError};
use crate::object::{Object, ObjectId, Stream};
use crate::object_stream::ObjectStream;
use crate::parser;
use crate::revision::{Revision, Revisions};
use crate::security::SecurityHandler;
use crate::tokenizer::Tokenizer;
use crate::type_registry::{PdfObjectType, TypeRegistry};
use crate::xref::XrefEntry;

static NEXT_DOCUMENT_TAG: AtomicU64 = AtomicU64::new(1);

fn next_document_tag() -> u64 {
    NEXT_DOCUMENT_TAG.fetch_add(1, Ordering::Relaxed)
}

/// A lightweight proof that an [`Object`] has already been registered with
/// a particular [`Document`] under a given id — the closest stand-in for
/// "already wrapped by this document" without a live class hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    id: ObjectId,
    document_tag: u64,
}

impl ObjectHandle {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn as_reference(&self) -> Object {
        Object::Reference(self.id)
    }
}

enum AddTarget {
    Direct(Object),
    Existing(ObjectHandle),
}

/// Anything `Document::add` accepts: a brand-new value, or a handle
/// previously returned by this same document.
pub trait Addable {
    fn into_add_target(self) -> AddTarget;
}

impl Addable for Object {
    fn into_add_target(self) -> AddTarget {
        AddTarget::Direct(self)
    }
}

impl Addable for ObjectHandle {
    fn into_add_target(self) -> AddTarget {
        AddTarget::Existing(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    /// Only the newest revision.
    Current,
    /// Every revision that has an entry for the id.
    All,
}

pub struct Document {
    /// Raw bytes this document was loaded from; empty for a document built
    /// in memory from scratch.
    buffer: Vec<u8>,
    pub revisions: Revisions,
    pub version: String,
    pub security_handler: Option<Box<dyn SecurityHandler>>,
    pub config: Config,
    type_registry: TypeRegistry,
    class_of: Mutex<std::collections::HashMap<ObjectId, Arc<dyn PdfObjectType>>>,
    import_cache: Mutex<std::collections::HashMap<(u64, ObjectId), ObjectId>>,
    tag: u64,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("version", &self.version)
            .field("revisions", &self.revisions.items.len())
            .field("tag", &self.tag)
            .finish()
    }
}

impl Clone for Document {
    fn clone(&self) -> Self {
        Document {
            buffer: self.buffer.clone(),
            revisions: self.revisions.clone(),
            version: self.version.clone(),
            security_handler: None,
            config: Config::default(),
            type_registry: TypeRegistry::default(),
            class_of: Mutex::new(self.class_of.lock().expect("class_of mutex poisoned").clone()),
            import_cache: Mutex::new(std::collections::HashMap::new()),
            tag: self.tag,
        }
    }
}

impl Document {
    /// A fresh, empty document: one empty revision, no backing bytes.
    pub fn new() -> Self {
        let mut revisions = Revisions::new();
        revisions.push(Revision::new(Dictionary::new(), crate::xref::XrefSection::new()));
        Document {
            buffer: Vec::new(),
            revisions,
            version: "1.7".to_string(),
            security_handler: None,
            config: Config::default(),
            type_registry: TypeRegistry::default(),
            class_of: Mutex::new(std::collections::HashMap::new()),
            import_cache: Mutex::new(std::collections::HashMap::new()),
            tag: next_document_tag(),
        }
    }

    pub fn load(bytes: &[u8]) -> Result<Document> {
        Document::load_with_config(bytes, Config::default())
    }

    /// Parses a complete PDF file: header, the `startxref`/`Prev` chain of
    /// revisions (each revision's hybrid `XRefStm` merged in), falling back
    /// to whole-file reconstruction when the chain can't be followed and
    /// `config.try_xref_reconstruction` allows it (spec.md §4.4, §4.7).
    pub fn load_with_config(bytes: &[u8], config: Config) -> Result<Document> {
        let buffer = bytes.to_vec();
        let version = read_header_version(&buffer).unwrap_or_else(|_| "1.4".to_string());

        let chain_result = load_revision_chain(&buffer, &config);
        let revisions = match chain_result {
            Ok(revisions) => revisions,
            Err(err) if config.try_xref_reconstruction => {
                warn!("xref chain failed ({err}); reconstructing from object headers");
                let reconstructed = parser::reconstruct_revision(&buffer)?;
                let mut revisions = Revisions::new();
                revisions.push(Revision::new(reconstructed.trailer, reconstructed.section));
                revisions
            }
            Err(err) => return Err(err),
        };

        let document = Document {
            buffer,
            revisions,
            version,
            security_handler: None,
            config,
            type_registry: TypeRegistry::default(),
            class_of: Mutex::new(std::collections::HashMap::new()),
            import_cache: Mutex::new(std::collections::HashMap::new()),
            tag: next_document_tag(),
        };

        if document.config.auto_decrypt && document.trailer().has(b"Encrypt") && document.security_handler.is_none() {
            // A security handler is supplied by a higher layer (spec.md
            // §6.2); the core only notes that encrypted strings/streams
            // will read back encrypted until one is installed.
            warn!("document trailer has /Encrypt but no SecurityHandler is installed");
        }

        Ok(document)
    }

    /// Bytes this document was parsed from (empty for an in-memory
    /// document); used by incremental-update writing to locate the
    /// original `startxref` and append after the original content.
    pub(crate) fn raw_buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn trailer(&self) -> &Dictionary {
        self.revisions.newest().expect("Document always has at least one revision").trailer()
    }

    pub fn catalog(&self) -> Result<Object> {
        let root = self.trailer().get(b"Root").and_then(Object::as_reference)?;
        self.object(root)
    }

    /// The `/Pages` entry of the Catalog. Walking the page tree itself is
    /// out of scope (spec.md §1 Non-goals); this is the thin accessor a
    /// higher layer would build a page walker on top of.
    pub fn pages(&self) -> Result<Object> {
        let root = self.catalog()?.as_dict()?.get(b"Pages").and_then(Object::as_reference)?;
        self.object(root)
    }

    pub fn info(&self) -> Option<Object> {
        let info_ref = self.trailer().get(b"Info").and_then(Object::as_reference).ok()?;
        self.object(info_ref).ok()
    }

    /// `max(file-header version, Catalog /Version)` (spec.md §4.8).
    pub fn version(&self) -> String {
        let catalog_version = self
            .catalog()
            .ok()
            .and_then(|c| c.as_dict().ok().cloned())
            .and_then(|dict| dict.get(b"Version").ok().and_then(Object::as_name).map(|n| String::from_utf8_lossy(n).into_owned()));

        match catalog_version {
            Some(v) if version_order(&v) > version_order(&self.version) => v,
            _ => self.version.clone(),
        }
    }

    /// Resolves an indirect reference to its value, consulting the newest
    /// revision first and falling back through older ones (spec.md §4.7,
    /// §4.8 lookup order).
    pub fn object(&self, id: ObjectId) -> Result<Object> {
        for revision in self.revisions.items.iter().rev() {
            if let Some(cached) = revision.cached(id) {
                return Ok(cached);
            }
            if let Some(entry) = revision.entry_for(id) {
                let value = self.load_entry(id, entry)?;
                revision.cache(id, value.clone());
                return Ok(value);
            }
        }
        Err(Error::ObjectNotFound(id))
    }

    fn load_entry(&self, id: ObjectId, entry: XrefEntry) -> Result<Object> {
        match entry {
            XrefEntry::Free { .. } => Ok(Object::Null),
            XrefEntry::InUse { offset, .. } => {
                let mut tokenizer = Tokenizer::new(&self.buffer);
                let mut resolver = |ref_id: ObjectId| self.object(ref_id).ok().and_then(|o| o.as_i64().ok());
                let mut on_correctable = |_: &str, _: usize| false;
                let indirect = parser::parse_indirect_object(&mut tokenizer, offset as usize, &mut resolver, &mut on_correctable)
                    .map_err(|_| Error::Parse(ParseError::IndirectObject { offset: offset as usize }))?;
                if indirect.id.0 != id.0 {
                    warn!("object body at offset {offset} declares id {:?}, xref expected {:?}", indirect.id, id);
                }
                Ok(indirect.value)
            }
            XrefEntry::Compressed { container_oid, index_within } => {
                let container = self.object((container_oid, 0))?;
                let stream = container.as_stream()?;
                let object_stream = ObjectStream::parse(stream)?;
                object_stream.object_at(index_within as usize)
            }
        }
    }

    /// Follows `value` one level if it is a `Reference`; returns any other
    /// value unchanged (spec.md §4.8 `deref`).
    pub fn deref(&self, value: &Object) -> Result<Object> {
        match value {
            Object::Reference(id) => self.object(*id),
            other => Ok(other.clone()),
        }
    }

    /// Overwrites the value stored for an already-known id, in whichever
    /// revision currently holds it.
    pub fn set_object(&mut self, id: ObjectId, value: Object) -> Result<()> {
        for revision in self.revisions.items.iter_mut().rev() {
            if revision.entry_for(id).is_some() || revision.cached(id).is_some() {
                revision.add(id, value);
                return Ok(());
            }
        }
        Err(Error::ObjectNotFound(id))
    }

    /// Registers `target` as an indirect object. A fresh [`Object`] is
    /// assigned a new oid in the newest (or `revision`-th) revision; an
    /// already-issued [`ObjectHandle`] from *this* document is returned
    /// unchanged, and one from a different document is refused (spec.md
    /// §4.8 `add`).
    pub fn add(&mut self, target: impl Addable, revision: Option<usize>) -> Result<ObjectHandle> {
        match target.into_add_target() {
            AddTarget::Existing(handle) => {
                if handle.document_tag != self.tag {
                    return Err(UsageError::DifferentDocument.into());
                }
                Ok(handle)
            }
            AddTarget::Direct(value) => {
                let oid = self.revisions.next_oid();
                let id = (oid, 0);
                let class = self.type_registry.resolve(&value, None, None);
                self.class_of.lock().expect("class_of mutex poisoned").insert(id, class);
                let idx = revision.unwrap_or(self.revisions.items.len().saturating_sub(1));
                match self.revisions.items.get_mut(idx) {
                    Some(rev) => rev.add(id, value),
                    None => self.revisions.newest_mut().add(id, value),
                }
                Ok(ObjectHandle { id, document_tag: self.tag })
            }
        }
    }

    /// Removes `id` (spec.md §4.8 `delete`): either from every revision
    /// that mentions it, or only the newest one.
    pub fn delete(&mut self, id: ObjectId, scope: DeleteScope, mark_as_free: bool) {
        match scope {
            DeleteScope::Current => self.revisions.newest_mut().delete(id, mark_as_free),
            DeleteScope::All => {
                for revision in self.revisions.items.iter_mut() {
                    revision.delete(id, mark_as_free);
                }
            }
        }
        self.class_of.lock().expect("class_of mutex poisoned").remove(&id);
    }

    /// Deep-copies `value` (which may belong to `source`, a different
    /// document) into `self`, assigning fresh oids and memoizing by source
    /// id so repeated or cyclic references import once (spec.md §4.8
    /// `import`). Refuses to import a source document's own Catalog or
    /// page-tree root.
    pub fn import(&mut self, source: &Document, value: &Object) -> Result<Object> {
        self.import_inner(source, value)
    }

    fn import_inner(&mut self, source: &Document, value: &Object) -> Result<Object> {
        match value {
            Object::Reference(id) => {
                if let Some(&dest_id) = self.import_cache.lock().expect("import_cache mutex poisoned").get(&(source.tag, *id)) {
                    return Ok(Object::Reference(dest_id));
                }
                let source_value = source.object(*id)?;
                if is_catalog_or_pages(&source_value) {
                    return Err(UsageError::ForeignDocument.into());
                }
                let dest_oid = self.revisions.next_oid();
                let dest_id = (dest_oid, 0);
                self.import_cache.lock().expect("import_cache mutex poisoned").insert((source.tag, *id), dest_id);
                let imported_value = self.import_inner(source, &source_value)?;
                self.revisions.newest_mut().add(dest_id, imported_value);
                Ok(Object::Reference(dest_id))
            }
            Object::Array(items) => {
                let imported = items.iter().map(|item| self.import_inner(source, item)).collect::<Result<Vec<_>>>()?;
                Ok(Object::Array(imported))
            }
            Object::Dictionary(dict) => {
                let mut out = Dictionary::new();
                for (key, item) in dict.iter() {
                    out.set(key.to_vec(), self.import_inner(source, item)?);
                }
                Ok(Object::Dictionary(out))
            }
            Object::Stream(stream) => {
                let mut dict = Dictionary::new();
                for (key, item) in stream.dict.iter() {
                    dict.set(key.to_vec(), self.import_inner(source, item)?);
                }
                let mut imported = Stream::new(dict, stream.content.clone());
                imported.allows_compression = stream.allows_compression;
                Ok(Object::Stream(imported))
            }
            other => Ok(other.clone()),
        }
    }

    /// Chooses a class for `value` without registering it, honoring
    /// explicit hints ahead of `/Type`/`/Subtype` (spec.md §4.8 `wrap`).
    pub fn wrap(&self, value: &Object, type_hint: Option<&[u8]>, subtype_hint: Option<&[u8]>) -> Arc<dyn PdfObjectType> {
        self.type_registry.resolve(value, type_hint, subtype_hint)
    }

    /// The class last associated with `id` via [`Document::add`] or
    /// [`Document::wrap`]-then-register, if any.
    pub fn class_of(&self, id: ObjectId) -> Option<Arc<dyn PdfObjectType>> {
        self.class_of.lock().expect("class_of mutex poisoned").get(&id).cloned()
    }

    pub fn register_type(&mut self, name: impl Into<Vec<u8>>, class: Arc<dyn PdfObjectType>) {
        self.type_registry.register_type(name, class);
    }

    pub fn register_subtype(&mut self, name: impl Into<Vec<u8>>, class: Arc<dyn PdfObjectType>) {
        self.type_registry.register_subtype(name, class);
    }

    /// Iterates known objects newest revision first. With `current`, each
    /// oid is yielded once (its newest live version); without it, every
    /// stored version across every revision is yielded, newest first. Free
    /// placeholders are skipped either way (spec.md §4.8 `each`).
    pub fn each(&self, current: bool) -> Result<Vec<(ObjectId, Object)>> {
        let mut out = Vec::new();
        let mut seen_oid = HashSet::new();
        for revision in self.revisions.items.iter().rev() {
            for id in revision.object_ids() {
                let Some(entry) = revision.entry_for(id) else { continue };
                if entry.is_free() {
                    continue;
                }
                if current && !seen_oid.insert(id.0) {
                    continue;
                }
                let value = match revision.cached(id) {
                    Some(cached) => cached,
                    None => {
                        let value = self.load_entry(id, entry)?;
                        revision.cache(id, value.clone());
                        value
                    }
                };
                out.push((id, value));
            }
        }
        Ok(out)
    }

    /// Validates every live object via its wrapped class, optionally
    /// correcting in place. With the `rayon` feature, validation runs over
    /// a parallel iterator the same way the teacher's bulk object load does
    /// (spec.md §5, §9).
    pub fn validate(&mut self, auto_correct: bool) -> Result<()> {
        let entries = self.each(true)?;

        #[cfg(feature = "rayon")]
        let outcomes: Vec<Result<(ObjectId, Option<Object>)>> = {
            use rayon::prelude::*;
            entries.par_iter().map(|(id, value)| self.validate_one(*id, value, auto_correct)).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let outcomes: Vec<Result<(ObjectId, Option<Object>)>> =
            entries.iter().map(|(id, value)| self.validate_one(*id, value, auto_correct)).collect();

        for outcome in outcomes {
            let (id, fixed) = outcome?;
            if let Some(value) = fixed {
                self.set_object(id, value)?;
            }
        }
        Ok(())
    }

    fn validate_one(&self, id: ObjectId, value: &Object, auto_correct: bool) -> Result<(ObjectId, Option<Object>)> {
        let class = self.wrap(value, None, None);
        let mut on_problem = |correctable: bool, message: &str| if correctable { self.config.should_raise(message, 0) } else { true };
        let fixed = class.validate(value, auto_correct, &mut on_problem)?;
        Ok((id, fixed))
    }

    /// Runs a named transformation registered in `config.task_map` against
    /// this document (spec.md §6.4 `task_map`).
    pub fn run_task(&mut self, name: &str) -> Result<()> {
        let task = self.config.task_map.remove(name).ok_or(Error::Unimplemented("unregistered task"))?;
        let result = task(self);
        self.config.task_map.insert(name.to_string(), task);
        result
    }

    /// Serializes every live object, a fresh xref section, and the trailer
    /// to `sink` (spec.md §4.8 `write`, §4.9, §6.1). Always produces a
    /// complete, self-contained file rather than an incremental update;
    /// see [`Document::append_update`] for the incremental form.
    pub fn write<W: Write>(&mut self, sink: &mut W, validate: bool, update_fields: bool) -> Result<()> {
        if update_fields {
            self.update_trailer_fields();
        }
        if validate {
            self.validate(true)?;
        }
        crate::serializer::write_full(self, sink)
    }

    pub fn save_to<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        self.write(sink, true, true)
    }

    /// Appends an incremental update (spec.md §6.1 "Incremental update"):
    /// only objects the newest revision owns are (re)written, followed by a
    /// cross-reference stream/table whose `/Prev` points at the original
    /// file's last `startxref`. Only valid for a document that was loaded
    /// from bytes (`self.buffer` non-empty).
    pub fn append_update<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        if self.buffer.is_empty() {
            return Err(Error::Unimplemented("append_update requires a document loaded from bytes"));
        }
        self.update_trailer_fields();
        sink.write_all(&self.buffer)?;
        crate::serializer::write_incremental(self, sink)
    }

    fn update_trailer_fields(&mut self) {
        let id_array = {
            let existing_first = self
                .trailer()
                .get(b"ID")
                .and_then(Object::as_array)
                .ok()
                .and_then(|arr| arr.first().cloned())
                .and_then(|o| o.as_str().map(|s| s.to_vec()).ok());
            let first = existing_first.unwrap_or_else(|| self.fingerprint(b"first"));
            let second = self.fingerprint(b"second");
            Object::Array(vec![Object::string_literal(first), Object::string_literal(second)])
        };
        self.revisions.newest_mut().trailer_mut().set("ID", id_array);

        #[cfg(feature = "chrono")]
        if let Ok(info_ref) = self.trailer().get(b"Info").and_then(Object::as_reference) {
            if let Ok(mut info) = self.object(info_ref) {
                if let Ok(dict) = info.as_dict_mut() {
                    dict.set("ModDate", Object::string_literal(crate::serializer::format_pdf_date(chrono::Utc::now())));
                    let _ = self.set_object(info_ref, info);
                }
            }
        }
    }

    /// A cheap, deterministic 16-byte fingerprint used for the trailer
    /// `/ID` when no better source is available. Not a cryptographic hash;
    /// PDF only requires the two halves to be practically unique.
    fn fingerprint(&self, salt: &[u8]) -> Vec<u8> {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        salt.hash(&mut hasher);
        self.buffer.len().hash(&mut hasher);
        self.revisions.items.len().hash(&mut hasher);
        let first_half = hasher.finish();
        first_half.hash(&mut hasher);
        let second_half = hasher.finish();
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&first_half.to_be_bytes());
        out.extend_from_slice(&second_half.to_be_bytes());
        out
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

fn is_catalog_or_pages(value: &Object) -> bool {
    value.as_dict().map(|d| d.has_type(b"Catalog") || d.has_type(b"Pages")).unwrap_or(false)
}

/// Orders `"M.N"` version strings without parsing them as floats (so `1.10`
/// does not sort before `1.9`).
fn version_order(version: &str) -> (u32, u32) {
    let mut parts = version.splitn(2, '.');
    let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (major, minor)
}

fn read_header_version(buf: &[u8]) -> Result<String> {
    const MARKER: &[u8] = b"%PDF-";
    let search_window = &buf[..buf.len().min(1024)];
    let pos = search_window
        .windows(MARKER.len())
        .position(|w| w == MARKER)
        .ok_or(ParseError::InvalidFileHeader)?;
    let start = pos + MARKER.len();
    let end = buf[start..]
        .iter()
        .position(|&b| b == b'\r' || b == b'\n' || crate::tokenizer::is_whitespace(b))
        .map(|p| start + p)
        .unwrap_or(buf.len());
    std::str::from_utf8(&buf[start..end]).map(|s| s.trim().to_string()).map_err(|_| ParseError::InvalidFileHeader.into())
}

/// Walks the `startxref`/`Prev` chain, merging each revision's hybrid
/// `XRefStm` entries into that same revision (rather than its own
/// revision), and guards against a `Prev` cycle with a visited-offsets set
/// (spec.md §4.7, grounded in the teacher's `Reader::read`).
fn load_revision_chain(buffer: &[u8], config: &Config) -> Result<Revisions> {
    let mut visited = HashSet::new();
    let mut offset = parser::startxref_offset(buffer)?;
    let mut newest_first = Vec::new();

    loop {
        if !visited.insert(offset) {
            break;
        }
        let mut tokenizer = Tokenizer::new(buffer);
        let mut on_correctable = |message: &str, pos: usize| config.should_raise(message, pos);
        let mut parsed = parser::parse_xref_section_and_trailer(&mut tokenizer, offset, &mut on_correctable)?;

        if let Ok(xrefstm_offset) = parsed.trailer.get(b"XRefStm").and_then(Object::as_i64) {
            if xrefstm_offset >= 0 && (xrefstm_offset as usize) < buffer.len() && visited.insert(xrefstm_offset as usize) {
                let mut hybrid_tokenizer = Tokenizer::new(buffer);
                let mut hybrid_cb = |message: &str, pos: usize| config.should_raise(message, pos);
                if let Ok(hybrid) = parser::parse_xref_section_and_trailer(&mut hybrid_tokenizer, xrefstm_offset as usize, &mut hybrid_cb) {
                    parsed.section.merge_older(&hybrid.section);
                }
            }
        }

        let prev = parsed.trailer.get(b"Prev").and_then(Object::as_i64).ok();
        newest_first.push(parsed);

        match prev {
            Some(p) if p >= 0 && (p as usize) < buffer.len() => offset = p as usize,
            Some(_) => return Err(XrefError::PrevStart.into()),
            None => break,
        }
    }

    if newest_first.is_empty() {
        return Err(ParseError::InvalidXref.into());
    }

    let mut revisions = Revisions::new();
    for parsed in newest_first.into_iter().rev() {
        revisions.push(Revision::new(parsed.trailer, parsed.section));
    }
    Ok(revisions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    fn sample_pdf() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"%PDF-1.4\n");
        let obj1_offset = bytes.len();
        bytes.extend_from_slice(b"1 0 obj\n<</Type/Catalog/Pages 2 0 R>>\nendobj\n");
        let obj2_offset = bytes.len();
        bytes.extend_from_slice(b"2 0 obj\n<</Type/Pages/Kids[]/Count 0>>\nendobj\n");
        let xref_offset = bytes.len();
        bytes.extend_from_slice(b"xref\n0 3\n0000000000 65535 f \n");
        bytes.extend_from_slice(format!("{obj1_offset:010} 00000 n \n").as_bytes());
        bytes.extend_from_slice(format!("{obj2_offset:010} 00000 n \n").as_bytes());
        bytes.extend_from_slice(b"trailer\n<</Size 3/Root 1 0 R>>\nstartxref\n");
        bytes.extend_from_slice(format!("{xref_offset}\n").as_bytes());
        bytes.extend_from_slice(b"%%EOF");
        bytes
    }

    #[test]
    fn loads_and_resolves_catalog() {
        let doc = Document::load(&sample_pdf()).unwrap();
        let catalog = doc.catalog().unwrap();
        assert!(catalog.as_dict().unwrap().has_type(b"Catalog"));
    }

    #[test]
    fn add_assigns_fresh_oid_and_is_idempotent() {
        let mut doc = Document::new();
        let handle = doc.add(Object::Integer(42), None).unwrap();
        assert_eq!(doc.object(handle.id()).unwrap(), Object::Integer(42));
        let same = doc.add(handle, None).unwrap();
        assert_eq!(same.id(), handle.id());
    }

    #[test]
    fn add_refuses_handle_from_another_document() {
        let mut doc_a = Document::new();
        let mut doc_b = Document::new();
        let handle = doc_a.add(Object::Integer(1), None).unwrap();
        let err = doc_b.add(handle, None).unwrap_err();
        assert!(matches!(err, Error::Usage(UsageError::DifferentDocument)));
    }

    #[test]
    fn delete_then_lookup_resolves_to_null_when_marked_free() {
        let mut doc = Document::new();
        let handle = doc.add(Object::Integer(7), None).unwrap();
        doc.delete(handle.id(), DeleteScope::Current, true);
        assert_eq!(doc.object(handle.id()).unwrap(), Object::Null);
    }

    #[test]
    fn import_rejects_source_catalog() {
        let source = Document::load(&sample_pdf()).unwrap();
        let mut dest = Document::new();
        let root_ref = source.trailer().get(b"Root").unwrap().clone();
        let err = dest.import(&source, &root_ref).unwrap_err();
        assert!(matches!(err, Error::Usage(UsageError::ForeignDocument)));
    }

    #[test]
    fn import_deep_copies_array_contents() {
        let mut source = Document::new();
        let inner = source.add(dictionary! { "V" => 9 }.into(), None).unwrap();
        let array = Object::Array(vec![inner.as_reference()]);

        let mut dest = Document::new();
        let imported = dest.import(&source, &array).unwrap();
        let items = imported.as_array().unwrap();
        let imported_id = items[0].as_reference().unwrap();
        assert_eq!(dest.object(imported_id).unwrap().as_dict().unwrap().get(b"V").unwrap(), &Object::Integer(9));
    }

    #[test]
    fn each_current_yields_each_oid_once() {
        let doc = Document::load(&sample_pdf()).unwrap();
        let all = doc.each(true).unwrap();
        let mut oids: Vec<u32> = all.iter().map(|(id, _)| id.0).collect();
        oids.sort_unstable();
        oids.dedup();
        assert_eq!(oids.len(), all.len());
    }

    fn sample_pdf_with_a_second_revision_replacing_object_2() -> Vec<u8> {
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

        let obj2_offset_rev2 = bytes.len();
        bytes.extend_from_slice(b"2 0 obj\n<</Type/Pages/Kids[]/Count 1>>\nendobj\n");
        let rev2_xref_offset = bytes.len();
        bytes.extend_from_slice(b"xref\n2 1\n");
        bytes.extend_from_slice(format!("{obj2_offset_rev2:010} 00000 n \n").as_bytes());
        bytes.extend_from_slice(format!("trailer\n<</Size 3/Root 1 0 R/Prev {rev1_xref_pos}>>\nstartxref\n").as_bytes());
        bytes.extend_from_slice(format!("{rev2_xref_offset}\n").as_bytes());
        bytes.extend_from_slice(b"%%EOF");
        bytes
    }

    #[test]
    fn each_without_current_returns_each_revisions_own_stored_value() {
        let doc = Document::load(&sample_pdf_with_a_second_revision_replacing_object_2()).unwrap();
        let all = doc.each(false).unwrap();
        let object_2_values: Vec<i64> = all
            .iter()
            .filter(|(id, _)| id.0 == 2)
            .map(|(_, v)| v.as_dict().unwrap().get(b"Count").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(object_2_values, vec![1, 0]);
    }
}
