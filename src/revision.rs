//! One generation of a document, and the ordered set of all of them
//! (spec.md §3.4, §4.7, component C7).
//!
//! A `Revision`'s cache uses a `Mutex` rather than the `RefCell` its
//! single-threaded framing in spec.md would suggest: `Document::validate`
//! walks objects with an optional `rayon` data-parallel iterator (spec.md
//! §9's "global configuration" note generalized to this bulk walk), which
//! needs `&Document: Sync`. A `Mutex` still serializes access — it costs
//! nothing extra on the non-`rayon` path and makes the `rayon` path sound
//! without a wrapping `unsafe impl Sync`.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::dictionary::Dictionary;
use crate::object::{Object, ObjectId};
use crate::xref::{XrefEntry, XrefSection};

#[derive(Debug, Default)]
pub struct Revision {
    trailer: Dictionary,
    xref: XrefSection,
    cache: Mutex<HashMap<ObjectId, Object>>,
}

impl Clone for Revision {
    fn clone(&self) -> Self {
        Revision {
            trailer: self.trailer.clone(),
            xref: self.xref.clone(),
            cache: Mutex::new(self.cache.lock().expect("revision cache mutex poisoned").clone()),
        }
    }
}

impl Revision {
    pub fn new(trailer: Dictionary, xref: XrefSection) -> Self {
        Revision { trailer, xref, cache: Mutex::new(HashMap::new()) }
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    pub fn xref(&self) -> &XrefSection {
        &self.xref
    }

    pub fn xref_mut(&mut self) -> &mut XrefSection {
        &mut self.xref
    }

    /// A clone of the cached value for `id`, if this revision has already
    /// loaded it.
    pub fn cached(&self, id: ObjectId) -> Option<Object> {
        self.cache.lock().expect("revision cache mutex poisoned").get(&id).cloned()
    }

    pub fn cache(&self, id: ObjectId, value: Object) {
        self.cache.lock().expect("revision cache mutex poisoned").insert(id, value);
    }

    fn uncache(&self, id: ObjectId) {
        self.cache.lock().expect("revision cache mutex poisoned").remove(&id);
    }

    /// The xref entry for `id`, if this revision has an entry for that
    /// object number whose generation matches. A generation mismatch means
    /// "this revision doesn't know this identity" rather than an error —
    /// the caller (`Document`/`Revisions`) falls back to an older revision.
    pub fn entry_for(&self, id: ObjectId) -> Option<XrefEntry> {
        let entry = self.xref.get(id.0)?;
        let gen = match entry {
            XrefEntry::Free { gen, .. } => gen,
            XrefEntry::InUse { gen, .. } => gen,
            XrefEntry::Compressed { .. } => 0,
        };
        (gen == id.1).then_some(entry)
    }

    /// Registers a freshly-created or already-resolved direct object as an
    /// in-use entry with no on-disk offset yet (assigned at write time).
    pub fn add(&mut self, id: ObjectId, value: Object) {
        self.xref.insert(id.0, XrefEntry::InUse { gen: id.1, offset: 0 });
        self.cache(id, value);
    }

    /// Removes `id`; when `mark_as_free` is set the oid keeps a skeleton
    /// free-list entry (next generation, spec.md §4.8) instead of
    /// disappearing entirely.
    pub fn delete(&mut self, id: ObjectId, mark_as_free: bool) {
        if mark_as_free {
            self.xref.insert(id.0, XrefEntry::Free { next_free_oid: 0, gen: id.1.wrapping_add(1) });
        } else {
            self.xref.remove(id.0);
        }
        self.uncache(id);
    }

    pub fn next_free_oid(&self) -> u32 {
        self.xref.next_free_oid()
    }

    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.xref.object_ids()
    }
}

/// All generations of one document, oldest first (spec.md §3.5, §4.7).
#[derive(Debug, Clone, Default)]
pub struct Revisions {
    pub items: Vec<Revision>,
}

impl Revisions {
    pub fn new() -> Self {
        Revisions { items: Vec::new() }
    }

    pub fn push(&mut self, revision: Revision) {
        self.items.push(revision);
    }

    pub fn newest(&self) -> Option<&Revision> {
        self.items.last()
    }

    pub fn newest_mut(&mut self) -> &mut Revision {
        if self.items.is_empty() {
            self.items.push(Revision::default());
        }
        self.items.last_mut().expect("just ensured non-empty")
    }

    /// `max(rev.next_free_oid for rev in all)`, so a freshly assigned
    /// object number never collides with any known object in any
    /// revision (spec.md §4.7).
    pub fn next_oid(&self) -> u32 {
        self.items.iter().map(Revision::next_free_oid).max().unwrap_or(1).max(1)
    }

    /// Collapses a contiguous slice of revisions into one, newest entries
    /// winning per oid (spec.md §4.7 `merge`). The merged revision keeps
    /// the trailer of the newest revision in the range.
    pub fn merge(&mut self, range: std::ops::Range<usize>) {
        if range.len() < 2 || range.end > self.items.len() {
            return;
        }
        let mut iter = self.items.drain(range.clone()).rev();
        let mut merged = iter.next().expect("range.len() >= 2");
        for older in iter {
            merged.xref.merge_older(&older.xref);
            let older_cache = older.cache.into_inner().expect("revision cache mutex poisoned");
            let mut merged_cache = merged.cache.lock().expect("revision cache mutex poisoned");
            for (id, value) in older_cache {
                merged_cache.entry(id).or_insert(value);
            }
        }
        drop(iter);
        self.items.insert(range.start, merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_free_entry_requires_matching_generation() {
        let mut xref = XrefSection::new();
        xref.insert(3, XrefEntry::InUse { gen: 0, offset: 10 });
        let rev = Revision::new(Dictionary::new(), xref);
        assert!(rev.entry_for((3, 0)).is_some());
        assert!(rev.entry_for((3, 1)).is_none());
    }

    #[test]
    fn next_oid_is_max_across_revisions() {
        let mut revs = Revisions::new();
        let mut xref_a = XrefSection::new();
        xref_a.insert(2, XrefEntry::InUse { gen: 0, offset: 0 });
        revs.push(Revision::new(Dictionary::new(), xref_a));
        let mut xref_b = XrefSection::new();
        xref_b.insert(9, XrefEntry::InUse { gen: 0, offset: 0 });
        revs.push(Revision::new(Dictionary::new(), xref_b));
        assert_eq!(revs.next_oid(), 10);
    }

    #[test]
    fn merge_keeps_newer_entries() {
        let mut revs = Revisions::new();
        let mut older = XrefSection::new();
        older.insert(1, XrefEntry::InUse { gen: 0, offset: 10 });
        revs.push(Revision::new(Dictionary::new(), older));
        let mut newer = XrefSection::new();
        newer.insert(1, XrefEntry::InUse { gen: 0, offset: 99 });
        revs.push(Revision::new(Dictionary::new(), newer));

        revs.merge(0..2);
        assert_eq!(revs.items.len(), 1);
        assert_eq!(revs.items[0].entry_for((1, 0)), Some(XrefEntry::InUse { gen: 0, offset: 99 }));
    }
}
