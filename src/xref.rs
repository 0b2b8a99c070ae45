//! Cross-reference section (spec.md §4.5, component C5).
//!
//! Grounded in the `BTreeMap<u32, XrefEntry>` shape used by the pack's
//! `tux-pdf-low` xref module, generalized with a `rangemap`-backed
//! subsection view for writing textual xref tables (spec.md §6.1 item 3).

use std::collections::BTreeMap;

use rangemap::RangeSet;

use crate::object::ObjectId;

/// One entry in a cross-reference section (spec.md §3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Head/link of the free list; `next_free_oid` is the `f`-line's first
    /// field, reused by generation-bumped reallocation.
    Free { next_free_oid: u32, gen: u16 },
    /// Directly addressable object at a byte offset within its revision.
    InUse { gen: u16, offset: u64 },
    /// An object embedded in an object stream (spec.md §4.6); generation is
    /// always 0 for compressed entries.
    Compressed { container_oid: u32, index_within: u32 },
}

impl XrefEntry {
    pub fn is_free(&self) -> bool {
        matches!(self, XrefEntry::Free { .. })
    }
}

/// Sorted map from object number to its most authoritative entry within one
/// revision.
#[derive(Debug, Clone, Default)]
pub struct XrefSection {
    entries: BTreeMap<u32, XrefEntry>,
    /// `/Size` from the trailer: one past the highest object number this
    /// section claims to know about.
    pub size: u32,
}

impl XrefSection {
    pub fn new() -> Self {
        XrefSection { entries: BTreeMap::new(), size: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or overwrite the entry for `oid`. The "zero entry" (oid 0) is
    /// the canonical head of the free list; callers that parse a literal
    /// xref table strip it before populating a `Revision` so reconstruction
    /// logic can always supply a clean one (spec.md §4.5).
    pub fn insert(&mut self, oid: u32, entry: XrefEntry) {
        if oid == 0 {
            return;
        }
        self.entries.insert(oid, entry);
        if oid >= self.size {
            self.size = oid + 1;
        }
    }

    pub fn get(&self, oid: u32) -> Option<XrefEntry> {
        self.entries.get(&oid).copied()
    }

    pub fn remove(&mut self, oid: u32) -> Option<XrefEntry> {
        self.entries.remove(&oid)
    }

    pub fn contains(&self, oid: u32) -> bool {
        self.entries.contains_key(&oid)
    }

    pub fn max_oid(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    /// One past the highest object number known to any entry, used to
    /// allocate the next fresh object number (spec.md §3.5 `next_oid`).
    pub fn next_free_oid(&self) -> u32 {
        self.max_oid().saturating_add(1).max(self.size)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, XrefEntry)> + '_ {
        self.entries.iter().map(|(&oid, &e)| (oid, e))
    }

    /// Merge `other` into `self`; entries already present in `self` win
    /// (callers are expected to merge *earlier* revisions into *later*
    /// ones, so the later, already-present entry survives — spec.md §4.5:
    /// "bulk merge from another section (later overrides earlier)").
    pub fn merge_older(&mut self, other: &XrefSection) {
        for (oid, entry) in other.iter() {
            self.entries.entry(oid).or_insert(entry);
        }
        self.size = self.size.max(other.size);
    }

    /// Maximal runs of consecutive object numbers, in sorted order, as
    /// needed to write `start count` subsection headers in a textual xref
    /// table (spec.md §4.5, §6.1 item 3).
    pub fn subsections(&self) -> Vec<(u32, u32)> {
        let mut set: RangeSet<u32> = RangeSet::new();
        for &oid in self.entries.keys() {
            set.insert(oid..oid + 1);
        }
        set.iter().map(|r| (r.start, r.end - r.start)).collect()
    }

    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.entries.iter().map(|(&oid, &e)| {
            let gen = match e {
                XrefEntry::Free { gen, .. } => gen,
                XrefEntry::InUse { gen, .. } => gen,
                XrefEntry::Compressed { .. } => 0,
            };
            (oid, gen)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsections_partition_consecutive_runs() {
        let mut section = XrefSection::new();
        for oid in [1, 2, 3, 7, 8, 10] {
            section.insert(oid, XrefEntry::InUse { gen: 0, offset: oid as u64 * 10 });
        }
        assert_eq!(section.subsections(), vec![(1, 3), (7, 2), (10, 1)]);
    }

    #[test]
    fn merge_older_keeps_newer_entry() {
        let mut newer = XrefSection::new();
        newer.insert(5, XrefEntry::InUse { gen: 0, offset: 100 });

        let mut older = XrefSection::new();
        older.insert(5, XrefEntry::InUse { gen: 0, offset: 50 });
        older.insert(6, XrefEntry::InUse { gen: 0, offset: 60 });

        newer.merge_older(&older);
        assert_eq!(newer.get(5), Some(XrefEntry::InUse { gen: 0, offset: 100 }));
        assert_eq!(newer.get(6), Some(XrefEntry::InUse { gen: 0, offset: 60 }));
    }

    #[test]
    fn zero_entry_is_rejected() {
        let mut section = XrefSection::new();
        section.insert(0, XrefEntry::Free { next_free_oid: 0, gen: 65535 });
        assert!(section.is_empty());
    }

    #[test]
    fn next_free_oid_tracks_highest_seen() {
        let mut section = XrefSection::new();
        section.insert(3, XrefEntry::InUse { gen: 0, offset: 0 });
        section.insert(9, XrefEntry::InUse { gen: 0, offset: 0 });
        assert_eq!(section.next_free_oid(), 10);
    }
}
