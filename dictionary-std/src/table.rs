//! An open-addressed hash index over [`ENTRIES`](crate::entries::ENTRIES),
//! built once on first use via [`once_cell::sync::Lazy`].
//!
//! The teacher crate looks up tags through a plain `HashMap`; this
//! module instead hand-rolls linear-probed open addressing so that
//! lookup cost is bounded by a small constant number of probes
//! regardless of hash distribution, which is what lets [`TagIndex::get`]
//! promise O(1) lookup with a fixed worst-case probe count.

use dicom_core::tag::Tag;
use once_cell::sync::Lazy;

use crate::entries::ENTRIES;
use crate::DictEntry;

/// The maximum number of probes [`TagIndex::get`] will ever perform
/// before concluding a tag is absent. The table is sized with enough
/// slack (a load factor under 50%) that this bound is never hit in
/// practice for the curated entry count; it exists as a hard ceiling
/// rather than a tuning knob.
const MAX_PROBES: usize = 10;

pub struct TagIndex {
    slots: Vec<Option<u32>>, // packed tag -> index into ENTRIES, or empty
    mask: usize,
}

impl TagIndex {
    fn build(entries: &[DictEntry]) -> Self {
        let mut capacity = 16usize;
        while capacity < entries.len() * 4 {
            capacity *= 2;
        }
        let mut slots: Vec<Option<u32>> = vec![None; capacity];
        let mask = capacity - 1;

        for (i, entry) in entries.iter().enumerate() {
            let packed = entry.tag.to_u32();
            let mut idx = hash(packed) as usize & mask;
            let mut probes = 0;
            while slots[idx].is_some() {
                idx = (idx + 1) & mask;
                probes += 1;
                assert!(
                    probes <= MAX_PROBES,
                    "dictionary table too dense: exceeded {MAX_PROBES} probes while inserting"
                );
            }
            slots[idx] = Some(i as u32);
        }

        TagIndex { slots, mask }
    }

    /// Resolve a tag to its entry index, or `None` if absent, in at most
    /// [`MAX_PROBES`] probes.
    pub fn get(&self, tag: Tag) -> Option<&'static DictEntry> {
        let packed = tag.to_u32();
        let mut idx = hash(packed) as usize & self.mask;
        for _ in 0..=MAX_PROBES {
            match self.slots[idx] {
                Some(entry_idx) => {
                    let entry = &ENTRIES[entry_idx as usize];
                    if entry.tag == tag {
                        return Some(entry);
                    }
                    idx = (idx + 1) & self.mask;
                }
                None => return None,
            }
        }
        None
    }
}

/// Fibonacci hashing: a cheap, well-distributed mix for 32-bit keys.
#[inline]
fn hash(packed: u32) -> u32 {
    packed.wrapping_mul(2_654_435_769)
}

pub static TAG_INDEX: Lazy<TagIndex> = Lazy::new(|| TagIndex::build(ENTRIES));

pub static KEYWORD_INDEX: Lazy<std::collections::HashMap<&'static str, Tag>> = Lazy::new(|| {
    ENTRIES
        .iter()
        .map(|entry| (entry.keyword, entry.tag))
        .collect()
});
