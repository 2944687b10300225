//! The concrete Data Set type (§4.4): a tag-keyed map of owned
//! [`Element`](crate::element::Element)s with a one-way lock flag,
//! grounded directly on the teacher's `dicom-object::mem::InMemDicomObject`
//! whose `entries` field is likewise a `BTreeMap<Tag, InMemElement<D>>` —
//! chosen there, as here, for the ascending-tag iteration order it gives
//! for free.

use std::collections::BTreeMap;

use dicom_core::tag::Tag;

use crate::element::Element;
use crate::error::{DuplicateTagSnafu, Error, LockedSnafu, Result};
use snafu::ensure;

/// An insertion-agnostic, tag-keyed collection of owned data elements
/// (§3, §4.4).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    entries: BTreeMap<Tag, Element>,
    locked: bool,
}

impl DataSet {
    /// An empty, unlocked data set.
    pub fn new() -> Self {
        DataSet::default()
    }

    /// Insert `element`. Fails if the set is locked, or if an element with
    /// that tag is already present (no silent replace).
    pub fn insert(&mut self, element: Element) -> Result<()> {
        ensure!(!self.locked, LockedSnafu);
        ensure!(
            !self.entries.contains_key(&element.tag()),
            DuplicateTagSnafu {
                tag: element.tag()
            }
        );
        self.entries.insert(element.tag(), element);
        Ok(())
    }

    /// Remove and return the element tagged `tag`. Fails if the set is
    /// locked, or if no such element exists.
    pub fn remove(&mut self, tag: Tag) -> Result<Element> {
        ensure!(!self.locked, LockedSnafu);
        self.entries.remove(&tag).ok_or(Error::NoSuchTag { tag })
    }

    /// Borrow the element tagged `tag`, if present.
    pub fn get(&self, tag: Tag) -> Option<&Element> {
        self.entries.get(&tag)
    }

    /// Whether an element tagged `tag` is present.
    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the data set has no elements.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every tag present, in ascending order.
    pub fn copy_tags(&self) -> Vec<Tag> {
        self.entries.keys().copied().collect()
    }

    /// Visit every element in ascending tag order, stopping early if `f`
    /// returns `false`. Returns whether every invocation returned `true`.
    pub fn for_each(&self, mut f: impl FnMut(&Element) -> bool) -> bool {
        for element in self.entries.values() {
            if !f(element) {
                return false;
            }
        }
        true
    }

    /// One-way lock: after this, `insert`/`remove` always fail.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Whether this data set is locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// A deep copy, always unlocked regardless of this data set's own lock
    /// state (§8's clone round-trip law — distinct from `Clone::clone`,
    /// which preserves the lock flag for ordinary Rust move/borrow use).
    pub fn deep_copy(&self) -> DataSet {
        DataSet {
            entries: self.entries.clone(),
            locked: false,
        }
    }
}
