//! The dictionary trait seam (§4.1): `dicom-core` defines what a
//! dictionary looks like, `dicom-dictionary-std` supplies the static
//! table, and `dicom-parser`/`dicom-object` take `&dyn DataDictionary` so
//! callers can substitute a private dictionary without depending on
//! `dicom-dictionary-std` at all (grounded on the teacher's
//! `dicom-core::dictionary::DataDictionary` trait split from its static
//! implementation in `dicom-dictionary-std`).

use crate::tag::Tag;
use crate::vr::VrSpec;

/// One dictionary record: everything known about a tag (or a repeating
/// tag pattern) ahead of time, independent of any particular stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryEntry {
    /// The keyword used for name-based lookup, e.g. `"PatientName"`.
    pub keyword: &'static str,
    /// The VR (or alternative VR set) the standard assigns this tag.
    pub vr: VrSpecEntry,
}

/// A `'static`-friendly mirror of [`VrSpec`] usable in `const` tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VrSpecEntry {
    Exact(crate::vr::VR),
    ObOrOw,
    UsOrSs,
    UsOrOw,
    UsOrSsOrOw,
}

impl From<VrSpecEntry> for VrSpec {
    fn from(e: VrSpecEntry) -> Self {
        match e {
            VrSpecEntry::Exact(vr) => VrSpec::Exact(vr),
            VrSpecEntry::ObOrOw => VrSpec::ObOrOw,
            VrSpecEntry::UsOrSs => VrSpec::UsOrSs,
            VrSpecEntry::UsOrOw => VrSpec::UsOrOw,
            VrSpecEntry::UsOrSsOrOw => VrSpec::UsOrSsOrOw,
        }
    }
}

/// A source of static knowledge about DICOM tags: the VR the standard
/// assigns them, and their keyword, looked up either way.
///
/// Implemented by `dicom-dictionary-std::StandardDataDictionary` and by
/// any caller-supplied private dictionary. A `None` result means "this
/// tag/keyword is not known", not an error — unknown tags are legal
/// (most commonly private tags).
pub trait DataDictionary {
    /// Look up a tag's dictionary entry.
    fn by_tag(&self, tag: Tag) -> Option<DictionaryEntry>;

    /// Look up a tag by its dictionary keyword.
    fn by_keyword(&self, keyword: &str) -> Option<Tag>;

    /// Whether `tag` appears (directly, or via a repeating-group pattern)
    /// in this dictionary.
    fn has_tag(&self, tag: Tag) -> bool {
        self.by_tag(tag).is_some()
    }
}

impl<T: DataDictionary + ?Sized> DataDictionary for &T {
    fn by_tag(&self, tag: Tag) -> Option<DictionaryEntry> {
        (**self).by_tag(tag)
    }
    fn by_keyword(&self, keyword: &str) -> Option<Tag> {
        (**self).by_keyword(keyword)
    }
}

/// A dictionary that never resolves anything. Useful as a default when a
/// caller has no private dictionary and does not want to depend on
/// `dicom-dictionary-std` (e.g. when only implicit-VR decoding support is
/// needed and VR must come from elsewhere).
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDataDictionary;

impl DataDictionary for EmptyDataDictionary {
    fn by_tag(&self, _tag: Tag) -> Option<DictionaryEntry> {
        None
    }
    fn by_keyword(&self, _keyword: &str) -> Option<Tag> {
        None
    }
}
