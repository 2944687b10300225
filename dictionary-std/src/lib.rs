//! The standard DICOM attribute dictionary (§4.1).
//!
//! [`StandardDataDictionary`] is a unit struct; all of its state is the
//! process-wide lazily built hash index in [`table`]. Grounded on the
//! teacher crate's `StandardDataDictionaryRegistry`
//! (`dicom-dictionary-std::data_element`), simplified to the curated
//! entry set this workspace ships (see `DESIGN.md`).

mod entries;
mod table;
mod validate;

use dicom_core::dictionary::{DataDictionary, DictionaryEntry};
use dicom_core::tag::Tag;
use dicom_core::vr::VR;

pub use dicom_core::dictionary::VrSpecEntry;
pub use entries::ENTRIES;
pub use validate::{is_private_tag, is_public_tag, is_valid_tag, is_valid_vr, is_valid_vr_for_tag};

/// One row of the static table: a tag's keyword and permitted VR(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictEntry {
    pub tag: Tag,
    pub keyword: &'static str,
    pub vr: VrSpecEntry,
}

impl DictEntry {
    fn as_dictionary_entry(&self) -> DictionaryEntry {
        DictionaryEntry {
            keyword: self.keyword,
            vr: self.vr,
        }
    }
}

/// The standard dictionary described by PS3.6, as curated by this
/// workspace. Construct with [`StandardDataDictionary::new`] or use the
/// crate-level constant [`STANDARD_DICTIONARY`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDataDictionary;

impl StandardDataDictionary {
    pub const fn new() -> Self {
        StandardDataDictionary
    }

    /// Whether `tag` is a group-length element, `(gggg,0000)`. These
    /// exist for every group and are never individually listed in the
    /// registry.
    fn group_length(tag: Tag) -> Option<DictionaryEntry> {
        tag.is_group_length().then_some(DictionaryEntry {
            keyword: "GenericGroupLength",
            vr: VrSpecEntry::Exact(VR::UL),
        })
    }

    /// Whether `tag` is a private creator slot: odd group, element in
    /// `0x0010..=0x00FF`. Private creators are identified by convention,
    /// not by a fixed tag, and always carry VR LO.
    fn private_creator(tag: Tag) -> Option<DictionaryEntry> {
        (tag.is_private() && (0x0010..=0x00FF).contains(&tag.element())).then_some(
            DictionaryEntry {
                keyword: "PrivateCreator",
                vr: VrSpecEntry::Exact(VR::LO),
            },
        )
    }
}

impl DataDictionary for StandardDataDictionary {
    fn by_tag(&self, tag: Tag) -> Option<DictionaryEntry> {
        table::TAG_INDEX
            .get(tag)
            .map(DictEntry::as_dictionary_entry)
            .or_else(|| Self::group_length(tag))
            .or_else(|| Self::private_creator(tag))
    }

    fn by_keyword(&self, keyword: &str) -> Option<Tag> {
        table::KEYWORD_INDEX.get(keyword).copied()
    }
}

/// A process-wide handle to the standard dictionary, for callers that
/// would rather not construct their own unit value.
pub const STANDARD_DICTIONARY: StandardDataDictionary = StandardDataDictionary::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_well_known_tag() {
        let dict = StandardDataDictionary::new();
        let entry = dict.by_tag(Tag(0x0010, 0x0010)).unwrap();
        assert_eq!(entry.keyword, "PatientName");
    }

    #[test]
    fn resolves_keyword_back_to_tag() {
        let dict = StandardDataDictionary::new();
        assert_eq!(dict.by_keyword("PatientName"), Some(Tag(0x0010, 0x0010)));
        assert_eq!(dict.by_keyword("NotAKeyword"), None);
    }

    #[test]
    fn resolves_group_length_for_any_group() {
        let dict = StandardDataDictionary::new();
        assert!(dict.by_tag(Tag(0x0009, 0x0000)).is_some());
        assert!(dict.by_tag(Tag(0x0029, 0x0000)).is_some());
    }

    #[test]
    fn resolves_private_creator_slots() {
        let dict = StandardDataDictionary::new();
        let entry = dict.by_tag(Tag(0x0009, 0x0010)).unwrap();
        assert_eq!(entry.keyword, "PrivateCreator");
        assert!(dict.by_tag(Tag(0x0009, 0x1000)).is_none());
    }

    #[test]
    fn unknown_public_tag_is_unresolved() {
        let dict = StandardDataDictionary::new();
        assert!(dict.by_tag(Tag(0x0008, 0xABCD)).is_none());
    }

    #[test]
    fn pixel_data_is_alternative_vr() {
        let dict = StandardDataDictionary::new();
        let entry = dict.by_tag(Tag(0x7FE0, 0x0010)).unwrap();
        assert_eq!(entry.keyword, "PixelData");
        assert_eq!(entry.vr, VrSpecEntry::ObOrOw);
    }
}
