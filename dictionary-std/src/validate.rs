//! The dictionary-backed validation helpers of §4.1: whether a tag is
//! public/private/valid at all, whether a VR string is one of the 33
//! recognised codes, and whether a VR is permitted for a given tag.
//!
//! These take `&dyn DataDictionary` rather than hard-coding
//! [`StandardDataDictionary`] so a caller with a private dictionary gets
//! the same validation behaviour for its own tags.

use std::str::FromStr;

use dicom_core::dictionary::DataDictionary;
use dicom_core::tag::Tag;
use dicom_core::vr::{VrSpec, VR};

/// Whether `tag` is known to `dict` (§4.1: "true iff dictionary contains
/// it").
pub fn is_public_tag(dict: &dyn DataDictionary, tag: Tag) -> bool {
    dict.has_tag(tag)
}

/// Whether `tag` has an odd group number (§3, §4.1).
pub fn is_private_tag(tag: Tag) -> bool {
    tag.is_private()
}

/// Whether `tag` is valid at all: nonzero, and either public or private
/// (§3's tag validity rule; the nil tag `0x00000000` is never valid).
pub fn is_valid_tag(dict: &dyn DataDictionary, tag: Tag) -> bool {
    tag != Tag::NIL && (is_public_tag(dict, tag) || is_private_tag(tag))
}

/// Whether `s` is one of the 33 recognised VR codes (§3).
pub fn is_valid_vr(s: &str) -> bool {
    VR::from_str(s).is_ok()
}

/// Whether `vr` is one of the VRs `dict` permits for `tag`. Tags absent
/// from the dictionary (most commonly private tags, or public tags this
/// curated table doesn't carry) impose no constraint: any VR is
/// considered permitted for them, matching the parser's own handling of
/// unknown tags in implicit-VR mode (§4.5).
pub fn is_valid_vr_for_tag(dict: &dyn DataDictionary, vr: VR, tag: Tag) -> bool {
    match dict.by_tag(tag) {
        Some(entry) => VrSpec::from(entry.vr).permits(vr),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StandardDataDictionary;

    #[test]
    fn nil_tag_is_never_valid() {
        let dict = StandardDataDictionary::new();
        assert!(!is_valid_tag(&dict, Tag::NIL));
    }

    #[test]
    fn known_public_tag_is_valid() {
        let dict = StandardDataDictionary::new();
        assert!(is_valid_tag(&dict, Tag(0x0010, 0x0010)));
        assert!(is_public_tag(&dict, Tag(0x0010, 0x0010)));
    }

    #[test]
    fn odd_group_unknown_tag_is_valid_as_private() {
        let dict = StandardDataDictionary::new();
        let tag = Tag(0x0009, 0x1001);
        assert!(!is_public_tag(&dict, tag));
        assert!(is_valid_tag(&dict, tag));
    }

    #[test]
    fn even_group_unknown_tag_is_invalid() {
        let dict = StandardDataDictionary::new();
        assert!(!is_valid_tag(&dict, Tag(0x0008, 0xABCD)));
    }

    #[test]
    fn vr_string_validity() {
        assert!(is_valid_vr("PN"));
        assert!(is_valid_vr("SQ"));
        assert!(!is_valid_vr("ZZ"));
        assert!(!is_valid_vr("P"));
    }

    #[test]
    fn pixel_data_accepts_either_alternative_vr() {
        let dict = StandardDataDictionary::new();
        let tag = Tag(0x7FE0, 0x0010);
        assert!(is_valid_vr_for_tag(&dict, VR::OB, tag));
        assert!(is_valid_vr_for_tag(&dict, VR::OW, tag));
        assert!(!is_valid_vr_for_tag(&dict, VR::PN, tag));
    }

    #[test]
    fn unknown_tag_permits_any_vr() {
        let dict = StandardDataDictionary::new();
        assert!(is_valid_vr_for_tag(&dict, VR::PN, Tag(0x0009, 0x1001)));
    }
}
