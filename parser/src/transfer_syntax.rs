//! A curated table of transfer syntax UIDs and the `is_encapsulated`
//! predicate the pixel-data index parser needs (§4.5, §9).
//!
//! This is a deliberate shrink of the teacher's
//! `dicom-transfer-syntax-registry` (45 built-in entries, a pluggable
//! codec registry, `inventory`-based third-party registration): since
//! pixel *decoding* is out of scope, nothing here needs to name a codec,
//! only to tell encoding parameters (explicit/implicit, endianness) and
//! encapsulation apart for the UIDs a whole-slide-imaging file realistically
//! carries. Recorded as an intentional scope reduction in `DESIGN.md`.

use crate::decode::Encoding;

/// Implicit VR Little Endian, `1.2.840.10008.1.2`. The default transfer
/// syntax assumed when a stream has no File Meta Information at all.
pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
/// Explicit VR Little Endian, `1.2.840.10008.1.2.1`.
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
/// Explicit VR Big Endian (retired), `1.2.840.10008.1.2.2`.
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";
/// Deflated Explicit VR Little Endian, `1.2.840.10008.1.2.1.99`.
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.99";
/// Encapsulated Uncompressed Explicit VR Little Endian, `1.2.840.10008.1.2.1.98`.
pub const ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.98";
/// JPEG Baseline (Process 1), `1.2.840.10008.1.2.4.50`.
pub const JPEG_BASELINE: &str = "1.2.840.10008.1.2.4.50";
/// JPEG 2000 Image Compression (Lossless Only), `1.2.840.10008.1.2.4.90`.
pub const JPEG_2000_LOSSLESS: &str = "1.2.840.10008.1.2.4.90";
/// JPEG 2000 Image Compression, `1.2.840.10008.1.2.4.91`.
pub const JPEG_2000: &str = "1.2.840.10008.1.2.4.91";
/// RLE Lossless, `1.2.840.10008.1.2.5`.
pub const RLE_LOSSLESS: &str = "1.2.840.10008.1.2.5";

/// Resolve the wire encoding (explicit/implicit VR, endianness) that a
/// transfer syntax UID implies for the elements of its data set. Unknown
/// UIDs, and the compressed/encapsulated ones (their pixel data is
/// opaque either way, but their metadata elements still use Explicit VR
/// Little Endian per the standard), default to Explicit VR Little
/// Endian, which matches every transfer syntax this workspace lists
/// except the two named here.
pub fn encoding_of(transfer_syntax_uid: &str) -> Encoding {
    match trim_trailing_nul(transfer_syntax_uid) {
        IMPLICIT_VR_LITTLE_ENDIAN => Encoding::IMPLICIT_LITTLE_ENDIAN,
        EXPLICIT_VR_BIG_ENDIAN => Encoding::EXPLICIT_BIG_ENDIAN,
        _ => Encoding::EXPLICIT_LITTLE_ENDIAN,
    }
}

/// Whether a transfer syntax stores Pixel Data in encapsulated
/// (fragmented, Item-wrapped) form, which is what the pixel-data index
/// parser needs to know to decide whether frames are preceded by Item
/// headers (§4.5's single-frame parser).
///
/// Native (non-encapsulated) transfer syntaxes are Implicit VR LE,
/// Explicit VR LE/BE and their deflated variant; every compressed
/// transfer syntax, plus the explicitly-named "Encapsulated Uncompressed"
/// one, is encapsulated.
pub fn is_encapsulated(transfer_syntax_uid: &str) -> bool {
    !matches!(
        trim_trailing_nul(transfer_syntax_uid),
        IMPLICIT_VR_LITTLE_ENDIAN
            | EXPLICIT_VR_LITTLE_ENDIAN
            | EXPLICIT_VR_BIG_ENDIAN
            | DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN
    )
}

/// UIDs are UI-class strings, so a trailing NUL pad byte is common and
/// must not affect equality (the VR is exempt from the usual trim-one-
/// trailing-whitespace rule at decode time, so this module does its own
/// trimming at comparison time instead).
fn trim_trailing_nul(uid: &str) -> &str {
    uid.trim_end_matches(['\0', ' '])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_transfer_syntaxes_are_not_encapsulated() {
        assert!(!is_encapsulated(IMPLICIT_VR_LITTLE_ENDIAN));
        assert!(!is_encapsulated(EXPLICIT_VR_LITTLE_ENDIAN));
        assert!(!is_encapsulated(EXPLICIT_VR_BIG_ENDIAN));
        assert!(!is_encapsulated(DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN));
    }

    #[test]
    fn compressed_transfer_syntaxes_are_encapsulated() {
        assert!(is_encapsulated(JPEG_BASELINE));
        assert!(is_encapsulated(JPEG_2000_LOSSLESS));
        assert!(is_encapsulated(RLE_LOSSLESS));
        assert!(is_encapsulated(
            ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN
        ));
    }

    #[test]
    fn trailing_nul_pad_is_ignored() {
        let padded = format!("{IMPLICIT_VR_LITTLE_ENDIAN}\0");
        assert!(!is_encapsulated(&padded));
        assert_eq!(encoding_of(&padded), Encoding::IMPLICIT_LITTLE_ENDIAN);
    }

    #[test]
    fn encoding_selects_correct_endianness_and_vr_mode() {
        assert_eq!(
            encoding_of(EXPLICIT_VR_BIG_ENDIAN),
            Encoding::EXPLICIT_BIG_ENDIAN
        );
        assert_eq!(
            encoding_of(EXPLICIT_VR_LITTLE_ENDIAN),
            Encoding::EXPLICIT_LITTLE_ENDIAN
        );
        assert_eq!(
            encoding_of(IMPLICIT_VR_LITTLE_ENDIAN),
            Encoding::IMPLICIT_LITTLE_ENDIAN
        );
        // unknown/compressed UIDs carry Explicit VR LE metadata
        assert_eq!(encoding_of(JPEG_BASELINE), Encoding::EXPLICIT_LITTLE_ENDIAN);
    }
}
