//! Value Representations and the value classes they fall into.
//!
//! Grounded on `dicom-core::header::VR` from the teacher crate, extended
//! with the per-VR class/size/header-length/capacity table and the
//! alternative-VR bookkeeping the dictionary needs (§3, §4.1 of the spec).

use std::fmt;
use std::str::FromStr;

/// A DICOM value representation: a two-letter code describing a value's
/// type and encoding rules.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
pub enum VR {
    /// Application Entity
    AE,
    /// Age String
    AS,
    /// Attribute Tag
    AT,
    /// Code String
    CS,
    /// Date
    DA,
    /// Decimal String
    DS,
    /// Date Time
    DT,
    /// Floating Point Single
    FL,
    /// Floating Point Double
    FD,
    /// Integer String
    IS,
    /// Long String
    LO,
    /// Long Text
    LT,
    /// Other Byte
    OB,
    /// Other Double
    OD,
    /// Other Float
    OF,
    /// Other Long
    OL,
    /// Other Very Long
    OV,
    /// Other Word
    OW,
    /// Person Name
    PN,
    /// Short String
    SH,
    /// Signed Long
    SL,
    /// Sequence of Items
    SQ,
    /// Signed Short
    SS,
    /// Short Text
    ST,
    /// Signed Very Long
    SV,
    /// Time
    TM,
    /// Unlimited Characters
    UC,
    /// Unique Identifier (UID)
    UI,
    /// Unsigned Long
    UL,
    /// Unknown
    UN,
    /// Universal Resource Identifier or Universal Resource Locator (URI/URL)
    UR,
    /// Unsigned Short
    US,
    /// Unlimited Text
    UT,
    /// Unsigned Very Long
    UV,
}

/// The value-semantics class a VR belongs to (§3 of the spec).
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum VRClass {
    /// One backslash-tolerant text scalar: LT, ST, UT, UR.
    StringSingle,
    /// One or more backslash-separated text items.
    StringMulti,
    /// One or more fixed-width integers.
    NumericInteger,
    /// One or more IEEE floats.
    NumericDecimal,
    /// Opaque byte array.
    Binary,
    /// Ordered list of nested data sets.
    Sequence,
}

/// Header length in bytes for an explicit-VR element: the teacher's
/// `decode::explicit_le`/`explicit_be` treat this as the short/long-form
/// split over the VR table.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum HeaderLength {
    /// Tag (4) + VR (2) + length (2) = 8 bytes.
    Short,
    /// Tag (4) + VR (2) + reserved (2) + length (4) = 12 bytes.
    Long,
}

impl VR {
    /// Parse a VR from its two-character ASCII form.
    pub fn from_bytes(chars: [u8; 2]) -> Option<Self> {
        std::str::from_utf8(&chars).ok().and_then(|s| VR::from_str(s).ok())
    }

    /// The two-character ASCII form of this VR.
    pub fn to_str(self) -> &'static str {
        use VR::*;
        match self {
            AE => "AE",
            AS => "AS",
            AT => "AT",
            CS => "CS",
            DA => "DA",
            DS => "DS",
            DT => "DT",
            FL => "FL",
            FD => "FD",
            IS => "IS",
            LO => "LO",
            LT => "LT",
            OB => "OB",
            OD => "OD",
            OF => "OF",
            OL => "OL",
            OV => "OV",
            OW => "OW",
            PN => "PN",
            SH => "SH",
            SL => "SL",
            SQ => "SQ",
            SS => "SS",
            ST => "ST",
            SV => "SV",
            TM => "TM",
            UC => "UC",
            UI => "UI",
            UL => "UL",
            UN => "UN",
            UR => "UR",
            US => "US",
            UT => "UT",
            UV => "UV",
        }
    }

    /// The value class this VR belongs to.
    pub fn class(self) -> VRClass {
        use VR::*;
        use VRClass::*;
        match self {
            LT | ST | UT | UR => StringSingle,
            AE | CS | DA | DS | DT | IS | LO | PN | SH | TM | UI | UC => StringMulti,
            SS | US | SL | UL | SV | UV | AT | OL | OV => NumericInteger,
            FL | FD | OF | OD => NumericDecimal,
            OB | OW | UN => Binary,
            SQ => Sequence,
        }
    }

    /// The fixed size in bytes of one value of this VR, or 0 for
    /// variable-length classes (strings, binary, sequence).
    pub fn sizeof(self) -> usize {
        use VR::*;
        match self {
            SS | US => 2,
            SL | UL | FL | AT | OL => 4,
            SV | UV | FD | OD | OV => 8,
            _ => 0,
        }
    }

    /// Whether this VR uses the short (2-byte length) or long (4-byte
    /// length, with a 2-byte reserved field) explicit-VR header form.
    pub fn header_length(self) -> HeaderLength {
        use VR::*;
        match self {
            AE | AS | AT | CS | DA | DS | DT | FL | FD | IS | LO | LT | PN | SH | SL | SS | ST
            | TM | UI | UL | US => HeaderLength::Short,
            OB | OD | OF | OL | OV | OW | SQ | SV | UC | UN | UR | UT | UV => HeaderLength::Long,
        }
    }

    /// The maximum permissible length in bytes for a single value of this
    /// VR, as specified by the standard, or `None` when the VR's only
    /// bound is the 32-bit length field itself (treated as advisory, per
    /// the spec's Open Question on capacity enforcement).
    pub fn capacity(self) -> Option<u32> {
        use VR::*;
        match self {
            AE => Some(16),
            AS => Some(4),
            CS => Some(16),
            DA => Some(8),
            DS => Some(16),
            DT => Some(26),
            IS => Some(12),
            LO => Some(64),
            PN => Some(64 * 5),
            SH => Some(16),
            ST => Some(1024),
            TM => Some(14),
            UI => Some(64),
            LT => Some(10240),
            UC | UR | UT => Some(u32::MAX - 1), // 2^32 - 2, advisory only
            _ => None,
        }
    }
}

impl FromStr for VR {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use VR::*;
        match s {
            "AE" => Ok(AE),
            "AS" => Ok(AS),
            "AT" => Ok(AT),
            "CS" => Ok(CS),
            "DA" => Ok(DA),
            "DS" => Ok(DS),
            "DT" => Ok(DT),
            "FL" => Ok(FL),
            "FD" => Ok(FD),
            "IS" => Ok(IS),
            "LO" => Ok(LO),
            "LT" => Ok(LT),
            "OB" => Ok(OB),
            "OD" => Ok(OD),
            "OF" => Ok(OF),
            "OL" => Ok(OL),
            "OV" => Ok(OV),
            "OW" => Ok(OW),
            "PN" => Ok(PN),
            "SH" => Ok(SH),
            "SL" => Ok(SL),
            "SQ" => Ok(SQ),
            "SS" => Ok(SS),
            "ST" => Ok(ST),
            "SV" => Ok(SV),
            "TM" => Ok(TM),
            "UC" => Ok(UC),
            "UI" => Ok(UI),
            "UL" => Ok(UL),
            "UN" => Ok(UN),
            "UR" => Ok(UR),
            "US" => Ok(US),
            "UT" => Ok(UT),
            "UV" => Ok(UV),
            _ => Err("not a valid value representation"),
        }
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// The VR (or set of alternative VRs) a dictionary associates with a tag.
///
/// Some attributes admit more than one VR depending on context (most
/// famously Pixel Data, which is OB in encapsulated transfer syntaxes and
/// OW/OB in native ones). `VrSpec` is how the dictionary records that
/// without losing the information, per §3 and §4.1 of the spec.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum VrSpec {
    /// Exactly one permissible VR.
    Exact(VR),
    /// OB or OW (Pixel Data, Waveform Data and kin).
    ObOrOw,
    /// US or SS (e.g. pixel-representation-dependent attributes).
    UsOrSs,
    /// US or OW.
    UsOrOw,
    /// US, SS or OW.
    UsOrSsOrOw,
}

impl VrSpec {
    /// The canonical VR the parser should assume in implicit-VR streams,
    /// before any handler override (§4.5).
    pub fn canonical(self) -> VR {
        match self {
            VrSpec::Exact(vr) => vr,
            VrSpec::ObOrOw => VR::OB,
            VrSpec::UsOrSs | VrSpec::UsOrOw | VrSpec::UsOrSsOrOw => VR::US,
        }
    }

    /// Whether `vr` is one of the VRs this spec permits.
    pub fn permits(self, vr: VR) -> bool {
        match self {
            VrSpec::Exact(v) => v == vr,
            VrSpec::ObOrOw => matches!(vr, VR::OB | VR::OW),
            VrSpec::UsOrSs => matches!(vr, VR::US | VR::SS),
            VrSpec::UsOrOw => matches!(vr, VR::US | VR::OW),
            VrSpec::UsOrSsOrOw => matches!(vr, VR::US | VR::SS | VR::OW),
        }
    }
}

impl From<VR> for VrSpec {
    fn from(vr: VR) -> Self {
        VrSpec::Exact(vr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_round_trips_for_every_vr() {
        let all = [
            VR::AE, VR::AS, VR::AT, VR::CS, VR::DA, VR::DS, VR::DT, VR::FL, VR::FD, VR::IS,
            VR::LO, VR::LT, VR::OB, VR::OD, VR::OF, VR::OL, VR::OV, VR::OW, VR::PN, VR::SH,
            VR::SL, VR::SQ, VR::SS, VR::ST, VR::SV, VR::TM, VR::UC, VR::UI, VR::UL, VR::UN,
            VR::UR, VR::US, VR::UT, VR::UV,
        ];
        assert_eq!(all.len(), 33);
        for vr in all {
            assert_eq!(VR::from_str(vr.to_str()).unwrap(), vr);
        }
    }

    #[test]
    fn sizeof_matches_numeric_class_only() {
        for vr in [VR::SS, VR::US, VR::SL, VR::UL, VR::SV, VR::UV, VR::AT, VR::OL] {
            assert_eq!(vr.class(), VRClass::NumericInteger);
            assert!(vr.sizeof() > 0);
        }
        for vr in [VR::OB, VR::OW, VR::UN, VR::LO, VR::SQ] {
            assert_eq!(vr.sizeof(), 0);
        }
    }

    #[test]
    fn pixel_data_alternative_vr() {
        let spec = VrSpec::ObOrOw;
        assert!(spec.permits(VR::OB));
        assert!(spec.permits(VR::OW));
        assert!(!spec.permits(VR::US));
        assert_eq!(spec.canonical(), VR::OB);
    }
}
