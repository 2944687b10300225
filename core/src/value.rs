//! The element value model: a tagged union over the six VR classes (§3,
//! §4.4), plus the generic, recursive [`DataElement`] shape that lets
//! `dicom-object` tie the Data Set / Sequence knot without a cyclic crate
//! dependency — grounded on the teacher's own `DataElement<I>` /
//! `Value<I>` generic split in `dicom-core::header` and `dicom-core::value`.

use std::borrow::Cow;

use smallvec::SmallVec;
use snafu::{ensure, Snafu};

use crate::error::{ErrorKind, HasKind};
use crate::length::Length;
use crate::tag::Tag;
use crate::vr::{VRClass, VR};

/// Errors that can occur while decoding raw element bytes into a
/// [`PrimitiveValue`], or while widening/narrowing a value to a requested
/// shape.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// A numeric element's length was not a multiple of its VR's size.
    #[snafu(display(
        "length {len} is not a multiple of {vr}'s size ({size} bytes)"
    ))]
    MisalignedLength { vr: VR, size: usize, len: usize },

    /// The raw bytes of a string-class element were not valid UTF-8.
    #[snafu(display("value of VR {vr} is not valid UTF-8"))]
    NotUtf8 { vr: VR },

    /// A getter was used against the wrong value class (e.g. `get_decimal`
    /// on a string element).
    #[snafu(display("value is of the wrong class for this operation"))]
    WrongClass,

    /// An index passed to a getter was out of the value's multiplicity.
    #[snafu(display("index {index} is out of bounds for a value of multiplicity {vm}"))]
    IndexOutOfBounds { index: usize, vm: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::MisalignedLength { .. } | Error::NotUtf8 { .. } => ErrorKind::Parse,
            Error::WrongClass | Error::IndexOutOfBounds { .. } => ErrorKind::Invalid,
        }
    }
}

/// A DICOM element value, as a tagged union over the VR classes of §3.
///
/// `Strings` serves both `StringSingle` (always exactly one item,
/// regardless of embedded backslashes) and `StringMulti` (one or more
/// backslash-separated items) — the distinction lives in how the value
/// was decoded, not in its shape once stored.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// No value has been set yet, or the element is empty (`length == 0`).
    Empty,
    /// StringSingle and StringMulti classes.
    Strings(SmallVec<[String; 1]>),
    /// NumericInteger, SS width.
    I16(SmallVec<[i16; 4]>),
    /// NumericInteger, US width (also the canonical storage for AT pairs).
    U16(SmallVec<[u16; 4]>),
    /// NumericInteger, SL width.
    I32(SmallVec<[i32; 2]>),
    /// NumericInteger, UL/OL width (also AT, packed as group<<16|element).
    U32(SmallVec<[u32; 2]>),
    /// NumericInteger, SV width.
    I64(SmallVec<[i64; 1]>),
    /// NumericInteger, UV/OV width.
    U64(SmallVec<[u64; 1]>),
    /// NumericDecimal, FL/OF width.
    F32(SmallVec<[f32; 2]>),
    /// NumericDecimal, FD/OD width.
    F64(SmallVec<[f64; 1]>),
    /// Binary class: OB, OW, UN. Never byte-swapped (§4.5, §8).
    Bytes(Vec<u8>),
}

impl PrimitiveValue {
    /// Decode raw element bytes into a primitive value, dispatching on the
    /// VR's class. This is the parser's sole write path into the value
    /// model (§4.4's `set_value`/`dcm_element_set_value` equivalent).
    ///
    /// `swap` byte-swaps each VR-sized chunk before interpreting it as a
    /// number; it has no effect on string or binary classes, matching the
    /// spec's invariant that byte-swap never touches opaque binary.
    pub fn decode(vr: VR, raw: &[u8], swap: bool) -> Result<PrimitiveValue> {
        if raw.is_empty() {
            return Ok(PrimitiveValue::Empty);
        }
        match vr.class() {
            VRClass::StringSingle => {
                let text = decode_text(vr, trim_one(raw))?;
                Ok(PrimitiveValue::Strings(SmallVec::from_buf([text])))
            }
            VRClass::StringMulti => {
                let bytes = if vr == VR::UI { raw } else { trim_one(raw) };
                let text = decode_text(vr, bytes)?;
                let items: SmallVec<[String; 1]> =
                    text.split('\\').map(str::to_owned).collect();
                Ok(PrimitiveValue::Strings(items))
            }
            VRClass::NumericInteger | VRClass::NumericDecimal => decode_numeric(vr, raw, swap),
            VRClass::Binary => Ok(PrimitiveValue::Bytes(raw.to_vec())),
            VRClass::Sequence => unreachable!("sequences never carry a primitive value"),
        }
    }

    /// The number of discrete values stored (§3's Value Multiplicity).
    pub fn multiplicity(&self) -> usize {
        match self {
            PrimitiveValue::Empty => 0,
            PrimitiveValue::Strings(v) => v.len(),
            PrimitiveValue::I16(v) => v.len(),
            PrimitiveValue::U16(v) => v.len(),
            PrimitiveValue::I32(v) => v.len(),
            PrimitiveValue::U32(v) => v.len(),
            PrimitiveValue::I64(v) => v.len(),
            PrimitiveValue::U64(v) => v.len(),
            PrimitiveValue::F32(v) => v.len(),
            PrimitiveValue::F64(v) => v.len(),
            PrimitiveValue::Bytes(v) => {
                if v.is_empty() {
                    0
                } else {
                    1
                }
            }
        }
    }

    /// The byte extent this value would occupy when re-encoded, which
    /// must equal the element's declared `length` (invariant ii, §3).
    pub fn byte_len(&self) -> usize {
        match self {
            PrimitiveValue::Empty => 0,
            PrimitiveValue::Strings(v) => {
                let joined_len: usize = v.iter().map(|s| s.len()).sum();
                joined_len + v.len().saturating_sub(1) // backslash separators
            }
            PrimitiveValue::I16(v) => v.len() * 2,
            PrimitiveValue::U16(v) => v.len() * 2,
            PrimitiveValue::I32(v) => v.len() * 4,
            PrimitiveValue::U32(v) => v.len() * 4,
            PrimitiveValue::I64(v) => v.len() * 8,
            PrimitiveValue::U64(v) => v.len() * 8,
            PrimitiveValue::F32(v) => v.len() * 4,
            PrimitiveValue::F64(v) => v.len() * 8,
            PrimitiveValue::Bytes(v) => v.len(),
        }
    }

    /// Borrow the value as a slice of strings.
    pub fn strings(&self) -> Result<&[String]> {
        match self {
            PrimitiveValue::Strings(v) => Ok(v),
            PrimitiveValue::Empty => Ok(&[]),
            _ => WrongClassSnafu.fail(),
        }
    }

    /// Borrow the value as a single string (`StringSingle`, or the first
    /// item of a `StringMulti` value).
    pub fn to_str(&self) -> Result<Cow<'_, str>> {
        match self.strings()?.first() {
            Some(s) => Ok(Cow::Borrowed(s.as_str())),
            None => Ok(Cow::Borrowed("")),
        }
    }

    /// Fetch a single integer, widened to `i64` (§4.4's `get_integer`).
    pub fn integer(&self, index: usize) -> Result<i64> {
        let vm = self.multiplicity();
        ensure!(index < vm, IndexOutOfBoundsSnafu { index, vm });
        Ok(match self {
            PrimitiveValue::I16(v) => v[index] as i64,
            PrimitiveValue::U16(v) => v[index] as i64,
            PrimitiveValue::I32(v) => v[index] as i64,
            PrimitiveValue::U32(v) => v[index] as i64,
            PrimitiveValue::I64(v) => v[index],
            PrimitiveValue::U64(v) => v[index] as i64,
            _ => return WrongClassSnafu.fail(),
        })
    }

    /// Fetch a single float, widened to `f64` (§4.4's `get_decimal`).
    pub fn decimal(&self, index: usize) -> Result<f64> {
        let vm = self.multiplicity();
        ensure!(index < vm, IndexOutOfBoundsSnafu { index, vm });
        Ok(match self {
            PrimitiveValue::F32(v) => v[index] as f64,
            PrimitiveValue::F64(v) => v[index],
            _ => return WrongClassSnafu.fail(),
        })
    }

    /// Borrow the value as an opaque byte slice (Binary class only).
    pub fn bytes(&self) -> Result<&[u8]> {
        match self {
            PrimitiveValue::Bytes(v) => Ok(v),
            PrimitiveValue::Empty => Ok(&[]),
            _ => WrongClassSnafu.fail(),
        }
    }
}

fn decode_text(vr: VR, bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| Error::NotUtf8 { vr })
}

/// Strip exactly one trailing whitespace byte (space `0x20` or the NUL
/// `0x00` used to pad odd-length strings), never more. UI is exempted by
/// the caller (§3, invariant iii).
fn trim_one(raw: &[u8]) -> &[u8] {
    match raw.last() {
        Some(b' ') | Some(0u8) => &raw[..raw.len() - 1],
        _ => raw,
    }
}

fn decode_numeric(vr: VR, raw: &[u8], swap: bool) -> Result<PrimitiveValue> {
    let size = vr.sizeof();
    ensure!(
        size > 0 && raw.len() % size == 0,
        MisalignedLengthSnafu {
            vr,
            size: size.max(1),
            len: raw.len(),
        }
    );

    macro_rules! chunks {
        ($ty:ty) => {{
            let mut out: SmallVec<[$ty; 4]> = SmallVec::with_capacity(raw.len() / size);
            for chunk in raw.chunks_exact(size) {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(chunk);
                if swap {
                    buf.reverse();
                }
                out.push(<$ty>::from_le_bytes(buf));
            }
            out
        }};
    }

    Ok(match vr {
        VR::SS => PrimitiveValue::I16(chunks!(i16)),
        VR::US => PrimitiveValue::U16(chunks!(u16)),
        VR::SL => PrimitiveValue::I32(chunks!(i32)),
        VR::UL | VR::OL => PrimitiveValue::U32(chunks!(u32)),
        VR::AT => {
            // Each 4-byte chunk is two packed u16 halves (group, element),
            // not one 32-bit word — byte-swap per half, never the whole
            // chunk, so the tag's (group, element) order survives.
            let mut out: SmallVec<[u32; 2]> = SmallVec::with_capacity(raw.len() / size);
            for chunk in raw.chunks_exact(size) {
                let mut group_buf = [0u8; 2];
                let mut elem_buf = [0u8; 2];
                group_buf.copy_from_slice(&chunk[0..2]);
                elem_buf.copy_from_slice(&chunk[2..4]);
                if swap {
                    group_buf.reverse();
                    elem_buf.reverse();
                }
                let group = u16::from_le_bytes(group_buf);
                let element = u16::from_le_bytes(elem_buf);
                out.push((group as u32) << 16 | element as u32);
            }
            PrimitiveValue::U32(out)
        }
        VR::SV => PrimitiveValue::I64(chunks!(i64)),
        VR::UV | VR::OV => PrimitiveValue::U64(chunks!(u64)),
        VR::FL | VR::OF => PrimitiveValue::F32(chunks!(f32)),
        VR::FD | VR::OD => PrimitiveValue::F64(chunks!(f64)),
        _ => unreachable!("not a numeric VR: {:?}", vr),
    })
}

/// An ordered, owned collection of items (nested data sets, for a
/// Sequence element), with its own one-way lock flag independent of any
/// enclosing container's (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence<I> {
    items: Vec<I>,
    locked: bool,
}

impl<I> Default for Sequence<I> {
    fn default() -> Self {
        Sequence {
            items: Vec::new(),
            locked: false,
        }
    }
}

impl<I> Sequence<I> {
    /// An empty, unlocked sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence from an already-collected item list.
    pub fn from_items(items: Vec<I>) -> Self {
        Sequence {
            items,
            locked: false,
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the sequence has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Borrow an item by position.
    pub fn get(&self, index: usize) -> Option<&I> {
        self.items.get(index)
    }

    /// Borrow every item, in order.
    pub fn items(&self) -> &[I] {
        &self.items
    }

    /// Append an item, unless the sequence is locked.
    pub fn append(&mut self, item: I) -> Result<(), Error> {
        ensure!(!self.locked, WrongClassSnafu);
        self.items.push(item);
        Ok(())
    }

    /// Remove the item at `index`, unless the sequence is locked.
    pub fn remove(&mut self, index: usize) -> Result<I, Error> {
        ensure!(!self.locked, WrongClassSnafu);
        ensure!(
            index < self.items.len(),
            IndexOutOfBoundsSnafu {
                index,
                vm: self.items.len()
            }
        );
        Ok(self.items.remove(index))
    }

    /// Visit every item in order, stopping early if `f` returns `false`.
    /// Returns whether every invocation returned `true`.
    pub fn for_each(&self, mut f: impl FnMut(&I, usize) -> bool) -> bool {
        for (i, item) in self.items.iter().enumerate() {
            if !f(item, i) {
                return false;
            }
        }
        true
    }

    /// One-way lock: after this, `append`/`remove` always fail.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Whether the sequence is locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// An element's value: either a primitive value, or a nested [`Sequence`]
/// of items of type `I`. `I` is left generic so that `dicom-object` can
/// tie the recursive Data-Set-contains-Elements-contains-Sequences-
/// contains-Data-Sets knot without a cyclic crate dependency (grounded on
/// the teacher's `DataElement<I>`/`Value<I>` split).
#[derive(Debug, Clone, PartialEq)]
pub enum Value<I> {
    /// A primitive (non-sequence) value.
    Primitive(PrimitiveValue),
    /// An ordered list of nested items (data sets).
    Sequence(Sequence<I>),
}

impl<I> Value<I> {
    /// The byte extent of this value (0 for an undefined-length sequence).
    pub fn byte_len(&self) -> Length {
        match self {
            Value::Primitive(p) => Length::defined(p.byte_len() as u32),
            Value::Sequence(_) => Length::UNDEFINED,
        }
    }
}

/// Trait for anything that carries a DICOM header (tag + length), shared
/// by headers, items and full elements (grounded on
/// `dicom-core::header::Header`).
pub trait Header {
    /// The element's tag.
    fn tag(&self) -> Tag;
    /// The element's declared value length.
    fn len(&self) -> Length;

    /// Whether this is the Item sentinel, `(FFFE,E000)`.
    fn is_item(&self) -> bool {
        self.tag().is_item()
    }
    /// Whether this is the Item Delimiter sentinel, `(FFFE,E00D)`.
    fn is_item_delimiter(&self) -> bool {
        self.tag().is_item_delimiter()
    }
    /// Whether this is the Sequence Delimiter sentinel, `(FFFE,E0DD)`.
    fn is_sequence_delimiter(&self) -> bool {
        self.tag().is_sequence_delimiter()
    }
}

/// A header-only element descriptor: `(tag, vr, length)`, with no value
/// attached yet. Produced by the parser before the body is read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataElementHeader {
    pub tag: Tag,
    pub vr: VR,
    pub len: Length,
}

impl DataElementHeader {
    pub fn new(tag: Tag, vr: VR, len: Length) -> Self {
        DataElementHeader { tag, vr, len }
    }
}

impl Header for DataElementHeader {
    fn tag(&self) -> Tag {
        self.tag
    }
    fn len(&self) -> Length {
        self.len
    }
}

/// The three structural markers that can appear where an Item is
/// expected inside a Sequence: the Item header itself, or one of the two
/// delimiter sentinels that close an undefined-length construct (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SequenceItemHeader {
    /// `(FFFE,E000)`, with its declared length (possibly undefined).
    Item { len: Length },
    /// `(FFFE,E00D)`, always length 0.
    ItemDelimiter,
    /// `(FFFE,E0DD)`, always length 0.
    SequenceDelimiter,
}

impl SequenceItemHeader {
    /// Build a `SequenceItemHeader` from a raw `(tag, length)` pair,
    /// validating that delimiter tags carry a zero length as the
    /// standard requires.
    pub fn new(tag: Tag, len: Length) -> Result<Self> {
        if tag.is_item() {
            Ok(SequenceItemHeader::Item { len })
        } else if tag.is_item_delimiter() {
            ensure!(len == Length::ZERO, WrongClassSnafu);
            Ok(SequenceItemHeader::ItemDelimiter)
        } else if tag.is_sequence_delimiter() {
            ensure!(len == Length::ZERO, WrongClassSnafu);
            Ok(SequenceItemHeader::SequenceDelimiter)
        } else {
            WrongClassSnafu.fail()
        }
    }
}

impl Header for SequenceItemHeader {
    fn tag(&self) -> Tag {
        match self {
            SequenceItemHeader::Item { .. } => Tag::ITEM,
            SequenceItemHeader::ItemDelimiter => Tag::ITEM_DELIMITER,
            SequenceItemHeader::SequenceDelimiter => Tag::SEQUENCE_DELIMITER,
        }
    }
    fn len(&self) -> Length {
        match self {
            SequenceItemHeader::Item { len } => *len,
            SequenceItemHeader::ItemDelimiter | SequenceItemHeader::SequenceDelimiter => {
                Length::ZERO
            }
        }
    }
}

/// A fully owned data element: `(tag, vr, value)`, generic over the
/// nested item type `I` (§3, §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct DataElement<I> {
    tag: Tag,
    vr: VR,
    value: Value<I>,
}

impl<I> DataElement<I> {
    /// Construct an element with a primitive value already decoded.
    pub fn new_primitive(tag: Tag, vr: VR, value: PrimitiveValue) -> Self {
        DataElement {
            tag,
            vr,
            value: Value::Primitive(value),
        }
    }

    /// Construct a Sequence element. `vr` must be `VR::SQ`; this is
    /// enforced by the caller (`Element::set_sequence` in `dicom-object`).
    pub fn new_sequence(tag: Tag, sequence: Sequence<I>) -> Self {
        DataElement {
            tag,
            vr: VR::SQ,
            value: Value::Sequence(sequence),
        }
    }

    /// The element's tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The element's value representation.
    pub fn vr(&self) -> VR {
        self.vr
    }

    /// The element's value.
    pub fn value(&self) -> &Value<I> {
        &self.value
    }

    /// Mutable access to the element's value (used by handlers while
    /// building; not exposed once the owning Data Set is locked).
    pub fn value_mut(&mut self) -> &mut Value<I> {
        &mut self.value
    }

    /// The element's declared length.
    pub fn len(&self) -> Length {
        self.value.byte_len()
    }

    /// The element's value multiplicity (0 for an empty/undefined-length
    /// value, otherwise derived from the underlying primitive value or
    /// the enclosing sequence's item count).
    pub fn vm(&self) -> usize {
        match &self.value {
            Value::Primitive(p) => p.multiplicity(),
            Value::Sequence(s) => s.len(),
        }
    }
}

impl<I> Header for DataElement<I> {
    fn tag(&self) -> Tag {
        self.tag
    }
    fn len(&self) -> Length {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_single_keeps_embedded_backslash_as_one_item() {
        let v = PrimitiveValue::decode(VR::ST, b"a\\b ", false).unwrap();
        assert_eq!(v.multiplicity(), 1);
        assert_eq!(v.to_str().unwrap(), "a\\b");
    }

    #[test]
    fn string_multi_splits_on_backslash() {
        let v = PrimitiveValue::decode(VR::CS, b"A\\B\\C", false).unwrap();
        assert_eq!(v.multiplicity(), 3);
        assert_eq!(v.strings().unwrap(), &["A", "B", "C"]);
    }

    #[test]
    fn ui_is_never_trimmed() {
        let v = PrimitiveValue::decode(VR::UI, b"1.2.3\0", false).unwrap();
        assert_eq!(v.to_str().unwrap(), "1.2.3\0");
    }

    #[test]
    fn non_ui_strips_one_trailing_pad_byte_only() {
        let v = PrimitiveValue::decode(VR::LO, b"ABC  ", false).unwrap();
        // only the last padding byte is stripped, the embedded space remains
        assert_eq!(v.to_str().unwrap(), "ABC ");
    }

    #[test]
    fn numeric_length_must_be_aligned() {
        let err = PrimitiveValue::decode(VR::US, &[0u8; 3], false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn numeric_byteswap_applies_only_to_numbers() {
        let swapped = PrimitiveValue::decode(VR::US, &[0x01, 0x00], true).unwrap();
        assert_eq!(swapped.integer(0).unwrap(), 1); // 0x0001 big-endian -> 1
        let unswapped = PrimitiveValue::decode(VR::US, &[0x01, 0x00], false).unwrap();
        assert_eq!(unswapped.integer(0).unwrap(), 1); // 0x0001 little-endian -> 1

        let swapped = PrimitiveValue::decode(VR::US, &[0x00, 0x01], true).unwrap();
        assert_eq!(swapped.integer(0).unwrap(), 1);
        let unswapped = PrimitiveValue::decode(VR::US, &[0x00, 0x01], false).unwrap();
        assert_eq!(unswapped.integer(0).unwrap(), 256);
    }

    #[test]
    fn at_packs_group_and_element_not_a_plain_u32() {
        // tag (0018,1063), little-endian wire bytes: group then element,
        // each a 16-bit LE half.
        let v = PrimitiveValue::decode(VR::AT, &[0x18, 0x00, 0x63, 0x10], false).unwrap();
        assert_eq!(v.integer(0).unwrap(), 0x0018_1063);
    }

    #[test]
    fn at_honors_big_endian_per_half() {
        // same tag, big-endian wire bytes: each 16-bit half reversed, but
        // group and element halves are not transposed with each other.
        let v = PrimitiveValue::decode(VR::AT, &[0x00, 0x18, 0x10, 0x63], true).unwrap();
        assert_eq!(v.integer(0).unwrap(), 0x0018_1063);
    }

    #[test]
    fn invalid_utf8_reports_the_actual_vr() {
        let err = PrimitiveValue::decode(VR::PN, &[0xFF, 0xFE], false).unwrap_err();
        match err {
            Error::NotUtf8 { vr } => assert_eq!(vr, VR::PN),
            other => panic!("expected NotUtf8, got {other:?}"),
        }
    }

    #[test]
    fn binary_is_never_byte_swapped() {
        let a = PrimitiveValue::decode(VR::OB, &[0x00, 0x01], false).unwrap();
        let b = PrimitiveValue::decode(VR::OB, &[0x00, 0x01], true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_value_has_vm_zero() {
        let v = PrimitiveValue::decode(VR::US, &[], false).unwrap();
        assert_eq!(v.multiplicity(), 0);
    }

    #[test]
    fn sequence_item_header_rejects_nonzero_delimiter_length() {
        assert!(SequenceItemHeader::new(Tag::ITEM, Length::defined(16)).is_ok());
        assert!(SequenceItemHeader::new(Tag::ITEM_DELIMITER, Length::ZERO).is_ok());
        assert!(SequenceItemHeader::new(Tag::ITEM_DELIMITER, Length::defined(4)).is_err());
    }

    #[test]
    fn sequence_lock_blocks_mutation() {
        let mut seq: Sequence<u32> = Sequence::new();
        seq.append(1).unwrap();
        seq.lock();
        assert!(seq.append(2).is_err());
        assert_eq!(seq.len(), 1);
    }
}
