//! The concrete element type and its typed setters/getters (§4.4).
//!
//! `dicom-core::value::DataElement<I>` is left generic over the nested
//! item type so this crate can tie the Data-Set-contains-Elements-
//! contains-Sequences-contains-Data-Sets knot: `Element` and `Sequence`
//! here are exactly that generic type instantiated with
//! [`DataSet`](crate::dataset::DataSet). Setters live on an extension
//! trait ([`ElementExt`]) rather than as inherent methods, since Rust's
//! orphan rules forbid inherent `impl`s on a type alias for a type
//! defined in another crate.

use std::borrow::Cow;

use dicom_core::dictionary::DataDictionary;
use dicom_core::tag::Tag;
use dicom_core::value::{DataElement as CoreDataElement, PrimitiveValue, Sequence as CoreSequence, Value};
use dicom_core::vr::{VRClass, VR};
use smallvec::smallvec;
use snafu::ensure;

use crate::dataset::DataSet;
use crate::error::{
    EmptyMultiplicitySnafu, Result, WrongClassSnafu, WrongSetterForVrSnafu, WrongVrForTagSnafu,
};

/// A fully owned data element whose nested items (for SQ) are
/// [`DataSet`]s.
pub type Element = CoreDataElement<DataSet>;
/// An ordered list of [`DataSet`] items, the value of a Sequence element.
pub type Sequence = CoreSequence<DataSet>;

/// Construct an empty element, validating that `vr` is one of the VRs
/// `dict` permits for `tag` (§4.4's `create`). Unknown tags (most
/// commonly private ones) impose no VR constraint.
pub fn create(dict: &dyn DataDictionary, tag: Tag, vr: VR) -> Result<Element> {
    ensure!(
        dicom_dictionary_std::is_valid_vr_for_tag(dict, vr, tag),
        WrongVrForTagSnafu { tag, vr }
    );
    Ok(Element::new_primitive(tag, vr, PrimitiveValue::Empty))
}

/// Build an element directly from an already-decoded raw value. This is
/// the parser's sole write path into the object model (§4.4's
/// `set_value`/`Element::set_raw_bytes`); it is deliberately not part of
/// [`ElementExt`] and is only reachable from within this crate's own
/// handlers (§9's resolved Open Question on `dcm_element_set_value`'s
/// visibility).
pub(crate) fn from_raw_bytes(tag: Tag, vr: VR, bytes: &[u8], swap: bool) -> Result<Element> {
    let value = PrimitiveValue::decode(vr, bytes, swap)?;
    Ok(Element::new_primitive(tag, vr, value))
}

fn ensure_class(tag: Tag, vr: VR, expected: VRClass) -> Result<()> {
    ensure!(vr.class() == expected, WrongClassSnafu { tag, vr, expected });
    Ok(())
}

/// Typed setters and getters over [`Element`] (§4.4). Each setter
/// validates the element's VR class before mutating its value; getters
/// validate class and, where relevant, index.
pub trait ElementExt {
    /// Copy `text` into a StringSingle/StringMulti-class element as its
    /// sole value.
    fn set_string_copy(&mut self, text: &str) -> Result<()>;
    /// Adopt an owned `String` into a StringSingle/StringMulti-class
    /// element as its sole value.
    fn set_string_owned(&mut self, text: String) -> Result<()>;
    /// Copy `texts` into a StringMulti-class element as its
    /// backslash-joined value items.
    fn set_string_multi_copy(&mut self, texts: &[&str]) -> Result<()>;
    /// Adopt already-owned strings into a StringMulti-class element.
    fn set_string_multi_owned(&mut self, texts: Vec<String>) -> Result<()>;
    /// Set a NumericInteger-class scalar element, narrowing `value` to the
    /// VR's width. Rejects VR AT: a tag-valued element's 32 bits are two
    /// packed 16-bit halves, not one scalar, so it is set through
    /// [`set_tag_value`](Self::set_tag_value) instead, which takes the
    /// packing out of the caller's hands.
    fn set_integer(&mut self, value: i64) -> Result<()>;
    /// Set an AT-class scalar element from a [`Tag`], packed the same way
    /// the wire format and [`PrimitiveValue::U32`](dicom_core::value::PrimitiveValue::U32)
    /// both do: `(group as u32) << 16 | element as u32`.
    fn set_tag_value(&mut self, value: Tag) -> Result<()>;
    /// Set a NumericInteger/NumericDecimal-class element's values from a
    /// slice of a VR-compatible Rust numeric type.
    fn set_numeric_multi<T: NumericValue>(&mut self, values: &[T]) -> Result<()>;
    /// Set a NumericDecimal-class scalar element, widening `value` as
    /// needed.
    fn set_decimal(&mut self, value: f64) -> Result<()>;
    /// Copy `bytes` into a Binary-class element.
    fn set_binary_copy(&mut self, bytes: &[u8]) -> Result<()>;
    /// Adopt an owned byte buffer into a Binary-class element.
    fn set_binary_owned(&mut self, bytes: Vec<u8>) -> Result<()>;
    /// Attach `sequence` to an SQ element, taking ownership.
    fn set_sequence(&mut self, sequence: Sequence) -> Result<()>;

    /// Borrow the element's value as a single string.
    fn get_string(&self) -> Result<Cow<'_, str>>;
    /// Borrow the element's value as a slice of strings.
    fn get_strings(&self) -> Result<&[String]>;
    /// Fetch one value as a widened 64-bit signed integer.
    fn get_integer(&self, index: usize) -> Result<i64>;
    /// Fetch the element's sole value as a [`Tag`] (VR AT only), unpacking
    /// the group/element halves back out of the stored `u32`.
    fn get_tag_value(&self) -> Result<Tag>;
    /// Fetch one value as a widened 64-bit float.
    fn get_decimal(&self, index: usize) -> Result<f64>;
    /// Borrow the element's value as an opaque byte slice.
    fn get_binary(&self) -> Result<&[u8]>;
    /// Borrow the element's nested sequence.
    fn get_sequence(&self) -> Result<&Sequence>;
}

impl ElementExt for Element {
    fn set_string_copy(&mut self, text: &str) -> Result<()> {
        self.set_string_owned(text.to_owned())
    }

    fn set_string_owned(&mut self, text: String) -> Result<()> {
        let vr = self.vr();
        ensure!(
            matches!(vr.class(), VRClass::StringSingle | VRClass::StringMulti),
            WrongClassSnafu {
                tag: self.tag(),
                vr,
                expected: VRClass::StringMulti,
            }
        );
        *self.value_mut() = Value::Primitive(PrimitiveValue::Strings(smallvec![text]));
        Ok(())
    }

    fn set_string_multi_copy(&mut self, texts: &[&str]) -> Result<()> {
        self.set_string_multi_owned(texts.iter().map(|s| (*s).to_owned()).collect())
    }

    fn set_string_multi_owned(&mut self, texts: Vec<String>) -> Result<()> {
        let vr = self.vr();
        ensure_class(self.tag(), vr, VRClass::StringMulti)?;
        ensure!(!texts.is_empty(), EmptyMultiplicitySnafu { tag: self.tag() });
        *self.value_mut() = Value::Primitive(PrimitiveValue::Strings(texts.into()));
        Ok(())
    }

    fn set_integer(&mut self, value: i64) -> Result<()> {
        let vr = self.vr();
        ensure_class(self.tag(), vr, VRClass::NumericInteger)?;
        ensure!(vr != VR::AT, WrongSetterForVrSnafu { tag: self.tag(), vr });
        let pv = match vr {
            VR::SS => PrimitiveValue::I16(smallvec![value as i16]),
            VR::US => PrimitiveValue::U16(smallvec![value as u16]),
            VR::SL => PrimitiveValue::I32(smallvec![value as i32]),
            VR::UL | VR::OL => PrimitiveValue::U32(smallvec![value as u32]),
            VR::SV => PrimitiveValue::I64(smallvec![value]),
            VR::UV | VR::OV => PrimitiveValue::U64(smallvec![value as u64]),
            VR::AT => unreachable!("rejected above"),
            _ => unreachable!("VRClass::NumericInteger covers exactly these VRs"),
        };
        *self.value_mut() = Value::Primitive(pv);
        Ok(())
    }

    fn set_tag_value(&mut self, value: Tag) -> Result<()> {
        let vr = self.vr();
        ensure!(vr == VR::AT, WrongSetterForVrSnafu { tag: self.tag(), vr });
        let packed = (value.group() as u32) << 16 | value.element() as u32;
        *self.value_mut() = Value::Primitive(PrimitiveValue::U32(smallvec![packed]));
        Ok(())
    }

    fn set_numeric_multi<T: NumericValue>(&mut self, values: &[T]) -> Result<()> {
        let vr = self.vr();
        ensure!(
            matches!(vr.class(), VRClass::NumericInteger | VRClass::NumericDecimal),
            WrongClassSnafu {
                tag: self.tag(),
                vr,
                expected: VRClass::NumericInteger,
            }
        );
        ensure!(!values.is_empty(), EmptyMultiplicitySnafu { tag: self.tag() });
        *self.value_mut() = Value::Primitive(T::into_primitive(values));
        Ok(())
    }

    fn set_decimal(&mut self, value: f64) -> Result<()> {
        let vr = self.vr();
        ensure_class(self.tag(), vr, VRClass::NumericDecimal)?;
        let pv = match vr {
            VR::FL | VR::OF => PrimitiveValue::F32(smallvec![value as f32]),
            VR::FD | VR::OD => PrimitiveValue::F64(smallvec![value]),
            _ => unreachable!("VRClass::NumericDecimal covers exactly these VRs"),
        };
        *self.value_mut() = Value::Primitive(pv);
        Ok(())
    }

    fn set_binary_copy(&mut self, bytes: &[u8]) -> Result<()> {
        self.set_binary_owned(bytes.to_vec())
    }

    fn set_binary_owned(&mut self, bytes: Vec<u8>) -> Result<()> {
        let vr = self.vr();
        ensure_class(self.tag(), vr, VRClass::Binary)?;
        *self.value_mut() = Value::Primitive(PrimitiveValue::Bytes(bytes));
        Ok(())
    }

    fn set_sequence(&mut self, sequence: Sequence) -> Result<()> {
        ensure!(
            self.vr() == VR::SQ,
            WrongClassSnafu {
                tag: self.tag(),
                vr: self.vr(),
                expected: VRClass::Sequence,
            }
        );
        *self.value_mut() = Value::Sequence(sequence);
        Ok(())
    }

    fn get_string(&self) -> Result<Cow<'_, str>> {
        match self.value() {
            Value::Primitive(p) => Ok(p.to_str()?),
            Value::Sequence(_) => {
                return WrongClassSnafu {
                    tag: self.tag(),
                    vr: self.vr(),
                    expected: VRClass::StringSingle,
                }
                .fail()
            }
        }
    }

    fn get_strings(&self) -> Result<&[String]> {
        match self.value() {
            Value::Primitive(p) => Ok(p.strings()?),
            Value::Sequence(_) => {
                return WrongClassSnafu {
                    tag: self.tag(),
                    vr: self.vr(),
                    expected: VRClass::StringMulti,
                }
                .fail()
            }
        }
    }

    fn get_integer(&self, index: usize) -> Result<i64> {
        match self.value() {
            Value::Primitive(p) => Ok(p.integer(index)?),
            Value::Sequence(_) => {
                return WrongClassSnafu {
                    tag: self.tag(),
                    vr: self.vr(),
                    expected: VRClass::NumericInteger,
                }
                .fail()
            }
        }
    }

    fn get_tag_value(&self) -> Result<Tag> {
        let vr = self.vr();
        ensure!(vr == VR::AT, WrongSetterForVrSnafu { tag: self.tag(), vr });
        let packed = match self.value() {
            Value::Primitive(p) => p.integer(0)? as u32,
            Value::Sequence(_) => {
                return WrongClassSnafu {
                    tag: self.tag(),
                    vr,
                    expected: VRClass::NumericInteger,
                }
                .fail()
            }
        };
        Ok(Tag((packed >> 16) as u16, packed as u16))
    }

    fn get_decimal(&self, index: usize) -> Result<f64> {
        match self.value() {
            Value::Primitive(p) => Ok(p.decimal(index)?),
            Value::Sequence(_) => {
                return WrongClassSnafu {
                    tag: self.tag(),
                    vr: self.vr(),
                    expected: VRClass::NumericDecimal,
                }
                .fail()
            }
        }
    }

    fn get_binary(&self) -> Result<&[u8]> {
        match self.value() {
            Value::Primitive(p) => Ok(p.bytes()?),
            Value::Sequence(_) => {
                return WrongClassSnafu {
                    tag: self.tag(),
                    vr: self.vr(),
                    expected: VRClass::Binary,
                }
                .fail()
            }
        }
    }

    fn get_sequence(&self) -> Result<&Sequence> {
        match self.value() {
            Value::Sequence(s) => Ok(s),
            Value::Primitive(_) => {
                return WrongClassSnafu {
                    tag: self.tag(),
                    vr: self.vr(),
                    expected: VRClass::Sequence,
                }
                .fail()
            }
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// The small set of Rust numeric types that map onto a NumericInteger or
/// NumericDecimal VR, sealed so [`ElementExt::set_numeric_multi`]'s VR
/// dispatch is resolved entirely at compile time (§4.4's
/// `set_numeric_multi`).
pub trait NumericValue: sealed::Sealed + Copy {
    #[doc(hidden)]
    fn into_primitive(values: &[Self]) -> PrimitiveValue;
}

macro_rules! impl_numeric_value {
    ($ty:ty, $variant:ident) => {
        impl sealed::Sealed for $ty {}
        impl NumericValue for $ty {
            fn into_primitive(values: &[Self]) -> PrimitiveValue {
                PrimitiveValue::$variant(values.iter().copied().collect())
            }
        }
    };
}

impl_numeric_value!(i16, I16);
impl_numeric_value!(u16, U16);
impl_numeric_value!(i32, I32);
impl_numeric_value!(u32, U32);
impl_numeric_value!(i64, I64);
impl_numeric_value!(u64, U64);
impl_numeric_value!(f32, F32);
impl_numeric_value!(f64, F64);
