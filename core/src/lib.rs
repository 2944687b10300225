//! Core types shared across the workspace: tags, VRs, lengths, the
//! element/value model and the dictionary trait seam.
//!
//! This crate has no knowledge of any particular byte encoding or file
//! layout; those live in `dicom-parser` and `dicom-object` respectively.
//! Grounded on the teacher crate's own `dicom-core`, trimmed to the
//! pieces the rest of the workspace actually builds on.

pub mod dictionary;
pub mod error;
pub mod length;
pub mod tag;
pub mod value;
pub mod vr;

pub use dictionary::{DataDictionary, DictionaryEntry, EmptyDataDictionary};
pub use error::{ErrorKind, HasKind};
pub use length::Length;
pub use tag::Tag;
pub use value::{DataElement, DataElementHeader, Header, PrimitiveValue, Sequence, SequenceItemHeader, Value};
pub use vr::{VRClass, VrSpec, VR};
