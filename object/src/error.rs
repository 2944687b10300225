//! The object-model-level error type (§4.3, §7): wraps every lower-layer
//! error this crate can propagate, plus the handful of failure modes that
//! only make sense once a Data Set exists (locked-container mutation,
//! duplicate insertion, missing frame).
//!
//! Grounded on the teacher's `dicom-object::mem::Error` and
//! `dicom-object::meta::Error`, which both thread `#[snafu(context(false))]`
//! conversions from the lower crates the same way this does.

use dicom_core::error::{ErrorKind, HasKind};
use dicom_core::tag::Tag;
use dicom_core::vr::VR;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("{source}"))]
    Decode { source: dicom_parser::decode::Error },

    #[snafu(display("{source}"))]
    Engine { source: dicom_parser::engine::Error },

    #[snafu(display("{source}"))]
    PixelIndex { source: dicom_parser::pixel_index::Error },

    #[snafu(display("{source}"))]
    Value { source: dicom_core::value::Error },

    #[snafu(display("VR {vr} is not permitted for element {tag}"))]
    WrongVrForTag { tag: Tag, vr: VR },

    #[snafu(display("operation requires a value of class {expected:?}, element {tag} has VR {vr}"))]
    WrongClass {
        tag: Tag,
        vr: VR,
        expected: dicom_core::vr::VRClass,
    },

    #[snafu(display("data set is locked and cannot be mutated"))]
    Locked,

    #[snafu(display("data set already has an element tagged {tag}"))]
    DuplicateTag { tag: Tag },

    #[snafu(display("element {tag} requires at least one value"))]
    EmptyMultiplicity { tag: Tag },

    #[snafu(display("no element tagged {tag}"))]
    NoSuchTag { tag: Tag },

    #[snafu(display("missing required file meta element `{alias}`"))]
    MissingFileMetaElement { alias: &'static str },

    #[snafu(display("file meta group is missing the DICM magic code"))]
    NotDicom,

    #[snafu(display("no frame at column {column}, row {row}"))]
    MissingFrame { column: u32, row: u32 },

    #[snafu(display("frame number {frame} is out of range (1..={count})"))]
    FrameOutOfRange { frame: u32, count: usize },

    #[snafu(display("missing pixel descriptor field `{alias}`"))]
    MissingPixelDescriptor { alias: &'static str },

    #[snafu(display("VR {vr} on element {tag} must be set through its dedicated setter"))]
    WrongSetterForVr { tag: Tag, vr: VR },

    #[snafu(display("{source}"))]
    Io { source: std::io::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Decode { source } => source.kind(),
            Error::Engine { source } => source.kind(),
            Error::PixelIndex { source } => source.kind(),
            Error::Value { source } => source.kind(),
            Error::WrongVrForTag { .. }
            | Error::WrongClass { .. }
            | Error::Locked
            | Error::DuplicateTag { .. }
            | Error::EmptyMultiplicity { .. }
            | Error::NoSuchTag { .. }
            | Error::MissingPixelDescriptor { .. }
            | Error::WrongSetterForVr { .. } => ErrorKind::Invalid,
            Error::MissingFileMetaElement { .. } | Error::NotDicom => ErrorKind::Parse,
            Error::MissingFrame { .. } => ErrorKind::MissingFrame,
            Error::FrameOutOfRange { .. } => ErrorKind::Invalid,
            Error::Io { .. } => ErrorKind::Io,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

impl From<dicom_parser::decode::Error> for Error {
    fn from(source: dicom_parser::decode::Error) -> Self {
        Error::Decode { source }
    }
}

impl From<dicom_parser::engine::Error> for Error {
    fn from(source: dicom_parser::engine::Error) -> Self {
        Error::Engine { source }
    }
}

impl From<dicom_parser::pixel_index::Error> for Error {
    fn from(source: dicom_parser::pixel_index::Error) -> Self {
        Error::PixelIndex { source }
    }
}

impl From<dicom_core::value::Error> for Error {
    fn from(source: dicom_core::value::Error) -> Self {
        Error::Value { source }
    }
}
