//! A high-level API for reading DICOM Part 10 objects (§1): the
//! filehandle, its backing Data Set/Element/Sequence/Frame value model,
//! and the handler-driven builders that feed it from the parser engine.
//!
//! Grounded on the teacher crate of the same name, `dicom-object`, whose
//! module layout (`mem`/`meta`/`pixeldata`) this workspace re-partitions
//! around a single `Filehandle` entry point (`file`) sitting on top of
//! an owned `DataSet`/`Element`/`Frame` model (`dataset`/`element`/`frame`),
//! a dedicated error channel (`error`), the parser-facing handlers
//! (`handlers`), and the I/O backends (`io`).

pub mod dataset;
pub mod element;
pub mod error;
pub mod file;
pub mod frame;
pub mod handlers;
pub mod io;
pub mod meta;

pub use dataset::DataSet;
pub use element::{Element, ElementExt, Sequence};
pub use error::{Error, Result};
pub use file::Filehandle;
pub use frame::{Frame, PixelRepresentation, PlanarConfiguration};
pub use io::{FileBackend, OwnedMemoryBackend, ReadSeek};
pub use meta::FileMetaTable;
