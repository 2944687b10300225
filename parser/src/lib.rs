//! A pull-style, event-driven parser for DICOM Part 10 data sets.
//!
//! This crate owns the byte-level concerns of the workspace (§4.5 of the
//! design): stateful decoding of element/item headers and raw value
//! bytes for the three supported transfer syntax families, the
//! recursive-descent [`Parser`] engine that drives a caller-supplied
//! [`Handler`] through a data set's elements and nested sequences, and
//! the frame-index / single-frame readers that let a caller randomly
//! access Pixel Data without parsing the whole stream.
//!
//! It knows nothing about *building* a Data Set — that is
//! `dicom-object`'s job, one layer up, via the handlers it implements
//! against this crate's [`Handler`] trait.

pub mod decode;
pub mod engine;
pub mod handler;
pub mod pixel_index;
pub mod transfer_syntax;

pub use decode::{Encoding, StatefulDecoder};
pub use engine::Parser;
pub use handler::{Handler, HandlerError, HandlerResult, NullHandler};
pub use pixel_index::{read_frame_body, read_pixel_data_index, PixelDataIndex};
