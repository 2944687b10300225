//! The event-driven callback contract the parser engine drives (§4.5).
//!
//! Grounded on the teacher's `DataSetReader`/`DataToken` iterator model in
//! `dicom-parser::dataset::read`, re-expressed as a push-style handler
//! object per the spec's explicit five-callback-plus-stop contract,
//! rather than as an `Iterator`.

use dicom_core::length::Length;
use dicom_core::tag::Tag;
use dicom_core::vr::VR;

/// The boxed error type a [`Handler`] may raise to abort a parse in progress.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors a [`Handler`] may raise to abort a parse in progress.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Implemented by anything that wants to observe a parse as it happens.
/// Every method has a no-op default so a handler only overrides the
/// events it actually cares about (e.g. the frame-index builder never
/// touches most `element_create` calls).
pub trait Handler {
    /// Entering a new data set: the top-level one, or a Sequence item.
    fn dataset_begin(&mut self) -> HandlerResult<()> {
        Ok(())
    }

    /// Leaving the current data set.
    fn dataset_end(&mut self) -> HandlerResult<()> {
        Ok(())
    }

    /// Entering an SQ element's value, before its items are parsed. The
    /// element's tag/VR/length are only known once the sequence closes
    /// (an undefined-length SQ doesn't have its length until then), so
    /// they're reported on [`sequence_end`](Handler::sequence_end)
    /// instead.
    fn sequence_begin(&mut self) -> HandlerResult<()> {
        Ok(())
    }

    /// Leaving an SQ element's value, after all of its items.
    fn sequence_end(&mut self, tag: Tag, vr: VR, length: Length) -> HandlerResult<()> {
        let _ = (tag, vr, length);
        Ok(())
    }

    /// A non-SQ element's raw value bytes, already byte-order corrected
    /// for numeric VRs. The handler copies or adopts `bytes` as it sees
    /// fit; it is not retained by the parser after this call returns.
    fn element_create(&mut self, tag: Tag, vr: VR, bytes: &[u8]) -> HandlerResult<()> {
        let _ = (tag, vr, bytes);
        Ok(())
    }

    /// Queried before each top-level element header is consumed.
    /// Returning `Ok(true)` tells the parser to rewind to the start of
    /// that header and return control to the caller without parsing it.
    fn stop(&mut self, tag: Tag, vr: VR, length: Length) -> HandlerResult<bool> {
        let _ = (tag, vr, length);
        Ok(false)
    }
}

/// A handler that does nothing and never stops; useful as a placeholder
/// or for exercising the parser engine in isolation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHandler;

impl Handler for NullHandler {}
