//! The recursive-descent parser engine (§4.5): walks a byte stream and
//! emits events to a [`Handler`], without ever materialising elements
//! itself. Grounded on the teacher's `DataSetReader` state machine in
//! `dicom-parser::dataset::read`, re-architected around explicit
//! recursive functions per element/sequence/item rather than an
//! `Iterator::next` state machine, to match the push-style `Handler`
//! contract.

use std::io::{Read, Seek};

use dicom_core::dictionary::DataDictionary;
use dicom_core::length::Length;
use dicom_core::tag::Tag;
use dicom_core::value::{Header, SequenceItemHeader};
use dicom_core::vr::VR;
use snafu::ResultExt;

use crate::decode::{self, Encoding, HeaderEvent, StatefulDecoder};
use crate::handler::Handler;

#[derive(Debug, snafu::Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("{source}"))]
    Decode { source: decode::Error },

    #[snafu(display("handler rejected element {tag} ({vr}): {source}"))]
    Handler {
        tag: Tag,
        vr: VR,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[snafu(display("expected an Item header inside sequence {tag}, found something else"))]
    ExpectedItem { tag: Tag },

    #[snafu(display(
        "group parser expected a group length element at the start of group {group:#06x}"
    ))]
    MissingGroupLength { group: u16 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl dicom_core::error::HasKind for Error {
    fn kind(&self) -> dicom_core::error::ErrorKind {
        use dicom_core::error::ErrorKind;
        match self {
            Error::Decode { source } => source.kind(),
            Error::Handler { .. } => ErrorKind::Invalid,
            Error::ExpectedItem { .. } | Error::MissingGroupLength { .. } => ErrorKind::Parse,
        }
    }
}

fn handler_err(tag: Tag, vr: VR, source: crate::handler::HandlerError) -> Error {
    Error::Handler { tag, vr, source }
}

/// A recursive-descent DICOM data set parser over a single byte stream.
pub struct Parser<'d, S> {
    decoder: StatefulDecoder<'d, S>,
}

impl<'d, S: Read> Parser<'d, S> {
    pub fn new(source: S, encoding: Encoding, dictionary: &'d dyn DataDictionary) -> Self {
        Parser {
            decoder: StatefulDecoder::new(source, encoding, dictionary),
        }
    }

    pub fn from_decoder(decoder: StatefulDecoder<'d, S>) -> Self {
        Parser { decoder }
    }

    pub fn into_decoder(self) -> StatefulDecoder<'d, S> {
        self.decoder
    }

    pub fn decoder(&self) -> &StatefulDecoder<'d, S> {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut StatefulDecoder<'d, S> {
        &mut self.decoder
    }

    /// Parse a single, already-positioned element (header + body),
    /// recursing into [`parse_sequence`](Self::parse_sequence) for SQ.
    /// Used both by the top-level loop and by data-set bodies nested
    /// inside sequence items.
    fn parse_one_element(&mut self, handler: &mut dyn Handler) -> Result<()> {
        let header = self.decoder.decode_header().context(DecodeSnafu)?;
        self.dispatch_element(header.tag, header.vr, header.len, handler)
    }

    fn dispatch_element(
        &mut self,
        tag: Tag,
        vr: VR,
        len: Length,
        handler: &mut dyn Handler,
    ) -> Result<()> {
        if vr == VR::SQ {
            return self.parse_sequence(tag, vr, len, handler);
        }
        let bytes = self
            .decoder
            .read_element_value(&dicom_core::value::DataElementHeader::new(tag, vr, len))
            .context(DecodeSnafu)?;
        handler
            .element_create(tag, vr, &bytes)
            .map_err(|e| handler_err(tag, vr, e))
    }

    /// Parse an SQ element's value: a sequence of Items, each containing
    /// a nested data set, terminated either by a declared byte length or
    /// by a Sequence Delimiter.
    fn parse_sequence(
        &mut self,
        tag: Tag,
        vr: VR,
        length: Length,
        handler: &mut dyn Handler,
    ) -> Result<()> {
        tracing::trace!(%tag, defined = !length.is_undefined(), "entering sequence");
        handler.sequence_begin().map_err(|e| handler_err(tag, vr, e))?;

        if length.is_undefined() {
            loop {
                match self.decoder.decode_header_or_delimiter().context(DecodeSnafu)? {
                    HeaderEvent::SequenceDelimiter => break,
                    HeaderEvent::Element(header) if header.tag.is_item() => {
                        self.parse_item(header.len, handler)?;
                    }
                    _ => return ExpectedItemSnafu { tag }.fail(),
                }
            }
        } else {
            let start = self.decoder.position();
            let end = start + length.get() as u64;
            while self.decoder.position() < end {
                let item_header = self.decoder.decode_item_header().context(DecodeSnafu)?;
                match item_header {
                    SequenceItemHeader::Item { len } => self.parse_item(len, handler)?,
                    _ => return ExpectedItemSnafu { tag }.fail(),
                }
            }
        }

        handler
            .sequence_end(tag, vr, length)
            .map_err(|e| handler_err(tag, vr, e))
    }

    /// Parse one sequence Item's inner data set.
    fn parse_item(&mut self, len: Length, handler: &mut dyn Handler) -> Result<()> {
        handler
            .dataset_begin()
            .map_err(|e| handler_err(Tag::ITEM, VR::SQ, e))?;

        if len.is_undefined() {
            loop {
                match self.decoder.decode_header_or_delimiter().context(DecodeSnafu)? {
                    HeaderEvent::ItemDelimiter => break,
                    HeaderEvent::Element(header) => {
                        self.dispatch_element(header.tag, header.vr, header.len, handler)?;
                    }
                    HeaderEvent::SequenceDelimiter => {
                        return ExpectedItemSnafu { tag: Tag::ITEM_DELIMITER }.fail()
                    }
                }
            }
        } else {
            let start = self.decoder.position();
            let end = start + len.get() as u64;
            while self.decoder.position() < end {
                self.parse_one_element(handler)?;
            }
        }

        handler
            .dataset_end()
            .map_err(|e| handler_err(Tag::ITEM, VR::SQ, e))
    }

    /// Parse a top-level data set: elements in sequence until EOF, a
    /// trailing-padding tag, or the handler's `stop` predicate fires.
    /// On `stop`, the stream is rewound to the start of the offending
    /// element's header before returning, so the caller can resume.
    pub fn parse_toplevel_dataset(&mut self, handler: &mut dyn Handler) -> Result<()>
    where
        S: Seek,
    {
        handler
            .dataset_begin()
            .map_err(|e| handler_err(Tag::NIL, VR::UN, e))?;

        loop {
            let header_start = self.decoder.position();
            let header = match self.decoder.decode_header() {
                Ok(header) => header,
                Err(decode::Error::Io { .. }) => break, // clean EOF between elements
                Err(source) => return Err(Error::Decode { source }),
            };

            if header.tag == Tag::TRAILING_PADDING {
                tracing::trace!(tag = %header.tag, "reached trailing padding, stopping");
                self.decoder.rewind_to(header_start).context(DecodeSnafu)?;
                break;
            }

            let should_stop = handler
                .stop(header.tag, header.vr, header.len)
                .map_err(|e| handler_err(header.tag, header.vr, e))?;
            if should_stop {
                tracing::debug!(tag = %header.tag, position = header_start, "handler requested stop");
                self.decoder.rewind_to(header_start).context(DecodeSnafu)?;
                break;
            }

            self.dispatch_element(header.tag, header.vr, header.len, handler)?;
        }

        handler
            .dataset_end()
            .map_err(|e| handler_err(Tag::NIL, VR::UN, e))
    }

    /// Parse a single group: the first element must be `(group,0000)`
    /// VR UL, whose value is the byte length of the elements that
    /// follow. Used for File Meta Information (group `0x0002`).
    pub fn parse_group(&mut self, group: u16, handler: &mut dyn Handler) -> Result<()> {
        handler
            .dataset_begin()
            .map_err(|e| handler_err(Tag(group, 0), VR::UL, e))?;

        let header = self.decoder.decode_header().context(DecodeSnafu)?;
        if header.tag != Tag(group, 0x0000) || header.vr != VR::UL {
            return MissingGroupLengthSnafu { group }.fail();
        }
        let bytes = self
            .decoder
            .read_element_value(&header)
            .context(DecodeSnafu)?;
        let group_length = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        handler
            .element_create(header.tag, header.vr, &bytes)
            .map_err(|e| handler_err(header.tag, header.vr, e))?;

        let start = self.decoder.position();
        let end = start + group_length as u64;
        while self.decoder.position() < end {
            self.parse_one_element(handler)?;
        }

        handler
            .dataset_end()
            .map_err(|e| handler_err(Tag(group, 0), VR::UL, e))
    }
}
