//! Stateful decoding of DICOM element and item headers, and of raw value
//! bytes, for the three supported transfer syntax families (§4.5).
//!
//! Grounded on `dicom-parser::stateful::decode::StatefulDecoder` /
//! `StatefulDecode` of the teacher crate: a small struct wrapping a
//! reader plus the encoding parameters, exposing `decode_header`,
//! `decode_item_header` and the value-reading entry points. The
//! teacher's `TransferSyntax`-driven codec dispatch collapses here into
//! a two-field [`Encoding`], since this parser only ever needs the three
//! uncompressed LE/BE/implicit codecs (pixel codecs are out of scope).

use std::io::Read;

use dicom_core::dictionary::DataDictionary;
use dicom_core::length::Length;
use dicom_core::tag::Tag;
use dicom_core::value::{DataElementHeader, SequenceItemHeader};
use dicom_core::vr::{HeaderLength, VR};
use smallvec::SmallVec;
use snafu::{ensure, ResultExt, Snafu};

use dicom_core::error::{ErrorKind, HasKind};

/// Scratch buffer size below which a value read never touches the heap
/// (grounded on the teacher's pervasive `SmallVec`-backed value storage).
pub const INLINE_VALUE_CAPACITY: usize = 256;

/// A raw element value, inline up to [`INLINE_VALUE_CAPACITY`] bytes and
/// heap-allocated beyond that.
pub type ValueBuffer = SmallVec<[u8; INLINE_VALUE_CAPACITY]>;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("failed to read {what} at position {position}"))]
    Io {
        what: &'static str,
        position: u64,
        source: std::io::Error,
    },

    #[snafu(display("not a recognised value representation: {bytes:?}"))]
    BadVr { bytes: [u8; 2] },

    #[snafu(display("reserved bytes after VR {vr} at position {position} were not zero"))]
    NonZeroReserved { vr: VR, position: u64 },

    #[snafu(display("expected an Item, Item Delimiter or Sequence Delimiter tag, found {tag}"))]
    NotAnItemTag { tag: Tag },

    #[snafu(display("{source}"))]
    MalformedItem { source: dicom_core::value::Error },

    #[snafu(display(
        "value length {len} for VR {vr} is not a multiple of its element size ({size})"
    ))]
    MisalignedLength { vr: VR, size: usize, len: u32 },

    #[snafu(display("could not allocate {requested} bytes for a value read"))]
    OutOfMemory {
        requested: usize,
        source: std::collections::TryReserveError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Io { .. } => ErrorKind::Io,
            Error::BadVr { .. }
            | Error::NonZeroReserved { .. }
            | Error::NotAnItemTag { .. }
            | Error::MalformedItem { .. }
            | Error::MisalignedLength { .. } => ErrorKind::Parse,
            Error::OutOfMemory { .. } => ErrorKind::OutOfMemory,
        }
    }
}

/// The two binary parameters that fully determine how a data set's
/// elements are laid out (§4.5). File Meta Information is always
/// `Encoding::EXPLICIT_LITTLE_ENDIAN`; the data set proper uses whatever
/// the Transfer Syntax UID names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    pub explicit_vr: bool,
    pub big_endian: bool,
}

impl Encoding {
    pub const EXPLICIT_LITTLE_ENDIAN: Encoding = Encoding {
        explicit_vr: true,
        big_endian: false,
    };
    pub const IMPLICIT_LITTLE_ENDIAN: Encoding = Encoding {
        explicit_vr: false,
        big_endian: false,
    };
    pub const EXPLICIT_BIG_ENDIAN: Encoding = Encoding {
        explicit_vr: true,
        big_endian: true,
    };
}

/// A reader wrapped with the encoding parameters and dictionary needed
/// to decode element headers and values one at a time.
pub struct StatefulDecoder<'d, S> {
    source: S,
    encoding: Encoding,
    dictionary: &'d dyn DataDictionary,
    position: u64,
}

impl<'d, S: Read> StatefulDecoder<'d, S> {
    pub fn new(source: S, encoding: Encoding, dictionary: &'d dyn DataDictionary) -> Self {
        StatefulDecoder {
            source,
            encoding,
            dictionary,
            position: 0,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    /// Bytes consumed from the underlying reader since construction.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn require(&mut self, buf: &mut [u8], what: &'static str) -> Result<()> {
        self.source.read_exact(buf).context(IoSnafu {
            what,
            position: self.position,
        })?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn read_u16(&mut self, what: &'static str) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.require(&mut buf, what)?;
        Ok(if self.encoding.big_endian {
            u16::from_be_bytes(buf)
        } else {
            u16::from_le_bytes(buf)
        })
    }

    fn read_u32(&mut self, what: &'static str) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.require(&mut buf, what)?;
        Ok(if self.encoding.big_endian {
            u32::from_be_bytes(buf)
        } else {
            u32::from_le_bytes(buf)
        })
    }

    fn read_tag(&mut self) -> Result<Tag> {
        let group = self.read_u16("tag group")?;
        let element = self.read_u16("tag element")?;
        Ok(Tag(group, element))
    }

    /// Decode one element header. Implicit VR resolves the VR via the
    /// dictionary (falling back to `UN` for unrecognised tags, per the
    /// standard's own implicit-VR fallback rule); explicit VR reads it
    /// directly off the wire and validates the reserved bytes of the
    /// long header form.
    pub fn decode_header(&mut self) -> Result<DataElementHeader> {
        let tag = self.read_tag()?;

        if !self.encoding.explicit_vr {
            let len = self.read_u32("implicit value length")?;
            let vr = self
                .dictionary
                .by_tag(tag)
                .map(|entry| VrSpec::from(entry.vr).canonical())
                .unwrap_or(VR::UN);
            return Ok(DataElementHeader::new(tag, vr, Length::new(len)));
        }

        let mut vr_bytes = [0u8; 2];
        self.require(&mut vr_bytes, "VR code")?;
        let vr = VR::from_bytes(vr_bytes).ok_or(Error::BadVr { bytes: vr_bytes })?;

        let len = match vr.header_length() {
            HeaderLength::Short => self.read_u32_from_u16("short-form length")?,
            HeaderLength::Long => {
                let mut reserved = [0u8; 2];
                self.require(&mut reserved, "reserved bytes")?;
                ensure!(
                    reserved == [0, 0],
                    NonZeroReservedSnafu {
                        vr,
                        position: self.position
                    }
                );
                self.read_u32("long-form length")?
            }
        };
        Ok(DataElementHeader::new(tag, vr, Length::new(len)))
    }

    fn read_u32_from_u16(&mut self, what: &'static str) -> Result<u32> {
        Ok(self.read_u16(what)? as u32)
    }

    /// Decode an Item / Item Delimiter / Sequence Delimiter header: these
    /// are always `(tag, 4-byte length)` with no VR, in either encoding.
    pub fn decode_item_header(&mut self) -> Result<SequenceItemHeader> {
        let tag = self.read_tag()?;
        ensure!(
            tag.is_item() || tag.is_item_delimiter() || tag.is_sequence_delimiter(),
            NotAnItemTagSnafu { tag }
        );
        let len = self.read_u32("item length")?;
        SequenceItemHeader::new(tag, Length::new(len)).context(MalformedItemSnafu)
    }

    /// Read a header's value bytes verbatim, without any byte-order
    /// correction. `len` must be defined (callers never call this for
    /// undefined-length SQ headers).
    pub fn read_value_bytes(&mut self, len: u32) -> Result<ValueBuffer> {
        let mut buf: ValueBuffer = SmallVec::new();
        buf.try_reserve(len as usize)
            .context(OutOfMemorySnafu {
                requested: len as usize,
            })?;
        buf.resize(len as usize, 0);
        self.require(&mut buf, "element value")?;
        Ok(buf)
    }

    /// Read a numeric element's value, byte-swapping each `sizeof(vr)`
    /// chunk into little-endian order when the stream is big-endian, so
    /// that the bytes handed to a [`Handler`](crate::handler::Handler)
    /// are always ready for `PrimitiveValue::decode(vr, bytes, false)`
    /// (§4.5's "already byte-swapped for numerics").
    pub fn read_element_value(&mut self, header: &DataElementHeader) -> Result<ValueBuffer> {
        let len = header.len.get();
        let mut buf = self.read_value_bytes(len)?;
        if self.encoding.big_endian {
            byteswap_in_place(&mut buf, header.vr)?;
        }
        Ok(buf)
    }

    /// Skip `len` bytes without retaining them (used to discard a value
    /// the handler has no use for, though this parser never does that
    /// today — kept for parity with the teacher's `skip_bytes`).
    pub fn skip_bytes(&mut self, len: u64) -> Result<()> {
        let mut remaining = len;
        let mut scratch = [0u8; 4096];
        while remaining > 0 {
            let chunk = remaining.min(scratch.len() as u64) as usize;
            self.require(&mut scratch[..chunk], "skipped bytes")?;
            remaining -= chunk as u64;
        }
        Ok(())
    }
}

/// The outcome of peeking at the next structural tag inside an
/// undefined-length construct: either a normal element header, or one of
/// the two delimiter sentinels that close it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaderEvent {
    Element(DataElementHeader),
    ItemDelimiter,
    SequenceDelimiter,
}

impl<'d, S: Read + std::io::Seek> StatefulDecoder<'d, S> {
    /// Rewind the stream to an absolute position previously observed via
    /// [`position`](Self::position) (§4.5's "rewind to the start of the
    /// current element's header" stop behaviour).
    pub fn rewind_to(&mut self, position: u64) -> Result<()> {
        self.source
            .seek(std::io::SeekFrom::Start(position))
            .context(IoSnafu {
                what: "rewind",
                position: self.position,
            })?;
        self.position = position;
        Ok(())
    }

    /// Read the next tag and decide whether it is an Item Delimiter, a
    /// Sequence Delimiter, or the start of a normal element header —
    /// rewinding and delegating to [`decode_header`](Self::decode_header)
    /// in the last case. Used inside undefined-length items/sequences,
    /// where a delimiter can appear where an element header is
    /// otherwise expected.
    pub fn decode_header_or_delimiter(&mut self) -> Result<HeaderEvent> {
        let start = self.position;
        let tag = self.read_tag()?;
        if tag.is_item_delimiter() || tag.is_sequence_delimiter() {
            let len = self.read_u32("delimiter length")?;
            let header = SequenceItemHeader::new(tag, Length::new(len)).context(MalformedItemSnafu)?;
            return Ok(match header {
                SequenceItemHeader::ItemDelimiter => HeaderEvent::ItemDelimiter,
                SequenceItemHeader::SequenceDelimiter => HeaderEvent::SequenceDelimiter,
                SequenceItemHeader::Item { .. } => unreachable!(),
            });
        }
        self.rewind_to(start)?;
        Ok(HeaderEvent::Element(self.decode_header()?))
    }
}

use dicom_core::vr::VrSpec;

fn byteswap_in_place(buf: &mut [u8], vr: VR) -> Result<()> {
    let size = vr.sizeof();
    if size <= 1 {
        return Ok(());
    }
    ensure!(
        buf.len() % size == 0,
        MisalignedLengthSnafu {
            vr,
            size,
            len: buf.len() as u32,
        }
    );
    if vr == VR::AT {
        // An AT value is two independent 16-bit fields (group, element),
        // not one 32-bit word: reversing the full 4-byte chunk would
        // transpose the halves along with correcting their byte order.
        // Swap each half in place instead, leaving (group, element) order
        // untouched.
        for chunk in buf.chunks_exact_mut(size) {
            chunk[0..2].reverse();
            chunk[2..4].reverse();
        }
        return Ok(());
    }
    for chunk in buf.chunks_exact_mut(size) {
        chunk.reverse();
    }
    Ok(())
}
