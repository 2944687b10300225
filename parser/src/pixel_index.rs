//! The pixel-data frame index and single-frame readers (§4.5's
//! "Pixel-data index parser" / "Single-frame parser").
//!
//! Grounded directly on `original_source/src/dicom-parse.c`'s
//! `dcm_parse_pixeldata`/`dcm_parse_frame`: read the Pixel Data element
//! header, then its first Item (the Basic Offset Table); if that Item
//! carries a value, decode it as `num_frames` little-endian offsets; if
//! it is empty, scan the following Item headers instead, recording the
//! position of each Item header itself as `offsets[i] = position - 8`
//! (the 8 bytes being the Item's own tag+length).
//!
//! This module knows nothing about the object model above it — it reads
//! raw bytes through a [`StatefulDecoder`] and returns plain offsets/byte
//! buffers. `dicom-object`'s filehandle is the only caller, and it is
//! also the only place that knows about the Extended Offset Table
//! fallback (§4.5 point 3, §9's resolved Open Question), since that data
//! comes from ordinary data elements in the metadata subset rather than
//! from Pixel Data itself.

use std::io::{Read, Seek};

use dicom_core::length::Length;
use dicom_core::tag::Tag;
use dicom_core::value::SequenceItemHeader;
use snafu::{ensure, ResultExt, Snafu};

use crate::decode::{self, StatefulDecoder};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("{source}"))]
    Decode { source: decode::Error },

    #[snafu(display("expected a Pixel Data element, found tag {tag}"))]
    NotPixelData { tag: Tag },

    #[snafu(display("Basic Offset Table Item has undefined length"))]
    UndefinedBotLength,

    #[snafu(display(
        "Basic Offset Table carries {found} offsets, expected {expected} (one per frame)"
    ))]
    BotFrameCountMismatch { found: usize, expected: usize },

    #[snafu(display(
        "Extended Offset Table carries {found} offsets, expected {expected} (one per frame)"
    ))]
    EotFrameCountMismatch { found: usize, expected: usize },

    #[snafu(display("expected an Item header for frame {frame}, found a Sequence Delimiter early"))]
    TruncatedFrameScan { frame: usize },

    #[snafu(display("expected an Item header at the frame boundary, found a delimiter"))]
    MissingFrameItem,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl dicom_core::error::HasKind for Error {
    fn kind(&self) -> dicom_core::error::ErrorKind {
        use dicom_core::error::ErrorKind;
        match self {
            Error::Decode { source } => source.kind(),
            Error::NotPixelData { .. }
            | Error::UndefinedBotLength
            | Error::BotFrameCountMismatch { .. }
            | Error::EotFrameCountMismatch { .. }
            | Error::TruncatedFrameScan { .. }
            | Error::MissingFrameItem => ErrorKind::Parse,
        }
    }
}

/// The frame index produced by [`read_pixel_data_index`]: for each
/// frame, a byte offset measured from the first byte after the Basic
/// Offset Table Item's value (§4.5's "first frame's absolute offset").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelDataIndex {
    /// Absolute stream position of the first frame's Item header (or, for
    /// native pixel data with no BOT at all, of the first frame's bytes).
    pub first_frame_offset: u64,
    /// Per-frame byte offsets, relative to `first_frame_offset`.
    pub offsets: Vec<u64>,
}

/// Read the Pixel Data frame index. The decoder must be positioned at
/// the start of the Pixel Data element header (one of the three
/// variants: standard, float or double). `num_frames` is taken from
/// `NumberOfFrames` in the metadata subset (defaulting to 1 when absent,
/// as the caller's responsibility).
///
/// `extended_offset_table` carries the decoded `(7FE0,0001) Extended
/// Offset Table` OV array, if the metadata subset's pre-pixel-data scan
/// found one (§4.5 point 3, §9's resolved Open Question): when the Basic
/// Offset Table turns out to be empty, this array is consulted before
/// falling back to scanning every frame Item header. Pass `None` when no
/// Extended Offset Table was present, or when it is out of scope for the
/// caller.
pub fn read_pixel_data_index<S: Read + Seek>(
    decoder: &mut StatefulDecoder<'_, S>,
    num_frames: usize,
    extended_offset_table: Option<&[u64]>,
) -> Result<PixelDataIndex> {
    let header = decoder.decode_header().context(DecodeSnafu)?;
    ensure!(header.tag.is_pixel_data(), NotPixelDataSnafu { tag: header.tag });

    let bot_header = decoder.decode_item_header().context(DecodeSnafu)?;
    let bot_len = match bot_header {
        SequenceItemHeader::Item { len } => len,
        _ => return MissingFrameItemSnafu.fail(),
    };
    ensure!(!bot_len.is_undefined(), UndefinedBotLengthSnafu);

    if bot_len.get() > 0 {
        tracing::debug!(bot_len = bot_len.get(), num_frames, "reading Basic Offset Table");
        read_offsets_from_bot(decoder, bot_len, num_frames)
    } else if let Some(offsets) = extended_offset_table {
        tracing::debug!(num_frames, "Basic Offset Table empty, using Extended Offset Table");
        index_from_extended_offset_table(decoder.position(), offsets, num_frames)
    } else {
        tracing::debug!(num_frames, "Basic Offset Table empty, scanning frame items");
        scan_frame_offsets(decoder, num_frames)
    }
}

/// The Basic Offset Table is present but empty, and the metadata subset
/// carried a usable Extended Offset Table: its offsets are already
/// measured from the same reference point the Basic Offset Table would
/// use (the first byte after the Basic Offset Table Item's value), so
/// they can be adopted directly with no scan (§4.5 point 3).
fn index_from_extended_offset_table(
    first_frame_offset: u64,
    offsets: &[u64],
    num_frames: usize,
) -> Result<PixelDataIndex> {
    ensure!(
        offsets.len() == num_frames,
        EotFrameCountMismatchSnafu {
            found: offsets.len(),
            expected: num_frames,
        }
    );
    Ok(PixelDataIndex {
        first_frame_offset,
        offsets: offsets.to_vec(),
    })
}

/// The Basic Offset Table is present and non-empty: decode it as
/// `num_frames` little-endian 32-bit offsets (§4.5 point 2, §6's BOT
/// description).
fn read_offsets_from_bot<S: Read + Seek>(
    decoder: &mut StatefulDecoder<'_, S>,
    bot_len: Length,
    num_frames: usize,
) -> Result<PixelDataIndex> {
    let raw = decoder.read_value_bytes(bot_len.get()).context(DecodeSnafu)?;
    let found = raw.len() / 4;
    ensure!(
        found == num_frames,
        BotFrameCountMismatchSnafu {
            found,
            expected: num_frames
        }
    );

    let offsets = raw
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as u64)
        .collect();

    Ok(PixelDataIndex {
        first_frame_offset: decoder.position(),
        offsets,
    })
}

/// The Basic Offset Table is present but empty: scan the following Item
/// headers directly, recording the absolute position of each Item
/// header (§4.5 point 2's scan fallback, grounded on
/// `dcm_parse_pixeldata`'s `offsets[i] = position - 8`).
fn scan_frame_offsets<S: Read + Seek>(
    decoder: &mut StatefulDecoder<'_, S>,
    num_frames: usize,
) -> Result<PixelDataIndex> {
    let first_frame_offset = decoder.position();
    let mut offsets = Vec::with_capacity(num_frames);

    for frame in 0..num_frames {
        let item_start = decoder.position();
        match decoder.decode_item_header().context(DecodeSnafu)? {
            SequenceItemHeader::Item { len } => {
                offsets.push(item_start - first_frame_offset);
                if !len.is_undefined() {
                    decoder.skip_bytes(len.get() as u64).context(DecodeSnafu)?;
                }
            }
            SequenceItemHeader::SequenceDelimiter | SequenceItemHeader::ItemDelimiter => {
                return TruncatedFrameScanSnafu { frame }.fail();
            }
        }
    }

    Ok(PixelDataIndex {
        first_frame_offset,
        offsets,
    })
}

/// One frame's minimal pixel descriptor, enough to size a native
/// (non-encapsulated) frame's byte extent (§3's Frame fields, restricted
/// to what [`read_frame_body`] needs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub rows: u32,
    pub columns: u32,
    pub samples_per_pixel: u32,
    pub bits_allocated: u32,
}

impl FrameGeometry {
    /// Byte extent of one native frame: `rows * columns * samples *
    /// (bits_allocated / 8)` (§4.5's single-frame parser, §6's native
    /// Pixel Data layout).
    pub fn byte_len(&self) -> usize {
        (self.rows as usize)
            * (self.columns as usize)
            * (self.samples_per_pixel as usize)
            * ((self.bits_allocated as usize + 7) / 8)
    }
}

/// Read one frame's body. The decoder must already be positioned at the
/// frame's start (`first_frame_offset + offsets[n-1]`, per
/// [`PixelDataIndex`]): an Item header for encapsulated transfer
/// syntaxes, or raw pixel bytes otherwise (§4.5, §6).
pub fn read_frame_body<S: Read + Seek>(
    decoder: &mut StatefulDecoder<'_, S>,
    geometry: FrameGeometry,
    encapsulated: bool,
) -> Result<Vec<u8>> {
    let len = if encapsulated {
        match decoder.decode_item_header().context(DecodeSnafu)? {
            SequenceItemHeader::Item { len } => {
                ensure!(!len.is_undefined(), UndefinedBotLengthSnafu);
                len.get() as usize
            }
            _ => return MissingFrameItemSnafu.fail(),
        }
    } else {
        geometry.byte_len()
    };

    let bytes = decoder.read_value_bytes(len as u32).context(DecodeSnafu)?;
    Ok(bytes.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Encoding;
    use dicom_core::dictionary::EmptyDataDictionary;
    use std::io::Cursor;

    fn encapsulated_pixel_data_two_frames() -> Vec<u8> {
        let mut bytes = Vec::new();
        // (7FE0,0010) OB, undefined length
        bytes.extend_from_slice(&[0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00]);
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        // BOT item, length 8, two offsets: 0 and 0x20
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&8u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0x20u32.to_le_bytes());
        // frame 1 item, 32 bytes of 0xAA
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.extend(std::iter::repeat(0xAA).take(32));
        // frame 2 item, 32 bytes of 0xBB
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.extend(std::iter::repeat(0xBB).take(32));
        // sequence delimiter
        bytes.extend_from_slice(&[0xFE, 0xFF, 0xDD, 0xE0]);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes
    }

    #[test]
    fn bot_present_yields_offsets_from_table() {
        let bytes = encapsulated_pixel_data_two_frames();
        let dict = EmptyDataDictionary;
        let mut decoder =
            StatefulDecoder::new(Cursor::new(bytes), Encoding::EXPLICIT_LITTLE_ENDIAN, &dict);
        let index = read_pixel_data_index(&mut decoder, 2, None).unwrap();
        assert_eq!(index.offsets, vec![0, 0x20]);

        decoder
            .rewind_to(index.first_frame_offset + index.offsets[0])
            .unwrap();
        let geometry = FrameGeometry {
            rows: 0,
            columns: 0,
            samples_per_pixel: 0,
            bits_allocated: 0,
        };
        let frame = read_frame_body(&mut decoder, geometry, true).unwrap();
        assert_eq!(frame, vec![0xAA; 32]);

        decoder
            .rewind_to(index.first_frame_offset + index.offsets[1])
            .unwrap();
        let frame = read_frame_body(&mut decoder, geometry, true).unwrap();
        assert_eq!(frame, vec![0xBB; 32]);
    }

    #[test]
    fn empty_bot_falls_back_to_scanning_item_headers() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00]);
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        // empty BOT
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        // frame 1
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.extend(std::iter::repeat(0xAA).take(32));
        // frame 2
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.extend(std::iter::repeat(0xBB).take(32));
        bytes.extend_from_slice(&[0xFE, 0xFF, 0xDD, 0xE0]);
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let dict = EmptyDataDictionary;
        let mut decoder =
            StatefulDecoder::new(Cursor::new(bytes), Encoding::EXPLICIT_LITTLE_ENDIAN, &dict);
        let index = read_pixel_data_index(&mut decoder, 2, None).unwrap();
        assert_eq!(index.offsets, vec![0, 0x28]); // 8-byte item header + 32-byte value
    }

    #[test]
    fn empty_bot_with_extended_offset_table_skips_the_scan() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00]);
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        // empty BOT
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        // frame 1, present at the Extended Offset Table's claimed offset 0
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.extend(std::iter::repeat(0xAA).take(32));
        // frame 2, present at the Extended Offset Table's claimed offset 0x28
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.extend(std::iter::repeat(0xBB).take(32));
        bytes.extend_from_slice(&[0xFE, 0xFF, 0xDD, 0xE0]);
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let dict = EmptyDataDictionary;
        let mut decoder =
            StatefulDecoder::new(Cursor::new(bytes), Encoding::EXPLICIT_LITTLE_ENDIAN, &dict);
        let eot = [0u64, 0x28];
        let index = read_pixel_data_index(&mut decoder, 2, Some(&eot)).unwrap();
        assert_eq!(index.offsets, vec![0, 0x28]);

        decoder
            .rewind_to(index.first_frame_offset + index.offsets[1])
            .unwrap();
        let geometry = FrameGeometry {
            rows: 0,
            columns: 0,
            samples_per_pixel: 0,
            bits_allocated: 0,
        };
        let frame = read_frame_body(&mut decoder, geometry, true).unwrap();
        assert_eq!(frame, vec![0xBB; 32]);
    }

    #[test]
    fn extended_offset_table_frame_count_mismatch_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00]);
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let dict = EmptyDataDictionary;
        let mut decoder =
            StatefulDecoder::new(Cursor::new(bytes), Encoding::EXPLICIT_LITTLE_ENDIAN, &dict);
        let eot = [0u64];
        assert!(read_pixel_data_index(&mut decoder, 2, Some(&eot)).is_err());
    }

    #[test]
    fn native_frame_geometry_sizes_byte_extent() {
        let geometry = FrameGeometry {
            rows: 4,
            columns: 4,
            samples_per_pixel: 3,
            bits_allocated: 16,
        };
        assert_eq!(geometry.byte_len(), 4 * 4 * 3 * 2);
    }
}
