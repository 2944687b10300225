//! The three concrete [`Handler`](dicom_parser::handler::Handler)
//! implementations the filehandle drives the parser with (§4.6).
//!
//! Grounded on the teacher's `dicom-parser::dataset::read::DataSetReader`
//! plus `InMemDicomObject::build_object`, which walk the same token
//! stream to the same end (a nested `DataSet`/`Sequence` tree); the stack
//! discipline here (`dataset_stack` + `sequence_stack`, rebuilt on every
//! `dataset_begin`/`sequence_begin` and folded back on the matching
//! `_end`) is this crate's re-expression of that builder over the
//! push-style `Handler` contract instead of an iterator of tokens.

use std::collections::{HashMap, HashSet};

use dicom_core::dictionary::DataDictionary;
use dicom_core::length::Length;
use dicom_core::tag::Tag;
use dicom_core::vr::VR;
use dicom_parser::handler::{Handler, HandlerResult};

use crate::dataset::DataSet;
use crate::element::{self, ElementExt, Sequence};
use crate::frame::{PixelRepresentation, PlanarConfiguration};

/// Rows, `(0028,0010)`.
pub(crate) const TAG_ROWS: Tag = Tag(0x0028, 0x0010);
/// Columns, `(0028,0011)`.
pub(crate) const TAG_COLUMNS: Tag = Tag(0x0028, 0x0011);
/// Samples per Pixel, `(0028,0002)`.
pub(crate) const TAG_SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
/// Bits Allocated, `(0028,0100)`.
pub(crate) const TAG_BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
/// Bits Stored, `(0028,0101)`.
pub(crate) const TAG_BITS_STORED: Tag = Tag(0x0028, 0x0101);
/// High Bit, `(0028,0102)`.
pub(crate) const TAG_HIGH_BIT: Tag = Tag(0x0028, 0x0102);
/// Pixel Representation, `(0028,0103)`.
pub(crate) const TAG_PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
/// Planar Configuration, `(0028,0006)`.
pub(crate) const TAG_PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
/// Photometric Interpretation, `(0028,0004)`.
pub(crate) const TAG_PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
/// Per-frame Functional Groups Sequence, `(5200,9230)`.
pub const TAG_PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE: Tag = Tag(0x5200, 0x9230);
/// Plane Position (Slide) Sequence, `(0048,0102)`.
const TAG_PLANE_POSITION_SLIDE_SEQUENCE: Tag = Tag(0x0048, 0x0102);
/// Column Position In Total Image Pixel Matrix, `(0048,021E)`.
const TAG_COLUMN_POSITION: Tag = Tag(0x0048, 0x021E);
/// Row Position In Total Image Pixel Matrix, `(0048,021F)`.
const TAG_ROW_POSITION: Tag = Tag(0x0048, 0x021F);
/// Extended Offset Table, `(7FE0,0001)`.
pub(crate) const TAG_EXTENDED_OFFSET_TABLE: Tag = Tag::EXTENDED_OFFSET_TABLE;
/// Extended Offset Table Lengths, `(7FE0,0002)`.
pub(crate) const TAG_EXTENDED_OFFSET_TABLE_LENGTHS: Tag = Tag::EXTENDED_OFFSET_TABLE_LENGTHS;

fn handler_err(err: crate::error::Error) -> dicom_parser::handler::HandlerError {
    Box::new(err)
}

/// Every value of an OV element, widened to `u64` (the Extended Offset
/// Table's pair of parallel arrays are the only place this crate reads a
/// full numeric value multiplicity rather than a single scalar). Shared
/// with [`crate::file`], which consults the same tags directly against
/// the cached metadata subset when they were gathered there instead of
/// by this builder (§4.7's field-lookup fallback pattern).
pub(crate) fn all_u64(el: &crate::element::Element) -> Option<Vec<u64>> {
    match el.value() {
        dicom_core::value::Value::Primitive(p) => {
            (0..p.multiplicity()).map(|i| p.integer(i).ok().map(|v| v as u64)).collect()
        }
        dicom_core::value::Value::Sequence(_) => None,
    }
}

/// When the metadata builder's top-level loop should hand control back
/// to its caller (§4.6's "configurable stop predicate", §9).
#[derive(Debug, Clone)]
pub enum StopCondition {
    /// Parse the whole data set; never stop early (used for the File
    /// Meta Information group, and for a standalone object with no
    /// pixel data to avoid reading).
    Never,
    /// Stop before any element whose tag is in this set.
    OnTags(HashSet<Tag>),
    /// Stop before any Pixel Data tag (short, float or double variant).
    OnPixelData,
}

impl StopCondition {
    fn should_stop(&self, tag: Tag) -> bool {
        match self {
            StopCondition::Never => false,
            StopCondition::OnTags(tags) => tags.contains(&tag),
            StopCondition::OnPixelData => tag.is_pixel_data(),
        }
    }
}

/// Builds a nested [`DataSet`] from parser events (§4.6's "Metadata
/// builder"). Also used, with [`StopCondition::Never`], as the File Meta
/// Information builder inside `parse_group`.
pub struct DataSetBuilder<'d> {
    dict: &'d dyn DataDictionary,
    stop: StopCondition,
    dataset_stack: Vec<DataSet>,
    sequence_stack: Vec<(Tag, VR, Sequence)>,
    result: Option<DataSet>,
}

impl<'d> DataSetBuilder<'d> {
    pub fn new(dict: &'d dyn DataDictionary, stop: StopCondition) -> Self {
        DataSetBuilder {
            dict,
            stop,
            dataset_stack: Vec::new(),
            sequence_stack: Vec::new(),
            result: None,
        }
    }

    /// Take the finished data set. `None` until `dataset_end` has closed
    /// the top-level data set (i.e. the parse has actually completed).
    pub fn into_data_set(self) -> Option<DataSet> {
        self.result
    }

    fn current_dataset_mut(&mut self) -> &mut DataSet {
        self.dataset_stack
            .last_mut()
            .expect("element_create/sequence_end called outside any open data set")
    }

    /// Whether every currently open sequence has already closed — i.e.
    /// the data set about to be popped is the true top-level one, not a
    /// sequence item (sequences always close before the data set that
    /// contains them, so this is a more direct test than the dataset
    /// stack's own depth).
    fn at_top_level(&self) -> bool {
        self.sequence_stack.is_empty()
    }

    /// Pop the outermost open sequence without wrapping it in an
    /// element or inserting it anywhere (§4.6's frame-index builder,
    /// which wants the raw nested tree, not an owning `DataSet`). Only
    /// meaningful once every item of that sequence has closed and no
    /// data set is left open.
    pub fn take_top_sequence(&mut self) -> Option<Sequence> {
        debug_assert!(self.dataset_stack.is_empty());
        self.sequence_stack.pop().map(|(_, _, seq)| seq)
    }
}

impl<'d> Handler for DataSetBuilder<'d> {
    fn dataset_begin(&mut self) -> HandlerResult<()> {
        self.dataset_stack.push(DataSet::new());
        Ok(())
    }

    fn dataset_end(&mut self) -> HandlerResult<()> {
        let finished = self
            .dataset_stack
            .pop()
            .expect("dataset_end without a matching dataset_begin");
        if self.at_top_level() {
            self.result = Some(finished);
        } else {
            let (_, _, seq) = self
                .sequence_stack
                .last_mut()
                .expect("nested dataset_end with no open sequence to append the item to");
            seq.append(finished)
                .map_err(|e| -> dicom_parser::handler::HandlerError { Box::new(e) })?;
        }
        Ok(())
    }

    fn sequence_begin(&mut self) -> HandlerResult<()> {
        // the element's own tag/vr arrive later, at `sequence_end`; a
        // placeholder pair is filled in then.
        self.sequence_stack.push((Tag::NIL, VR::SQ, Sequence::new()));
        Ok(())
    }

    fn sequence_end(&mut self, tag: Tag, _vr: VR, _length: Length) -> HandlerResult<()> {
        let (_, _, seq) = self
            .sequence_stack
            .pop()
            .expect("sequence_end without a matching sequence_begin");
        let sq_element = dicom_core::value::DataElement::new_sequence(tag, seq);
        self.current_dataset_mut()
            .insert(sq_element)
            .map_err(handler_err)?;
        Ok(())
    }

    fn element_create(&mut self, tag: Tag, vr: VR, bytes: &[u8]) -> HandlerResult<()> {
        let el = element::from_raw_bytes(tag, vr, bytes, false).map_err(handler_err)?;
        self.current_dataset_mut().insert(el).map_err(handler_err)?;
        Ok(())
    }

    fn stop(&mut self, tag: Tag, _vr: VR, _length: Length) -> HandlerResult<bool> {
        Ok(self.stop.should_stop(tag))
    }
}

/// The minimal pixel descriptor the frame navigator needs, gathered by
/// [`FrameIndexBuilder`] without materialising the whole data set
/// (§4.6's "Frame index builder").
#[derive(Debug, Clone, Default)]
pub struct PixelDescriptor {
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    pub samples_per_pixel: Option<u16>,
    pub bits_allocated: Option<u16>,
    pub bits_stored: Option<u16>,
    pub high_bit: Option<u16>,
    pub pixel_representation: Option<PixelRepresentation>,
    pub planar_configuration: Option<PlanarConfiguration>,
    pub photometric_interpretation: Option<String>,
    /// `(7FE0,0001) Extended Offset Table`, decoded as absolute offsets
    /// (§4.5 point 3, §9). `None` unless the metadata subset carried one.
    pub extended_offset_table: Option<Vec<u64>>,
    /// `(7FE0,0002) Extended Offset Table Lengths`, parallel to
    /// `extended_offset_table`.
    pub extended_offset_table_lengths: Option<Vec<u64>>,
}

/// Scans a data set for the pixel descriptor fields plus an optional
/// `(column, row) -> frame_number` map built from `PerFrameFunctionalGroupsSequence
/// -> PlanePositionSlideSequence` items (§4.6 point 3). Only this one
/// sequence is materialised as a nested tree; every other element is
/// folded directly into the flat descriptor and discarded.
pub struct FrameIndexBuilder<'d> {
    dict: &'d dyn DataDictionary,
    stop: StopCondition,
    descriptor: PixelDescriptor,
    position_map: HashMap<(u32, u32), u32>,
    /// Set once we're inside `PerFrameFunctionalGroupsSequence`; `None`
    /// elsewhere, so unrelated sequences are skipped entirely.
    frame_group_builder: Option<DataSetBuilder<'d>>,
    frame_group_depth: usize,
}

impl<'d> FrameIndexBuilder<'d> {
    /// `stop` lets the filehandle's pre-frame scan halt at Pixel Data
    /// the same way the metadata builder does, so this handler only
    /// ever sees the bytes between the metadata subset's stop point and
    /// Pixel Data (§4.7's "ReadPixelIndex" phase).
    pub fn new(dict: &'d dyn DataDictionary, stop: StopCondition) -> Self {
        FrameIndexBuilder {
            dict,
            stop,
            descriptor: PixelDescriptor::default(),
            position_map: HashMap::new(),
            frame_group_builder: None,
            frame_group_depth: 0,
        }
    }

    pub fn into_parts(self) -> (PixelDescriptor, HashMap<(u32, u32), u32>) {
        (self.descriptor, self.position_map)
    }

    fn record_flat(&mut self, tag: Tag, vr: VR, bytes: &[u8]) -> HandlerResult<()> {
        let el = element::from_raw_bytes(tag, vr, bytes, false).map_err(handler_err)?;
        match tag {
            TAG_ROWS => self.descriptor.rows = el.get_integer(0).ok().map(|v| v as u32),
            TAG_COLUMNS => self.descriptor.columns = el.get_integer(0).ok().map(|v| v as u32),
            TAG_SAMPLES_PER_PIXEL => {
                self.descriptor.samples_per_pixel = el.get_integer(0).ok().map(|v| v as u16)
            }
            TAG_BITS_ALLOCATED => {
                self.descriptor.bits_allocated = el.get_integer(0).ok().map(|v| v as u16)
            }
            TAG_BITS_STORED => {
                self.descriptor.bits_stored = el.get_integer(0).ok().map(|v| v as u16)
            }
            TAG_HIGH_BIT => self.descriptor.high_bit = el.get_integer(0).ok().map(|v| v as u16),
            TAG_PIXEL_REPRESENTATION => {
                self.descriptor.pixel_representation = el.get_integer(0).ok().map(|v| {
                    if v == 0 {
                        PixelRepresentation::Unsigned
                    } else {
                        PixelRepresentation::TwosComplement
                    }
                })
            }
            TAG_PLANAR_CONFIGURATION => {
                self.descriptor.planar_configuration = el.get_integer(0).ok().map(|v| {
                    if v == 0 {
                        PlanarConfiguration::Interleaved
                    } else {
                        PlanarConfiguration::Planar
                    }
                })
            }
            TAG_PHOTOMETRIC_INTERPRETATION => {
                self.descriptor.photometric_interpretation =
                    el.get_string().ok().map(|s| s.into_owned())
            }
            TAG_EXTENDED_OFFSET_TABLE => self.descriptor.extended_offset_table = all_u64(&el),
            TAG_EXTENDED_OFFSET_TABLE_LENGTHS => {
                self.descriptor.extended_offset_table_lengths = all_u64(&el)
            }
            _ => {}
        }
        Ok(())
    }

    /// Extract `(column, row) -> frame_number` from a completed
    /// `PerFrameFunctionalGroupsSequence`, one entry per item in order.
    fn harvest_positions(&mut self, sequence: &Sequence) {
        for (index, item) in sequence.items().iter().enumerate() {
            let frame_number = index as u32 + 1;
            let Some(plane_position_seq) = item.get(TAG_PLANE_POSITION_SLIDE_SEQUENCE) else {
                continue;
            };
            let Ok(inner) = plane_position_seq.get_sequence() else {
                continue;
            };
            let Some(position) = inner.items().first() else {
                continue;
            };
            let column = position.get(TAG_COLUMN_POSITION).and_then(|e| e.get_integer(0).ok());
            let row = position.get(TAG_ROW_POSITION).and_then(|e| e.get_integer(0).ok());
            if let (Some(column), Some(row)) = (column, row) {
                self.position_map
                    .insert((column as u32, row as u32), frame_number);
            }
        }
    }
}

impl<'d> Handler for FrameIndexBuilder<'d> {
    fn dataset_begin(&mut self) -> HandlerResult<()> {
        if let Some(builder) = &mut self.frame_group_builder {
            builder.dataset_begin()?;
        }
        Ok(())
    }

    fn dataset_end(&mut self) -> HandlerResult<()> {
        if let Some(builder) = &mut self.frame_group_builder {
            builder.dataset_end()?;
        }
        Ok(())
    }

    fn sequence_begin(&mut self) -> HandlerResult<()> {
        if let Some(builder) = &mut self.frame_group_builder {
            self.frame_group_depth += 1;
            return builder.sequence_begin();
        }
        // speculatively open a builder for this (as yet unnamed)
        // sequence; if it doesn't turn out to be
        // `PerFrameFunctionalGroupsSequence` at `sequence_end`, the
        // whole subtree is simply dropped.
        let mut builder = DataSetBuilder::new(self.dict, StopCondition::Never);
        builder.sequence_begin()?;
        self.frame_group_builder = Some(builder);
        Ok(())
    }

    fn sequence_end(&mut self, tag: Tag, vr: VR, length: Length) -> HandlerResult<()> {
        if self.frame_group_depth > 0 {
            self.frame_group_depth -= 1;
            return self
                .frame_group_builder
                .as_mut()
                .unwrap()
                .sequence_end(tag, vr, length);
        }

        let Some(mut builder) = self.frame_group_builder.take() else {
            return Ok(());
        };
        if tag == TAG_PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE {
            if let Some(seq) = builder.take_top_sequence() {
                self.harvest_positions(&seq);
            }
        }
        Ok(())
    }

    fn element_create(&mut self, tag: Tag, vr: VR, bytes: &[u8]) -> HandlerResult<()> {
        if let Some(builder) = &mut self.frame_group_builder {
            return builder.element_create(tag, vr, bytes);
        }
        self.record_flat(tag, vr, bytes)
    }

    fn stop(&mut self, tag: Tag, _vr: VR, _length: Length) -> HandlerResult<bool> {
        Ok(self.stop.should_stop(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::dictionary::EmptyDataDictionary;
    use dicom_core::value::PrimitiveValue;
    use dicom_parser::decode::Encoding;
    use dicom_parser::engine::Parser;
    use std::io::Cursor;

    fn explicit_short(group: u16, elem: u16, vr: &str, value: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&group.to_le_bytes());
        bytes.extend_from_slice(&elem.to_le_bytes());
        bytes.extend_from_slice(vr.as_bytes());
        bytes.extend_from_slice(&(value.len() as u16).to_le_bytes());
        bytes.extend_from_slice(value);
        bytes
    }

    fn explicit_long(group: u16, elem: u16, vr: &str, value: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&group.to_le_bytes());
        bytes.extend_from_slice(&elem.to_le_bytes());
        bytes.extend_from_slice(vr.as_bytes());
        bytes.extend_from_slice(&[0, 0]);
        bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
        bytes.extend_from_slice(value);
        bytes
    }

    #[test]
    fn data_set_builder_builds_nested_sequence_of_sequences() {
        // (0040,0275) SQ undefined-length, one item containing
        // (0040,A043) SQ defined-length=0, terminated by Item Delim then
        // Seq Delim.
        let dict = EmptyDataDictionary;
        let mut bytes = Vec::new();
        // (0040,0275) SQ, undefined length
        bytes.extend_from_slice(&[0x40, 0x00, 0x75, 0x02, b'S', b'Q', 0x00, 0x00]);
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        // Item, undefined length
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        // (0040,A043) SQ, defined length 0 (empty inner sequence)
        bytes.extend_from_slice(&[0x40, 0x00, 0x43, 0xA0, b'S', b'Q', 0x00, 0x00]);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        // Item Delimiter
        bytes.extend_from_slice(&[0xFE, 0xFF, 0x0D, 0xE0]);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        // Sequence Delimiter
        bytes.extend_from_slice(&[0xFE, 0xFF, 0xDD, 0xE0]);
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let mut parser = Parser::new(Cursor::new(bytes), Encoding::EXPLICIT_LITTLE_ENDIAN, &dict);
        let mut builder = DataSetBuilder::new(&dict, StopCondition::Never);
        parser.parse_toplevel_dataset(&mut builder).unwrap();
        let dataset = builder.into_data_set().unwrap();

        assert_eq!(dataset.count(), 1);
        let outer = dataset.get(Tag(0x0040, 0x0275)).unwrap();
        assert_eq!(outer.vr(), VR::SQ);
        let outer_seq = outer.get_sequence().unwrap();
        assert_eq!(outer_seq.len(), 1);

        let item = outer_seq.get(0).unwrap();
        assert_eq!(item.count(), 1);
        let inner = item.get(Tag(0x0040, 0xA043)).unwrap();
        assert_eq!(inner.vr(), VR::SQ);
        assert_eq!(inner.get_sequence().unwrap().len(), 0);
    }

    #[test]
    fn data_set_builder_inserts_flat_elements() {
        let dict = EmptyDataDictionary;
        let bytes = explicit_short(0x0010, 0x0010, "PN", b"DOE^JOHN");
        let mut parser = Parser::new(Cursor::new(bytes), Encoding::EXPLICIT_LITTLE_ENDIAN, &dict);
        let mut builder = DataSetBuilder::new(&dict, StopCondition::Never);
        parser.parse_toplevel_dataset(&mut builder).unwrap();
        let dataset = builder.into_data_set().unwrap();
        assert!(dataset.contains(Tag(0x0010, 0x0010)));
    }

    #[test]
    fn data_set_builder_stops_before_pixel_data() {
        let dict = EmptyDataDictionary;
        let mut bytes = explicit_short(0x0010, 0x0010, "PN", b"DOE^JOHN");
        bytes.extend_from_slice(&explicit_long(0x7FE0, 0x0010, "OB", &[0; 4]));
        let mut parser = Parser::new(Cursor::new(bytes), Encoding::EXPLICIT_LITTLE_ENDIAN, &dict);
        let mut builder = DataSetBuilder::new(&dict, StopCondition::OnPixelData);
        parser.parse_toplevel_dataset(&mut builder).unwrap();
        let dataset = builder.into_data_set().unwrap();
        assert!(dataset.contains(Tag(0x0010, 0x0010)));
        assert!(!dataset.contains(Tag(0x7FE0, 0x0010)));
    }

    #[test]
    fn frame_index_builder_captures_descriptor_fields() {
        let dict = EmptyDataDictionary;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&explicit_short(0x0028, 0x0010, "US", &4u16.to_le_bytes()));
        bytes.extend_from_slice(&explicit_short(0x0028, 0x0011, "US", &8u16.to_le_bytes()));
        bytes.extend_from_slice(&explicit_short(0x0028, 0x0100, "US", &8u16.to_le_bytes()));
        let mut parser = Parser::new(Cursor::new(bytes), Encoding::EXPLICIT_LITTLE_ENDIAN, &dict);
        let mut builder = FrameIndexBuilder::new(&dict, StopCondition::Never);
        parser.parse_toplevel_dataset(&mut builder).unwrap();
        let (descriptor, positions) = builder.into_parts();
        assert_eq!(descriptor.rows, Some(4));
        assert_eq!(descriptor.columns, Some(8));
        assert_eq!(descriptor.bits_allocated, Some(8));
        assert!(positions.is_empty());
    }

    #[test]
    fn frame_index_builder_captures_extended_offset_table() {
        let dict = EmptyDataDictionary;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&explicit_long(
            0x7FE0,
            0x0001,
            "OV",
            &[0u64.to_le_bytes(), 0x28u64.to_le_bytes()].concat(),
        ));
        bytes.extend_from_slice(&explicit_long(
            0x7FE0,
            0x0002,
            "OV",
            &[32u64.to_le_bytes(), 32u64.to_le_bytes()].concat(),
        ));
        let mut parser = Parser::new(Cursor::new(bytes), Encoding::EXPLICIT_LITTLE_ENDIAN, &dict);
        let mut builder = FrameIndexBuilder::new(&dict, StopCondition::Never);
        parser.parse_toplevel_dataset(&mut builder).unwrap();
        let (descriptor, _) = builder.into_parts();
        assert_eq!(descriptor.extended_offset_table, Some(vec![0, 0x28]));
        assert_eq!(descriptor.extended_offset_table_lengths, Some(vec![32, 32]));
    }

    #[test]
    fn unrelated_primitive_value_helper_roundtrips() {
        // sanity check that from_raw_bytes + PrimitiveValue agree, since
        // every handler path above routes through it.
        let value = PrimitiveValue::decode(VR::US, &4u16.to_le_bytes(), false).unwrap();
        assert_eq!(value.integer(0).unwrap(), 4);
    }
}
