//! The File Meta Information table: the handful of group `0x0002`
//! elements every Part 10 file carries ahead of its data set (§4.7).
//!
//! Grounded on the teacher's `dicom-object::meta::FileMetaTable`, which
//! carries exactly this field set; this crate builds it from an already
//! parsed [`DataSet`] (produced by [`crate::handlers::DataSetBuilder`]
//! via `parse_group`) rather than hand-decoding group `0x0002` itself,
//! since the handler/parser pairing already knows how to do that.

use dicom_core::tag::Tag;
use snafu::OptionExt;

use crate::dataset::DataSet;
use crate::element::ElementExt;
use crate::error::{MissingFileMetaElementSnafu, Result};

const TAG_GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
const TAG_INFORMATION_VERSION: Tag = Tag(0x0002, 0x0001);
const TAG_MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
const TAG_MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag(0x0002, 0x0003);
const TAG_TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);
const TAG_IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002, 0x0012);
const TAG_IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002, 0x0013);
const TAG_SOURCE_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0016);
const TAG_SENDING_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0017);
const TAG_RECEIVING_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0018);
const TAG_PRIVATE_INFORMATION_CREATOR_UID: Tag = Tag(0x0002, 0x0100);
const TAG_PRIVATE_INFORMATION: Tag = Tag(0x0002, 0x0102);

/// The parsed File Meta Information group (§3, §4.7).
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaTable {
    pub information_group_length: u32,
    pub information_version: [u8; 2],
    pub media_storage_sop_class_uid: String,
    pub media_storage_sop_instance_uid: String,
    pub transfer_syntax: String,
    pub implementation_class_uid: String,
    pub implementation_version_name: Option<String>,
    pub source_application_entity_title: Option<String>,
    pub sending_application_entity_title: Option<String>,
    pub receiving_application_entity_title: Option<String>,
    pub private_information_creator_uid: Option<String>,
    pub private_information: Option<Vec<u8>>,
}

impl FileMetaTable {
    /// Extract the table from an already-parsed group `0x0002` data set.
    /// Fails with [`crate::error::Error::MissingFileMetaElement`] if any
    /// of the mandatory attributes is absent.
    pub fn from_data_set(dataset: &DataSet) -> Result<FileMetaTable> {
        let required_string = |tag: Tag, alias: &'static str| -> Result<String> {
            let element = dataset
                .get(tag)
                .context(MissingFileMetaElementSnafu { alias })?;
            Ok(element.get_string()?.into_owned())
        };
        let optional_string = |tag: Tag| -> Result<Option<String>> {
            match dataset.get(tag) {
                Some(element) => Ok(Some(element.get_string()?.into_owned())),
                None => Ok(None),
            }
        };

        let information_group_length = dataset
            .get(TAG_GROUP_LENGTH)
            .context(MissingFileMetaElementSnafu {
                alias: "FileMetaInformationGroupLength",
            })?
            .get_integer(0)? as u32;

        let information_version = match dataset.get(TAG_INFORMATION_VERSION) {
            Some(element) => {
                let bytes = element.get_binary()?;
                let mut version = [0u8; 2];
                let n = bytes.len().min(2);
                version[..n].copy_from_slice(&bytes[..n]);
                version
            }
            None => [0, 1],
        };

        Ok(FileMetaTable {
            information_group_length,
            information_version,
            media_storage_sop_class_uid: required_string(
                TAG_MEDIA_STORAGE_SOP_CLASS_UID,
                "MediaStorageSOPClassUID",
            )?,
            media_storage_sop_instance_uid: required_string(
                TAG_MEDIA_STORAGE_SOP_INSTANCE_UID,
                "MediaStorageSOPInstanceUID",
            )?,
            transfer_syntax: required_string(TAG_TRANSFER_SYNTAX_UID, "TransferSyntaxUID")?,
            implementation_class_uid: required_string(
                TAG_IMPLEMENTATION_CLASS_UID,
                "ImplementationClassUID",
            )?,
            implementation_version_name: optional_string(TAG_IMPLEMENTATION_VERSION_NAME)?,
            source_application_entity_title: optional_string(
                TAG_SOURCE_APPLICATION_ENTITY_TITLE,
            )?,
            sending_application_entity_title: optional_string(
                TAG_SENDING_APPLICATION_ENTITY_TITLE,
            )?,
            receiving_application_entity_title: optional_string(
                TAG_RECEIVING_APPLICATION_ENTITY_TITLE,
            )?,
            private_information_creator_uid: optional_string(TAG_PRIVATE_INFORMATION_CREATOR_UID)?,
            private_information: match dataset.get(TAG_PRIVATE_INFORMATION) {
                Some(element) => Some(element.get_binary()?.to_vec()),
                None => None,
            },
        })
    }

    /// The transfer syntax UID, with its trailing pad byte (if any)
    /// excluded.
    pub fn transfer_syntax_uid(&self) -> &str {
        self.transfer_syntax.trim_end_matches(['\0', ' '])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use dicom_core::value::PrimitiveValue;
    use dicom_core::vr::VR;

    fn string_element(tag: Tag, vr: VR, text: &str) -> Element {
        Element::new_primitive(tag, vr, PrimitiveValue::decode(vr, text.as_bytes(), false).unwrap())
    }

    fn sample_data_set() -> DataSet {
        let mut ds = DataSet::new();
        ds.insert(Element::new_primitive(
            TAG_GROUP_LENGTH,
            VR::UL,
            PrimitiveValue::decode(VR::UL, &100u32.to_le_bytes(), false).unwrap(),
        ))
        .unwrap();
        ds.insert(string_element(
            TAG_MEDIA_STORAGE_SOP_CLASS_UID,
            VR::UI,
            "1.2.840.10008.5.1.4.1.1.77.1.6",
        ))
        .unwrap();
        ds.insert(string_element(
            TAG_MEDIA_STORAGE_SOP_INSTANCE_UID,
            VR::UI,
            "1.2.3.4.5",
        ))
        .unwrap();
        ds.insert(string_element(
            TAG_TRANSFER_SYNTAX_UID,
            VR::UI,
            "1.2.840.10008.1.2.1",
        ))
        .unwrap();
        ds.insert(string_element(
            TAG_IMPLEMENTATION_CLASS_UID,
            VR::UI,
            "1.2.3.4.5.6",
        ))
        .unwrap();
        ds
    }

    #[test]
    fn extracts_required_fields() {
        let table = FileMetaTable::from_data_set(&sample_data_set()).unwrap();
        assert_eq!(table.transfer_syntax_uid(), "1.2.840.10008.1.2.1");
        assert_eq!(table.media_storage_sop_instance_uid, "1.2.3.4.5");
        assert_eq!(table.implementation_version_name, None);
    }

    #[test]
    fn missing_required_field_fails() {
        let mut ds = sample_data_set();
        ds.remove(TAG_TRANSFER_SYNTAX_UID).unwrap();
        assert!(FileMetaTable::from_data_set(&ds).is_err());
    }

    #[test]
    fn trims_trailing_pad_from_transfer_syntax() {
        let mut ds = sample_data_set();
        ds.remove(TAG_TRANSFER_SYNTAX_UID).unwrap();
        ds.insert(string_element(
            TAG_TRANSFER_SYNTAX_UID,
            VR::UI,
            "1.2.840.10008.1.2.1\0",
        ))
        .unwrap();
        let table = FileMetaTable::from_data_set(&ds).unwrap();
        assert_eq!(table.transfer_syntax_uid(), "1.2.840.10008.1.2.1");
    }
}
