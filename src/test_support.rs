//! Builders shared by the unit tests.

use std::borrow::Cow;
use std::collections::HashMap;

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::{tags, uids};
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};

use crate::dataset::TagDataset;

/// In-memory stand-in for a parsed file.
#[derive(Debug, Default, Clone)]
pub struct MemoryDataset {
    pub numbers: HashMap<Tag, u16>,
    pub strings: HashMap<Tag, String>,
    pub pixels: Option<Vec<u8>>,
}

impl MemoryDataset {
    pub fn with_u16(mut self, tag: Tag, value: u16) -> Self {
        self.numbers.insert(tag, value);
        self
    }

    pub fn with_str(mut self, tag: Tag, value: &str) -> Self {
        self.strings.insert(tag, value.to_string());
        self
    }

    pub fn with_pixels(mut self, pixels: Vec<u8>) -> Self {
        self.pixels = Some(pixels);
        self
    }
}

impl TagDataset for MemoryDataset {
    fn uint16(&self, tag: Tag) -> Option<u16> {
        self.numbers.get(&tag).copied()
    }

    fn string(&self, tag: Tag) -> Option<String> {
        self.strings.get(&tag).cloned()
    }

    fn pixel_data(&self) -> Option<Cow<'_, [u8]>> {
        self.pixels.as_deref().map(Cow::Borrowed)
    }
}

pub fn u16_bytes(samples: &[u16]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|value| value.to_le_bytes())
        .collect()
}

/// Writes a real single-frame DICOM file with the `dicom` crate.
#[derive(Debug, Clone)]
pub struct SliceFixture {
    rows: Option<u16>,
    columns: Option<u16>,
    bits_allocated: Option<u16>,
    pixels: Option<(VR, Vec<u8>)>,
    window: Option<(String, String)>,
}

impl SliceFixture {
    pub fn new(rows: u16, columns: u16) -> Self {
        Self {
            rows: Some(rows),
            columns: Some(columns),
            bits_allocated: None,
            pixels: None,
            window: None,
        }
    }

    pub fn without_dimensions(mut self) -> Self {
        self.rows = None;
        self.columns = None;
        self
    }

    pub fn bits_allocated(mut self, bits: u16) -> Self {
        self.bits_allocated = Some(bits);
        self
    }

    pub fn samples_u8(mut self, samples: &[u8]) -> Self {
        self.pixels = Some((VR::OB, samples.to_vec()));
        self
    }

    pub fn samples_u16(mut self, samples: &[u16]) -> Self {
        self.pixels = Some((VR::OW, u16_bytes(samples)));
        self
    }

    pub fn window(mut self, center: &str, width: &str) -> Self {
        self.window = Some((center.to_string(), width.to_string()));
        self
    }

    pub fn to_file_bytes(&self) -> Vec<u8> {
        let mut elements = Vec::new();
        if let Some(rows) = self.rows {
            elements.push(DataElement::new(
                tags::ROWS,
                VR::US,
                PrimitiveValue::from(rows),
            ));
        }
        if let Some(columns) = self.columns {
            elements.push(DataElement::new(
                tags::COLUMNS,
                VR::US,
                PrimitiveValue::from(columns),
            ));
        }
        if let Some(bits) = self.bits_allocated {
            elements.push(DataElement::new(
                tags::BITS_ALLOCATED,
                VR::US,
                PrimitiveValue::from(bits),
            ));
        }
        if let Some((center, width)) = &self.window {
            elements.push(DataElement::new(
                tags::WINDOW_CENTER,
                VR::DS,
                PrimitiveValue::from(center.as_str()),
            ));
            elements.push(DataElement::new(
                tags::WINDOW_WIDTH,
                VR::DS,
                PrimitiveValue::from(width.as_str()),
            ));
        }
        if let Some((vr, bytes)) = &self.pixels {
            elements.push(DataElement::new(
                tags::PIXEL_DATA,
                *vr,
                PrimitiveValue::U8(bytes.clone().into()),
            ));
        }

        let file = InMemDicomObject::from_element_iter(elements)
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                    .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
                    .media_storage_sop_instance_uid("2.25.1234567890"),
            )
            .expect("fixture meta group");

        let mut bytes = Vec::new();
        file.write_all(&mut bytes).expect("fixture write");
        bytes
    }
}
