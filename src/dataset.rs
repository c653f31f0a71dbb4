//! Tag lookups over a parsed DICOM file.
//!
//! The decode pipeline only needs a handful of attributes, so it talks to the
//! parser through [`TagDataset`] instead of the `dicom` object model directly.

use std::borrow::Cow;

use dicom::core::value::Value;
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{from_reader, DefaultDicomObject};

use crate::error::DecodeError;

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

pub trait TagDataset {
    /// First value of an unsigned short attribute.
    fn uint16(&self, tag: Tag) -> Option<u16>;

    /// Attribute rendered as text, trimmed. Multi-valued attributes keep
    /// their backslash separators.
    fn string(&self, tag: Tag) -> Option<String>;

    /// Raw bytes of a native (uncompressed) pixel data element.
    fn pixel_data(&self) -> Option<Cow<'_, [u8]>>;
}

/// Parse a slice file as delivered by the archive.
///
/// Both the full file layout (128 byte preamble, `DICM`, meta group) and a
/// buffer starting at the magic code are accepted.
pub fn parse_dataset(bytes: &[u8]) -> Result<DefaultDicomObject, DecodeError> {
    from_reader(skip_preamble(bytes)).map_err(|err| DecodeError::Parse(err.to_string()))
}

fn skip_preamble(bytes: &[u8]) -> &[u8] {
    match bytes.get(PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()) {
        Some(magic) if magic == MAGIC => &bytes[PREAMBLE_LEN..],
        _ => bytes,
    }
}

impl TagDataset for DefaultDicomObject {
    fn uint16(&self, tag: Tag) -> Option<u16> {
        self.element(tag).ok()?.to_int::<u16>().ok()
    }

    fn string(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|element| element.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn pixel_data(&self) -> Option<Cow<'_, [u8]>> {
        let element = self.element(tags::PIXEL_DATA).ok()?;
        if let Value::PixelSequence(sequence) = element.value() {
            log::warn!(
                "Encapsulated pixel data ({} fragments) cannot be windowed directly",
                sequence.fragments().len()
            );
            return None;
        }
        element.to_bytes().ok()
    }
}
