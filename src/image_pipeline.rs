use std::borrow::Cow;

use dicom::core::Tag;
use dicom::dictionary_std::tags;

use crate::dataset::{parse_dataset, TagDataset};
use crate::error::DecodeError;

pub const DEFAULT_DIMENSION: u16 = 512;
pub const DEFAULT_BITS_ALLOCATED: u16 = 16;
/// Output for every sample when the window spans no values at all.
pub const FLAT_GRAY: u8 = 128;

/// Linear grayscale mapping in effect for one slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowLevel {
    pub center: f64,
    pub width: f64,
}

impl WindowLevel {
    pub fn new(center: f64, width: f64) -> Self {
        Self { center, width }
    }

    /// Window spanning exactly the sample extrema.
    pub fn from_extrema(min: f64, max: f64) -> Self {
        Self {
            center: (min + max) / 2.0,
            width: max - min,
        }
    }

    pub fn lower(&self) -> f64 {
        self.center - self.width / 2.0
    }

    pub fn upper(&self) -> f64 {
        self.center + self.width / 2.0
    }

    pub fn to_gray(&self, value: f64) -> u8 {
        Mapping::from(*self).apply(value)
    }
}

#[derive(Debug, Clone, Copy)]
struct Mapping {
    lower: f64,
    range: f64,
}

impl From<WindowLevel> for Mapping {
    fn from(window: WindowLevel) -> Self {
        let lower = window.lower();
        Self {
            lower,
            range: window.upper() - lower,
        }
    }
}

impl Mapping {
    fn apply(&self, value: f64) -> u8 {
        if self.range == 0.0 {
            return FLAT_GRAY;
        }
        let normalized = ((value - self.lower) / self.range) * 255.0;
        normalized.clamp(0.0, 255.0).round_ties_even() as u8
    }
}

/// One slice ready for the raster surface.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSlice {
    pub width: u32,
    pub height: u32,
    /// RGBA, 8 bits per channel, row-major.
    pub pixels: Vec<u8>,
    pub window: WindowLevel,
}

#[derive(Debug, Clone, PartialEq)]
enum Samples<'a> {
    Eight(Cow<'a, [u8]>),
    Sixteen(Vec<u16>),
}

impl Samples<'_> {
    fn extrema(&self) -> Option<(f64, f64)> {
        match self {
            Samples::Eight(values) => {
                min_max(&values[..]).map(|(min, max)| (min.into(), max.into()))
            }
            Samples::Sixteen(values) => {
                min_max(values.as_slice()).map(|(min, max)| (min.into(), max.into()))
            }
        }
    }

    fn to_rgba(&self, window: WindowLevel) -> Vec<u8> {
        match self {
            Samples::Eight(values) => gray_to_rgba(&values[..], window),
            Samples::Sixteen(values) => gray_to_rgba(values.as_slice(), window),
        }
    }
}

pub struct SlicePipeline;

impl SlicePipeline {
    /// Raw file bytes to an RGBA slice. Identical input gives identical output.
    pub fn decode(bytes: &[u8]) -> Result<DecodedSlice, DecodeError> {
        let dataset = parse_dataset(bytes)?;
        Self::decode_dataset(&dataset)
    }

    pub fn decode_dataset<D: TagDataset + ?Sized>(
        dataset: &D,
    ) -> Result<DecodedSlice, DecodeError> {
        let rows = read_or(dataset, tags::ROWS, DEFAULT_DIMENSION);
        let columns = read_or(dataset, tags::COLUMNS, DEFAULT_DIMENSION);
        let bits_allocated = read_or(dataset, tags::BITS_ALLOCATED, DEFAULT_BITS_ALLOCATED);

        let pixel_data = dataset.pixel_data().ok_or(DecodeError::NoPixelData)?;
        let count = usize::from(rows) * usize::from(columns);
        let samples = read_samples(pixel_data, bits_allocated, count)?;

        let window = match explicit_window(dataset) {
            Some(window) => window,
            None => {
                let (min, max) = samples.extrema().unwrap_or((0.0, 0.0));
                WindowLevel::from_extrema(min, max)
            }
        };
        log::debug!(
            "Decoded {columns}x{rows} slice, {bits_allocated} bits allocated, window {}/{}",
            window.center,
            window.width
        );

        Ok(DecodedSlice {
            width: u32::from(columns),
            height: u32::from(rows),
            pixels: samples.to_rgba(window),
            window,
        })
    }
}

/// Zero counts as absent for the dimension and depth attributes.
fn read_or<D: TagDataset + ?Sized>(dataset: &D, tag: Tag, default: u16) -> u16 {
    dataset
        .uint16(tag)
        .filter(|value| *value != 0)
        .unwrap_or(default)
}

fn explicit_window<D: TagDataset + ?Sized>(dataset: &D) -> Option<WindowLevel> {
    let center = read_float(dataset, tags::WINDOW_CENTER)?;
    let width = read_float(dataset, tags::WINDOW_WIDTH)?;
    if center == 0.0 || width == 0.0 {
        return None;
    }
    Some(WindowLevel::new(center, width))
}

/// First value of a decimal string attribute.
fn read_float<D: TagDataset + ?Sized>(dataset: &D, tag: Tag) -> Option<f64> {
    let text = dataset.string(tag)?;
    let first = text.split('\\').next()?.trim();
    first.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn read_samples(
    pixel_data: Cow<'_, [u8]>,
    bits_allocated: u16,
    count: usize,
) -> Result<Samples<'_>, DecodeError> {
    let bytes_per_sample = if bits_allocated == 8 { 1 } else { 2 };
    let expected = count * bytes_per_sample;
    if pixel_data.len() < expected {
        return Err(DecodeError::TruncatedPixelData {
            expected,
            actual: pixel_data.len(),
        });
    }

    if bytes_per_sample == 1 {
        let samples = match pixel_data {
            Cow::Borrowed(bytes) => Cow::Borrowed(&bytes[..count]),
            Cow::Owned(mut bytes) => {
                bytes.truncate(count);
                Cow::Owned(bytes)
            }
        };
        return Ok(Samples::Eight(samples));
    }

    let samples = pixel_data[..expected]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok(Samples::Sixteen(samples))
}

fn gray_to_rgba<T: Copy + Into<f64>>(values: &[T], window: WindowLevel) -> Vec<u8> {
    let mapping = Mapping::from(window);
    let mut rgba = Vec::with_capacity(values.len() * 4);
    for &value in values {
        let gray = mapping.apply(value.into());
        rgba.extend_from_slice(&[gray, gray, gray, 255]);
    }
    rgba
}

fn min_max<T: Copy + Ord>(values: &[T]) -> Option<(T, T)> {
    values.iter().copied().fold(None, |acc, value| match acc {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}
