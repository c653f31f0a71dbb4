//! Grayscale DICOM slice viewing for XNAT scans.
//!
//! A [`ViewerSession`] lists the slice files of one scan through a
//! [`SliceSource`], decodes them on demand with [`SlicePipeline`] and keeps the
//! decoded rasters in a bounded cache keyed by slice index.

pub mod dataset;
pub mod error;
pub mod image_pipeline;
pub mod session;
pub mod slices;
pub mod source;

#[cfg(test)]
mod test_support;

pub use error::{DecodeError, ListError, SliceError, SliceErrorKind, SourceError};
pub use image_pipeline::{DecodedSlice, SlicePipeline, WindowLevel};
pub use session::{Frame, SessionConfig, ViewerSession};
pub use slices::SliceList;
pub use source::{LocalDirectory, ScanRef, SliceSource, XnatClient, XnatScan};
