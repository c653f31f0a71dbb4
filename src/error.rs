use thiserror::Error;

/// Failure of a file-listing or file-retrieval collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unexpected file listing: {0}")]
    InvalidListing(String),
    #[error("invalid server url `{0}`")]
    InvalidServer(String),
}

/// The slice list could not be enumerated. Blocking for the whole session.
#[derive(Debug, Error)]
pub enum ListError {
    #[error("failed to list slices: {0}")]
    Source(#[from] SourceError),
    #[error("no slices available")]
    Empty,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to load image: {0}")]
    Parse(String),
    #[error("no pixel data found")]
    NoPixelData,
    #[error("failed to load image: pixel data holds {actual} bytes, {expected} required")]
    TruncatedPixelData { expected: usize, actual: usize },
    #[error("failed to load image: decode worker stopped ({0})")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum SliceErrorKind {
    #[error("fetch failed: {0}")]
    Fetch(#[source] SourceError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("index is outside the slice list ({len} slices)")]
    OutOfRange { len: usize },
}

/// A single slice could not be shown. Other slices stay navigable.
#[derive(Debug, Error)]
#[error("slice {index} ({name}): {kind}")]
pub struct SliceError {
    pub index: usize,
    pub name: String,
    #[source]
    pub kind: SliceErrorKind,
}

impl SliceError {
    pub fn new(index: usize, name: impl Into<String>, kind: SliceErrorKind) -> Self {
        Self {
            index,
            name: name.into(),
            kind,
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self.kind, SliceErrorKind::Decode(_))
    }
}
