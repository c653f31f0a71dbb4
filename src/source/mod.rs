//! Where slice files come from.

use std::fmt;

use async_trait::async_trait;

use crate::error::SourceError;

pub mod local;
pub mod xnat;

pub use local::LocalDirectory;
pub use xnat::{XnatClient, XnatScan};

/// File listing and retrieval for one scan.
///
/// `fetch` hands back the file exactly as stored; decoding happens later.
#[async_trait]
pub trait SliceSource: Send + Sync {
    async fn list(&self) -> Result<Vec<String>, SourceError>;

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, SourceError>;
}

/// Identity of one scan. A different value means a different slice list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanRef {
    pub project: Option<String>,
    pub experiment: String,
    pub scan: String,
}

impl ScanRef {
    pub fn new(experiment: impl Into<String>, scan: impl Into<String>) -> Self {
        Self {
            project: None,
            experiment: experiment.into(),
            scan: scan.into(),
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }
}

impl fmt::Display for ScanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(project) = &self.project {
            write!(f, "{project}/")?;
        }
        write!(f, "{}/scans/{}", self.experiment, self.scan)
    }
}
