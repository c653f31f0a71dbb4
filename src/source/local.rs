use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::SliceSource;
use crate::error::SourceError;

/// Slice files exported into a folder on disk.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    root: PathBuf,
}

impl LocalDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl SliceSource for LocalDirectory {
    async fn list(&self) -> Result<Vec<String>, SourceError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => log::warn!("Skipping non UTF-8 file name {name:?}"),
            }
        }
        log::info!("Listed {} files in {}", names.len(), self.root.display());
        Ok(names)
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        Ok(tokio::fs::read(self.root.join(name)).await?)
    }
}
