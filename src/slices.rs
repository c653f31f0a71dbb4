use crate::error::ListError;
use crate::source::SliceSource;

pub const DEFAULT_EXTENSION: &str = ".dcm";

/// Ordered slice file names of one scan. Never empty, never reordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceList {
    names: Vec<String>,
}

impl SliceList {
    /// List the source once and keep the slice files in ascending name order.
    pub async fn load<S: SliceSource + ?Sized>(
        source: &S,
        extension: &str,
    ) -> Result<Self, ListError> {
        let names = source.list().await.map_err(|err| {
            log::error!("Slice listing failed: {err}");
            ListError::Source(err)
        })?;
        Self::from_names(names, extension)
    }

    pub fn from_names(names: Vec<String>, extension: &str) -> Result<Self, ListError> {
        let extension = extension.to_ascii_lowercase();
        let mut names: Vec<String> = names
            .into_iter()
            .filter(|name| name.to_ascii_lowercase().ends_with(&extension))
            .collect();
        if names.is_empty() {
            return Err(ListError::Empty);
        }
        names.sort();
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.names.len() - 1
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}
