use std::path::PathBuf;
use std::sync::Arc;

use xnat_slice_viewer::{Frame, ViewerSession};

/// Results carry the generation of the session that produced them so that
/// answers for a scan that was closed in the meantime can be dropped.
#[derive(Debug, Clone)]
pub enum Message {
    PickFolder,
    FolderPicked(Option<PathBuf>),
    SessionOpened {
        generation: u64,
        result: Result<Arc<ViewerSession>, String>,
    },
    Next,
    Previous,
    Seek(u32),
    Retry,
    SliceLoaded {
        generation: u64,
        index: usize,
        result: Result<Frame, String>,
    },
}
