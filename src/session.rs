//! Navigation and decoded-slice caching for one open scan.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use moka::future::Cache;

use crate::error::{DecodeError, ListError, SliceError, SliceErrorKind};
use crate::image_pipeline::{DecodedSlice, SlicePipeline, WindowLevel};
use crate::slices::{SliceList, DEFAULT_EXTENSION};
use crate::source::{ScanRef, SliceSource};

pub const DEFAULT_CACHE_CAPACITY: u64 = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Decoded slices kept in memory. At least one slice is always kept.
    pub cache_capacity: u64,
    /// Suffix of slice files in the listing, matched case-insensitively.
    pub extension: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

/// Outcome of presenting a slice.
#[derive(Debug, Clone)]
pub enum Frame {
    Current(Arc<DecodedSlice>),
    /// The user moved on while this slice loaded. It is cached, not shown.
    Stale {
        index: usize,
    },
}

pub type SliceResult = Result<Arc<DecodedSlice>, Arc<SliceError>>;

/// Viewer state for one scan.
///
/// Opening another scan means building another session, which drops the
/// whole cache with it.
pub struct ViewerSession {
    scan: ScanRef,
    slices: SliceList,
    source: Arc<dyn SliceSource>,
    current: AtomicUsize,
    window: Mutex<Option<WindowLevel>>,
    cache: Cache<usize, Arc<DecodedSlice>>,
}

impl ViewerSession {
    pub async fn open(
        scan: ScanRef,
        source: Arc<dyn SliceSource>,
        config: &SessionConfig,
    ) -> Result<Self, ListError> {
        let slices = SliceList::load(source.as_ref(), &config.extension).await?;
        log::info!("Opened scan {scan} with {} slices", slices.len());
        Ok(Self::with_slices(scan, slices, source, config))
    }

    pub fn with_slices(
        scan: ScanRef,
        slices: SliceList,
        source: Arc<dyn SliceSource>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            scan,
            slices,
            source,
            current: AtomicUsize::new(0),
            window: Mutex::new(None),
            cache: Cache::builder()
                .max_capacity(config.cache_capacity.max(1))
                .build(),
        }
    }

    pub fn scan(&self) -> &ScanRef {
        &self.scan
    }

    pub fn slices(&self) -> &SliceList {
        &self.slices
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn current_name(&self) -> &str {
        self.slices.name(self.current_index()).unwrap_or_default()
    }

    pub fn next(&self) -> usize {
        self.step(1)
    }

    pub fn previous(&self) -> usize {
        self.step(-1)
    }

    /// Jump to `index`, clamped to the slice list.
    pub fn seek(&self, index: i64) -> usize {
        let index = self.clamp(index);
        self.current.store(index, Ordering::SeqCst);
        index
    }

    fn step(&self, delta: i64) -> usize {
        let previous = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(self.clamp(to_signed(current) + delta))
            })
            .unwrap_or_else(|current| current);
        self.clamp(to_signed(previous) + delta)
    }

    fn clamp(&self, index: i64) -> usize {
        let last = to_signed(self.slices.last_index());
        usize::try_from(index.clamp(0, last)).unwrap_or_default()
    }

    /// Window of the slice presented last.
    pub fn window_level(&self) -> Option<WindowLevel> {
        *self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_window(&self, window: WindowLevel) {
        *self.window.lock().unwrap_or_else(PoisonError::into_inner) = Some(window);
    }

    pub fn is_cached(&self, index: usize) -> bool {
        self.cache.contains_key(&index)
    }

    /// Decoded slice at `index`.
    ///
    /// The first request fetches and decodes; concurrent requests for the same
    /// index wait for that one load. Failures are not cached, so asking again
    /// retries.
    pub async fn get(&self, index: usize) -> SliceResult {
        let Some(name) = self.slices.name(index) else {
            return Err(Arc::new(SliceError::new(
                index,
                "",
                SliceErrorKind::OutOfRange {
                    len: self.slices.len(),
                },
            )));
        };

        self.cache
            .try_get_with(index, self.load(index, name))
            .await
            .inspect_err(|err| log::warn!("{err}"))
    }

    pub async fn get_current(&self) -> SliceResult {
        let index = self.current_index();
        let slice = self.get(index).await?;
        if index == self.current_index() {
            self.record_window(slice.window);
        }
        Ok(slice)
    }

    /// Like [`get`](Self::get), but only hands the slice out for display if
    /// `index` is still the current one when loading finishes.
    pub async fn present(&self, index: usize) -> Result<Frame, Arc<SliceError>> {
        let slice = self.get(index).await?;
        if index != self.current_index() {
            log::debug!("Slice {index} loaded after navigating away");
            return Ok(Frame::Stale { index });
        }
        self.record_window(slice.window);
        Ok(Frame::Current(slice))
    }

    pub async fn present_current(&self) -> Result<Frame, Arc<SliceError>> {
        self.present(self.current_index()).await
    }

    async fn load(&self, index: usize, name: &str) -> Result<Arc<DecodedSlice>, SliceError> {
        let started = Instant::now();
        let bytes = self
            .source
            .fetch(name)
            .await
            .map_err(|err| SliceError::new(index, name, SliceErrorKind::Fetch(err)))?;

        let slice = tokio::task::spawn_blocking(move || SlicePipeline::decode(&bytes))
            .await
            .unwrap_or_else(|err| Err(DecodeError::Worker(err.to_string())))
            .map_err(|err| SliceError::new(index, name, err.into()))?;

        log::debug!("Loaded slice {index} ({name}) in {:?}", started.elapsed());
        Ok(Arc::new(slice))
    }
}

fn to_signed(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

impl fmt::Debug for ViewerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerSession")
            .field("scan", &self.scan)
            .field("slices", &self.slices.len())
            .field("current", &self.current_index())
            .field("window", &self.window_level())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::test_support::SliceFixture;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Gate {
        started: Notify,
        release: Notify,
    }

    #[derive(Default)]
    struct StubSource {
        files: HashMap<String, Vec<u8>>,
        fetches: AtomicUsize,
        gate: Option<Arc<Gate>>,
    }

    impl StubSource {
        fn with_file(mut self, name: &str, bytes: Vec<u8>) -> Self {
            self.files.insert(name.to_string(), bytes);
            self
        }

        fn gated(mut self, gate: Arc<Gate>) -> Self {
            self.gate = Some(gate);
            self
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SliceSource for StubSource {
        async fn list(&self) -> Result<Vec<String>, SourceError> {
            Ok(self.files.keys().cloned().collect())
        }

        async fn fetch(&self, name: &str) -> Result<Vec<u8>, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.started.notify_one();
                gate.release.notified().await;
            }
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            self.files.get(name).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, name.to_string()).into()
            })
        }
    }

    fn slice_bytes(samples: &[u16]) -> Vec<u8> {
        SliceFixture::new(2, 2)
            .bits_allocated(16)
            .samples_u16(samples)
            .to_file_bytes()
    }

    fn scan() -> ScanRef {
        ScanRef::new("XNAT_E00041", "2")
    }

    fn named_session(names: &[&str], source: Arc<StubSource>) -> ViewerSession {
        session_with(names, source, &SessionConfig::default())
    }

    fn session_with(
        names: &[&str],
        source: Arc<StubSource>,
        config: &SessionConfig,
    ) -> ViewerSession {
        let slices = SliceList::from_names(
            names.iter().map(|name| name.to_string()).collect(),
            DEFAULT_EXTENSION,
        )
        .unwrap();
        ViewerSession::with_slices(scan(), slices, source, config)
    }

    fn ten_slices() -> ViewerSession {
        let names: Vec<String> = (0..10).map(|index| format!("{index:03}.dcm")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        named_session(&names, Arc::new(StubSource::default()))
    }

    #[test]
    fn seek_clamps_to_list() {
        let session = ten_slices();
        assert_eq!(session.seek(-5), 0);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.seek(999), 9);
        assert_eq!(session.current_index(), 9);
        assert_eq!(session.seek(4), 4);
    }

    #[test]
    fn next_and_previous_stop_at_the_ends() {
        let session = ten_slices();
        assert_eq!(session.previous(), 0);
        assert_eq!(session.next(), 1);
        assert_eq!(session.next(), 2);
        assert_eq!(session.previous(), 1);

        session.seek(9);
        assert_eq!(session.next(), 9);
        assert_eq!(session.current_index(), 9);
        assert_eq!(session.current_name(), "009.dcm");
    }

    #[tokio::test]
    async fn open_lists_and_sorts() {
        let source = Arc::new(
            StubSource::default()
                .with_file("b.dcm", Vec::new())
                .with_file("a.dcm", Vec::new())
                .with_file("catalog.xml", Vec::new()),
        );

        let session = ViewerSession::open(scan(), source, &SessionConfig::default())
            .await
            .unwrap();
        assert_eq!(session.slices().names(), &["a.dcm", "b.dcm"]);
        assert_eq!(session.current_name(), "a.dcm");
        assert_eq!(session.scan(), &scan());
    }

    #[tokio::test]
    async fn open_without_slices_fails() {
        let source = Arc::new(StubSource::default().with_file("catalog.xml", Vec::new()));
        let err = ViewerSession::open(scan(), source, &SessionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ListError::Empty));
    }

    #[tokio::test]
    async fn second_access_is_served_from_cache() {
        let source = Arc::new(StubSource::default().with_file("1.dcm", slice_bytes(&[0, 1, 2, 3])));
        let session = named_session(&["1.dcm"], source.clone());

        let first = session.get_current().await.unwrap();
        let second = session.get_current().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetches(), 1);
        assert!(session.is_cached(0));
    }

    #[tokio::test]
    async fn zero_capacity_still_keeps_the_current_slice() {
        let source = Arc::new(StubSource::default().with_file("1.dcm", slice_bytes(&[0, 1, 2, 3])));
        let config = SessionConfig {
            cache_capacity: 0,
            ..SessionConfig::default()
        };
        let session = session_with(&["1.dcm"], source.clone(), &config);

        session.get_current().await.unwrap();
        session.get_current().await.unwrap();
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_load() {
        let source =
            Arc::new(StubSource::default().with_file("1.dcm", slice_bytes(&[0, 100, 200, 255])));
        let session = named_session(&["1.dcm"], source.clone());

        let (first, second) = tokio::join!(session.get_current(), session.get_current());
        assert_eq!(first.unwrap().pixels, second.unwrap().pixels);
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn get_current_records_window() {
        let source =
            Arc::new(StubSource::default().with_file("1.dcm", slice_bytes(&[0, 100, 200, 255])));
        let session = named_session(&["1.dcm"], source);
        assert_eq!(session.window_level(), None);

        session.get_current().await.unwrap();
        assert_eq!(session.window_level(), Some(WindowLevel::new(127.5, 255.0)));
    }

    #[tokio::test]
    async fn result_for_abandoned_index_is_not_presented() {
        let gate = Arc::new(Gate::default());
        let source = Arc::new(
            StubSource::default()
                .with_file("1.dcm", slice_bytes(&[0, 1, 2, 3]))
                .with_file("2.dcm", slice_bytes(&[0, 10, 20, 30]))
                .gated(gate.clone()),
        );
        let session = Arc::new(named_session(&["1.dcm", "2.dcm"], source));

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.present_current().await }
        });
        gate.started.notified().await;
        session.next();
        gate.release.notify_one();

        let frame = pending.await.unwrap().unwrap();
        assert!(matches!(frame, Frame::Stale { index: 0 }));
        assert!(session.is_cached(0));
        assert_eq!(session.window_level(), None);
    }

    #[tokio::test]
    async fn present_current_hands_out_slice() {
        let source = Arc::new(StubSource::default().with_file("1.dcm", slice_bytes(&[5, 5, 9, 9])));
        let session = named_session(&["1.dcm"], source);

        match session.present_current().await.unwrap() {
            Frame::Current(slice) => assert_eq!((slice.width, slice.height), (2, 2)),
            Frame::Stale { .. } => panic!("slice 0 is current"),
        }
        assert_eq!(session.window_level(), Some(WindowLevel::new(7.0, 4.0)));
    }

    #[tokio::test]
    async fn fetch_failure_is_per_slice() {
        let source = Arc::new(StubSource::default().with_file("2.dcm", slice_bytes(&[1, 2, 3, 4])));
        let session = named_session(&["1.dcm", "2.dcm"], source);

        let err = session.get(0).await.unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.name, "1.dcm");
        assert!(matches!(
            err.kind,
            SliceErrorKind::Fetch(SourceError::Io(_))
        ));
        assert!(!session.is_cached(0));

        assert!(session.get(1).await.is_ok());
    }

    #[tokio::test]
    async fn decode_failure_is_not_cached_and_retries() {
        let source = Arc::new(
            StubSource::default()
                .with_file("1.dcm", b"not dicom at all".to_vec())
                .with_file("2.dcm", SliceFixture::new(2, 2).to_file_bytes()),
        );
        let session = named_session(&["1.dcm", "2.dcm"], source.clone());

        let err = session.get(0).await.unwrap_err();
        assert!(err.is_decode());
        assert!(!session.is_cached(0));
        assert!(session.get(0).await.is_err());
        assert_eq!(source.fetches(), 2);

        let err = session.get(1).await.unwrap_err();
        assert!(matches!(
            err.kind,
            SliceErrorKind::Decode(DecodeError::NoPixelData)
        ));
        assert!(!session.is_cached(1));
    }

    #[tokio::test]
    async fn out_of_range_index_is_an_error() {
        let session = ten_slices();
        let err = session.get(10).await.unwrap_err();
        assert!(matches!(err.kind, SliceErrorKind::OutOfRange { len: 10 }));
    }

    #[tokio::test]
    async fn new_scan_starts_with_empty_cache() {
        let source = Arc::new(StubSource::default().with_file("1.dcm", slice_bytes(&[0, 1, 2, 3])));
        let first = named_session(&["1.dcm"], source.clone());
        first.get_current().await.unwrap();

        let slices = SliceList::from_names(vec!["1.dcm".to_string()], DEFAULT_EXTENSION).unwrap();
        let second = ViewerSession::with_slices(
            ScanRef::new("XNAT_E00041", "3"),
            slices,
            source.clone(),
            &SessionConfig::default(),
        );
        assert!(!second.is_cached(0));
        second.get_current().await.unwrap();
        assert_eq!(source.fetches(), 2);
    }
}
