//! Shared helpers for downloader unit tests.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;
use crate::types::{Track, VideoId};
use crate::ytdlp::{AudioFetcher, FetchOutput, FetchRequest, SearchHit};

type FetchFn = dyn Fn(&FetchRequest) -> Result<FetchOutput> + Send + Sync;

/// Scriptable [`AudioFetcher`] that records every invocation.
pub(crate) struct MockFetcher {
    /// Every fetch request, in invocation order
    pub fetches: Mutex<Vec<FetchRequest>>,
    /// Every search query issued
    pub searches: Mutex<Vec<String>>,
    on_fetch: Box<FetchFn>,
    search_hits: Vec<SearchHit>,
    probed_duration: Option<u64>,
}

impl MockFetcher {
    /// Build a mock whose fetch behavior is driven by `on_fetch`
    pub fn new(
        on_fetch: impl Fn(&FetchRequest) -> Result<FetchOutput> + Send + Sync + 'static,
    ) -> Self {
        Self {
            fetches: Mutex::new(Vec::new()),
            searches: Mutex::new(Vec::new()),
            on_fetch: Box::new(on_fetch),
            search_hits: Vec::new(),
            probed_duration: None,
        }
    }

    /// A mock that materializes `<id> [<id>].m4a` under `dir` for every URL
    pub fn always_succeeding(dir: &Path) -> Self {
        let dir = dir.to_path_buf();
        Self::new(move |request| Ok(success_into(&dir, &request.url)))
    }

    /// Serve these hits for every search
    #[must_use]
    pub fn with_search_hits(mut self, hits: Vec<SearchHit>) -> Self {
        self.search_hits = hits;
        self
    }

    /// Answer every duration probe with this value
    #[must_use]
    pub fn with_probed_duration(mut self, duration: Option<u64>) -> Self {
        self.probed_duration = duration;
        self
    }

    /// Number of fetch invocations so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl AudioFetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutput> {
        self.fetches.lock().unwrap().push(request.clone());
        (self.on_fetch)(request)
    }

    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
        self.searches.lock().unwrap().push(query.to_string());
        Ok(self.search_hits.clone())
    }

    async fn probe_duration(&self, _url: &str) -> Option<u64> {
        self.probed_duration
    }
}

/// Successful fetch output materializing a real (empty) file under `dir`,
/// named from the URL's identifier so the library scan can find it again.
pub(crate) fn success_into(dir: &Path, url: &str) -> FetchOutput {
    let id = VideoId::from_url(url).map_or_else(|| "unknown-id".to_string(), |id| id.to_string());
    let path = dir.join(format!("{id} [{id}].m4a"));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, b"audio").unwrap();
    FetchOutput {
        status: 0,
        file_path: Some(path),
        diagnostic: String::new(),
    }
}

/// Failed fetch output carrying `diagnostic` on stderr
pub(crate) fn failure_output(diagnostic: &str) -> FetchOutput {
    FetchOutput {
        status: 1,
        file_path: None,
        diagnostic: diagnostic.to_string(),
    }
}

/// Config pointing input and output at test directories
pub(crate) fn test_config(input_root: &Path, output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.input_root = input_root.to_path_buf();
    config.download.output_dir = output_dir.to_path_buf();
    config
}

/// Track referencing a bare identifier
pub(crate) fn track_with_id(id: &str) -> Track {
    Track {
        title: Some(format!("Track {id}")),
        url: None,
        video_id: Some(id.to_string()),
        source: None,
    }
}

/// Canonical watch URL for a test identifier
pub(crate) fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

pub(crate) fn vid(id: &str) -> VideoId {
    VideoId::new(id).unwrap()
}
