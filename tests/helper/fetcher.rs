//! Fetcher test utilities

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use unity_releases::release::error::FetchError;
use unity_releases::release::fetcher::ReleaseFetcher;
use unity_releases::release::types::{
    DownloadArtifact, Release, ReleaseFilter, ReleaseNotesFile, ReleasePage,
};

/// In-memory release API honoring the stream and version-prefix filters
pub struct FakeFetcher {
    releases: Vec<Release>,
    notes: HashMap<String, String>,
    delay: Duration,
    fail_from_offset: Option<usize>,
    page_calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self {
            releases: Vec::new(),
            notes: HashMap::new(),
            delay: Duration::ZERO,
            fail_from_offset: None,
            page_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_release(mut self, release: Release) -> Self {
        self.releases.push(release);
        self
    }

    pub fn with_notes(mut self, url: &str, content: &str) -> Self {
        self.notes.insert(url.to_string(), content.to_string());
        self
    }

    /// Delay every page so concurrent callers overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every page at or after `offset`
    pub fn failing_from(mut self, offset: usize) -> Self {
        self.fail_from_offset = Some(offset);
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseFetcher for FakeFetcher {
    async fn fetch_page(
        &self,
        filter: &ReleaseFilter,
        offset: usize,
        limit: usize,
    ) -> Result<ReleasePage, FetchError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_from_offset.is_some_and(|from| offset >= from) {
            return Err(FetchError::InvalidResponse("503 Service Unavailable".to_string()));
        }

        let matching: Vec<Release> = self
            .releases
            .iter()
            .filter(|r| filter.stream.as_ref().is_none_or(|s| &r.stream == s))
            .filter(|r| {
                filter
                    .version
                    .as_ref()
                    .is_none_or(|v| r.version.starts_with(v.as_str()))
            })
            .cloned()
            .collect();
        let results = matching.iter().skip(offset).take(limit).cloned().collect();

        Ok(ReleasePage::new(offset, limit, matching.len(), results))
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.notes
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

/// Build a release with one download per `(platform, architecture)` pair
pub fn release(
    version: &str,
    stream: &str,
    release_date: &str,
    downloads: &[(&str, &str)],
) -> Release {
    let release_date: DateTime<Utc> = release_date.parse().unwrap();
    Release {
        version: version.to_string(),
        release_date,
        stream: stream.to_string(),
        downloads: downloads
            .iter()
            .map(|(platform, architecture)| DownloadArtifact {
                platform: platform.to_string(),
                architecture: architecture.to_string(),
                url: None,
                file_type: None,
                download_size: None,
                installed_size: None,
            })
            .collect(),
        release_notes: ReleaseNotesFile::default(),
        recommended: false,
        sku_family: None,
        short_revision: None,
        unity_hub_deep_link: None,
    }
}
