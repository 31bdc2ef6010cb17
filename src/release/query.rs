//! Release query engine
//!
//! Turns a [`QueryRequest`] into cache lookups keyed by upstream filters, then filters,
//! orders and paginates the releases in memory.

use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::try_join_all;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::config::{Config, DEFAULT_RELEASE_NOTES_URL_TEMPLATE};
use crate::release::cache::ReleaseCache;
use crate::release::error::{FetchError, QueryError};
use crate::release::fetcher::ReleaseFetcher;
use crate::release::notes::summarize;
use crate::release::ordinal::{VersionOrdinal, find_latest};
use crate::release::types::{Release, ReleaseFilter, ReleaseNotes};

/// Default page size of a release listing
pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// Sort order by release date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    Ascending,
    #[default]
    Descending,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Ascending => "RELEASE_DATE_ASC",
            Order::Descending => "RELEASE_DATE_DESC",
        }
    }
}

/// Only `RELEASE_DATE_ASC` selects ascending order; any other value sorts newest first
impl FromStr for Order {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RELEASE_DATE_ASC" => Ok(Order::Ascending),
            "RELEASE_DATE_DESC" => Ok(Order::Descending),
            _ => {
                debug!("Unknown order '{}', sorting by release date descending", s);
                Ok(Order::Descending)
            }
        }
    }
}

/// Filter, order and pagination of a release listing
///
/// Empty facet lists place no restriction.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub limit: usize,
    pub offset: usize,
    pub order: Order,
    pub streams: Vec<String>,
    pub platforms: Vec<String>,
    pub architectures: Vec<String>,
    /// Case-insensitive substring of the version, e.g. "2022.3" or "0a22"
    pub version: Option<String>,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_QUERY_LIMIT,
            offset: 0,
            order: Order::default(),
            streams: Vec::new(),
            platforms: Vec::new(),
            architectures: Vec::new(),
            version: None,
        }
    }
}

/// One page of a filtered release listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub offset: usize,
    pub limit: usize,
    /// Number of releases matching the filters, before pagination
    pub total: usize,
    pub results: Vec<Release>,
}

/// How the requested streams map onto upstream requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSelection {
    /// No stream restriction, one unfiltered lookup
    All,
    /// One lookup filtered upstream by the stream
    One(String),
    /// One lookup per stream, merged
    Many(Vec<String>),
}

impl StreamSelection {
    /// Normalize stream names to upper case and drop blanks and duplicates
    pub fn from_streams(streams: &[String]) -> Self {
        let mut normalized: Vec<String> = Vec::new();
        for stream in streams {
            let stream = stream.trim().to_ascii_uppercase();
            if !stream.is_empty() && !normalized.contains(&stream) {
                normalized.push(stream);
            }
        }

        match normalized.len() {
            0 => StreamSelection::All,
            1 => StreamSelection::One(normalized.remove(0)),
            _ => StreamSelection::Many(normalized),
        }
    }
}

/// Merge release sets, keeping the first release seen for each version
fn union(sets: &[Arc<Vec<Release>>]) -> Vec<&Release> {
    let mut by_version: IndexMap<&str, &Release> = IndexMap::new();
    for release in sets.iter().flat_map(|set| set.iter()) {
        by_version.entry(release.version.as_str()).or_insert(release);
    }
    by_version.into_values().collect()
}

/// Apply platform, architecture and version substring filters
pub fn filter_releases<'a>(releases: Vec<&'a Release>, request: &QueryRequest) -> Vec<&'a Release> {
    let version = request
        .version
        .as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty());

    releases
        .into_iter()
        .filter(|r| request.platforms.is_empty() || r.has_platform(&request.platforms))
        .filter(|r| request.architectures.is_empty() || r.has_architecture(&request.architectures))
        .filter(|r| match &version {
            Some(needle) => r.version.to_lowercase().contains(needle),
            None => true,
        })
        .collect()
}

/// Stable sort by release date, so equal dates keep upstream order
pub fn sort_by_release_date(releases: &mut [&Release], order: Order) {
    match order {
        Order::Ascending => releases.sort_by(|a, b| a.release_date.cmp(&b.release_date)),
        Order::Descending => releases.sort_by(|a, b| b.release_date.cmp(&a.release_date)),
    }
}

/// Slice a page out of `releases`; out-of-range offsets give an empty page
pub fn paginate(releases: Vec<&Release>, offset: usize, limit: usize) -> QueryResult {
    let total = releases.len();
    let results = releases
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    QueryResult {
        offset,
        limit,
        total,
        results,
    }
}

pub struct ReleaseQueryEngine {
    cache: ReleaseCache,
    release_notes_url_template: String,
}

impl ReleaseQueryEngine {
    pub fn new(cache: ReleaseCache) -> Self {
        Self {
            cache,
            release_notes_url_template: DEFAULT_RELEASE_NOTES_URL_TEMPLATE.to_string(),
        }
    }

    /// Build an engine whose cache uses the configured TTL and page size
    pub fn from_config(fetcher: Arc<dyn ReleaseFetcher>, config: &Config) -> Self {
        let cache = ReleaseCache::new(
            fetcher,
            std::time::Duration::from_millis(config.cache.ttl),
            config.upstream.page_size,
        );
        Self::new(cache)
            .with_release_notes_url_template(&config.upstream.release_notes_url_template)
    }

    pub fn with_release_notes_url_template(mut self, template: &str) -> Self {
        self.release_notes_url_template = template.to_string();
        self
    }

    pub fn cache(&self) -> &ReleaseCache {
        &self.cache
    }

    /// Look up the release sets for a stream selection, one cache key per stream
    ///
    /// `version_prefix` is applied upstream as a prefix, so it must only ever be derived from
    /// a parsed version, never from a caller's substring filter.
    async fn fetch_sets(
        &self,
        version_prefix: Option<String>,
        selection: &StreamSelection,
    ) -> Result<Vec<Arc<Vec<Release>>>, FetchError> {
        match selection {
            StreamSelection::All => {
                let filter = ReleaseFilter::new(version_prefix, None);
                Ok(vec![self.cache.get_or_fetch(&filter).await?])
            }
            StreamSelection::One(stream) => {
                let filter = ReleaseFilter::new(version_prefix, Some(stream.clone()));
                Ok(vec![self.cache.get_or_fetch(&filter).await?])
            }
            StreamSelection::Many(streams) => {
                let filters: Vec<ReleaseFilter> = streams
                    .iter()
                    .map(|stream| ReleaseFilter::new(version_prefix.clone(), Some(stream.clone())))
                    .collect();
                try_join_all(filters.iter().map(|filter| self.cache.get_or_fetch(filter))).await
            }
        }
    }

    /// List releases matching `request`
    ///
    /// A request matching nothing yields `total == 0`, not an error.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResult, QueryError> {
        let selection = StreamSelection::from_streams(&request.streams);
        debug!("Querying releases with {:?} for {:?}", selection, request);

        // The version filter is a substring match, which the API cannot express
        let sets = self.fetch_sets(None, &selection).await?;
        let mut releases = filter_releases(union(&sets), request);
        sort_by_release_date(&mut releases, request.order);

        Ok(paginate(releases, request.offset, request.limit))
    }

    /// Find the highest version, optionally within one stream
    ///
    /// `official_only` selects final (`f`) releases; otherwise only alpha and beta releases
    /// are considered. Versions that do not parse are skipped.
    pub async fn latest(
        &self,
        stream: Option<&str>,
        official_only: bool,
    ) -> Result<Release, QueryError> {
        let selection = match stream {
            Some(stream) => StreamSelection::from_streams(&[stream.to_string()]),
            None => StreamSelection::All,
        };

        let sets = self.fetch_sets(None, &selection).await?;
        let releases = union(&sets);

        let latest = find_latest(releases.iter().map(|r| r.version.as_str()), official_only)
            .and_then(|version| releases.iter().find(|r| r.version == version));

        match latest {
            Some(release) => Ok((*release).clone()),
            None => Err(QueryError::NotFound(format!(
                "no {} release{}",
                if official_only { "official" } else { "pre-release" },
                stream
                    .map(|s| format!(" in stream {}", s))
                    .unwrap_or_default()
            ))),
        }
    }

    /// Find the release with exactly this version
    pub async fn release(&self, version: &str) -> Result<Release, QueryError> {
        let version = version.trim();
        let Ok(ordinal) = VersionOrdinal::parse(version) else {
            return Err(QueryError::NotFound(format!("release {}", version)));
        };

        let prefix = format!("{}.{}.{}", ordinal.major, ordinal.minor, ordinal.patch);
        let sets = self.fetch_sets(Some(prefix), &StreamSelection::All).await?;

        union(&sets)
            .into_iter()
            .find(|r| r.version == version)
            .cloned()
            .ok_or_else(|| QueryError::NotFound(format!("release {}", version)))
    }

    pub fn release_notes_url(&self, version: &str) -> String {
        self.release_notes_url_template.replace("{version}", version)
    }

    /// Fetch the release notes page of `version` and summarize it
    pub async fn release_notes(&self, version: &str) -> Result<ReleaseNotes, QueryError> {
        let version = version.trim();
        if version.is_empty() {
            return Err(QueryError::InvalidRequest("version must not be empty".to_string()));
        }

        let url = self.release_notes_url(version);
        let content = match self.cache.fetcher().fetch_text(&url).await {
            Ok(content) => content,
            Err(FetchError::NotFound(_)) => {
                return Err(QueryError::NotFound(format!("release notes for {}", version)));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(ReleaseNotes {
            version: version.to_string(),
            url,
            summary: summarize(&content),
            content,
        })
    }
}
