//! Fetcher trait for reading releases from the upstream release API

#[cfg(test)]
use mockall::automock;

use crate::release::error::FetchError;
use crate::release::types::{ReleaseFilter, ReleasePage};

/// Trait for fetching pages of releases and release notes from upstream
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReleaseFetcher: Send + Sync {
    /// Fetches one page of releases
    ///
    /// # Arguments
    /// * `filter` - Upstream-side version prefix and stream
    /// * `offset` - Index of the first release to return
    /// * `limit` - Maximum number of releases in the page
    ///
    /// # Returns
    /// * `Ok(ReleasePage)` - The page in upstream order, with the total count for the filter
    /// * `Err(FetchError)` - If the request fails or the body cannot be decoded
    async fn fetch_page(
        &self,
        filter: &ReleaseFilter,
        offset: usize,
        limit: usize,
    ) -> Result<ReleasePage, FetchError>;

    /// Fetches the raw body of a release notes page
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}
