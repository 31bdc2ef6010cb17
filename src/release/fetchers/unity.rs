//! Unity release API implementation

use std::time::Duration;

use reqwest::{Response, StatusCode, Url};
use tracing::{debug, warn};

use crate::config::{DEFAULT_API_URL, FETCH_TIMEOUT_MS, USER_AGENT};
use crate::release::error::FetchError;
use crate::release::fetcher::ReleaseFetcher;
use crate::release::types::{ReleaseFilter, ReleasePage};

/// Fetcher implementation for the Unity editor release API
pub struct UnityReleaseFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl UnityReleaseFetcher {
    /// Creates a new UnityReleaseFetcher for the given releases endpoint
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// Creates a fetcher for the public Unity endpoint
    pub fn public() -> Result<Self, FetchError> {
        Self::new(DEFAULT_API_URL, Duration::from_millis(FETCH_TIMEOUT_MS))
    }

    fn page_url(
        &self,
        filter: &ReleaseFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| FetchError::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("limit", &limit.to_string())
                .append_pair("offset", &offset.to_string());
            if let Some(version) = &filter.version {
                query.append_pair("version", version);
            }
            if let Some(stream) = &filter.stream {
                query.append_pair("stream", stream);
            }
        }

        Ok(url)
    }

    /// Map non-success statuses to fetch errors
    fn check_status(response: &Response, url: &str) -> Result<(), FetchError> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(FetchError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("Unity release API returned status {}: {}", status, url);
            return Err(FetchError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl ReleaseFetcher for UnityReleaseFetcher {
    async fn fetch_page(
        &self,
        filter: &ReleaseFilter,
        offset: usize,
        limit: usize,
    ) -> Result<ReleasePage, FetchError> {
        let url = self.page_url(filter, offset, limit)?;
        debug!("Fetching releases page {}", url);

        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await?;

        Self::check_status(&response, url.as_str())?;

        response.json::<ReleasePage>().await.map_err(|e| {
            warn!("Failed to parse Unity release API response: {}", e);
            FetchError::InvalidResponse(e.to_string())
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching release notes {}", url);

        let response = self.client.get(url).send().await?;

        Self::check_status(&response, url)?;

        Ok(response.text().await?)
    }
}
