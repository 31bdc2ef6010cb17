//! Common types for Unity releases as returned by the release API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Unity Editor release
///
/// Identity is the `version` string, which is unique within one upstream snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Unity version string, e.g. "2022.3.10f1"
    pub version: String,
    pub release_date: DateTime<Utc>,
    /// Release stream label (LTS, BETA, ALPHA, TECH, ...)
    pub stream: String,
    #[serde(default)]
    pub downloads: Vec<DownloadArtifact>,
    #[serde(default)]
    pub release_notes: ReleaseNotesFile,
    /// Whether this is the recommended LTS version
    #[serde(default)]
    pub recommended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unity_hub_deep_link: Option<String>,
}

impl Release {
    pub fn release_notes_url(&self) -> &str {
        &self.release_notes.url
    }

    /// Returns true if any download artifact targets one of `platforms`
    pub fn has_platform(&self, platforms: &[String]) -> bool {
        self.downloads
            .iter()
            .any(|d| platforms.iter().any(|p| p.eq_ignore_ascii_case(&d.platform)))
    }

    /// Returns true if any download artifact targets one of `architectures`
    pub fn has_architecture(&self, architectures: &[String]) -> bool {
        self.downloads.iter().any(|d| {
            architectures
                .iter()
                .any(|a| a.eq_ignore_ascii_case(&d.architecture))
        })
    }
}

/// An editor download for one platform/architecture pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadArtifact {
    pub platform: String,
    pub architecture: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_size: Option<DigitalValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_size: Option<DigitalValue>,
}

/// A size with its unit (BYTE, KILOBYTE, MEGABYTE, GIGABYTE)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalValue {
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseNotesFile {
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

/// One page of the offset-paginated release listing
///
/// `results` or `total` is `None` when the upstream omitted the field, which marks the page
/// as malformed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReleasePage {
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub results: Option<Vec<Release>>,
}

impl ReleasePage {
    pub fn new(offset: usize, limit: usize, total: usize, results: Vec<Release>) -> Self {
        Self {
            offset,
            limit,
            total: Some(total),
            results: Some(results),
        }
    }
}

/// Upstream-side filter of a release listing, also the cache key
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReleaseFilter {
    /// Version prefix passed as the `version` query parameter
    pub version: Option<String>,
    /// Single stream passed as the `stream` query parameter
    pub stream: Option<String>,
}

impl ReleaseFilter {
    pub fn new(version: Option<String>, stream: Option<String>) -> Self {
        Self { version, stream }
    }

    pub fn stream(stream: &str) -> Self {
        Self {
            version: None,
            stream: Some(stream.to_string()),
        }
    }
}

/// Release notes text for a single version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseNotes {
    pub version: String,
    pub url: String,
    pub content: String,
    pub summary: String,
}
