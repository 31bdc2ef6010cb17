//! Assemble the full release list for a filter from the paginated release API

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::MAX_PAGE_SIZE;
use crate::release::error::FetchError;
use crate::release::fetcher::ReleaseFetcher;
use crate::release::types::{Release, ReleaseFilter};

/// Result of walking every page for one filter
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Releases in upstream order, de-duplicated by version
    pub releases: Vec<Release>,
    /// False when a page failed or was malformed after the first one
    pub complete: bool,
}

/// Fetch every page for `filter` and flatten the results
///
/// Page size is clamped to the upstream maximum. A failure on the first page is returned as
/// an error; later failures stop the walk and yield what was collected so far, marked incomplete.
pub async fn aggregate(
    fetcher: &dyn ReleaseFetcher,
    filter: &ReleaseFilter,
    page_size: usize,
) -> Result<Aggregation, FetchError> {
    let limit = page_size.clamp(1, MAX_PAGE_SIZE);
    let mut releases = Vec::new();
    let mut seen = HashSet::new();
    let mut offset = 0;

    loop {
        let page = match fetcher.fetch_page(filter, offset, limit).await {
            Ok(page) => page,
            Err(e) if offset == 0 => return Err(e),
            Err(e) => {
                warn!(
                    "Release page at offset {} failed for {:?}, returning {} partial results: {}",
                    offset,
                    filter,
                    releases.len(),
                    e
                );
                return Ok(Aggregation {
                    releases,
                    complete: false,
                });
            }
        };

        let Some(results) = page.results else {
            warn!(
                "Release page at offset {} for {:?} has no results field, returning {} partial results",
                offset,
                filter,
                releases.len()
            );
            return Ok(Aggregation {
                releases,
                complete: false,
            });
        };

        if results.is_empty() {
            debug!("Empty release page at offset {} for {:?}", offset, filter);
            break;
        }

        offset += results.len();
        for release in results {
            if seen.insert(release.version.clone()) {
                releases.push(release);
            }
        }

        let Some(total) = page.total else {
            warn!(
                "Release page at offset {} for {:?} has no total field, returning {} partial results",
                offset,
                filter,
                releases.len()
            );
            return Ok(Aggregation {
                releases,
                complete: false,
            });
        };

        if offset >= total {
            break;
        }
    }

    debug!("Aggregated {} releases for {:?}", releases.len(), filter);

    Ok(Aggregation {
        releases,
        complete: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::fetcher::MockReleaseFetcher;
    use crate::release::types::ReleasePage;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;

    fn release(version: &str) -> Release {
        Release {
            version: version.to_string(),
            release_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            stream: "LTS".to_string(),
            downloads: vec![],
            release_notes: Default::default(),
            recommended: false,
            sku_family: None,
            short_revision: None,
            unity_hub_deep_link: None,
        }
    }

    fn page(offset: usize, total: usize, versions: &[&str]) -> ReleasePage {
        ReleasePage::new(
            offset,
            versions.len(),
            total,
            versions.iter().map(|v| release(v)).collect(),
        )
    }

    fn versions(aggregation: &Aggregation) -> Vec<&str> {
        aggregation
            .releases
            .iter()
            .map(|r| r.version.as_str())
            .collect()
    }

    #[tokio::test]
    async fn aggregate_collects_all_pages_until_total() {
        let mut fetcher = MockReleaseFetcher::new();
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(0), eq(2))
            .times(1)
            .returning(|_, _, _| Ok(page(0, 4, &["2022.3.4f1", "2022.3.3f1"])));
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(2), eq(2))
            .times(1)
            .returning(|_, _, _| Ok(page(2, 4, &["2022.3.2f1", "2022.3.1f1"])));

        let result = aggregate(&fetcher, &ReleaseFilter::default(), 2)
            .await
            .unwrap();

        assert!(result.complete);
        assert_eq!(
            versions(&result),
            vec!["2022.3.4f1", "2022.3.3f1", "2022.3.2f1", "2022.3.1f1"]
        );
    }

    #[tokio::test]
    async fn aggregate_result_does_not_depend_on_page_size() {
        let all = ["2022.3.4f1", "2022.3.3f1", "2022.3.2f1", "2022.3.1f1"];

        let mut fetcher = MockReleaseFetcher::new();
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(0), eq(25))
            .times(1)
            .returning(move |_, _, _| Ok(page(0, 4, &all)));

        let result = aggregate(&fetcher, &ReleaseFilter::default(), 25)
            .await
            .unwrap();

        assert!(result.complete);
        assert_eq!(versions(&result), all.to_vec());
    }

    #[tokio::test]
    async fn aggregate_clamps_page_size_to_upstream_maximum() {
        let mut fetcher = MockReleaseFetcher::new();
        fetcher
            .expect_fetch_page()
            .withf(|_, offset, limit| *offset == 0 && *limit == MAX_PAGE_SIZE)
            .times(1)
            .returning(|_, _, _| Ok(page(0, 1, &["2022.3.1f1"])));

        let result = aggregate(&fetcher, &ReleaseFilter::default(), 1000)
            .await
            .unwrap();

        assert_eq!(versions(&result), vec!["2022.3.1f1"]);
    }

    #[tokio::test]
    async fn aggregate_stops_on_empty_page_when_total_is_inconsistent() {
        let mut fetcher = MockReleaseFetcher::new();
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(0), eq(2))
            .times(1)
            .returning(|_, _, _| Ok(page(0, 10, &["2022.3.2f1", "2022.3.1f1"])));
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(2), eq(2))
            .times(1)
            .returning(|_, _, _| Ok(page(2, 10, &[])));

        let result = aggregate(&fetcher, &ReleaseFilter::default(), 2)
            .await
            .unwrap();

        assert!(result.complete);
        assert_eq!(versions(&result), vec!["2022.3.2f1", "2022.3.1f1"]);
    }

    #[tokio::test]
    async fn aggregate_drops_duplicates_across_shifted_pages() {
        let mut fetcher = MockReleaseFetcher::new();
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(0), eq(2))
            .times(1)
            .returning(|_, _, _| Ok(page(0, 4, &["2022.3.4f1", "2022.3.3f1"])));
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(2), eq(2))
            .times(1)
            .returning(|_, _, _| Ok(page(2, 4, &["2022.3.3f1", "2022.3.2f1"])));

        let result = aggregate(&fetcher, &ReleaseFilter::default(), 2)
            .await
            .unwrap();

        assert_eq!(
            versions(&result),
            vec!["2022.3.4f1", "2022.3.3f1", "2022.3.2f1"]
        );
    }

    #[tokio::test]
    async fn aggregate_passes_filter_to_every_page() {
        let filter = ReleaseFilter::new(Some("2022.3".to_string()), Some("LTS".to_string()));
        let expected = filter.clone();

        let mut fetcher = MockReleaseFetcher::new();
        fetcher
            .expect_fetch_page()
            .withf(move |f, _, _| *f == expected)
            .times(2)
            .returning(|_, offset, _| {
                if offset == 0 {
                    Ok(page(0, 2, &["2022.3.2f1"]))
                } else {
                    Ok(page(1, 2, &["2022.3.1f1"]))
                }
            });

        let result = aggregate(&fetcher, &filter, 1).await.unwrap();

        assert_eq!(versions(&result), vec!["2022.3.2f1", "2022.3.1f1"]);
    }

    #[tokio::test]
    async fn aggregate_fails_when_first_page_fails() {
        let mut fetcher = MockReleaseFetcher::new();
        fetcher
            .expect_fetch_page()
            .times(1)
            .returning(|_, _, _| Err(FetchError::InvalidResponse("boom".to_string())));

        let result = aggregate(&fetcher, &ReleaseFilter::default(), 2).await;

        assert!(matches!(result, Err(FetchError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn aggregate_returns_partial_result_when_later_page_fails() {
        let mut fetcher = MockReleaseFetcher::new();
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(0), eq(2))
            .times(1)
            .returning(|_, _, _| Ok(page(0, 4, &["2022.3.4f1", "2022.3.3f1"])));
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(2), eq(2))
            .times(1)
            .returning(|_, _, _| {
                Err(FetchError::RateLimited {
                    retry_after_secs: None,
                })
            });

        let result = aggregate(&fetcher, &ReleaseFilter::default(), 2)
            .await
            .unwrap();

        assert!(!result.complete);
        assert_eq!(versions(&result), vec!["2022.3.4f1", "2022.3.3f1"]);
    }

    #[tokio::test]
    async fn aggregate_returns_partial_result_when_page_has_no_results_field() {
        let mut fetcher = MockReleaseFetcher::new();
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(0), eq(2))
            .times(1)
            .returning(|_, _, _| Ok(page(0, 4, &["2022.3.4f1", "2022.3.3f1"])));
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(2), eq(2))
            .times(1)
            .returning(|_, _, _| {
                Ok(ReleasePage {
                    offset: 2,
                    limit: 2,
                    total: Some(4),
                    results: None,
                })
            });

        let result = aggregate(&fetcher, &ReleaseFilter::default(), 2)
            .await
            .unwrap();

        assert!(!result.complete);
        assert_eq!(versions(&result), vec!["2022.3.4f1", "2022.3.3f1"]);
    }

    #[tokio::test]
    async fn aggregate_returns_empty_complete_result_for_empty_listing() {
        let mut fetcher = MockReleaseFetcher::new();
        fetcher
            .expect_fetch_page()
            .times(1)
            .returning(|_, _, _| Ok(page(0, 0, &[])));

        let result = aggregate(&fetcher, &ReleaseFilter::default(), 2)
            .await
            .unwrap();

        assert!(result.complete);
        assert!(result.releases.is_empty());
    }

    #[tokio::test]
    async fn aggregate_returns_partial_result_when_page_has_no_total_field() {
        let mut fetcher = MockReleaseFetcher::new();
        fetcher
            .expect_fetch_page()
            .with(eq(ReleaseFilter::default()), eq(0), eq(2))
            .times(1)
            .returning(|_, _, _| {
                Ok(ReleasePage {
                    offset: 0,
                    limit: 2,
                    total: None,
                    results: Some(vec![release("2022.3.4f1"), release("2022.3.3f1")]),
                })
            });

        let result = aggregate(&fetcher, &ReleaseFilter::default(), 2)
            .await
            .unwrap();

        assert!(!result.complete);
        assert_eq!(versions(&result), vec!["2022.3.4f1", "2022.3.3f1"]);
    }
}
