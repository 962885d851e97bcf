//! Paginated collector
//!
//! Requests offset 0 first and reads the declared `total` from that page only. Later
//! pages are requested at the running offset until the records reach `total`, the
//! server returns an empty page, or the offset passes `total`. The declared total is
//! treated as a hint: the result says whether it was reached.
//!
//! A page whose body is structurally wrong is retried once. If it is still wrong the
//! first page aborts the run, while a later page is skipped (its offset is recorded)
//! and the walk moves on by one page size.

use crate::api::{endpoints, ApiClient, JsonTransport, Page, PageShapeError};
use crate::collect::retry::{fetch_with_retry, RetryPolicy, Sleeper, TokioSleeper};
use crate::collect::CollectError;
use crate::config::HarvestConfig;
use harvest_common::Record;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Paging parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PageSettings {
    pub page_size: u32,
    /// Pause before every request after the first
    pub pacing_delay: Duration,
    pub limit_param: String,
    pub skip_param: String,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            pacing_delay: Duration::from_millis(100),
            limit_param: "$limit".to_string(),
            skip_param: "$skip".to_string(),
        }
    }
}

/// Progress report emitted after every page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub fetched: u64,
    pub total: u64,
}

impl Progress {
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            100
        } else {
            (self.fetched.min(self.total) * 100) / self.total
        }
    }
}

/// How a collection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// At least the declared total was received
    Complete,
    /// The server ran out of records before the declared total
    ShortCount { fetched: u64, declared_total: u64 },
}

/// Everything gathered from one endpoint
#[derive(Debug, Clone)]
pub struct Collection {
    /// Records in server order
    pub records: Vec<Record>,
    /// Total declared by the first page
    pub total: u64,
    pub outcome: CollectionOutcome,
    /// Offsets of windows skipped because their body stayed malformed
    pub skipped_offsets: Vec<u64>,
}

impl Collection {
    fn new(records: Vec<Record>, total: u64, skipped_offsets: Vec<u64>) -> Self {
        let fetched = records.len() as u64;
        let outcome = if fetched >= total {
            CollectionOutcome::Complete
        } else {
            CollectionOutcome::ShortCount {
                fetched,
                declared_total: total,
            }
        };

        Self {
            records,
            total,
            outcome,
            skipped_offsets,
        }
    }

    pub fn fetched(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == CollectionOutcome::Complete
    }
}

enum PageFetch {
    Page(Page),
    Malformed(PageShapeError),
}

/// Walks paginated endpoints through a [`JsonTransport`]
pub struct Collector<T, S> {
    transport: T,
    sleeper: S,
    retry: RetryPolicy,
    pages: PageSettings,
}

impl Collector<ApiClient, TokioSleeper> {
    /// Build the production collector from a resolved configuration
    pub fn from_config(config: &HarvestConfig) -> crate::Result<Self> {
        let retry = RetryPolicy {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay(),
            retry_on: config.retry_on,
        };
        let pages = PageSettings {
            page_size: config.page_size,
            pacing_delay: config.pacing_delay(),
            limit_param: config.limit_param.clone(),
            skip_param: config.skip_param.clone(),
        };

        Ok(Self::new(ApiClient::from_config(config)?, TokioSleeper, retry, pages))
    }
}

impl<T: JsonTransport, S: Sleeper> Collector<T, S> {
    pub fn new(transport: T, sleeper: S, retry: RetryPolicy, pages: PageSettings) -> Self {
        Self {
            transport,
            sleeper,
            retry,
            pages,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }


    /// Collect every record of `endpoint`, reporting progress after each page
    pub async fn collect<F>(&self, endpoint: &str, mut on_progress: F) -> Result<Collection, CollectError>
    where
        F: FnMut(Progress),
    {
        let first_path = self.page_path(endpoint, 0);
        let first = match self.fetch_page(&first_path, true).await? {
            PageFetch::Page(page) => page,
            PageFetch::Malformed(reason) => {
                return Err(CollectError::MalformedPage {
                    path: first_path,
                    reason,
                })
            },
        };

        let total = first.total.unwrap_or_default();
        info!(endpoint, total, "Declared total");

        if total == 0 {
            on_progress(Progress { fetched: 0, total });
            return Ok(Collection::new(Vec::new(), 0, Vec::new()));
        }

        let mut exhausted = first.is_empty();
        let mut records = first.data;
        let mut offset = records.len() as u64;
        let mut skipped_offsets = Vec::new();
        on_progress(Progress {
            fetched: records.len() as u64,
            total,
        });

        while !exhausted && (records.len() as u64) < total && offset < total {
            self.sleeper.sleep(self.pages.pacing_delay).await;

            let path = self.page_path(endpoint, offset);
            match self.fetch_page(&path, false).await? {
                PageFetch::Page(page) if page.is_empty() => {
                    exhausted = true;
                },
                PageFetch::Page(page) => {
                    debug!(endpoint, offset, received = page.data.len(), "Page received");
                    offset += page.data.len() as u64;
                    records.extend(page.data);
                },
                PageFetch::Malformed(reason) => {
                    warn!(endpoint, offset, %reason, "Skipping malformed page");
                    skipped_offsets.push(offset);
                    offset += u64::from(self.pages.page_size);
                },
            }

            on_progress(Progress {
                fetched: records.len() as u64,
                total,
            });
        }

        let collection = Collection::new(records, total, skipped_offsets);
        if let CollectionOutcome::ShortCount {
            fetched,
            declared_total,
        } = collection.outcome
        {
            warn!(endpoint, fetched, declared_total, "Server ran out of records before the declared total");
        }

        Ok(collection)
    }

    fn page_path(&self, endpoint: &str, skip: u64) -> String {
        endpoints::page_path(
            endpoint,
            &self.pages.limit_param,
            &self.pages.skip_param,
            self.pages.page_size,
            skip,
        )
    }

    async fn fetch_page(&self, path: &str, require_total: bool) -> Result<PageFetch, CollectError> {
        let body = fetch_with_retry(&self.transport, &self.sleeper, &self.retry, path)
            .await
            .into_result(path)?;

        match Page::from_value(body, require_total) {
            Ok(page) => return Ok(PageFetch::Page(page)),
            Err(reason) => warn!(path, %reason, "Malformed page, retrying once"),
        }

        self.sleeper.sleep(self.retry.base_delay).await;
        let body = fetch_with_retry(&self.transport, &self.sleeper, &self.retry, path)
            .await
            .into_result(path)?;

        Ok(match Page::from_value(body, require_total) {
            Ok(page) => PageFetch::Page(page),
            Err(reason) => PageFetch::Malformed(reason),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::collect::testing::{page, transport_error, RecordingSleeper, ScriptedTransport};
    use crate::collect::RetryOn;
    use serde_json::{json, Value};

    fn collector(responses: Vec<Result<Value, crate::api::FetchError>>) -> Collector<ScriptedTransport, RecordingSleeper> {
        Collector::new(
            ScriptedTransport::new(responses),
            RecordingSleeper::default(),
            RetryPolicy {
                max_retries: 3,
                base_delay: Duration::from_secs(2),
                retry_on: RetryOn::Any,
            },
            PageSettings {
                page_size: 50,
                pacing_delay: Duration::from_millis(100),
                limit_param: "limit".to_string(),
                skip_param: "skip".to_string(),
            },
        )
    }

    fn ids(collection: &Collection) -> Vec<u64> {
        collection
            .records
            .iter()
            .map(|r| r["_id"].as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_zero_total_issues_single_request() {
        let c = collector(vec![Ok(page(0, 0, 0)), Ok(page(0, 0, 5))]);

        let result = c.collect("/orders", |_| {}).await.unwrap();

        assert!(result.records.is_empty());
        assert_eq!(result.total, 0);
        assert!(result.is_complete());
        assert_eq!(c.transport().request_count(), 1);
    }

    #[tokio::test]
    async fn test_total_125_takes_three_requests() {
        let c = collector(vec![
            Ok(page(125, 0, 50)),
            Ok(page(125, 50, 50)),
            Ok(page(125, 100, 25)),
        ]);

        let result = c.collect("/orders", |_| {}).await.unwrap();

        assert_eq!(result.fetched(), 125);
        assert!(result.is_complete());
        assert_eq!(
            c.transport().requests(),
            vec![
                "/orders?limit=50&skip=0",
                "/orders?limit=50&skip=50",
                "/orders?limit=50&skip=100",
            ]
        );
        assert_eq!(ids(&result), (0..125).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_full_pages_preserve_arrival_order() {
        let c = collector(vec![
            Ok(json!({"total": 4, "data": [{"_id": 9}, {"_id": 3}]})),
            Ok(json!({"data": [{"_id": 7}, {"_id": 1}]})),
        ]);
        let c = Collector {
            pages: PageSettings {
                page_size: 2,
                ..c.pages.clone()
            },
            ..c
        };

        let result = c.collect("/users", |_| {}).await.unwrap();

        assert_eq!(result.fetched(), result.total);
        assert_eq!(ids(&result), vec![9, 3, 7, 1]);
    }

    #[tokio::test]
    async fn test_empty_page_stops_with_short_count() {
        let c = collector(vec![
            Ok(page(200, 0, 50)),
            Ok(page(200, 50, 50)),
            Ok(page(200, 0, 0)),
            Ok(page(200, 100, 50)),
        ]);

        let result = c.collect("/orders", |_| {}).await.unwrap();

        assert_eq!(result.fetched(), 100);
        assert_eq!(
            result.outcome,
            CollectionOutcome::ShortCount {
                fetched: 100,
                declared_total: 200
            }
        );
        assert_eq!(c.transport().request_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_first_page_is_short_count() {
        let c = collector(vec![Ok(page(10, 0, 0))]);

        let result = c.collect("/orders", |_| {}).await.unwrap();

        assert!(!result.is_complete());
        assert_eq!(c.transport().request_count(), 1);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let c = collector(vec![
            Ok(page(120, 0, 50)),
            Ok(page(120, 50, 50)),
            Ok(page(120, 100, 20)),
        ]);
        let mut seen = Vec::new();

        c.collect("/orders", |p| seen.push(p)).await.unwrap();

        let fetched: Vec<u64> = seen.iter().map(|p| p.fetched).collect();
        assert_eq!(fetched, vec![50, 100, 120]);
        assert!(seen.iter().all(|p| p.total == 120));
        assert_eq!(seen.last().unwrap().percent(), 100);
    }

    #[tokio::test]
    async fn test_pacing_between_pages() {
        let c = collector(vec![Ok(page(75, 0, 50)), Ok(page(75, 50, 25))]);

        c.collect("/orders", |_| {}).await.unwrap();

        assert_eq!(c.sleeper.sleeps(), vec![Duration::from_millis(100)]);
    }

    #[tokio::test]
    async fn test_transient_failure_inside_pagination_recovers() {
        let c = collector(vec![
            Ok(page(60, 0, 50)),
            Err(transport_error()),
            Ok(page(60, 50, 10)),
        ]);

        let result = c.collect("/orders", |_| {}).await.unwrap();

        assert_eq!(result.fetched(), 60);
        assert_eq!(
            c.sleeper.sleeps(),
            vec![Duration::from_millis(100), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_abort_collection() {
        let c = collector(vec![
            Ok(page(60, 0, 50)),
            Err(transport_error()),
            Err(transport_error()),
            Err(transport_error()),
        ]);

        let err = c.collect("/orders", |_| {}).await.unwrap_err();

        assert!(matches!(err, CollectError::RetriesExhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_malformed_page_retried_once_then_skipped() {
        let c = collector(vec![
            Ok(page(150, 0, 50)),
            Ok(json!({"error": "busy"})),
            Ok(json!({"error": "busy"})),
            Ok(page(150, 100, 50)),
        ]);

        let result = c.collect("/orders", |_| {}).await.unwrap();

        assert_eq!(result.skipped_offsets, vec![50]);
        assert_eq!(result.fetched(), 100);
        assert!(!result.is_complete());
        assert_eq!(
            c.transport().requests(),
            vec![
                "/orders?limit=50&skip=0",
                "/orders?limit=50&skip=50",
                "/orders?limit=50&skip=50",
                "/orders?limit=50&skip=100",
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_page_recovered_on_retry() {
        let c = collector(vec![
            Ok(page(100, 0, 50)),
            Ok(json!({"data": "oops"})),
            Ok(page(100, 50, 50)),
        ]);

        let result = c.collect("/orders", |_| {}).await.unwrap();

        assert!(result.is_complete());
        assert!(result.skipped_offsets.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_first_page_is_error() {
        let c = collector(vec![Ok(json!({"data": []})), Ok(json!({"data": []}))]);

        let err = c.collect("/orders", |_| {}).await.unwrap_err();

        assert!(matches!(
            err,
            CollectError::MalformedPage {
                reason: PageShapeError::MissingTotal,
                ..
            }
        ));
        assert_eq!(c.transport().request_count(), 2);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(Progress { fetched: 25, total: 125 }.percent(), 20);
        assert_eq!(Progress { fetched: 0, total: 0 }.percent(), 100);
    }
}
