//! Scripted `LogApi` fake used by the unit tests in this crate.
//!
//! Responses are consumed front-to-back per endpoint; each response can
//! carry a delay so tests running under `tokio::time::pause` can force
//! arbitrary completion orderings.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use tailscope_api::{ApiError, LogApi};
use tailscope_types::{
    AiProvider, FilterState, GeneratedFilters, HistogramBucket, LogLevel, LogRecord,
    PaginationState, ProviderStatus, SavedSearch, SearchResponse,
};

/// A log record `secs` seconds into the test epoch, id `rec-<secs>`
pub fn record(secs: i64) -> LogRecord {
    LogRecord::new(
        format!("rec-{secs}"),
        base_time() + chrono::Duration::seconds(secs),
        LogLevel::Info,
        "api-gateway",
        format!("message {secs}"),
    )
}

/// Fixed test epoch
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// One scripted response with an artificial completion delay
pub struct Scripted<T> {
    pub delay: Duration,
    pub result: Result<T, ApiError>,
}

impl<T> Scripted<T> {
    pub fn ok(value: T) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(value),
        }
    }

    pub fn ok_after(delay: Duration, value: T) -> Self {
        Self { delay, result: Ok(value) }
    }

    pub fn err(err: ApiError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(err),
        }
    }
}

/// What the fake was asked to do, in order
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Stream { since: Option<DateTime<Utc>>, limit: u64 },
    Search { query: Option<String>, page: u64 },
    Histogram,
    Generate { provider: AiProvider },
    AiStatus,
    ListSearches,
    CreateSearch { name: String },
    DeleteSearch { id: String },
}

#[derive(Default)]
pub struct ScriptedApi {
    pub stream: Mutex<VecDeque<Scripted<Vec<LogRecord>>>>,
    pub search: Mutex<VecDeque<Scripted<SearchResponse>>>,
    pub histogram: Mutex<VecDeque<Scripted<Vec<HistogramBucket>>>>,
    pub generate: Mutex<VecDeque<Scripted<GeneratedFilters>>>,
    pub status: Mutex<VecDeque<Scripted<ProviderStatus>>>,
    pub saved_list: Mutex<VecDeque<Scripted<Vec<SavedSearch>>>>,
    pub saved_create: Mutex<VecDeque<Scripted<SavedSearch>>>,
    pub saved_delete: Mutex<VecDeque<Scripted<()>>>,
    pub calls: Mutex<Vec<Call>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_stream(&self, response: Scripted<Vec<LogRecord>>) {
        self.stream.lock().push_back(response);
    }

    pub fn push_search(&self, response: Scripted<SearchResponse>) {
        self.search.lock().push_back(response);
    }

    pub fn push_histogram(&self, response: Scripted<Vec<HistogramBucket>>) {
        self.histogram.lock().push_back(response);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn log(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

/// An empty one-page search response
pub fn empty_search_response() -> SearchResponse {
    search_response(Vec::new(), 1, 50, 0)
}

pub fn search_response(logs: Vec<LogRecord>, page: u64, limit: u64, total: u64) -> SearchResponse {
    SearchResponse {
        logs,
        pagination: PaginationState {
            page,
            limit,
            total,
            total_pages: PaginationState::pages_for(total, limit),
        },
    }
}

async fn take<T>(queue: &Mutex<VecDeque<Scripted<T>>>, fallback: impl FnOnce() -> Result<T, ApiError>) -> Result<T, ApiError> {
    let scripted = queue.lock().pop_front();
    match scripted {
        Some(Scripted { delay, result }) => {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        }
        None => fallback(),
    }
}

#[async_trait]
impl LogApi for ScriptedApi {
    async fn stream_logs(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u64,
    ) -> Result<Vec<LogRecord>, ApiError> {
        self.log(Call::Stream { since, limit });
        // Unscripted ticks behave as quiet periods
        take(&self.stream, || Ok(Vec::new())).await
    }

    async fn search_logs(
        &self,
        filter: &FilterState,
        page: u64,
        _limit: u64,
    ) -> Result<SearchResponse, ApiError> {
        self.log(Call::Search {
            query: filter.query.clone(),
            page,
        });
        take(&self.search, || Ok(empty_search_response())).await
    }

    async fn histogram(&self, _filter: &FilterState) -> Result<Vec<HistogramBucket>, ApiError> {
        self.log(Call::Histogram);
        take(&self.histogram, || Ok(Vec::new())).await
    }

    async fn generate_filters(
        &self,
        _query: &str,
        provider: AiProvider,
    ) -> Result<GeneratedFilters, ApiError> {
        self.log(Call::Generate { provider });
        take(&self.generate, || Ok(GeneratedFilters::default())).await
    }

    async fn ai_status(&self) -> Result<ProviderStatus, ApiError> {
        self.log(Call::AiStatus);
        take(&self.status, || Ok(ProviderStatus::default())).await
    }

    async fn list_saved_searches(&self) -> Result<Vec<SavedSearch>, ApiError> {
        self.log(Call::ListSearches);
        take(&self.saved_list, || Ok(Vec::new())).await
    }

    async fn create_saved_search(
        &self,
        name: &str,
        query: &FilterState,
    ) -> Result<SavedSearch, ApiError> {
        self.log(Call::CreateSearch { name: name.to_string() });
        let name = name.to_string();
        let query = query.clone();
        take(&self.saved_create, move || {
            Ok(SavedSearch {
                id: format!("saved-{name}"),
                name,
                query,
                created_at: base_time(),
            })
        })
        .await
    }

    async fn delete_saved_search(&self, id: &str) -> Result<(), ApiError> {
        self.log(Call::DeleteSearch { id: id.to_string() });
        take(&self.saved_delete, || Ok(())).await
    }
}
