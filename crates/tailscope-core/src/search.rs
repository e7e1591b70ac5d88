use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use tailscope_api::{ApiError, LogApi};
use tailscope_types::{
    ArcLogRecord, FacetFilter, FilterState, HistogramBucket, LogLevel, PaginationState,
};

use crate::pagination::{DEFAULT_PAGE_LIMIT, PaginationController};

/// Window within which rapid filter edits collapse to one fetch
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Immutable snapshot of the rendered search state.
///
/// Results and histogram always belong to the same filter state: they
/// are fetched under one sequence number and applied together. On a
/// failed fetch the previous data is kept and only `last_error` is set.
#[derive(Clone, Debug)]
pub struct SearchView {
    pub records: Vec<ArcLogRecord>,
    pub histogram: Vec<HistogramBucket>,
    pub pagination: PaginationState,
    pub last_error: Option<String>,
}

impl SearchView {
    fn initial(limit: u64) -> Self {
        Self {
            records: Vec::new(),
            histogram: Vec::new(),
            pagination: PaginationState::initial(limit),
            last_error: None,
        }
    }
}

struct Inner {
    api: Arc<dyn LogApi>,
    filter: Mutex<FilterState>,
    pagination: Mutex<PaginationController>,

    /// Next request sequence number
    seq: AtomicU64,

    /// Highest sequence number observed at response arrival; anything
    /// at or below it is stale and dropped
    last_seen: AtomicU64,

    /// Pending debounce task, aborted on every newer edit
    debounce: Mutex<Option<tokio::task::JoinHandle<()>>>,

    tx: watch::Sender<SearchView>,
    limit: u64,
}

/// Coordinates search and histogram fetches against a changing filter
/// state.
///
/// Rapid edits are debounced; each issued fetch carries a monotonically
/// increasing sequence number and only the highest-numbered response
/// ever reaches subscribers, so the rendered view always matches the
/// most recently requested filter state regardless of network ordering.
#[derive(Clone)]
pub struct SearchOrchestrator {
    inner: Arc<Inner>,
}

impl SearchOrchestrator {
    pub fn new(api: Arc<dyn LogApi>) -> Self {
        Self::with_limit(api, DEFAULT_PAGE_LIMIT)
    }

    pub fn with_limit(api: Arc<dyn LogApi>, limit: u64) -> Self {
        let (tx, _) = watch::channel(SearchView::initial(limit));
        Self {
            inner: Arc::new(Inner {
                api,
                filter: Mutex::new(FilterState::default()),
                pagination: Mutex::new(PaginationController::new(limit)),
                seq: AtomicU64::new(0),
                last_seen: AtomicU64::new(0),
                debounce: Mutex::new(None),
                tx,
                limit,
            }),
        }
    }

    /// Subscribe to view updates. The receiver always holds the latest
    /// applied snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.inner.tx.subscribe()
    }

    /// Latest applied view snapshot
    pub fn view(&self) -> SearchView {
        self.inner.tx.borrow().clone()
    }

    pub fn filter_state(&self) -> FilterState {
        self.inner.filter.lock().clone()
    }

    pub fn pagination(&self) -> PaginationState {
        self.inner.pagination.lock().state()
    }

    /// Replace the whole filter state. Resets to page 1 and schedules a
    /// debounced fetch.
    pub fn set_filter_state(&self, next: FilterState) {
        *self.inner.filter.lock() = next;
        self.on_filter_changed();
    }

    /// Update the free-text query
    pub fn set_query(&self, query: Option<String>) {
        self.inner.filter.lock().query = query.filter(|q| !q.trim().is_empty());
        self.on_filter_changed();
    }

    /// Update the time window
    pub fn set_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) {
        {
            let mut filter = self.inner.filter.lock();
            filter.start_time = start;
            filter.end_time = end;
        }
        self.on_filter_changed();
    }

    /// Replace the level set
    pub fn set_levels(&self, levels: impl IntoIterator<Item = LogLevel>) {
        self.inner.filter.lock().levels = levels.into_iter().collect();
        self.on_filter_changed();
    }

    /// Replace the source set
    pub fn set_sources(&self, sources: impl IntoIterator<Item = String>) {
        self.inner.filter.lock().sources = sources.into_iter().collect();
        self.on_filter_changed();
    }

    /// Add a facet constraint. Duplicate (key, value) pairs are a no-op
    /// and do not trigger a fetch; malformed facets are rejected before
    /// touching any state.
    pub fn add_facet(&self, facet: FacetFilter) -> Result<bool, ApiError> {
        if !facet.is_well_formed() {
            return Err(ApiError::Validation(format!(
                "malformed facet: {:?}={:?}",
                facet.key, facet.value
            )));
        }
        let added = self.inner.filter.lock().add_facet(facet);
        if added {
            self.on_filter_changed();
        }
        Ok(added)
    }

    /// Remove a facet by exact (key, value) match
    pub fn remove_facet(&self, facet: &FacetFilter) -> bool {
        let removed = self.inner.filter.lock().remove_facet(facet);
        if removed {
            self.on_filter_changed();
        }
        removed
    }

    /// Fetch immediately with the current state, bypassing the debounce
    /// window
    pub fn search_now(&self) {
        self.abort_debounce();
        Inner::dispatch(&self.inner);
    }

    /// Jump to page `n` (clamped); issues an immediate fetch when the
    /// page actually changes. Returns whether a fetch was issued.
    pub fn set_page(&self, n: u64) -> bool {
        let changed = self.inner.pagination.lock().set_page(n);
        if changed {
            self.abort_debounce();
            Inner::dispatch(&self.inner);
        }
        changed
    }

    /// Advance one page; no-op on the last page
    pub fn next_page(&self) -> bool {
        let changed = self.inner.pagination.lock().next();
        if changed {
            self.abort_debounce();
            Inner::dispatch(&self.inner);
        }
        changed
    }

    /// Go back one page; no-op on page 1
    pub fn previous_page(&self) -> bool {
        let changed = self.inner.pagination.lock().previous();
        if changed {
            self.abort_debounce();
            Inner::dispatch(&self.inner);
        }
        changed
    }

    /// Any filter change resets pagination and re-arms the debounce
    /// timer with the latest state
    fn on_filter_changed(&self) {
        self.inner.pagination.lock().reset_to_first_page();

        let mut pending = self.inner.debounce.lock();
        if let Some(task) = pending.take() {
            task.abort();
        }
        let inner = Arc::clone(&self.inner);
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE_WINDOW).await;
            Inner::dispatch(&inner);
        }));
    }

    fn abort_debounce(&self) {
        if let Some(task) = self.inner.debounce.lock().take() {
            task.abort();
        }
    }
}

impl Inner {
    /// Issue the paired results + histogram fetch for the current state
    /// under a fresh sequence number
    fn dispatch(inner: &Arc<Inner>) {
        let seq = inner.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let filter = inner.filter.lock().clone();
        let page = inner.pagination.lock().page();
        let limit = inner.limit;
        debug!(seq, page, "dispatching search");

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let (results, histogram) = tokio::join!(
                inner.api.search_logs(&filter, page, limit),
                inner.api.histogram(&filter),
            );

            // Supersession: drop anything that is not the newest arrival
            let newest = inner.last_seen.fetch_max(seq, Ordering::SeqCst);
            if seq <= newest {
                debug!(seq, newest, "dropping stale search response");
                return;
            }

            match (results, histogram) {
                (Ok(response), Ok(buckets)) => {
                    let pagination = {
                        let mut controller = inner.pagination.lock();
                        controller.apply_response(response.pagination);
                        controller.state()
                    };
                    let view = SearchView {
                        records: response.logs.into_iter().map(Arc::new).collect(),
                        histogram: buckets,
                        pagination,
                        last_error: None,
                    };
                    inner.tx.send_replace(view);
                }
                (Err(err), _) | (_, Err(err)) => {
                    // Previous results stay on screen; pagination untouched
                    let mut view = inner.tx.borrow().clone();
                    view.last_error = Some(err.to_string());
                    inner.tx.send_replace(view);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedApi, Scripted, Call, record, search_response};

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    fn search_calls(api: &ScriptedApi) -> Vec<(Option<String>, u64)> {
        api.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Search { query, page } => Some((query, page)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_collapse_to_one_fetch_with_latest_state() {
        let api = Arc::new(ScriptedApi::new());
        let orchestrator = SearchOrchestrator::new(api.clone());

        orchestrator.set_query(Some("first".into()));
        orchestrator.set_query(Some("second".into()));
        orchestrator.set_query(Some("third".into()));
        tokio::time::sleep(DEBOUNCE_WINDOW + Duration::from_millis(50)).await;

        let calls = search_calls(&api);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_deref(), Some("third"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_now_bypasses_debounce() {
        let api = Arc::new(ScriptedApi::new());
        let orchestrator = SearchOrchestrator::new(api.clone());

        orchestrator.set_query(Some("urgent".into()));
        orchestrator.search_now();
        settle().await;

        assert_eq!(search_calls(&api).len(), 1);
        // The debounce task was aborted; no second fetch fires later
        tokio::time::sleep(DEBOUNCE_WINDOW * 2).await;
        assert_eq!(search_calls(&api).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_dropped() {
        let api = Arc::new(ScriptedApi::new());
        // Request for filter A completes slowly, B quickly: B's response
        // arrives first, A's must be dropped on arrival.
        api.push_search(Scripted::ok_after(
            Duration::from_millis(300),
            search_response(vec![record(1)], 1, 50, 1),
        ));
        api.push_search(Scripted::ok_after(
            Duration::from_millis(50),
            search_response(vec![record(2)], 1, 50, 1),
        ));
        api.push_histogram(Scripted::ok_after(Duration::from_millis(300), Vec::new()));
        api.push_histogram(Scripted::ok_after(Duration::from_millis(50), Vec::new()));

        let orchestrator = SearchOrchestrator::new(api.clone());
        orchestrator.set_query(Some("filter-a".into()));
        orchestrator.search_now();
        orchestrator.set_query(Some("filter-b".into()));
        orchestrator.search_now();

        // Wait until both responses have arrived
        tokio::time::sleep(Duration::from_millis(500)).await;

        let view = orchestrator.view();
        assert_eq!(view.records.len(), 1);
        assert_eq!(view.records[0].id, "rec-2");
        assert!(view.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_resets_to_page_one() {
        let api = Arc::new(ScriptedApi::new());
        // First fetch reports 5 pages so page navigation has room
        api.push_search(Scripted::ok(search_response(vec![record(1)], 1, 50, 250)));
        api.push_search(Scripted::ok(search_response(vec![record(2)], 3, 50, 250)));

        let orchestrator = SearchOrchestrator::new(api.clone());
        orchestrator.search_now();
        settle().await;
        orchestrator.set_page(3);
        settle().await;
        assert_eq!(orchestrator.pagination().page, 3);

        orchestrator.set_query(Some("narrower".into()));
        tokio::time::sleep(DEBOUNCE_WINDOW + Duration::from_millis(50)).await;

        let calls = search_calls(&api);
        assert_eq!(calls.last().unwrap(), &(Some("narrower".into()), 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_keeps_previous_results() {
        let api = Arc::new(ScriptedApi::new());
        api.push_search(Scripted::ok(search_response(vec![record(1)], 1, 50, 1)));
        api.push_search(Scripted::err(ApiError::Transport {
            status: Some(500),
            message: "boom".into(),
        }));

        let orchestrator = SearchOrchestrator::new(api.clone());
        orchestrator.search_now();
        settle().await;
        assert_eq!(orchestrator.view().records.len(), 1);
        let pagination_before = orchestrator.pagination();

        orchestrator.search_now();
        settle().await;

        let view = orchestrator.view();
        assert_eq!(view.records.len(), 1, "no flush-to-empty on error");
        assert!(view.last_error.is_some());
        assert_eq!(orchestrator.pagination(), pagination_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_histogram_failure_fails_the_pair() {
        let api = Arc::new(ScriptedApi::new());
        api.push_search(Scripted::ok(search_response(vec![record(1)], 1, 50, 1)));
        api.push_histogram(Scripted::err(ApiError::Transport {
            status: None,
            message: "connection reset".into(),
        }));

        let orchestrator = SearchOrchestrator::new(api.clone());
        orchestrator.search_now();
        settle().await;

        let view = orchestrator.view();
        // Results never show up with a histogram from another filter
        assert!(view.records.is_empty());
        assert!(view.last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_facet_is_noop_without_fetch() {
        let api = Arc::new(ScriptedApi::new());
        let orchestrator = SearchOrchestrator::new(api.clone());

        assert!(orchestrator.add_facet(FacetFilter::new("host", "web-1")).unwrap());
        assert!(!orchestrator.add_facet(FacetFilter::new("host", "web-1")).unwrap());
        tokio::time::sleep(DEBOUNCE_WINDOW + Duration::from_millis(50)).await;

        assert_eq!(orchestrator.filter_state().facets.len(), 1);
        assert_eq!(search_calls(&api).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_facet_rejected_synchronously() {
        let api = Arc::new(ScriptedApi::new());
        let orchestrator = SearchOrchestrator::new(api.clone());

        let err = orchestrator.add_facet(FacetFilter::new("  ", "x")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        tokio::time::sleep(DEBOUNCE_WINDOW * 2).await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_navigation_noops_do_not_fetch() {
        let api = Arc::new(ScriptedApi::new());
        api.push_search(Scripted::ok(search_response(vec![record(1)], 1, 50, 40)));

        let orchestrator = SearchOrchestrator::new(api.clone());
        orchestrator.search_now();
        settle().await;

        // Single page: both directions are no-ops
        orchestrator.next_page();
        orchestrator.previous_page();
        settle().await;
        assert_eq!(search_calls(&api).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_page_clamps_and_fetches_clamped_page() {
        let api = Arc::new(ScriptedApi::new());
        api.push_search(Scripted::ok(search_response(vec![record(1)], 1, 50, 120)));

        let orchestrator = SearchOrchestrator::new(api.clone());
        orchestrator.search_now();
        settle().await;

        orchestrator.set_page(999);
        settle().await;
        let calls = search_calls(&api);
        assert_eq!(calls.last().unwrap().1, 3);
    }
}
