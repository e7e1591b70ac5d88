//! Tailing and search orchestration for tailscope
//!
//! This crate provides the live log tailer with its bounded buffer, the
//! debounced search/histogram orchestrator with stale-response
//! suppression, the AI query translator, the saved-search store, and
//! pagination control.

mod buffer;
mod pagination;
mod saved;
mod search;
mod tailer;
mod translate;

#[cfg(test)]
pub(crate) mod testing;

pub use buffer::{TAIL_BUFFER_CAPACITY, TailBuffer};
pub use pagination::{DEFAULT_PAGE_LIMIT, PaginationController};
pub use saved::SavedSearchStore;
pub use search::{DEBOUNCE_WINDOW, SearchOrchestrator, SearchView};
pub use tailer::{DEFAULT_POLL_INTERVAL, Tailer};
pub use translate::QueryTranslator;

// Re-export types used in our public API
pub use tailscope_api::{ApiError, LogApi};
pub use tailscope_types::{
    AiProvider, ArcLogRecord, FacetFilter, FilterState, GeneratedFilters, HistogramBucket,
    LogLevel, LogRecord, PaginationState, ProviderStatus, SavedSearch,
};
