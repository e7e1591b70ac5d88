//! Dashboard API client for tailscope
//!
//! This crate wraps the REST endpoints the core depends on behind the
//! [`LogApi`] trait and provides the production HTTP implementation.

mod client;
mod error;

pub use client::{ApiClient, LogApi};
pub use error::ApiError;

// Re-export types used in our public API
pub use tailscope_types::{
    AiProvider, FilterState, GeneratedFilters, HistogramBucket, LogRecord, ProviderStatus,
    SavedSearch, SearchResponse,
};
