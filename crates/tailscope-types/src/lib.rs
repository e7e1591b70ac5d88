//! Shared types for tailscope
//!
//! This crate contains the data model used across the tailscope crates:
//! log records, filter state, pagination, histogram buckets, saved
//! searches, and the AI filter-generation types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

// ============================================================================
// Log Types
// ============================================================================

/// Log severity level
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Parse log level from common formats
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debug" | "dbg" => Some(Self::Debug),
            "info" | "inf" | "information" => Some(Self::Info),
            "warn" | "warning" | "wrn" => Some(Self::Warn),
            "error" | "err" => Some(Self::Error),
            "fatal" | "critical" | "crit" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Wire/display string (uppercase)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

/// A single log record as returned by the dashboard backend.
///
/// Immutable once received; the tail buffer hands out `Arc<LogRecord>`
/// so snapshots never copy record payloads.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Backend-assigned unique ID
    pub id: String,

    /// Record timestamp; unique per id, sortable
    pub timestamp: DateTime<Utc>,

    /// Severity level
    pub level: LogLevel,

    /// Emitting service/source name
    pub source: String,

    /// Log message text
    pub message: String,

    /// Structured fields attached to the record (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Shared handle to a log record
pub type ArcLogRecord = Arc<LogRecord>;

impl LogRecord {
    /// Create a record with minimal fields
    pub fn new(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        level: LogLevel,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            level,
            source: source.into(),
            message: message.into(),
            metadata: None,
        }
    }
}

// ============================================================================
// Filter Types
// ============================================================================

/// An exact key/value constraint added ad hoc (e.g. from drilling into a
/// structured log field).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacetFilter {
    pub key: String,
    pub value: String,
}

impl FacetFilter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A facet is well-formed when both key and value carry non-blank text
    pub fn is_well_formed(&self) -> bool {
        !self.key.trim().is_empty() && !self.value.trim().is_empty()
    }
}

/// The current combination of search dimensions.
///
/// `facets` keeps insertion order for display; uniqueness by (key, value)
/// is enforced at the mutation points (`add_facet` is a no-op on
/// duplicates).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// Free-text query (None = no text constraint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Inclusive window start
    pub start_time: DateTime<Utc>,

    /// Inclusive window end
    pub end_time: DateTime<Utc>,

    /// Levels to include (empty = all)
    #[serde(default)]
    pub levels: BTreeSet<LogLevel>,

    /// Sources to include (empty = all)
    #[serde(default)]
    pub sources: BTreeSet<String>,

    /// Ad-hoc key/value constraints, in display order
    #[serde(default)]
    pub facets: Vec<FacetFilter>,
}

impl FilterState {
    /// Filter state covering the last hour ending at `now`
    pub fn last_hour(now: DateTime<Utc>) -> Self {
        Self {
            query: None,
            start_time: now - chrono::Duration::hours(1),
            end_time: now,
            levels: BTreeSet::new(),
            sources: BTreeSet::new(),
            facets: Vec::new(),
        }
    }

    /// Add a facet; no-op when an identical (key, value) pair exists
    pub fn add_facet(&mut self, facet: FacetFilter) -> bool {
        if self.facets.contains(&facet) {
            return false;
        }
        self.facets.push(facet);
        true
    }

    /// Remove a facet by exact (key, value) match
    pub fn remove_facet(&mut self, facet: &FacetFilter) -> bool {
        let before = self.facets.len();
        self.facets.retain(|f| f != facet);
        self.facets.len() != before
    }

    /// Apply AI-generated filters atomically.
    ///
    /// Fully replaces `query`, `levels`, and `sources` (absent or empty
    /// fields clear the corresponding dimension); the time range and
    /// facets are left untouched.
    pub fn apply_generated(&mut self, generated: GeneratedFilters) {
        self.query = generated.keyword.filter(|k| !k.trim().is_empty());
        self.levels = generated.levels.unwrap_or_default().into_iter().collect();
        self.sources = generated.sources.unwrap_or_default().into_iter().collect();
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::last_hour(Utc::now())
    }
}

// ============================================================================
// Search Result Types
// ============================================================================

/// A time-bucketed count of matching records, for the activity chart
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBucket {
    /// Bucket start time
    pub time: DateTime<Utc>,

    /// Number of matching records in the bucket
    pub count: u64,
}

/// Pagination snapshot returned with every search response.
///
/// Invariant after a successful fetch: `1 <= page <= total_pages` and
/// `total_pages == max(1, ceil(total / limit))`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationState {
    /// Initial state before any fetch: one empty page
    pub fn initial(limit: u64) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            total: 0,
            total_pages: 1,
        }
    }

    /// `max(1, ceil(total / limit))`
    pub fn pages_for(total: u64, limit: u64) -> u64 {
        let limit = limit.max(1);
        (total.div_ceil(limit)).max(1)
    }
}

/// One page of search results together with its pagination snapshot
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub logs: Vec<LogRecord>,
    pub pagination: PaginationState,
}

// ============================================================================
// Saved Searches
// ============================================================================

/// A named, persisted snapshot of a FilterState.
///
/// Created and deleted only through explicit user action; never mutated
/// in place (replace-on-update).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
    pub id: String,
    pub name: String,
    pub query: FilterState,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// AI Filter Generation
// ============================================================================

/// AI backend used for natural-language query translation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiProvider {
    #[serde(rename = "providerA")]
    ProviderA,
    #[serde(rename = "providerB")]
    ProviderB,
}

impl AiProvider {
    /// Fixed preference order used when the caller does not pin a provider
    pub const PREFERENCE_ORDER: [AiProvider; 2] = [Self::ProviderA, Self::ProviderB];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProviderA => "providerA",
            Self::ProviderB => "providerB",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "providera" | "a" => Some(Self::ProviderA),
            "providerb" | "b" => Some(Self::ProviderB),
            _ => None,
        }
    }
}

/// Which AI backends are currently configured server-side
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub provider_a_configured: bool,
    pub provider_b_configured: bool,
}

impl ProviderStatus {
    pub fn is_configured(&self, provider: AiProvider) -> bool {
        match provider {
            AiProvider::ProviderA => self.provider_a_configured,
            AiProvider::ProviderB => self.provider_b_configured,
        }
    }

    pub fn any_configured(&self) -> bool {
        self.provider_a_configured || self.provider_b_configured
    }
}

/// Structured filters produced by the Query Translator.
///
/// Applied atomically to a FilterState via
/// [`FilterState::apply_generated`]; facets and time range are never
/// touched by application.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFilters {
    #[serde(default)]
    pub keyword: Option<String>,

    #[serde(default)]
    pub levels: Option<Vec<LogLevel>>,

    #[serde(default)]
    pub sources: Option<Vec<String>>,
}
