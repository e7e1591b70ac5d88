use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use tailscope_types::{
    AiProvider, FilterState, GeneratedFilters, HistogramBucket, LogRecord, ProviderStatus,
    SavedSearch, SearchResponse,
};

use crate::error::ApiError;

/// The slice of the dashboard backend the core depends on.
///
/// The trait exists so the tailer, orchestrator, translator, and saved
/// search store can be driven by scripted fakes in tests; `ApiClient` is
/// the production implementation.
#[async_trait]
pub trait LogApi: Send + Sync {
    /// `GET /logs/stream` — records strictly after `since` (or the most
    /// recent `limit` records when `since` is None), ascending by timestamp
    async fn stream_logs(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u64,
    ) -> Result<Vec<LogRecord>, ApiError>;

    /// `GET /logs/search` — one page of results plus pagination
    async fn search_logs(
        &self,
        filter: &FilterState,
        page: u64,
        limit: u64,
    ) -> Result<SearchResponse, ApiError>;

    /// `GET /logs/histogram` — bucketed counts for the same filter
    async fn histogram(&self, filter: &FilterState) -> Result<Vec<HistogramBucket>, ApiError>;

    /// `POST /ai/filters` — translate a natural-language query
    async fn generate_filters(
        &self,
        query: &str,
        provider: AiProvider,
    ) -> Result<GeneratedFilters, ApiError>;

    /// `GET /ai/status` — which AI backends are configured
    async fn ai_status(&self) -> Result<ProviderStatus, ApiError>;

    /// `GET /searches`
    async fn list_saved_searches(&self) -> Result<Vec<SavedSearch>, ApiError>;

    /// `POST /searches`
    async fn create_saved_search(
        &self,
        name: &str,
        query: &FilterState,
    ) -> Result<SavedSearch, ApiError>;

    /// `DELETE /searches/{id}`
    async fn delete_saved_search(&self, id: &str) -> Result<(), ApiError>;
}

/// HTTP client for the dashboard backend
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Create a client for `base_url` authenticating with `token`.
    ///
    /// A blank credential is a precondition failure: no request can be
    /// issued without one, so construction fails before any network call.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ApiError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ApiError::MissingCredential);
        }

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!(path, "GET");
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(params)
            .send()
            .await?;
        decode(resp).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "POST");
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }
}

/// Map a response to the target type, or to the error taxonomy on non-2xx
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::from_status(status.as_u16(), body));
    }
    Ok(resp.json::<T>().await?)
}

/// Timestamps on the wire use millisecond-precision RFC 3339 with a Z suffix
fn wire_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the query string shared by the search and histogram endpoints
fn filter_params(filter: &FilterState) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    if let Some(query) = &filter.query {
        if !query.trim().is_empty() {
            params.push(("query", query.clone()));
        }
    }

    params.push(("startDate", wire_timestamp(filter.start_time)));
    params.push(("endDate", wire_timestamp(filter.end_time)));

    if !filter.levels.is_empty() {
        let csv = filter
            .levels
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(",");
        params.push(("levels", csv));
    }

    if !filter.sources.is_empty() {
        let csv = filter.sources.iter().cloned().collect::<Vec<_>>().join(",");
        params.push(("sources", csv));
    }

    if !filter.facets.is_empty() {
        let json = serde_json::to_string(&filter.facets).unwrap_or_default();
        params.push(("facetFilters", json));
    }

    params
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateFiltersBody<'a> {
    query: &'a str,
    provider: AiProvider,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSearchBody<'a> {
    name: &'a str,
    query: &'a FilterState,
}

#[async_trait]
impl LogApi for ApiClient {
    async fn stream_logs(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u64,
    ) -> Result<Vec<LogRecord>, ApiError> {
        let mut params = vec![("limit", limit.to_string())];
        if let Some(since) = since {
            params.push(("since", wire_timestamp(since)));
        }
        self.get_json("/logs/stream", &params).await
    }

    async fn search_logs(
        &self,
        filter: &FilterState,
        page: u64,
        limit: u64,
    ) -> Result<SearchResponse, ApiError> {
        let mut params = filter_params(filter);
        params.push(("page", page.to_string()));
        params.push(("limit", limit.to_string()));
        self.get_json("/logs/search", &params).await
    }

    async fn histogram(&self, filter: &FilterState) -> Result<Vec<HistogramBucket>, ApiError> {
        let params = filter_params(filter);
        self.get_json("/logs/histogram", &params).await
    }

    async fn generate_filters(
        &self,
        query: &str,
        provider: AiProvider,
    ) -> Result<GeneratedFilters, ApiError> {
        self.post_json("/ai/filters", &GenerateFiltersBody { query, provider })
            .await
    }

    async fn ai_status(&self) -> Result<ProviderStatus, ApiError> {
        self.get_json("/ai/status", &[]).await
    }

    async fn list_saved_searches(&self) -> Result<Vec<SavedSearch>, ApiError> {
        self.get_json("/searches", &[]).await
    }

    async fn create_saved_search(
        &self,
        name: &str,
        query: &FilterState,
    ) -> Result<SavedSearch, ApiError> {
        self.post_json("/searches", &CreateSearchBody { name, query })
            .await
    }

    async fn delete_saved_search(&self, id: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/searches/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), body));
        }
        Ok(())
    }
}
