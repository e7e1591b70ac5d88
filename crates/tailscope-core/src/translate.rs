use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use tailscope_api::{ApiError, LogApi};
use tailscope_types::{AiProvider, GeneratedFilters, ProviderStatus};

/// Translates natural-language queries into structured filters through
/// one of the configured AI backends.
///
/// Provider selection walks [`AiProvider::PREFERENCE_ORDER`] and picks
/// the first configured backend, so adding a provider means extending
/// the order, not adding a branch. The call is atomic from the caller's
/// perspective: a complete [`GeneratedFilters`] or an error, never a
/// partial result.
pub struct QueryTranslator {
    api: Arc<dyn LogApi>,

    /// Last known provider availability, refreshed by `capabilities()`
    status: Mutex<Option<ProviderStatus>>,
}

impl QueryTranslator {
    pub fn new(api: Arc<dyn LogApi>) -> Self {
        Self {
            api,
            status: Mutex::new(None),
        }
    }

    /// Fetch and cache which backends are currently configured
    pub async fn capabilities(&self) -> Result<ProviderStatus, ApiError> {
        let status = self.api.ai_status().await?;
        *self.status.lock() = Some(status);
        Ok(status)
    }

    /// Translate `query`, optionally pinning a provider.
    ///
    /// Unpinned calls pick the first configured provider in preference
    /// order; with no provider configured this fails with a
    /// configuration error before any translation request is attempted.
    pub async fn translate(
        &self,
        query: &str,
        provider: Option<AiProvider>,
    ) -> Result<GeneratedFilters, ApiError> {
        if query.trim().is_empty() {
            return Err(ApiError::Validation(
                "natural-language query must not be empty".into(),
            ));
        }

        let provider = match provider {
            Some(pinned) => pinned,
            None => self.select_provider().await?,
        };
        debug!(provider = provider.as_str(), "translating query");
        self.api.generate_filters(query.trim(), provider).await
    }

    /// First configured provider in the fixed preference order
    async fn select_provider(&self) -> Result<AiProvider, ApiError> {
        let cached = *self.status.lock();
        let status = match cached {
            Some(status) => status,
            None => self.capabilities().await?,
        };

        AiProvider::PREFERENCE_ORDER
            .into_iter()
            .find(|p| status.is_configured(*p))
            .ok_or_else(|| {
                ApiError::Configuration("no AI provider is configured".into())
            })
    }
}
