//! Authenticated request pipeline.
//!
//! Builds requests against the configured API base, consults the optional
//! response cache, obtains a valid access token through the token
//! manager's choke point, and retries transparently when the provider
//! signals rate limiting via `Retry-After`.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::auth::oauth::OAuth2Client;
use crate::auth::token_manager::TokenManager;
use crate::config::ClientConfig;
use crate::error::{ApiError, Error};
use crate::store::cache::ResponseCache;

/// HTTP request timeout.
const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Per-call request options.
#[derive(Default)]
pub struct QueryOptions {
    /// Query parameters appended to the request URL.
    pub search_params: Vec<(String, String)>,
    /// JSON body; its presence marks the request as a mutation, which
    /// always bypasses the cache.
    pub body: Option<serde_json::Value>,
    /// Per-call cancellation, composed with the session-level handle.
    pub cancel: Option<CancellationToken>,
}

/// Resource API client.
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl ApiClient {
    /// Create a new API client.
    pub fn new(
        config: &ClientConfig,
        cache: Option<Arc<dyn ResponseCache>>,
    ) -> Result<Self, Error> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()?;

        // A trailing slash keeps `Url::join` from replacing the last path
        // segment of the base.
        let mut base_url = config.endpoints.api_base_url.clone();
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Ok(Self {
            http_client,
            base_url,
            cache,
        })
    }

    /// Perform an authenticated request and parse the JSON response.
    ///
    /// Cancelling either the session token or the per-call token aborts
    /// the request with [`ApiError::Cancelled`].
    pub async fn query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: QueryOptions,
        tokens: &TokenManager,
        oauth: &OAuth2Client,
        session_cancel: &CancellationToken,
    ) -> Result<T, Error> {
        let url = self.build_url(path, &options.search_params)?;

        tokio::select! {
            biased;
            _ = session_cancel.cancelled() => Err(ApiError::Cancelled.into()),
            _ = cancelled_or_pending(options.cancel.as_ref()) => Err(ApiError::Cancelled.into()),
            result = self.execute(method, url, &options, tokens, oauth) => result,
        }
    }

    fn build_url(&self, path: &str, search_params: &[(String, String)]) -> Result<Url, Error> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::RequestFailed(format!("Invalid path {:?}: {}", path, e)))?;

        for (key, value) in search_params {
            url.query_pairs_mut().append_pair(key, value);
        }

        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        options: &QueryOptions,
        tokens: &TokenManager,
        oauth: &OAuth2Client,
    ) -> Result<T, Error> {
        let cacheable = options.body.is_none();

        if cacheable {
            if let Some(cache) = &self.cache {
                if let Some(text) = cache.get(url.as_str()).await {
                    debug!("Cache hit for {}", url);
                    return serde_json::from_str(&text)
                        .map_err(|e| ApiError::ParseFailed(e.to_string()).into());
                }
            }
        }

        loop {
            let access_token = tokens.ensure_valid_access_token(oauth).await?;

            let mut request = self
                .http_client
                .request(method.clone(), url.clone())
                .bearer_auth(&access_token);

            if let Some(body) = &options.body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if !status.is_success() {
                // A Retry-After header marks the failure as transient rate
                // limiting; anything else surfaces immediately.
                match retry_after(&response) {
                    Some(delay) => {
                        warn!(
                            "Rate limited (HTTP {}), retrying in {}s",
                            status.as_u16(),
                            delay.as_secs()
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    None => {
                        return Err(ApiError::RequestFailed(format!(
                            "HTTP {}",
                            status.as_u16()
                        ))
                        .into());
                    }
                }
            }

            let text = response.text().await?;

            if text.is_empty() {
                return Err(ApiError::EmptyResponse.into());
            }

            if cacheable {
                if let Some(cache) = &self.cache {
                    cache.set(url.as_str(), &text).await;
                }
            }

            return serde_json::from_str(&text)
                .map_err(|e| ApiError::ParseFailed(e.to_string()).into());
        }
    }
}

/// Parse the `Retry-After` header as whole seconds.
fn retry_after(response: &reqwest::Response) -> Option<StdDuration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(StdDuration::from_secs)
}

/// Pending forever when no per-call token is supplied.
async fn cancelled_or_pending(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}
