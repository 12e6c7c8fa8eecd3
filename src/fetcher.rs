use std::fmt;

use reqwest::{Response, StatusCode};

use crate::{
    retry::{retry_with_timeout, Attempt},
    FetchError, RequestOptions, Result, RetryConfig, RetryOverrides,
};

/// Issues a request with [`RetryingFetcher::default`] and the given overrides.
///
/// Convenience for callers that do not keep a fetcher around.
pub async fn fetch_with_retry(
    url: &str,
    options: RequestOptions,
    overrides: RetryOverrides,
) -> Result<Response> {
    RetryingFetcher::new()
        .fetch_with(url, options, overrides)
        .await
}

#[derive(Clone)]
/// HTTP fetcher with per-attempt timeouts and exponential backoff.
///
/// The response of the first attempt that completes in time is returned
/// unchanged, whatever its status. If every attempt fails, the error of
/// the last one is returned.
pub struct RetryingFetcher {
    http: reqwest::Client,
    config: RetryConfig,
    retry_server_errors: bool,
}

impl fmt::Debug for RetryingFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingFetcher")
            .field("config", &self.config)
            .field("retry_server_errors", &self.retry_server_errors)
            .finish()
    }
}

impl Default for RetryingFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryingFetcher {
    /// Creates a fetcher with a fresh `reqwest` client and default config.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Creates a fetcher on top of an existing `reqwest` client.
    ///
    /// Client-level settings (proxies, TLS, default headers) apply to every
    /// attempt. A client-level timeout, if set, races the per-attempt one.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            config: RetryConfig::default(),
            retry_server_errors: false,
        }
    }

    /// Replaces the base retry config used when a call has no overrides.
    pub fn with_config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Treats `429` and `500/502/503/504` responses as failed attempts.
    ///
    /// Off by default: any status is a successful transport outcome. When
    /// enabled and retries run out, the last status is returned as
    /// [`FetchError::Http`].
    pub fn retry_on_server_errors(mut self, enabled: bool) -> Self {
        self.retry_server_errors = enabled;
        self
    }

    /// Base retry config applied when a call has no overrides.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Sends `options` to `url` using the base retry config.
    pub async fn fetch(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.fetch_with(url, options, RetryOverrides::default())
            .await
    }

    /// Sends `options` to `url`, with `overrides` merged over the base
    /// config for this call only.
    pub async fn fetch_with(
        &self,
        url: &str,
        options: RequestOptions,
        overrides: RetryOverrides,
    ) -> Result<Response> {
        let config = overrides.resolve(&self.config)?;
        let request = options.build(&self.http, url)?;
        self.execute(request, &config).await
    }

    /// Sends a pre-built request under `config`.
    ///
    /// The request is cloned for every attempt, so streaming bodies are
    /// rejected with [`FetchError::InvalidRequest`] before anything is sent.
    pub async fn execute(&self, request: reqwest::Request, config: &RetryConfig) -> Result<Response> {
        config.validate()?;
        if request.try_clone().is_none() {
            return Err(FetchError::InvalidRequest(
                "request body cannot be replayed across attempts".to_owned(),
            ));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            max_retries = config.max_retries,
            timeout_ms = config.timeout_ms,
            "sending request"
        );

        let http = &self.http;
        let template = &request;
        let result = retry_with_timeout(config, |attempt| {
            let request = template.try_clone();
            async move {
                let request = request.ok_or_else(|| {
                    FetchError::InvalidRequest(
                        "request body cannot be replayed across attempts".to_owned(),
                    )
                })?;
                let response = http.execute(request).await.map_err(FetchError::Transport)?;
                self.check_status(response, attempt).await
            }
        })
        .await;

        result.map_err(FetchError::from)
    }

    async fn check_status(&self, response: Response, attempt: Attempt) -> Result<Response> {
        let status = response.status();
        if !self.retry_server_errors || !should_retry_status(status) {
            return Ok(response);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(attempt = attempt.index, %status, "retryable status");
        #[cfg(not(feature = "tracing"))]
        let _ = attempt;

        let body = response.text().await.map_err(FetchError::Transport)?;
        Err(FetchError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

fn should_retry_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}
