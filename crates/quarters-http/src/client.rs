//! HTTP client implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{
    config::HttpConfig,
    error::{log_failure, ApiError, BuildError, Result},
    middleware::RetryPolicy,
    refresh::{run_refresh, RefreshFailed, RefreshGate},
    token::TokenStore,
};

/// Mockable transport trait
///
/// The pipeline resolves with the parsed JSON body, so callers (and test
/// doubles) never deal with the transport envelope.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Execute a request through the full pipeline
    async fn execute(&self, request: ApiRequest) -> Result<Value>;
}

/// Description of an outbound API call.
///
/// Immutable once built; retry and replay bookkeeping lives in the send
/// loop, not on the request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the configured base URL, or an absolute URL
    pub path: String,
    /// JSON body, if any; stored as a value so retries can resend it
    pub body: Option<Value>,
    /// Extra headers merged into the request
    pub headers: HeaderMap,
    /// Per-request timeout; falls back to the configured default
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Create a request for the given method and path
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Attach a JSON body
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|err| ApiError::invalid_request(format!("Failed to encode request body: {err}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Add a header
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Override the timeout for this request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Production HTTP client for the Quarters REST API.
///
/// Wraps a `reqwest::Client` with bearer-token injection, transient-error
/// retry, single-flight token refresh with one replay, and error
/// normalization. Every failure surfaces as an [`ApiError`].
pub struct HttpClient {
    inner: reqwest::Client,
    config: HttpConfig,
    tokens: TokenStore,
    refresh: RefreshGate,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Create a new client, validating the configuration
    pub fn new(config: HttpConfig) -> std::result::Result<Self, BuildError> {
        Url::parse(&config.base_url)
            .map_err(|err| BuildError::InvalidBaseUrl(err.to_string()))?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .cookie_store(config.with_credentials);

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|err| BuildError::InvalidProxy(err.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let inner = builder
            .build()
            .map_err(|err| BuildError::Build(err.to_string()))?;

        let retry = RetryPolicy::new(config.max_transient_retries, config.retry_base_delay);

        Ok(Self {
            inner,
            tokens: TokenStore::new(),
            refresh: RefreshGate::new(),
            retry,
            config,
        })
    }

    /// Get underlying reqwest client (for advanced usage)
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Get configuration
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Access-token store; login and logout flows drive `set`/`clear`
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Execute a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.execute(ApiRequest::new(Method::GET, path)).await?;
        decode_body(value)
    }

    /// Execute a POST request with a JSON body
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::new(Method::POST, path).with_json(body)?;
        decode_body(self.execute(request).await?)
    }

    /// Execute a PUT request with a JSON body
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::new(Method::PUT, path).with_json(body)?;
        decode_body(self.execute(request).await?)
    }

    /// Execute a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.execute(ApiRequest::new(Method::DELETE, path)).await?;
        decode_body(value)
    }

    fn resolve_url(&self, path: &str) -> Result<Url> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.config.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        Url::parse(&raw)
            .map_err(|err| ApiError::invalid_request(format!("Invalid request URL `{raw}`: {err}")))
    }

    /// One attempt: build, send, classify.
    async fn try_send(&self, request: &ApiRequest, url: &Url) -> Result<Value> {
        let mut builder = self
            .inner
            .request(request.method.clone(), url.clone())
            .timeout(request.timeout.unwrap_or(self.config.timeout))
            .headers(request.headers.clone());

        // Resolved at send time so a replay picks up a refreshed token.
        if let Some(token) = self.tokens.get() {
            builder = builder.bearer_auth(token);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ApiError::from_transport)?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await.map_err(ApiError::from_transport)?;
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_slice(&bytes).map_err(|err| ApiError::decode(status, err))
        } else {
            let payload = match response.bytes().await {
                Ok(bytes) if !bytes.is_empty() => serde_json::from_slice::<Value>(&bytes).ok(),
                _ => None,
            };
            Err(ApiError::from_response(status, payload))
        }
    }

    /// The pipeline: classify each failure, retry transient ones within
    /// the budget, refresh-and-replay once on 401, surface everything
    /// else as-is.
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let url = self.resolve_url(&request.path)?;
        debug!(method = %request.method, %url, "dispatching request");

        let mut transient_retries = 0u32;
        let mut replayed_after_refresh = false;

        loop {
            let err = match self.try_send(&request, &url).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            log_failure(&err);

            if self.retry.should_retry(&err, transient_retries) {
                transient_retries += 1;
                let delay = self.retry.delay_for(transient_retries);
                debug!(
                    attempt = transient_retries,
                    delay_ms = delay.as_millis() as u64,
                    "retrying transient failure"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if err.is_unauthorized() && !replayed_after_refresh {
                replayed_after_refresh = true;
                let http = self.inner.clone();
                let refresh_url = self.config.refresh_url();
                let tokens = self.tokens.clone();
                let refreshed = self
                    .refresh
                    .join_or_start(move || run_refresh(http, refresh_url, tokens).boxed())
                    .await;
                match refreshed {
                    Ok(_) => {
                        debug!("replaying request with refreshed token");
                        continue;
                    }
                    // Callers see the original 401, not the refresh failure.
                    Err(RefreshFailed) => return Err(err),
                }
            }

            return Err(err);
        }
    }
}

#[async_trait]
impl ApiTransport for HttpClient {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        self.send(request).await
    }
}

/// Create a shared client (Arc-wrapped for cloning)
pub fn shared_client(
    config: HttpConfig,
) -> std::result::Result<Arc<dyn ApiTransport>, BuildError> {
    Ok(Arc::new(HttpClient::new(config)?))
}

fn decode_body<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|err| ApiError::invalid_request(format!("Failed to decode response body: {err}")))
}
