//! Single-request executor
//!
//! Drives one logical request through the full resilience stack:
//!
//! ```text
//! breaker admission ─► per attempt: breaker check ─► rate limit ─► credential
//!                                   ─► send ─► classify ─► retry / refresh
//! ```
//!
//! The breaker sees exactly one outcome per logical request; retries and the
//! forced credential refresh after a 401 happen inside that outcome.

use std::sync::Arc;

use cwpp_common::auth::{Credential, TokenManager};
use cwpp_common::error::ErrorKind;
use cwpp_common::resilience::{
    saturating_millis, CircuitBreakerRegistry, CircuitState, RetryConfig, RetryDecision,
    SlidingWindowLimiter,
};
use cwpp_domain::constants::{
    CONTENT_TYPE_CSV, CONTENT_TYPE_GZIP, LIMIT_PARAM, OFFSET_PARAM, TOTAL_COUNT_HEADER,
};
use cwpp_domain::{AuthHeaderStyle, ClientConfig, PageRequest, ResponseBody};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};
use url::Url;

use super::classify::{classify, transport_failure};
use super::errors::ApiError;
use super::request::{ApiRequest, Fetched};
use crate::config::runtime::{circuit_breaker_config, rate_limit_config, retry_config};
use crate::http::HttpClient;

/// A failed attempt before it is turned into a terminal [`ApiError`]
#[derive(Debug)]
struct AttemptFailure {
    kind: ErrorKind,
    status: Option<u16>,
    message: String,
}

impl AttemptFailure {
    fn from_status(status: StatusCode, message: String) -> Self {
        let code = status.as_u16();
        Self { kind: classify(Some(code), None), status: Some(code), message }
    }

    fn from_transport(error: &reqwest::Error) -> Self {
        let status = error.status().map(|status| status.as_u16());
        Self {
            kind: classify(status, Some(transport_failure(error))),
            status,
            message: error.to_string(),
        }
    }

    fn parse(status: StatusCode, message: String) -> Self {
        Self { kind: ErrorKind::ParseError, status: Some(status.as_u16()), message }
    }
}

/// Executes single HTTP exchanges with retry, throttling, circuit breaking
/// and credential refresh.
#[derive(Debug)]
pub struct RequestExecutor {
    http: HttpClient,
    tokens: Arc<TokenManager>,
    breaker: CircuitBreakerRegistry,
    limiter: SlidingWindowLimiter,
    retry: RetryConfig,
    auth_header: AuthHeaderStyle,
    base_url: String,
}

impl RequestExecutor {
    /// Build an executor from `config`, sharing `tokens` with the caller.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if any resilience setting is invalid
    pub fn new(
        config: &ClientConfig,
        http: HttpClient,
        tokens: Arc<TokenManager>,
    ) -> Result<Self, ApiError> {
        let invalid = |err: cwpp_common::resilience::ConfigError| ApiError::Config(err.to_string());

        Ok(Self {
            http,
            tokens,
            breaker: CircuitBreakerRegistry::new(
                circuit_breaker_config(&config.circuit_breaker).map_err(invalid)?,
            )
            .map_err(invalid)?,
            limiter: SlidingWindowLimiter::new(rate_limit_config(&config.rate_limit).map_err(invalid)?)
                .map_err(invalid)?,
            retry: retry_config(&config.retry).map_err(invalid)?,
            auth_header: config.auth_header.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Per-endpoint circuit breakers.
    pub fn breaker(&self) -> &CircuitBreakerRegistry {
        &self.breaker
    }

    /// Per-endpoint rate limiter.
    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    /// Current breaker state for `endpoint`.
    pub fn circuit_state(&self, endpoint: &str) -> CircuitState {
        self.breaker.state(endpoint)
    }

    /// Full URL for `request`, with pagination parameters when `page` is set.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the joined URL does not parse
    pub fn build_url(&self, request: &ApiRequest, page: Option<PageRequest>) -> Result<Url, ApiError> {
        let joined = format!("{}/{}", self.base_url, request.path.trim_start_matches('/'));
        let mut url = Url::parse(&joined)
            .map_err(|err| ApiError::Config(format!("invalid request URL {joined}: {err}")))?;

        if !request.query.is_empty() || page.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
            if let Some(page) = page {
                pairs.append_pair(LIMIT_PARAM, &page.limit.to_string());
                pairs.append_pair(OFFSET_PARAM, &page.offset.to_string());
            }
        }
        Ok(url)
    }

    /// Execute one HTTP exchange for `request`.
    ///
    /// # Errors
    /// - `ApiError::CircuitOpen` when the endpoint's breaker rejects the call
    /// - `ApiError::Authentication` / `ApiError::Reauthentication` when no
    ///   usable credential can be obtained
    /// - `ApiError::Request` for non-retryable failures or exhausted retries
    #[instrument(
        skip(self, request),
        fields(method = %request.method, endpoint = %request.endpoint_key(), offset = page.map(|p| p.offset))
    )]
    pub async fn execute(
        &self,
        request: &ApiRequest,
        page: Option<PageRequest>,
    ) -> Result<Fetched, ApiError> {
        let endpoint = request.endpoint_key();
        let url = self.build_url(request, page)?;

        if !self.breaker.try_acquire(&endpoint) {
            warn!(url = %url, "circuit open, request not sent");
            return Err(ApiError::CircuitOpen { endpoint, url: url.to_string() });
        }

        let result = self.run_attempts(request, &endpoint, &url).await;
        match &result {
            Ok(_) => self.breaker.record_success(&endpoint),
            Err(ApiError::CircuitOpen { .. }) => {}
            Err(_) => self.breaker.record_failure(&endpoint),
        }
        result
    }

    async fn run_attempts(
        &self,
        request: &ApiRequest,
        endpoint: &str,
        url: &Url,
    ) -> Result<Fetched, ApiError> {
        let mut attempt: u32 = 0;
        let mut sent: u32 = 0;
        let mut refreshed = false;

        loop {
            if !self.breaker.is_available(endpoint) {
                warn!(url = %url, attempt, "circuit opened mid-retry, giving up");
                return Err(ApiError::CircuitOpen {
                    endpoint: endpoint.to_string(),
                    url: url.to_string(),
                });
            }

            self.limiter.acquire(endpoint).await;

            let credential = self.tokens.ensure_valid().await.map_err(|source| {
                ApiError::Authentication {
                    endpoint: endpoint.to_string(),
                    url: url.to_string(),
                    source,
                }
            })?;

            sent += 1;
            let failure = match self.send_once(request, url, &credential).await {
                Ok(fetched) => {
                    debug!(attempts = sent, total_count = fetched.total_count, "request succeeded");
                    return Ok(fetched);
                }
                Err(failure) => failure,
            };

            if failure.status == Some(StatusCode::UNAUTHORIZED.as_u16()) && !refreshed {
                refreshed = true;
                warn!(url = %url, "token rejected, re-authenticating");
                self.tokens.force_refresh(&credential).await.map_err(|source| {
                    ApiError::Reauthentication {
                        endpoint: endpoint.to_string(),
                        url: url.to_string(),
                        source,
                    }
                })?;
                continue;
            }

            match self.retry.should_retry(failure.kind, failure.status, attempt) {
                RetryDecision::Retry(delay) => {
                    warn!(
                        url = %url,
                        kind = %failure.kind,
                        status = failure.status,
                        retry = attempt + 1,
                        max_retries = self.retry.max_retries,
                        delay_ms = saturating_millis(delay),
                        error = %failure.message,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::Stop => {
                    warn!(
                        url = %url,
                        kind = %failure.kind,
                        status = failure.status,
                        attempts = sent,
                        error = %failure.message,
                        "request failed"
                    );
                    return Err(ApiError::Request {
                        kind: failure.kind,
                        endpoint: endpoint.to_string(),
                        url: url.to_string(),
                        status: failure.status,
                        attempts: sent,
                        message: failure.message,
                    });
                }
            }
        }
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
        url: &Url,
        credential: &Credential,
    ) -> Result<Fetched, AttemptFailure> {
        let mut builder = self.http.request(request.method.clone(), url.clone()).header(
            self.auth_header.header_name(),
            self.auth_header.header_value(credential.token()),
        );
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response =
            self.http.send(builder).await.map_err(|err| AttemptFailure::from_transport(&err))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AttemptFailure::from_status(status, message));
        }

        let total_count = total_count(response.headers());
        let media_type = media_type(response.headers());
        let bytes = response.bytes().await.map_err(|err| AttemptFailure::from_transport(&err))?;

        let body = decode_body(media_type.as_deref(), &bytes)
            .map_err(|message| AttemptFailure::parse(status, message))?;
        Ok(Fetched { body, total_count })
    }
}

/// Parse the `Total-Count` header; unparseable values count as absent.
fn total_count(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(TOTAL_COUNT_HEADER)?.to_str().ok()?;
    match raw.trim().parse() {
        Ok(total) => Some(total),
        Err(_) => {
            debug!(value = raw, "ignoring malformed Total-Count header");
            None
        }
    }
}

/// Media type of the response, lowercased and without parameters.
fn media_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    value.split(';').next().map(|media| media.trim().to_ascii_lowercase())
}

fn decode_body(media_type: Option<&str>, bytes: &[u8]) -> Result<ResponseBody, String> {
    if bytes.is_empty() {
        return Ok(ResponseBody::Empty);
    }
    match media_type {
        Some(CONTENT_TYPE_GZIP) => Ok(ResponseBody::Binary(bytes.to_vec())),
        Some(CONTENT_TYPE_CSV) => String::from_utf8(bytes.to_vec())
            .map(ResponseBody::Text)
            .map_err(|err| format!("CSV body is not valid UTF-8: {err}")),
        _ => serde_json::from_slice(bytes)
            .map(ResponseBody::Json)
            .map_err(|err| format!("malformed JSON body: {err}")),
    }
}
