//! Compute API client
//!
//! Public entry point of the request-execution core. One client owns one
//! token manager, one breaker registry and one rate limiter, shared by every
//! call and every pagination worker it spawns.

use std::sync::Arc;

use cwpp_common::auth::{Authenticator, TokenManager};
use cwpp_common::resilience::CircuitState;
use cwpp_domain::ClientConfig;
use tracing::{info, instrument};

use super::auth::PasswordAuthenticator;
use super::errors::ApiError;
use super::executor::RequestExecutor;
use super::pagination::Paginator;
use super::request::{ApiRequest, ApiResponse};
use crate::http::HttpClient;

/// Client for the compute (CWPP) console API
#[derive(Debug, Clone)]
pub struct ComputeClient {
    config: Arc<ClientConfig>,
    executor: Arc<RequestExecutor>,
    tokens: Arc<TokenManager>,
    paginator: Paginator,
}

impl ComputeClient {
    /// Start building a client.
    pub fn builder() -> ComputeClientBuilder {
        ComputeClientBuilder::default()
    }

    /// Execute `request` in its fetch mode.
    ///
    /// # Errors
    /// See [`ApiError`]; paginated calls with `force` set only fail when the
    /// first page fails
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.paginator.fetch(request).await
    }

    /// Convenience wrapper for a single `GET`.
    ///
    /// # Errors
    /// See [`ComputeClient::execute`]
    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.execute(ApiRequest::get(path)).await
    }

    /// Breaker state of `endpoint` (a path such as `/api/v1/images`).
    pub fn circuit_state(&self, endpoint: &str) -> CircuitState {
        self.executor.circuit_state(&ApiRequest::get(endpoint).endpoint_key())
    }

    /// Configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Credential cache shared by every request.
    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Executor behind the paginator.
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }
}

/// Builder for [`ComputeClient`]
#[derive(Default)]
pub struct ComputeClientBuilder {
    config: Option<ClientConfig>,
    authenticator: Option<Arc<dyn Authenticator>>,
    credentials: Option<(String, String)>,
}

impl ComputeClientBuilder {
    /// Use `config` instead of the loaded configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use the default configuration pointed at `base_url`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut config = self.config.take().unwrap_or_default();
        config.base_url = base_url.into();
        self.config = Some(config);
        self
    }

    /// Supply a custom login strategy.
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Log in with username and password against the console.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Build the client.
    ///
    /// Without an explicit authenticator or credentials, `CWPP_USERNAME` and
    /// `CWPP_PASSWORD` are read from the environment.
    ///
    /// # Errors
    /// Returns `ApiError::Config` for invalid configuration or missing
    /// credentials
    pub fn build(self) -> Result<ComputeClient, ApiError> {
        let config = self.config.unwrap_or_default();
        config.validate().map_err(|err| ApiError::Config(err.to_string()))?;

        let http = HttpClient::from_config(&config).map_err(|err| ApiError::Config(err.to_string()))?;

        let authenticator: Arc<dyn Authenticator> = match (self.authenticator, self.credentials) {
            (Some(authenticator), _) => authenticator,
            (None, Some((username, password))) => {
                Arc::new(PasswordAuthenticator::new(http.clone(), &config, username, password))
            }
            (None, None) => Arc::new(
                PasswordAuthenticator::from_env(http.clone(), &config)
                    .map_err(|err| ApiError::Config(err.to_string()))?,
            ),
        };

        let tokens = Arc::new(TokenManager::new(authenticator));
        let executor = Arc::new(RequestExecutor::new(&config, http, Arc::clone(&tokens))?);
        let paginator =
            Paginator::new(Arc::clone(&executor), config.page_limit, config.default_workers);

        info!(base_url = %config.base_url, page_limit = config.page_limit, "compute client ready");

        Ok(ComputeClient { config: Arc::new(config), executor, tokens, paginator })
    }
}

#[cfg(test)]
mod tests {
    use cwpp_common::testing::StaticAuthenticator;

    use super::*;

    #[test]
    fn rejects_invalid_config() {
        let result = ComputeClient::builder()
            .base_url("console.local")
            .authenticator(Arc::new(StaticAuthenticator::new("t")))
            .build();
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[test]
    fn builds_with_explicit_credentials() {
        let client = ComputeClient::builder()
            .base_url("https://console.local:8083")
            .credentials("admin", "hunter2")
            .build()
            .unwrap();

        assert_eq!(client.config().base_url, "https://console.local:8083");
        assert_eq!(client.circuit_state("api/v1/images"), CircuitState::Closed);
        assert_eq!(client.token_manager().login_count(), 0);
    }
}
