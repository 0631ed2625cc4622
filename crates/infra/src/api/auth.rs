//! Username/password login against the console's authenticate endpoint

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cwpp_common::auth::{AuthError, Authenticator, Credential};
use cwpp_domain::constants::AUTHENTICATE_PATH;
use cwpp_domain::ClientConfig;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::http::HttpClient;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// Authenticator posting `{"username", "password"}` and reading `{"token"}`
#[derive(Clone)]
pub struct PasswordAuthenticator {
    http: HttpClient,
    url: String,
    username: String,
    password: String,
    valid_for: Duration,
}

impl fmt::Debug for PasswordAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordAuthenticator")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl PasswordAuthenticator {
    /// Create an authenticator for the console at `config.base_url`.
    pub fn new(
        http: HttpClient,
        config: &ClientConfig,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: config.endpoint_url(AUTHENTICATE_PATH),
            username: username.into(),
            password: password.into(),
            valid_for: Duration::from_secs(config.token_valid_for_secs),
        }
    }

    /// Read `CWPP_USERNAME` / `CWPP_PASSWORD` from the environment.
    ///
    /// # Errors
    /// Returns `AuthError::MissingCredentials` if either variable is unset
    pub fn from_env(http: HttpClient, config: &ClientConfig) -> Result<Self, AuthError> {
        let read = |name: &str| {
            std::env::var(name)
                .map_err(|_| AuthError::MissingCredentials(format!("{name} is not set")))
        };
        Ok(Self::new(http, config, read("CWPP_USERNAME")?, read("CWPP_PASSWORD")?))
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    #[instrument(skip(self), fields(url = %self.url, username = %self.username))]
    async fn authenticate(&self) -> Result<Credential, AuthError> {
        let body = LoginRequest { username: &self.username, password: &self.password };
        let request = self.http.request(Method::POST, &self.url).json(&body);

        let response = self
            .http
            .send(request)
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected { status: status.as_u16(), message });
        }

        let issued_at = Instant::now();
        let login: LoginResponse = response
            .json()
            .await
            .map_err(|err| AuthError::InvalidResponse(err.to_string()))?;
        if login.token.is_empty() {
            return Err(AuthError::InvalidResponse("empty token".to_string()));
        }

        debug!("login succeeded");
        Ok(Credential::new(login.token, issued_at, self.valid_for))
    }
}
