//! Configuration loader
//!
//! Loads the client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. If `CWPP_BASE_URL` is set, build the configuration from the environment
//! 2. Otherwise probe the working directory for a config file
//! 3. Fall back to defaults when nothing is found
//!
//! ## Environment Variables
//! - `CWPP_BASE_URL`: console address (required for the environment path)
//! - `CWPP_TIMEOUT_SECS`: per-request timeout
//! - `CWPP_PAGE_LIMIT`: page size for paginated listings
//! - `CWPP_WORKERS`: default concurrent worker count
//! - `CWPP_MAX_RETRIES`: retries after the initial attempt
//! - `CWPP_RATE_PER_SECOND` / `CWPP_RATE_PER_MINUTE`: per-endpoint caps
//! - `CWPP_VERIFY_TLS`: set to `false` to accept self-signed certificates
//! - `CWPP_AUTH_HEADER`: custom header carrying the raw token
//!
//! ## File Locations
//! `./cwpp.toml`, `./cwpp.json`, `./config.toml`, `./config.json`, in that
//! order. The format follows the file extension.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use cwpp_domain::{AuthHeaderStyle, ClientConfig, CwppError, Result};

const CANDIDATE_FILES: [&str; 4] = ["cwpp.toml", "cwpp.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `CwppError::Config` if a source exists but cannot be parsed or the
/// resulting configuration is invalid
pub fn load() -> Result<ClientConfig> {
    if std::env::var_os("CWPP_BASE_URL").is_some() {
        let config = load_from_env()?;
        tracing::info!(base_url = %config.base_url, "configuration loaded from environment");
        return Ok(config);
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::debug!("no configuration source found, using defaults");
            Ok(ClientConfig::default())
        }
    }
}

/// Load configuration from environment variables.
///
/// Only `CWPP_BASE_URL` is required; every other field keeps its default
/// unless its variable is set.
///
/// # Errors
/// Returns `CwppError::Config` if `CWPP_BASE_URL` is missing or a variable
/// has an invalid value
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::with_base_url(env_var("CWPP_BASE_URL")?);

    if let Some(timeout) = env_parse("CWPP_TIMEOUT_SECS")? {
        config.timeout_secs = timeout;
    }
    if let Some(limit) = env_parse("CWPP_PAGE_LIMIT")? {
        config.page_limit = limit;
    }
    if let Some(workers) = env_parse("CWPP_WORKERS")? {
        config.default_workers = workers;
    }
    if let Some(retries) = env_parse("CWPP_MAX_RETRIES")? {
        config.retry.max_retries = retries;
    }
    if let Some(per_second) = env_parse("CWPP_RATE_PER_SECOND")? {
        config.rate_limit.max_requests_per_second = per_second;
    }
    if let Some(per_minute) = env_parse("CWPP_RATE_PER_MINUTE")? {
        config.rate_limit.max_requests_per_minute = per_minute;
    }
    config.accept_invalid_certs = !env_bool("CWPP_VERIFY_TLS", true);
    if let Ok(name) = std::env::var("CWPP_AUTH_HEADER") {
        config.auth_header = AuthHeaderStyle::Custom { name };
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `CwppError::Config` if the file is missing, unreadable, malformed
/// or describes an invalid configuration
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(path) => {
            if !path.exists() {
                return Err(CwppError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path
        }
        None => probe_config_paths().ok_or_else(|| {
            CwppError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CwppError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration text, choosing the format by file extension.
///
/// # Errors
/// Returns `CwppError::Config` for unsupported extensions or parse failures
pub fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CwppError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CwppError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CwppError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the working directory, if any.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    probe_in(&cwd)
}

fn probe_in(dir: &Path) -> Option<PathBuf> {
    CANDIDATE_FILES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| CwppError::Config(format!("Missing required environment variable: {key}")))
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CwppError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
