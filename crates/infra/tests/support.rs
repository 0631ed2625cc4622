//! Shared fixtures for the infra integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cwpp_common::testing::{SequenceAuthenticator, SystemClock};
use cwpp_domain::{ClientConfig, RateLimitSettings, RetrySettings};
use cwpp_infra::ComputeClient;
use serde_json::{json, Value};
use wiremock::{Request, Respond, ResponseTemplate};

pub type TestAuthenticator = SequenceAuthenticator<SystemClock>;

/// Configuration with millisecond retry delays and a permissive rate limit.
pub fn fast_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::with_base_url(base_url);
    config.retry = RetrySettings {
        max_retries: 2,
        base_delay_ms: 10,
        max_backoff_ms: 50,
        jitter: false,
        ..RetrySettings::default()
    };
    config.rate_limit = RateLimitSettings {
        max_requests_per_second: 1_000,
        max_requests_per_minute: 10_000,
        minute_cooldown_ms: 10,
        second_backoff_ms: 10,
    };
    config
}

/// Build a client logging in through a counting authenticator.
pub fn client_with(config: ClientConfig) -> (ComputeClient, Arc<TestAuthenticator>) {
    let auth = Arc::new(SequenceAuthenticator::new(SystemClock, Duration::from_secs(590)));
    let client = ComputeClient::builder()
        .config(config)
        .authenticator(auth.clone())
        .build()
        .expect("client should build");
    (client, auth)
}

pub fn client(base_url: &str) -> (ComputeClient, Arc<TestAuthenticator>) {
    client_with(fast_config(base_url))
}

/// Records `{"id": n}` for `n` in `range`.
pub fn records(range: std::ops::Range<u64>) -> Vec<Value> {
    range.map(|id| json!({ "id": id })).collect()
}

/// Serves an offset-paginated listing of `total` records.
///
/// Later pages answer faster than earlier ones so concurrent fetches complete
/// out of order; offsets in `failing` always answer 500.
pub struct Listing {
    pub total: u64,
    pub failing: HashSet<u64>,
    pub stagger: Duration,
}

impl Listing {
    pub fn new(total: u64) -> Self {
        Self { total, failing: HashSet::new(), stagger: Duration::from_millis(15) }
    }

    pub fn failing_at(mut self, offset: u64) -> Self {
        self.failing.insert(offset);
        self
    }
}

impl Respond for Listing {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let param = |name: &str| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == name)
                .and_then(|(_, value)| value.parse::<u64>().ok())
        };
        let offset = param("offset").unwrap_or(0);
        let limit = param("limit").unwrap_or(self.total);

        if self.failing.contains(&offset) {
            return ResponseTemplate::new(500).set_body_string("page unavailable");
        }

        let end = (offset + limit).min(self.total);
        let remaining_pages = u32::try_from((self.total - end) / limit.max(1)).unwrap_or(0);
        ResponseTemplate::new(200)
            .insert_header("Total-Count", self.total.to_string().as_str())
            .set_body_json(Value::Array(records(offset.min(end)..end)))
            .set_delay(self.stagger * remaining_pages)
    }
}
