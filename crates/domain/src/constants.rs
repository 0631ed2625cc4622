//! Wire-level constants for the console API conventions.

/// Response header carrying the total record count of a paginated listing.
pub const TOTAL_COUNT_HEADER: &str = "Total-Count";

/// Opaque binary payloads (forensic bundles, log archives).
pub const CONTENT_TYPE_GZIP: &str = "application/x-gzip";

/// Tabular text payloads (CSV downloads).
pub const CONTENT_TYPE_CSV: &str = "text/csv";

/// Query parameter carrying the page size.
pub const LIMIT_PARAM: &str = "limit";
/// Query parameter carrying the index of a page's first record.
pub const OFFSET_PARAM: &str = "offset";

/// Login endpoint for username/password authentication.
pub const AUTHENTICATE_PATH: &str = "api/v1/authenticate";

/// Console used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "https://localhost:8083";
/// `User-Agent` sent unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("cwpp-client/", env!("CARGO_PKG_VERSION"));
/// Whole-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Idle connections kept per host.
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 20;
/// Records per page.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;
/// Workers for concurrent fetches.
pub const DEFAULT_WORKERS: usize = 4;
/// Lifetime assumed for a freshly issued token.
pub const DEFAULT_TOKEN_VALID_FOR_SECS: u64 = 590;

/// Retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Delay before the first retry.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
/// Cap on the exponential backoff.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 60_000;
/// Statuses retried regardless of their classified kind.
pub const DEFAULT_RETRY_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Consecutive failures that open a circuit.
pub const DEFAULT_FAILURE_THRESHOLD: u64 = 3;
/// Half-open successes that close it.
pub const DEFAULT_SUCCESS_THRESHOLD: u64 = 1;
/// Seconds a circuit stays open before probing.
pub const DEFAULT_BREAKER_TIMEOUT_SECS: u64 = 30;
/// Probes admitted while half-open.
pub const DEFAULT_HALF_OPEN_MAX_CALLS: u64 = 1;

/// Per-endpoint requests per second.
pub const DEFAULT_MAX_REQUESTS_PER_SECOND: usize = 2;
/// Per-endpoint requests per minute.
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: usize = 20;
/// Reference cooldown once the per-minute cap is hit.
pub const DEFAULT_MINUTE_COOLDOWN_MS: u64 = 5_000;
/// Sleep between per-second re-checks.
pub const DEFAULT_SECOND_BACKOFF_MS: u64 = 500;
