//! Request and response shapes exchanged with [`ComputeClient`](super::ComputeClient)

use cwpp_domain::{FetchMode, ResponseBody};
use reqwest::Method;
use serde_json::Value;

use super::errors::ApiError;

/// One logical endpoint call, possibly spanning many pages
///
/// ```
/// use cwpp_infra::ApiRequest;
///
/// let request = ApiRequest::get("api/v1/images?collections=prod").concurrent(4).limit(50).force(true);
/// assert_eq!(request.endpoint_key(), "/api/v1/images");
/// assert_eq!(request.limit, Some(50));
/// assert!(request.force);
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the console base URL, e.g. `api/v1/images`
    pub path: String,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// How the call is paginated.
    pub mode: FetchMode,
    /// Page size; the client default applies when unset
    pub limit: Option<u64>,
    /// Return partial results plus failed offsets instead of failing
    pub force: bool,
}

impl ApiRequest {
    /// Single-request call with no query, body or headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            mode: FetchMode::Single,
            limit: None,
            force: false,
        }
    }

    /// `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT` request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE` request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Send `body` as JSON.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the fetch mode.
    pub fn mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Fetch pages one after another.
    pub fn sequential(self) -> Self {
        self.mode(FetchMode::Sequential)
    }

    /// Fetch remaining pages with `workers` tasks (0 uses the client default).
    pub fn concurrent(self, workers: usize) -> Self {
        self.mode(FetchMode::Concurrent { workers })
    }

    /// Page size for paginated calls.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Return partial results instead of failing on a page error.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Key under which breaker and rate-limit state is kept: the path with
    /// any query string removed and a single leading slash.
    pub fn endpoint_key(&self) -> String {
        let path = self.path.split(['?', '#']).next().unwrap_or_default();
        format!("/{}", path.trim_matches('/'))
    }
}

/// Decoded outcome of one HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    /// Decoded body.
    pub body: ResponseBody,
    /// Parsed `Total-Count` header, when present
    pub total_count: Option<u64>,
}

/// A page that could not be fetched in a best-effort call
#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    /// Offset of the failed page.
    pub offset: u64,
    /// Why it failed.
    pub error: ApiError,
}

/// Records of a paginated listing in offset order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PagedRecords {
    /// Records in offset order.
    pub records: Vec<Value>,
    /// Latest `Total-Count` reported by the server.
    pub total_count: Option<u64>,
    /// Pages that failed in a best-effort call.
    pub failed_pages: Vec<PageFailure>,
}

impl PagedRecords {
    /// True when no page failed.
    pub fn is_complete(&self) -> bool {
        self.failed_pages.is_empty()
    }

    /// Offsets of the failed pages.
    pub fn failed_offsets(&self) -> Vec<u64> {
        self.failed_pages.iter().map(|failure| failure.offset).collect()
    }
}

/// Result of [`ComputeClient::execute`](super::ComputeClient::execute)
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// The response body, unmodified
    Body(ResponseBody),
    /// Combined records of a paginated listing
    Records(PagedRecords),
}

impl ApiResponse {
    /// Flatten into records regardless of shape.
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Self::Body(body) => body.into_records(),
            Self::Records(paged) => paged.records,
        }
    }

    /// The paginated records, if this is a paginated result.
    pub fn as_records(&self) -> Option<&PagedRecords> {
        match self {
            Self::Records(paged) => Some(paged),
            Self::Body(_) => None,
        }
    }
}
