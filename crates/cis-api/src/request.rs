//! Request descriptors and response envelope decoding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// Per-call knobs layered on top of the client configuration.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Overrides the client-wide timeout for this call
    pub timeout: Option<Duration>,
    /// Exactly one attempt, whatever the failure
    pub skip_retry: bool,
    /// Don't attempt a token refresh on 401 (login, refresh itself)
    pub skip_refresh: bool,
    /// Overrides the verb-based idempotency guess
    pub idempotent: Option<bool>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn skip_retry(mut self) -> Self {
        self.skip_retry = true;
        self
    }

    pub fn skip_refresh(mut self) -> Self {
        self.skip_refresh = true;
        self
    }

    /// Mark a state-changing call as safe to repeat (e.g. a PUT of a full record).
    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = Some(idempotent);
        self
    }
}

/// One outgoing call. Lives only for the duration of `ApiClient::request`.
///
/// Shared by every attempt of the call, so per-call state such as the token
/// refresh survives the retry loop.
#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub options: RequestOptions,
    refresh_used: AtomicBool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            method,
            path: path.into(),
            options,
            refresh_used: AtomicBool::new(false),
        }
    }

    /// Claim this call's single token refresh. Returns `false` if it was already spent.
    pub(crate) fn claim_refresh(&self) -> bool {
        !self.refresh_used.swap(true, Ordering::SeqCst)
    }

    /// Safe verbs are idempotent unless the caller says otherwise; POST/PUT/DELETE
    /// are treated as side-effecting unless explicitly marked.
    pub fn is_idempotent(&self) -> bool {
        self.options.idempotent.unwrap_or(matches!(
            self.method,
            Method::GET | Method::HEAD | Method::OPTIONS
        ))
    }
}

/// Status and raw body of a response, before envelope decoding.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    fn parsed_body(&self) -> Option<Value> {
        if self.body.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&self.body).ok()
    }

    /// Decode the `data` portion of a 2xx envelope, or turn a failure status into `ApiError::Http`.
    ///
    /// Bodies without a `data` member are decoded whole; an empty body decodes as `null`.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        if !self.status.is_success() {
            return Err(self.into_error());
        }

        let data = match self.parsed_body() {
            Some(Value::Object(mut envelope)) if envelope.contains_key("data") => {
                envelope.remove("data").unwrap_or(Value::Null)
            }
            Some(value) => value,
            None if self.body.trim().is_empty() => Value::Null,
            None => {
                return Err(ApiError::Decode(format!(
                    "Response body is not JSON: {}",
                    truncate(&self.body, 200)
                )))
            }
        };

        serde_json::from_value(data).map_err(|e| ApiError::Decode(format!("JSON parse error: {}", e)))
    }

    /// Build the error for a non-2xx response, using the envelope `message` when present.
    pub fn into_error(self) -> ApiError {
        let status = self.status.as_u16();
        let body = self.parsed_body();

        let message = body
            .as_ref()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                self.status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", status))
            });

        let body = body.or_else(|| {
            (!self.body.trim().is_empty()).then(|| Value::String(self.body.clone()))
        });

        ApiError::Http {
            status,
            message,
            body,
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Pagination and search parameters shared by list endpoints.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            search: None,
        }
    }

    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    pub(crate) fn apply(&self, mut options: RequestOptions) -> RequestOptions {
        if let Some(page) = self.page {
            options = options.query("page", page);
        }
        if let Some(per_page) = self.per_page {
            options = options.query("per_page", per_page);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            options = options.query("search", search.trim());
        }
        options
    }
}
