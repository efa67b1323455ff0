//! The innermost stage: one HTTP exchange over reqwest.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cis_auth::CredentialProvider;
use reqwest::header;
use url::Url;

use crate::error::ApiError;
use crate::request::{ApiRequest, ApiResponse};

/// Something that can turn a request into a response.
///
/// The client is a chain of these: retry → token refresh → HTTP. Each stage
/// only sees the request descriptor and the inner stage's outcome.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        (**self).send(request).await
    }
}

/// Sends a single attempt. Any status comes back as `Ok`; only transport
/// failures are errors.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    default_timeout: Duration,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        default_timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cis-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: base_url.into(),
            default_timeout,
            credentials,
        }
    }

    /// Resolve a request path against the base address.
    pub fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| ApiError::InvalidRequest(format!("{} ({})", joined, e)))
    }

    fn classify(error: reqwest::Error, timeout: Duration) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(timeout)
        } else if error.is_builder() {
            ApiError::InvalidRequest(error.to_string())
        } else {
            ApiError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request.path)?;
        let options = &request.options;
        let timeout = options.timeout.unwrap_or(self.default_timeout);

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .timeout(timeout)
            .header(header::ACCEPT, "application/json");

        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match self.credentials.get() {
            Some(token) => builder = builder.bearer_auth(token),
            None => tracing::debug!("No auth token stored, sending {} unauthenticated", request.path),
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "API request failed: {}",
                    e
                );
                return Err(Self::classify(e, timeout));
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| Self::classify(e, timeout))?;

        tracing::info!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "API response"
        );

        Ok(ApiResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use cis_auth::MemoryCredentials;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(base, Duration::from_secs(5), Arc::new(MemoryCredentials::new()))
    }

    #[test]
    fn test_url_join_handles_slashes() {
        let t = transport("http://localhost:8000/api/");
        assert_eq!(
            t.url_for("/farmers").unwrap().as_str(),
            "http://localhost:8000/api/farmers"
        );

        let t = transport("http://localhost:8000/api");
        assert_eq!(
            t.url_for("farmers/3").unwrap().as_str(),
            "http://localhost:8000/api/farmers/3"
        );
    }

    #[test]
    fn test_invalid_base_is_reported_per_request() {
        let t = transport("not a url");
        assert!(matches!(t.url_for("/farmers"), Err(ApiError::InvalidRequest(_))));
    }
}
