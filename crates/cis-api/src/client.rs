use std::sync::Arc;
use std::time::Duration;

use cis_auth::{CredentialProvider, TokenRefresher};
use cis_core::config::{
    ApiConfig, API_URL_ENV, DEFAULT_API_URL, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_TIMEOUT_MS,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::refresh::RefreshStage;
use crate::request::{ApiRequest, RequestOptions};
use crate::retry::{RetryPolicy, RetryStage};
use crate::transport::{HttpTransport, Transport};

/// Client settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub retry_mutations: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            retry_mutations: false,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults, with the base address taken from `CIS_API_URL` when set.
    pub fn from_env() -> Self {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.retry_delay,
            retry_mutations: self.retry_mutations,
        }
    }
}

impl From<&ApiConfig> for ClientConfig {
    fn from(api: &ApiConfig) -> Self {
        Self {
            base_url: api.base_url.clone(),
            timeout: Duration::from_millis(api.timeout_ms),
            max_retries: api.max_retries,
            retry_delay: Duration::from_millis(api.retry_delay_ms),
            retry_mutations: api.retry_mutations,
        }
    }
}

/// Client for the CIS backend.
///
/// Every call goes through retry → token refresh → HTTP. Cloning is cheap and
/// clones share the credential provider.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    credentials: Arc<dyn CredentialProvider>,
    pipeline: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        let pipeline = Self::build_pipeline(&config, &credentials, None);
        Self {
            config,
            credentials,
            pipeline,
        }
    }

    /// Install a token refresher used on the first 401 of each call.
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.pipeline = Self::build_pipeline(&self.config, &self.credentials, Some(refresher));
        self
    }

    fn build_pipeline(
        config: &ClientConfig,
        credentials: &Arc<dyn CredentialProvider>,
        refresher: Option<Arc<dyn TokenRefresher>>,
    ) -> Arc<dyn Transport> {
        let http = HttpTransport::new(config.base_url.clone(), config.timeout, credentials.clone());
        let refresh = RefreshStage::new(http, credentials.clone(), refresher);
        Arc::new(RetryStage::new(refresh, config.retry_policy()))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.get().is_some()
    }

    /// Send a request and decode the `data` member of the response envelope.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(method, path, options);
        let response = self.pipeline.send(&request).await?;
        response.into_data()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, RequestOptions::new()).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, options).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, RequestOptions::new().json(body)?)
            .await
    }

    pub async fn post_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, options).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, RequestOptions::new().json(body)?)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, RequestOptions::new()).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
