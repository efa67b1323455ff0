//! Token refresh stage: turns the first 401 of a call into one refresh-and-resend.

use std::sync::Arc;

use async_trait::async_trait;
use cis_auth::{CredentialProvider, TokenRefresher};
use cis_core::AuthError;
use reqwest::StatusCode;

use crate::error::ApiError;
use crate::request::{ApiRequest, ApiResponse};
use crate::transport::Transport;

pub struct RefreshStage<T> {
    inner: T,
    credentials: Arc<dyn CredentialProvider>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl<T: Transport> RefreshStage<T> {
    pub fn new(
        inner: T,
        credentials: Arc<dyn CredentialProvider>,
        refresher: Option<Arc<dyn TokenRefresher>>,
    ) -> Self {
        Self {
            inner,
            credentials,
            refresher,
        }
    }

    fn discard_token(&self) {
        if let Err(e) = self.credentials.clear() {
            tracing::warn!("Failed to clear rejected auth token: {}", e);
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for RefreshStage<T> {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self.inner.send(request).await?;
        if response.status != StatusCode::UNAUTHORIZED || request.options.skip_refresh {
            return Ok(response);
        }

        let Some(refresher) = &self.refresher else {
            tracing::warn!("{} {} rejected with 401, signing out", request.method, request.path);
            self.discard_token();
            return Err(ApiError::Auth(AuthError::TokenExpired));
        };

        // One refresh per call, across all retry attempts.
        if !request.claim_refresh() {
            tracing::warn!(
                "{} {} rejected with 401 after the token was already renewed, signing out",
                request.method,
                request.path
            );
            self.discard_token();
            return Err(ApiError::Auth(AuthError::TokenExpired));
        }

        tracing::info!("{} {} rejected with 401, refreshing token", request.method, request.path);
        if let Err(e) = refresher.refresh().await {
            tracing::warn!("Token refresh failed: {}", e);
            self.discard_token();
            return Err(ApiError::Auth(AuthError::RefreshFailed(e.to_string())));
        }

        let retried = self.inner.send(request).await?;
        if retried.status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Renewed token was rejected too, signing out");
            self.discard_token();
            return Err(ApiError::Auth(AuthError::TokenExpired));
        }

        Ok(retried)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestOptions;
    use crate::retry::{RetryPolicy, RetryStage};
    use crate::transport::testing::{Outcome, ScriptedTransport};
    use cis_auth::MemoryCredentials;
    use parking_lot::Mutex;
    use reqwest::Method;

    struct FakeRefresher {
        credentials: Arc<MemoryCredentials>,
        next_token: Option<&'static str>,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl TokenRefresher for FakeRefresher {
        async fn refresh(&self) -> Result<String, AuthError> {
            *self.calls.lock() += 1;
            match self.next_token {
                Some(token) => {
                    self.credentials.set(token)?;
                    Ok(token.to_string())
                }
                None => Err(AuthError::RefreshFailed("refresh token revoked".into())),
            }
        }
    }

    fn get() -> ApiRequest {
        ApiRequest::new(Method::GET, "/farmers", RequestOptions::new())
    }

    fn setup(
        script: Vec<Outcome>,
        next_token: Option<Option<&'static str>>,
    ) -> (
        Arc<MemoryCredentials>,
        Arc<ScriptedTransport>,
        Option<Arc<FakeRefresher>>,
        RefreshStage<Arc<ScriptedTransport>>,
    ) {
        let credentials = Arc::new(MemoryCredentials::with_token("old"));
        let inner = Arc::new(ScriptedTransport::new(script).with_credentials(credentials.clone()));
        let refresher = next_token.map(|next_token| {
            Arc::new(FakeRefresher {
                credentials: credentials.clone(),
                next_token,
                calls: Mutex::new(0),
            })
        });
        let stage = RefreshStage::new(
            inner.clone(),
            credentials.clone(),
            refresher.clone().map(|r| r as Arc<dyn TokenRefresher>),
        );
        (credentials, inner, refresher, stage)
    }

    #[tokio::test]
    async fn test_non_401_passes_through() {
        let (credentials, inner, refresher, stage) = setup(vec![Outcome::Status(403)], Some(Some("new")));

        let response = stage.send(&get()).await.unwrap();
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(inner.call_count(), 1);
        assert_eq!(refresher.map(|r| *r.calls.lock()), Some(0));
        assert_eq!(credentials.get().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_refresh_then_resend_with_new_token() {
        let (credentials, inner, refresher, stage) = setup(vec![Outcome::Status(401)], Some(Some("new")));

        let response = stage.send(&get()).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(inner.call_count(), 2);
        assert_eq!(
            inner.seen_tokens(),
            vec![Some("old".to_string()), Some("new".to_string())]
        );
        assert_eq!(refresher.map(|r| *r.calls.lock()), Some(1));
        assert_eq!(credentials.get().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_second_401_clears_token() {
        let (credentials, inner, refresher, stage) =
            setup(vec![Outcome::Status(401), Outcome::Status(401)], Some(Some("new")));

        let result = stage.send(&get()).await;
        assert!(matches!(result, Err(ApiError::Auth(AuthError::TokenExpired))));
        assert_eq!(inner.call_count(), 2);
        assert_eq!(refresher.map(|r| *r.calls.lock()), Some(1));
        assert_eq!(credentials.get(), None);
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_token() {
        let (credentials, inner, _refresher, stage) = setup(vec![Outcome::Status(401)], Some(None));

        let result = stage.send(&get()).await;
        assert!(matches!(result, Err(ApiError::Auth(AuthError::RefreshFailed(_)))));
        assert_eq!(inner.call_count(), 1);
        assert_eq!(credentials.get(), None);
    }

    #[tokio::test]
    async fn test_without_refresher_clears_token_and_fails() {
        let (credentials, inner, _refresher, stage) = setup(vec![Outcome::Status(401)], None);

        let result = stage.send(&get()).await;
        assert!(matches!(result, Err(ApiError::Auth(AuthError::TokenExpired))));
        assert_eq!(inner.call_count(), 1);
        assert_eq!(credentials.get(), None);
    }

    #[tokio::test]
    async fn test_skip_refresh_returns_raw_401() {
        let (credentials, inner, refresher, stage) = setup(vec![Outcome::Status(401)], Some(Some("new")));
        let request = ApiRequest::new(Method::POST, "/auth/login", RequestOptions::new().skip_refresh());

        let response = stage.send(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(inner.call_count(), 1);
        assert_eq!(refresher.map(|r| *r.calls.lock()), Some(0));
        assert_eq!(credentials.get().as_deref(), Some("old"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_refresh_per_call_across_retries() {
        let (credentials, inner, refresher, stage) = setup(
            vec![Outcome::Status(401), Outcome::Status(503), Outcome::Status(401)],
            Some(Some("new")),
        );
        let pipeline = RetryStage::new(stage, RetryPolicy::new(3, 10));

        let result = pipeline.send(&get()).await;
        assert!(matches!(result, Err(ApiError::Auth(AuthError::TokenExpired))));
        assert_eq!(inner.call_count(), 3);
        assert_eq!(refresher.map(|r| *r.calls.lock()), Some(1));
        assert_eq!(credentials.get(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshed_call_still_retries_server_errors() {
        let (credentials, inner, refresher, stage) =
            setup(vec![Outcome::Status(401), Outcome::Status(503)], Some(Some("new")));
        let pipeline = RetryStage::new(stage, RetryPolicy::new(3, 10));

        let response = pipeline.send(&get()).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(inner.call_count(), 3);
        assert_eq!(refresher.map(|r| *r.calls.lock()), Some(1));
        assert_eq!(credentials.get().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_separate_calls_each_get_a_refresh() {
        let (_credentials, inner, refresher, stage) =
            setup(vec![Outcome::Status(401), Outcome::Status(200), Outcome::Status(401)], Some(Some("new")));

        assert!(stage.send(&get()).await.is_ok());
        assert!(stage.send(&get()).await.is_ok());
        assert_eq!(inner.call_count(), 4);
        assert_eq!(refresher.map(|r| *r.calls.lock()), Some(2));
    }
}
