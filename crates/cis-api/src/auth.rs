//! Login, logout and token renewal against the CIS backend.

use std::sync::Arc;

use async_trait::async_trait;
use cis_auth::{CredentialProvider, TokenRefresher};
use cis_core::AuthError;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ClientConfig};
use crate::error::ApiError;
use crate::request::{ApiRequest, RequestOptions};
use crate::transport::{HttpTransport, Transport};

/// Staff sign-in credentials
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    #[serde(alias = "access_token")]
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

impl ApiClient {
    /// Sign in and store the issued token.
    ///
    /// Never retried; a 401 means bad credentials rather than an expired session.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<Session, ApiError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(ApiError::InvalidRequest("Email and password are required".into()));
        }

        let options = RequestOptions::new()
            .json(credentials)?
            .skip_retry()
            .skip_refresh();

        let session: Session = match self.post_with("/auth/login", options).await {
            Ok(session) => session,
            Err(ApiError::Http { status: 401, .. }) => {
                return Err(ApiError::Auth(AuthError::InvalidCredentials))
            }
            Err(e) => return Err(e),
        };

        self.credentials().set(&session.token)?;
        tracing::info!("Signed in as {}", credentials.email);
        Ok(session)
    }

    /// Sign out. The local token is cleared even when the server call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        if self.is_authenticated() {
            let options = RequestOptions::new().skip_retry().skip_refresh();
            if let Err(e) = self.post_with::<serde_json::Value>("/auth/logout", options).await {
                tracing::warn!("Server-side logout failed: {}", e);
            }
        }

        self.credentials().clear()?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Profile of the signed-in staff member
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get("/auth/me").await
    }
}

/// Renews the token through `POST /auth/refresh`.
///
/// Talks to the transport directly so a 401 from the refresh endpoint can't
/// recurse into another refresh.
pub struct HttpTokenRefresher {
    transport: HttpTransport,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpTokenRefresher {
    pub fn new(config: &ClientConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            transport: HttpTransport::new(config.base_url.clone(), config.timeout, credentials.clone()),
            credentials,
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self) -> Result<String, AuthError> {
        if self.credentials.get().is_none() {
            return Err(AuthError::TokenMissing);
        }

        let request = ApiRequest::new(
            Method::POST,
            "/auth/refresh",
            RequestOptions::new().skip_retry().skip_refresh(),
        );

        let session: Session = self
            .transport
            .send(&request)
            .await
            .and_then(|response| response.into_data())
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        self.credentials.set(&session.token)?;
        tracing::info!("Auth token renewed");
        Ok(session.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_accepts_access_token_alias() {
        let session: Session =
            serde_json::from_str(r#"{"access_token":"abc","user":null}"#).unwrap();
        assert_eq!(session.token, "abc");
        assert!(session.user.is_none());

        let session: Session = serde_json::from_str(
            r#"{"token":"xyz","user":{"id":1,"name":"Admin","email":"admin@cis.rw","role":"admin"}}"#,
        )
        .unwrap();
        assert_eq!(session.user.map(|u| u.role), Some(Some("admin".to_string())));
    }

    #[test]
    fn test_login_request_serialization() {
        let req = LoginRequest {
            email: "admin@cis.rw".into(),
            password: "secret".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"email":"admin@cis.rw","password":"secret"}"#);
    }
}
