//! Error taxonomy of the API client.

use std::time::Duration;

use cis_core::{AppError, AuthError, NetworkError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No response reached us (DNS, refused connection, reset).
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// 401 that a token refresh could not resolve.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// A 2xx body that doesn't match the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Rejected before anything was sent (bad URL, unserializable body, failed validation).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a retry could plausibly succeed: network drop, timeout or 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether this error should trigger a token refresh.
    pub fn should_refresh_token(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// User-friendly error message for UI display.
    ///
    /// Server-provided messages for 4xx responses are shown as-is, since the
    /// backend phrases validation errors for end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { status, message, .. } if (400..500).contains(status) && !message.is_empty() => {
                message.clone()
            }
            Self::Auth(e) => e.user_message().to_string(),
            Self::InvalidRequest(msg) => msg.clone(),
            other => NetworkError::from(other).user_message().to_string(),
        }
    }
}

impl From<&ApiError> for NetworkError {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Network(msg) => NetworkError::ConnectionFailed(msg.clone()),
            ApiError::Timeout(_) => NetworkError::Timeout,
            ApiError::Http { status, message, .. } => NetworkError::ServerError {
                status: *status,
                message: message.clone(),
            },
            other => NetworkError::InvalidResponse(other.to_string()),
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(e) => AppError::Auth(e),
            other => AppError::Network(NetworkError::from(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, message: &str) -> ApiError {
        ApiError::Http {
            status,
            message: message.to_string(),
            body: None,
        }
    }

    #[test]
    fn test_is_transient() {
        assert!(ApiError::Network("reset".into()).is_transient());
        assert!(ApiError::Timeout(Duration::from_secs(30)).is_transient());
        assert!(http(500, "boom").is_transient());
        assert!(http(503, "down").is_transient());

        assert!(!http(400, "bad").is_transient());
        assert!(!http(401, "expired").is_transient());
        assert!(!http(404, "missing").is_transient());
        assert!(!http(429, "slow down").is_transient());
        assert!(!ApiError::Auth(AuthError::TokenExpired).is_transient());
        assert!(!ApiError::Decode("x".into()).is_transient());
    }

    #[test]
    fn test_should_refresh_token() {
        assert!(http(401, "").should_refresh_token());
        assert!(!http(403, "").should_refresh_token());
        assert!(!ApiError::Network("x".into()).should_refresh_token());
    }

    #[test]
    fn test_user_message_prefers_server_text_for_client_errors() {
        assert_eq!(
            http(422, "Phone number already registered").user_message(),
            "Phone number already registered"
        );
        assert!(http(502, "upstream exploded").user_message().contains("server"));
        assert!(ApiError::Timeout(Duration::from_secs(1))
            .user_message()
            .contains("timed out"));
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = ApiError::Auth(AuthError::TokenExpired).into();
        assert!(matches!(app, AppError::Auth(AuthError::TokenExpired)));

        let app: AppError = http(404, "Farmer not found").into();
        assert!(matches!(
            app,
            AppError::Network(NetworkError::ServerError { status: 404, .. })
        ));
    }
}
