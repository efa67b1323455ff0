//! Centralized error types for the CIS client.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the codebase
//! - Provides user-friendly messages suitable for UI display
//! - Preserves full error context for debugging/logging

use thiserror::Error;

/// Top-level application error type.
///
/// Library crates convert their errors into this type at the UI boundary.
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Auth(e) => e.user_message(),
            AppError::Export(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { status: 404, .. } => "The requested record was not found.",
            NetworkError::ServerError { status: 422, .. } | NetworkError::ServerError { status: 400, .. } => {
                "Some of the submitted values are invalid."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Client-side storage errors (persisted token and locale).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read storage file: {0}")]
    ReadFailed(String),

    #[error("Failed to write storage file: {0}")]
    WriteFailed(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::ReadFailed(_) => "Unable to read saved settings.",
            StorageError::WriteFailed(_) => "Unable to save settings. Please try again.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Authentication errors (tokens, credentials).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Not signed in")]
    TokenMissing,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Credential storage error: {0}")]
    StorageError(String),
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::TokenExpired => "Your session has expired. Please sign in again.",
            AuthError::TokenMissing => "Not signed in. Please sign in first.",
            AuthError::InvalidCredentials => "Invalid credentials. Please check and try again.",
            AuthError::RefreshFailed(_) => "Your session could not be renewed. Please sign in again.",
            AuthError::StorageError(_) => "Failed to save credentials. Please try again.",
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::StorageError(err.to_string())
    }
}

/// CSV export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Record {index} has fields {found:?}, expected {expected:?}")]
    NonUniform {
        index: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Record {index} is not an object")]
    NotARecord { index: usize },

    #[error("Failed to write export file: {0}")]
    WriteFailed(#[from] std::io::Error),
}

impl ExportError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ExportError::NonUniform { .. } | ExportError::NotARecord { .. } => {
                "The data could not be exported because the rows are inconsistent."
            }
            ExportError::WriteFailed(_) => "Failed to save the export file.",
        }
    }
}
