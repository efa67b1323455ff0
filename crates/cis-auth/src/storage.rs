use cis_core::{AuthError, ClientStorage};
use parking_lot::RwLock;
use std::sync::Arc;

/// Client storage key holding the bearer token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Source of the bearer token attached to outgoing requests.
///
/// `get` is called before every request attempt, so implementations should be
/// cheap. A missing token is not an error: the request goes out unauthenticated.
pub trait CredentialProvider: Send + Sync {
    /// Current token, if any
    fn get(&self) -> Option<String>;

    /// Replace the stored token (after login or refresh)
    fn set(&self, token: &str) -> Result<(), AuthError>;

    /// Forget the stored token (logout, unrecoverable 401)
    fn clear(&self) -> Result<(), AuthError>;
}

/// Token persisted in the client storage file, so a session survives restarts.
pub struct StoredCredentials {
    storage: Arc<ClientStorage>,
}

impl StoredCredentials {
    pub fn new(storage: Arc<ClientStorage>) -> Self {
        Self { storage }
    }
}

impl CredentialProvider for StoredCredentials {
    fn get(&self) -> Option<String> {
        self.storage
            .get(AUTH_TOKEN_KEY)
            .filter(|token| !token.trim().is_empty())
    }

    fn set(&self, token: &str) -> Result<(), AuthError> {
        self.storage.set(AUTH_TOKEN_KEY, token)?;
        tracing::info!("Stored auth token");
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.storage.remove(AUTH_TOKEN_KEY)?;
        tracing::info!("Cleared auth token");
        Ok(())
    }
}

/// Token held in memory only.
#[derive(Default)]
pub struct MemoryCredentials {
    token: RwLock<Option<String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialProvider for MemoryCredentials {
    fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set(&self, token: &str) -> Result<(), AuthError> {
        *self.token.write() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.token.write() = None;
        Ok(())
    }
}
