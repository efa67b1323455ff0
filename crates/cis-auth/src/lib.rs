//! Bearer-token handling for the CIS API client.

pub mod refresh;
pub mod storage;

pub use refresh::TokenRefresher;
pub use storage::{CredentialProvider, MemoryCredentials, StoredCredentials, AUTH_TOKEN_KEY};
