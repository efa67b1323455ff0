use async_trait::async_trait;
use cis_core::AuthError;

/// Renews an expired bearer token.
///
/// Implementations store the renewed token in their credential provider and
/// return it. The HTTP client calls this at most once per request.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CredentialProvider, MemoryCredentials};
    use std::sync::Arc;

    struct RotatingRefresher {
        credentials: Arc<MemoryCredentials>,
    }

    #[async_trait]
    impl TokenRefresher for RotatingRefresher {
        async fn refresh(&self) -> Result<String, AuthError> {
            let next = match self.credentials.get() {
                Some(old) => format!("{}-renewed", old),
                None => return Err(AuthError::TokenMissing),
            };
            self.credentials.set(&next)?;
            Ok(next)
        }
    }

    #[tokio::test]
    async fn test_refresher_as_trait_object() {
        let credentials = Arc::new(MemoryCredentials::with_token("t1"));
        let refresher: Arc<dyn TokenRefresher> = Arc::new(RotatingRefresher {
            credentials: credentials.clone(),
        });

        assert_eq!(refresher.refresh().await.unwrap(), "t1-renewed");
        assert_eq!(credentials.get().as_deref(), Some("t1-renewed"));

        credentials.clear().unwrap();
        assert!(matches!(refresher.refresh().await, Err(AuthError::TokenMissing)));
    }
}
