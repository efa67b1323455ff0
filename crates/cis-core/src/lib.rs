pub mod config;
pub mod error;
pub mod storage;

pub use config::{ApiConfig, Config, I18nConfig, ValidationResult};
pub use error::{AppError, AuthError, ConfigError, ExportError, NetworkError, StorageError};
pub use storage::ClientStorage;

use anyhow::Result;

/// Initialize logging for the CIS client
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("CIS core initialized");
    Ok(())
}
