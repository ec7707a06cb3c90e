use std::sync::Arc;

/// Abstract interface for refreshing cached views after a commit. Swappable per environment.
#[async_trait::async_trait]
pub trait ViewInvalidator: Send + Sync {
    async fn invalidate(&self, paths: &[String]) -> Result<(), InvalidationError>;
}

/// Errors that can occur while signalling invalidation.
#[derive(Debug, thiserror::Error)]
pub enum InvalidationError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalidation failed: {0}")]
    Signal(String),
}

// Re-export implementations
pub use log::LogInvalidator;
pub use noop::NoopInvalidator;

mod log;
mod noop;

/// Build the invalidator from config.
pub fn from_config(config: &crate::app::config::Config) -> Result<Arc<dyn ViewInvalidator>, InvalidationError> {
    match config.invalidation_adapter.as_str() {
        "log" => Ok(Arc::new(LogInvalidator)),
        "none" => Ok(Arc::new(NoopInvalidator)),
        _ => Err(InvalidationError::Config(format!(
            "Unknown INVALIDATION_ADAPTER: {}",
            config.invalidation_adapter
        ))),
    }
}
