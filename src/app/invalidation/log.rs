use async_trait::async_trait;

use super::{InvalidationError, ViewInvalidator};

/// Invalidator for local development.
/// Logs the affected view paths using tracing::info!.
#[derive(Debug)]
pub struct LogInvalidator;

#[async_trait]
impl ViewInvalidator for LogInvalidator {
    async fn invalidate(&self, paths: &[String]) -> Result<(), InvalidationError> {
        tracing::info!(paths = ?paths, "Views invalidated (log)");
        Ok(())
    }
}
