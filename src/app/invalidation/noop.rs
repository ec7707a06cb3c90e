use async_trait::async_trait;

use super::{InvalidationError, ViewInvalidator};

/// Invalidator that does nothing. For deployments without cached views.
#[derive(Debug)]
pub struct NoopInvalidator;

#[async_trait]
impl ViewInvalidator for NoopInvalidator {
    async fn invalidate(&self, _paths: &[String]) -> Result<(), InvalidationError> {
        Ok(())
    }
}
