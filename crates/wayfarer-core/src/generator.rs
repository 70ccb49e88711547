use std::sync::Arc;
use std::time::Duration;

use wayfarer_llm::{LlmError, LlmProvider};

use crate::context::PromptContext;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Provider(#[from] LlmError),
    #[error("completion timed out after {0:?}")]
    TimedOut(Duration),
}

/// Sends the assembled prompt to the completion provider once.
pub struct ResponseGenerator<C> {
    provider: Arc<C>,
    timeout: Duration,
}

impl<C: LlmProvider> ResponseGenerator<C> {
    #[must_use]
    pub fn new(provider: Arc<C>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    #[must_use]
    pub fn provider(&self) -> &C {
        &self.provider
    }

    /// # Errors
    ///
    /// Returns an error if the provider fails or does not answer within the timeout.
    pub async fn generate(&self, context: &PromptContext) -> Result<String, GenerationError> {
        let messages = context.messages();
        let response = tokio::time::timeout(self.timeout, self.provider.chat(&messages))
            .await
            .map_err(|_| GenerationError::TimedOut(self.timeout))??;
        tracing::debug!(
            provider = self.provider.name(),
            chars = response.len(),
            "completion received"
        );
        Ok(response)
    }
}
