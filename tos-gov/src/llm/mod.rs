//! Text-completion capability used by the quality assessor
//!
//! The capability is optional everywhere: services hold an
//! `Option<Arc<dyn LlmClient>>` and treat `None` as "assessment disabled".

mod anthropic;
mod mock;

pub use anthropic::AnthropicClient;
pub use mock::MockLlmClient;

use async_trait::async_trait;

/// LLM call failures; callers on background paths log and move on
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM unavailable: {0}")]
    Unavailable(String),

    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited by LLM provider")]
    RateLimited,

    #[error("Unexpected LLM response: {0}")]
    UnexpectedResponse(String),
}

/// Sampling knobs for one completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            max_tokens: 1024,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier, for logging
    fn model(&self) -> &str;

    /// Single user-turn completion returning the response text
    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String, LlmError>;
}
