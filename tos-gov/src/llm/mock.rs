//! Scripted LLM client for tests and offline runs

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::{CompletionOptions, LlmClient, LlmError};

/// Returns a fixed response, or fails when built with [`MockLlmClient::failing`]
pub struct MockLlmClient {
    response: Result<String, String>,
    call_count: AtomicU32,
    last_options: Mutex<Option<CompletionOptions>>,
}

impl MockLlmClient {
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Ok(response.into()),
            call_count: AtomicU32::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            response: Err(reason.into()),
            call_count: AtomicU32::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Options passed to the most recent `complete` call
    pub fn last_options(&self) -> Option<CompletionOptions> {
        self.last_options.lock().ok().and_then(|guard| *guard)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, _prompt: &str, options: CompletionOptions) -> Result<String, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_options.lock() {
            *guard = Some(options);
        }
        self.response.clone().map_err(LlmError::Unavailable)
    }
}
