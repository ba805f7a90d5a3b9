//! Replay driver for offline testing.
//!
//! This driver never touches the network. It answers every request with a
//! canned JSON response (or a canned failure), and counts how often it was
//! called.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    prelude::*,
    prompt::{ChatPrompt, Message, Rendered},
};

use super::{ChatCompletionResponse, Driver, LlmOpts, TokenUsage};

/// Replay driver for testing.
#[derive(Debug)]
pub struct ReplayDriver {
    /// What to return from each call.
    outcome: Result<Value, String>,

    /// How many times we've been called.
    calls: AtomicUsize,
}

impl ReplayDriver {
    /// Create a driver which always returns `response`.
    pub fn new(response: Value) -> Self {
        Self {
            outcome: Ok(response),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a driver which always fails with `message`.
    #[cfg(test)]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Load a canned response from a JSON file.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read replay response at {:?}", path))?;
        let response = serde_json::from_str::<Value>(&data).with_context(|| {
            format!("Failed to parse JSON from file at path: {:?}", path)
        })?;
        Ok(Self::new(response))
    }

    /// How many requests have we answered?
    #[cfg(test)]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for ReplayDriver {
    async fn chat_completion(
        &self,
        _model: &str,
        prompt: &ChatPrompt<Rendered>,
        _schema: &Value,
        _llm_opts: &LlmOpts,
    ) -> Result<ChatCompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        // A real model would refuse a prompt without an image, so we do too.
        let has_image = prompt.messages.iter().any(|message| {
            matches!(message, Message::User { images, .. } if !images.is_empty())
        });
        if !has_image {
            return Err(anyhow!("Replay driver expected an image in the prompt"));
        }

        match &self.outcome {
            Ok(response) => Ok(ChatCompletionResponse {
                response: response.clone(),
                token_usage: Some(TokenUsage::default()),
            }),
            Err(message) => Err(anyhow!("{message}")),
        }
    }
}
