//! Native LLM driver, for use in cases where an OpenAI-compatible gateway
//! isn't available.
//!
//! For now, we use the [`genai`] crate, which picks a provider based on the
//! model name and reads that provider's usual API key variable.

use std::sync::Arc;

use genai::{
    Client,
    chat::{
        ChatMessage, ChatOptions, ChatRequest, ChatResponseFormat, ChatRole, ContentPart,
        ImageSource, JsonSpec, MessageContent, Usage,
    },
};

use crate::{
    data_url::parse_data_url,
    drivers::llm_error_to_anyhow,
    prelude::*,
    prompt::{ChatPrompt, Message, Rendered},
    schema::get_schema_title,
};

use super::{ChatCompletionResponse, Driver, LlmOpts, TokenUsage};

/// Native driver built on [`genai`].
#[derive(Debug)]
pub struct NativeDriver {
    /// The `genai` client.
    pub client: Client,
}

impl NativeDriver {
    /// Create a new native driver.
    pub async fn new() -> Result<Self> {
        Ok(Self {
            client: Client::default(),
        })
    }
}

#[async_trait]
impl Driver for NativeDriver {
    #[instrument(level = "debug", skip_all, fields(model = model))]
    async fn chat_completion(
        &self,
        model: &str,
        prompt: &ChatPrompt<Rendered>,
        schema: &Value,
        llm_opts: &LlmOpts,
    ) -> Result<ChatCompletionResponse> {
        // Report what native driver we're using under the hood.
        if let Ok(service_target) = self.client.resolve_service_target(model).await {
            debug!(
                adapter_kind = %service_target.model.adapter_kind,
                model = model,
                "Using native driver"
            );
        }

        // Some providers reject `$schema`.
        let mut schema = schema.clone();
        schema
            .as_object_mut()
            .ok_or_else(|| anyhow!("Expected schema to be an object"))?
            .remove("$schema");

        let req = prompt.to_genai_request()?;
        let opts = ChatOptions {
            temperature: llm_opts.temperature.map(f64::from),
            max_tokens: llm_opts.max_completion_tokens,
            top_p: llm_opts.top_p.map(f64::from),
            response_format: Some(ChatResponseFormat::JsonSpec(JsonSpec {
                name: get_schema_title(&schema),
                description: None,
                schema,
            })),
            ..ChatOptions::default()
        };

        let chat_res = llm_opts
            .apply_timeout(self.client.exec_chat(model, req, Some(&opts)))
            .await
            .map_err(llm_error_to_anyhow)?;

        // Extract our response content.
        let content = chat_res
            .content
            .as_ref()
            .ok_or_else(|| anyhow!("No content in response: {:?}", chat_res))?;
        let content_str = content.text_as_str().ok_or_else(|| {
            anyhow!("Expected text content in response, found: {:?}", content)
        })?;
        let response = serde_json::from_str::<Value>(content_str)
            .with_context(|| format!("Error parsing LLM response content: {content:?}"))?;
        debug!(%response, "Response");

        let token_usage = if let Usage {
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            ..
        } = chat_res.usage
        {
            Some(TokenUsage {
                prompt_tokens: u64::try_from(prompt_tokens).unwrap_or_default(),
                completion_tokens: u64::try_from(completion_tokens).unwrap_or_default(),
            })
        } else {
            None
        };

        Ok(ChatCompletionResponse {
            response,
            token_usage,
        })
    }
}

/// Convert a [`ChatPrompt`] to something compatible with [`genai`].
pub trait ToGenaiRequest {
    /// The type of the output.
    type Output;

    /// Convert this value to something compatible with [`genai`].
    fn to_genai_request(&self) -> Result<Self::Output>;
}

impl ToGenaiRequest for ChatPrompt<Rendered> {
    type Output = ChatRequest;

    fn to_genai_request(&self) -> Result<Self::Output> {
        let messages = self
            .messages
            .iter()
            .map(|m| m.to_genai_request())
            .collect::<Result<Vec<_>>>()?;

        Ok(ChatRequest {
            system: self.developer.clone(),
            messages,
            ..ChatRequest::default()
        })
    }
}

impl ToGenaiRequest for Message {
    type Output = ChatMessage;

    fn to_genai_request(&self) -> Result<Self::Output> {
        match self {
            Message::User { text, images } if !images.is_empty() => {
                let mut parts = vec![];
                if let Some(text) = text {
                    parts.push(ContentPart::Text(text.clone()));
                }
                for image in images {
                    let (mime_type, data) = parse_data_url(image).ok_or_else(|| {
                        anyhow!("Don't know how to get content type for image")
                    })?;
                    parts.push(ContentPart::Image {
                        content_type: mime_type,
                        source: ImageSource::Base64(Arc::from(data)),
                    });
                }
                Ok(ChatMessage {
                    role: ChatRole::User,
                    content: MessageContent::Parts(parts),
                    options: None,
                })
            }
            Message::User {
                text: Some(text), ..
            } => Ok(ChatMessage::user(text.clone())),
            Message::User { .. } => Err(anyhow!("No text or images in user message")),
            Message::Assistant { json } => Ok(ChatMessage::assistant(json.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_message_becomes_parts() {
        let message = Message::User {
            text: Some("Read this.".to_owned()),
            images: vec!["data:image/jpeg;base64,AAAA".to_owned()],
        };
        let message = message.to_genai_request().unwrap();
        match message.content {
            MessageContent::Parts(parts) => assert_eq!(parts.len(), 2),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn test_bad_image_url_is_rejected() {
        let message = Message::User {
            text: None,
            images: vec!["https://example.com/check.png".to_owned()],
        };
        assert!(message.to_genai_request().is_err());
    }
}
