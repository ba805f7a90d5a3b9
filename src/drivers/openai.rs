//! Our OpenAI driver, which we also use for LiteLLM, Ollama and other
//! compatible gateways.

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{CreateChatCompletionResponse, FinishReason},
};

use crate::{
    drivers::{TokenUsage, llm_error_to_anyhow},
    llm_client::create_llm_client,
    prelude::*,
    prompt::{ChatPrompt, Message, Rendered},
    schema::get_schema_title,
};

use super::{ChatCompletionResponse, Driver, LlmOpts};

/// Our OpenAI driver, which we also use for LiteLLM, Ollama and other
/// compatible gateways.
#[derive(Debug)]
pub struct OpenAiDriver {
    /// The OpenAI client.
    pub client: Client<OpenAIConfig>,
}

impl OpenAiDriver {
    /// Create a new OpenAI driver.
    pub async fn new() -> Result<Self> {
        let client = create_llm_client()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Driver for OpenAiDriver {
    #[instrument(level = "debug", skip_all, fields(model = model))]
    async fn chat_completion(
        &self,
        model: &str,
        prompt: &ChatPrompt<Rendered>,
        schema: &Value,
        llm_opts: &LlmOpts,
    ) -> Result<ChatCompletionResponse> {
        let req = build_request(model, prompt, schema, llm_opts)?;
        trace!(%req, "Request");

        // Call OpenAI. We use the "bring your own types" API so that we can
        // send requests as plain JSON.
        let chat = self.client.chat();
        let chat_result: Value = llm_opts
            .apply_timeout(chat.create_byot(req))
            .await
            .map_err(llm_error_to_anyhow)?;
        debug!(%chat_result, "OpenAI response");
        let response = serde_json::from_value::<CreateChatCompletionResponse>(chat_result)
            .context("Error parsing OpenAI response")?;

        // How many tokens did we use?
        let token_usage = response.usage.map(|usage| TokenUsage {
            prompt_tokens: u64::from(usage.prompt_tokens),
            completion_tokens: u64::from(usage.completion_tokens),
        });

        // Get the content from our response & parse as JSON.
        let choice = response
            .choices
            .first()
            .ok_or_else(|| anyhow!("No choices in OpenAI response"))?;
        if choice.finish_reason == Some(FinishReason::ContentFilter) {
            return Err(anyhow!(
                "Content filter triggered (may also be a RECITATION error for Gemini models)"
            ));
        }
        let content = choice.message.content.as_deref().unwrap_or_default();
        let response = serde_json::from_str::<Value>(content).with_context(|| {
            format!("Error parsing OpenAI response content: {:?}", content)
        })?;
        debug!(%content, "Response");
        Ok(ChatCompletionResponse {
            response,
            token_usage,
        })
    }
}

/// Build a `/chat/completions` request body.
fn build_request(
    model: &str,
    prompt: &ChatPrompt<Rendered>,
    schema: &Value,
    llm_opts: &LlmOpts,
) -> Result<Value> {
    let mut req = json!({
        "model": model,
        "messages": prompt.to_openai_messages()?,
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": get_schema_title(schema),
                "schema": schema,
                "strict": true,
            },
        },
    });
    if let Some(max_completion_tokens) = llm_opts.max_completion_tokens {
        req["max_completion_tokens"] = json!(max_completion_tokens);
    }
    if let Some(temperature) = llm_opts.temperature {
        req["temperature"] = json!(temperature);
    }
    if let Some(top_p) = llm_opts.top_p {
        req["top_p"] = json!(top_p);
    }
    Ok(req)
}

/// Convert a prompt to OpenAI's message format.
pub trait ToOpenAiMessages {
    /// Build the `messages` array.
    fn to_openai_messages(&self) -> Result<Value>;
}

impl ToOpenAiMessages for ChatPrompt<Rendered> {
    fn to_openai_messages(&self) -> Result<Value> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(developer) = &self.developer {
            messages.push(json!({ "role": "system", "content": developer }));
        }
        for message in &self.messages {
            messages.push(message.to_openai_message()?);
        }
        Ok(Value::Array(messages))
    }
}

impl Message {
    /// Convert a single message to OpenAI's format.
    fn to_openai_message(&self) -> Result<Value> {
        match self {
            Message::User { text, images } if !images.is_empty() => {
                let mut parts = vec![];
                if let Some(text) = text {
                    parts.push(json!({ "type": "text", "text": text }));
                }
                for image in images {
                    parts.push(json!({
                        "type": "image_url",
                        "image_url": { "url": image },
                    }));
                }
                Ok(json!({ "role": "user", "content": parts }))
            }
            Message::User {
                text: Some(text), ..
            } => Ok(json!({ "role": "user", "content": text })),
            Message::User { .. } => Err(anyhow!("No text or images in user message")),
            Message::Assistant { json } => {
                Ok(json!({ "role": "assistant", "content": json.to_string() }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::JsonObject;

    fn rendered_prompt() -> ChatPrompt<Rendered> {
        let prompt = ChatPrompt::from_toml_str(
            r#"
developer = "You read checks."

[[messages]]
[messages.user]
text = "Read this."
images = ["{{image}}"]

[[messages]]
[messages.assistant]
json = { payee = "Example" }
"#,
        )
        .unwrap();
        let mut bindings = JsonObject::new();
        bindings.insert("image".to_owned(), json!("data:image/png;base64,AAAA"));
        prompt.render(&bindings).unwrap()
    }

    #[test]
    fn test_build_request() {
        let schema = json!({ "title": "CheckRecord", "type": "object" });
        let opts = LlmOpts {
            temperature: Some(0.0),
            ..LlmOpts::default()
        };
        let req = build_request("gpt-4o-mini", &rendered_prompt(), &schema, &opts).unwrap();
        assert_eq!(req["model"], "gpt-4o-mini");
        assert_eq!(req["response_format"]["json_schema"]["name"], "CheckRecord");
        assert_eq!(req["response_format"]["json_schema"]["strict"], true);
        assert_eq!(req["temperature"], 0.0);
        assert!(req.get("top_p").is_none());

        let messages = req["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"][0]["text"], "Read this.");
        assert_eq!(
            messages[1]["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
        assert_eq!(messages[2]["content"], r#"{"payee":"Example"}"#);
    }

    #[test]
    fn test_empty_user_message_is_rejected() {
        let message = Message::User {
            text: None,
            images: vec![],
        };
        assert!(message.to_openai_message().is_err());
    }
}
