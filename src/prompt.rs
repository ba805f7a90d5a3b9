//! Our prompt data type.
//!
//! Prompts are loaded from TOML or JSON as templates, and rendered with
//! [`handlebars`] before being handed to a driver. The `State` parameter keeps
//! us from sending an unrendered template to an LLM by accident.

use std::marker::PhantomData;

use handlebars::{Handlebars, no_escape};
use serde_json::Map;

use crate::{prelude::*, toml_utils};

/// A JSON Object value, without the surrounding [`Value::Object`] wrapper.
pub type JsonObject = Map<String, Value>;

/// Marker for a prompt which still contains template expressions.
#[derive(Clone, Copy, Debug)]
pub struct Template;

/// Marker for a prompt which is ready to send.
#[derive(Clone, Copy, Debug)]
pub struct Rendered;

/// A chat completion prompt.
#[derive(Clone, Debug, Deserialize)]
#[serde(bound = "", deny_unknown_fields)]
pub struct ChatPrompt<State = Template> {
    /// The developer (aka "system") message, if any.
    #[serde(default)]
    pub developer: Option<String>,

    /// Messages.
    pub messages: Vec<Message>,

    #[serde(skip)]
    _state: PhantomData<State>,
}

/// A message in a prompt.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Message {
    /// A user message, with optional text and zero or more images, each given
    /// as a `data:` URL.
    User {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        images: Vec<String>,
    },

    /// A canned assistant response, used for few-shot examples.
    Assistant { json: Value },
}

impl ChatPrompt<Template> {
    /// Parse a prompt template from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml_utils::from_toml_str("prompt", toml_str)
    }

    /// Load a prompt template from a TOML or JSON file.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt at path: {:?}", path))?;
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if is_json {
            serde_json::from_str(&data).with_context(|| {
                format!("Failed to parse JSON from file at path: {:?}", path)
            })
        } else {
            toml_utils::from_toml_str(&path.display().to_string(), &data)
        }
    }

    /// Render this template using `bindings`.
    pub fn render(&self, bindings: &JsonObject) -> Result<ChatPrompt<Rendered>> {
        let mut handlebars = Handlebars::new();
        // Our output is sent to an LLM, not a browser, and HTML escaping would
        // corrupt the `=` padding in Base64 data.
        handlebars.register_escape_fn(no_escape);
        handlebars.set_strict_mode(true);

        let render = |template: &str| {
            handlebars
                .render_template(template, bindings)
                .with_context(|| format!("failed to render template {:?}", template))
        };

        let developer = self.developer.as_deref().map(render).transpose()?;
        let messages = self
            .messages
            .iter()
            .map(|message| match message {
                Message::User { text, images } => Ok(Message::User {
                    text: text.as_deref().map(render).transpose()?,
                    images: images
                        .iter()
                        .map(|image| render(image))
                        .collect::<Result<Vec<_>>>()?,
                }),
                Message::Assistant { json } => Ok(Message::Assistant { json: json.clone() }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ChatPrompt {
            developer,
            messages,
            _state: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMPT: &str = r#"
developer = "You read checks."

[[messages]]
[messages.user]
text = "Extract the fields from this check."
images = ["{{image}}"]
"#;

    #[test]
    fn test_render_does_not_escape_base64() {
        let prompt = ChatPrompt::from_toml_str(PROMPT).unwrap();
        let mut bindings = JsonObject::new();
        bindings.insert("image".to_owned(), json!("data:image/png;base64,AA+/=="));
        let rendered = prompt.render(&bindings).unwrap();
        assert_eq!(rendered.developer.as_deref(), Some("You read checks."));
        match &rendered.messages[0] {
            Message::User { text, images } => {
                assert_eq!(text.as_deref(), Some("Extract the fields from this check."));
                assert_eq!(images, &["data:image/png;base64,AA+/==".to_owned()]);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_render_fails_on_missing_binding() {
        let prompt = ChatPrompt::from_toml_str(PROMPT).unwrap();
        assert!(prompt.render(&JsonObject::new()).is_err());
    }

    #[test]
    fn test_toml_syntax_errors_have_locations() {
        let err = ChatPrompt::from_toml_str("developer = \"ok\"\nmessages = [\n").unwrap_err();
        assert!(err.to_string().starts_with("prompt:"), "{err}");
    }

    #[test]
    fn test_unknown_prompt_keys_are_rejected() {
        assert!(ChatPrompt::from_toml_str("model = \"x\"\nmessages = []").is_err());
    }
}
