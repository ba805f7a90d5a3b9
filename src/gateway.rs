//! The extraction gateway: one image in, one [`CheckRecord`] (or one error)
//! out.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{
    data_url::parse_data_url,
    drivers::{Driver, LlmOpts, is_timeout_error},
    prelude::*,
    prompt::{ChatPrompt, JsonObject},
    record::CheckRecord,
    schema::ResponseSchema,
};

/// The default extraction prompt, used if no prompt is provided.
const DEFAULT_PROMPT: &str = include_str!("gateway/default_prompt.toml");

/// What the model should write for a field it can't read.
pub const UNCLEAR_MARKER: &str = "Unclear";

/// Get our default extraction prompt.
pub fn default_prompt() -> ChatPrompt {
    ChatPrompt::from_toml_str(DEFAULT_PROMPT).expect("failed to parse built-in prompt")
}

/// Everything that can go wrong during extraction. There is no partial
/// success.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The payload wasn't a Base64 `data:` URL.
    #[error("The image payload is not a valid base64 data URL")]
    InvalidPayload,

    /// We couldn't build the prompt.
    #[error("Failed to prepare the extraction prompt: {0:#}")]
    Prompt(anyhow::Error),

    /// The model call failed.
    #[error("Extraction failed: {0:#}")]
    Llm(anyhow::Error),

    /// The model call took longer than `--timeout`.
    #[error("Extraction timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The response didn't match the [`CheckRecord`] schema.
    #[error("The model's response did not match the expected fields: {}", .errors.join("; "))]
    SchemaMismatch { errors: Vec<String> },

    /// The response matched the schema but still failed to deserialize.
    #[error("Failed to decode the model's response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Extracts [`CheckRecord`]s from check images using an LLM.
pub struct ExtractionGateway {
    /// The LLM client we were given.
    driver: Arc<dyn Driver>,

    /// The prompt template.
    prompt: ChatPrompt,

    /// Model and sampling options.
    llm_opts: LlmOpts,

    /// The schema we request and enforce.
    schema: ResponseSchema,
}

impl ExtractionGateway {
    /// Create a new gateway using `driver` to talk to the model named in
    /// `llm_opts`.
    pub fn new(driver: Arc<dyn Driver>, prompt: ChatPrompt, llm_opts: LlmOpts) -> Result<Self> {
        Ok(Self {
            driver,
            prompt,
            llm_opts,
            schema: ResponseSchema::from_type::<CheckRecord>()?,
        })
    }

    /// Extract a record from an image given as a `data:` URL.
    ///
    /// MIME type and size limits are the caller's responsibility. We make
    /// exactly one request and never retry.
    #[instrument(level = "debug", skip_all, fields(model = %self.llm_opts.model))]
    pub async fn extract(&self, image_data_url: &str) -> Result<CheckRecord, ExtractionError> {
        let (mime_type, _) =
            parse_data_url(image_data_url).ok_or(ExtractionError::InvalidPayload)?;
        debug!(%mime_type, len = image_data_url.len(), "Extracting check data");

        let mut bindings = JsonObject::new();
        bindings.insert(
            "check_image_data_url".to_owned(),
            Value::String(image_data_url.to_owned()),
        );
        bindings.insert(
            "unclear_marker".to_owned(),
            Value::String(UNCLEAR_MARKER.to_owned()),
        );
        let prompt = self.prompt.render(&bindings).map_err(ExtractionError::Prompt)?;

        let completion = self
            .driver
            .chat_completion(
                &self.llm_opts.model,
                &prompt,
                self.schema.json_schema(),
                &self.llm_opts,
            )
            .await
            .map_err(|err| match self.llm_opts.timeout {
                Some(seconds) if is_timeout_error(&err) => ExtractionError::Timeout { seconds },
                _ => ExtractionError::Llm(err),
            })?;
        if let Some(usage) = &completion.token_usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Token usage"
            );
        }

        self.schema
            .validate(&completion.response)
            .map_err(|errors| ExtractionError::SchemaMismatch { errors })?;
        let record = serde_json::from_value::<CheckRecord>(completion.response)?;
        info!("Extracted check data");
        Ok(record)
    }
}

impl fmt::Debug for ExtractionGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionGateway")
            .field("driver", &self.driver)
            .field("model", &self.llm_opts.model)
            .finish_non_exhaustive()
    }
}
