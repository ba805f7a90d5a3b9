//! LLM drivers.
//!
//! Mostly we prefer to leave LLM compatibility to LiteLLM and similar
//! gateways, but sometimes it's better to talk to a provider from native Rust.
//! A driver is handed to the extraction gateway explicitly, so tests can
//! substitute their own.

use std::{error, fmt, pin::Pin, time::Duration};

use clap::{Args, ValueEnum};
use futures::{FutureExt as _, TryFutureExt as _};
use tokio::time;

use crate::{
    prelude::*,
    prompt::{ChatPrompt, Rendered},
};

pub mod native;
pub mod openai;
pub mod replay;

/// The model we use when none is specified.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Our different driver types.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum DriverType {
    /// OpenAI driver (also for LiteLLM, Ollama, etc).
    #[default]
    #[clap(name = "openai")]
    OpenAI,

    /// Attempt to use a native driver for each specific AI.
    Native,

    /// Return a canned response from `--replay-response`. For offline testing.
    Replay,
}

impl DriverType {
    /// Instantiate an appropriate driver.
    pub async fn create_driver(&self, llm_opts: &LlmOpts) -> Result<Box<dyn Driver>> {
        match self {
            DriverType::OpenAI => Ok(Box::new(openai::OpenAiDriver::new().await?)),
            DriverType::Native => Ok(Box::new(native::NativeDriver::new().await?)),
            DriverType::Replay => {
                let path = llm_opts.replay_response.as_deref().ok_or_else(|| {
                    anyhow!("the replay driver requires --replay-response")
                })?;
                Ok(Box::new(replay::ReplayDriver::from_path(path).await?))
            }
        }
    }
}

/// Our LLM-related options.
#[derive(Args, Clone, Debug, Default)]
pub struct LlmOpts {
    /// The LLM driver to use. This defaults to `openai`, which works with
    /// OpenAI, LiteLLM and Ollama-based models.
    #[clap(long, value_enum, default_value_t = DriverType::default())]
    pub driver: DriverType,

    /// The model to use for extraction. Must support image input and
    /// structured JSON output.
    #[clap(short = 'm', long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// An upper limit on the number of completion tokens to generate.
    #[clap(long)]
    pub max_completion_tokens: Option<u32>,

    /// The temperature to use for sampling, between 0.0 and 2.0. Defaults to
    /// the model's default.
    #[clap(long)]
    pub temperature: Option<f32>,

    /// The top-p sampling value to use, between 0.0 and 1.0. Defaults to the
    /// model's default.
    #[clap(long)]
    pub top_p: Option<f32>,

    /// A timeout, in seconds, for the LLM to return a complete response.
    /// Without one, a hung request waits forever.
    #[clap(long)]
    pub timeout: Option<u64>,

    /// A JSON file containing the response for the `replay` driver.
    #[clap(long, value_name = "FILE")]
    pub replay_response: Option<PathBuf>,
}

impl LlmOpts {
    /// Apply a timeout to a future.
    ///
    /// `'fut` is the lifetime of any data borrowed by `future`, which we
    /// preserve in the boxed output.
    pub fn apply_timeout<'fut, T, E>(
        &self,
        future: impl Future<Output = Result<T, E>> + Send + 'fut,
    ) -> Pin<Box<dyn Future<Output = Result<T, LlmError<E>>> + Send + 'fut>>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let future = future.map_err(LlmError::Native);
        if let Some(timeout) = self.timeout {
            time::timeout(Duration::from_secs(timeout), future)
                // Flatten `Result<Result<T, LlmError<E>>, Elapsed>`.
                .map(|result| match result {
                    Ok(inner) => inner,
                    Err(_) => Err(LlmError::Timeout),
                })
                .boxed()
        } else {
            future.boxed()
        }
    }
}

/// Interface trait for LLM drivers.
#[async_trait]
pub trait Driver: fmt::Debug + Send + Sync + 'static {
    /// Run a "chat completion" request, asking for a JSON response matching
    /// `schema`.
    ///
    /// Timeouts should be converted with [`llm_error_to_anyhow`], so callers
    /// can tell them apart.
    async fn chat_completion(
        &self,
        model: &str,
        prompt: &ChatPrompt<Rendered>,
        schema: &Value,
        llm_opts: &LlmOpts,
    ) -> Result<ChatCompletionResponse>;
}

/// A chat completion response.
#[derive(Debug)]
pub struct ChatCompletionResponse {
    /// Structured response from the LLM. This will not have been
    /// validated yet.
    pub response: Value,

    /// Token usage.
    pub token_usage: Option<TokenUsage>,
}

/// Token usage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    /// How many tokens were used in the prompt?
    pub prompt_tokens: u64,

    /// How many tokens were used in the response?
    pub completion_tokens: u64,
}

/// An error which occurred while calling an LLM.
///
/// Used internally by drivers to handle timeouts.
#[derive(Debug)]
pub enum LlmError<E> {
    /// A native error.
    Native(E),

    /// A timeout error.
    Timeout,
}

impl<E> fmt::Display for LlmError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::Native(err) => write!(f, "LLM error: {err}"),
            LlmError::Timeout => write!(f, "LLM request timed out"),
        }
    }
}

impl<E> error::Error for LlmError<E>
where
    E: error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LlmError::Native(err) => Some(err),
            LlmError::Timeout => None,
        }
    }
}

/// Does this error chain contain an [`LlmError::Timeout`] from a driver?
pub fn is_timeout_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<TimeoutMarker>())
}

/// A plain error value standing in for [`LlmError::Timeout`] once the native
/// error type has been erased.
#[derive(Debug)]
pub struct TimeoutMarker;

impl fmt::Display for TimeoutMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LLM request timed out")
    }
}

impl error::Error for TimeoutMarker {}

/// Convert an [`LlmError`] into an [`anyhow::Error`], keeping timeouts
/// recognizable by [`is_timeout_error`].
pub fn llm_error_to_anyhow<E>(err: LlmError<E>) -> anyhow::Error
where
    E: error::Error + Send + Sync + 'static,
{
    match err {
        LlmError::Native(err) => anyhow::Error::new(err).context("LLM request failed"),
        LlmError::Timeout => anyhow::Error::new(TimeoutMarker),
    }
}
