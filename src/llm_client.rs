//! Client for OpenAI-compatible APIs (OpenAI itself, LiteLLM or Ollama).

use async_openai::{Client, config::OpenAIConfig};

use crate::prelude::*;

/// Connection settings for an OpenAI-compatible server, normally taken from
/// `OPENAI_API_KEY` and `OPENAI_API_BASE`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenAiEnv {
    /// The API key, if any. Local Ollama servers don't need one.
    pub api_key: Option<String>,

    /// Override for the server URL.
    pub api_base: Option<String>,
}

impl OpenAiEnv {
    /// Read settings from the process environment, which may have been
    /// populated from a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings using `lookup` to fetch variables.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            api_key: non_empty("OPENAI_API_KEY"),
            api_base: non_empty("OPENAI_API_BASE"),
        }
    }

    /// Build an [`OpenAIConfig`] from these settings.
    pub fn to_config(&self) -> OpenAIConfig {
        let mut client_config = OpenAIConfig::new();
        if let Some(api_key) = &self.api_key {
            client_config = client_config.with_api_key(api_key.clone());
        }
        if let Some(api_base) = &self.api_base {
            client_config = client_config.with_api_base(api_base.clone());
        }
        client_config
    }
}

/// Create an OpenAI-compatible client using the environment.
pub fn create_llm_client() -> Result<Client<OpenAIConfig>> {
    let env = OpenAiEnv::from_env();
    if env.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; requests will fail unless the server needs no key");
    }
    if let Some(api_base) = &env.api_base {
        debug!(%api_base, "Using custom OpenAI API base");
    }
    Ok(Client::with_config(env.to_config()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_from_lookup_ignores_blank_values() {
        let vars = HashMap::from([
            ("OPENAI_API_KEY", "  "),
            ("OPENAI_API_BASE", "http://localhost:4000/v1"),
        ]);
        let env = OpenAiEnv::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(
            env,
            OpenAiEnv {
                api_key: None,
                api_base: Some("http://localhost:4000/v1".to_owned()),
            }
        );
    }
}
