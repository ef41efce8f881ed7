#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The text-completion oracle used for AI review and requirement verdicts.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    config::{OpenAiEndpoint, OpenAiSettings},
    constants::{FALLBACK_RETRY_DELAY, MODEL_CHAIN},
};

/// Errors reported by an oracle.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// No credentials were supplied.
    #[error("no OpenAI configuration found; set CODIO_DIRECT_OPENAI_KEY or OPENAI_API_KEY")]
    NotConfigured,
    /// Every client/model combination failed.
    #[error("all API attempts failed: {last}")]
    Exhausted {
        /// Error from the final attempt.
        last: String,
    },
    /// The caller's deadline passed first.
    #[error("oracle did not answer within {0:?}")]
    TimedOut(Duration),
    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

/// A `(system prompt, user content) -> text` completion service.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Returns the oracle's reply, trimmed.
    async fn complete(&self, system_prompt: &str, user_content: &str)
    -> Result<String, OracleError>;
}

/// Oracle backed by OpenAI chat completions with a model fallback chain.
pub struct OpenAiOracle {
    /// Client tried first.
    direct:      Option<OpenAIClient<OpenAIConfig>>,
    /// Client tried once the direct one is exhausted.
    fallback:    Option<OpenAIClient<OpenAIConfig>>,
    /// Models in the order they are tried.
    models:      Vec<String>,
    /// Pause after each failed fallback attempt.
    retry_delay: Duration,
}

/// Builds a client for one endpoint.
fn client_for(endpoint: &OpenAiEndpoint) -> OpenAIClient<OpenAIConfig> {
    OpenAIClient::with_config(
        OpenAIConfig::new()
            .with_api_base(endpoint.api_base())
            .with_api_key(endpoint.api_key()),
    )
}

/// Returns the model chain with its head replaced by `override_model`.
pub fn model_chain(override_model: Option<&str>) -> Vec<String> {
    let mut models: Vec<String> = MODEL_CHAIN.iter().map(|m| m.to_string()).collect();
    if let Some(model) = override_model.map(str::trim).filter(|m| !m.is_empty()) {
        models[0] = model.to_string();
    }
    models
}

impl OpenAiOracle {
    /// Builds the oracle from settings; `override_model` wins over the
    /// settings' model.
    pub fn new(settings: &OpenAiSettings, override_model: Option<&str>) -> Self {
        if settings.direct.is_some() {
            debug!("configuring direct OpenAI client");
        }
        if settings.fallback.is_some() {
            debug!("configuring fallback OpenAI client");
        }

        Self {
            direct:      settings.direct.as_ref().map(client_for),
            fallback:    settings.fallback.as_ref().map(client_for),
            models:      model_chain(override_model.or(settings.model.as_deref())),
            retry_delay: FALLBACK_RETRY_DELAY,
        }
    }

    /// Returns the models in the order they are tried.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Sends one chat completion request.
    async fn request(
        client: &OpenAIClient<OpenAIConfig>,
        model: &str,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt.to_string())
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_content.to_string())
                .build()?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .build()?;

        let response = client
            .chat()
            .create(request)
            .await
            .with_context(|| format!("model {model} request failed"))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow!("model {model} returned an empty reply"))
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, OracleError> {
        if self.direct.is_none() && self.fallback.is_none() {
            return Err(OracleError::NotConfigured);
        }

        let mut last = String::from("no attempt was made");

        if let Some(client) = &self.direct {
            for model in &self.models {
                debug!(%model, "trying direct client");
                match Self::request(client, model, system_prompt, user_content).await {
                    Ok(text) => return Ok(text),
                    Err(e) => {
                        warn!(%model, "direct API attempt failed: {e:#}");
                        last = format!("Direct API failed: {e:#}");
                    }
                }
            }
            debug!("all models failed with the direct client");
        }

        if let Some(client) = &self.fallback {
            for model in &self.models {
                debug!(%model, "trying fallback client");
                match Self::request(client, model, system_prompt, user_content).await {
                    Ok(text) => return Ok(text),
                    Err(e) => {
                        warn!(%model, "fallback API attempt failed: {e:#}");
                        last = format!("Fallback API failed: {e:#}");
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(OracleError::Exhausted { last })
    }
}
