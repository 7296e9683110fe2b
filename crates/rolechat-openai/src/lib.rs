// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible provider adapter for Rolechat.
//!
//! Implements [`ProviderAdapter`] over the streaming chat completions API.
//! The default endpoint and model target DeepSeek; any server speaking the
//! same protocol works by changing `provider.base_url` and `provider.model`.

pub mod client;
pub mod sse;
pub mod types;

use async_trait::async_trait;
use rolechat_config::model::ProviderConfig;
use rolechat_core::{
    AdapterType, HealthStatus, PluginAdapter, ProviderAdapter, ProviderRequest, ProviderStream,
    RolechatError,
};
use tracing::info;

use crate::client::OpenAiClient;
use crate::types::{ApiMessage, ChatCompletionRequest, StreamOptions};

/// Environment fallback for the API key when the config leaves it unset.
const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

pub struct OpenAiProvider {
    client: OpenAiClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiProvider {
    /// Build from config.
    ///
    /// # API key resolution
    /// 1. `provider.api_key` (also settable as `ROLECHAT_PROVIDER_API_KEY`)
    /// 2. `DEEPSEEK_API_KEY`
    /// 3. otherwise a configuration error
    pub fn new(config: &ProviderConfig) -> Result<Self, RolechatError> {
        let api_key = resolve_api_key(config.api_key.as_deref())?;
        let client = OpenAiClient::new(&api_key, &config.base_url, config.max_retries)?;
        info!(model = %config.model, endpoint = client.endpoint(), "provider initialized");
        Ok(Self::with_client(client, config))
    }

    /// Build around an existing client.
    pub fn with_client(client: OpenAiClient, config: &ProviderConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// System prompt first, then the conversation in order.
    fn to_chat_request(&self, request: &ProviderRequest) -> ChatCompletionRequest {
        let system = (!request.system_prompt.is_empty()).then(|| ApiMessage {
            role: "system".into(),
            content: request.system_prompt.clone(),
        });
        let messages = system
            .into_iter()
            .chain(request.messages.iter().map(|m| ApiMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            }))
            .collect();

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            temperature: request.temperature.unwrap_or(self.temperature),
            stream: true,
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
        }
    }
}

fn resolve_api_key(configured: Option<&str>) -> Result<String, RolechatError> {
    if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            RolechatError::Config(format!(
                "no provider API key: set provider.api_key, ROLECHAT_PROVIDER_API_KEY or {API_KEY_ENV}"
            ))
        })
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, RolechatError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RolechatError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, RolechatError> {
        let api_request = self.to_chat_request(&request);
        self.client.stream_chat(&api_request).await
    }
}
