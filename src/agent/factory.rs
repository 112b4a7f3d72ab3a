//! Stage factory
//!
//! Binds every stage to the same provider, model and retry policy so the
//! pipeline has one place where inference settings are decided.

use crate::agent::stage::{Stage, StageSettings, StageSpec};
use crate::config::EccConfig;
use crate::llm::{
    GeminiConfig, GeminiProvider, LlmError, LlmProvider, OpenAiConfig, OpenAiProvider,
    RetryPolicy,
};
use crate::testing::MockLlmProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default tool round-trips per stage
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;

#[derive(Clone)]
pub struct AgentFactory {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    retry: RetryPolicy,
    max_tool_iterations: usize,
}

impl AgentFactory {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            retry: RetryPolicy::default(),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }

    /// Factory carrying every inference setting from the config
    pub fn from_config(config: &EccConfig, provider: Arc<dyn LlmProvider>) -> Self {
        Self::new(provider, config.llm.model.clone())
            .with_temperature(config.llm.temperature)
            .with_max_tokens(config.llm.max_tokens)
            .with_retry_policy(config.retry_policy())
            .with_max_tool_iterations(config.pipeline.max_tool_iterations)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn create_stage(&self, spec: StageSpec) -> Stage {
        Stage::new(
            spec,
            self.provider.clone(),
            StageSettings {
                model: self.model.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                retry: self.retry.clone(),
                max_tool_iterations: self.max_tool_iterations,
            },
        )
    }
}

/// Instantiate the provider named in `[llm]`
pub fn build_provider(config: &EccConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let timeout = Duration::from_secs(config.llm.timeout_secs);

    let provider: Arc<dyn LlmProvider> = match config.llm.provider.as_str() {
        "gemini" => {
            let mut gemini = GeminiConfig {
                api_key: api_key(config)?,
                timeout,
                ..Default::default()
            };
            if let Some(base_url) = &config.llm.base_url {
                gemini.base_url = base_url.clone();
            }
            Arc::new(GeminiProvider::new(gemini)?)
        }
        "openai" => {
            let mut openai = OpenAiConfig {
                api_key: api_key(config)?,
                timeout,
                ..Default::default()
            };
            if let Some(base_url) = &config.llm.base_url {
                openai.base_url = base_url.clone();
            }
            Arc::new(OpenAiProvider::new(openai)?)
        }
        "mock" => Arc::new(MockLlmProvider::demo()),
        other => {
            return Err(LlmError::NotConfigured(format!(
                "unknown provider '{other}' (expected gemini, openai or mock)"
            )))
        }
    };

    info!(provider = provider.name(), model = %config.llm.model, "LLM provider ready");
    Ok(provider)
}

fn api_key(config: &EccConfig) -> Result<String, LlmError> {
    config
        .get_llm_api_key()
        .map_err(|e| LlmError::NotConfigured(e.to_string()))
}
