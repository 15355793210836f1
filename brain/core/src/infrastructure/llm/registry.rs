// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Registry - Model Alias Resolution and Provider Management
//
// Resolves the `scoring.model` and `generation.model` aliases of the
// manifest to provider adapters, with retry/backoff on
// transient errors and an optional fallback provider.

use crate::domain::agent_config::{BrainAgentConfig, LLMProviderConfig, LLMSelection, ModelConfig};
use crate::domain::llm::{GenerationOptions, GenerationResponse, LLMError, LLMProvider};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::ollama::OllamaAdapter;
use super::openai::OpenAIAdapter;

struct AliasBinding {
    provider_name: String,
    provider: Arc<dyn LLMProvider>,
    model: ModelConfig,
}

pub struct ProviderRegistry {
    aliases: HashMap<String, AliasBinding>,
    fallback: Option<(String, Arc<dyn LLMProvider>)>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl ProviderRegistry {
    /// Registry with no providers; aliases are added with [`register_alias`](Self::register_alias).
    pub fn new(selection: &LLMSelection) -> Self {
        Self {
            aliases: HashMap::new(),
            fallback: None,
            max_retries: selection.max_retries.max(1),
            retry_delay_ms: selection.retry_delay_ms,
        }
    }

    pub fn from_config(config: &BrainAgentConfig) -> anyhow::Result<Self> {
        let mut registry = Self::new(&config.llm_selection);

        info!("Initializing LLM provider registry");

        for provider_config in &config.llm_providers {
            if !provider_config.enabled {
                info!("Provider '{}' disabled, skipping", provider_config.name);
                continue;
            }

            let api_key = match Self::resolve_api_key(&provider_config.api_key) {
                Ok(key) => key,
                Err(e) => {
                    warn!("Failed to initialize provider '{}': {}", provider_config.name, e);
                    continue;
                }
            };

            for model_config in &provider_config.models {
                let provider = Self::create_provider(provider_config, &api_key, &model_config.model)?;
                info!(
                    "Mapping alias '{}' -> {} ({})",
                    model_config.alias, model_config.model, provider_config.name
                );
                registry.register_alias(model_config.clone(), provider_config.name.clone(), provider.clone());

                if registry.fallback.is_none()
                    && config.llm_selection.fallback_provider.as_deref() == Some(provider_config.name.as_str())
                {
                    registry.set_fallback(provider_config.name.clone(), provider);
                }
            }
        }

        if registry.aliases.is_empty() && !config.llm_providers.is_empty() {
            warn!("No LLM provider could be initialized");
        }

        Ok(registry)
    }

    fn create_provider(
        config: &LLMProviderConfig,
        api_key: &str,
        model: &str,
    ) -> anyhow::Result<Arc<dyn LLMProvider>> {
        let provider: Arc<dyn LLMProvider> = match config.provider_type.as_str() {
            "openai" | "openai-compatible" => Arc::new(OpenAIAdapter::new(
                config.name.clone(),
                config.endpoint.clone(),
                api_key.to_string(),
                model.to_string(),
            )),
            "ollama" => Arc::new(OllamaAdapter::new(
                config.name.clone(),
                config.endpoint.clone(),
                model.to_string(),
            )),
            _ => anyhow::bail!("Unsupported provider type: {}", config.provider_type),
        };

        Ok(provider)
    }

    /// Resolve API key from config (supports "env:VAR_NAME" syntax)
    fn resolve_api_key(key: &Option<String>) -> anyhow::Result<String> {
        match key {
            Some(k) => match k.strip_prefix("env:") {
                Some(var_name) => std::env::var(var_name)
                    .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
                None => Ok(k.clone()),
            },
            None => Ok(String::new()),
        }
    }

    /// Bind `model.alias` to an already constructed provider.
    pub fn register_alias(&mut self, model: ModelConfig, provider_name: impl Into<String>, provider: Arc<dyn LLMProvider>) {
        self.aliases.insert(
            model.alias.clone(),
            AliasBinding {
                provider_name: provider_name.into(),
                provider,
                model,
            },
        );
    }

    pub fn set_fallback(&mut self, provider_name: impl Into<String>, provider: Arc<dyn LLMProvider>) {
        self.fallback = Some((provider_name.into(), provider));
    }

    /// Generate text using a model alias.
    ///
    /// Transient errors are retried with exponential backoff; once retries
    /// are exhausted the fallback provider gets one attempt.
    pub async fn generate(
        &self,
        alias: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        let binding = self
            .aliases
            .get(alias)
            .ok_or_else(|| LLMError::ModelNotFound(format!("Model alias '{}' not found", alias)))?;

        let mut options = options.clone();
        if let Some(max_tokens) = binding.model.max_tokens {
            options.max_tokens = Some(max_tokens);
        }
        if let Some(temperature) = binding.model.temperature {
            options.temperature = Some(temperature);
        }

        let mut last_error = None;

        for attempt in 0..self.max_retries {
            match binding.provider.generate(prompt, &options).await {
                Ok(response) => {
                    debug!(
                        "Generation via '{}' succeeded on attempt {}",
                        binding.provider_name,
                        attempt + 1
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!(
                        "Generation via '{}' failed (attempt {}/{}): {}",
                        binding.provider_name,
                        attempt + 1,
                        self.max_retries,
                        e
                    );
                    let transient = e.is_transient();
                    last_error = Some(e);

                    if !transient || attempt + 1 == self.max_retries {
                        break;
                    }

                    tokio::time::sleep(Duration::from_millis(
                        self.retry_delay_ms.saturating_mul(2_u64.saturating_pow(attempt)),
                    ))
                    .await;
                }
            }
        }

        if let Some((fallback_name, fallback)) = &self.fallback {
            if fallback_name != &binding.provider_name {
                info!("Trying fallback provider: {}", fallback_name);
                return fallback.generate(prompt, &options).await;
            }
        }

        Err(last_error.unwrap_or_else(|| LLMError::Provider("Unknown error".into())))
    }

    pub async fn health_check_all(&self) -> HashMap<String, Result<(), LLMError>> {
        let mut results = HashMap::new();

        for binding in self.aliases.values() {
            if results.contains_key(&binding.provider_name) {
                continue;
            }
            info!("Health checking provider: {}", binding.provider_name);
            results.insert(binding.provider_name.clone(), binding.provider.health_check().await);
        }

        results
    }

    pub fn available_aliases(&self) -> Vec<String> {
        let mut aliases: Vec<_> = self.aliases.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{FinishReason, TokenUsage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        failures_left: AtomicU32,
        error: fn() -> LLMError,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        fn new(failures: u32, error: fn() -> LLMError) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                error,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for FlakyProvider {
        async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<GenerationResponse, LLMError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err((self.error)());
            }
            Ok(GenerationResponse {
                text: format!("echo: {}", prompt),
                usage: TokenUsage::default(),
                provider: "flaky".to_string(),
                model: "m".to_string(),
                finish_reason: FinishReason::Stop,
            })
        }

        async fn health_check(&self) -> Result<(), LLMError> {
            Ok(())
        }
    }

    fn model(alias: &str) -> ModelConfig {
        ModelConfig {
            alias: alias.to_string(),
            model: alias.to_string(),
            max_tokens: None,
            temperature: None,
        }
    }

    fn selection() -> LLMSelection {
        LLMSelection {
            fallback_provider: None,
            max_retries: 3,
            retry_delay_ms: 0,
        }
    }

    #[test]
    fn test_registry_from_config_maps_every_model() {
        let config: BrainAgentConfig = serde_yaml::from_str(
            r#"
llm_providers:
  - name: local
    type: ollama
    endpoint: http://localhost:11434
    models:
      - alias: judge
        model: llama3.2
      - alias: writer
        model: qwen2.5
"#,
        )
        .unwrap();

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(registry.has_alias("judge"));
        assert!(registry.has_alias("writer"));
        assert_eq!(registry.available_aliases(), vec!["judge", "writer"]);
    }

    #[test]
    fn test_unsupported_provider_type() {
        let config: BrainAgentConfig = serde_yaml::from_str(
            r#"
llm_providers:
  - name: odd
    type: carrier-pigeon
    endpoint: http://localhost
    models:
      - alias: a
        model: b
"#,
        )
        .unwrap();
        assert!(ProviderRegistry::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let provider = Arc::new(FlakyProvider::new(2, || LLMError::RateLimit));
        let mut registry = ProviderRegistry::new(&selection());
        registry.register_alias(model("judge"), "flaky", provider.clone());

        let response = registry
            .generate("judge", "hello", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(response.text, "echo: hello");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_goes_to_fallback() {
        let primary = Arc::new(FlakyProvider::new(10, || LLMError::Authentication("no".into())));
        let fallback = Arc::new(FlakyProvider::new(0, || LLMError::RateLimit));
        let mut registry = ProviderRegistry::new(&selection());
        registry.register_alias(model("judge"), "primary", primary.clone());
        registry.set_fallback("backup", fallback.clone());

        let response = registry
            .generate("judge", "hi", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(response.text, "echo: hi");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_health_check_once_per_provider() {
        let mut registry = ProviderRegistry::new(&selection());
        let provider = Arc::new(FlakyProvider::new(0, || LLMError::RateLimit));
        registry.register_alias(model("judge"), "local", provider.clone());
        registry.register_alias(model("writer"), "local", provider);

        let results = registry.health_check_all().await;
        assert_eq!(results.len(), 1);
        assert!(results["local"].is_ok());
    }

    #[tokio::test]
    async fn test_unknown_alias() {
        let registry = ProviderRegistry::new(&selection());
        let err = registry
            .generate("missing", "x", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::ModelNotFound(_)));
    }
}
