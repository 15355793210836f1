// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! LLM Provider Port
//!
//! Vendor-neutral interface used by the LLM-backed relevance scorer and
//! instruction generator. Concrete adapters live in `infrastructure/llm/`.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption boundary around chat-completion APIs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Run a single completion.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError>;

    /// Check the provider is reachable and the credentials are accepted.
    async fn health_check(&self) -> Result<(), LLMError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sent as a `system` message ahead of the prompt when present.
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    /// 0.0 keeps judgements reproducible
    pub temperature: Option<f32>,
    /// Ask the backend to constrain output to a JSON object when it supports it.
    pub json_response: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_tokens: Some(2048),
            temperature: Some(0.0),
            json_response: false,
        }
    }
}

impl GenerationOptions {
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.json_response = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
    pub usage: TokenUsage,
    /// e.g. "openai", "ollama"
    pub provider: String,
    pub model: String,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    Other(String),
}

impl FinishReason {
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            None | Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some(other) => FinishReason::Other(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LLMError {
    /// Whether a retry against the same provider may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LLMError::Network(_) | LLMError::RateLimit)
    }
}
