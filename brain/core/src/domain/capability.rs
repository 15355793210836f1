// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Capability Ports
//!
//! The two external collaborators the pipeline depends on: a relevance scorer
//! used by Cognize and an instruction generator used by Instruct. Both are
//! shared as `Arc<dyn ...>` and must be `Send + Sync`.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption boundary between the pipeline and whatever
//!   performs judgement or text generation (LLM, lexical heuristics, tests)
//!
//! # Contract
//!
//! Implementations never retry internally and never enforce their own
//! deadlines; the caller wraps each call in `tokio::time::timeout`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::llm::LLMError;
use crate::domain::persona::Steering;

/// A relevance score with the scorer's optional explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceJudgement {
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl RelevanceJudgement {
    pub fn new(score: f64) -> Self {
        Self { score, reasoning: None }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Score how relevant `content` is to `query`. Expected in [0, 1]; the
    /// engine clamps out-of-range values and treats NaN as a failure.
    async fn score(
        &self,
        query: &str,
        content: &str,
        steering: &Steering,
    ) -> Result<RelevanceJudgement, CapabilityError>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait InstructionGenerator: Send + Sync {
    /// Produce text answering `query` from `context`.
    async fn generate(
        &self,
        context: &str,
        query: &str,
        steering: &Steering,
    ) -> Result<String, CapabilityError>;

    fn name(&self) -> &str;
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),

    #[error("Malformed capability response: {0}")]
    MalformedResponse(String),

    #[error("Capability unavailable: {0}")]
    Unavailable(String),
}
