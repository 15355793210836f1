// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Instruction
//!
//! Output of the Instruct step: a single synthesized text plus the neurons it
//! was derived from.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Value objects for instruction synthesis

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::capability::CapabilityError;
use crate::domain::neuron::NeuronId;

/// Text returned when nothing in the brain was activated.
pub const NO_RELEVANT_KNOWLEDGE: &str = "No relevant neurons found for this query.";

/// Prefix of the line carrying a neuron's scoring reasoning in generation context.
pub const REASONING_LABEL: &str = "Reasoning for why you're being asked:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    Synthesized,
    NoRelevantKnowledge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub text: String,
    pub source_neuron_ids: Vec<NeuronId>,
    pub query: String,
    pub brain_name: String,
    pub kind: InstructionKind,
}

impl Instruction {
    pub fn no_relevant_knowledge(query: impl Into<String>, brain_name: impl Into<String>) -> Self {
        Self {
            text: NO_RELEVANT_KNOWLEDGE.to_string(),
            source_neuron_ids: Vec::new(),
            query: query.into(),
            brain_name: brain_name.into(),
            kind: InstructionKind::NoRelevantKnowledge,
        }
    }

    pub fn is_no_relevant_knowledge(&self) -> bool {
        self.kind == InstructionKind::NoRelevantKnowledge
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    /// One generation call over the concatenated neuron sections.
    #[default]
    Concat,
    /// One generation call per neuron, then a final call over the joined partials.
    SummarizeThenConcat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InstructConfig {
    /// Use only the top N activated neurons as context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_context_neurons: Option<usize>,

    #[serde(default)]
    pub join_strategy: JoinStrategy,

    /// Deadline for each generation call.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub generation_timeout: Option<Duration>,
}

impl InstructConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_context_neurons == Some(0) {
            return Err("max_context_neurons must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Generation failed: {0}")]
    Generation(#[from] CapabilityError),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid instruct configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_instruction() {
        let instruction = Instruction::no_relevant_knowledge("anything", "empty");
        assert_eq!(instruction.text, NO_RELEVANT_KNOWLEDGE);
        assert!(instruction.source_neuron_ids.is_empty());
        assert!(instruction.is_no_relevant_knowledge());
    }

    #[test]
    fn test_join_strategy_serde() {
        let config: InstructConfig =
            serde_yaml::from_str("join_strategy: summarize_then_concat\ngeneration_timeout: 1m\n")
                .unwrap();
        assert_eq!(config.join_strategy, JoinStrategy::SummarizeThenConcat);
        assert_eq!(config.generation_timeout, Some(Duration::from_secs(60)));
    }
}
