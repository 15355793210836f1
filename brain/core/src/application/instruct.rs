// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Instruction Synthesizer
//!
//! Composes the activated neurons of an [`ActivationResult`] into a single
//! [`Instruction`] through the [`InstructionGenerator`] port.
//!
//! An empty activation short-circuits to the "no relevant neurons" sentinel
//! without calling the generator.

use futures::future::try_join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::activation::{ActivatedNeuron, ActivationResult};
use crate::domain::capability::{CapabilityError, InstructionGenerator};
use crate::domain::instruction::{
    InstructConfig, Instruction, InstructionKind, JoinStrategy, SynthesisError, REASONING_LABEL,
};
use crate::domain::persona::Steering;

pub struct InstructionSynthesizer {
    generator: Arc<dyn InstructionGenerator>,
}

impl InstructionSynthesizer {
    pub fn new(generator: Arc<dyn InstructionGenerator>) -> Self {
        Self { generator }
    }

    pub async fn instruct(
        &self,
        query: &str,
        activation: &ActivationResult,
        config: &InstructConfig,
    ) -> Result<Instruction, SynthesisError> {
        self.instruct_steered(query, activation, config, &Steering::default()).await
    }

    pub async fn instruct_steered(
        &self,
        query: &str,
        activation: &ActivationResult,
        config: &InstructConfig,
        steering: &Steering,
    ) -> Result<Instruction, SynthesisError> {
        config.validate().map_err(SynthesisError::InvalidConfig)?;

        if activation.is_empty() {
            debug!(brain = %activation.brain_name, "No activated neurons; returning sentinel");
            return Ok(Instruction::no_relevant_knowledge(query, &activation.brain_name));
        }

        let limit = config
            .max_context_neurons
            .map_or(activation.activated.len(), |max| max.min(activation.activated.len()));
        let context_neurons = &activation.activated[..limit];

        let text = match config.join_strategy {
            JoinStrategy::Concat => {
                let context = concat_context(context_neurons);
                self.generate(&context, query, steering, config.generation_timeout).await?
            }
            JoinStrategy::SummarizeThenConcat => {
                let partials = try_join_all(context_neurons.iter().map(|activated| {
                    let context = neuron_context(activated);
                    async move { self.generate(&context, query, steering, config.generation_timeout).await }
                }))
                .await?;

                let combined = context_neurons
                    .iter()
                    .zip(partials)
                    .map(|(activated, partial)| format!("From {}:\n{}", activated.neuron.file_name(), partial))
                    .collect::<Vec<_>>()
                    .join("\n\n");

                self.generate(&combined, query, steering, config.generation_timeout).await?
            }
        };

        debug!(
            brain = %activation.brain_name,
            context_neurons = context_neurons.len(),
            strategy = ?config.join_strategy,
            "Instruction synthesized"
        );

        Ok(Instruction {
            text,
            source_neuron_ids: context_neurons.iter().map(|a| a.neuron.id.clone()).collect(),
            query: query.to_string(),
            brain_name: activation.brain_name.clone(),
            kind: InstructionKind::Synthesized,
        })
    }

    async fn generate(
        &self,
        context: &str,
        query: &str,
        steering: &Steering,
        limit: Option<Duration>,
    ) -> Result<String, SynthesisError> {
        with_deadline(limit, self.generator.generate(context, query, steering)).await
    }
}

/// `## Neuron: <id> (score <s>)` sections in activation order.
pub fn concat_context(neurons: &[ActivatedNeuron]) -> String {
    neurons
        .iter()
        .map(|a| format!("## Neuron: {} (score {:.2})\n{}", a.neuron.id, a.score, neuron_context(a)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The neuron's content, preceded by the scorer's reasoning when there is any.
fn neuron_context(activated: &ActivatedNeuron) -> String {
    match activated.reasoning.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(reasoning) => format!("{} {}\n{}", REASONING_LABEL, reasoning, activated.neuron.content),
        None => activated.neuron.content.clone(),
    }
}

async fn with_deadline<F>(limit: Option<Duration>, call: F) -> Result<String, SynthesisError>
where
    F: Future<Output = Result<String, CapabilityError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| SynthesisError::Timeout(limit))?
            .map_err(SynthesisError::from),
        None => call.await.map_err(SynthesisError::from),
    }
}
