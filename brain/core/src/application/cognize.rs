// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Activation Engine
//!
//! Scores every neuron of a brain against a query and selects the activated
//! subset.
//!
//! # Algorithm
//!
//! 1. Take the first `max_neurons_scored` neurons in traversal order
//! 2. Fan out scoring calls, at most `max_concurrency` in flight
//! 3. Wait for every score, then keep `score >= min_score`
//! 4. Sort by [`activation_order`] and truncate to `top_k`
//!
//! Completion order of the fan-out never affects the result. Under
//! `fail_fast` the reported failure is the one with the lowest position.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::activation::{
    activation_order, ActivatedNeuron, ActivationError, ActivationResult, CognizeConfig, ScoringError,
};
use crate::domain::brain::Brain;
use crate::domain::capability::RelevanceScorer;
use crate::domain::neuron::Neuron;
use crate::domain::persona::Steering;

pub struct ActivationEngine {
    scorer: Arc<dyn RelevanceScorer>,
}

impl ActivationEngine {
    pub fn new(scorer: Arc<dyn RelevanceScorer>) -> Self {
        Self { scorer }
    }

    pub async fn cognize(
        &self,
        query: &str,
        brain: &Brain,
        config: &CognizeConfig,
    ) -> Result<ActivationResult, ActivationError> {
        self.cognize_steered(query, brain, config, &Steering::default()).await
    }

    pub async fn cognize_steered(
        &self,
        query: &str,
        brain: &Brain,
        config: &CognizeConfig,
        steering: &Steering,
    ) -> Result<ActivationResult, ActivationError> {
        config.validate().map_err(ActivationError::InvalidConfig)?;

        let scoring = self.score_all(query, brain, config, steering);
        let scored = match config.query_timeout {
            // Dropping the fan-out future cancels every in-flight call for this query.
            Some(limit) => tokio::time::timeout(limit, scoring)
                .await
                .map_err(|_| ActivationError::Timeout(limit))??,
            None => scoring.await?,
        };

        let scored_count = scored.len();
        let failed_count = scored.iter().filter(|a| a.failure.is_some()).count();

        let mut activated: Vec<ActivatedNeuron> = scored
            .into_iter()
            .filter(|a| a.score >= config.min_score)
            .collect();
        activated.sort_by(activation_order);
        if let Some(top_k) = config.top_k {
            activated.truncate(top_k);
        }

        debug!(
            brain = %brain.name,
            scored = scored_count,
            failed = failed_count,
            activated = activated.len(),
            "Cognize complete"
        );

        Ok(ActivationResult {
            query: query.to_string(),
            brain_name: brain.name.clone(),
            brain_revision: brain.revision,
            activated,
            threshold_used: config.min_score,
            scored_count,
            failed_count,
            timestamp: Utc::now(),
        })
    }

    async fn score_all(
        &self,
        query: &str,
        brain: &Brain,
        config: &CognizeConfig,
        steering: &Steering,
    ) -> Result<Vec<ActivatedNeuron>, ScoringError> {
        let limit = config
            .max_neurons_scored
            .map_or(brain.len(), |max| max.min(brain.len()));
        if limit < brain.len() {
            warn!(
                brain = %brain.name,
                total = brain.len(),
                scored = limit,
                "max_neurons_scored truncates scoring; later neurons will not be considered"
            );
        }

        let pending: Vec<_> = brain
            .neurons
            .iter()
            .take(limit)
            .enumerate()
            .map(|(position, neuron)| async move {
                (position, self.score_one(query, neuron, position, config, steering).await)
            })
            .collect();
        let mut scoring = stream::iter(pending).buffer_unordered(config.max_concurrency);

        let mut scored = Vec::with_capacity(limit);
        let mut failure: Option<(usize, ScoringError)> = None;
        while let Some((position, result)) = scoring.next().await {
            match result {
                Ok(activated) => scored.push(activated),
                Err(err) => {
                    if failure.as_ref().map_or(true, |(first, _)| position < *first) {
                        failure = Some((position, err));
                    }
                }
            }
            // Stop once every earlier position has scored cleanly.
            if let Some((first, _)) = &failure {
                if scored.iter().filter(|a| a.position < *first).count() == *first {
                    break;
                }
            }
        }

        match failure {
            Some((_, err)) => Err(err),
            None => Ok(scored),
        }
    }

    async fn score_one(
        &self,
        query: &str,
        neuron: &Arc<Neuron>,
        position: usize,
        config: &CognizeConfig,
        steering: &Steering,
    ) -> Result<ActivatedNeuron, ScoringError> {
        let call = self.scorer.score(query, &neuron.content, steering);
        let outcome = match config.score_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!("scoring timed out after {:?}", limit)),
            },
            None => call.await.map_err(|e| e.to_string()),
        };
        let outcome = outcome.and_then(|judgement| {
            if judgement.score.is_nan() {
                Err("scorer returned NaN".to_string())
            } else {
                Ok(judgement)
            }
        });

        match outcome {
            Ok(judgement) => {
                let score = judgement.score.clamp(0.0, 1.0);
                debug!(neuron = %neuron.id, score, "Scored neuron");
                Ok(ActivatedNeuron {
                    neuron: neuron.clone(),
                    score,
                    reasoning: judgement.reasoning,
                    failure: None,
                    position,
                })
            }
            Err(reason) if config.fail_fast => Err(ScoringError {
                neuron_id: neuron.id.clone(),
                reason,
            }),
            Err(reason) => {
                warn!(neuron = %neuron.id, "Scoring failed, treating as 0: {}", reason);
                Ok(ActivatedNeuron {
                    neuron: neuron.clone(),
                    score: 0.0,
                    reasoning: None,
                    failure: Some(reason),
                    position,
                })
            }
        }
    }
}
