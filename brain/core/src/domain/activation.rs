// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Activation
//!
//! Result and configuration types for scoring a brain's neurons against a
//! query. The engine itself lives in `application/cognize.rs`.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Value objects for the Cognize step
//!
//! # Ordering
//!
//! Activated neurons are ordered by descending score. Equal scores fall back
//! to ascending `chunk_index`, then ascending traversal position, so the
//! order is total and reproducible for a given brain revision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::brain::BrainRevision;
use crate::domain::neuron::{Neuron, NeuronId};

fn default_max_concurrency() -> usize {
    8
}

/// Per-query knobs for the Cognize step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognizeConfig {
    /// Keep at most this many activated neurons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,

    /// Inclusive relevance threshold.
    #[serde(default)]
    pub min_score: f64,

    /// Score only the first N neurons in traversal order. Trades recall for cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_neurons_scored: Option<usize>,

    /// Abort the query on the first scoring failure instead of scoring it 0.
    #[serde(default)]
    pub fail_fast: bool,

    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub score_timeout: Option<Duration>,

    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub query_timeout: Option<Duration>,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for CognizeConfig {
    fn default() -> Self {
        Self {
            top_k: None,
            min_score: 0.0,
            max_neurons_scored: None,
            fail_fast: false,
            score_timeout: None,
            query_timeout: None,
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl CognizeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(format!("min_score must be within [0, 1], got {}", self.min_score));
        }
        if self.top_k == Some(0) {
            return Err("top_k must be at least 1".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivatedNeuron {
    pub neuron: Arc<Neuron>,
    /// Relevance in [0, 1]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Set when scoring failed and the neuron was scored 0 instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Index of the neuron in the brain's traversal order.
    pub position: usize,
}

impl ActivatedNeuron {
    pub fn id(&self) -> &NeuronId {
        &self.neuron.id
    }
}

/// Total order used for activation lists.
pub fn activation_order(a: &ActivatedNeuron, b: &ActivatedNeuron) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.neuron.chunk_index.cmp(&b.neuron.chunk_index))
        .then_with(|| a.position.cmp(&b.position))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationResult {
    pub query: String,
    pub brain_name: String,
    pub brain_revision: BrainRevision,
    pub activated: Vec<ActivatedNeuron>,
    pub threshold_used: f64,
    pub scored_count: usize,
    pub failed_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl ActivationResult {
    pub fn is_empty(&self) -> bool {
        self.activated.is_empty()
    }

    pub fn neuron_ids(&self) -> Vec<NeuronId> {
        self.activated.iter().map(|a| a.neuron.id.clone()).collect()
    }
}

/// A single neuron could not be scored and `fail_fast` was set.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Failed to score neuron {neuron_id}: {reason}")]
pub struct ScoringError {
    pub neuron_id: NeuronId,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("Activation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid cognize configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn activated(id: &str, chunk_index: usize, position: usize, score: f64) -> ActivatedNeuron {
        ActivatedNeuron {
            neuron: Arc::new(Neuron {
                id: NeuronId(id.to_string()),
                content: id.to_string(),
                source_path: PathBuf::from(id),
                chunk_index,
                metadata: BTreeMap::new(),
            }),
            score,
            reasoning: None,
            failure: None,
            position,
        }
    }

    #[test]
    fn test_activation_order_ties() {
        let mut list = vec![
            activated("b#1", 1, 3, 0.5),
            activated("a#0", 0, 0, 0.2),
            activated("c#0", 0, 4, 0.5),
            activated("b#0", 0, 2, 0.5),
            activated("d#0", 0, 1, 0.9),
        ];
        list.sort_by(activation_order);
        let ids: Vec<_> = list.iter().map(|a| a.id().as_str().to_string()).collect();
        assert_eq!(ids, vec!["d#0", "b#0", "c#0", "b#1", "a#0"]);
    }

    #[test]
    fn test_config_yaml_durations() {
        let config: CognizeConfig =
            serde_yaml::from_str("top_k: 3\nmin_score: 0.25\nscore_timeout: 5s\n").unwrap();
        assert_eq!(config.top_k, Some(3));
        assert_eq!(config.score_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.max_concurrency, 8);
        assert!(config.query_timeout.is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(CognizeConfig::default().validate().is_ok());
        let bad = CognizeConfig { min_score: 1.5, ..Default::default() };
        assert!(bad.validate().is_err());
        let bad = CognizeConfig { top_k: Some(0), ..Default::default() };
        assert!(bad.validate().is_err());
    }
}
