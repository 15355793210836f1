// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Query Service
//!
//! The single Activation + Synthesis pipeline shared by every facade.
//!
//! ```text
//! QueryRequest
//!   │ resolve     registry.get_brain + steering
//!   ▼
//! BrainResolved ──(cache hit)──────────────────────────┐
//!   │ activate    ActivationEngine::cognize             │
//!   ▼                                                   │
//! Activated                                             │
//!   │ synthesize  InstructionSynthesizer::instruct      │
//!   ▼                                                   ▼
//! Synthesized ─────────────────────────────────────▶ Returned
//! ```
//!
//! Any step may fail; the returned [`QueryError`] names the step.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::application::cognize::ActivationEngine;
use crate::application::instruct::InstructionSynthesizer;
use crate::application::query_cache::{CacheKey, CachedAnswer, QueryCache};
use crate::application::registry::BrainRegistry;
use crate::domain::activation::{ActivationError, ActivationResult, CognizeConfig};
use crate::domain::brain::RegistryError;
use crate::domain::events::QueryEvent;
use crate::domain::instruction::{InstructConfig, Instruction, SynthesisError};
use crate::domain::persona::{PersonaCatalog, SteeringError, SteeringSelection};
use crate::domain::query::{PipelineStep, QueryId, QueryStage};
use crate::infrastructure::event_bus::EventBus;

/// A typed query. Facades build one of these; the pipeline never parses text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub brain: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Replaces the service's default cognize settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cognize: Option<CognizeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruct: Option<InstructConfig>,
    /// Shorthand overrides applied on top of the effective cognize settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
}

impl QueryRequest {
    pub fn new(brain: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            brain: brain.into(),
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_persona_id(mut self, id: impl Into<String>) -> Self {
        self.persona_id = Some(id.into());
        self
    }

    pub fn with_persona(mut self, text: impl Into<String>) -> Self {
        self.persona = Some(text.into());
        self
    }

    pub fn with_mode_id(mut self, id: impl Into<String>) -> Self {
        self.mode_id = Some(id.into());
        self
    }

    pub fn with_mode(mut self, text: impl Into<String>) -> Self {
        self.mode = Some(text.into());
        self
    }

    pub fn with_cognize(mut self, config: CognizeConfig) -> Self {
        self.cognize = Some(config);
        self
    }

    pub fn with_instruct(mut self, config: InstructConfig) -> Self {
        self.instruct = Some(config);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn selection(&self) -> SteeringSelection<'_> {
        SteeringSelection {
            persona_id: self.persona_id.as_deref(),
            persona: self.persona.as_deref(),
            mode_id: self.mode_id.as_deref(),
            mode: self.mode.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub query_id: QueryId,
    pub instruction: Instruction,
    pub activation: ActivationResult,
    /// true when the answer came from the query cache
    pub cached: bool,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid query request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Resolve(#[from] RegistryError),

    #[error(transparent)]
    Steering(#[from] SteeringError),

    #[error(transparent)]
    Activate(#[from] ActivationError),

    #[error(transparent)]
    Synthesize(#[from] SynthesisError),
}

impl QueryError {
    /// Pipeline step the query failed in.
    pub fn step(&self) -> PipelineStep {
        match self {
            QueryError::InvalidRequest(_) | QueryError::Resolve(_) | QueryError::Steering(_) => {
                PipelineStep::Resolve
            }
            QueryError::Activate(_) => PipelineStep::Activate,
            QueryError::Synthesize(_) => PipelineStep::Synthesize,
        }
    }
}

#[async_trait]
pub trait QueryService: Send + Sync {
    async fn answer(&self, request: QueryRequest) -> Result<QueryOutcome, QueryError>;
}

pub struct StandardQueryService {
    registry: Arc<BrainRegistry>,
    engine: Arc<ActivationEngine>,
    synthesizer: Arc<InstructionSynthesizer>,
    catalog: PersonaCatalog,
    cognize_defaults: CognizeConfig,
    instruct_defaults: InstructConfig,
    cache: Option<Arc<QueryCache>>,
    event_bus: Arc<EventBus>,
}

impl StandardQueryService {
    pub fn new(
        registry: Arc<BrainRegistry>,
        engine: Arc<ActivationEngine>,
        synthesizer: Arc<InstructionSynthesizer>,
    ) -> Self {
        Self {
            registry,
            engine,
            synthesizer,
            catalog: PersonaCatalog::with_defaults(),
            cognize_defaults: CognizeConfig::default(),
            instruct_defaults: InstructConfig::default(),
            cache: None,
            event_bus: Arc::new(EventBus::default()),
        }
    }

    pub fn with_catalog(mut self, catalog: PersonaCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_cognize_defaults(mut self, config: CognizeConfig) -> Self {
        self.cognize_defaults = config;
        self
    }

    pub fn with_instruct_defaults(mut self, config: InstructConfig) -> Self {
        self.instruct_defaults = config;
        self
    }

    /// Share the cache with the registry so (re)registration invalidates it.
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn registry(&self) -> &Arc<BrainRegistry> {
        &self.registry
    }

    fn effective_configs(&self, request: &QueryRequest) -> (CognizeConfig, InstructConfig) {
        let mut cognize = request
            .cognize
            .clone()
            .unwrap_or_else(|| self.cognize_defaults.clone());
        if let Some(top_k) = request.top_k {
            cognize.top_k = Some(top_k);
        }
        if let Some(min_score) = request.min_score {
            cognize.min_score = min_score;
        }
        let instruct = request
            .instruct
            .clone()
            .unwrap_or_else(|| self.instruct_defaults.clone());
        (cognize, instruct)
    }

    async fn run(
        &self,
        query_id: QueryId,
        request: &QueryRequest,
        stage: &mut QueryStage,
    ) -> Result<QueryOutcome, QueryError> {
        if request.brain.trim().is_empty() {
            return Err(QueryError::InvalidRequest("brain name is required".to_string()));
        }
        if request.query.trim().is_empty() {
            return Err(QueryError::InvalidRequest("query text is required".to_string()));
        }

        let (cognize, instruct) = self.effective_configs(request);
        let steering = self.catalog.resolve(&request.selection())?;
        let brain = self.registry.get_brain(&request.brain)?;
        advance(stage, QueryStage::BrainResolved);

        let cache_key = self
            .cache
            .as_ref()
            .map(|_| CacheKey::new(&brain.name, &request.query, &cognize, &instruct, &steering));

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(hit) = cache.get(key, brain.revision) {
                debug!("Serving cached answer");
                // Entries are shared across whitespace variants of the query.
                let mut instruction = hit.instruction;
                let mut activation = hit.activation;
                instruction.query = request.query.clone();
                activation.query = request.query.clone();
                advance(stage, QueryStage::Activated);
                advance(stage, QueryStage::Synthesized);
                self.publish_synthesized(query_id, &brain.name, &instruction, true);
                return Ok(QueryOutcome {
                    query_id,
                    instruction,
                    activation,
                    cached: true,
                });
            }
        }

        let started = Instant::now();
        let activation = self
            .engine
            .cognize_steered(&request.query, &brain, &cognize, &steering)
            .await?;
        advance(stage, QueryStage::Activated);
        self.event_bus.publish_query_event(QueryEvent::NeuronsActivated {
            query_id,
            brain_name: brain.name.clone(),
            revision: brain.revision,
            scored_count: activation.scored_count,
            activated_count: activation.activated.len(),
            failed_count: activation.failed_count,
            duration_ms: started.elapsed().as_millis() as u64,
        });

        let instruction = self
            .synthesizer
            .instruct_steered(&request.query, &activation, &instruct, &steering)
            .await?;
        advance(stage, QueryStage::Synthesized);
        self.publish_synthesized(query_id, &brain.name, &instruction, false);

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            cache.insert(
                key,
                CachedAnswer {
                    revision: brain.revision,
                    activation: activation.clone(),
                    instruction: instruction.clone(),
                },
            );
        }

        Ok(QueryOutcome {
            query_id,
            instruction,
            activation,
            cached: false,
        })
    }

    fn publish_synthesized(&self, query_id: QueryId, brain_name: &str, instruction: &Instruction, cached: bool) {
        self.event_bus.publish_query_event(QueryEvent::InstructionSynthesized {
            query_id,
            brain_name: brain_name.to_string(),
            source_neuron_count: instruction.source_neuron_ids.len(),
            cached,
            completed_at: Utc::now(),
        });
    }
}

fn advance(stage: &mut QueryStage, to: QueryStage) {
    debug_assert!(stage.can_transition_to(to), "illegal query transition {} -> {}", stage, to);
    debug!(from = %stage, to = %to, "Query stage");
    *stage = to;
}

#[async_trait]
impl QueryService for StandardQueryService {
    async fn answer(&self, request: QueryRequest) -> Result<QueryOutcome, QueryError> {
        let query_id = QueryId::new();
        let span = info_span!("query", query_id = %query_id, brain = %request.brain);

        async move {
            self.event_bus.publish_query_event(QueryEvent::QueryReceived {
                query_id,
                brain_name: request.brain.clone(),
                query: request.query.clone(),
                received_at: Utc::now(),
            });

            let started = Instant::now();
            let mut stage = QueryStage::Received;
            match self.run(query_id, &request, &mut stage).await {
                Ok(outcome) => {
                    advance(&mut stage, QueryStage::Returned);
                    info!(
                        activated = outcome.activation.activated.len(),
                        cached = outcome.cached,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Query answered"
                    );
                    Ok(outcome)
                }
                Err(e) => {
                    let step = e.step();
                    advance(&mut stage, QueryStage::Failed);
                    warn!(step = %step, "Query failed: {}", e);
                    self.event_bus.publish_query_event(QueryEvent::QueryFailed {
                        query_id,
                        brain_name: request.brain.clone(),
                        step,
                        reason: e.to_string(),
                        failed_at: Utc::now(),
                    });
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}
