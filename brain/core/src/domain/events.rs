// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::brain::BrainRevision;
use crate::domain::query::{PipelineStep, QueryId};

/// Brain registry lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BrainLifecycleEvent {
    BrainRegistered {
        name: String,
        revision: BrainRevision,
        neuron_count: usize,
        /// true when an earlier brain with the same name was swapped out
        replaced: bool,
        registered_at: DateTime<Utc>,
    },
    BrainUnregistered {
        name: String,
        unregistered_at: DateTime<Utc>,
    },
}

/// Per-query pipeline events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueryEvent {
    QueryReceived {
        query_id: QueryId,
        brain_name: String,
        query: String,
        received_at: DateTime<Utc>,
    },
    NeuronsActivated {
        query_id: QueryId,
        brain_name: String,
        revision: BrainRevision,
        scored_count: usize,
        activated_count: usize,
        failed_count: usize,
        duration_ms: u64,
    },
    InstructionSynthesized {
        query_id: QueryId,
        brain_name: String,
        source_neuron_count: usize,
        cached: bool,
        completed_at: DateTime<Utc>,
    },
    QueryFailed {
        query_id: QueryId,
        brain_name: String,
        step: PipelineStep,
        reason: String,
        failed_at: DateTime<Utc>,
    },
}

impl QueryEvent {
    pub fn query_id(&self) -> QueryId {
        match self {
            QueryEvent::QueryReceived { query_id, .. }
            | QueryEvent::NeuronsActivated { query_id, .. }
            | QueryEvent::InstructionSynthesized { query_id, .. }
            | QueryEvent::QueryFailed { query_id, .. } => *query_id,
        }
    }
}
