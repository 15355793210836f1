// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Query Lifecycle
//!
//! Identity and stage tracking for a single query flowing through the
//! Activation and Synthesis pipeline.
//!
//! # State Machine
//!
//! ```text
//! Received ──▶ BrainResolved ──▶ Activated ──▶ Synthesized ──▶ Returned
//!     │              │               │              │
//!     └──────────────┴───────────────┴──────────────┴──▶ Failed
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryId(pub Uuid);

impl QueryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStage {
    Received,
    BrainResolved,
    Activated,
    Synthesized,
    Returned,
    Failed,
}

impl QueryStage {
    /// The stage that legally follows this one on success.
    pub fn next(self) -> Option<QueryStage> {
        match self {
            QueryStage::Received => Some(QueryStage::BrainResolved),
            QueryStage::BrainResolved => Some(QueryStage::Activated),
            QueryStage::Activated => Some(QueryStage::Synthesized),
            QueryStage::Synthesized => Some(QueryStage::Returned),
            QueryStage::Returned | QueryStage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, QueryStage::Returned | QueryStage::Failed)
    }

    pub fn can_transition_to(self, to: QueryStage) -> bool {
        match to {
            QueryStage::Failed => !self.is_terminal(),
            _ => self.next() == Some(to),
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryStage::Received => "received",
            QueryStage::BrainResolved => "brain_resolved",
            QueryStage::Activated => "activated",
            QueryStage::Synthesized => "synthesized",
            QueryStage::Returned => "returned",
            QueryStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Pipeline step a query failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Resolve,
    Activate,
    Synthesize,
}

impl PipelineStep {
    /// The stage a query would have reached had this step succeeded.
    pub fn target_stage(self) -> QueryStage {
        match self {
            PipelineStep::Resolve => QueryStage::BrainResolved,
            PipelineStep::Activate => QueryStage::Activated,
            PipelineStep::Synthesize => QueryStage::Synthesized,
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStep::Resolve => "resolve",
            PipelineStep::Activate => "activate",
            PipelineStep::Synthesize => "synthesize",
        };
        f.write_str(s)
    }
}
