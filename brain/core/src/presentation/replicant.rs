// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SynthesizerReplicant
//!
//! Agent-framework facade. Accepts a composite prompt (or the
//! `agent goal=Brain query=..., iterations=N` wrapper around one) and replies
//! with a run id and a fenced `instructions` block:
//!
//! ````text
//! run_id: 1b4e28ba-2fa1-11d2-883f-0016d3cca427
//! ```instructions
//! ...
//! ```
//! ````

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::debug;
use uuid::Uuid;

use crate::application::query_service::QueryService;
use crate::presentation::request_parser::parse_request;
use crate::presentation::{FacadeError, QueryFacade};

static AGENT_GOAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*agent\s+goal=\S+\s+query=(.*?)(?:,\s*iterations=\d+)?\s*$").expect("valid regex")
});

/// Strip an `agent goal=<goal> query=<q>, iterations=<n>` wrapper, if present.
pub fn unwrap_agent_goal(prompt: &str) -> &str {
    AGENT_GOAL
        .captures(prompt)
        .and_then(|caps| caps.get(1))
        .map_or(prompt, |m| m.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicantResponse {
    pub run_id: Uuid,
    pub instructions: String,
}

impl fmt::Display for ReplicantResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run_id: {}\n```instructions\n{}\n```", self.run_id, self.instructions)
    }
}

pub struct SynthesizerReplicant {
    service: Arc<dyn QueryService>,
}

impl SynthesizerReplicant {
    pub const NAME: &'static str = "SynthesizerReplicant";

    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self { service }
    }

    pub async fn run(&self, prompt: &str) -> Result<ReplicantResponse, FacadeError> {
        let run_id = Uuid::new_v4();
        let request = parse_request(unwrap_agent_goal(prompt))?;
        debug!(%run_id, brain = %request.brain, "Replicant run");

        let outcome = self.service.answer(request).await?;
        Ok(ReplicantResponse {
            run_id,
            instructions: outcome.instruction.text,
        })
    }
}

#[async_trait]
impl QueryFacade for SynthesizerReplicant {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, input: &str) -> Result<String, FacadeError> {
        Ok(self.run(input).await?.to_string())
    }
}
