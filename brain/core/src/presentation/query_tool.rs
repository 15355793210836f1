// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! QueryBrainTool
//!
//! Tool-call facade: `brain=<name> query=<text>` in, instruction text (or a
//! structured answer) out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::query_service::{QueryRequest, QueryService};
use crate::domain::instruction::Instruction;
use crate::presentation::request_parser::parse_request;
use crate::presentation::{FacadeError, QueryFacade};

/// JSON-friendly result shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub text: String,
    pub source_neuron_ids: Vec<String>,
    pub brain_name: String,
    pub query: String,
}

impl From<Instruction> for StructuredAnswer {
    fn from(instruction: Instruction) -> Self {
        Self {
            text: instruction.text,
            source_neuron_ids: instruction.source_neuron_ids.into_iter().map(|id| id.0).collect(),
            brain_name: instruction.brain_name,
            query: instruction.query,
        }
    }
}

pub struct QueryBrainTool {
    service: Arc<dyn QueryService>,
}

impl QueryBrainTool {
    pub const NAME: &'static str = "QueryBrainTool";

    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self { service }
    }

    pub async fn answer(&self, input: &str) -> Result<String, FacadeError> {
        Ok(self.answer_structured(input).await?.text)
    }

    pub async fn answer_structured(&self, input: &str) -> Result<StructuredAnswer, FacadeError> {
        let request = parse_request(input)?;
        self.answer_request(request).await
    }

    /// Skip parsing when the caller already holds a typed request.
    pub async fn answer_request(&self, request: QueryRequest) -> Result<StructuredAnswer, FacadeError> {
        let outcome = self.service.answer(request).await?;
        Ok(outcome.instruction.into())
    }
}

#[async_trait]
impl QueryFacade for QueryBrainTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, input: &str) -> Result<String, FacadeError> {
        self.answer(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::query_service::{QueryError, QueryOutcome};
    use crate::domain::activation::ActivationResult;
    use crate::domain::brain::{BrainRevision, RegistryError};
    use crate::domain::instruction::InstructionKind;
    use crate::domain::neuron::NeuronId;
    use crate::domain::query::QueryId;
    use crate::presentation::request_parser::RequestError;
    use chrono::Utc;
    use parking_lot::Mutex;

    /// Records the request and answers with a fixed instruction.
    #[derive(Default)]
    struct StubService {
        seen: Mutex<Vec<QueryRequest>>,
    }

    #[async_trait]
    impl QueryService for StubService {
        async fn answer(&self, request: QueryRequest) -> Result<QueryOutcome, QueryError> {
            self.seen.lock().push(request.clone());
            if request.brain != "pets" {
                return Err(RegistryError::BrainNotFound(request.brain).into());
            }
            Ok(QueryOutcome {
                query_id: QueryId::new(),
                instruction: Instruction {
                    text: "Feed the cat twice a day.".to_string(),
                    source_neuron_ids: vec![NeuronId::new("cats.txt", 0)],
                    query: request.query.clone(),
                    brain_name: request.brain.clone(),
                    kind: InstructionKind::Synthesized,
                },
                activation: ActivationResult {
                    query: request.query,
                    brain_name: request.brain,
                    brain_revision: BrainRevision(1),
                    activated: vec![],
                    threshold_used: 0.0,
                    scored_count: 0,
                    failed_count: 0,
                    timestamp: Utc::now(),
                },
                cached: false,
            })
        }
    }

    #[tokio::test]
    async fn test_answer_and_structured_answer() {
        let service = Arc::new(StubService::default());
        let tool = QueryBrainTool::new(service.clone());

        assert_eq!(
            tool.answer("brain=pets query=how often do I feed the cat?").await.unwrap(),
            "Feed the cat twice a day."
        );

        let structured = tool
            .answer_structured(r#"{"brain": "pets", "query": "cats", "persona_id": "senior_engineer"}"#)
            .await
            .unwrap();
        assert_eq!(structured.source_neuron_ids, vec!["cats.txt#0"]);
        assert_eq!(structured.brain_name, "pets");
        assert_eq!(service.seen.lock()[1].persona_id.as_deref(), Some("senior_engineer"));
    }

    #[tokio::test]
    async fn test_errors_are_reported_through_facade() {
        let service = Arc::new(StubService::default());
        let tool = QueryBrainTool::new(service.clone());

        assert!(matches!(
            tool.handle("query=cats").await,
            Err(FacadeError::Request(RequestError::MissingField("brain")))
        ));
        assert!(service.seen.lock().is_empty());

        let err = tool.handle("brain=zoo query=cats").await.unwrap_err();
        assert!(err.to_string().contains("resolve"));
        assert_eq!(tool.name(), "QueryBrainTool");
    }
}
