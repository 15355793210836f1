// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Instruction Generators
//!
//! Implementations of the [`InstructionGenerator`] port.
//!
//! - [`ExtractiveGenerator`]: deterministic, offline; keeps the context lines
//!   that mention a query term, under their section headers
//! - [`LlmInstructionGenerator`]: asks a model for `{"instructions": "..."}`
//!   and falls back to the raw reply when it is not JSON

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::capability::{CapabilityError, InstructionGenerator};
use crate::domain::instruction::REASONING_LABEL;
use crate::domain::llm::GenerationOptions;
use crate::domain::persona::Steering;
use crate::infrastructure::llm::{parse_json_reply, strip_code_fences, ProviderRegistry};
use crate::infrastructure::scoring::content_terms;

#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

impl ExtractiveGenerator {
    pub fn new() -> Self {
        Self
    }

    fn is_header(line: &str) -> bool {
        line.starts_with("## ") || (line.starts_with("From ") && line.ends_with(':'))
    }

    pub fn extract(&self, context: &str, query: &str) -> String {
        let terms = content_terms(query);
        let mut out: Vec<&str> = Vec::new();
        let mut pending_header: Option<&str> = None;

        for line in context.lines() {
            let trimmed = line.trim_end();
            if Self::is_header(trimmed) {
                pending_header = Some(trimmed);
                continue;
            }
            if trimmed.trim().is_empty() || trimmed.starts_with(REASONING_LABEL) {
                continue;
            }
            let line_terms = content_terms(trimmed);
            if terms.iter().any(|t| line_terms.contains(t)) {
                if let Some(header) = pending_header.take() {
                    if !out.is_empty() {
                        out.push("");
                    }
                    out.push(header);
                }
                out.push(trimmed);
            }
        }

        if out.is_empty() {
            context.trim().to_string()
        } else {
            out.join("\n")
        }
    }
}

#[async_trait]
impl InstructionGenerator for ExtractiveGenerator {
    async fn generate(
        &self,
        context: &str,
        query: &str,
        _steering: &Steering,
    ) -> Result<String, CapabilityError> {
        Ok(self.extract(context, query))
    }

    fn name(&self) -> &str {
        "extractive"
    }
}

#[derive(Debug, Deserialize)]
struct InstructionsReply {
    #[serde(default)]
    instructions: serde_json::Value,
}

const INSTRUCT_PROMPT: &str =
    "You are a NeuronAgent. Generate instructions based on your neuron content and the query.";

pub struct LlmInstructionGenerator {
    providers: Arc<ProviderRegistry>,
    alias: String,
}

impl LlmInstructionGenerator {
    pub fn new(providers: Arc<ProviderRegistry>, alias: impl Into<String>) -> Self {
        Self {
            providers,
            alias: alias.into(),
        }
    }

    fn system_prompt(context: &str, steering: &Steering) -> String {
        let mut prompt = format!("{}\n\n<neuron content>\n{}\n</neuron content>", INSTRUCT_PROMPT, context);
        if !steering.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&steering.render());
        }
        prompt
    }

    fn user_prompt(query: &str) -> String {
        format!(
            "Query: {}\n\nHow does this query relate to the content you are the neuron for? \
             Focus on instructions: what guidance would you give for implementing or addressing \
             this query based on your neuron content? Respond with clear, actionable instructions \
             in a JSON object with an 'instructions' key.",
            query
        )
    }

    fn read_reply(text: &str) -> String {
        use serde_json::Value;

        match parse_json_reply::<InstructionsReply>(text).map(|r| r.instructions) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            Ok(v @ (Value::Array(_) | Value::Object(_))) => v.to_string(),
            _ => strip_code_fences(text).to_string(),
        }
    }
}

#[async_trait]
impl InstructionGenerator for LlmInstructionGenerator {
    async fn generate(
        &self,
        context: &str,
        query: &str,
        steering: &Steering,
    ) -> Result<String, CapabilityError> {
        let options = GenerationOptions::default()
            .with_system_prompt(Self::system_prompt(context, steering))
            .json();

        let response = self
            .providers
            .generate(&self.alias, &Self::user_prompt(query), &options)
            .await?;

        let text = Self::read_reply(&response.text);
        if text.trim().is_empty() {
            return Err(CapabilityError::MalformedResponse("empty instructions".to_string()));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keeps_matching_lines_under_headers() {
        let context = "## Neuron: a.txt#0 (score 1.00)\nA talks about cats.\nNothing else.\n\n\
                       ## Neuron: b.txt#0 (score 0.00)\nB talks about rockets.\n";
        let out = ExtractiveGenerator::new().extract(context, "Tell me about cats");
        assert_eq!(out, "## Neuron: a.txt#0 (score 1.00)\nA talks about cats.");
    }

    #[test]
    fn test_extract_skips_reasoning_lines() {
        let context = format!(
            "## Neuron: a.txt#0 (score 1.00)\n{} matched terms: cat\nA talks about cats.",
            REASONING_LABEL
        );
        let out = ExtractiveGenerator::new().extract(&context, "cats");
        assert_eq!(out, "## Neuron: a.txt#0 (score 1.00)\nA talks about cats.");
    }

    #[test]
    fn test_extract_falls_back_to_whole_context() {
        let out = ExtractiveGenerator::new().extract("  unrelated text \n", "cats");
        assert_eq!(out, "unrelated text");
    }

    #[test]
    fn test_read_reply_variants() {
        assert_eq!(
            LlmInstructionGenerator::read_reply("```json\n{\"instructions\": \"Feed the cat.\"}\n```"),
            "Feed the cat."
        );
        assert_eq!(LlmInstructionGenerator::read_reply("Just do it."), "Just do it.");
        assert_eq!(
            LlmInstructionGenerator::read_reply("{\"instructions\": [\"a\", \"b\"]}"),
            "[\"a\",\"b\"]"
        );
    }
}
