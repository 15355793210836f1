// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Relevance Scorers
//!
//! Implementations of the [`RelevanceScorer`] port.
//!
//! - [`LexicalRelevanceScorer`]: deterministic, offline; the fraction of the
//!   query's distinct content terms that appear in the neuron
//! - [`LlmRelevanceScorer`]: asks a model to judge the neuron against the
//!   query and reply with `{"related_to": bool, "score": f64?, "reasoning": str}`

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::capability::{CapabilityError, RelevanceJudgement, RelevanceScorer};
use crate::domain::llm::GenerationOptions;
use crate::domain::persona::Steering;
use crate::infrastructure::llm::{parse_json_reply, ProviderRegistry};

const STOPWORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by", "can",
    "could", "describe", "do", "does", "explain", "for", "from", "give", "has", "have", "how", "i",
    "if", "in", "into", "is", "it", "its", "me", "my", "of", "on", "or", "our", "please", "show",
    "should", "so", "some", "tell", "than", "that", "the", "their", "them", "then", "there", "these",
    "they", "this", "to", "us", "was", "we", "what", "when", "where", "which", "who", "why", "will",
    "with", "would", "you", "your",
];

/// Lowercased content terms with stop-words removed and plurals folded.
pub fn content_terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .map(|t| fold_plural(&t))
        .filter(|t| t.chars().count() > 1)
        .collect()
}

fn fold_plural(term: &str) -> String {
    if term.len() > 4 && term.ends_with("ies") {
        format!("{}y", &term[..term.len() - 3])
    } else if term.len() > 3 && term.ends_with('s') && !term.ends_with("ss") && !term.ends_with("us") {
        term[..term.len() - 1].to_string()
    } else {
        term.to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexicalRelevanceScorer;

impl LexicalRelevanceScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn judge(&self, query: &str, content: &str) -> RelevanceJudgement {
        let query_terms = content_terms(query);
        if query_terms.is_empty() {
            return RelevanceJudgement::new(0.0).with_reasoning("query has no content terms");
        }

        let content_terms = content_terms(content);
        let matched: Vec<&str> = query_terms
            .iter()
            .filter(|t| content_terms.contains(*t))
            .map(String::as_str)
            .collect();

        let score = matched.len() as f64 / query_terms.len() as f64;
        let reasoning = if matched.is_empty() {
            "no query terms found".to_string()
        } else {
            format!("matched terms: {}", matched.join(", "))
        };
        RelevanceJudgement::new(score).with_reasoning(reasoning)
    }
}

#[async_trait]
impl RelevanceScorer for LexicalRelevanceScorer {
    async fn score(
        &self,
        query: &str,
        content: &str,
        _steering: &Steering,
    ) -> Result<RelevanceJudgement, CapabilityError> {
        Ok(self.judge(query, content))
    }

    fn name(&self) -> &str {
        "lexical"
    }
}

#[derive(Debug, Deserialize)]
struct JudgeReply {
    #[serde(default)]
    related_to: bool,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

const JUDGE_PROMPT: &str = "You are a NeuronAgent. Determine if your neuron content is related to the query. \
Respond with a JSON object with the keys 'related_to' (boolean), 'score' (number between 0 and 1 rating how \
relevant the content is) and 'reasoning' (string explaining why).";

pub struct LlmRelevanceScorer {
    providers: Arc<ProviderRegistry>,
    alias: String,
}

impl LlmRelevanceScorer {
    pub fn new(providers: Arc<ProviderRegistry>, alias: impl Into<String>) -> Self {
        Self {
            providers,
            alias: alias.into(),
        }
    }

    fn system_prompt(content: &str, steering: &Steering) -> String {
        let mut prompt = format!("{}\n\n<neuron content>\n{}\n</neuron content>", JUDGE_PROMPT, content);
        if !steering.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&steering.render());
        }
        prompt
    }
}

#[async_trait]
impl RelevanceScorer for LlmRelevanceScorer {
    async fn score(
        &self,
        query: &str,
        content: &str,
        steering: &Steering,
    ) -> Result<RelevanceJudgement, CapabilityError> {
        let options = GenerationOptions::default()
            .with_system_prompt(Self::system_prompt(content, steering))
            .json();

        let response = self
            .providers
            .generate(&self.alias, &format!("Query: {}", query), &options)
            .await?;

        let reply: JudgeReply = parse_json_reply(&response.text)
            .map_err(|e| CapabilityError::MalformedResponse(format!("{}: {}", e, response.text)))?;

        let score = if reply.related_to {
            reply.score.unwrap_or(1.0)
        } else {
            0.0
        };

        Ok(RelevanceJudgement {
            score,
            reasoning: reply.reasoning,
        })
    }

    fn name(&self) -> &str {
        "llm"
    }
}
