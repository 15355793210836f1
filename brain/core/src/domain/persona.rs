// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Personas and Modes
//!
//! Prompt blocks that steer how neurons are judged and how instructions are
//! phrased. A query may select a persona and a mode by id from the catalog,
//! or pass inline text; the id form wins when both are given.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Catalog of steering prompt blocks and per-query resolution

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBlock {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub prompt_block: String,
}

impl PromptBlock {
    fn new(id: &str, name: &str, description: &str, prompt_block: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            prompt_block: prompt_block.to_string(),
        }
    }
}

/// Resolved steering text handed to both capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Steering {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl Steering {
    pub fn is_empty(&self) -> bool {
        self.persona.is_none() && self.mode.is_none()
    }

    /// Prompt suffix appended to capability system prompts.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(persona) = &self.persona {
            out.push_str("Persona:\n");
            out.push_str(persona);
            out.push('\n');
        }
        if let Some(mode) = &self.mode {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("Mode:\n");
            out.push_str(mode);
            out.push('\n');
        }
        out
    }
}

/// Persona/mode selection as it arrives on a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SteeringSelection<'a> {
    pub persona_id: Option<&'a str>,
    pub persona: Option<&'a str>,
    pub mode_id: Option<&'a str>,
    pub mode: Option<&'a str>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SteeringError {
    #[error("Unknown persona id: {0}")]
    UnknownPersona(String),

    #[error("Unknown mode id: {0}")]
    UnknownMode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaCatalog {
    personas: BTreeMap<String, PromptBlock>,
    modes: BTreeMap<String, PromptBlock>,
}

impl Default for PersonaCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PersonaCatalog {
    pub fn empty() -> Self {
        Self {
            personas: BTreeMap::new(),
            modes: BTreeMap::new(),
        }
    }

    /// The built-in personas (`logical_philosopher`, `senior_scientist`,
    /// `senior_engineer`) and modes (`summarize`, `imagine`, `reify`).
    pub fn with_defaults() -> Self {
        let mut catalog = Self::empty();

        catalog.add_persona(PromptBlock::new(
            "logical_philosopher",
            "Logical Philosopher",
            "Rigorous logical analysis in the manner of an analytic philosopher.",
            "You are a seasoned analytic philosopher. Evaluate every claim with meticulous logic, \
             state premises explicitly, derive conclusions carefully and avoid rhetorical flourish.",
        ));
        catalog.add_persona(PromptBlock::new(
            "senior_scientist",
            "Senior Scientist",
            "Methodical, evidence-driven research scientist, cautious with claims.",
            "You are a senior research scientist. Approach problems with experimental rigor, reference \
             data when possible and articulate hypotheses and limitations clearly.",
        ));
        catalog.add_persona(PromptBlock::new(
            "senior_engineer",
            "Senior Engineer",
            "Pragmatic senior software engineer focused on real-world implementation.",
            "You are a senior software engineer. Provide concrete implementation guidance, highlight \
             edge cases and balance trade-offs pragmatically.",
        ));

        catalog.add_mode(PromptBlock::new(
            "summarize",
            "Summarize",
            "Summarize in granular detail how the neuron content relates to the query.",
            "Task: Provide a clear, structured summary. Separate 'Neuron Content' from 'Query' and then \
             explain, point by point, how the former relates to the latter.",
        ));
        catalog.add_mode(PromptBlock::new(
            "imagine",
            "Imagine",
            "The query describes an imaginary idea. Imagine how the neuron content could relate to it.",
            "Task: Think creatively. Describe potential connections, synergies or inspirations between \
             the neuron content and the imagined scenario in the query.",
        ));
        catalog.add_mode(PromptBlock::new(
            "reify",
            "Reify",
            "The query proposes a concrete idea. Detail how the neuron content can make it real.",
            "Task: Provide actionable steps and considerations to turn the query's idea into reality \
             using insights from the neuron content.",
        ));

        catalog
    }

    /// Insert or replace a persona.
    pub fn add_persona(&mut self, block: PromptBlock) {
        self.personas.insert(block.id.clone(), block);
    }

    /// Insert or replace a mode.
    pub fn add_mode(&mut self, block: PromptBlock) {
        self.modes.insert(block.id.clone(), block);
    }

    pub fn persona(&self, id: &str) -> Option<&PromptBlock> {
        self.personas.get(id)
    }

    pub fn mode(&self, id: &str) -> Option<&PromptBlock> {
        self.modes.get(id)
    }

    pub fn personas(&self) -> impl Iterator<Item = &PromptBlock> {
        self.personas.values()
    }

    pub fn modes(&self) -> impl Iterator<Item = &PromptBlock> {
        self.modes.values()
    }

    pub fn resolve(&self, selection: &SteeringSelection<'_>) -> Result<Steering, SteeringError> {
        let persona = match selection.persona_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => Some(
                self.persona(id)
                    .ok_or_else(|| SteeringError::UnknownPersona(id.to_string()))?
                    .prompt_block
                    .clone(),
            ),
            None => inline(selection.persona),
        };

        let mode = match selection.mode_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => Some(
                self.mode(id)
                    .ok_or_else(|| SteeringError::UnknownMode(id.to_string()))?
                    .prompt_block
                    .clone(),
            ),
            None => inline(selection.mode),
        };

        Ok(Steering { persona, mode })
    }
}

fn inline(text: Option<&str>) -> Option<String> {
    text.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_present() {
        let catalog = PersonaCatalog::with_defaults();
        assert_eq!(catalog.personas().count(), 3);
        assert_eq!(catalog.modes().count(), 3);
        assert!(catalog.persona("senior_engineer").is_some());
        assert!(catalog.mode("reify").is_some());
    }

    #[test]
    fn test_id_wins_over_inline_text() {
        let catalog = PersonaCatalog::with_defaults();
        let steering = catalog
            .resolve(&SteeringSelection {
                persona_id: Some("senior_scientist"),
                persona: Some("ignored"),
                mode_id: None,
                mode: Some("Be brief."),
            })
            .unwrap();
        assert!(steering.persona.unwrap().starts_with("You are a senior research scientist"));
        assert_eq!(steering.mode.as_deref(), Some("Be brief."));
    }

    #[test]
    fn test_unknown_id_is_rejected() {
        let catalog = PersonaCatalog::with_defaults();
        let err = catalog
            .resolve(&SteeringSelection { mode_id: Some("dream"), ..Default::default() })
            .unwrap_err();
        assert_eq!(err, SteeringError::UnknownMode("dream".to_string()));
    }

    #[test]
    fn test_render() {
        let steering = Steering { persona: Some("P".into()), mode: Some("M".into()) };
        assert_eq!(steering.render(), "Persona:\nP\n\nMode:\nM\n");
        assert_eq!(Steering::default().render(), "");
    }
}
