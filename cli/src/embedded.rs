// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-process brain runtime
//!
//! Builds the registry, capabilities and query service from a
//! `BrainAgentConfig` manifest, registers the configured brains and exposes
//! the two facades to the commands.
//!
//! The runtime works from the effective manifest (environment overrides
//! applied) but only ever writes the stored one back to disk.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use brain_core::application::cognize::ActivationEngine;
use brain_core::application::instruct::InstructionSynthesizer;
use brain_core::application::query_cache::QueryCache;
use brain_core::application::query_service::{QueryService, StandardQueryService};
use brain_core::application::registry::BrainRegistry;
use brain_core::domain::agent_config::{
    BrainAgentConfigManifest, BrainEntry, GenerationStrategy, LoadedConfig, ScoringStrategy,
};
use brain_core::domain::capability::{InstructionGenerator, RelevanceScorer};
use brain_core::infrastructure::brain_loader::BrainLoader;
use brain_core::infrastructure::event_bus::EventBus;
use brain_core::infrastructure::generation::{ExtractiveGenerator, LlmInstructionGenerator};
use brain_core::infrastructure::llm::ProviderRegistry;
use brain_core::infrastructure::scoring::{LexicalRelevanceScorer, LlmRelevanceScorer};
use brain_core::presentation::query_tool::QueryBrainTool;
use brain_core::presentation::replicant::SynthesizerReplicant;

pub struct BrainRuntime {
    config: LoadedConfig,
    registry: Arc<BrainRegistry>,
    service: Arc<StandardQueryService>,
    event_bus: Arc<EventBus>,
}

impl BrainRuntime {
    /// Validate the effective configuration, then build the runtime.
    pub fn new(config: LoadedConfig) -> Result<Self> {
        config
            .effective
            .validate()
            .context("Configuration validation failed")?;
        Self::build(config)
    }

    /// Build from a manifest used as-is, without consulting the environment.
    pub fn from_manifest(manifest: BrainAgentConfigManifest, config_path: Option<PathBuf>) -> Result<Self> {
        Self::build(LoadedConfig::from_manifest(manifest, config_path))
    }

    fn build(config: LoadedConfig) -> Result<Self> {
        let spec = &config.effective.spec;
        let event_bus = Arc::new(EventBus::with_default_capacity());
        let cache = spec
            .cache
            .enabled
            .then(|| Arc::new(QueryCache::new(spec.cache.capacity)));

        let loader = BrainLoader::new()
            .with_max_file_size(spec.registry.max_file_size)
            .with_data_dir(spec.data_dir.clone());
        let mut registry = BrainRegistry::new()
            .with_loader(loader)
            .with_empty_directory_policy(spec.registry.empty_directory)
            .with_chunk_unit(spec.registry.chunk_unit)
            .with_event_bus(event_bus.clone());
        if let Some(cache) = &cache {
            registry = registry.with_cache(cache.clone());
        }
        let registry = Arc::new(registry);

        let needs_llm =
            spec.scoring.strategy == ScoringStrategy::Llm || spec.generation.strategy == GenerationStrategy::Llm;
        let providers = if needs_llm {
            Some(Arc::new(
                ProviderRegistry::from_config(spec).context("Failed to initialize LLM providers")?,
            ))
        } else {
            None
        };

        let scorer: Arc<dyn RelevanceScorer> = match (&spec.scoring.strategy, &providers, &spec.scoring.model) {
            (ScoringStrategy::Llm, Some(providers), Some(alias)) => {
                ensure_alias(providers, alias, "scoring")?;
                Arc::new(LlmRelevanceScorer::new(providers.clone(), alias.clone()))
            }
            (ScoringStrategy::Llm, _, _) => anyhow::bail!("LLM scoring requires spec.scoring.model"),
            (ScoringStrategy::Lexical, _, _) => Arc::new(LexicalRelevanceScorer::new()),
        };

        let generator: Arc<dyn InstructionGenerator> =
            match (&spec.generation.strategy, &providers, &spec.generation.model) {
                (GenerationStrategy::Llm, Some(providers), Some(alias)) => {
                    ensure_alias(providers, alias, "generation")?;
                    Arc::new(LlmInstructionGenerator::new(providers.clone(), alias.clone()))
                }
                (GenerationStrategy::Llm, _, _) => anyhow::bail!("LLM generation requires spec.generation.model"),
                (GenerationStrategy::Extractive, _, _) => Arc::new(ExtractiveGenerator::new()),
            };
        debug!("Capabilities: scorer={}, generator={}", scorer.name(), generator.name());

        let mut service = StandardQueryService::new(
            registry.clone(),
            Arc::new(ActivationEngine::new(scorer)),
            Arc::new(InstructionSynthesizer::new(generator)),
        )
        .with_catalog(spec.persona_catalog())
        .with_cognize_defaults(spec.cognize.clone())
        .with_instruct_defaults(spec.instruct.clone())
        .with_event_bus(event_bus.clone());
        if let Some(cache) = cache {
            service = service.with_cache(cache);
        }

        let runtime = Self {
            registry,
            service: Arc::new(service),
            event_bus,
            config,
        };
        runtime.register_configured_brains();
        Ok(runtime)
    }

    /// A stale entry (e.g. a deleted directory) is logged and skipped.
    fn register_configured_brains(&self) {
        let spec = &self.config.effective.spec;
        for entry in &spec.brains {
            let result = spec
                .chunking_for(entry)
                .and_then(|chunking| self.registry.register_brain_with(&entry.directory, &entry.name, chunking));
            if let Err(e) = result {
                warn!("Skipping configured brain '{}': {}", entry.name, e);
            }
        }
    }

    /// The manifest in effect, environment overrides included.
    pub fn manifest(&self) -> &BrainAgentConfigManifest {
        &self.config.effective
    }

    pub fn registry(&self) -> &Arc<BrainRegistry> {
        &self.registry
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn service(&self) -> Arc<dyn QueryService> {
        self.service.clone()
    }

    pub fn query_tool(&self) -> QueryBrainTool {
        QueryBrainTool::new(self.service())
    }

    pub fn replicant(&self) -> SynthesizerReplicant {
        SynthesizerReplicant::new(self.service())
    }

    /// File registrations are written to: the loaded config, else the user config.
    pub fn persist_path(&self) -> Option<PathBuf> {
        self.config
            .path
            .clone()
            .or_else(BrainAgentConfigManifest::user_config_path)
    }

    /// Record a registration under `spec.brains` and save the stored manifest.
    pub fn persist_brain(&mut self, entry: BrainEntry) -> Result<PathBuf> {
        self.config.upsert_brain(entry);
        self.save()
    }

    /// Drop a brain from `spec.brains`. Returns the saved path when it was present.
    pub fn forget_brain(&mut self, name: &str) -> Result<Option<PathBuf>> {
        if self.config.remove_brain(name) {
            self.save().map(Some)
        } else {
            Ok(None)
        }
    }

    fn save(&self) -> Result<PathBuf> {
        let path = self
            .persist_path()
            .context("No configuration path available (home directory not found)")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        self.config
            .stored
            .to_yaml_file(&path)
            .with_context(|| format!("Failed to write configuration to {:?}", path))?;
        Ok(path)
    }
}

fn ensure_alias(providers: &ProviderRegistry, alias: &str, purpose: &str) -> Result<()> {
    if !providers.has_alias(alias) {
        anyhow::bail!(
            "LLM {} model '{}' has no initialized provider (available: {})",
            purpose,
            alias,
            providers.available_aliases().join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::domain::agent_config::{ENV_CACHE, ENV_DATA_DIR, ENV_DEBUG};
    use std::fs;

    fn manifest_with_brain(dir: &std::path::Path) -> BrainAgentConfigManifest {
        let mut manifest = BrainAgentConfigManifest::default();
        manifest.spec.brains.push(BrainEntry {
            name: "pets".to_string(),
            directory: dir.to_path_buf(),
            chunk_size: -1,
            chunk_unit: None,
        });
        manifest.spec.brains.push(BrainEntry {
            name: "gone".to_string(),
            directory: dir.join("missing"),
            chunk_size: -1,
            chunk_unit: None,
        });
        manifest
    }

    #[test]
    fn test_configured_brains_are_registered_and_stale_ones_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cats.txt"), "Cats purr.").unwrap();

        let runtime = BrainRuntime::from_manifest(manifest_with_brain(dir.path()), None).unwrap();
        assert!(runtime.registry().contains("pets"));
        assert!(!runtime.registry().contains("gone"));
    }

    #[test]
    fn test_persist_and_forget_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cats.txt"), "Cats purr.").unwrap();
        let config_path = dir.path().join("conf").join("brain-agent.yaml");

        let mut runtime =
            BrainRuntime::from_manifest(BrainAgentConfigManifest::default(), Some(config_path.clone())).unwrap();
        runtime
            .persist_brain(BrainEntry {
                name: "pets".to_string(),
                directory: dir.path().to_path_buf(),
                chunk_size: 200,
                chunk_unit: None,
            })
            .unwrap();

        let saved = BrainAgentConfigManifest::from_yaml_file(&config_path).unwrap();
        assert_eq!(saved.spec.brains.len(), 1);
        assert_eq!(saved.spec.brains[0].chunk_size, 200);

        assert!(runtime.forget_brain("pets").unwrap().is_some());
        assert!(runtime.forget_brain("pets").unwrap().is_none());
        let saved = BrainAgentConfigManifest::from_yaml_file(&config_path).unwrap();
        assert!(saved.spec.brains.is_empty());
    }

    #[test]
    fn test_persisting_does_not_write_environment_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cats.txt"), "Cats purr.").unwrap();
        let config_path = dir.path().join("brain-agent.yaml");
        BrainAgentConfigManifest::default().to_yaml_file(&config_path).unwrap();

        let (stored, path) = BrainAgentConfigManifest::load_stored(Some(config_path.clone())).unwrap();
        let env = |var: &str| match var {
            ENV_DATA_DIR => Some("/x".to_string()),
            ENV_DEBUG => Some("1".to_string()),
            ENV_CACHE => Some("true".to_string()),
            _ => None,
        };
        let mut runtime = BrainRuntime::new(LoadedConfig::with_overrides(stored, path, env)).unwrap();
        assert_eq!(runtime.manifest().spec.data_dir, Some(PathBuf::from("/x")));

        runtime
            .persist_brain(BrainEntry {
                name: "pets".to_string(),
                directory: dir.path().to_path_buf(),
                chunk_size: -1,
                chunk_unit: None,
            })
            .unwrap();

        let saved = BrainAgentConfigManifest::from_yaml_file(&config_path).unwrap();
        assert_eq!(saved.spec.brains.len(), 1);
        assert_eq!(saved.spec.data_dir, None);
        assert!(!saved.spec.cache.enabled);
        assert_eq!(saved.spec.logging().level, BrainAgentConfigManifest::default().spec.logging().level);
        assert!(runtime.manifest().spec.brains.iter().any(|b| b.name == "pets"));
    }

    #[test]
    fn test_llm_scoring_requires_an_initialized_alias() {
        let mut manifest = BrainAgentConfigManifest::default();
        manifest.spec.scoring.strategy = ScoringStrategy::Llm;
        manifest.spec.scoring.model = Some("judge".to_string());

        let err = BrainRuntime::from_manifest(manifest, None).err().unwrap();
        assert!(err.to_string().contains("'judge'"));
    }

    #[tokio::test]
    async fn test_runtime_answers_through_query_tool() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cats.txt"), "Cats purr when content.").unwrap();

        let runtime = BrainRuntime::from_manifest(manifest_with_brain(dir.path()), None).unwrap();
        let text = runtime.query_tool().answer("brain=pets query=why do cats purr").await.unwrap();
        assert!(text.contains("purr"));
    }
}
