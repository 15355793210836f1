// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Brain Agent Configuration
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing:
// - registry behaviour (empty directories, chunk unit, file size limit)
// - scoring and generation strategies
// - LLM providers and model aliases
// - default cognize/instruct settings and the query cache
// - persona/mode catalog extensions
// - brains to register at startup
// - logging

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::activation::CognizeConfig;
use crate::domain::brain::EmptyDirectoryPolicy;
use crate::domain::chunking::{ChunkUnit, ChunkingPolicy};
use crate::domain::instruction::InstructConfig;
use crate::domain::persona::{PersonaCatalog, PromptBlock};

pub const API_VERSION: &str = "brain-agent/v1";
pub const KIND: &str = "BrainAgentConfig";

pub const ENV_CONFIG_PATH: &str = "BRAIN_AGENT_CONFIG_PATH";
pub const ENV_DEBUG: &str = "BRAIN_AGENT_DEBUG";
pub const ENV_DATA_DIR: &str = "BRAIN_AGENT_DATA_DIR";
pub const ENV_CACHE: &str = "BRAIN_AGENT_CACHE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainAgentConfigManifest {
    /// Must be "brain-agent/v1"
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Must be "BrainAgentConfig"
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: BrainAgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Content under `spec:`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrainAgentConfig {
    /// Base directory for relative brain directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub llm_providers: Vec<LLMProviderConfig>,

    #[serde(default)]
    pub llm_selection: LLMSelection,

    /// Defaults applied when a query does not carry its own settings
    #[serde(default)]
    pub cognize: CognizeConfig,

    #[serde(default)]
    pub instruct: InstructConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Added to (or replacing entries of) the built-in persona catalog
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub personas: Vec<PromptBlock>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modes: Vec<PromptBlock>,

    /// Brains registered at startup
    #[serde(default)]
    pub brains: Vec<BrainEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub empty_directory: EmptyDirectoryPolicy,

    /// Unit used for positive chunk sizes
    #[serde(default)]
    pub chunk_unit: ChunkUnit,

    /// Files larger than this are skipped (bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            empty_directory: EmptyDirectoryPolicy::default(),
            chunk_unit: ChunkUnit::default(),
            max_file_size: default_max_file_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringStrategy {
    #[default]
    Lexical,
    Llm,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoringConfig {
    #[serde(default)]
    pub strategy: ScoringStrategy,

    /// Model alias used when `strategy: llm`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStrategy {
    #[default]
    Extractive,
    Llm,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    #[serde(default)]
    pub strategy: GenerationStrategy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMProviderConfig {
    /// Unique provider name (e.g., "ollama-local", "openai")
    pub name: String,

    /// "openai", "openai-compatible" or "ollama"
    #[serde(rename = "type")]
    pub provider_type: String,

    pub endpoint: String,

    /// Supports "env:VAR_NAME"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name referenced from `scoring.model` / `generation.model`
    pub alias: String,

    /// Provider-side model identifier
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMSelection {
    /// Provider tried when the primary for an alias keeps failing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_provider: Option<String>,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for LLMSelection {
    fn default() -> Self {
        Self {
            fallback_provider: None,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainEntry {
    pub name: String,

    /// Absolute, or relative to `data_dir`
    pub directory: PathBuf,

    /// -1 for whole-file neurons
    #[serde(default = "default_chunk_size")]
    pub chunk_size: i64,

    /// Overrides `registry.chunk_unit` for this brain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_unit: Option<ChunkUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// e.g. "info", "debug", "brain_core=trace"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024
}

fn default_cache_capacity() -> usize {
    128
}

fn default_chunk_size() -> i64 {
    -1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for BrainAgentConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "brain-agent".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: BrainAgentConfig::default(),
        }
    }
}

impl BrainAgentConfig {
    /// Built-in personas and modes overlaid with the configured entries.
    pub fn persona_catalog(&self) -> PersonaCatalog {
        let mut catalog = PersonaCatalog::with_defaults();
        for persona in &self.personas {
            catalog.add_persona(persona.clone());
        }
        for mode in &self.modes {
            catalog.add_mode(mode.clone());
        }
        catalog
    }

    /// Chunking policy for a configured brain entry.
    pub fn chunking_for(&self, entry: &BrainEntry) -> Result<ChunkingPolicy, crate::domain::brain::RegistryError> {
        ChunkingPolicy::from_chunk_size(
            entry.chunk_size,
            entry.chunk_unit.unwrap_or(self.registry.chunk_unit),
        )
    }

    pub fn logging(&self) -> LoggingConfig {
        self.observability
            .as_ref()
            .and_then(|o| o.logging.clone())
            .unwrap_or_default()
    }

    fn logging_mut(&mut self) -> &mut LoggingConfig {
        self.observability
            .get_or_insert_with(ObservabilityConfig::default)
            .logging
            .get_or_insert_with(LoggingConfig::default)
    }

    /// Insert or replace the entry with the same name. Returns true on replace.
    pub fn upsert_brain(&mut self, entry: BrainEntry) -> bool {
        if let Some(existing) = self.brains.iter_mut().find(|b| b.name == entry.name) {
            *existing = entry;
            true
        } else {
            self.brains.push(entry);
            false
        }
    }

    /// Returns true when an entry was removed.
    pub fn remove_brain(&mut self, name: &str) -> bool {
        let before = self.brains.len();
        self.brains.retain(|b| b.name != name);
        before != self.brains.len()
    }
}

impl BrainAgentConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. BRAIN_AGENT_CONFIG_PATH environment variable
    /// 2. ./brain-agent.yaml (working directory)
    /// 3. ~/.brain_agent/config.yaml (user home)
    /// 4. /etc/brain-agent/config.yaml (system, Unix) or C:\ProgramData\BrainAgent\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./brain-agent.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/brain-agent/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\BrainAgent\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// `~/.brain_agent/config.yaml`, where registrations are written when no
    /// config file exists yet.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".brain_agent").join("config.yaml"))
    }

    /// Read the discovered (or explicit) file as stored, without environment
    /// overrides. Falls back to defaults when no file exists.
    pub fn load_stored(cli_path: Option<PathBuf>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = cli_path {
            let config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            return Ok((config, Some(path)));
        }

        match Self::discover_config() {
            Some(config_path) => {
                let config = Self::from_yaml_file(&config_path).map_err(|e| {
                    anyhow::anyhow!("Failed to load config at {:?}: {}", config_path, e)
                })?;
                Ok((config, Some(config_path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) -> Vec<EnvOverride> {
        self.apply_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides read through `lookup`. Nothing is logged here: the
    /// returned list is reported once logging is up.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<EnvOverride> {
        let mut applied = Vec::new();

        if let Some(val) = lookup(ENV_DEBUG) {
            match parse_bool(&val) {
                Some(debug) => {
                    self.spec.logging_mut().level = if debug {
                        "debug".to_string()
                    } else {
                        default_log_level()
                    };
                    applied.push(EnvOverride::Applied { var: ENV_DEBUG, value: val });
                }
                None => applied.push(EnvOverride::Ignored {
                    var: ENV_DEBUG,
                    value: val,
                    expected: "1/0",
                }),
            }
        }

        if let Some(val) = lookup(ENV_DATA_DIR) {
            if !val.trim().is_empty() {
                self.spec.data_dir = Some(PathBuf::from(&val));
                applied.push(EnvOverride::Applied { var: ENV_DATA_DIR, value: val });
            }
        }

        if let Some(val) = lookup(ENV_CACHE) {
            match parse_bool(&val) {
                Some(enabled) => {
                    self.spec.cache.enabled = enabled;
                    applied.push(EnvOverride::Applied { var: ENV_CACHE, value: val });
                }
                None => applied.push(EnvOverride::Ignored {
                    var: ENV_CACHE,
                    value: val,
                    expected: "true/false",
                }),
            }
        }

        applied
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let spec = &self.spec;

        if spec.registry.max_file_size == 0 {
            anyhow::bail!("spec.registry.max_file_size must be greater than zero");
        }

        spec.cognize
            .validate()
            .map_err(|e| anyhow::anyhow!("spec.cognize: {}", e))?;
        spec.instruct
            .validate()
            .map_err(|e| anyhow::anyhow!("spec.instruct: {}", e))?;

        if spec.cache.enabled && spec.cache.capacity == 0 {
            anyhow::bail!("spec.cache.capacity must be greater than zero when the cache is enabled");
        }

        let mut aliases = HashSet::new();
        for provider in &spec.llm_providers {
            if provider.name.is_empty() {
                anyhow::bail!("LLM provider name cannot be empty");
            }

            if provider.endpoint.is_empty() {
                anyhow::bail!("LLM provider endpoint cannot be empty for: {}", provider.name);
            }

            if provider.models.is_empty() {
                anyhow::bail!("LLM provider must have at least one model: {}", provider.name);
            }

            for model in &provider.models {
                if model.alias.is_empty() {
                    anyhow::bail!("Model alias cannot be empty in provider: {}", provider.name);
                }

                if model.model.is_empty() {
                    anyhow::bail!("Model identifier cannot be empty for alias: {}", model.alias);
                }

                if provider.enabled {
                    aliases.insert(model.alias.as_str());
                }
            }
        }

        if let Some(fallback_provider) = &spec.llm_selection.fallback_provider {
            if !spec.llm_providers.iter().any(|p| &p.name == fallback_provider) {
                anyhow::bail!("Fallback provider '{}' not found in llm_providers", fallback_provider);
            }
        }

        if spec.scoring.strategy == ScoringStrategy::Llm {
            let alias = spec
                .scoring
                .model
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("spec.scoring.model is required when strategy is llm"))?;
            if !aliases.contains(alias) {
                anyhow::bail!("Scoring model alias '{}' not found in enabled llm_providers", alias);
            }
        }

        if spec.generation.strategy == GenerationStrategy::Llm {
            let alias = spec
                .generation
                .model
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("spec.generation.model is required when strategy is llm"))?;
            if !aliases.contains(alias) {
                anyhow::bail!("Generation model alias '{}' not found in enabled llm_providers", alias);
            }
        }

        for block in spec.personas.iter().chain(spec.modes.iter()) {
            if block.id.trim().is_empty() {
                anyhow::bail!("Persona/mode id cannot be empty");
            }
        }

        let mut names = HashSet::new();
        for entry in &spec.brains {
            if entry.name.trim().is_empty() {
                anyhow::bail!("Brain name cannot be empty");
            }
            if !names.insert(entry.name.as_str()) {
                anyhow::bail!("Duplicate brain name: {}", entry.name);
            }
            spec.chunking_for(entry)
                .map_err(|e| anyhow::anyhow!("Brain '{}': {}", entry.name, e))?;
        }

        if let Some(logging) = spec.observability.as_ref().and_then(|o| o.logging.as_ref()) {
            if logging.format != "text" && logging.format != "json" {
                anyhow::bail!("Invalid logging format: '{}'. Must be 'text' or 'json'", logging.format);
            }
        }

        Ok(())
    }
}

/// An environment variable consulted while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOverride {
    Applied { var: &'static str, value: String },
    Ignored { var: &'static str, value: String, expected: &'static str },
}

impl fmt::Display for EnvOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvOverride::Applied { var, value } => write!(f, "Environment override: {}={}", var, value),
            EnvOverride::Ignored { var, value, expected } => {
                write!(f, "Invalid value for {}: '{}'. Expected {}. Ignoring.", var, value, expected)
            }
        }
    }
}

/// Configuration as loaded at startup.
///
/// `stored` is the file content (or defaults) and is what gets written back;
/// `effective` additionally carries the environment overrides and is what
/// the runtime uses.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub stored: BrainAgentConfigManifest,
    pub effective: BrainAgentConfigManifest,
    pub path: Option<PathBuf>,
    pub overrides: Vec<EnvOverride>,
}

impl LoadedConfig {
    /// Load configuration with discovery, fallback to default, then apply
    /// environment overrides.
    pub fn load(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let (stored, path) = BrainAgentConfigManifest::load_stored(cli_path)?;
        Ok(Self::with_overrides(stored, path, |var| std::env::var(var).ok()))
    }

    pub fn with_overrides(
        stored: BrainAgentConfigManifest,
        path: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut effective = stored.clone();
        let overrides = effective.apply_overrides_from(lookup);
        Self {
            stored,
            effective,
            path,
            overrides,
        }
    }

    /// A manifest used as-is, with no environment consulted.
    pub fn from_manifest(manifest: BrainAgentConfigManifest, path: Option<PathBuf>) -> Self {
        Self::with_overrides(manifest, path, |_| None)
    }

    /// Report where configuration came from and which overrides applied.
    pub fn log_summary(&self) {
        match &self.path {
            Some(path) => tracing::info!("Loaded configuration from {:?}", path),
            None => tracing::debug!("No configuration file found in standard locations. Using defaults."),
        }
        for entry in &self.overrides {
            match entry {
                EnvOverride::Applied { .. } => tracing::info!("{}", entry),
                EnvOverride::Ignored { .. } => tracing::warn!("{}", entry),
            }
        }
    }

    /// Record a brain in both views; only `stored` is ever persisted.
    pub fn upsert_brain(&mut self, entry: BrainEntry) {
        self.stored.spec.upsert_brain(entry.clone());
        self.effective.spec.upsert_brain(entry);
    }

    /// Returns true when the stored manifest had the entry.
    pub fn remove_brain(&mut self, name: &str) -> bool {
        self.effective.spec.remove_brain(name);
        self.stored.spec.remove_brain(name)
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn brain(name: &str, chunk_size: i64) -> BrainEntry {
        BrainEntry {
            name: name.to_string(),
            directory: PathBuf::from("docs"),
            chunk_size,
            chunk_unit: None,
        }
    }

    #[test]
    fn test_default_manifest() {
        let manifest = BrainAgentConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert!(!manifest.spec.cache.enabled);
        assert_eq!(manifest.spec.registry.max_file_size, 5 * 1024 * 1024);
        assert_eq!(manifest.spec.scoring.strategy, ScoringStrategy::Lexical);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r#"
apiVersion: brain-agent/v1
kind: BrainAgentConfig
metadata:
  name: research
spec:
  data_dir: /srv/brains
  registry:
    empty_directory: accept
    chunk_unit: lines
  scoring:
    strategy: llm
    model: judge
  llm_providers:
    - name: local
      type: ollama
      endpoint: http://localhost:11434
      models:
        - alias: judge
          model: llama3.2
  cognize:
    top_k: 5
    query_timeout: 30s
  cache:
    enabled: true
  brains:
    - name: handbook
      directory: handbook
      chunk_size: 40
"#;
        let manifest = BrainAgentConfigManifest::from_yaml_str(yaml).unwrap();
        assert!(manifest.validate().is_ok());
        let spec = &manifest.spec;
        assert_eq!(spec.registry.empty_directory, EmptyDirectoryPolicy::Accept);
        assert_eq!(spec.cognize.query_timeout, Some(Duration::from_secs(30)));
        assert_eq!(spec.cache.capacity, 128);
        let policy = spec.chunking_for(&spec.brains[0]).unwrap();
        assert_eq!(policy.unit_label(), "lines");
        assert_eq!(policy.chunk_size(), 40);
    }

    #[test]
    fn test_validation() {
        let mut manifest = BrainAgentConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "WrongKind".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.brains = vec![brain("a", -1), brain("a", 10)];
        assert!(manifest.validate().is_err());

        manifest.spec.brains = vec![brain("a", 0)];
        assert!(manifest.validate().is_err());

        manifest.spec.brains = vec![brain("a", 10)];
        assert!(manifest.validate().is_ok());

        manifest.spec.generation.strategy = GenerationStrategy::Llm;
        manifest.spec.generation.model = Some("writer".to_string());
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_upsert_and_remove_brain() {
        let mut spec = BrainAgentConfig::default();
        assert!(!spec.upsert_brain(brain("a", -1)));
        assert!(spec.upsert_brain(brain("a", 20)));
        assert_eq!(spec.brains.len(), 1);
        assert_eq!(spec.brains[0].chunk_size, 20);
        assert!(spec.remove_brain("a"));
        assert!(!spec.remove_brain("a"));
    }

    #[test]
    fn test_env_overrides_leave_stored_manifest_untouched() {
        let mut stored = BrainAgentConfigManifest::default();
        stored.spec.brains.push(brain("docs", -1));
        let env = |var: &str| match var {
            ENV_DATA_DIR => Some("/srv/override".to_string()),
            ENV_DEBUG => Some("1".to_string()),
            ENV_CACHE => Some("maybe".to_string()),
            _ => None,
        };

        let mut loaded = LoadedConfig::with_overrides(stored, None, env);
        assert_eq!(loaded.effective.spec.data_dir, Some(PathBuf::from("/srv/override")));
        assert_eq!(loaded.effective.spec.logging().level, "debug");
        assert!(!loaded.effective.spec.cache.enabled);
        assert_eq!(loaded.overrides.len(), 3);
        assert!(matches!(loaded.overrides[2], EnvOverride::Ignored { var: ENV_CACHE, .. }));

        loaded.upsert_brain(brain("notes", 10));
        assert_eq!(loaded.stored.spec.data_dir, None);
        assert!(loaded.stored.spec.observability.is_none());
        assert_eq!(loaded.stored.spec.brains.len(), 2);
        assert_eq!(loaded.effective.spec.brains.len(), 2);

        assert!(loaded.remove_brain("docs"));
        assert!(!loaded.remove_brain("docs"));
        assert_eq!(loaded.effective.spec.brains.len(), 1);
    }

    #[test]
    fn test_persona_overrides() {
        let mut spec = BrainAgentConfig::default();
        spec.personas.push(PromptBlock {
            id: "senior_engineer".to_string(),
            name: "Engineer".to_string(),
            description: String::new(),
            prompt_block: "Be terse.".to_string(),
        });
        let catalog = spec.persona_catalog();
        assert_eq!(catalog.persona("senior_engineer").unwrap().prompt_block, "Be terse.");
        assert_eq!(catalog.personas().count(), 3);
    }
}
