// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Brain Registry
//!
//! Injectable name → [`Brain`] store. Each instance is isolated; there is no
//! process-wide registry.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Brain lifecycle (register, replace, lookup, unregister)
//! - **Collaborators:**
//!   - Domain: Brain aggregate, ChunkingPolicy
//!   - Infrastructure: BrainLoader, EventBus
//!   - Application: QueryCache (invalidation)
//!
//! # Concurrency
//!
//! Brains are built from disk without holding any lock, then published by
//! swapping the `Arc<Brain>` in under a short write lock. Readers holding the
//! previous `Arc` keep a consistent snapshot. Revisions are issued inside the
//! write lock so they increase in publication order.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::query_cache::QueryCache;
use crate::domain::brain::{Brain, BrainRevision, BrainSummary, EmptyDirectoryPolicy, RegistryError};
use crate::domain::chunking::{ChunkUnit, ChunkingPolicy};
use crate::domain::events::BrainLifecycleEvent;
use crate::infrastructure::brain_loader::BrainLoader;
use crate::infrastructure::event_bus::EventBus;

pub struct BrainRegistry {
    brains: RwLock<HashMap<String, Arc<Brain>>>,
    last_revision: AtomicU64,
    loader: BrainLoader,
    empty_directory: EmptyDirectoryPolicy,
    chunk_unit: ChunkUnit,
    cache: Option<Arc<QueryCache>>,
    event_bus: Arc<EventBus>,
}

impl BrainRegistry {
    pub fn new() -> Self {
        Self {
            brains: RwLock::new(HashMap::new()),
            last_revision: AtomicU64::new(0),
            loader: BrainLoader::new(),
            empty_directory: EmptyDirectoryPolicy::default(),
            chunk_unit: ChunkUnit::default(),
            cache: None,
            event_bus: Arc::new(EventBus::default()),
        }
    }

    pub fn with_loader(mut self, loader: BrainLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_empty_directory_policy(mut self, policy: EmptyDirectoryPolicy) -> Self {
        self.empty_directory = policy;
        self
    }

    /// Unit used by [`register_brain`](Self::register_brain) for positive chunk sizes.
    pub fn with_chunk_unit(mut self, unit: ChunkUnit) -> Self {
        self.chunk_unit = unit;
        self
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Build a brain from `directory` and publish it under `name`.
    ///
    /// `chunk_size` is `-1` for whole-file neurons or a positive window size
    /// in the registry's chunk unit. An existing brain with the same name is
    /// replaced atomically.
    pub fn register_brain(
        &self,
        directory: impl AsRef<Path>,
        name: &str,
        chunk_size: i64,
    ) -> Result<Arc<Brain>, RegistryError> {
        let policy = ChunkingPolicy::from_chunk_size(chunk_size, self.chunk_unit)?;
        self.register_brain_with(directory, name, policy)
    }

    pub fn register_brain_with(
        &self,
        directory: impl AsRef<Path>,
        name: &str,
        chunking: ChunkingPolicy,
    ) -> Result<Arc<Brain>, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::InvalidBrainName(name.to_string()));
        }

        let directory = directory.as_ref();
        let source_directory = self.loader.resolve_directory(directory);
        let documents = self.loader.load_documents(directory)?;

        if documents.is_empty() && self.empty_directory == EmptyDirectoryPolicy::Reject {
            return Err(RegistryError::EmptyDirectory(source_directory));
        }

        let mut brain = Brain::build(name, &source_directory, &documents, chunking, BrainRevision(0));

        let (brain, replaced) = {
            let mut brains = self.brains.write();
            brain.revision = BrainRevision(self.last_revision.fetch_add(1, Ordering::SeqCst) + 1);
            let brain = Arc::new(brain);
            let replaced = brains.insert(name.to_string(), brain.clone()).is_some();
            (brain, replaced)
        };

        if let Some(cache) = &self.cache {
            cache.invalidate_brain(name);
        }

        info!(
            brain = %name,
            revision = %brain.revision,
            neurons = brain.len(),
            replaced,
            "Registered brain from {:?}",
            brain.source_directory
        );

        self.event_bus.publish_brain_event(BrainLifecycleEvent::BrainRegistered {
            name: name.to_string(),
            revision: brain.revision,
            neuron_count: brain.len(),
            replaced,
            registered_at: Utc::now(),
        });

        Ok(brain)
    }

    /// Names are trimmed here and in every other lookup, matching registration.
    pub fn get_brain(&self, name: &str) -> Result<Arc<Brain>, RegistryError> {
        let name = name.trim();
        self.brains
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::BrainNotFound(name.to_string()))
    }

    /// Remove `name` if present. Returns whether a brain was removed.
    pub fn unregister_brain(&self, name: &str) -> bool {
        let name = name.trim();
        let removed = self.brains.write().remove(name).is_some();

        if removed {
            if let Some(cache) = &self.cache {
                cache.invalidate_brain(name);
            }
            info!(brain = %name, "Unregistered brain");
            self.event_bus.publish_brain_event(BrainLifecycleEvent::BrainUnregistered {
                name: name.to_string(),
                unregistered_at: Utc::now(),
            });
        } else {
            debug!(brain = %name, "Unregister requested for unknown brain");
        }

        removed
    }

    /// Summaries of every registered brain, sorted by name.
    pub fn list_brains(&self) -> Vec<BrainSummary> {
        let mut summaries: Vec<_> = self.brains.read().values().map(|b| b.summary()).collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.brains.read().contains_key(name.trim())
    }

    pub fn len(&self) -> usize {
        self.brains.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.brains.read().is_empty()
    }

    /// Drop every brain and cached answer. Revisions keep increasing.
    pub fn reset(&self) {
        self.brains.write().clear();
        if let Some(cache) = &self.cache {
            cache.clear();
        }
        debug!("Brain registry reset");
    }
}

impl Default for BrainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::event_bus::DomainEvent;
    use std::fs;

    fn pets_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "A talks about cats.").unwrap();
        fs::write(dir.path().join("b.txt"), "B talks about rockets.").unwrap();
        dir
    }

    #[test]
    fn test_register_and_get() {
        let dir = pets_dir();
        let registry = BrainRegistry::new();
        let brain = registry.register_brain(dir.path(), "pets", -1).unwrap();

        assert_eq!(brain.len(), 2);
        assert!(registry.contains("pets"));
        assert_eq!(registry.get_brain("pets").unwrap().revision, brain.revision);
    }

    #[test]
    fn test_unknown_brain() {
        let registry = BrainRegistry::new();
        assert!(matches!(
            registry.get_brain("nope"),
            Err(RegistryError::BrainNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_names_are_trimmed_on_every_lookup() {
        let dir = pets_dir();
        let registry = BrainRegistry::new();
        let brain = registry.register_brain(dir.path(), " pets ", -1).unwrap();
        assert_eq!(brain.name, "pets");

        assert!(registry.contains("pets"));
        assert!(registry.contains(" pets"));
        assert_eq!(registry.get_brain("pets ").unwrap().revision, brain.revision);
        assert!(registry.unregister_brain("\tpets\n"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_inputs() {
        let dir = pets_dir();
        let registry = BrainRegistry::new();
        assert!(matches!(
            registry.register_brain(dir.path(), "  ", -1),
            Err(RegistryError::InvalidBrainName(_))
        ));
        assert!(matches!(
            registry.register_brain(dir.path(), "pets", 0),
            Err(RegistryError::InvalidChunkSize(0))
        ));
        assert!(matches!(
            registry.register_brain(dir.path().join("missing"), "pets", -1),
            Err(RegistryError::DirectoryNotFound(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reregistration_replaces_with_newer_revision() {
        let dir = pets_dir();
        let registry = BrainRegistry::new();
        let first = registry.register_brain(dir.path(), "pets", -1).unwrap();
        let second = registry.register_brain(dir.path(), "pets", 5).unwrap();

        assert!(second.revision > first.revision);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_brain("pets").unwrap().chunking.chunk_size(), 5);
        // the earlier snapshot is untouched
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let dir = pets_dir();
        let registry = BrainRegistry::new();
        registry.register_brain(dir.path(), "pets", -1).unwrap();
        assert!(registry.unregister_brain("pets"));
        assert!(!registry.unregister_brain("pets"));
        assert!(!registry.contains("pets"));
    }

    #[test]
    fn test_list_and_reset() {
        let dir = pets_dir();
        let registry = BrainRegistry::new();
        registry.register_brain(dir.path(), "zeta", -1).unwrap();
        registry.register_brain(dir.path(), "alpha", 4).unwrap();

        let names: Vec<_> = registry.list_brains().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        registry.reset();
        assert!(registry.list_brains().is_empty());
    }

    #[tokio::test]
    async fn test_registration_publishes_events() {
        let dir = pets_dir();
        let bus = Arc::new(EventBus::new(16));
        let mut receiver = bus.subscribe();
        let registry = BrainRegistry::new().with_event_bus(bus);

        registry.register_brain(dir.path(), "pets", -1).unwrap();
        registry.register_brain(dir.path(), "pets", -1).unwrap();
        registry.unregister_brain("pets");

        let mut replaced_flags = Vec::new();
        for _ in 0..2 {
            match receiver.recv().await.unwrap() {
                DomainEvent::Brain(BrainLifecycleEvent::BrainRegistered { replaced, .. }) => {
                    replaced_flags.push(replaced)
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(replaced_flags, vec![false, true]);
        assert!(matches!(
            receiver.recv().await.unwrap(),
            DomainEvent::Brain(BrainLifecycleEvent::BrainUnregistered { .. })
        ));
    }
}
