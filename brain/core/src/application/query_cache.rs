// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Query Result Cache
//!
//! In-memory LRU of `(ActivationResult, Instruction)` pairs.
//!
//! # Keys
//!
//! `(brain name, normalized query, config hash)` where the config hash is a
//! SHA-256 over the JSON form of the effective cognize and instruct configs
//! and the resolved steering. The query is normalized by trimming and
//! collapsing internal whitespace; case is preserved.
//!
//! # Staleness
//!
//! Each entry stores the brain revision it was computed against. A lookup
//! with a different revision misses and evicts the entry, and the registry
//! invalidates every entry for a brain when it is (re)registered or removed.

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use tracing::debug;

use crate::domain::activation::{ActivationResult, CognizeConfig};
use crate::domain::brain::BrainRevision;
use crate::domain::instruction::{InstructConfig, Instruction};
use crate::domain::persona::Steering;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub brain_name: String,
    pub normalized_query: String,
    pub config_hash: String,
}

#[derive(Serialize)]
struct HashedSettings<'a> {
    cognize: &'a CognizeConfig,
    instruct: &'a InstructConfig,
    steering: &'a Steering,
}

impl CacheKey {
    pub fn new(
        brain_name: &str,
        query: &str,
        cognize: &CognizeConfig,
        instruct: &InstructConfig,
        steering: &Steering,
    ) -> Self {
        let settings = HashedSettings { cognize, instruct, steering };
        // Serializing plain config structs cannot fail.
        let encoded = serde_json::to_vec(&settings).unwrap_or_default();
        let digest = Sha256::digest(&encoded);

        Self {
            brain_name: brain_name.to_string(),
            normalized_query: normalize_query(query),
            config_hash: hex::encode(digest),
        }
    }
}

pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone)]
pub struct CachedAnswer {
    pub revision: BrainRevision,
    pub activation: ActivationResult,
    pub instruction: Instruction,
}

pub struct QueryCache {
    entries: Mutex<LruCache<CacheKey, CachedAnswer>>,
}

impl QueryCache {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Entry for `key` if it was computed against `revision`.
    pub fn get(&self, key: &CacheKey, revision: BrainRevision) -> Option<CachedAnswer> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(hit) if hit.revision == revision => Some(hit.clone()),
            Some(_) => {
                debug!("Evicting stale cache entry for brain '{}'", key.brain_name);
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: CacheKey, answer: CachedAnswer) {
        self.entries.lock().put(key, answer);
    }

    /// Drop every entry for `brain_name`. Returns the number removed.
    pub fn invalidate_brain(&self, brain_name: &str) -> usize {
        let mut entries = self.entries.lock();
        let stale: Vec<CacheKey> = entries
            .iter()
            .filter(|(k, _)| k.brain_name == brain_name)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        if !stale.is_empty() {
            debug!("Invalidated {} cached answers for brain '{}'", stale.len(), brain_name);
        }
        stale.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn answer(brain: &str, revision: u64) -> CachedAnswer {
        CachedAnswer {
            revision: BrainRevision(revision),
            activation: ActivationResult {
                query: "q".to_string(),
                brain_name: brain.to_string(),
                brain_revision: BrainRevision(revision),
                activated: vec![],
                threshold_used: 0.0,
                scored_count: 0,
                failed_count: 0,
                timestamp: Utc::now(),
            },
            instruction: Instruction::no_relevant_knowledge("q", brain),
        }
    }

    fn key(brain: &str, query: &str) -> CacheKey {
        CacheKey::new(
            brain,
            query,
            &CognizeConfig::default(),
            &InstructConfig::default(),
            &Steering::default(),
        )
    }

    #[test]
    fn test_key_normalizes_whitespace_and_hashes_settings() {
        assert_eq!(key("b", "  tell me\n about   cats "), key("b", "tell me about cats"));
        assert_ne!(key("b", "Cats"), key("b", "cats"));

        let steered = CacheKey::new(
            "b",
            "cats",
            &CognizeConfig::default(),
            &InstructConfig::default(),
            &Steering { persona: Some("p".into()), mode: None },
        );
        assert_ne!(steered.config_hash, key("b", "cats").config_hash);
        assert_eq!(steered.config_hash.len(), 64);
    }

    #[test]
    fn test_stale_revision_misses() {
        let cache = QueryCache::new(4);
        cache.insert(key("b", "cats"), answer("b", 1));
        assert!(cache.get(&key("b", "cats"), BrainRevision(1)).is_some());
        assert!(cache.get(&key("b", "cats"), BrainRevision(2)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_brain() {
        let cache = QueryCache::new(8);
        cache.insert(key("a", "x"), answer("a", 1));
        cache.insert(key("a", "y"), answer("a", 1));
        cache.insert(key("b", "x"), answer("b", 1));
        assert_eq!(cache.invalidate_brain("a"), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = QueryCache::new(1);
        cache.insert(key("a", "x"), answer("a", 1));
        cache.insert(key("a", "y"), answer("a", 1));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("a", "x"), BrainRevision(1)).is_none());
    }
}
