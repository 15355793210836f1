// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Brain Aggregate
//!
//! A named, ordered collection of [`Neuron`]s built once from a source
//! directory under a single [`ChunkingPolicy`].
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Aggregate root for neuron collections
//! - **Related:** `application/registry.rs` owns the lifecycle, `infrastructure/brain_loader.rs`
//!   supplies the source documents
//!
//! # Invariants
//!
//! - neuron ids are unique within a brain
//! - neuron order is traversal order of the source directory, then chunk index
//! - a brain never changes after construction; re-registration swaps in a new one

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::chunking::ChunkingPolicy;
use crate::domain::neuron::{metadata_keys, Neuron, NeuronId};

/// Registry-issued token that changes whenever a brain is (re)built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BrainRevision(pub u64);

impl fmt::Display for BrainRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// What registration does with a directory that yields no eligible files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmptyDirectoryPolicy {
    #[default]
    Reject,
    Accept,
}

/// A readable file discovered under a brain's source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    /// `/`-separated path relative to the source directory
    pub relative_path: String,
    pub text: String,
}

impl SourceDocument {
    pub fn file_type(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "text".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brain {
    pub name: String,
    pub neurons: Vec<Arc<Neuron>>,
    pub chunking: ChunkingPolicy,
    pub source_directory: PathBuf,
    pub revision: BrainRevision,
    pub built_at: DateTime<Utc>,
}

impl Brain {
    /// Chunk `documents` (already in traversal order) into neurons.
    pub fn build(
        name: impl Into<String>,
        source_directory: impl Into<PathBuf>,
        documents: &[SourceDocument],
        chunking: ChunkingPolicy,
        revision: BrainRevision,
    ) -> Self {
        let unit_label = chunking.unit_label();
        let mut neurons = Vec::new();

        for doc in documents {
            let chunks = chunking.split(&doc.text);
            let chunk_count = chunks.len().to_string();
            let file_type = doc.file_type();

            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                let mut metadata = BTreeMap::new();
                metadata.insert(metadata_keys::FILE_TYPE.to_string(), file_type.clone());
                metadata.insert(metadata_keys::RELATIVE_PATH.to_string(), doc.relative_path.clone());
                metadata.insert(metadata_keys::BYTE_START.to_string(), chunk.byte_start.to_string());
                metadata.insert(metadata_keys::BYTE_END.to_string(), chunk.byte_end.to_string());
                metadata.insert(metadata_keys::CHUNK_UNIT.to_string(), unit_label.clone());
                metadata.insert(metadata_keys::CHUNK_COUNT.to_string(), chunk_count.clone());

                neurons.push(Arc::new(Neuron {
                    id: NeuronId::new(&doc.relative_path, chunk_index),
                    content: chunk.text.to_string(),
                    source_path: doc.path.clone(),
                    chunk_index,
                    metadata,
                }));
            }
        }

        Self {
            name: name.into(),
            neurons,
            chunking,
            source_directory: source_directory.into(),
            revision,
            built_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn summary(&self) -> BrainSummary {
        BrainSummary {
            name: self.name.clone(),
            neuron_count: self.neurons.len(),
            chunk_size: self.chunking.chunk_size(),
            chunk_unit: self.chunking.unit_label(),
            source_directory: self.source_directory.clone(),
            revision: self.revision,
            built_at: self.built_at,
        }
    }
}

/// Listing view of a registered brain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainSummary {
    pub name: String,
    pub neuron_count: usize,
    pub chunk_size: i64,
    pub chunk_unit: String,
    pub source_directory: PathBuf,
    pub revision: BrainRevision,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Directory contains no eligible files: {}", .0.display())]
    EmptyDirectory(PathBuf),

    #[error("Brain not found: {0}")]
    BrainNotFound(String),

    #[error("Invalid chunk size: {0} (expected -1 or a positive integer)")]
    InvalidChunkSize(i64),

    #[error("Invalid brain name: {0:?}")]
    InvalidBrainName(String),

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        RegistryError::Io { path: path.to_path_buf(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chunking::ChunkUnit;
    use std::num::NonZeroUsize;

    fn doc(rel: &str, text: &str) -> SourceDocument {
        SourceDocument {
            path: PathBuf::from("/data").join(rel),
            relative_path: rel.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_whole_file_brain_has_one_neuron_per_document() {
        let docs = vec![doc("a.txt", "A talks about cats."), doc("b.txt", "B talks about rockets.")];
        let brain = Brain::build("pets", "/data", &docs, ChunkingPolicy::WholeFile, BrainRevision(1));

        assert_eq!(brain.len(), 2);
        assert_eq!(brain.neurons[0].id.as_str(), "a.txt#0");
        assert_eq!(brain.neurons[1].content, "B talks about rockets.");
        assert_eq!(brain.neurons[0].metadata[metadata_keys::FILE_TYPE], "txt");
        assert_eq!(brain.neurons[0].metadata[metadata_keys::CHUNK_UNIT], "file");
    }

    #[test]
    fn test_chunked_brain_metadata() {
        let policy = ChunkingPolicy::Fixed {
            size: NonZeroUsize::new(5).unwrap(),
            unit: ChunkUnit::Chars,
        };
        let brain = Brain::build("n", "/data", &[doc("notes/x.md", "0123456789ab")], policy, BrainRevision(7));

        assert_eq!(brain.len(), 3);
        let last = &brain.neurons[2];
        assert_eq!(last.id.as_str(), "notes/x.md#2");
        assert_eq!(last.chunk_index, 2);
        assert_eq!(last.content, "ab");
        assert_eq!(last.metadata[metadata_keys::BYTE_START], "10");
        assert_eq!(last.metadata[metadata_keys::CHUNK_COUNT], "3");
        assert_eq!(brain.summary().chunk_size, 5);
        assert_eq!(brain.summary().revision, BrainRevision(7));
    }

    #[test]
    fn test_extensionless_file_type_is_text() {
        assert_eq!(doc("README", "x").file_type(), "text");
        assert_eq!(doc("a.MD", "x").file_type(), "md");
    }
}
