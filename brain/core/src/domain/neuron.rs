// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Neuron
//!
//! The atomic content unit of a [`Brain`](crate::domain::brain::Brain): either a
//! whole file or one bounded chunk of it.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Immutable value object created during brain construction

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Stable identifier of a neuron within its owning brain.
///
/// Rendered as `<relative path>#<chunk index>`, with `/` separators on every
/// platform so ids are identical across hosts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NeuronId(pub String);

impl NeuronId {
    pub fn new(relative_path: &str, chunk_index: usize) -> Self {
        Self(format!("{}#{}", relative_path, chunk_index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Well-known metadata keys attached to every neuron.
pub mod metadata_keys {
    pub const FILE_TYPE: &str = "file_type";
    pub const RELATIVE_PATH: &str = "relative_path";
    pub const BYTE_START: &str = "byte_start";
    pub const BYTE_END: &str = "byte_end";
    pub const CHUNK_UNIT: &str = "chunk_unit";
    pub const CHUNK_COUNT: &str = "chunk_count";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    pub id: NeuronId,
    pub content: String,
    pub source_path: PathBuf,
    /// 0 for whole-file neurons
    pub chunk_index: usize,
    pub metadata: BTreeMap<String, String>,
}

impl Neuron {
    /// File name of the originating file, used when labelling synthesized sections.
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.to_string())
    }

    pub fn relative_path(&self) -> &str {
        self.metadata
            .get(metadata_keys::RELATIVE_PATH)
            .map(String::as_str)
            .unwrap_or_else(|| self.id.as_str())
    }
}
