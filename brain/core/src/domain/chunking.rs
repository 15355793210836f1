// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Chunking Policy
//!
//! Decides how a file's text is cut into neurons.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure splitting rules shared by every neuron of a brain
//!
//! # Rules
//!
//! - `chunk_size == -1` → one neuron per file, content is the full text
//! - `chunk_size > 0` → consecutive, non-overlapping windows of `chunk_size`
//!   units; a trailing empty window is never produced
//! - any other value is rejected
//!
//! The unit is either lines including their terminator ([`ChunkUnit::Lines`],
//! the default) or Unicode scalar values ([`ChunkUnit::Chars`]). A brain
//! records the unit it was built with so every neuron shares it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

use crate::domain::brain::RegistryError;

/// Sentinel chunk size meaning "whole file".
pub const WHOLE_FILE: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    Chars,
    #[default]
    Lines,
}

impl fmt::Display for ChunkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkUnit::Chars => f.write_str("chars"),
            ChunkUnit::Lines => f.write_str("lines"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChunkingPolicy {
    WholeFile,
    Fixed { size: NonZeroUsize, unit: ChunkUnit },
}

/// A slice of a file's text together with its byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub text: &'a str,
    pub byte_start: usize,
    pub byte_end: usize,
}

impl ChunkingPolicy {
    /// Build a policy from the registration-call convention (`-1` or `> 0`).
    pub fn from_chunk_size(chunk_size: i64, unit: ChunkUnit) -> Result<Self, RegistryError> {
        if chunk_size == WHOLE_FILE {
            return Ok(ChunkingPolicy::WholeFile);
        }
        let size = usize::try_from(chunk_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(RegistryError::InvalidChunkSize(chunk_size))?;
        Ok(ChunkingPolicy::Fixed { size, unit })
    }

    /// The registration-call form of this policy.
    pub fn chunk_size(&self) -> i64 {
        match self {
            ChunkingPolicy::WholeFile => WHOLE_FILE,
            ChunkingPolicy::Fixed { size, .. } => size.get() as i64,
        }
    }

    pub fn unit_label(&self) -> String {
        match self {
            ChunkingPolicy::WholeFile => "file".to_string(),
            ChunkingPolicy::Fixed { unit, .. } => unit.to_string(),
        }
    }

    /// Split `text` according to this policy. Empty text yields no chunks.
    pub fn split<'a>(&self, text: &'a str) -> Vec<Chunk<'a>> {
        if text.is_empty() {
            return Vec::new();
        }
        match self {
            ChunkingPolicy::WholeFile => vec![Chunk {
                text,
                byte_start: 0,
                byte_end: text.len(),
            }],
            ChunkingPolicy::Fixed { size, unit: ChunkUnit::Chars } => split_chars(text, size.get()),
            ChunkingPolicy::Fixed { size, unit: ChunkUnit::Lines } => split_lines(text, size.get()),
        }
    }
}

fn split_chars(text: &str, size: usize) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(Chunk { text: &text[start..idx], byte_start: start, byte_end: idx });
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(Chunk { text: &text[start..], byte_start: start, byte_end: text.len() });
    }
    chunks
}

fn split_lines(text: &str, size: usize) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut end = 0;
    let mut count = 0;

    for line in text.split_inclusive('\n') {
        end += line.len();
        count += 1;
        if count == size {
            chunks.push(Chunk { text: &text[start..end], byte_start: start, byte_end: end });
            start = end;
            count = 0;
        }
    }

    if start < text.len() {
        chunks.push(Chunk { text: &text[start..], byte_start: start, byte_end: text.len() });
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(size: usize, unit: ChunkUnit) -> ChunkingPolicy {
        ChunkingPolicy::Fixed { size: NonZeroUsize::new(size).unwrap(), unit }
    }

    #[test]
    fn test_from_chunk_size() {
        assert_eq!(
            ChunkingPolicy::from_chunk_size(-1, ChunkUnit::Chars).unwrap(),
            ChunkingPolicy::WholeFile
        );
        assert_eq!(
            ChunkingPolicy::from_chunk_size(10, ChunkUnit::Lines).unwrap(),
            fixed(10, ChunkUnit::Lines)
        );
        assert!(matches!(
            ChunkingPolicy::from_chunk_size(0, ChunkUnit::Chars),
            Err(RegistryError::InvalidChunkSize(0))
        ));
        assert!(matches!(
            ChunkingPolicy::from_chunk_size(-7, ChunkUnit::Chars),
            Err(RegistryError::InvalidChunkSize(-7))
        ));
    }

    #[test]
    fn test_whole_file_is_single_chunk() {
        let chunks = ChunkingPolicy::WholeFile.split("A talks about cats.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "A talks about cats.");
        assert_eq!(chunks[0].byte_end, 19);
    }

    #[test]
    fn test_char_windows_discard_trailing_empty_window() {
        let chunks = fixed(4, ChunkUnit::Chars).split("abcdefgh");
        let texts: Vec<_> = chunks.iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["abcd", "efgh"]);

        let chunks = fixed(4, ChunkUnit::Chars).split("abcdefghij");
        let texts: Vec<_> = chunks.iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_char_windows_respect_multibyte_boundaries() {
        let chunks = fixed(2, ChunkUnit::Chars).split("héllo");
        let texts: Vec<_> = chunks.iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["hé", "ll", "o"]);
        assert_eq!(chunks[0].byte_end, 3);
        assert_eq!(chunks[1].byte_start, 3);
    }

    #[test]
    fn test_line_windows_keep_terminators() {
        let chunks = fixed(2, ChunkUnit::Lines).split("one\ntwo\nthree\n");
        let texts: Vec<_> = chunks.iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["one\ntwo\n", "three\n"]);

        let chunks = fixed(3, ChunkUnit::Lines).split("one\ntwo\nthree\n");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_default_unit_is_lines() {
        assert_eq!(ChunkUnit::default(), ChunkUnit::Lines);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(ChunkingPolicy::WholeFile.split("").is_empty());
        assert!(fixed(3, ChunkUnit::Chars).split("").is_empty());
    }
}
