// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Brain Source Loader
//!
//! Walks a brain's source directory and returns the readable text files in
//! traversal order, ready to be chunked into neurons.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Filesystem access for brain construction
//! - **Integration:** `BrainRegistry::register_brain` → `Brain::build`
//!
//! # Eligibility
//!
//! A file becomes a [`SourceDocument`] when it is a regular file, its name
//! does not start with `.`, it is not inside `__pycache__`, its extension is
//! not a known binary/archive/media type, it is at most `max_file_size`
//! bytes, and its content is non-empty UTF-8. Everything else is skipped and
//! logged, never reported as an error.
//!
//! Traversal is depth first with entries sorted by file name at each level,
//! so the same tree always yields the same order.

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::brain::{RegistryError, SourceDocument};

const SKIP_EXTENSIONS: &[&str] = &[
    "pyc", "pyo", "so", "dll", "dylib", "exe", "bin", "o", "a", "class", "jar",
    "jpg", "jpeg", "png", "gif", "ico", "bmp", "webp", "tiff",
    "mp4", "mp3", "wav", "avi", "mov", "flac", "ogg",
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar",
    "db", "sqlite", "pdf", "woff", "woff2", "ttf",
];

pub struct BrainLoader {
    /// Maximum single file size (bytes)
    max_file_size: u64,

    /// Base for relative brain directories
    data_dir: Option<PathBuf>,
}

impl BrainLoader {
    /// Loader with a 5 MB file limit and no data directory.
    pub fn new() -> Self {
        Self {
            max_file_size: 5 * 1024 * 1024,
            data_dir: None,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        self.data_dir = data_dir;
        self
    }

    /// Resolve a brain directory against the data directory when relative.
    pub fn resolve_directory(&self, directory: &Path) -> PathBuf {
        match &self.data_dir {
            Some(base) if directory.is_relative() => base.join(directory),
            _ => directory.to_path_buf(),
        }
    }

    /// Collect the eligible documents under `directory`.
    pub fn load_documents(&self, directory: &Path) -> Result<Vec<SourceDocument>, RegistryError> {
        let root = self.resolve_directory(directory);
        if !root.is_dir() {
            return Err(RegistryError::DirectoryNotFound(root));
        }

        let mut documents = Vec::new();

        for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                RegistryError::io(&path, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&root).unwrap_or(path);

            if self.should_skip_file(relative) {
                debug!("Skipping ineligible file: {:?}", path);
                continue;
            }

            if let Some(document) = self.read_document(path, relative)? {
                documents.push(document);
            }
        }

        debug!("Loaded {} documents from {:?}", documents.len(), root);
        Ok(documents)
    }

    fn read_document(&self, path: &Path, relative: &Path) -> Result<Option<SourceDocument>, RegistryError> {
        let metadata = fs::metadata(path).map_err(|e| RegistryError::io(path, e))?;
        if metadata.len() > self.max_file_size {
            warn!(
                "Skipping {:?}: size ({} bytes) exceeds limit ({} bytes)",
                path,
                metadata.len(),
                self.max_file_size
            );
            return Ok(None);
        }

        let bytes = fs::read(path).map_err(|e| RegistryError::io(path, e))?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                warn!("Skipping {:?}: not valid UTF-8", path);
                return Ok(None);
            }
        };

        if text.is_empty() {
            debug!("Skipping empty file: {:?}", path);
            return Ok(None);
        }

        Ok(Some(SourceDocument {
            path: path.to_path_buf(),
            relative_path: to_slash_path(relative),
            text,
        }))
    }

    fn should_skip_file(&self, relative: &Path) -> bool {
        let filename = relative.file_name().and_then(|n| n.to_str()).unwrap_or("");

        if filename.starts_with('.') {
            return true;
        }

        if relative
            .components()
            .any(|c| matches!(c, Component::Normal(name) if name == "__pycache__"))
        {
            return true;
        }

        if let Some(ext) = relative.extension().and_then(|e| e.to_str()) {
            let ext = ext.to_ascii_lowercase();
            if SKIP_EXTENSIONS.contains(&ext.as_str()) {
                return true;
            }
        }

        false
    }
}

impl Default for BrainLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_in_sorted_traversal_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("b.txt"), "Content B").unwrap();
        fs::write(temp_dir.path().join("a.txt"), "Content A").unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("sub").join("c.md"), "Content C").unwrap();

        let docs = BrainLoader::new().load_documents(temp_dir.path()).unwrap();
        let rels: Vec<_> = docs.iter().map(|d| d.relative_path.as_str()).collect();
        assert_eq!(rels, vec!["a.txt", "b.txt", "sub/c.md"]);
        assert_eq!(docs[2].text, "Content C");
    }

    #[test]
    fn test_ineligible_files_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join(".hidden"), "secret").unwrap();
        fs::write(root.join("empty.txt"), "").unwrap();
        fs::write(root.join("image.png"), "not really a png").unwrap();
        fs::write(root.join("latin1.txt"), [0xff, 0xfe, 0x41]).unwrap();
        fs::create_dir(root.join("__pycache__")).unwrap();
        fs::write(root.join("__pycache__").join("mod.txt"), "cached").unwrap();
        fs::write(root.join("keep.py"), "print('hi')").unwrap();

        let docs = BrainLoader::new().load_documents(root).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].relative_path, "keep.py");
    }

    #[test]
    fn test_file_size_limit_skips() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("large.txt"), "x".repeat(64)).unwrap();
        fs::write(temp_dir.path().join("small.txt"), "ok").unwrap();

        let docs = BrainLoader::new()
            .with_max_file_size(32)
            .load_documents(temp_dir.path())
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].relative_path, "small.txt");
    }

    #[test]
    fn test_missing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("nope");
        let err = BrainLoader::new().load_documents(&missing).unwrap_err();
        assert!(matches!(err, RegistryError::DirectoryNotFound(p) if p == missing));
    }

    #[test]
    fn test_relative_directory_resolves_against_data_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::create_dir(temp_dir.path().join("handbook")).unwrap();
        fs::write(temp_dir.path().join("handbook").join("a.txt"), "A").unwrap();

        let loader = BrainLoader::new().with_data_dir(Some(temp_dir.path().to_path_buf()));
        assert_eq!(
            loader.resolve_directory(Path::new("handbook")),
            temp_dir.path().join("handbook")
        );
        assert_eq!(loader.resolve_directory(Path::new("/abs")), PathBuf::from("/abs"));
        assert_eq!(loader.load_documents(Path::new("handbook")).unwrap().len(), 1);
    }

    #[test]
    fn test_skip_rules() {
        let loader = BrainLoader::new();
        assert!(loader.should_skip_file(Path::new(".env")));
        assert!(loader.should_skip_file(Path::new("pkg/__pycache__/x.py")));
        assert!(loader.should_skip_file(Path::new("mod.pyc")));
        assert!(loader.should_skip_file(Path::new("Photo.JPG")));
        assert!(!loader.should_skip_file(Path::new(".git/config")));
        assert!(!loader.should_skip_file(Path::new("notes.md")));
    }
}
