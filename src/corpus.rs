//! The local working tree as a source of documents.
//!
//! Decides which paths are indexable (recognized extension, not excluded),
//! reads file content, and walks the whole tree for the bootstrap pass.
//! Paths are always repository-relative with `/` separators, matching what
//! the change sources report and what lands in `metadata["file_path"]`.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{CorpusConfig, LanguageRule};
use crate::error::{Result, SyncError};
use crate::models::{Document, META_FILE_NAME, META_FILE_PATH, META_LANGUAGE, META_SPLIT_TYPE};

pub struct Corpus {
    root: PathBuf,
    languages: Vec<LanguageRule>,
    split_type: String,
    exclude_set: GlobSet,
}

impl Corpus {
    pub fn new(config: &CorpusConfig) -> Result<Self> {
        let mut excludes = vec!["**/.git/**".to_string()];
        excludes.extend(config.exclude_globs.iter().cloned());

        Ok(Self {
            root: config.root.clone(),
            languages: config.languages.clone(),
            split_type: config.split_type.clone(),
            exclude_set: build_globset(&excludes)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Language hint for a path, if its extension is recognized.
    pub fn language_for(&self, path: &str) -> Option<&str> {
        let extension = Path::new(path).extension()?.to_str()?;
        self.languages
            .iter()
            .find(|rule| rule.extension == extension)
            .map(|rule| rule.language.as_str())
    }

    /// Whether a path would be indexed: recognized extension and not
    /// excluded.
    pub fn is_indexable(&self, path: &str) -> bool {
        self.language_for(path).is_some() && !self.exclude_set.is_match(path)
    }

    /// Keep indexable paths, first occurrence wins, order preserved.
    pub fn filter_paths(&self, paths: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for path in paths {
            if self.is_indexable(path) && seen.insert(path.as_str()) {
                kept.push(path.clone());
            }
        }
        kept
    }

    /// Whether `path` is present in the working tree.
    ///
    /// Any stat failure counts as absent. Change sources only report paths
    /// that exist or were removed, so the expected failure here is NotFound;
    /// an unreadable but present file would be classified as deleted.
    pub fn exists(&self, path: &str) -> bool {
        std::fs::metadata(self.root.join(path)).is_ok()
    }

    pub fn read(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        std::fs::read_to_string(&full).map_err(|e| SyncError::file(full, e))
    }

    /// Build a fresh, unpersisted document for `path` from its current
    /// content.
    pub fn build_document(&self, path: &str) -> Result<Document> {
        let text = self.read(path)?;

        let mut metadata = HashMap::from([
            (META_FILE_PATH.to_string(), path.to_string()),
            (META_FILE_NAME.to_string(), file_name(path).to_string()),
            (META_SPLIT_TYPE.to_string(), self.split_type.clone()),
        ]);
        if let Some(language) = self.language_for(path) {
            metadata.insert(META_LANGUAGE.to_string(), language.to_string());
        }

        Ok(Document::new(text, metadata))
    }

    /// Walk the whole tree and build one document per indexable file,
    /// sorted by path. Excluded directories are not descended into.
    pub fn scan(&self) -> Result<Vec<Document>> {
        let mut paths = Vec::new();

        let walker = WalkDir::new(&self.root).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !self.excludes_dir(&self.relative(entry.path()))
        });

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let rel_str = self.relative(entry.path());
            if !self.is_indexable(&rel_str) {
                continue;
            }
            paths.push(rel_str);
        }

        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            info!(file = path.as_str(), "processing file");
            documents.push(self.build_document(path)?);
        }
        debug!(count = documents.len(), root = %self.root.display(), "scan complete");
        Ok(documents)
    }
}

impl Corpus {
    fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative.to_string_lossy().replace('\\', "/")
    }

    /// A directory is pruned when the exclude set matches both a direct
    /// child and a nested descendant of it (`vendor/**`, `**/.git/**`).
    fn excludes_dir(&self, dir: &str) -> bool {
        self.exclude_set.is_match(format!("{}/_", dir))
            && self.exclude_set.is_match(format!("{}/_/_", dir))
    }
}

/// Base name of a `/`-separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| SyncError::config(format!("invalid glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| SyncError::config(format!("invalid glob set: {}", e)))
}
