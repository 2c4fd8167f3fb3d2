//! Artifacts produced by team capabilities.

use crate::utils::truncate_chars;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A file proposed by a stage, relative to the exported project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    /// Relative path (e.g. `app.py`, `ci.yml`).
    pub path: String,
    /// File contents.
    pub content: String,
}

impl ArtifactFile {
    /// Creates a new artifact file.
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// The structured output of one stage.
///
/// The engine stores and exports artifacts but never interprets their
/// content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Short title (e.g. "Product Analyst Report").
    pub title: String,

    /// Main body of the artifact.
    pub content: String,

    /// Files the stage proposes for the exported project.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ArtifactFile>,

    /// Stage-specific metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    /// When the artifact was created (ISO 8601).
    pub created_at: String,
}

impl Artifact {
    /// Creates a new artifact.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            files: Vec::new(),
            metadata: HashMap::new(),
            created_at: crate::utils::iso_timestamp(),
        }
    }

    /// Adds a proposed file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push(ArtifactFile::new(path, content));
        self
    }

    /// Replaces the proposed files.
    #[must_use]
    pub fn with_files(mut self, files: Vec<ArtifactFile>) -> Self {
        self.files = files;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Gets a metadata value as a string.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }

    /// Carries over the files of `earlier` that this artifact does not
    /// replace, ahead of its own, and merges module names into the
    /// `modules` metadata list.
    pub fn absorb(&mut self, earlier: &Self) {
        let mut files: Vec<ArtifactFile> = earlier
            .files
            .iter()
            .filter(|f| !self.files.iter().any(|own| own.path == f.path))
            .cloned()
            .collect();
        files.append(&mut self.files);
        self.files = files;

        let mut modules = earlier.module_names();
        for name in self.module_names() {
            if !modules.contains(&name) {
                modules.push(name);
            }
        }
        if !modules.is_empty() {
            self.metadata
                .insert("modules".to_string(), serde_json::json!(modules));
        }
    }

    /// Module names listed in metadata, falling back to `module_name`.
    #[must_use]
    pub fn module_names(&self) -> Vec<String> {
        match self.metadata.get("modules").and_then(serde_json::Value::as_array) {
            Some(list) => list
                .iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect(),
            None => self
                .metadata_str("module_name")
                .map(|name| vec![name.to_string()])
                .unwrap_or_default(),
        }
    }

    /// Returns the content truncated to `max_chars` characters.
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> String {
        truncate_chars(&self.content, max_chars)
    }
}
