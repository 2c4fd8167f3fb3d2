//! Project export: maps a state snapshot to a file tree.
//!
//! [`Exporter::export`] is pure; [`write_to_directory`] puts the result on
//! disk.

mod writer;

pub use writer::{safe_relative_path, write_to_directory, WriteReport};

use crate::config::ExportConfig;
use crate::core::{Artifact, StageId, StageStatus};
use crate::errors::NothingToExportError;
use crate::state::ProjectState;
use crate::utils::{sha256_hex, truncate_chars};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::warn;

/// Fallback implementation file when the stage proposed none.
pub const DEFAULT_SOURCE_FILE: &str = "src/main_module.py";
/// Fallback test file when the stage proposed none.
pub const DEFAULT_TEST_FILE: &str = "tests/test_main_module.py";

const GITIGNORE: &str = "\
# Dependencies
node_modules/
__pycache__/
*.pyc
*.pyo
*.pyd
.Python
env/
venv/
.venv/

# IDE
.vscode/
.idea/
*.swp
*.swo
*~

# OS
.DS_Store
Thumbs.db

# Logs
*.log
logs/

# Environment variables
.env
.env.local
.env.production

# Build outputs
dist/
build/
*.egg-info/

# Database
*.db
*.sqlite
*.sqlite3

# Temporary files
*.tmp
*.temp
";

/// One file in an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFile {
    /// Path relative to the export root, `/`-separated.
    pub path: String,
    /// File content.
    pub content: String,
    /// Hex SHA-256 of `content`.
    pub sha256: String,
}

impl ExportedFile {
    /// Creates a file entry, hashing its content.
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            sha256: sha256_hex(&content),
            content,
        }
    }

    /// Returns true for entries under `docs/`.
    #[must_use]
    pub fn is_doc(&self) -> bool {
        self.path.starts_with("docs/")
    }
}

/// Builds the export file set for a project.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    /// Creates an exporter.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Maps `state` to files. Only succeeded stages contribute.
    ///
    /// The mapping is deterministic: the same state always yields the same
    /// paths in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`NothingToExportError`] when there is no active project.
    pub fn export(&self, state: &ProjectState) -> Result<Vec<ExportedFile>, NothingToExportError> {
        if state.is_idle() {
            return Err(NothingToExportError);
        }

        let mut tree = FileTree::default();
        for stage in StageId::ALL {
            if let Some(artifact) = state.artifact(stage) {
                map_stage(&mut tree, stage, artifact);
            }
        }

        if !self.config.include_docs {
            tree.files.retain(|f| !f.is_doc());
        }

        let readme = render_readme(state, &tree.files);
        tree.insert("README.md", readme);
        tree.insert(".gitignore", GITIGNORE);
        Ok(tree.files)
    }
}

/// Ordered file set; a later entry for the same path replaces the earlier.
#[derive(Debug, Default)]
struct FileTree {
    files: Vec<ExportedFile>,
}

impl FileTree {
    fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let file = ExportedFile::new(path, content);
        match self.files.iter_mut().find(|f| f.path == file.path) {
            Some(existing) => *existing = file,
            None => self.files.push(file),
        }
    }

    /// Adds artifact files under `dir`, dropping unsafe paths.
    fn insert_under(&mut self, dir: &str, artifact: &Artifact) -> usize {
        let mut added = 0;
        for file in &artifact.files {
            match safe_relative_path(&file.path) {
                Some(relative) => {
                    self.insert(format!("{dir}/{relative}"), file.content.as_str());
                    added += 1;
                }
                None => warn!(path = %file.path, "Dropping unsafe artifact path from export"),
            }
        }
        added
    }
}

fn document(heading: &str, artifact: &Artifact) -> String {
    format!("# {heading}\n\n{}\n", artifact.content.trim_end())
}

fn map_stage(tree: &mut FileTree, stage: StageId, artifact: &Artifact) {
    match stage {
        StageId::Analysis => tree.insert("docs/requirements.md", document("Project Requirements", artifact)),
        StageId::Research => tree.insert("docs/research.md", document("Research Notes", artifact)),
        StageId::Architecture => tree.insert("docs/architecture.md", document("System Architecture", artifact)),
        StageId::Planning => {
            tree.insert("docs/implementation_plan.md", document("Implementation Plan", artifact));
        }
        StageId::Implementation => {
            if tree.insert_under("src", artifact) == 0 {
                tree.insert(DEFAULT_SOURCE_FILE, artifact.content.as_str());
            }
        }
        StageId::Qa => {
            if tree.insert_under("tests", artifact) == 0 {
                tree.insert(DEFAULT_TEST_FILE, artifact.content.as_str());
            }
        }
        StageId::Deployment => {
            tree.insert("docs/deployment.md", document("Deployment Guide", artifact));
            tree.insert_under("config", artifact);
        }
        StageId::Documentation => {
            tree.insert("docs/overview.md", document("Project Documentation", artifact));
            tree.insert_under("docs", artifact);
        }
    }
}

fn render_readme(state: &ProjectState, files: &[ExportedFile]) -> String {
    let description = state.description().unwrap_or("Generated Project");
    let title = truncate_chars(description.lines().next().unwrap_or_default().trim(), 80);

    let mut out = format!("# {title}\n\n## Project Overview\n\n{}\n\n", description.trim());
    out.push_str("## Project Structure\n\n```\n");
    out.push_str("src/       source code\n");
    out.push_str("tests/     test suites\n");
    out.push_str("docs/      documentation\n");
    out.push_str("config/    deployment configuration\n");
    out.push_str("README.md  this file\n```\n\n");

    out.push_str("## Generated Files\n\n");
    for file in files {
        let _ = writeln!(out, "- {}", file.path);
    }
    out.push_str("- README.md\n- .gitignore\n\n");

    out.push_str("## Team\n\n| Stage | Agent | Status |\n|---|---|---|\n");
    for stage in StageId::ALL {
        let status = match state.result(stage).map(|r| r.status) {
            Some(StageStatus::Succeeded) => "succeeded",
            Some(StageStatus::Failed) => "failed",
            Some(StageStatus::Skipped) => "skipped",
            None => "not run",
        };
        let _ = writeln!(out, "| {} | {} | {status} |", stage.title(), stage.agent_name());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorClass, ExecutionMode, ProjectRequest, StageResult};
    use pretty_assertions::assert_eq;

    fn state_with(results: Vec<StageResult>) -> ProjectState {
        let mut state = ProjectState::running(
            ProjectRequest::new("Build a todo app\nwith tags", ExecutionMode::Full),
            StageId::ALL.to_vec(),
        );
        for result in results {
            state.upsert(result);
        }
        state
    }

    fn paths(files: &[ExportedFile]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn test_idle_state_has_nothing_to_export() {
        let err = Exporter::default().export(&ProjectState::idle()).unwrap_err();
        assert_eq!(err, NothingToExportError);
    }

    #[test]
    fn test_export_layout() {
        let state = state_with(vec![
            StageResult::succeeded(StageId::Analysis, Artifact::new("Requirements", "must list todos")),
            StageResult::succeeded(StageId::Architecture, Artifact::new("Architecture", "layers")),
            StageResult::succeeded(
                StageId::Implementation,
                Artifact::new("Module: app", "code").with_file("app.py", "print('todo')"),
            ),
            StageResult::succeeded(StageId::Qa, Artifact::new("Tests", "def test_it(): pass")),
            StageResult::succeeded(
                StageId::Deployment,
                Artifact::new("Deploy", "ship it").with_file("Dockerfile", "FROM python:3.12"),
            ),
            StageResult::failed(StageId::Documentation, ErrorClass::Permanent, "quota"),
        ]);

        let files = Exporter::new(ExportConfig::default()).export(&state).unwrap();
        assert_eq!(
            paths(&files),
            vec![
                "docs/requirements.md",
                "docs/architecture.md",
                "src/app.py",
                DEFAULT_TEST_FILE,
                "docs/deployment.md",
                "config/Dockerfile",
                "README.md",
                ".gitignore",
            ]
        );

        assert_eq!(files[0].content, "# Project Requirements\n\nmust list todos\n");
        assert_eq!(files[0].sha256, sha256_hex(&files[0].content));

        let readme = &files[6].content;
        assert!(readme.starts_with("# Build a todo app\n"));
        assert!(readme.contains("- src/app.py"));
        assert!(readme.contains("| Documentation Specialist | documentation_specialist | failed |"));
    }

    #[test]
    fn test_export_without_docs() {
        let state = state_with(vec![
            StageResult::succeeded(StageId::Analysis, Artifact::new("Requirements", "r")),
            StageResult::succeeded(
                StageId::Documentation,
                Artifact::new("Docs", "d").with_file("api.md", "endpoints"),
            ),
        ]);
        let config = ExportConfig {
            include_docs: false,
            ..ExportConfig::default()
        };

        let files = Exporter::new(config).export(&state).unwrap();
        assert_eq!(paths(&files), vec!["README.md", ".gitignore"]);
    }

    #[test]
    fn test_unsafe_artifact_paths_are_dropped() {
        let state = state_with(vec![StageResult::succeeded(
            StageId::Implementation,
            Artifact::new("Module", "code")
                .with_file("../escape.py", "x")
                .with_file("/etc/passwd", "x")
                .with_file("./pkg/util.py", "ok"),
        )]);

        let files = Exporter::default().export(&state).unwrap();
        assert_eq!(paths(&files)[0], "src/pkg/util.py");
        assert!(!files.iter().any(|f| f.path.contains("..")));
    }

    #[test]
    fn test_export_is_deterministic() {
        let state = state_with(vec![StageResult::succeeded(
            StageId::Research,
            Artifact::new("Research", "notes"),
        )]);
        let exporter = Exporter::default();
        assert_eq!(exporter.export(&state).unwrap(), exporter.export(&state).unwrap());
    }
}
