//! Writes an export to disk.

use super::ExportedFile;
use crate::errors::TeamflowError;
use crate::utils::compact_timestamp;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::info;

/// What [`write_to_directory`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    /// The export root.
    pub directory: PathBuf,
    /// Where a pre-existing directory was moved, if there was one.
    pub backup: Option<PathBuf>,
    /// Every file written, in export order.
    pub written: Vec<PathBuf>,
}

/// Normalizes an artifact-proposed path to a safe relative path.
///
/// Returns `None` for empty, absolute, or parent-escaping paths.
#[must_use]
pub fn safe_relative_path(raw: &str) -> Option<String> {
    let normalized = raw.trim().replace('\\', "/");
    if normalized.starts_with('/') {
        return None;
    }

    let mut parts = Vec::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Writes `files` under `dir`.
///
/// An existing `dir` is first moved aside to `<dir>_backup_<timestamp>`.
/// Every path is validated before anything on disk changes.
///
/// # Errors
///
/// Returns [`TeamflowError::UnsafePath`] for a path that would escape
/// `dir`, or [`TeamflowError::Io`] if the filesystem refuses.
pub async fn write_to_directory(dir: &Path, files: &[ExportedFile]) -> Result<WriteReport, TeamflowError> {
    let relative: Vec<String> = files
        .iter()
        .map(|f| safe_relative_path(&f.path).ok_or_else(|| TeamflowError::UnsafePath(f.path.clone())))
        .collect::<Result<_, _>>()?;

    let backup = if fs::try_exists(dir).await? {
        let backup = backup_path(dir).await?;
        fs::rename(dir, &backup).await?;
        info!(from = %dir.display(), to = %backup.display(), "Moved existing export aside");
        Some(backup)
    } else {
        None
    };

    fs::create_dir_all(dir).await?;

    let mut written = Vec::with_capacity(files.len());
    for (file, relative) in files.iter().zip(relative) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &file.content).await?;
        written.push(path);
    }

    info!(directory = %dir.display(), files = written.len(), "Export written");
    Ok(WriteReport {
        directory: dir.to_path_buf(),
        backup,
        written,
    })
}

/// First free `<dir>_backup_<timestamp>[_n]` sibling of `dir`.
async fn backup_path(dir: &Path) -> Result<PathBuf, TeamflowError> {
    let name = dir
        .file_name()
        .map_or_else(|| "export".to_string(), |n| n.to_string_lossy().into_owned());
    let stem = format!("{name}_backup_{}", compact_timestamp());

    let mut candidate = dir.with_file_name(&stem);
    let mut suffix = 1;
    while fs::try_exists(&candidate).await? {
        candidate = dir.with_file_name(format!("{stem}_{suffix}"));
        suffix += 1;
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn files() -> Vec<ExportedFile> {
        vec![
            ExportedFile::new("README.md", "# Todo"),
            ExportedFile::new("src/app.py", "print('todo')"),
        ]
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(safe_relative_path("src/app.py").as_deref(), Some("src/app.py"));
        assert_eq!(safe_relative_path("./a\\b.rs").as_deref(), Some("a/b.rs"));
        assert_eq!(safe_relative_path("../escape.txt"), None);
        assert_eq!(safe_relative_path("src/../../escape.txt"), None);
        assert_eq!(safe_relative_path("/etc/passwd"), None);
        assert_eq!(safe_relative_path("  "), None);
    }

    #[tokio::test]
    async fn test_write_creates_tree() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("generated_project");

        let report = write_to_directory(&dir, &files()).await.unwrap();
        assert!(report.backup.is_none());
        assert_eq!(report.written.len(), 2);
        assert_eq!(
            std::fs::read_to_string(dir.join("src/app.py")).unwrap(),
            "print('todo')"
        );
    }

    #[tokio::test]
    async fn test_existing_directory_is_backed_up() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("generated_project");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("old.txt"), "old").unwrap();

        let first = write_to_directory(&dir, &files()).await.unwrap();
        let second = write_to_directory(&dir, &files()).await.unwrap();

        let first_backup = first.backup.unwrap();
        assert!(first_backup.join("old.txt").exists());
        assert!(first_backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("generated_project_backup_"));
        assert_ne!(second.backup.unwrap(), first_backup);
        assert!(!dir.join("old.txt").exists());
    }

    #[tokio::test]
    async fn test_unsafe_path_rejected_before_writing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out");
        let bad = vec![ExportedFile::new("ok.md", "x"), ExportedFile::new("../evil.sh", "x")];

        let err = write_to_directory(&dir, &bad).await.unwrap_err();
        assert!(matches!(err, TeamflowError::UnsafePath(ref p) if p == "../evil.sh"));
        assert!(!dir.exists());
    }
}
