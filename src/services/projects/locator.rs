//! Project directory and compose file discovery
//!
//! A project is an immediate subdirectory of the projects root that holds one
//! of the recognized compose files. Candidates are checked in priority order
//! and the first match wins; files are never merged.

use std::path::{Path, PathBuf};
use tokio::fs;

use super::error::ProjectError;

/// Recognized compose file names, highest priority first
pub const DESCRIPTOR_FILES: &[&str] = &["docker-compose.yml", "docker-compose.yaml"];

/// A resolved project on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLocation {
    pub name: String,
    pub dir: PathBuf,
    pub descriptor: PathBuf,
}

impl ProjectLocation {
    /// File name of the compose file, relative to `dir`
    pub fn descriptor_file_name(&self) -> &str {
        self.descriptor
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DESCRIPTOR_FILES[0])
    }
}

/// Reject names that could escape the root or be read as CLI flags
pub fn validate_name(kind: &str, name: &str) -> Result<(), ProjectError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.starts_with('-')
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ProjectError::InvalidName(format!("{} '{}'", kind, name)));
    }
    Ok(())
}

/// First recognized compose file in `dir`
pub async fn find_descriptor(dir: &Path) -> Option<PathBuf> {
    for name in DESCRIPTOR_FILES {
        let path = dir.join(name);
        if fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return Some(path);
        }
    }
    None
}

/// Resolve a single project by name
pub async fn resolve(root: &Path, name: &str) -> Result<ProjectLocation, ProjectError> {
    validate_name("project", name)?;

    let dir = root.join(name);
    if !fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
        return Err(ProjectError::NotFound(format!("Project '{}'", name)));
    }

    let descriptor = find_descriptor(&dir)
        .await
        .ok_or_else(|| ProjectError::NotFound(format!("Compose file for project '{}'", name)))?;

    Ok(ProjectLocation {
        name: name.to_string(),
        dir,
        descriptor,
    })
}

/// All qualifying projects under `root`, sorted by name
pub async fn scan(root: &Path) -> Result<Vec<ProjectLocation>, ProjectError> {
    let mut entries = fs::read_dir(root).await?;
    let mut projects = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(String::from) else {
            continue;
        };

        let dir = entry.path();
        if let Some(descriptor) = find_descriptor(&dir).await {
            projects.push(ProjectLocation {
                name,
                dir,
                descriptor,
            });
        }
    }

    projects.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(projects)
}
