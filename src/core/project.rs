//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::RecordId;

/// Name of the marker directory that identifies a project root
pub const PROJECT_DIR: &str = ".dilekce";

/// Represents a document workspace on disk
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .dilekce/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Use `--project` when given, otherwise discover from the working directory
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ProjectError> {
        match explicit {
            Some(path) => Self::discover_from(path),
            None => Self::discover(),
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::write_structure(root)
    }

    /// Initialize even if .dilekce/ exists; the config file is rewritten
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::write_structure(root)
    }

    fn write_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let marker = root.join(PROJECT_DIR);
        std::fs::create_dir_all(&marker).map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(marker.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        for dir in Self::data_dirs() {
            std::fs::create_dir_all(root.join(dir))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# Dilekce project configuration

# Owner id stamped on documents and sessions (default: $USER)
# user: ""

# Name printed in signature blocks
# author: ""

# Default export format (txt, docx, html)
# default_format: txt

# Where `doc export` writes files (default: exports/)
# export_dir: exports

# Hours of inactivity before a wizard session expires
# session_ttl_hours: 24
"#
    }

    /// Data directories created under the project root
    pub fn data_dirs() -> &'static [&'static str] {
        &[
            "documents",
            "answers",
            "sessions",
            "clauses",
            "templates",
            "exports",
        ]
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .dilekce configuration directory
    pub fn config_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.root.join("documents")
    }

    pub fn answers_dir(&self) -> PathBuf {
        self.root.join("answers")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn clauses_dir(&self) -> PathBuf {
        self.root.join("clauses")
    }

    /// Project-local wizard templates (override the built-in ones)
    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("exports")
    }

    /// Path of the document record for an id
    pub fn document_path(&self, id: &RecordId) -> PathBuf {
        self.documents_dir().join(format!("{}.yaml", id))
    }

    /// Path of the answers record for a document id
    pub fn answers_path(&self, id: &RecordId) -> PathBuf {
        self.answers_dir().join(format!("{}.yaml", id))
    }

    /// Path of the session record for a document id
    pub fn session_path(&self, id: &RecordId) -> PathBuf {
        self.sessions_dir().join(format!("{}.yaml", id))
    }

    /// Iterate the YAML files directly inside a data directory
    pub fn iter_yaml_files(dir: &Path) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "yaml"))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a dilekce project (searched from {searched_from:?}). Run 'dilekce init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("dilekce project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.config_dir().join("config.yaml").exists());
        for dir in Project::data_dirs() {
            assert!(project.root().join(dir).is_dir(), "{} missing", dir);
        }
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_project_init_force_succeeds_twice() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();
        assert!(Project::init_force(tmp.path()).is_ok());
    }

    #[test]
    fn test_project_discover_from_nested_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("a/b/c");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_marker() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }
}
