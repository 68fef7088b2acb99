//! Storage seam for clause histories

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::clause::model::{is_valid_clause_id, ClauseHistory};
use crate::clause::ClauseError;
use crate::core::project::Project;

/// Where clause histories live.
///
/// The service only talks to this trait, so tests use the in-memory store
/// and the CLI the YAML files under `clauses/`.
pub trait ClauseRepository {
    fn load(&self, clause_id: &str) -> Result<Option<ClauseHistory>, ClauseError>;

    fn save(&mut self, history: &ClauseHistory) -> Result<(), ClauseError>;

    /// Ids of every stored clause, sorted
    fn clause_ids(&self) -> Result<Vec<String>, ClauseError>;
}

#[derive(Debug, Default)]
pub struct InMemoryClauseRepository {
    clauses: BTreeMap<String, ClauseHistory>,
}

impl InMemoryClauseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClauseRepository for InMemoryClauseRepository {
    fn load(&self, clause_id: &str) -> Result<Option<ClauseHistory>, ClauseError> {
        Ok(self.clauses.get(clause_id).cloned())
    }

    fn save(&mut self, history: &ClauseHistory) -> Result<(), ClauseError> {
        self.clauses
            .insert(history.clause_id.clone(), history.clone());
        Ok(())
    }

    fn clause_ids(&self) -> Result<Vec<String>, ClauseError> {
        Ok(self.clauses.keys().cloned().collect())
    }
}

/// One YAML file per clause: `<dir>/<clause id>.yaml`
#[derive(Debug, Clone)]
pub struct FileClauseRepository {
    dir: PathBuf,
}

impl FileClauseRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_project(project: &Project) -> Self {
        Self::new(project.clauses_dir())
    }

    fn path(&self, clause_id: &str) -> Result<PathBuf, ClauseError> {
        if !is_valid_clause_id(clause_id) {
            return Err(ClauseError::InvalidId(clause_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.yaml", clause_id)))
    }
}

impl ClauseRepository for FileClauseRepository {
    fn load(&self, clause_id: &str) -> Result<Option<ClauseHistory>, ClauseError> {
        let path = self.path(clause_id)?;
        if !path.exists() {
            return Ok(None);
        }
        read_history(&path).map(Some)
    }

    fn save(&mut self, history: &ClauseHistory) -> Result<(), ClauseError> {
        let path = self.path(&history.clause_id)?;
        let yaml =
            serde_yml::to_string(history).map_err(|e| ClauseError::Serialize(e.to_string()))?;
        std::fs::create_dir_all(&self.dir).map_err(|source| ClauseError::Io {
            path: self.dir.clone(),
            source,
        })?;
        std::fs::write(&path, yaml).map_err(|source| ClauseError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(clause = %history.clause_id, path = %path.display(), "saved clause history");
        Ok(())
    }

    fn clause_ids(&self) -> Result<Vec<String>, ClauseError> {
        let mut ids: Vec<String> = Project::iter_yaml_files(&self.dir)
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
            .filter(|id| is_valid_clause_id(id))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

fn read_history(path: &Path) -> Result<ClauseHistory, ClauseError> {
    let source = std::fs::read_to_string(path).map_err(|e| ClauseError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let filename = path.display().to_string();
    crate::yaml::parse(&source, &filename).map_err(|e| ClauseError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_repository_round_trip() {
        let tmp = tempdir().unwrap();
        let mut repo = FileClauseRepository::new(tmp.path().join("clauses"));
        assert!(repo.load("kira-artisi").unwrap().is_none());

        repo.save(&ClauseHistory::new("kira-artisi")).unwrap();
        repo.save(&ClauseHistory::new("depozito")).unwrap();

        let loaded = repo.load("kira-artisi").unwrap().unwrap();
        assert_eq!(loaded.clause_id, "kira-artisi");
        assert_eq!(repo.clause_ids().unwrap(), vec!["depozito", "kira-artisi"]);
    }

    #[test]
    fn test_file_repository_rejects_path_like_ids() {
        let tmp = tempdir().unwrap();
        let repo = FileClauseRepository::new(tmp.path());
        assert!(matches!(
            repo.load("../kaçak"),
            Err(ClauseError::InvalidId(_))
        ));
    }

    #[test]
    fn test_malformed_file_names_path() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("bozuk.yaml"), "clause_id: [unterminated\n").unwrap();
        let repo = FileClauseRepository::new(tmp.path());
        let err = repo.load("bozuk").unwrap_err();
        assert!(err.to_string().contains("bozuk.yaml"));
    }
}
