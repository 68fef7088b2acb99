//! Clause version control
//!
//! Clauses are reusable pieces of legal text with their own semantic
//! version history, independent of the wizard templates that embed them.

pub mod model;
pub mod repository;
pub mod service;
pub mod version;

use std::path::PathBuf;
use thiserror::Error;

pub use model::{ClauseHistory, ClauseMetadata, ClauseVersion, LegalReference};
pub use repository::{ClauseRepository, FileClauseRepository, InMemoryClauseRepository};
pub use service::{
    ClauseChange, ClauseService, NewClause, RegulatoryUpdate, VersionComparison, VersionRequest,
    VersionResult,
};
pub use version::{
    ChangeType, ClauseVersionNumber, ImpactLevel, MigrationComplexity, VersionStatus,
};

#[derive(Debug, Error)]
pub enum ClauseError {
    #[error("Clause not found: {0}")]
    NotFound(String),

    #[error("Clause {clause_id} has no version {version}")]
    VersionNotFound {
        clause_id: String,
        version: ClauseVersionNumber,
    },

    #[error("Clause already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid clause id '{0}': use lowercase letters, digits, '-' and '_'")]
    InvalidId(String),

    #[error("Clause {clause_id} cannot move past version {version}")]
    VersionOverflow {
        clause_id: String,
        version: ClauseVersionNumber,
    },

    #[error("Clause content must not be empty")]
    EmptyContent,

    #[error("Version {version} of {clause_id} is archived and cannot be activated")]
    Archived {
        clause_id: String,
        version: ClauseVersionNumber,
    },

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed clause file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize clause: {0}")]
    Serialize(String),
}
