//! Clause records: versions, changelogs, audit trails

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::clause::version::{
    AuditAction, ChangeType, ClauseVersionNumber, ImpactLevel, VersionStatus,
};
use crate::core::identity::{RecordId, RecordPrefix};

/// Statute article a clause relies on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalReference {
    /// Code abbreviation, e.g. `TBK`
    pub code: String,
    /// Article, e.g. `m.344`
    pub article: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl std::fmt::Display for LegalReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.article)?;
        if !self.description.is_empty() {
            write!(f, " ({})", self.description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    /// Document types that embed this clause
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applicable_documents: Vec<String>,
    /// Placeholders the clause text needs filled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: RecordId,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub user_id: String,
    pub details: String,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        user_id: impl Into<String>,
        details: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::new(RecordPrefix::Aud),
            timestamp: now,
            action,
            user_id: user_id.into(),
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub id: RecordId,
    pub change_type: ChangeType,
    pub description: String,
    pub impact: ImpactLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_justification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changelog {
    pub release_date: NaiveDate,
    pub changes: Vec<ChangeEntry>,
    #[serde(default)]
    pub breaking_changes: bool,
}

/// One immutable revision of a clause's text and legal context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseVersion {
    pub clause_id: String,
    pub version: ClauseVersionNumber,
    pub content: String,
    /// SHA-256 of `content`, hex encoded
    pub content_hash: String,
    pub metadata: ClauseMetadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legal_references: Vec<LegalReference>,
    #[serde(default)]
    pub status: VersionStatus,
    pub changelog: Changelog,
    #[serde(default)]
    pub audit_trail: Vec<AuditEntry>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub effective_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_at: Option<DateTime<Utc>>,
}

impl ClauseVersion {
    /// `<clause id>_v<version>`
    pub fn key(&self) -> String {
        format!("{}_v{}", self.clause_id, self.version)
    }

    /// True when the stored hash still matches the content
    pub fn verify_hash(&self) -> bool {
        self.content_hash == content_hash(&self.content)
    }

    pub fn record(&mut self, entry: AuditEntry) {
        self.audit_trail.push(entry);
    }
}

/// Every version of one clause, as stored in `clauses/<clause id>.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseHistory {
    pub clause_id: String,
    #[serde(default)]
    pub versions: Vec<ClauseVersion>,
}

impl ClauseHistory {
    pub fn new(clause_id: impl Into<String>) -> Self {
        Self {
            clause_id: clause_id.into(),
            versions: Vec::new(),
        }
    }

    pub fn active(&self) -> Option<&ClauseVersion> {
        self.versions
            .iter()
            .find(|v| v.status == VersionStatus::Active)
    }

    /// Highest version number, whatever its status
    pub fn latest(&self) -> Option<&ClauseVersion> {
        self.versions.iter().max_by_key(|v| v.version)
    }

    pub fn get(&self, version: ClauseVersionNumber) -> Option<&ClauseVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    pub fn get_mut(&mut self, version: ClauseVersionNumber) -> Option<&mut ClauseVersion> {
        self.versions.iter_mut().find(|v| v.version == version)
    }

    /// Versions in ascending order
    pub fn sorted(&self) -> Vec<&ClauseVersion> {
        let mut versions: Vec<&ClauseVersion> = self.versions.iter().collect();
        versions.sort_by_key(|v| v.version);
        versions
    }
}

/// Hex SHA-256 of clause text
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Clause ids name files, so they are restricted to `[a-z0-9_-]`
pub fn is_valid_clause_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}
