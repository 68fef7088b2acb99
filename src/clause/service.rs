//! Clause version operations over a [`ClauseRepository`]

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::clause::model::{
    content_hash, is_valid_clause_id, AuditEntry, ChangeEntry, ClauseHistory, ClauseMetadata,
    ClauseVersion, Changelog, LegalReference,
};
use crate::clause::repository::ClauseRepository;
use crate::clause::version::{
    AuditAction, ChangeType, ClauseVersionNumber, DifferenceType, ImpactLevel,
    MigrationComplexity, VersionStatus,
};
use crate::clause::ClauseError;
use crate::core::identity::{RecordId, RecordPrefix};

/// First version of a new clause
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewClause {
    pub content: String,
    pub metadata: ClauseMetadata,
    pub legal_references: Vec<LegalReference>,
    pub effective_date: Option<NaiveDate>,
}

/// Proposed edits; `None` keeps the base version's value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClauseChange {
    pub content: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub applicable_documents: Option<Vec<String>>,
    pub legal_references: Option<Vec<LegalReference>>,
    pub required_fields: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct VersionRequest {
    pub clause_id: String,
    pub change: ClauseChange,
    pub change_reason: String,
    pub legal_justification: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub user_id: String,
    /// Skip classification and record this change type
    pub change_type: Option<ChangeType>,
}

#[derive(Debug, Clone)]
pub struct VersionResult {
    pub version: ClauseVersion,
    pub change_type: ChangeType,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionDifference {
    pub field: String,
    pub kind: DifferenceType,
    pub old_value: Value,
    pub new_value: Value,
    pub impact: ImpactLevel,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompatibilityImpact {
    pub has_breaking_changes: bool,
    pub affected_features: Vec<String>,
    pub migration_required: bool,
    pub backward_compatible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionComparison {
    pub clause_id: String,
    pub from_version: ClauseVersionNumber,
    pub to_version: ClauseVersionNumber,
    pub differences: Vec<VersionDifference>,
    pub compatibility: CompatibilityImpact,
    pub migration_complexity: MigrationComplexity,
    pub recommended_actions: Vec<String>,
}

/// A change in the law that touches several clauses at once
#[derive(Debug, Clone, Deserialize)]
pub struct RegulatoryUpdate {
    pub update_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Publication, e.g. "Resmi Gazete - Sayı: 32456"
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
    #[serde(default)]
    pub impact: ImpactLevel,
    pub affected_clauses: Vec<String>,
    /// Replacement references; when absent each clause keeps its own
    #[serde(default)]
    pub legal_references: Option<Vec<LegalReference>>,
}

pub struct ClauseService<R: ClauseRepository> {
    repo: R,
}

impl<R: ClauseRepository> ClauseService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn into_repository(self) -> R {
        self.repo
    }

    /// Create version 1.0.0 of a clause as a draft
    pub fn create_clause(
        &mut self,
        clause_id: &str,
        clause: NewClause,
        user_id: &str,
    ) -> Result<ClauseVersion, ClauseError> {
        if !is_valid_clause_id(clause_id) {
            return Err(ClauseError::InvalidId(clause_id.to_string()));
        }
        if clause.content.trim().is_empty() {
            return Err(ClauseError::EmptyContent);
        }
        if self.repo.load(clause_id)?.is_some() {
            return Err(ClauseError::AlreadyExists(clause_id.to_string()));
        }

        let now = Utc::now();
        let version = ClauseVersionNumber::INITIAL;
        let mut record = ClauseVersion {
            clause_id: clause_id.to_string(),
            version,
            content_hash: content_hash(&clause.content),
            content: clause.content,
            metadata: clause.metadata,
            legal_references: clause.legal_references,
            status: VersionStatus::Draft,
            changelog: Changelog {
                release_date: now.date_naive(),
                changes: vec![change_entry(ChangeType::Feature, "Initial version", None)],
                breaking_changes: false,
            },
            audit_trail: Vec::new(),
            created_at: now,
            created_by: user_id.to_string(),
            effective_date: clause.effective_date.unwrap_or_else(|| now.date_naive()),
            deprecated_at: None,
        };
        record.record(AuditEntry::new(
            AuditAction::Create,
            user_id,
            format!("Version {} created: Initial version", version),
            now,
        ));

        let mut history = ClauseHistory::new(clause_id);
        history.versions.push(record.clone());
        self.repo.save(&history)?;
        tracing::info!(clause = clause_id, version = %version, "created clause");
        Ok(record)
    }

    /// Derive a new draft version from the active one (or the latest).
    ///
    /// The version number always increases from the highest existing one,
    /// so two drafts derived from the same base never collide.
    pub fn create_clause_version(
        &mut self,
        request: VersionRequest,
    ) -> Result<VersionResult, ClauseError> {
        let mut history = self
            .repo
            .load(&request.clause_id)?
            .ok_or_else(|| ClauseError::NotFound(request.clause_id.clone()))?;
        let base = history
            .active()
            .or_else(|| history.latest())
            .cloned()
            .ok_or_else(|| ClauseError::NotFound(request.clause_id.clone()))?;
        let highest = history
            .latest()
            .map(|v| v.version)
            .unwrap_or(ClauseVersionNumber::INITIAL);

        let change = request.change;
        let change_type = request
            .change_type
            .unwrap_or_else(|| classify_change(&change, &base));
        let version =
            highest
                .bump(change_type)
                .ok_or_else(|| ClauseError::VersionOverflow {
                    clause_id: request.clause_id.clone(),
                    version: highest,
                })?;
        let now = Utc::now();

        let content = change.content.unwrap_or_else(|| base.content.clone());
        if content.trim().is_empty() {
            return Err(ClauseError::EmptyContent);
        }
        let metadata = ClauseMetadata {
            title: change.title.unwrap_or_else(|| base.metadata.title.clone()),
            description: change
                .description
                .unwrap_or_else(|| base.metadata.description.clone()),
            category: change
                .category
                .unwrap_or_else(|| base.metadata.category.clone()),
            applicable_documents: change
                .applicable_documents
                .unwrap_or_else(|| base.metadata.applicable_documents.clone()),
            required_fields: change
                .required_fields
                .unwrap_or_else(|| base.metadata.required_fields.clone()),
        };

        let mut record = ClauseVersion {
            clause_id: request.clause_id.clone(),
            version,
            content_hash: content_hash(&content),
            content,
            metadata,
            legal_references: change
                .legal_references
                .unwrap_or_else(|| base.legal_references.clone()),
            status: VersionStatus::Draft,
            changelog: Changelog {
                release_date: now.date_naive(),
                changes: vec![change_entry(
                    change_type,
                    &request.change_reason,
                    request.legal_justification.clone(),
                )],
                breaking_changes: change_type == ChangeType::BreakingChange,
            },
            audit_trail: Vec::new(),
            created_at: now,
            created_by: request.user_id.clone(),
            effective_date: request.effective_date.unwrap_or_else(|| now.date_naive()),
            deprecated_at: None,
        };
        record.record(AuditEntry::new(
            AuditAction::Create,
            &request.user_id,
            format!("Version {} created: {}", version, request.change_reason),
            now,
        ));

        let warnings = version_warnings(&record, &base);
        history.versions.push(record.clone());
        self.repo.save(&history)?;
        tracing::info!(
            clause = %request.clause_id,
            from = %base.version,
            to = %version,
            change = %change_type,
            "created clause version"
        );

        Ok(VersionResult {
            version: record,
            change_type,
            warnings,
        })
    }

    /// Make one version the clause's only active version.
    ///
    /// The previously active version, if any, becomes deprecated.
    pub fn activate(
        &mut self,
        clause_id: &str,
        version: ClauseVersionNumber,
        user_id: &str,
    ) -> Result<ClauseVersion, ClauseError> {
        let mut history = self.history_of(clause_id)?;
        let target = history
            .get(version)
            .ok_or_else(|| ClauseError::VersionNotFound {
                clause_id: clause_id.to_string(),
                version,
            })?;
        match target.status {
            VersionStatus::Active => return Ok(target.clone()),
            VersionStatus::Archived => {
                return Err(ClauseError::Archived {
                    clause_id: clause_id.to_string(),
                    version,
                })
            }
            _ => {}
        }

        let now = Utc::now();
        for previous in history
            .versions
            .iter_mut()
            .filter(|v| v.status == VersionStatus::Active)
        {
            previous.status = VersionStatus::Deprecated;
            previous.deprecated_at = Some(now);
            let details = format!("Version {} deprecated by {}", previous.version, version);
            previous.record(AuditEntry::new(AuditAction::Deprecate, user_id, details, now));
        }

        let activated = match history.get_mut(version) {
            Some(target) => {
                target.status = VersionStatus::Active;
                target.record(AuditEntry::new(
                    AuditAction::Activate,
                    user_id,
                    format!("Version {} activated", version),
                    now,
                ));
                target.clone()
            }
            None => {
                return Err(ClauseError::VersionNotFound {
                    clause_id: clause_id.to_string(),
                    version,
                })
            }
        };

        self.repo.save(&history)?;
        tracing::info!(clause = clause_id, version = %version, "activated clause version");
        Ok(activated)
    }

    /// All versions of a clause, oldest first
    pub fn history(&self, clause_id: &str) -> Result<Vec<ClauseVersion>, ClauseError> {
        let history = self.history_of(clause_id)?;
        Ok(history.sorted().into_iter().cloned().collect())
    }

    pub fn get_version(
        &self,
        clause_id: &str,
        version: Option<ClauseVersionNumber>,
    ) -> Result<ClauseVersion, ClauseError> {
        let history = self.history_of(clause_id)?;
        let found = match version {
            Some(v) => history.get(v),
            None => history.active().or_else(|| history.latest()),
        };
        found.cloned().ok_or_else(|| match version {
            Some(version) => ClauseError::VersionNotFound {
                clause_id: clause_id.to_string(),
                version,
            },
            None => ClauseError::NotFound(clause_id.to_string()),
        })
    }

    /// Field-by-field comparison of two versions of a clause
    pub fn compare_versions(
        &self,
        clause_id: &str,
        from: ClauseVersionNumber,
        to: ClauseVersionNumber,
    ) -> Result<VersionComparison, ClauseError> {
        let old = self.get_version(clause_id, Some(from))?;
        let new = self.get_version(clause_id, Some(to))?;
        Ok(compare(&old, &new))
    }

    /// Apply one regulatory update to every affected clause.
    ///
    /// Each clause gets its own legal-update version; a failure on one
    /// clause is reported in its slot and does not stop the others.
    pub fn apply_regulatory_update(
        &mut self,
        update: &RegulatoryUpdate,
        user_id: &str,
    ) -> Vec<(String, Result<VersionResult, ClauseError>)> {
        update
            .affected_clauses
            .iter()
            .map(|clause_id| {
                let request = VersionRequest {
                    clause_id: clause_id.clone(),
                    change: ClauseChange {
                        legal_references: update.legal_references.clone(),
                        ..Default::default()
                    },
                    change_reason: format!(
                        "Regulatory update applied: {} ({})",
                        update.update_id, update.title
                    ),
                    legal_justification: Some(if update.source.is_empty() {
                        "Legal compliance requirement".to_string()
                    } else {
                        format!("Legal compliance requirement: {}", update.source)
                    }),
                    effective_date: update.effective_date,
                    user_id: user_id.to_string(),
                    change_type: Some(ChangeType::LegalUpdate),
                };
                let result = self.create_clause_version(request);
                if let Err(ref e) = result {
                    tracing::warn!(clause = %clause_id, update = %update.update_id, error = %e, "regulatory update not applied");
                }
                (clause_id.clone(), result)
            })
            .collect()
    }

    fn history_of(&self, clause_id: &str) -> Result<ClauseHistory, ClauseError> {
        self.repo
            .load(clause_id)?
            .ok_or_else(|| ClauseError::NotFound(clause_id.to_string()))
    }
}

fn change_entry(
    change_type: ChangeType,
    description: &str,
    legal_justification: Option<String>,
) -> ChangeEntry {
    ChangeEntry {
        id: RecordId::new(RecordPrefix::Chg),
        change_type,
        description: description.to_string(),
        impact: change_type.impact(),
        legal_justification,
    }
}

/// Structural (required fields) beats legal references beats content
pub fn classify_change(change: &ClauseChange, base: &ClauseVersion) -> ChangeType {
    if let Some(ref fields) = change.required_fields {
        let old: BTreeSet<&String> = base.metadata.required_fields.iter().collect();
        let new: BTreeSet<&String> = fields.iter().collect();
        if old != new {
            return ChangeType::BreakingChange;
        }
    }
    if let Some(ref refs) = change.legal_references {
        if *refs != base.legal_references {
            return ChangeType::LegalUpdate;
        }
    }
    if let Some(ref content) = change.content {
        if *content != base.content {
            return ChangeType::Feature;
        }
    }
    ChangeType::Bugfix
}

fn version_warnings(new: &ClauseVersion, base: &ClauseVersion) -> Vec<String> {
    let mut warnings = Vec::new();
    if new.legal_references.len() < base.legal_references.len() {
        warnings.push("Legal reference count decreased - review compliance".to_string());
    }
    if new.metadata.required_fields.len() > base.metadata.required_fields.len() {
        warnings.push(
            "Additional required fields added - may affect existing documents".to_string(),
        );
    }
    warnings
}

fn list_difference(
    field: &str,
    old: &[String],
    new: &[String],
    impact: ImpactLevel,
    description: &str,
) -> Option<VersionDifference> {
    if old == new {
        return None;
    }
    let kind = if old.is_empty() {
        DifferenceType::Addition
    } else if new.is_empty() {
        DifferenceType::Removal
    } else {
        DifferenceType::Modification
    };
    Some(VersionDifference {
        field: field.to_string(),
        kind,
        old_value: Value::from(old.to_vec()),
        new_value: Value::from(new.to_vec()),
        impact,
        description: description.to_string(),
    })
}

fn text_difference(
    field: &str,
    old: &str,
    new: &str,
    impact: ImpactLevel,
    description: &str,
) -> Option<VersionDifference> {
    (old != new).then(|| VersionDifference {
        field: field.to_string(),
        kind: DifferenceType::Modification,
        old_value: Value::from(old),
        new_value: Value::from(new),
        impact,
        description: description.to_string(),
    })
}

/// Diff two versions and rate the migration effort
pub fn compare(old: &ClauseVersion, new: &ClauseVersion) -> VersionComparison {
    let mut differences: Vec<VersionDifference> = [
        text_difference(
            "content",
            &old.content,
            &new.content,
            ImpactLevel::Medium,
            "Clause content updated",
        ),
        text_difference(
            "title",
            &old.metadata.title,
            &new.metadata.title,
            ImpactLevel::Low,
            "Title updated",
        ),
        text_difference(
            "description",
            &old.metadata.description,
            &new.metadata.description,
            ImpactLevel::Low,
            "Description updated",
        ),
        text_difference(
            "category",
            &old.metadata.category,
            &new.metadata.category,
            ImpactLevel::Low,
            "Category changed",
        ),
        list_difference(
            "applicable_documents",
            &old.metadata.applicable_documents,
            &new.metadata.applicable_documents,
            ImpactLevel::Medium,
            "Applicable documents changed",
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    if old.legal_references != new.legal_references {
        let as_text = |refs: &[LegalReference]| {
            Value::from(refs.iter().map(|r| r.to_string()).collect::<Vec<_>>())
        };
        differences.push(VersionDifference {
            field: "legal_references".to_string(),
            kind: if old.legal_references.is_empty() {
                DifferenceType::Addition
            } else if new.legal_references.is_empty() {
                DifferenceType::Removal
            } else {
                DifferenceType::Modification
            },
            old_value: as_text(&old.legal_references),
            new_value: as_text(&new.legal_references),
            impact: ImpactLevel::High,
            description: "Legal references updated".to_string(),
        });
    }

    // New required placeholders break documents filled against the old text
    let added_required = new
        .metadata
        .required_fields
        .iter()
        .any(|f| !old.metadata.required_fields.contains(f));
    if let Some(diff) = list_difference(
        "required_fields",
        &old.metadata.required_fields,
        &new.metadata.required_fields,
        if added_required {
            ImpactLevel::Critical
        } else {
            ImpactLevel::Medium
        },
        "Required fields changed",
    ) {
        differences.push(diff);
    }

    let has_critical = differences.iter().any(|d| d.impact == ImpactLevel::Critical);
    let compatibility = CompatibilityImpact {
        has_breaking_changes: has_critical,
        affected_features: differences.iter().map(|d| d.field.clone()).collect(),
        migration_required: differences.iter().any(|d| d.impact >= ImpactLevel::High),
        backward_compatible: !has_critical,
    };

    VersionComparison {
        clause_id: old.clause_id.clone(),
        from_version: old.version,
        to_version: new.version,
        migration_complexity: migration_complexity(&differences),
        recommended_actions: recommended_actions(&differences),
        differences,
        compatibility,
    }
}

pub fn migration_complexity(differences: &[VersionDifference]) -> MigrationComplexity {
    let high = differences
        .iter()
        .filter(|d| d.impact == ImpactLevel::High)
        .count();
    let critical = differences
        .iter()
        .filter(|d| d.impact == ImpactLevel::Critical)
        .count();

    if critical > 0 {
        MigrationComplexity::Major
    } else if high > 2 {
        MigrationComplexity::Complex
    } else if high > 0 {
        MigrationComplexity::Moderate
    } else if differences.len() > 3 {
        MigrationComplexity::Simple
    } else {
        MigrationComplexity::Trivial
    }
}

fn recommended_actions(differences: &[VersionDifference]) -> Vec<String> {
    let mut actions = vec!["Review changes carefully".to_string()];
    if differences.iter().any(|d| d.field == "legal_references") {
        actions.push("Update legal compliance documentation".to_string());
        actions.push("Notify legal team of changes".to_string());
    }
    if differences.iter().any(|d| d.impact == ImpactLevel::High) {
        actions.push("Test with existing document templates".to_string());
        actions.push("Update user documentation".to_string());
    }
    if differences.iter().any(|d| d.impact == ImpactLevel::Critical) {
        actions.push("Plan a migration for documents that embed this clause".to_string());
    }
    actions
}

/// Time of the version's most recent audit entry
pub fn last_activity(version: &ClauseVersion) -> DateTime<Utc> {
    version
        .audit_trail
        .iter()
        .map(|e| e.timestamp)
        .max()
        .unwrap_or(version.created_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::repository::InMemoryClauseRepository;

    fn tbk(article: &str) -> LegalReference {
        LegalReference {
            code: "TBK".into(),
            article: article.into(),
            description: String::new(),
            url: None,
            is_active: true,
        }
    }

    fn service() -> ClauseService<InMemoryClauseRepository> {
        let mut service = ClauseService::new(InMemoryClauseRepository::new());
        service
            .create_clause(
                "kira-artisi",
                NewClause {
                    content: "Kira bedeli her yıl TÜFE oranında artırılır.".into(),
                    metadata: ClauseMetadata {
                        title: "Kira artışı".into(),
                        required_fields: vec!["kira_bedeli".into()],
                        ..Default::default()
                    },
                    legal_references: vec![tbk("m.344")],
                    effective_date: None,
                },
                "hukuk",
            )
            .unwrap();
        service
    }

    fn request(change: ClauseChange) -> VersionRequest {
        VersionRequest {
            clause_id: "kira-artisi".into(),
            change,
            change_reason: "güncelleme".into(),
            legal_justification: None,
            effective_date: None,
            user_id: "hukuk".into(),
            change_type: None,
        }
    }

    #[test]
    fn test_create_clause_starts_at_initial_draft() {
        let service = service();
        let history = service.history("kira-artisi").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].version.to_string(), "1.0.0");
        assert_eq!(history[0].status, VersionStatus::Draft);
        assert!(history[0].verify_hash());
        assert_eq!(history[0].audit_trail[0].action, AuditAction::Create);
    }

    #[test]
    fn test_duplicate_and_invalid_ids_rejected() {
        let mut service = service();
        let again = service.create_clause(
            "kira-artisi",
            NewClause {
                content: "x".into(),
                ..Default::default()
            },
            "u",
        );
        assert!(matches!(again, Err(ClauseError::AlreadyExists(_))));
        let bad = service.create_clause("Kira Artışı", NewClause::default(), "u");
        assert!(matches!(bad, Err(ClauseError::InvalidId(_))));
    }

    #[test]
    fn test_version_overflow_is_an_error() {
        let mut history = service().repository().load("kira-artisi").unwrap().unwrap();
        history.versions[0].version = ClauseVersionNumber::new(1, u32::MAX, 0);
        let mut repo = InMemoryClauseRepository::new();
        repo.save(&history).unwrap();
        let mut service = ClauseService::new(repo);

        let result = service.create_clause_version(request(ClauseChange {
            content: Some("Kira bedeli yasal sınır içinde artırılır.".into()),
            ..Default::default()
        }));
        assert!(matches!(result, Err(ClauseError::VersionOverflow { .. })));
        assert_eq!(service.history("kira-artisi").unwrap().len(), 1);
    }

    #[test]
    fn test_change_classification_drives_bump() {
        let mut service = service();

        let content = service
            .create_clause_version(request(ClauseChange {
                content: Some("Kira bedeli yasal sınır içinde artırılır.".into()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(content.change_type, ChangeType::Feature);
        assert_eq!(content.version.version.to_string(), "1.1.0");

        let legal = service
            .create_clause_version(request(ClauseChange {
                legal_references: Some(vec![tbk("m.344"), tbk("m.345")]),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(legal.change_type, ChangeType::LegalUpdate);
        assert_eq!(legal.version.version.to_string(), "1.2.0");

        let structural = service
            .create_clause_version(request(ClauseChange {
                required_fields: Some(vec!["kira_bedeli".into(), "artis_orani".into()]),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(structural.change_type, ChangeType::BreakingChange);
        assert_eq!(structural.version.version.to_string(), "2.0.0");
        assert!(structural.version.changelog.breaking_changes);
        assert!(structural
            .warnings
            .iter()
            .any(|w| w.contains("required fields")));

        let nothing = service
            .create_clause_version(request(ClauseChange::default()))
            .unwrap();
        assert_eq!(nothing.change_type, ChangeType::Bugfix);
        assert_eq!(nothing.version.version.to_string(), "2.0.1");
    }

    #[test]
    fn test_fewer_legal_references_warn() {
        let mut service = service();
        let result = service
            .create_clause_version(request(ClauseChange {
                legal_references: Some(vec![]),
                ..Default::default()
            }))
            .unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("Legal reference count decreased")));
    }

    #[test]
    fn test_activation_keeps_single_active_version() {
        let mut service = service();
        service
            .activate("kira-artisi", ClauseVersionNumber::INITIAL, "hukuk")
            .unwrap();
        let v2 = service
            .create_clause_version(request(ClauseChange {
                content: Some("Yeni metin".into()),
                ..Default::default()
            }))
            .unwrap()
            .version
            .version;
        service.activate("kira-artisi", v2, "hukuk").unwrap();

        let history = service.history("kira-artisi").unwrap();
        let active: Vec<_> = history
            .iter()
            .filter(|v| v.status == VersionStatus::Active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].version, v2);
        assert_eq!(history[0].status, VersionStatus::Deprecated);
        assert!(history[0].deprecated_at.is_some());
        assert_eq!(
            history[0].audit_trail.last().unwrap().action,
            AuditAction::Deprecate
        );
    }

    #[test]
    fn test_activate_unknown_version() {
        let mut service = service();
        let err = service
            .activate("kira-artisi", ClauseVersionNumber::new(9, 9, 9), "u")
            .unwrap_err();
        assert!(matches!(err, ClauseError::VersionNotFound { .. }));
    }

    #[test]
    fn test_compare_rates_migration() {
        let mut service = service();
        let v = service
            .create_clause_version(request(ClauseChange {
                content: Some("Yeni metin".into()),
                legal_references: Some(vec![tbk("m.347")]),
                ..Default::default()
            }))
            .unwrap()
            .version
            .version;

        let cmp = service
            .compare_versions("kira-artisi", ClauseVersionNumber::INITIAL, v)
            .unwrap();
        let fields: Vec<&str> = cmp.differences.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["content", "legal_references"]);
        assert_eq!(cmp.migration_complexity, MigrationComplexity::Moderate);
        assert!(cmp.compatibility.migration_required);
        assert!(cmp.compatibility.backward_compatible);
        assert!(cmp
            .recommended_actions
            .contains(&"Notify legal team of changes".to_string()));
    }

    #[test]
    fn test_compare_identical_is_trivial() {
        let service = service();
        let cmp = service
            .compare_versions(
                "kira-artisi",
                ClauseVersionNumber::INITIAL,
                ClauseVersionNumber::INITIAL,
            )
            .unwrap();
        assert!(cmp.differences.is_empty());
        assert_eq!(cmp.migration_complexity, MigrationComplexity::Trivial);
        assert_eq!(cmp.recommended_actions, vec!["Review changes carefully"]);
    }

    #[test]
    fn test_added_required_field_is_major() {
        let mut service = service();
        let v = service
            .create_clause_version(request(ClauseChange {
                required_fields: Some(vec!["kira_bedeli".into(), "depozito".into()]),
                ..Default::default()
            }))
            .unwrap()
            .version
            .version;
        let cmp = service
            .compare_versions("kira-artisi", ClauseVersionNumber::INITIAL, v)
            .unwrap();
        assert_eq!(cmp.migration_complexity, MigrationComplexity::Major);
        assert!(cmp.compatibility.has_breaking_changes);
    }

    #[test]
    fn test_regulatory_update_versions_each_clause() {
        let mut service = service();
        let update = RegulatoryUpdate {
            update_id: "tbk-344-2024".into(),
            title: "TBK 344 güncellemesi".into(),
            description: String::new(),
            source: "Resmi Gazete".into(),
            effective_date: None,
            impact: ImpactLevel::High,
            affected_clauses: vec!["kira-artisi".into(), "olmayan".into()],
            legal_references: None,
        };
        let results = service.apply_regulatory_update(&update, "hukuk");
        assert_eq!(results.len(), 2);
        let ok = results[0].1.as_ref().unwrap();
        assert_eq!(ok.change_type, ChangeType::LegalUpdate);
        assert_eq!(ok.version.version.to_string(), "1.1.0");
        assert!(matches!(results[1].1, Err(ClauseError::NotFound(_))));
    }
}
