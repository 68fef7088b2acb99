//! File-backed document store
//!
//! Each document is a triple of YAML files sharing the document id:
//! `documents/<id>.yaml`, `answers/<id>.yaml` and `sessions/<id>.yaml`.
//! All reads and writes are scoped to the store's user; another user's
//! record behaves exactly like a missing one.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::answers::WizardAnswers;
use crate::core::document::{
    DocumentFormat, DocumentMetadata, DocumentStatus, TransitionError, UserDocument,
};
use crate::core::identity::{RecordId, RecordPrefix};
use crate::core::project::Project;
use crate::core::session::{DocumentAnalytics, SessionProgress, WizardSession};
use crate::schema::model::WizardTemplate;
use crate::schema::validator::StepValidator;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document reference '{reference}' is ambiguous ({count} matches)")]
    Ambiguous { reference: String, count: usize },

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed record {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize record: {0}")]
    Serialize(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Sort key for document listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentSort {
    Created,
    #[default]
    Modified,
    Title,
}

impl std::str::FromStr for DocumentSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" | "started" => Ok(DocumentSort::Created),
            "modified" | "updated" => Ok(DocumentSort::Modified),
            "title" => Ok(DocumentSort::Title),
            _ => Err(format!(
                "Invalid sort key: {}. Use created, modified, or title",
                s
            )),
        }
    }
}

/// Filters and paging for [`DocumentStore::list_documents`]
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub status: Option<DocumentStatus>,
    pub template_id: Option<String>,
    pub sort: DocumentSort,
    /// Flip the default order (newest first, titles A-Z)
    pub reverse: bool,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// One page of a listing plus the unpaged match count
#[derive(Debug, Clone)]
pub struct DocumentPage {
    pub documents: Vec<UserDocument>,
    pub total: usize,
}

/// Everything stored for one document, as written by `doc backup`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentBundle {
    pub document: UserDocument,
    pub answers: WizardAnswers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<WizardSession>,
    pub exported_at: DateTime<Utc>,
}

pub struct DocumentStore {
    project: Project,
    user: String,
    session_ttl: Duration,
}

impl DocumentStore {
    pub fn new(project: Project, user: impl Into<String>, session_ttl: Duration) -> Self {
        Self {
            project,
            user: user.into(),
            session_ttl,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Create an empty draft for a template
    pub fn create_document(
        &self,
        template: &WizardTemplate,
        title: &str,
        format: DocumentFormat,
    ) -> Result<UserDocument, StoreError> {
        let now = Utc::now();
        let mut doc = UserDocument::new(&self.user, &template.id, title, format, now);
        doc.total_questions = template.total_questions();
        doc.required_questions = template.required_field_ids().len();
        doc.completion_percentage = crate::core::document::calculate_completion(
            doc.total_questions,
            0,
            doc.required_questions,
        );
        self.write_document(&doc)?;
        tracing::info!(id = %doc.id, template = %template.id, "created document");
        Ok(doc)
    }

    pub fn load_document(&self, id: &RecordId) -> Result<UserDocument, StoreError> {
        let path = self.project.document_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let doc: UserDocument = read_yaml(&path)?;
        if doc.user_id != self.user {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(doc)
    }

    /// Resolve a full id or a unique fragment of one to a document id
    pub fn resolve_id(&self, reference: &str) -> Result<RecordId, StoreError> {
        if let Ok(id) = RecordId::parse_as(reference, RecordPrefix::Doc) {
            return Ok(id);
        }
        let needle = reference.to_uppercase();
        let matches: Vec<RecordId> = self
            .iter_documents()
            .map(|doc| doc.id)
            .filter(|id| id.to_string().contains(&needle))
            .collect();
        match matches.len() {
            0 => Err(StoreError::NotFound(reference.to_string())),
            1 => Ok(matches[0].clone()),
            count => Err(StoreError::Ambiguous {
                reference: reference.to_string(),
                count,
            }),
        }
    }

    /// Upsert answers and recompute the document's progress
    pub fn save_answers(
        &self,
        id: &RecordId,
        answers: WizardAnswers,
        template: &WizardTemplate,
    ) -> Result<UserDocument, StoreError> {
        let mut stored = self.load_answers(id)?;
        stored.merge(answers);
        self.write_answers(id, stored, template)
    }

    /// Store `answers` as the document's complete answer set, dropping any
    /// stored answer it no longer contains
    pub fn replace_answers(
        &self,
        id: &RecordId,
        answers: WizardAnswers,
        template: &WizardTemplate,
    ) -> Result<UserDocument, StoreError> {
        self.write_answers(id, answers, template)
    }

    fn write_answers(
        &self,
        id: &RecordId,
        mut stored: WizardAnswers,
        template: &WizardTemplate,
    ) -> Result<UserDocument, StoreError> {
        let mut doc = self.load_document(id)?;
        match StepValidator::new(template) {
            Ok(validator) => {
                validator.refresh_validity(template, &mut stored);
            }
            Err(e) => tracing::warn!(template = %template.id, error = %e, "answers stored unchecked"),
        }
        let progress = template.progress(&stored);
        doc.record_progress(
            progress.total,
            progress.answered,
            progress.required,
            progress.answered_required,
            Utc::now(),
        );

        write_yaml(&self.project.answers_path(id), &stored)?;
        self.write_document(&doc)?;
        tracing::debug!(
            id = %id,
            answered = progress.answered,
            completion = doc.completion_percentage,
            "saved answers"
        );
        Ok(doc)
    }

    /// Stored answers of a document; none yet is an empty set
    pub fn load_answers(&self, id: &RecordId) -> Result<WizardAnswers, StoreError> {
        self.load_document(id)?;
        let path = self.project.answers_path(id);
        if !path.exists() {
            return Ok(WizardAnswers::new());
        }
        read_yaml(&path)
    }

    /// Create or refresh the document's session with a progress report
    pub fn save_session(
        &self,
        id: &RecordId,
        progress: SessionProgress,
    ) -> Result<WizardSession, StoreError> {
        self.load_document(id)?;
        let now = Utc::now();
        let path = self.project.session_path(id);

        let mut session = match self.read_session(id)? {
            Some(mut existing) if !existing.is_expired(now) => {
                existing.touch(now, self.session_ttl);
                existing
            }
            _ => WizardSession::new(id.clone(), &self.user, now, self.session_ttl),
        };
        session.apply(progress);

        write_yaml(&path, &session)?;
        tracing::debug!(id = %id, step = session.current_step, "saved session");
        Ok(session)
    }

    /// The document's live session; expired sessions read as none
    pub fn load_session(
        &self,
        id: &RecordId,
        now: DateTime<Utc>,
    ) -> Result<Option<WizardSession>, StoreError> {
        self.load_document(id)?;
        Ok(self.read_session(id)?.filter(|s| !s.is_expired(now)))
    }

    /// Delete this user's expired sessions, returning how many were removed
    pub fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut removed = 0;
        for path in Project::iter_yaml_files(&self.project.sessions_dir()) {
            let session: WizardSession = match read_yaml(&path) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable session");
                    continue;
                }
            };
            if session.user_id == self.user && session.is_expired(now) {
                remove_file(&path)?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, "removed expired sessions");
        }
        Ok(removed)
    }

    /// Filtered, sorted, paged listing of this user's documents
    pub fn list_documents(&self, query: &DocumentQuery) -> DocumentPage {
        let mut documents: Vec<UserDocument> = self
            .iter_documents()
            .filter(|d| query.status.map_or(true, |s| d.status == s))
            .filter(|d| {
                query
                    .template_id
                    .as_deref()
                    .map_or(true, |t| d.template_id == t)
            })
            .collect();

        match query.sort {
            DocumentSort::Created => documents.sort_by(|a, b| b.started_at.cmp(&a.started_at)),
            DocumentSort::Modified => {
                documents.sort_by(|a, b| b.last_modified_at.cmp(&a.last_modified_at))
            }
            DocumentSort::Title => {
                documents.sort_by_key(|d| d.title.to_lowercase());
            }
        }
        if query.reverse {
            documents.reverse();
        }

        let total = documents.len();
        let documents = documents
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        DocumentPage { documents, total }
    }

    /// Apply a status change allowed by the transition table
    pub fn update_status(
        &self,
        id: &RecordId,
        status: DocumentStatus,
    ) -> Result<UserDocument, StoreError> {
        let mut doc = self.load_document(id)?;
        let from = doc.status;
        doc.transition_to(status, Utc::now())?;
        self.write_document(&doc)?;
        tracing::info!(id = %id, from = %from, to = %status, "status changed");
        Ok(doc)
    }

    pub fn archive(&self, id: &RecordId) -> Result<UserDocument, StoreError> {
        self.update_status(id, DocumentStatus::Archived)
    }

    /// Remove a document together with its answers and session
    pub fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        self.load_document(id)?;
        for path in [
            self.project.answers_path(id),
            self.project.session_path(id),
            self.project.document_path(id),
        ] {
            if path.exists() {
                remove_file(&path)?;
            }
        }
        tracing::info!(id = %id, "deleted document");
        Ok(())
    }

    /// Copy a document and its answers into a fresh draft
    pub fn duplicate(
        &self,
        id: &RecordId,
        title: Option<&str>,
    ) -> Result<UserDocument, StoreError> {
        let source = self.load_document(id)?;
        let answers = self.load_answers(id)?;
        let now = Utc::now();

        let title = title
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} (Kopya)", source.title));
        let mut copy = UserDocument::new(
            &self.user,
            &source.template_id,
            title,
            source.output_format,
            now,
        );
        copy.total_questions = source.total_questions;
        copy.required_questions = source.required_questions;
        copy.questions_answered = source.questions_answered;
        copy.completion_percentage = source.completion_percentage;

        self.write_document(&copy)?;
        if !answers.is_empty() {
            write_yaml(&self.project.answers_path(&copy.id), &answers)?;
        }
        tracing::info!(source = %id, copy = %copy.id, "duplicated document");
        Ok(copy)
    }

    /// Persist generated content; the document becomes completed
    pub fn store_generated(
        &self,
        id: &RecordId,
        content: String,
        metadata: DocumentMetadata,
    ) -> Result<UserDocument, StoreError> {
        let mut doc = self.load_document(id)?;
        doc.record_generation(content, metadata, Utc::now())?;
        self.write_document(&doc)?;
        tracing::info!(id = %id, version = doc.document_version, "stored generated content");
        Ok(doc)
    }

    pub fn export_bundle(&self, id: &RecordId) -> Result<DocumentBundle, StoreError> {
        let now = Utc::now();
        Ok(DocumentBundle {
            document: self.load_document(id)?,
            answers: self.load_answers(id)?,
            session: self.read_session(id)?,
            exported_at: now,
        })
    }

    /// Wizard statistics of a document, from its session counters
    pub fn analytics(&self, id: &RecordId) -> Result<DocumentAnalytics, StoreError> {
        let doc = self.load_document(id)?;
        let session = self.read_session(id)?;

        let mut analytics = DocumentAnalytics {
            document_id: doc.id.clone(),
            template_id: doc.template_id.clone(),
            total_time_spent_secs: 0,
            questions_answered: doc.questions_answered,
            questions_skipped: doc.total_questions.saturating_sub(doc.questions_answered),
            back_navigation_count: 0,
            validation_error_count: 0,
            abandoned_at_step: None,
            completion_date: doc.completed_at,
        };
        if let Some(session) = session {
            analytics.total_time_spent_secs = session.total_time_spent_secs;
            analytics.back_navigation_count = session.back_navigation_count;
            analytics.validation_error_count = session.validation_error_count;
            if !session.is_complete && doc.status != DocumentStatus::Completed {
                analytics.abandoned_at_step = Some(session.current_step);
            }
        }
        Ok(analytics)
    }

    fn write_document(&self, doc: &UserDocument) -> Result<(), StoreError> {
        write_yaml(&self.project.document_path(&doc.id), doc)
    }

    fn read_session(&self, id: &RecordId) -> Result<Option<WizardSession>, StoreError> {
        let path = self.project.session_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let session: WizardSession = read_yaml(&path)?;
        Ok((session.user_id == self.user).then_some(session))
    }

    /// This user's readable documents; malformed files are logged and skipped
    fn iter_documents(&self) -> impl Iterator<Item = UserDocument> + '_ {
        Project::iter_yaml_files(&self.project.documents_dir()).filter_map(move |path| {
            match read_yaml::<UserDocument>(&path) {
                Ok(doc) if doc.user_id == self.user => Some(doc),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable document");
                    None
                }
            }
        })
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yml::from_str(&content).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let yaml = serde_yml::to_string(value).map_err(|e| StoreError::Serialize(e.to_string()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, yaml).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn remove_file(path: &Path) -> Result<(), StoreError> {
    fs::remove_file(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::TemplateRegistry;
    use tempfile::tempdir;

    fn setup(user: &str) -> (tempfile::TempDir, DocumentStore, WizardTemplate) {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let store = DocumentStore::new(project, user, Duration::hours(24));
        let template = TemplateRegistry::builtin()
            .unwrap()
            .get("kira-itiraz-v1")
            .unwrap()
            .clone();
        (tmp, store, template)
    }

    #[test]
    fn test_create_and_load_document() {
        let (_tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "İtirazım", DocumentFormat::Txt)
            .unwrap();
        assert_eq!(doc.status, DocumentStatus::Draft);
        assert_eq!(doc.total_questions, template.total_questions());
        assert_eq!(doc.completion_percentage, 0);

        let loaded = store.load_document(&doc.id).unwrap();
        assert_eq!(loaded.title, "İtirazım");
        assert_eq!(loaded.document_version, 1);
    }

    #[test]
    fn test_other_users_document_is_not_found() {
        let (tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "x", DocumentFormat::Txt)
            .unwrap();

        let project = Project::discover_from(tmp.path()).unwrap();
        let other = DocumentStore::new(project, "mehmet", Duration::hours(24));
        assert!(matches!(
            other.load_document(&doc.id),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(other.list_documents(&DocumentQuery::default()).total, 0);
    }

    #[test]
    fn test_save_answers_merges_and_recomputes_progress() {
        let (_tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "x", DocumentFormat::Txt)
            .unwrap();

        let mut first = WizardAnswers::new();
        first.set("kiraci_bilgileri", "kiraci_ad", "Ahmet Yılmaz");
        let doc1 = store.save_answers(&doc.id, first, &template).unwrap();
        assert_eq!(doc1.status, DocumentStatus::InProgress);
        assert_eq!(doc1.questions_answered, 1);

        let mut second = WizardAnswers::new();
        second.set("kiraci_bilgileri", "kiraci_tc", "12345678901");
        second.set("kiraci_bilgileri", "kiraci_ad", "Ahmet Y.");
        let doc2 = store.save_answers(&doc.id, second, &template).unwrap();
        assert_eq!(doc2.questions_answered, 2);
        assert!(doc2.completion_percentage > doc1.completion_percentage);

        let answers = store.load_answers(&doc.id).unwrap();
        assert_eq!(
            answers.get("kiraci_bilgileri", "kiraci_ad").unwrap().as_text(),
            "Ahmet Y."
        );
    }

    #[test]
    fn test_session_round_trip_and_expiry() {
        let (_tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "x", DocumentFormat::Txt)
            .unwrap();

        store
            .save_session(
                &doc.id,
                SessionProgress {
                    current_step: 2,
                    back_navigations: 1,
                    ..Default::default()
                },
            )
            .unwrap();

        let now = Utc::now();
        let live = store.load_session(&doc.id, now).unwrap().unwrap();
        assert_eq!(live.current_step, 2);
        assert!(store
            .load_session(&doc.id, now + Duration::hours(25))
            .unwrap()
            .is_none());

        assert_eq!(store.cleanup_expired_sessions(now).unwrap(), 0);
        assert_eq!(
            store
                .cleanup_expired_sessions(now + Duration::hours(25))
                .unwrap(),
            1
        );
        assert!(store.load_session(&doc.id, now).unwrap().is_none());
    }

    #[test]
    fn test_list_filters_sorts_and_pages() {
        let (_tmp, store, template) = setup("ayse");
        for title in ["Charlie", "alpha", "Bravo"] {
            store
                .create_document(&template, title, DocumentFormat::Txt)
                .unwrap();
        }
        let archived = store
            .create_document(&template, "Delta", DocumentFormat::Txt)
            .unwrap();
        store.archive(&archived.id).unwrap();

        let page = store.list_documents(&DocumentQuery {
            sort: DocumentSort::Title,
            ..Default::default()
        });
        let titles: Vec<_> = page.documents.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["alpha", "Bravo", "Charlie", "Delta"]);

        let drafts = store.list_documents(&DocumentQuery {
            status: Some(DocumentStatus::Draft),
            sort: DocumentSort::Title,
            limit: Some(1),
            offset: 1,
            ..Default::default()
        });
        assert_eq!(drafts.total, 3);
        assert_eq!(drafts.documents.len(), 1);
        assert_eq!(drafts.documents[0].title, "Bravo");

        let other_template = store.list_documents(&DocumentQuery {
            template_id: Some("kira-sozlesmesi-v1".into()),
            ..Default::default()
        });
        assert_eq!(other_template.total, 0);
    }

    #[test]
    fn test_wizard_cleared_answer_stays_cleared_after_reload() {
        use crate::schema::wizard::WizardState;
        use serde_json::json;

        let (_tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "x", DocumentFormat::Txt)
            .unwrap();
        let mut step = json!({
            "kiraci_ad": "Ahmet Yılmaz",
            "kiraci_tc": "12345678901",
            "kiraci_adres": "Moda Mah. Bahariye Cad. No:12 Kadıköy",
            "kiraci_tel": "0532 123 45 67",
            "kiraci_email": "ahmet@example.com",
        });

        let mut state = WizardState::new(&template, WizardAnswers::new()).unwrap();
        state.submit(step.as_object().unwrap()).unwrap();
        store
            .replace_answers(&doc.id, state.answers().clone(), &template)
            .unwrap();
        assert!(store
            .load_answers(&doc.id)
            .unwrap()
            .is_answered("kiraci_bilgileri", "kiraci_email"));

        // Resume from disk, go over step one again with the e-mail emptied
        let mut resumed = WizardState::new(&template, store.load_answers(&doc.id).unwrap()).unwrap();
        step["kiraci_email"] = json!("");
        resumed.submit(step.as_object().unwrap()).unwrap();
        store
            .replace_answers(&doc.id, resumed.answers().clone(), &template)
            .unwrap();

        let reloaded = store.load_answers(&doc.id).unwrap();
        assert!(reloaded.get("kiraci_bilgileri", "kiraci_email").is_none());
        assert!(reloaded.is_answered("kiraci_bilgileri", "kiraci_ad"));
    }

    #[test]
    fn test_invalid_answers_are_flagged_and_not_counted() {
        let (_tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "x", DocumentFormat::Txt)
            .unwrap();

        let mut answers = WizardAnswers::new();
        answers.set("kiraci_bilgileri", "kiraci_tc", "1234");
        let saved = store.save_answers(&doc.id, answers, &template).unwrap();
        assert_eq!(saved.questions_answered, 0);
        assert_eq!(saved.completion_percentage, 0);
        let stored = store.load_answers(&doc.id).unwrap();
        assert!(!stored.get("kiraci_bilgileri", "kiraci_tc").unwrap().is_valid());

        let mut fixed = WizardAnswers::new();
        fixed.set("kiraci_bilgileri", "kiraci_tc", "12345678901");
        let saved = store.save_answers(&doc.id, fixed, &template).unwrap();
        assert_eq!(saved.questions_answered, 1);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let (_tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "x", DocumentFormat::Txt)
            .unwrap();
        let err = store
            .update_status(&doc.id, DocumentStatus::Completed)
            .unwrap_err();
        assert!(matches!(err, StoreError::Transition(_)));
        assert_eq!(
            store.load_document(&doc.id).unwrap().status,
            DocumentStatus::Draft
        );
    }

    #[test]
    fn test_delete_cascades() {
        let (_tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "x", DocumentFormat::Txt)
            .unwrap();
        let mut answers = WizardAnswers::new();
        answers.set("kiraci_bilgileri", "kiraci_ad", "Ahmet");
        store.save_answers(&doc.id, answers, &template).unwrap();
        store
            .save_session(&doc.id, SessionProgress::default())
            .unwrap();

        store.delete(&doc.id).unwrap();
        let project = store.project();
        assert!(!project.document_path(&doc.id).exists());
        assert!(!project.answers_path(&doc.id).exists());
        assert!(!project.session_path(&doc.id).exists());
    }

    #[test]
    fn test_duplicate_copies_answers_into_new_draft() {
        let (_tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "Asıl", DocumentFormat::Html)
            .unwrap();
        let mut answers = WizardAnswers::new();
        answers.set("kiraci_bilgileri", "kiraci_ad", "Ahmet");
        store.save_answers(&doc.id, answers, &template).unwrap();

        let copy = store.duplicate(&doc.id, None).unwrap();
        assert_ne!(copy.id, doc.id);
        assert_eq!(copy.title, "Asıl (Kopya)");
        assert_eq!(copy.status, DocumentStatus::Draft);
        assert_eq!(copy.output_format, DocumentFormat::Html);
        assert!(store
            .load_answers(&copy.id)
            .unwrap()
            .is_answered("kiraci_bilgileri", "kiraci_ad"));
    }

    #[test]
    fn test_store_generated_completes_and_bumps_version() {
        let (_tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "x", DocumentFormat::Txt)
            .unwrap();
        let first = store
            .store_generated(&doc.id, "v1".into(), DocumentMetadata::default())
            .unwrap();
        assert_eq!(first.status, DocumentStatus::Completed);
        assert_eq!(first.document_version, 1);

        let second = store
            .store_generated(&doc.id, "v2".into(), DocumentMetadata::default())
            .unwrap();
        assert_eq!(second.document_version, 2);
        assert_eq!(second.generated_content.as_deref(), Some("v2"));
    }

    #[test]
    fn test_resolve_id_by_fragment() {
        let (_tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "x", DocumentFormat::Txt)
            .unwrap();
        let full = doc.id.to_string();
        let fragment = &full[full.len() - 8..].to_lowercase();
        assert_eq!(store.resolve_id(fragment).unwrap(), doc.id);
        assert_eq!(store.resolve_id(&full).unwrap(), doc.id);
        assert!(matches!(
            store.resolve_id("ZZZZZZZZZZZZ"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_bundle_and_analytics() {
        let (_tmp, store, template) = setup("ayse");
        let doc = store
            .create_document(&template, "x", DocumentFormat::Txt)
            .unwrap();
        store
            .save_session(
                &doc.id,
                SessionProgress {
                    current_step: 3,
                    validation_failures: 2,
                    back_navigations: 1,
                    ..Default::default()
                },
            )
            .unwrap();

        let bundle = store.export_bundle(&doc.id).unwrap();
        assert_eq!(bundle.document.id, doc.id);
        assert!(bundle.session.is_some());

        let analytics = store.analytics(&doc.id).unwrap();
        assert_eq!(analytics.validation_error_count, 2);
        assert_eq!(analytics.back_navigation_count, 1);
        assert_eq!(analytics.abandoned_at_step, Some(3));
        assert_eq!(analytics.questions_skipped, template.total_questions());
    }
}
