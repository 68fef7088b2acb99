//! User documents: lifecycle status, progress and metadata

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::identity::{RecordId, RecordPrefix};

/// Lifecycle status of a user document
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
    Archived,
}

impl DocumentStatus {
    pub fn all() -> &'static [DocumentStatus] {
        &[
            DocumentStatus::Draft,
            DocumentStatus::InProgress,
            DocumentStatus::Completed,
            DocumentStatus::Archived,
        ]
    }

    /// Statuses reachable from this one in a single step
    pub fn allowed_transitions(self) -> &'static [DocumentStatus] {
        match self {
            DocumentStatus::Draft => &[DocumentStatus::InProgress, DocumentStatus::Archived],
            DocumentStatus::InProgress => &[
                DocumentStatus::Completed,
                DocumentStatus::Draft,
                DocumentStatus::Archived,
            ],
            DocumentStatus::Completed => &[DocumentStatus::Archived, DocumentStatus::InProgress],
            DocumentStatus::Archived => &[DocumentStatus::Draft, DocumentStatus::InProgress],
        }
    }

    pub fn can_transition_to(self, to: DocumentStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }
}

/// Check whether a document may move from `from` to `to`
pub fn can_transition_to(from: DocumentStatus, to: DocumentStatus) -> bool {
    from.can_transition_to(to)
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Draft => write!(f, "DRAFT"),
            DocumentStatus::InProgress => write!(f, "IN_PROGRESS"),
            DocumentStatus::Completed => write!(f, "COMPLETED"),
            DocumentStatus::Archived => write!(f, "ARCHIVED"),
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "draft" => Ok(DocumentStatus::Draft),
            "in_progress" | "inprogress" => Ok(DocumentStatus::InProgress),
            "completed" => Ok(DocumentStatus::Completed),
            "archived" => Ok(DocumentStatus::Archived),
            _ => Err(format!("Unknown document status: {}", s)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid status transition: {from} → {to} (allowed: {})", allowed_list(.from))]
pub struct TransitionError {
    pub from: DocumentStatus,
    pub to: DocumentStatus,
}

fn allowed_list(from: &DocumentStatus) -> String {
    from.allowed_transitions()
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Output artifact chosen for a document
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Txt,
    Docx,
    Html,
}

impl DocumentFormat {
    pub fn all() -> &'static [DocumentFormat] {
        &[DocumentFormat::Txt, DocumentFormat::Docx, DocumentFormat::Html]
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Txt => "txt",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Html => "html",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_start_matches('.') {
            "txt" | "text" => Ok(DocumentFormat::Txt),
            "docx" | "word" => Ok(DocumentFormat::Docx),
            "html" | "print" => Ok(DocumentFormat::Html),
            _ => Err(format!("Unknown document format: {} (expected txt, docx or html)", s)),
        }
    }
}

/// Descriptive metadata produced alongside generated content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub document_type: String,
    pub created_date: NaiveDate,
    pub case_number: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parties: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legal_basis: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    /// Embedded clauses as `<clause id>@<version>`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clauses: Vec<String>,
}

/// One wizard run toward one generated document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    pub id: RecordId,
    pub user_id: String,
    pub template_id: String,
    pub title: String,

    #[serde(default)]
    pub status: DocumentStatus,

    #[serde(default)]
    pub completion_percentage: u8,
    #[serde(default)]
    pub questions_answered: usize,
    #[serde(default)]
    pub total_questions: usize,
    #[serde(default)]
    pub required_questions: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_content: Option<String>,

    #[serde(default)]
    pub output_format: DocumentFormat,

    /// Printed case number of the latest generation; not a storage key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,

    pub document_version: u32,
    pub started_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl UserDocument {
    pub fn new(
        user_id: impl Into<String>,
        template_id: impl Into<String>,
        title: impl Into<String>,
        output_format: DocumentFormat,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::new(RecordPrefix::Doc),
            user_id: user_id.into(),
            template_id: template_id.into(),
            title: title.into(),
            status: DocumentStatus::Draft,
            completion_percentage: 0,
            questions_answered: 0,
            total_questions: 0,
            required_questions: 0,
            generated_content: None,
            output_format,
            case_number: None,
            metadata: None,
            document_version: 1,
            started_at: now,
            last_modified_at: now,
            completed_at: None,
        }
    }

    /// Move to a new status, rejecting pairs outside the transition table
    pub fn transition_to(
        &mut self,
        to: DocumentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.last_modified_at = now;
        if to == DocumentStatus::Completed {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Recompute progress counters after answers change.
    ///
    /// A draft with at least one answer becomes in-progress.
    pub fn record_progress(
        &mut self,
        total: usize,
        answered: usize,
        required: usize,
        answered_required: usize,
        now: DateTime<Utc>,
    ) {
        self.total_questions = total;
        self.questions_answered = answered;
        self.required_questions = required;
        self.completion_percentage = calculate_completion(total, answered_required, required);
        self.last_modified_at = now;

        if self.status == DocumentStatus::Draft && answered > 0 {
            self.status = DocumentStatus::InProgress;
        }
    }

    /// Store freshly generated content and mark the document completed.
    ///
    /// Regenerating an already generated document bumps its version.
    pub fn record_generation(
        &mut self,
        content: String,
        metadata: DocumentMetadata,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        match self.status {
            DocumentStatus::Completed => {}
            DocumentStatus::Draft => {
                self.transition_to(DocumentStatus::InProgress, now)?;
                self.transition_to(DocumentStatus::Completed, now)?;
            }
            _ => self.transition_to(DocumentStatus::Completed, now)?,
        }

        if self.generated_content.is_some() {
            self.document_version += 1;
        }
        self.case_number = Some(metadata.case_number.clone());
        self.generated_content = Some(content);
        self.metadata = Some(metadata);
        self.completed_at = Some(now);
        self.last_modified_at = now;
        Ok(())
    }
}

/// Completion percentage of the required questions, clamped to 0..=100.
///
/// Zero required questions counts as complete. Answers beyond the number of
/// questions that exist are ignored.
pub fn calculate_completion(total: usize, answered: usize, required: usize) -> u8 {
    if required == 0 {
        return 100;
    }
    let answered = if total > 0 { answered.min(total) } else { answered };
    let ratio = answered.min(required) as f64 / required as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Candidate titles for a new document, most generic first, without duplicates
pub fn title_suggestions<'a>(
    template_name: &str,
    answers: impl IntoIterator<Item = &'a str>,
    today: NaiveDate,
) -> Vec<String> {
    let mut suggestions = vec![
        format!("{} - {}", template_name, today.format("%d.%m.%Y")),
        format!("{} Belgesi", template_name),
        format!("Yeni {}", template_name),
    ];

    for value in answers {
        let value = value.trim();
        if !value.is_empty() && value.chars().count() < 50 {
            suggestions.push(format!("{} - {}", template_name, value));
        }
    }

    let mut seen = std::collections::HashSet::new();
    suggestions.retain(|s| seen.insert(s.clone()));
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use DocumentStatus::*;

    #[test]
    fn test_calculate_completion() {
        assert_eq!(calculate_completion(10, 10, 10), 100);
        assert_eq!(calculate_completion(10, 0, 10), 0);
        assert_eq!(calculate_completion(10, 5, 0), 100);
        assert_eq!(calculate_completion(10, 1, 3), 33);
        assert_eq!(calculate_completion(10, 2, 3), 67);
        assert_eq!(calculate_completion(10, 20, 10), 100);
    }

    #[test]
    fn test_transition_table_exact() {
        let allowed = [
            (Draft, InProgress),
            (Draft, Archived),
            (InProgress, Completed),
            (InProgress, Draft),
            (InProgress, Archived),
            (Completed, Archived),
            (Completed, InProgress),
            (Archived, Draft),
            (Archived, InProgress),
        ];
        for from in DocumentStatus::all() {
            for to in DocumentStatus::all() {
                let expected = allowed.contains(&(*from, *to));
                assert_eq!(
                    can_transition_to(*from, *to),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_completed_cannot_return_to_draft() {
        assert!(!can_transition_to(Completed, Draft));
        assert!(can_transition_to(Draft, Archived));
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("in_progress".parse::<DocumentStatus>().unwrap(), InProgress);
        assert_eq!("IN-PROGRESS".parse::<DocumentStatus>().unwrap(), InProgress);
        assert_eq!(InProgress.to_string(), "IN_PROGRESS");
        assert!("done".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let yaml = serde_yml::to_string(&InProgress).unwrap();
        assert_eq!(yaml.trim(), "IN_PROGRESS");
    }

    #[test]
    fn test_transition_to_rejects_invalid_pair() {
        let now = Utc::now();
        let mut doc = UserDocument::new("u", "t", "Başlık", DocumentFormat::Txt, now);
        doc.status = Completed;
        let err = doc.transition_to(Draft, now).unwrap_err();
        assert_eq!(err.from, Completed);
        assert_eq!(doc.status, Completed);
    }

    #[test]
    fn test_record_progress_promotes_draft() {
        let now = Utc::now();
        let mut doc = UserDocument::new("u", "t", "Başlık", DocumentFormat::Txt, now);
        doc.record_progress(10, 0, 8, 0, now);
        assert_eq!(doc.status, Draft);
        doc.record_progress(10, 4, 8, 4, now);
        assert_eq!(doc.status, InProgress);
        assert_eq!(doc.completion_percentage, 50);
    }

    #[test]
    fn test_regeneration_bumps_version() {
        let now = Utc::now();
        let mut doc = UserDocument::new("u", "t", "Başlık", DocumentFormat::Txt, now);
        let meta = DocumentMetadata {
            case_number: "ARTIKLO-2024-ABC123".into(),
            ..Default::default()
        };
        doc.record_generation("ilk".into(), meta.clone(), now).unwrap();
        assert_eq!(doc.status, Completed);
        assert_eq!(doc.document_version, 1);
        doc.record_generation("ikinci".into(), meta, now).unwrap();
        assert_eq!(doc.document_version, 2);
        assert_eq!(doc.generated_content.as_deref(), Some("ikinci"));
    }

    #[test]
    fn test_generation_rejected_when_archived() {
        let now = Utc::now();
        let mut doc = UserDocument::new("u", "t", "Başlık", DocumentFormat::Txt, now);
        doc.status = Archived;
        assert!(doc
            .record_generation("x".into(), DocumentMetadata::default(), now)
            .is_err());
    }

    #[test]
    fn test_title_suggestions_dedup() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let titles = title_suggestions("Kira İtirazı", ["Ahmet Yılmaz", "Ahmet Yılmaz", ""], today);
        assert_eq!(titles[0], "Kira İtirazı - 05.03.2024");
        assert_eq!(titles.len(), 4);
        assert!(titles.contains(&"Kira İtirazı - Ahmet Yılmaz".to_string()));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("DOCX".parse::<DocumentFormat>().unwrap(), DocumentFormat::Docx);
        assert_eq!(".txt".parse::<DocumentFormat>().unwrap(), DocumentFormat::Txt);
        assert!("pdf".parse::<DocumentFormat>().is_err());
    }
}
