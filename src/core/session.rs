//! Wizard sessions: resumable position inside a running wizard

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::identity::{RecordId, RecordPrefix};

/// Resumption record for one document's wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    pub id: RecordId,
    pub document_id: RecordId,
    pub user_id: String,

    /// Zero-based index of the step the user is on
    pub current_step: usize,

    #[serde(default)]
    pub visible_questions: Vec<String>,
    #[serde(default)]
    pub completed_questions: Vec<String>,
    #[serde(default)]
    pub required_questions: Vec<String>,

    /// Outstanding field errors of the current step
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub validation_errors: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub completion_percentage: u8,
    #[serde(default)]
    pub is_complete: bool,

    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    #[serde(default)]
    pub total_time_spent_secs: u64,
    #[serde(default)]
    pub questions_answered: usize,
    #[serde(default)]
    pub back_navigation_count: u32,
    #[serde(default)]
    pub validation_error_count: u32,
}

impl WizardSession {
    pub fn new(
        document_id: RecordId,
        user_id: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: RecordId::new(RecordPrefix::Ses),
            document_id,
            user_id: user_id.into(),
            current_step: 0,
            visible_questions: Vec::new(),
            completed_questions: Vec::new(),
            required_questions: Vec::new(),
            validation_errors: BTreeMap::new(),
            completion_percentage: 0,
            is_complete: false,
            started_at: now,
            last_activity_at: now,
            expires_at: now + ttl,
            total_time_spent_secs: 0,
            questions_answered: 0,
            back_navigation_count: 0,
            validation_error_count: 0,
        }
    }

    /// Record activity and push the expiry window forward
    pub fn touch(&mut self, now: DateTime<Utc>, ttl: Duration) {
        let elapsed = (now - self.last_activity_at).num_seconds().max(0) as u64;
        self.total_time_spent_secs += elapsed;
        self.last_activity_at = now;
        self.expires_at = now + ttl;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Questions that were visible but never completed
    pub fn skipped_questions(&self) -> usize {
        self.visible_questions
            .iter()
            .filter(|q| !self.completed_questions.contains(q))
            .count()
    }
}

/// Progress counters the wizard reports into a session save
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProgress {
    pub current_step: usize,
    pub visible_questions: Vec<String>,
    pub completed_questions: Vec<String>,
    pub required_questions: Vec<String>,
    pub validation_errors: BTreeMap<String, Vec<String>>,
    pub completion_percentage: u8,
    pub is_complete: bool,
    pub back_navigations: u32,
    pub validation_failures: u32,
}

impl WizardSession {
    /// Apply a progress report; counters accumulate across saves
    pub fn apply(&mut self, progress: SessionProgress) {
        self.current_step = progress.current_step;
        self.questions_answered = progress.completed_questions.len();
        self.visible_questions = progress.visible_questions;
        self.completed_questions = progress.completed_questions;
        self.required_questions = progress.required_questions;
        self.validation_errors = progress.validation_errors;
        self.completion_percentage = progress.completion_percentage;
        self.is_complete = progress.is_complete;
        self.back_navigation_count += progress.back_navigations;
        self.validation_error_count += progress.validation_failures;
    }
}

/// Summary of how a wizard run went
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentAnalytics {
    pub document_id: RecordId,
    pub template_id: String,
    pub total_time_spent_secs: u64,
    pub questions_answered: usize,
    pub questions_skipped: usize,
    pub back_navigation_count: u32,
    pub validation_error_count: u32,
    /// Step index where an incomplete session stopped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abandoned_at_step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime<Utc>>,
}
