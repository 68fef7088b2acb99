//! Core module - records, persistence and project layout

pub mod answers;
pub mod config;
pub mod document;
pub mod identity;
pub mod project;
pub mod session;
pub mod store;

pub use answers::{Answer, AnswerRecord, WizardAnswers};
pub use config::Config;
pub use document::{
    calculate_completion, can_transition_to, DocumentFormat, DocumentMetadata, DocumentStatus,
    TransitionError, UserDocument,
};
pub use identity::{IdParseError, RecordId, RecordPrefix};
pub use project::{Project, ProjectError};
pub use session::{DocumentAnalytics, SessionProgress, WizardSession};
pub use store::{DocumentBundle, DocumentPage, DocumentQuery, DocumentSort, DocumentStore, StoreError};
