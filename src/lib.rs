//! Dilekce: wizard-driven Turkish legal documents
//!
//! Templates describe a step-by-step questionnaire. Answers are validated
//! per step, stored as plain YAML records next to the document, mapped into
//! template variables and rendered as text, Word or printable HTML. Reusable
//! clauses carry their own semantic version history.

pub mod assembly;
pub mod clause;
pub mod cli;
pub mod core;
pub mod export;
pub mod schema;
pub mod yaml;
