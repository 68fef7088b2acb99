//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use chrono::Utc;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::answers::{Answer, WizardAnswers};
use crate::core::identity::RecordId;
use crate::core::{Config, DocumentStore, Project};
use crate::schema::model::WizardTemplate;
use crate::schema::validator::{coerce_value, StepValidationError, StepValidator};
use crate::schema::TemplateRegistry;

/// Format a RecordId for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
pub fn format_short_id(id: &RecordId) -> String {
    truncate_str(&id.to_string(), 16)
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Resolve `auto` to the command's natural format
pub fn effective_format(global: &GlobalOpts, auto: OutputFormat) -> OutputFormat {
    match global.format {
        OutputFormat::Auto => auto,
        f => f,
    }
}

/// The project named by `--project`, or the one around the current directory
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    Project::resolve(global.project.as_deref()).map_err(|e| miette::miette!("{}", e))
}

/// Document store of the current user plus the effective configuration
pub fn open_store(global: &GlobalOpts) -> Result<(DocumentStore, Config)> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));
    let store = DocumentStore::new(project, config.user(), config.session_ttl());
    Ok((store, config))
}

/// Built-in templates plus the project's own, when inside a project
pub fn load_registry(project: Option<&Project>) -> Result<TemplateRegistry> {
    Ok(TemplateRegistry::load(project)?)
}

/// Answers read from a file, with what could not be placed
#[derive(Debug, Default)]
pub struct AnswerImport {
    pub answers: WizardAnswers,
    /// Keys matching neither a step nor a field of the template
    pub unknown: Vec<String>,
    /// `(field id, message)` for values that do not fit their field
    pub invalid: Vec<(String, String)>,
    /// Answers kept but marked invalid by their step's validation
    pub flagged: usize,
}

/// Read an answers file for a template.
///
/// The file is a YAML (or JSON) mapping, either nested by step
/// (`kiraci_bilgileri: {kiraci_ad: ...}`) or flat by field id. Both shapes
/// may be mixed; flat fields are filed under the step that declares them.
pub fn read_answers_file(path: &Path, template: &WizardTemplate) -> Result<AnswerImport> {
    let source = std::fs::read_to_string(path)
        .into_diagnostic()
        .map_err(|e| e.wrap_err(format!("Failed to read {}", path.display())))?;
    let filename = path.display().to_string();
    let root: Value = crate::yaml::parse(&source, &filename)?;
    let Value::Object(entries) = root else {
        return Err(miette::miette!(
            "{} must contain a mapping of step or field ids to answers",
            path.display()
        ));
    };

    let now = Utc::now();
    let mut import = AnswerImport::default();
    let place = |import: &mut AnswerImport, step_id: &str, field_id: &str, raw: &Value| {
        let Some(field) = template
            .step(step_id)
            .and_then(|step| step.field(field_id))
        else {
            import.unknown.push(format!("{}.{}", step_id, field_id));
            return;
        };
        match coerce_value(field, raw) {
            Ok(Some(value)) => import
                .answers
                .set(step_id, field_id, Answer::valid(value, now)),
            Ok(None) => {}
            Err(message) => import.invalid.push((field_id.to_string(), message)),
        }
    };

    for (key, value) in &entries {
        match (template.step(key), value) {
            (Some(step), Value::Object(fields)) => {
                for (field_id, raw) in fields {
                    place(&mut import, &step.id, field_id, raw);
                }
            }
            _ => match template.field(key) {
                Some((step, _)) => place(&mut import, &step.id, key, value),
                None => import.unknown.push(key.clone()),
            },
        }
    }

    let validator = StepValidator::new(template).map_err(|e| miette::miette!("{}", e))?;
    import.flagged = validator.refresh_validity(template, &mut import.answers);

    tracing::debug!(
        path = %path.display(),
        answered = import.answers.answered_count(),
        flagged = import.flagged,
        unknown = import.unknown.len(),
        invalid = import.invalid.len(),
        "read answers file"
    );
    Ok(import)
}

/// Print the problems of an import; errors out when any value was invalid
pub fn report_import(import: &AnswerImport) -> Result<()> {
    for key in &import.unknown {
        eprintln!(
            "{} Ignoring unknown answer key {}",
            style("!").yellow(),
            style(key).cyan()
        );
    }
    if import.invalid.is_empty() {
        return Ok(());
    }
    for (field, message) in &import.invalid {
        eprintln!("  {} {}: {}", style("✗").red(), field, message);
    }
    Err(miette::miette!(
        "{} answer(s) could not be read",
        import.invalid.len()
    ))
}

/// Print each violation of a failed step on its own line
pub fn print_step_errors(err: &StepValidationError) {
    println!("{} {}", style("✗").red(), style(err.to_string()).bold());
    for violation in err.violations() {
        println!(
            "    {} {}",
            style(format!("{}:", violation.label)).yellow(),
            violation.message
        );
    }
}

/// Write to a file if given, otherwise stdout
pub fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
        }
        None => print!("{}", content),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::RecordPrefix;
    use tempfile::tempdir;

    fn template() -> WizardTemplate {
        TemplateRegistry::builtin()
            .unwrap()
            .get("kira-itiraz-v1")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_format_short_id() {
        let id = RecordId::new(RecordPrefix::Doc);
        let formatted = format_short_id(&id);
        assert_eq!(formatted.chars().count(), 16);
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_truncate_str_counts_characters() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("İtiraz dilekçesi", 9), "İtiraz...");
    }

    #[test]
    fn test_read_answers_nested_and_flat() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("cevaplar.yaml");
        std::fs::write(
            &path,
            "kiraci_bilgileri:\n  kiraci_ad: Ayşe Demir\nmevcut_kira: \"5.000\"\nbilinmeyen: 1\n",
        )
        .unwrap();

        let import = read_answers_file(&path, &template()).unwrap();
        assert_eq!(
            import.answers.get("kiraci_bilgileri", "kiraci_ad").unwrap().as_text(),
            "Ayşe Demir"
        );
        assert_eq!(
            import.answers.get("mevcut_sozlesme", "mevcut_kira").unwrap().as_number(),
            5000.0
        );
        assert_eq!(import.unknown, vec!["bilinmeyen"]);
        assert!(import.invalid.is_empty());
    }

    #[test]
    fn test_read_answers_reports_bad_values() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("cevaplar.yaml");
        std::fs::write(&path, "sozlesme_baslama: dün\n").unwrap();

        let import = read_answers_file(&path, &template()).unwrap();
        assert_eq!(import.invalid.len(), 1);
        assert_eq!(import.invalid[0].0, "sozlesme_baslama");
        assert!(report_import(&import).is_err());
    }

    #[test]
    fn test_read_answers_flags_schema_failures() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("cevaplar.yaml");
        std::fs::write(&path, "kiraci_ad: Ayşe Demir\nkiraci_tc: \"1234\"\n").unwrap();

        let import = read_answers_file(&path, &template()).unwrap();
        assert!(import.invalid.is_empty());
        assert_eq!(import.flagged, 1);
        let tc = import.answers.get("kiraci_bilgileri", "kiraci_tc").unwrap();
        assert!(!tc.is_valid());
        assert!(!tc.validation_errors().is_empty());
        assert!(import
            .answers
            .is_answered_valid("kiraci_bilgileri", "kiraci_ad"));

        let progress = template().progress(&import.answers);
        assert_eq!(progress.answered_required, 1);
    }

    #[test]
    fn test_read_answers_rejects_non_mapping() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("liste.yaml");
        std::fs::write(&path, "- a\n- b\n").unwrap();
        assert!(read_answers_file(&path, &template()).is_err());
    }
}
