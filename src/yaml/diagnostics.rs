//! YAML diagnostics pointing at the offending line of a template or answers file

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// YAML that failed to parse or did not match the expected record shape
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(dilekce::yaml::syntax))]
pub struct YamlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl YamlSyntaxError {
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let offset = err
            .location()
            .map(|loc| offset_of(source, loc.line(), loc.column()))
            .unwrap_or(0);
        let message = err.to_string();

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1).min(source.len().max(1))),
            help: suggest_fix(&message),
            message: format!("{}: {}", filename, message),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Byte offset of a 1-based line and column, clamped to the source
fn offset_of(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    let rest = &source[line_start.min(source.len())..];
    let column_offset = rest
        .char_indices()
        .take_while(|(_, c)| *c != '\n')
        .nth(column.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    (line_start + column_offset).min(source.len())
}

/// Hints for the mistakes people make when hand-editing answers and templates
fn suggest_fix(message: &str) -> Option<String> {
    let msg = message.to_lowercase();

    if msg.contains("tab") {
        return Some("Indent with spaces; YAML does not accept tabs.".to_string());
    }
    if msg.contains("duplicate") {
        return Some("A key may appear only once per mapping; remove the repeated field id.".to_string());
    }
    if msg.contains("mapping values are not allowed") || msg.contains("unexpected ':'") {
        return Some("Quote values that contain ':' such as times: \"10:30\".".to_string());
    }
    if msg.contains("missing field") {
        return Some("Add the missing key; see `dilekce template show` for the expected layout.".to_string());
    }
    if msg.contains("unknown variant") {
        return Some("Check the spelling of enumerated values such as field kinds and rule names.".to_string());
    }
    if msg.contains("block end") || msg.contains("indentation") {
        return Some("Check that sibling keys line up at the same indentation.".to_string());
    }

    None
}
