//! Export of generated documents
//!
//! Three independent renderers share one input, [`ExportSource`]:
//! plain text ([`text`]), an OOXML word-processor package ([`docx`]) and a
//! print-styled HTML page ([`html`]). A failing format never affects the
//! others or the stored document.

pub mod docx;
pub mod html;
pub mod text;

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::document::{DocumentFormat, UserDocument};

/// Separator line printed above the legal disclaimer
pub const SEPARATOR: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub const DISCLAIMER_TITLE: &str = "🚨 YASAL UYARI:";

pub const DISCLAIMER_LINES: &[&str] = &[
    "Bu belge yalnızca genel bilgilendirme amaçlıdır ve hukuki tavsiye niteliği taşımaz.",
    "Bu şablonun kullanımından doğabilecek her türlü sorumluluk kullanıcıya aittir.",
    "Önemli hukuki işlemler için mutlaka kalifiye bir avukattan danışmanlık alınız.",
    "Dilekçe aracının geliştiricileri bu şablonun içeriğinden sorumlu değildir.",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Document {0} has no generated content; run 'dilekce doc generate' first")]
    NotGenerated(String),

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to build {format} package: {message}")]
    Package {
        format: DocumentFormat,
        message: String,
    },
}

/// Everything a renderer needs from a generated document
#[derive(Debug, Clone)]
pub struct ExportSource {
    pub title: String,
    pub content: String,
    pub created: NaiveDate,
    /// File name without extension
    pub file_stem: String,
}

impl ExportSource {
    /// Build from a stored document that has generated content
    pub fn from_document(doc: &UserDocument) -> Result<Self, ExportError> {
        let content = doc
            .generated_content
            .clone()
            .ok_or_else(|| ExportError::NotGenerated(doc.id.to_string()))?;
        let created = doc
            .metadata
            .as_ref()
            .map(|m| m.created_date)
            .unwrap_or_else(|| doc.last_modified_at.date_naive());
        let case = doc.case_number.clone().unwrap_or_else(|| doc.id.to_string());
        Ok(Self {
            title: doc.title.clone(),
            content,
            created,
            file_stem: crate::assembly::format::document_file_stem(&doc.title, &case, created),
        })
    }
}

fn is_upper_tr(c: char) -> bool {
    c.is_ascii_uppercase() || "ÇĞİÖŞÜ".contains(c)
}

fn is_lower_tr(c: char) -> bool {
    c.is_ascii_lowercase() || "çğıöşü".contains(c)
}

/// Heading heuristic shared by the DOCX and HTML renderers.
///
/// A trimmed line is a heading when it starts with an uppercase letter and
/// holds only letters and spaces, optionally followed by one colon.
pub(crate) fn is_heading(line: &str) -> bool {
    let line = line.trim();
    let body = line.strip_suffix(':').unwrap_or(line).trim_end();
    let mut chars = body.chars();
    match chars.next() {
        Some(first) if is_upper_tr(first) => {
            chars.all(|c| is_upper_tr(c) || is_lower_tr(c) || c.is_whitespace())
        }
        _ => false,
    }
}

/// Result of one format of an [`export_all`] run
#[derive(Debug)]
pub struct ExportOutcome {
    pub format: DocumentFormat,
    pub result: Result<PathBuf, ExportError>,
}

/// Rendered bytes of one format
pub fn render(format: DocumentFormat, source: &ExportSource) -> Result<Vec<u8>, ExportError> {
    match format {
        DocumentFormat::Txt => Ok(text::render(&source.content).into_bytes()),
        DocumentFormat::Docx => docx::render(source),
        DocumentFormat::Html => Ok(html::render(&source.title, &source.content, source.created)
            .into_bytes()),
    }
}

/// Render one format into `<dir>/<file_stem>.<ext>`
pub fn export(
    format: DocumentFormat,
    source: &ExportSource,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let bytes = render(format, source)?;
    std::fs::create_dir_all(dir).map_err(|e| ExportError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let path = dir.join(format!("{}.{}", source.file_stem, format.extension()));
    std::fs::write(&path, bytes).map_err(|e| ExportError::Io {
        path: path.clone(),
        source: e,
    })?;
    tracing::info!(format = %format, path = %path.display(), "exported document");
    Ok(path)
}

/// Export several formats; each one succeeds or fails on its own
pub fn export_all(
    formats: &[DocumentFormat],
    source: &ExportSource,
    dir: &Path,
) -> Vec<ExportOutcome> {
    formats
        .iter()
        .map(|&format| {
            let result = export(format, source, dir);
            if let Err(ref e) = result {
                tracing::error!(format = %format, error = %e, "export failed");
            }
            ExportOutcome { format, result }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn source() -> ExportSource {
        ExportSource {
            title: "Kira İtirazı".to_string(),
            content: "KİRA ARTIRIMI İTİRAZ DİLEKÇESİ\n\nAd Soyad: Ayşe Demir\n".to_string(),
            created: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            file_stem: "kira_itirazi_X_2024-06-01".to_string(),
        }
    }

    #[test]
    fn test_heading_heuristic() {
        assert!(is_heading("TARAFLAR"));
        assert!(is_heading("  HUKUKİ DEĞERLENDİRME:  "));
        assert!(is_heading("Ekler Listesi:"));
        assert!(!is_heading("MADDE 1 - Kira sözleşmesi"));
        assert!(!is_heading("Ad Soyad        : Ayşe"));
        assert!(!is_heading("kiracı"));
        assert!(!is_heading(""));
    }

    #[test]
    fn test_export_all_writes_each_format() {
        let tmp = tempdir().unwrap();
        let outcomes = export_all(DocumentFormat::all(), &source(), tmp.path());
        assert_eq!(outcomes.len(), 3);
        for outcome in outcomes {
            let path = outcome.result.unwrap();
            assert!(path.exists());
            assert_eq!(
                path.extension().unwrap().to_str().unwrap(),
                outcome.format.extension()
            );
        }
    }

    #[test]
    fn test_failed_path_does_not_stop_others() {
        let tmp = tempdir().unwrap();
        // A regular file where the directory should be makes every write fail
        let blocked = tmp.path().join("blocked");
        std::fs::write(&blocked, "x").unwrap();

        let outcomes = export_all(&[DocumentFormat::Txt], &source(), &blocked);
        assert!(outcomes[0].result.is_err());

        let outcomes = export_all(&[DocumentFormat::Html], &source(), tmp.path());
        assert!(outcomes[0].result.is_ok());
    }

    #[test]
    fn test_from_document_requires_content() {
        let doc = UserDocument::new(
            "u",
            "kira-itiraz-v1",
            "Taslak",
            DocumentFormat::Txt,
            chrono::Utc::now(),
        );
        assert!(matches!(
            ExportSource::from_document(&doc),
            Err(ExportError::NotGenerated(_))
        ));
    }
}
