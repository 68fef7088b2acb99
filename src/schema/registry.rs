//! Wizard template registry: built-in templates plus project overrides

use miette::Diagnostic;
use rust_embed::Embed;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::Project;
use crate::schema::model::WizardTemplate;
use crate::yaml::{self, YamlSyntaxError};

/// Assets compiled into the binary: wizard definitions and document prose
#[derive(Embed)]
#[folder = "templates/"]
pub struct EmbeddedAssets;

/// Embedded path prefix of the built-in wizard definitions
const WIZARD_PREFIX: &str = "wizards/";

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("Template not found: {id}")]
    #[diagnostic(
        code(dilekce::template::not_found),
        help("Available templates: {available}")
    )]
    NotFound { id: String, available: String },

    #[error("Template '{id}' is invalid: {}", .issues.join("; "))]
    #[diagnostic(code(dilekce::template::invalid))]
    Invalid { id: String, issues: Vec<String> },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where a registered template came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Builtin,
    File(PathBuf),
}

impl std::fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateSource::Builtin => write!(f, "built-in"),
            TemplateSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// All wizard templates known to a run, keyed by id
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, (WizardTemplate, TemplateSource)>,
}

impl TemplateRegistry {
    /// Registry holding only the built-in templates
    pub fn builtin() -> Result<Self, TemplateError> {
        let mut registry = Self::default();
        for name in EmbeddedAssets::iter() {
            let name = name.as_ref();
            if !name.starts_with(WIZARD_PREFIX) || !name.ends_with(".yaml") {
                continue;
            }
            let Some(file) = EmbeddedAssets::get(name) else {
                continue;
            };
            let source = String::from_utf8_lossy(&file.data);
            let template = parse_template(&source, name)?;
            registry.insert(template, TemplateSource::Builtin);
        }
        Ok(registry)
    }

    /// Built-ins overlaid with the project's `templates/*.yaml`
    pub fn load(project: Option<&Project>) -> Result<Self, TemplateError> {
        let mut registry = Self::builtin()?;
        if let Some(project) = project {
            let dir = project.templates_dir();
            if dir.is_dir() {
                for path in Project::iter_yaml_files(&dir) {
                    let template = load_template_file(&path)?;
                    tracing::debug!(id = %template.id, path = %path.display(), "loaded project template");
                    registry.insert(template, TemplateSource::File(path));
                }
            }
        }
        Ok(registry)
    }

    /// Register a template; an existing id is replaced
    pub fn insert(&mut self, template: WizardTemplate, source: TemplateSource) {
        if self.templates.contains_key(&template.id) {
            tracing::info!(id = %template.id, source = %source, "template overrides an earlier definition");
        }
        self.templates
            .insert(template.id.clone(), (template, source));
    }

    pub fn get(&self, id: &str) -> Result<&WizardTemplate, TemplateError> {
        self.templates
            .get(id)
            .map(|(t, _)| t)
            .ok_or_else(|| TemplateError::NotFound {
                id: id.to_string(),
                available: self.ids().join(", "),
            })
    }

    pub fn source(&self, id: &str) -> Option<&TemplateSource> {
        self.templates.get(id).map(|(_, s)| s)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WizardTemplate, &TemplateSource)> {
        self.templates.values().map(|(t, s)| (t, s))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Parse a template and reject it when structurally broken
pub fn parse_template(source: &str, filename: &str) -> Result<WizardTemplate, TemplateError> {
    let template: WizardTemplate = yaml::parse(source, filename)?;
    let issues = template.check();
    if !issues.is_empty() {
        return Err(TemplateError::Invalid {
            id: template.id,
            issues,
        });
    }
    Ok(template)
}

pub fn load_template_file(path: &Path) -> Result<WizardTemplate, TemplateError> {
    let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    parse_template(&source, &filename)
}
