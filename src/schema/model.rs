//! Wizard template model: templates, steps and fields
//!
//! Templates are authored as YAML (see `templates/wizards/`) and are
//! immutable once loaded. Field ids double as answer keys and as the
//! placeholder names the document generators read.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::core::answers::{Answer, WizardAnswers};
use crate::schema::condition::{all_match, Condition};

/// Input kind of a wizard field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Email,
    Tel,
    Number,
    Date,
    Select,
    Radio,
    Checkbox,
}

impl FieldKind {
    /// Kinds whose value must come from a declared option set
    pub fn is_enumerated(self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Radio)
    }

    pub fn is_textual(self) -> bool {
        matches!(
            self,
            FieldKind::Text | FieldKind::Textarea | FieldKind::Email | FieldKind::Tel
        )
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Email => "email",
            FieldKind::Tel => "tel",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Select => "select",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
        };
        write!(f, "{}", s)
    }
}

/// One choice of a select, radio or checkbox field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

/// Declared bounds on a field's value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Message shown instead of the raw regex when the pattern fails
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Value must be strictly greater than zero (currency amounts)
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub positive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
}

/// A single wizard question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardField {
    pub id: String,
    pub kind: FieldKind,
    pub label: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,

    #[serde(default)]
    pub constraints: FieldConstraints,

    /// The field is asked only while every condition holds
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub show_if: Vec<Condition>,
}

impl WizardField {
    pub fn is_visible<'a, F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<&'a Value>,
    {
        all_match(&self.show_if, lookup)
    }

    /// Display label of an option value, if declared
    pub fn option_label(&self, value: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }

    pub fn option_values(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.value.as_str()).collect()
    }

    /// A checkbox without options is a single yes/no confirmation
    pub fn is_confirmation(&self) -> bool {
        self.kind == FieldKind::Checkbox && self.options.is_empty()
    }
}

/// Rules spanning more than one field of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CrossFieldRule {
    /// `field` must hold the same value as `other`
    Equals {
        field: String,
        other: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// `field` becomes required when `when` is answered
    /// (or equals `equals`, when given)
    RequiredIf {
        field: String,
        when: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        equals: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Date in `field` must be strictly after the date in `other`
    DateAfter {
        field: String,
        other: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl CrossFieldRule {
    /// The field an error of this rule is reported against
    pub fn target(&self) -> &str {
        match self {
            CrossFieldRule::Equals { field, .. }
            | CrossFieldRule::RequiredIf { field, .. }
            | CrossFieldRule::DateAfter { field, .. } => field.as_str(),
        }
    }

    /// Every field id the rule reads
    pub fn referenced_fields(&self) -> Vec<&str> {
        match self {
            CrossFieldRule::Equals { field, other, .. }
            | CrossFieldRule::DateAfter { field, other, .. } => vec![field.as_str(), other.as_str()],
            CrossFieldRule::RequiredIf { field, when, .. } => vec![field.as_str(), when.as_str()],
        }
    }
}

/// One page of the wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardStep {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub fields: Vec<WizardField>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<CrossFieldRule>,
}

impl WizardStep {
    pub fn field(&self, id: &str) -> Option<&WizardField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &WizardField> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Fields of this step hidden by their `show_if` conditions.
    ///
    /// Fields of this step are read from `values`, fields of other steps
    /// from `answers`. A hidden field's value never counts toward another
    /// field's condition.
    pub fn hidden_fields(&self, values: &Map<String, Value>, answers: &WizardAnswers) -> HashSet<String> {
        let mut hidden = HashSet::new();
        for field in &self.fields {
            let visible = field.is_visible(|id| {
                if hidden.contains(id) {
                    None
                } else if self.field(id).is_some() {
                    values.get(id)
                } else {
                    answers.find(id).map(Answer::value)
                }
            });
            if !visible {
                hidden.insert(field.id.clone());
            }
        }
        hidden
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateMetadata {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legal_references: Vec<String>,
    pub premium: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A complete wizard for one document type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardTemplate {
    pub id: String,
    pub name: String,
    pub category: String,

    /// Selects the document generator; defaults to the template id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,

    #[serde(default)]
    pub metadata: TemplateMetadata,

    pub steps: Vec<WizardStep>,
}

/// Answer counts of a template against an answer set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateProgress {
    pub total: usize,
    pub answered: usize,
    pub required: usize,
    pub answered_required: usize,
}

impl WizardTemplate {
    pub fn document_type(&self) -> &str {
        self.document_type.as_deref().unwrap_or(&self.id)
    }

    pub fn step(&self, id: &str) -> Option<&WizardStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Find a field and the step that owns it
    pub fn field(&self, id: &str) -> Option<(&WizardStep, &WizardField)> {
        self.fields().find(|(_, f)| f.id == id)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&WizardStep, &WizardField)> {
        self.steps
            .iter()
            .flat_map(|s| s.fields.iter().map(move |f| (s, f)))
    }

    pub fn all_field_ids(&self) -> Vec<&str> {
        self.fields().map(|(_, f)| f.id.as_str()).collect()
    }

    pub fn required_field_ids(&self) -> Vec<&str> {
        self.fields()
            .filter(|(_, f)| f.required)
            .map(|(_, f)| f.id.as_str())
            .collect()
    }

    pub fn total_questions(&self) -> usize {
        self.steps.iter().map(|s| s.fields.len()).sum()
    }

    /// Minutes parsed from strings such as "~8 dakika" or "1 saat"
    pub fn estimated_minutes(&self) -> Option<u32> {
        let text = self.metadata.estimated_time.as_deref()?.to_lowercase();
        let digits: String = text
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let n: u32 = digits.parse().ok()?;
        if text.contains("saat") || text.contains("hour") {
            Some(n * 60)
        } else {
            Some(n)
        }
    }

    /// Fields hidden under `answers`, evaluated in template order
    pub fn hidden_fields(&self, answers: &WizardAnswers) -> HashSet<String> {
        let mut hidden = HashSet::new();
        for (_, field) in self.fields() {
            let visible = field.is_visible(|id| {
                if hidden.contains(id) {
                    None
                } else {
                    answers.find(id).map(Answer::value)
                }
            });
            if !visible {
                hidden.insert(field.id.clone());
            }
        }
        hidden
    }

    /// Count answered and required questions for progress reporting.
    ///
    /// Hidden fields are left out and answers flagged invalid do not count.
    pub fn progress(&self, answers: &WizardAnswers) -> TemplateProgress {
        let hidden = self.hidden_fields(answers);
        let mut progress = TemplateProgress::default();
        for (step, field) in self.fields() {
            if hidden.contains(&field.id) {
                continue;
            }
            let answered = answers.is_answered_valid(&step.id, &field.id);
            progress.total += 1;
            if answered {
                progress.answered += 1;
            }
            if field.required {
                progress.required += 1;
                if answered {
                    progress.answered_required += 1;
                }
            }
        }
        progress
    }

    /// Structural problems that make the template unusable
    pub fn check(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.id.trim().is_empty() {
            issues.push("template id is empty".to_string());
        }
        if self.name.trim().is_empty() {
            issues.push("template name is empty".to_string());
        }
        if self.steps.is_empty() {
            issues.push("template has no steps".to_string());
        }

        let mut step_ids = HashSet::new();
        let mut all_field_ids = HashSet::new();
        for step in &self.steps {
            if !step_ids.insert(step.id.as_str()) {
                issues.push(format!("duplicate step id '{}'", step.id));
            }
            if step.fields.is_empty() {
                issues.push(format!("step '{}' has no fields", step.id));
            }

            let mut field_ids = HashSet::new();
            for field in &step.fields {
                for condition in &field.show_if {
                    for issue in condition.check() {
                        issues.push(format!("field '{}': {}", field.id, issue));
                    }
                    if !condition.field.is_empty()
                        && !all_field_ids.contains(condition.field.as_str())
                    {
                        issues.push(format!(
                            "field '{}' depends on '{}', which is not an earlier field",
                            field.id, condition.field
                        ));
                    }
                }
                if field.id.trim().is_empty() {
                    issues.push(format!("step '{}' has a field with an empty id", step.id));
                }
                if !field_ids.insert(field.id.as_str()) {
                    issues.push(format!(
                        "duplicate field id '{}' in step '{}'",
                        field.id, step.id
                    ));
                } else if !all_field_ids.insert(field.id.as_str()) {
                    issues.push(format!(
                        "field id '{}' is used by more than one step",
                        field.id
                    ));
                }
                if field.kind.is_enumerated() && field.options.is_empty() {
                    issues.push(format!(
                        "{} field '{}' declares no options",
                        field.kind, field.id
                    ));
                }
                if let Some(ref pattern) = field.constraints.pattern {
                    if let Err(e) = regex::Regex::new(pattern) {
                        issues.push(format!("field '{}' has an invalid pattern: {}", field.id, e));
                    }
                }
            }

            for rule in &step.rules {
                for referenced in rule.referenced_fields() {
                    if step.field(referenced).is_none() {
                        issues.push(format!(
                            "rule in step '{}' references unknown field '{}'",
                            step.id, referenced
                        ));
                    }
                }
            }
        }

        issues
    }
}
