//! Step validation with per-field error reporting
//!
//! Each step is validated as one unit: raw values are first coerced by field
//! kind (numbers from typed text, dates to ISO form, checkbox lists from
//! comma strings), then checked against a JSON Schema derived from the
//! field constraints, then against the step's cross-field rules.

use jsonschema::{validator_for, ValidationError as JsonSchemaError, Validator as JsonValidator};
use miette::Diagnostic;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

use crate::core::answers::{
    is_blank_value, parse_date, parse_number, value_as_bool, value_as_list, value_as_text,
    WizardAnswers,
};
use crate::schema::model::{CrossFieldRule, FieldKind, WizardField, WizardStep, WizardTemplate};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const ISO_DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}$";

/// Step validation failure carrying every field violation
#[derive(Debug, Error, Diagnostic)]
#[error("Step '{step_title}' has {summary}")]
#[diagnostic(
    code(dilekce::wizard::invalid_step),
    help("Correct the listed fields and submit the step again")
)]
pub struct StepValidationError {
    pub step_id: String,
    step_title: String,
    summary: String,

    #[related]
    violations: Vec<FieldViolation>,
}

/// A single invalid field
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{label}: {message}")]
pub struct FieldViolation {
    pub field: String,
    pub label: String,
    pub message: String,

    #[help]
    pub help: Option<String>,
}

impl StepValidationError {
    fn new(step: &WizardStep, violations: Vec<FieldViolation>) -> Self {
        let summary = if violations.len() == 1 {
            "1 invalid field".to_string()
        } else {
            format!("{} invalid fields", violations.len())
        };
        Self {
            step_id: step.id.clone(),
            step_title: step.title.clone(),
            summary,
            violations,
        }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Error messages keyed by field id
    pub fn field_errors(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for v in &self.violations {
            map.entry(v.field.clone()).or_default().push(v.message.clone());
        }
        map
    }

    pub fn names_field(&self, field_id: &str) -> bool {
        self.violations.iter().any(|v| v.field == field_id)
    }
}

/// Validator with one compiled schema per step
pub struct StepValidator {
    compiled: HashMap<String, JsonValidator>,
}

impl StepValidator {
    /// Compile the schemas of every step of a template
    pub fn new(template: &WizardTemplate) -> Result<Self, String> {
        let mut compiled = HashMap::new();
        for step in &template.steps {
            let schema = step_schema(step);
            let validator = validator_for(&schema)
                .map_err(|e| format!("step '{}' schema does not compile: {}", step.id, e))?;
            compiled.insert(step.id.clone(), validator);
        }
        Ok(Self { compiled })
    }

    /// Validate the candidate values of one step.
    ///
    /// On success returns the coerced values of the declared fields; blank
    /// values are dropped.
    pub fn validate_step(
        &self,
        step: &WizardStep,
        values: &Map<String, Value>,
    ) -> Result<Map<String, Value>, StepValidationError> {
        self.validate_step_in(step, values, &WizardAnswers::new())
    }

    /// Like [`StepValidator::validate_step`], with the answers of the other
    /// steps available to field visibility conditions.
    ///
    /// Hidden fields are neither required nor kept.
    pub fn validate_step_in(
        &self,
        step: &WizardStep,
        values: &Map<String, Value>,
        answers: &WizardAnswers,
    ) -> Result<Map<String, Value>, StepValidationError> {
        let hidden = step.hidden_fields(values, answers);
        match self.compiled.get(&step.id) {
            Some(schema) => run_validation(schema, step, values, &hidden),
            None => validate_step_with(step, values, &hidden),
        }
    }

    /// Validate every step of a template against a full answer set
    pub fn validate_answers(
        &self,
        template: &WizardTemplate,
        answers: &WizardAnswers,
    ) -> Vec<StepValidationError> {
        template
            .steps
            .iter()
            .filter_map(|step| {
                self.validate_step_in(step, &collect_step_values(step, answers), answers)
                    .err()
            })
            .collect()
    }

    /// Re-check every stored answer and record the outcome on it.
    ///
    /// Each step is validated with the values it has. A required field with
    /// no answer is not reported here; only answers that exist are flagged.
    /// Returns the number of answers left invalid.
    pub fn refresh_validity(&self, template: &WizardTemplate, answers: &mut WizardAnswers) -> usize {
        let mut invalid = 0;
        for step in &template.steps {
            let values = answers.step_values(&step.id);
            if values.is_empty() {
                continue;
            }
            let mut errors = match self.validate_step_in(step, &values, answers) {
                Ok(_) => BTreeMap::new(),
                Err(err) => err.field_errors(),
            };
            for field_id in values.keys() {
                let messages = errors.remove(field_id).unwrap_or_default();
                let flagged = !messages.is_empty();
                if answers.set_validity(&step.id, field_id, messages) && flagged {
                    invalid += 1;
                }
            }
        }
        invalid
    }
}

/// Validate one step without a precompiled validator
pub fn validate_step(
    step: &WizardStep,
    values: &Map<String, Value>,
) -> Result<Map<String, Value>, StepValidationError> {
    let hidden = step.hidden_fields(values, &WizardAnswers::new());
    validate_step_with(step, values, &hidden)
}

fn validate_step_with(
    step: &WizardStep,
    values: &Map<String, Value>,
    hidden: &HashSet<String>,
) -> Result<Map<String, Value>, StepValidationError> {
    let schema = step_schema(step);
    match validator_for(&schema) {
        Ok(compiled) => run_validation(&compiled, step, values, hidden),
        Err(e) => {
            tracing::error!(step = %step.id, error = %e, "step schema does not compile");
            Err(StepValidationError::new(
                step,
                vec![FieldViolation {
                    field: step.id.clone(),
                    label: step.title.clone(),
                    message: format!("doğrulama şeması derlenemedi: {}", e),
                    help: None,
                }],
            ))
        }
    }
}

/// Values of a step's fields; answers filed under another step are found by id
pub fn collect_step_values(step: &WizardStep, answers: &WizardAnswers) -> Map<String, Value> {
    step.fields
        .iter()
        .filter_map(|field| {
            answers
                .get(&step.id, &field.id)
                .or_else(|| answers.find(&field.id))
                .map(|a| (field.id.clone(), a.value().clone()))
        })
        .collect()
}

fn run_validation(
    schema: &JsonValidator,
    step: &WizardStep,
    values: &Map<String, Value>,
    hidden: &HashSet<String>,
) -> Result<Map<String, Value>, StepValidationError> {
    let mut violations = Vec::new();
    let mut coerced = Map::new();

    for field in &step.fields {
        if hidden.contains(&field.id) {
            continue;
        }
        let Some(raw) = values.get(&field.id) else {
            continue;
        };
        match coerce_value(field, raw) {
            Ok(Some(value)) => {
                coerced.insert(field.id.clone(), value);
            }
            Ok(None) => {}
            Err(message) => violations.push(FieldViolation {
                field: field.id.clone(),
                label: field.label.clone(),
                message,
                help: field.help.clone(),
            }),
        }
    }

    let instance = Value::Object(coerced.clone());
    for error in schema.iter_errors(&instance) {
        let Some(violation) = error_to_violation(step, &error) else {
            continue;
        };
        if hidden.contains(&violation.field) {
            continue;
        }
        // A coercion failure already explains the field; skip its follow-ups
        if violations.iter().any(|v| v.field == violation.field) {
            continue;
        }
        violations.push(violation);
    }

    for rule in &step.rules {
        if hidden.contains(rule.target()) || violations.iter().any(|v| v.field == rule.target()) {
            continue;
        }
        if let Some(violation) = check_rule(step, rule, &coerced) {
            violations.push(violation);
        }
    }

    if violations.is_empty() {
        Ok(coerced)
    } else {
        tracing::debug!(step = %step.id, count = violations.len(), "step validation failed");
        Err(StepValidationError::new(step, violations))
    }
}

/// Coerce a raw value into the shape the step schema expects.
///
/// `Ok(None)` means the value is blank and counts as unanswered.
pub fn coerce_value(field: &WizardField, raw: &Value) -> Result<Option<Value>, String> {
    if is_blank_value(raw) {
        return Ok(None);
    }

    match field.kind {
        FieldKind::Text | FieldKind::Textarea | FieldKind::Email | FieldKind::Tel => {
            let text = value_as_text(raw);
            Ok((!text.is_empty()).then_some(Value::String(text)))
        }
        FieldKind::Select | FieldKind::Radio => Ok(Some(Value::String(value_as_text(raw)))),
        FieldKind::Number => {
            let parsed = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => parse_number(s),
                _ => None,
            };
            match parsed.and_then(serde_json::Number::from_f64) {
                Some(n) => Ok(Some(Value::Number(n))),
                None => Err(format!("'{}' geçerli bir sayı değil", value_as_text(raw))),
            }
        }
        FieldKind::Date => {
            let text = value_as_text(raw);
            match parse_date(&text) {
                Some(date) => Ok(Some(Value::String(date.format("%Y-%m-%d").to_string()))),
                None => Err(format!(
                    "'{}' geçerli bir tarih değil (YYYY-AA-GG veya GG.AA.YYYY)",
                    text
                )),
            }
        }
        FieldKind::Checkbox if field.is_confirmation() => {
            let checked = value_as_bool(raw);
            // An unchecked confirmation is the same as no answer
            Ok(checked.then_some(Value::Bool(true)))
        }
        FieldKind::Checkbox => {
            let items = value_as_list(raw);
            Ok((!items.is_empty()).then(|| {
                Value::Array(items.into_iter().map(Value::String).collect())
            }))
        }
    }
}

/// JSON Schema describing one step's coerced values
pub fn step_schema(step: &WizardStep) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in &step.fields {
        properties.insert(field.id.clone(), field_schema(field));
        if field.required {
            required.push(Value::String(field.id.clone()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn field_schema(field: &WizardField) -> Value {
    let c = &field.constraints;
    let mut schema = Map::new();

    match field.kind {
        FieldKind::Text | FieldKind::Textarea | FieldKind::Email | FieldKind::Tel => {
            schema.insert("type".into(), json!("string"));
            if let Some(min) = c.min_length {
                schema.insert("minLength".into(), json!(min));
            }
            if let Some(max) = c.max_length {
                schema.insert("maxLength".into(), json!(max));
            }
            let pattern = c
                .pattern
                .clone()
                .or_else(|| (field.kind == FieldKind::Email).then(|| EMAIL_PATTERN.to_string()));
            if let Some(pattern) = pattern {
                schema.insert("pattern".into(), json!(pattern));
            }
        }
        FieldKind::Number => {
            schema.insert("type".into(), json!("number"));
            if let Some(min) = c.minimum {
                schema.insert("minimum".into(), json!(min));
            }
            if let Some(max) = c.maximum {
                schema.insert("maximum".into(), json!(max));
            }
            if c.positive {
                schema.insert("exclusiveMinimum".into(), json!(0));
            }
        }
        FieldKind::Date => {
            schema.insert("type".into(), json!("string"));
            schema.insert("pattern".into(), json!(ISO_DATE_PATTERN));
        }
        FieldKind::Select | FieldKind::Radio => {
            schema.insert("type".into(), json!("string"));
            schema.insert("enum".into(), json!(field.option_values()));
        }
        FieldKind::Checkbox if field.is_confirmation() => {
            schema.insert("type".into(), json!("boolean"));
        }
        FieldKind::Checkbox => {
            schema.insert("type".into(), json!("array"));
            schema.insert(
                "items".into(),
                json!({"type": "string", "enum": field.option_values()}),
            );
            let min_items = c.min_items.unwrap_or(if field.required { 1 } else { 0 });
            if min_items > 0 {
                schema.insert("minItems".into(), json!(min_items));
            }
            if let Some(max) = c.max_items {
                schema.insert("maxItems".into(), json!(max));
            }
        }
    }

    Value::Object(schema)
}

/// Convert a JSON Schema error into a field violation
fn error_to_violation(step: &WizardStep, error: &JsonSchemaError) -> Option<FieldViolation> {
    use jsonschema::error::ValidationErrorKind as Kind;

    let field_id = match &error.kind {
        Kind::Required { property } => property
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| property.to_string()),
        _ => error
            .instance_path
            .as_str()
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let field = step.field(&field_id)?;
    let label = &field.label;

    let message = match &error.kind {
        Kind::Required { .. } => "bu alan zorunludur".to_string(),
        Kind::Type { kind } => format!("geçersiz değer türü (beklenen: {:?})", kind),
        Kind::Enum { options } => {
            format!("geçersiz seçim; geçerli değerler: {}", format_enum_options(options))
        }
        Kind::Pattern { .. } => field
            .constraints
            .pattern_message
            .clone()
            .unwrap_or_else(|| match field.kind {
                FieldKind::Email => "geçerli bir e-posta adresi girin".to_string(),
                FieldKind::Date => "tarih YYYY-AA-GG biçiminde olmalıdır".to_string(),
                _ => "beklenen biçimde değil".to_string(),
            }),
        Kind::MinLength { limit } => format!("en az {} karakter olmalıdır", limit),
        Kind::MaxLength { limit } => format!("en fazla {} karakter olabilir", limit),
        Kind::Minimum { limit } => format!("en az {} olmalıdır", limit),
        Kind::Maximum { limit } => format!("en fazla {} olabilir", limit),
        Kind::ExclusiveMinimum { limit } => {
            if limit.as_f64() == Some(0.0) {
                "sıfırdan büyük olmalıdır".to_string()
            } else {
                format!("{} değerinden büyük olmalıdır", limit)
            }
        }
        Kind::MinItems { limit } => format!("en az {} seçim yapılmalıdır", limit),
        Kind::MaxItems { limit } => format!("en fazla {} seçim yapılabilir", limit),
        _ => error.to_string(),
    };

    let help = match &error.kind {
        Kind::Enum { options } => Some(format!("Geçerli değerler: {}", format_enum_options(options))),
        _ => field.help.clone(),
    };

    Some(FieldViolation {
        field: field.id.clone(),
        label: label.clone(),
        message,
        help,
    })
}

/// Format enum options as a string
fn format_enum_options(options: &Value) -> String {
    if let Some(arr) = options.as_array() {
        arr.iter()
            .map(|v| v.as_str().map(|s| s.to_string()).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        options.to_string()
    }
}

fn check_rule(
    step: &WizardStep,
    rule: &CrossFieldRule,
    values: &Map<String, Value>,
) -> Option<FieldViolation> {
    let label_of = |id: &str| {
        step.field(id)
            .map(|f| f.label.clone())
            .unwrap_or_else(|| id.to_string())
    };

    let (field, message) = match rule {
        CrossFieldRule::Equals {
            field,
            other,
            message,
        } => {
            let a = values.get(field)?;
            let b = values.get(other)?;
            if a == b {
                return None;
            }
            let text = message
                .clone()
                .unwrap_or_else(|| format!("{} ile aynı olmalıdır", label_of(other)));
            (field, text)
        }
        CrossFieldRule::RequiredIf {
            field,
            when,
            equals,
            message,
        } => {
            let trigger = values.get(when)?;
            let triggered = match equals {
                Some(expected) => value_as_list(trigger).iter().any(|v| v == expected),
                None => true,
            };
            if !triggered || values.contains_key(field) {
                return None;
            }
            let text = message.clone().unwrap_or_else(|| {
                format!("{} yanıtına göre bu alan zorunludur", label_of(when))
            });
            (field, text)
        }
        CrossFieldRule::DateAfter {
            field,
            other,
            message,
        } => {
            let later = parse_date(values.get(field)?.as_str()?)?;
            let earlier = parse_date(values.get(other)?.as_str()?)?;
            if later > earlier {
                return None;
            }
            let text = message
                .clone()
                .unwrap_or_else(|| format!("{} tarihinden sonra olmalıdır", label_of(other)));
            (field, text)
        }
    };

    Some(FieldViolation {
        field: field.clone(),
        label: label_of(field),
        message,
        help: None,
    })
}
