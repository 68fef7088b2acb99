//! Answer store: step → field → answer, as collected by the wizard
//!
//! Answers arrive in two shapes: a bare scalar (`kiraci_ad: Ahmet`) or a
//! wrapped record carrying validation state (`kiraci_ad: {value: Ahmet,
//! is_valid: true}`). [`Answer`] models both explicitly and every accessor
//! normalizes through one match, so callers never inspect shapes themselves.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A wrapped answer with its validation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub value: Value,

    #[serde(default = "default_true")]
    pub is_valid: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// One answer value, raw or wrapped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Wrapped(AnswerRecord),
    Raw(Value),
}

impl Answer {
    /// Wrap a validated value
    pub fn valid(value: Value, now: DateTime<Utc>) -> Self {
        Answer::Wrapped(AnswerRecord {
            value,
            is_valid: true,
            validation_errors: Vec::new(),
            answered_at: Some(now),
        })
    }

    /// The underlying value regardless of shape
    pub fn value(&self) -> &Value {
        match self {
            Answer::Wrapped(record) => &record.value,
            Answer::Raw(value) => value,
        }
    }

    /// Raw answers carry no validation state and count as valid
    pub fn is_valid(&self) -> bool {
        match self {
            Answer::Wrapped(record) => record.is_valid,
            Answer::Raw(_) => true,
        }
    }

    pub fn validation_errors(&self) -> &[String] {
        match self {
            Answer::Wrapped(record) => &record.validation_errors,
            Answer::Raw(_) => &[],
        }
    }

    /// True when the answer carries no usable content
    pub fn is_blank(&self) -> bool {
        is_blank_value(self.value())
    }

    pub fn as_text(&self) -> String {
        value_as_text(self.value())
    }

    pub fn as_number(&self) -> f64 {
        value_as_number(self.value())
    }

    pub fn as_bool(&self) -> bool {
        value_as_bool(self.value())
    }

    pub fn as_list(&self) -> Vec<String> {
        value_as_list(self.value())
    }
}

impl From<Value> for Answer {
    fn from(value: Value) -> Self {
        Answer::Raw(value)
    }
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Answer::Raw(Value::String(value.to_string()))
    }
}

pub fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Canonical text form; integers print without a fractional part
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(value_as_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .get("value")
            .map(value_as_text)
            .unwrap_or_default(),
    }
}

/// Canonical numeric form; anything unparsable is zero
pub fn value_as_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_number(s).unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        Value::Object(map) => map.get("value").map(value_as_number).unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

pub fn value_as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "evet" | "yes" | "1" | "on"
        ),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => map.get("value").is_some_and(value_as_bool),
        Value::Null => false,
    }
}

pub fn value_as_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_as_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        Value::Null => Vec::new(),
        Value::Object(map) => map.get("value").map(value_as_list).unwrap_or_default(),
        other => vec![value_as_text(other)],
    }
}

/// Parse user-typed numbers.
///
/// Accepts `4500`, `4500.50`, `4500,50` and Turkish grouping such as
/// `4.500` or `4.500,50`. A currency suffix (`TL`, `₺`) is ignored.
pub fn parse_number(input: &str) -> Option<f64> {
    let cleaned: String = input
        .trim()
        .trim_end_matches("TL")
        .trim_end_matches('₺')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse `YYYY-MM-DD`, `DD.MM.YYYY` or `DD/MM/YYYY`; an RFC 3339 timestamp
/// contributes its date part
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d.%m.%Y"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// `5.000` and `1.250.000` are grouped thousands, `5.5` is a decimal
fn is_thousands_grouped(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut groups = digits.split('.');
    let Some(first) = groups.next() else {
        return false;
    };
    let rest: Vec<&str> = groups.collect();
    !rest.is_empty()
        && !first.is_empty()
        && first.len() <= 3
        && first.chars().all(|c| c.is_ascii_digit())
        && rest
            .iter()
            .all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

/// All answers of one document, keyed by step id then field id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WizardAnswers {
    steps: BTreeMap<String, BTreeMap<String, Answer>>,
}

impl WizardAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one answer
    pub fn set(&mut self, step_id: &str, field_id: &str, answer: impl Into<Answer>) {
        self.steps
            .entry(step_id.to_string())
            .or_default()
            .insert(field_id.to_string(), answer.into());
    }

    /// Replace every answer of a step with validated values; fields absent
    /// from `values` lose their earlier answer
    pub fn set_step(&mut self, step_id: &str, values: &Map<String, Value>, now: DateTime<Utc>) {
        let step: BTreeMap<String, Answer> = values
            .iter()
            .map(|(field_id, value)| (field_id.clone(), Answer::valid(value.clone(), now)))
            .collect();
        self.steps.insert(step_id.to_string(), step);
    }

    pub fn get(&self, step_id: &str, field_id: &str) -> Option<&Answer> {
        self.steps.get(step_id).and_then(|step| step.get(field_id))
    }

    /// Find an answer by field id in any step
    pub fn find(&self, field_id: &str) -> Option<&Answer> {
        self.steps.values().find_map(|step| step.get(field_id))
    }

    /// Record the validation outcome of an existing answer.
    ///
    /// No errors marks a wrapped answer valid again; a raw answer then stays
    /// raw. Returns false when there is no such answer.
    pub fn set_validity(&mut self, step_id: &str, field_id: &str, errors: Vec<String>) -> bool {
        let Some(answer) = self
            .steps
            .get_mut(step_id)
            .and_then(|step| step.get_mut(field_id))
        else {
            return false;
        };
        match answer {
            Answer::Wrapped(record) => {
                record.is_valid = errors.is_empty();
                record.validation_errors = errors;
            }
            Answer::Raw(_) if errors.is_empty() => {}
            Answer::Raw(value) => {
                *answer = Answer::Wrapped(AnswerRecord {
                    value: value.clone(),
                    is_valid: false,
                    validation_errors: errors,
                    answered_at: None,
                });
            }
        }
        true
    }

    pub fn remove(&mut self, step_id: &str, field_id: &str) -> Option<Answer> {
        self.steps.get_mut(step_id).and_then(|step| step.remove(field_id))
    }

    /// Raw values of one step, as submitted to validation
    pub fn step_values(&self, step_id: &str) -> Map<String, Value> {
        self.steps
            .get(step_id)
            .map(|step| {
                step.iter()
                    .map(|(field, answer)| (field.clone(), answer.value().clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    /// Every (step, field, answer) triple in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Answer)> {
        self.steps.iter().flat_map(|(step, fields)| {
            fields
                .iter()
                .map(move |(field, answer)| (step.as_str(), field.as_str(), answer))
        })
    }

    /// Upsert every answer of `other` into this set
    pub fn merge(&mut self, other: WizardAnswers) {
        for (step_id, fields) in other.steps {
            let target = self.steps.entry(step_id).or_default();
            target.extend(fields);
        }
    }

    /// Number of fields with a non-blank answer
    pub fn answered_count(&self) -> usize {
        self.iter().filter(|(_, _, a)| !a.is_blank()).count()
    }

    pub fn is_answered(&self, step_id: &str, field_id: &str) -> bool {
        self.get(step_id, field_id).is_some_and(|a| !a.is_blank())
    }

    /// Answered and not flagged by validation
    pub fn is_answered_valid(&self, step_id: &str, field_id: &str) -> bool {
        self.get(step_id, field_id)
            .is_some_and(|a| !a.is_blank() && a.is_valid())
    }

    pub fn is_empty(&self) -> bool {
        self.steps.values().all(|fields| fields.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_and_wrapped_deserialize() {
        let yaml = r#"
kiraci:
  kiraci_ad: Ahmet Yılmaz
  kiraci_tc:
    value: "12345678901"
    is_valid: true
"#;
        let answers: WizardAnswers = serde_yml::from_str(yaml).unwrap();
        assert!(matches!(answers.get("kiraci", "kiraci_ad"), Some(Answer::Raw(_))));
        assert!(matches!(
            answers.get("kiraci", "kiraci_tc"),
            Some(Answer::Wrapped(_))
        ));
        assert_eq!(answers.find("kiraci_tc").unwrap().as_text(), "12345678901");
    }

    #[test]
    fn test_object_without_value_key_is_raw() {
        let answer: Answer = serde_json::from_value(json!({"a": 1})).unwrap();
        assert!(matches!(answer, Answer::Raw(_)));
    }

    #[test]
    fn test_number_normalization() {
        assert_eq!(Answer::from(json!(4000)).as_number(), 4000.0);
        assert_eq!(Answer::from("4500,50").as_number(), 4500.5);
        assert_eq!(Answer::from("5.000").as_number(), 5000.0);
        assert_eq!(Answer::from("1.250.000").as_number(), 1_250_000.0);
        assert_eq!(Answer::from("5.5").as_number(), 5.5);
        assert_eq!(Answer::from("7500 TL").as_number(), 7500.0);
        assert_eq!(Answer::from("abc").as_number(), 0.0);
        assert_eq!(Answer::from(Value::Null).as_number(), 0.0);
    }

    #[test]
    fn test_text_normalization() {
        assert_eq!(Answer::from(json!(6000.0)).as_text(), "6000");
        assert_eq!(Answer::from(json!(12.5)).as_text(), "12.5");
        assert_eq!(Answer::from(json!(["a", "b"])).as_text(), "a, b");
        assert_eq!(Answer::from(Value::Null).as_text(), "");
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("15.01.2024"), expected);
        assert_eq!(parse_date("15/01/2024"), expected);
        assert_eq!(parse_date("2024-01-15T10:00:00Z"), expected);
        assert_eq!(parse_date("yarın"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_bool_and_list_normalization() {
        assert!(Answer::from("evet").as_bool());
        assert!(!Answer::from("hayır").as_bool());
        assert_eq!(
            Answer::from("asiri_artirim, piyasa_degeri").as_list(),
            vec!["asiri_artirim", "piyasa_degeri"]
        );
        assert!(Answer::from(Value::Null).as_list().is_empty());
    }

    #[test]
    fn test_set_step_replaces_whole_step() {
        let now = Utc::now();
        let mut answers = WizardAnswers::new();
        answers.set("kiraci", "kiraci_ad", "Ahmet");
        answers.set("kiraci", "kiraci_email", "ahmet@example.com");
        answers.set("mulk", "mulk_tipi", "daire");

        let mut values = Map::new();
        values.insert("kiraci_ad".into(), json!("Ahmet Yılmaz"));
        answers.set_step("kiraci", &values, now);

        assert_eq!(answers.get("kiraci", "kiraci_ad").unwrap().as_text(), "Ahmet Yılmaz");
        assert!(answers.get("kiraci", "kiraci_email").is_none());
        assert!(answers.is_answered("mulk", "mulk_tipi"));
    }

    #[test]
    fn test_set_validity_flags_and_clears() {
        let mut answers = WizardAnswers::new();
        answers.set("kiraci", "kiraci_tc", "1234");
        assert!(answers.set_validity("kiraci", "kiraci_tc", vec!["11 hane".into()]));
        let flagged = answers.get("kiraci", "kiraci_tc").unwrap();
        assert!(!flagged.is_valid());
        assert_eq!(flagged.validation_errors(), ["11 hane".to_string()]);
        assert!(answers.is_answered("kiraci", "kiraci_tc"));
        assert!(!answers.is_answered_valid("kiraci", "kiraci_tc"));

        answers.set_validity("kiraci", "kiraci_tc", Vec::new());
        assert!(answers.is_answered_valid("kiraci", "kiraci_tc"));
        assert!(!answers.set_validity("kiraci", "yok", Vec::new()));
    }

    #[test]
    fn test_merge_upserts() {
        let mut a = WizardAnswers::new();
        a.set("s1", "f1", "eski");
        a.set("s1", "f2", "kalsın");
        let mut b = WizardAnswers::new();
        b.set("s1", "f1", "yeni");
        b.set("s2", "f3", "ek");
        a.merge(b);
        assert_eq!(a.get("s1", "f1").unwrap().as_text(), "yeni");
        assert_eq!(a.get("s1", "f2").unwrap().as_text(), "kalsın");
        assert_eq!(a.answered_count(), 3);
    }

    #[test]
    fn test_blank_answers_not_counted() {
        let mut a = WizardAnswers::new();
        a.set("s1", "f1", "");
        a.set("s1", "f2", json!([]));
        a.set("s1", "f3", json!(0));
        assert_eq!(a.answered_count(), 1);
    }
}
