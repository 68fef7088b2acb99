//! Conditions over answer values
//!
//! A [`Condition`] compares one field's value with an expected value. Field
//! visibility (`show_if` on a wizard field) and clause selection rules both
//! use them; several conditions in a list must all hold.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::core::answers::{
    is_blank_value, parse_number, value_as_bool, value_as_list, value_as_text,
};

/// Comparison applied by a [`Condition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    #[serde(alias = "==")]
    Equals,
    #[serde(alias = "!=")]
    NotEquals,
    #[serde(alias = ">")]
    GreaterThan,
    #[serde(alias = "<")]
    LessThan,
    /// List contains the value (or any of a list of values); text contains
    /// the value as a substring
    Includes,
    Excludes,
    IsEmpty,
    IsNotEmpty,
}

impl ConditionOp {
    /// Operators that compare against `value`
    pub fn needs_value(self) -> bool {
        !matches!(self, ConditionOp::IsEmpty | ConditionOp::IsNotEmpty)
    }
}

impl fmt::Display for ConditionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionOp::Equals => "==",
            ConditionOp::NotEquals => "!=",
            ConditionOp::GreaterThan => ">",
            ConditionOp::LessThan => "<",
            ConditionOp::Includes => "includes",
            ConditionOp::Excludes => "excludes",
            ConditionOp::IsEmpty => "is_empty",
            ConditionOp::IsNotEmpty => "is_not_empty",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: ConditionOp,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

impl Condition {
    /// Evaluate against the field's current value.
    ///
    /// A missing or blank value satisfies only `is_empty`; every comparison
    /// against it is false, `not_equals` included.
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let Some(actual) = actual.filter(|v| !is_blank_value(v)) else {
            return self.op == ConditionOp::IsEmpty;
        };
        match self.op {
            ConditionOp::IsEmpty => false,
            ConditionOp::IsNotEmpty => true,
            ConditionOp::Equals => values_equal(actual, &self.value),
            ConditionOp::NotEquals => !values_equal(actual, &self.value),
            ConditionOp::GreaterThan => compare(actual, &self.value) == Some(Ordering::Greater),
            ConditionOp::LessThan => compare(actual, &self.value) == Some(Ordering::Less),
            ConditionOp::Includes => includes(actual, &self.value),
            ConditionOp::Excludes => !includes(actual, &self.value),
        }
    }

    /// Problems that make the condition meaningless
    pub fn check(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.field.trim().is_empty() {
            issues.push("condition has no field".to_string());
        }
        if self.op.needs_value() && self.value.is_null() {
            issues.push(format!("condition on '{}' ({}) has no value", self.field, self.op));
        }
        issues
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.needs_value() {
            write!(f, "{} {} {}", self.field, self.op, self.value)
        } else {
            write!(f, "{} {}", self.field, self.op)
        }
    }
}

/// True when every condition holds; an empty list always holds
pub fn all_match<'a, F>(conditions: &[Condition], lookup: F) -> bool
where
    F: Fn(&str) -> Option<&'a Value>,
{
    conditions.iter().all(|c| c.matches(lookup(&c.field)))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (_, Value::Bool(b)) => value_as_bool(actual) == *b,
        (Value::Number(_), Value::Number(_)) => as_number(actual) == as_number(expected),
        _ => value_as_text(actual) == value_as_text(expected),
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    as_number(actual)?.partial_cmp(&as_number(expected)?)
}

fn includes(actual: &Value, expected: &Value) -> bool {
    let wanted: Vec<String> = match expected {
        Value::Array(_) => value_as_list(expected),
        other => vec![value_as_text(other)],
    };
    match actual {
        Value::Array(_) => {
            let items = value_as_list(actual);
            wanted.iter().any(|w| items.contains(w))
        }
        other => {
            let text = value_as_text(other);
            wanted.iter().any(|w| text.contains(w.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cond(yaml: &str) -> Condition {
        serde_yml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_symbolic_and_named_operators_parse() {
        assert_eq!(cond("{field: a, op: '>', value: 25}").op, ConditionOp::GreaterThan);
        assert_eq!(cond("{field: a, op: greater_than, value: 25}").op, ConditionOp::GreaterThan);
        assert_eq!(cond("{field: a, op: '!=', value: ''}").op, ConditionOp::NotEquals);
        assert_eq!(cond("{field: a, op: is_empty}").value, Value::Null);
    }

    #[test]
    fn test_numeric_comparisons() {
        let over = cond("{field: artis_yuzdesi, op: '>', value: 25}");
        assert!(over.matches(Some(&json!(50))));
        assert!(!over.matches(Some(&json!(25))));
        assert!(over.matches(Some(&json!("30"))));
        assert!(!over.matches(Some(&json!("çok"))));
        let under = cond("{field: artis_yuzdesi, op: '<', value: 25}");
        assert!(under.matches(Some(&json!(10.5))));
    }

    #[test]
    fn test_missing_value_only_satisfies_is_empty() {
        for op in ["'=='", "'!='", "'>'", "includes", "excludes", "is_not_empty"] {
            let c = cond(&format!("{{field: x, op: {}, value: a}}", op));
            assert!(!c.matches(None), "{} matched a missing value", op);
            assert!(!c.matches(Some(&json!(""))), "{} matched a blank value", op);
        }
        assert!(cond("{field: x, op: is_empty}").matches(Some(&json!([]))));
    }

    #[test]
    fn test_equality_across_shapes() {
        assert!(cond("{field: t, op: '==', value: azaltim}").matches(Some(&json!("azaltim"))));
        assert!(cond("{field: v, op: '==', value: true}").matches(Some(&json!(true))));
        assert!(cond("{field: v, op: '==', value: false}").matches(Some(&json!("hayır"))));
        assert!(cond("{field: n, op: '==', value: 4000}").matches(Some(&json!(4000.0))));
        assert!(cond("{field: t, op: '!=', value: ret}").matches(Some(&json!("azaltim"))));
    }

    #[test]
    fn test_includes_on_lists_and_text() {
        let reasons = json!(["asiri_artirim", "ekonomik_durum"]);
        assert!(cond("{field: r, op: includes, value: ekonomik_durum}").matches(Some(&reasons)));
        assert!(cond("{field: r, op: includes, value: [diger, asiri_artirim]}").matches(Some(&reasons)));
        assert!(cond("{field: r, op: excludes, value: diger}").matches(Some(&reasons)));
        assert!(cond("{field: r, op: includes, value: Kadıköy}").matches(Some(&json!("Moda, Kadıköy"))));
    }

    #[test]
    fn test_all_match_and_check() {
        let conditions = vec![
            cond("{field: a, op: '>', value: 10}"),
            cond("{field: b, op: is_not_empty}"),
        ];
        let a = json!(12);
        let b = json!("x");
        assert!(all_match(&conditions, |f| match f {
            "a" => Some(&a),
            "b" => Some(&b),
            _ => None,
        }));
        assert!(!all_match(&conditions, |f| (f == "a").then_some(&a)));
        assert!(all_match(&[], |_| None));
        assert_eq!(cond("{field: a, op: '>'}").check().len(), 1);
    }
}
