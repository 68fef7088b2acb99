//! Flatten wizard answers into the placeholder bag document templates read

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::assembly::derived::derive_values;
use crate::core::answers::{value_as_list, value_as_text, Answer, WizardAnswers};
use crate::schema::model::{FieldKind, WizardTemplate};

/// Placeholder name → value
pub type AnswerBag = BTreeMap<String, Value>;

/// Normalize every answered field of `template` and merge in derived values.
///
/// Keys are field ids. Blank answers and answers of hidden fields are left
/// out so templates can fall back to bracketed placeholders. Enumerated
/// fields also get `<id>_label`, and checkbox lists `<id>_labels`.
pub fn map_answers(template: &WizardTemplate, answers: &WizardAnswers, today: NaiveDate) -> AnswerBag {
    let mut bag = AnswerBag::new();
    let hidden = template.hidden_fields(answers);

    for (step, field) in template.fields() {
        if hidden.contains(&field.id) {
            continue;
        }
        let Some(answer) = answers
            .get(&step.id, &field.id)
            .or_else(|| answers.find(&field.id))
        else {
            continue;
        };
        if answer.is_blank() {
            continue;
        }

        let value = normalize(field.kind, answer);
        match field.kind {
            FieldKind::Select | FieldKind::Radio => {
                let raw = value_as_text(&value);
                let label = field.option_label(&raw).unwrap_or(&raw).to_string();
                bag.insert(format!("{}_label", field.id), Value::String(label));
            }
            FieldKind::Checkbox if !field.is_confirmation() => {
                let labels = value_as_list(&value)
                    .into_iter()
                    .map(|v| {
                        Value::String(field.option_label(&v).map(str::to_string).unwrap_or(v))
                    })
                    .collect();
                bag.insert(format!("{}_labels", field.id), Value::Array(labels));
            }
            _ => {}
        }
        bag.insert(field.id.clone(), value);
    }

    let derived = derive_values(&bag, today);
    bag.extend(derived);
    bag
}

/// Canonical scalar for a field kind
fn normalize(kind: FieldKind, answer: &Answer) -> Value {
    match kind {
        FieldKind::Number => {
            let n = answer.as_number();
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                Value::from(n as i64)
            } else {
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .unwrap_or(Value::from(0))
            }
        }
        FieldKind::Checkbox => match answer.value() {
            Value::Bool(b) => Value::Bool(*b),
            Value::Array(_) | Value::String(_) => Value::Array(
                answer.as_list().into_iter().map(Value::String).collect(),
            ),
            _ => Value::Bool(answer.as_bool()),
        },
        _ => Value::String(answer.as_text().trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::TemplateRegistry;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_maps_raw_and_wrapped_answers() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("kira-itiraz-v1").unwrap();

        let mut answers = WizardAnswers::new();
        answers.set("kiraci_bilgileri", "kiraci_ad", " Ayşe Demir ");
        answers.set(
            "mevcut_sozlesme",
            "mevcut_kira",
            Answer::valid(json!("4.000"), chrono::Utc::now()),
        );
        answers.set("artirim_bilgileri", "yeni_kira", json!(6000));
        answers.set("mulk_bilgileri", "mulk_tipi", "daire");
        answers.set("itiraz", "itiraz_nedenleri", json!(["asiri_artirim", "diger"]));
        answers.set("kiraci_bilgileri", "kiraci_email", "");

        let bag = map_answers(template, &answers, today());
        assert_eq!(bag["kiraci_ad"], json!("Ayşe Demir"));
        assert_eq!(bag["mevcut_kira"], json!(4000));
        assert_eq!(bag["mulk_tipi_label"], json!("Daire"));
        assert_eq!(
            bag["itiraz_nedenleri_labels"],
            json!(["Artırım oranı çok yüksek", "Diğer nedenler"])
        );
        assert_eq!(bag["artis_yuzdesi"], json!(50));
        assert!(!bag.contains_key("kiraci_email"));
    }

    #[test]
    fn test_answers_filed_under_other_step_are_found() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("kira-itiraz-v1").unwrap();
        let mut answers = WizardAnswers::new();
        answers.set("step1", "kiraci_ad", "Ali");
        let bag = map_answers(template, &answers, today());
        assert_eq!(bag["kiraci_ad"], json!("Ali"));
    }

    #[test]
    fn test_non_numeric_number_answer_defaults_to_zero() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("kira-itiraz-v1").unwrap();
        let mut answers = WizardAnswers::new();
        answers.set("mevcut_sozlesme", "mevcut_kira", "çok");
        let bag = map_answers(template, &answers, today());
        assert_eq!(bag["mevcut_kira"], json!(0));
        assert_eq!(bag["artis_yuzdesi"], json!(0));
    }
}
