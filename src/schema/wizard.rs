//! Step wizard: walks a template one step at a time
//!
//! [`WizardState`] holds the position, answers and counters and knows
//! nothing about terminals, so it can be driven from tests or scripts.
//! [`StepWizard`] prompts for each step with dialoguer and feeds the
//! submitted values back into the state.

use chrono::Utc;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Select};
use miette::{IntoDiagnostic, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::core::answers::{value_as_bool, value_as_list, value_as_text, WizardAnswers};
use crate::core::document::calculate_completion;
use crate::core::session::SessionProgress;
use crate::schema::model::{FieldKind, WizardField, WizardStep, WizardTemplate};
use crate::schema::validator::{StepValidationError, StepValidator};

/// Position and collected answers of one wizard run
pub struct WizardState<'t> {
    template: &'t WizardTemplate,
    validator: StepValidator,
    answers: WizardAnswers,
    current: usize,
    errors: BTreeMap<String, Vec<String>>,
    back_navigations: u32,
    validation_failures: u32,
}

impl<'t> WizardState<'t> {
    /// Start at the first step, keeping any earlier answers
    pub fn new(template: &'t WizardTemplate, answers: WizardAnswers) -> Result<Self, String> {
        Ok(Self {
            template,
            validator: StepValidator::new(template)?,
            answers,
            current: 0,
            errors: BTreeMap::new(),
            back_navigations: 0,
            validation_failures: 0,
        })
    }

    /// Resume at a saved step index, clamped to the template
    pub fn resume_at(mut self, step: usize) -> Self {
        self.current = step.min(self.template.steps.len());
        self
    }

    pub fn template(&self) -> &WizardTemplate {
        self.template
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> Option<&'t WizardStep> {
        self.template.steps.get(self.current)
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.template.steps.len()
    }

    pub fn answers(&self) -> &WizardAnswers {
        &self.answers
    }

    pub fn into_answers(self) -> WizardAnswers {
        self.answers
    }

    /// Validate the current step's values and advance on success.
    ///
    /// A field left blank drops its earlier answer.
    pub fn submit(&mut self, values: &Map<String, Value>) -> Result<(), StepValidationError> {
        let Some(step) = self.current_step() else {
            return Ok(());
        };
        match self.validator.validate_step_in(step, values, &self.answers) {
            Ok(coerced) => {
                self.answers.set_step(&step.id, &coerced, Utc::now());
                self.errors.clear();
                self.current += 1;
                Ok(())
            }
            Err(err) => {
                self.validation_failures += 1;
                self.errors = err.field_errors();
                Err(err)
            }
        }
    }

    /// Step back one page; false on the first step
    pub fn back(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        self.back_navigations += 1;
        self.errors.clear();
        true
    }

    /// Snapshot for a session save; navigation counters reset afterwards
    pub fn take_progress(&mut self) -> SessionProgress {
        let progress = self.template.progress(&self.answers);
        let hidden = self.template.hidden_fields(&self.answers);
        let visible: Vec<&WizardField> = self
            .template
            .fields()
            .filter(|(_, f)| !hidden.contains(&f.id))
            .map(|(_, f)| f)
            .collect();
        let completed: Vec<String> = self
            .template
            .fields()
            .filter(|(s, f)| !hidden.contains(&f.id) && self.answers.is_answered_valid(&s.id, &f.id))
            .map(|(_, f)| f.id.clone())
            .collect();

        let report = SessionProgress {
            current_step: self.current,
            visible_questions: visible.iter().map(|f| f.id.clone()).collect(),
            completed_questions: completed,
            required_questions: visible
                .iter()
                .filter(|f| f.required)
                .map(|f| f.id.clone())
                .collect(),
            validation_errors: self.errors.clone(),
            completion_percentage: calculate_completion(
                progress.total,
                progress.answered_required,
                progress.required,
            ),
            is_complete: self.is_finished() && progress.answered_required == progress.required,
            back_navigations: self.back_navigations,
            validation_failures: self.validation_failures,
        };
        self.back_navigations = 0;
        self.validation_failures = 0;
        report
    }
}

/// How an interactive run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardOutcome {
    Completed,
    /// The user stopped early; answers so far were kept
    Paused,
}

/// Terminal front end for [`WizardState`]
pub struct StepWizard {
    theme: ColorfulTheme,
}

impl StepWizard {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Prompt step by step until the template is finished or the user pauses.
    ///
    /// `on_step` runs after every accepted step so the caller can persist.
    pub fn run<F>(&self, state: &mut WizardState<'_>, mut on_step: F) -> Result<WizardOutcome>
    where
        F: FnMut(&mut WizardState<'_>) -> Result<()>,
    {
        let total = state.template().steps.len();
        println!();
        println!(
            "{} {}",
            style("◆").cyan(),
            style(&state.template().name).bold()
        );
        if let Some(time) = &state.template().metadata.estimated_time {
            println!("  {}", style(format!("Tahmini süre: {}", time)).dim());
        }

        while let Some(step) = state.current_step() {
            println!();
            println!(
                "{} {}",
                style(format!("Adım {}/{}", state.current_index() + 1, total)).cyan(),
                style(&step.title).bold()
            );
            if !step.description.is_empty() {
                println!("  {}", style(&step.description).dim());
            }
            println!("{}", style("─".repeat(50)).dim());

            if state.current_index() > 0 {
                let choice = Select::with_theme(&self.theme)
                    .with_prompt("Devam")
                    .items(&["Bu adımı doldur", "Önceki adıma dön", "Kaydet ve çık"])
                    .default(0)
                    .interact()
                    .into_diagnostic()?;
                match choice {
                    1 => {
                        state.back();
                        continue;
                    }
                    2 => {
                        on_step(state)?;
                        return Ok(WizardOutcome::Paused);
                    }
                    _ => {}
                }
            }

            let existing = state.answers().step_values(&step.id);
            let values = self.prompt_step(step, &existing, state.answers())?;
            match state.submit(&values) {
                Ok(()) => on_step(state)?,
                Err(err) => {
                    println!();
                    for violation in err.violations() {
                        println!(
                            "  {} {}: {}",
                            style("✗").red(),
                            violation.label,
                            violation.message
                        );
                    }
                    println!("  {}", style("Lütfen bu adımı düzeltin.").yellow());
                }
            }
        }

        println!();
        println!("{} Tüm adımlar tamamlandı", style("✓").green());
        Ok(WizardOutcome::Completed)
    }

    fn prompt_step(
        &self,
        step: &WizardStep,
        existing: &Map<String, Value>,
        answers: &WizardAnswers,
    ) -> Result<Map<String, Value>> {
        let mut values = Map::new();
        for field in &step.fields {
            if step.hidden_fields(&values, answers).contains(&field.id) {
                continue;
            }
            if let Some(value) = self.prompt_field(field, existing.get(&field.id))? {
                values.insert(field.id.clone(), value);
            }
        }
        Ok(values)
    }

    fn prompt_field(&self, field: &WizardField, current: Option<&Value>) -> Result<Option<Value>> {
        let prompt = format_prompt(field);

        if field.is_confirmation() {
            let answer = Confirm::with_theme(&self.theme)
                .with_prompt(&prompt)
                .default(current.is_some_and(value_as_bool))
                .interact()
                .into_diagnostic()?;
            return Ok(answer.then_some(Value::Bool(true)));
        }

        match field.kind {
            FieldKind::Select | FieldKind::Radio => {
                let mut items: Vec<&str> = field.options.iter().map(|o| o.label.as_str()).collect();
                if !field.required {
                    items.push("(boş bırak)");
                }
                let default_idx = current
                    .map(value_as_text)
                    .and_then(|v| field.options.iter().position(|o| o.value == v))
                    .unwrap_or(0);
                let selection = Select::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .items(&items)
                    .default(default_idx)
                    .interact()
                    .into_diagnostic()?;
                Ok(field
                    .options
                    .get(selection)
                    .map(|o| Value::String(o.value.clone())))
            }

            FieldKind::Checkbox => {
                let chosen = current.map(value_as_list).unwrap_or_default();
                let labels: Vec<&str> = field.options.iter().map(|o| o.label.as_str()).collect();
                let defaults: Vec<bool> = field
                    .options
                    .iter()
                    .map(|o| chosen.contains(&o.value))
                    .collect();
                let picked = MultiSelect::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .items(&labels)
                    .defaults(&defaults)
                    .interact()
                    .into_diagnostic()?;
                if picked.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Value::Array(
                    picked
                        .into_iter()
                        .filter_map(|i| field.options.get(i))
                        .map(|o| Value::String(o.value.clone()))
                        .collect(),
                )))
            }

            _ => {
                let mut input = Input::<String>::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .allow_empty(true);
                let default = current.map(value_as_text).unwrap_or_default();
                if !default.is_empty() {
                    input = input.default(default);
                } else if let Some(ref placeholder) = field.placeholder {
                    println!("  {}", style(format!("örn. {}", placeholder)).dim());
                }
                let value = input.interact_text().into_diagnostic()?;
                let value = value.trim();
                if value.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Value::String(value.to_string())))
                }
            }
        }
    }
}

impl Default for StepWizard {
    fn default() -> Self {
        Self::new()
    }
}

fn format_prompt(field: &WizardField) -> String {
    let marker = if field.required { " *" } else { "" };
    match field.help {
        Some(ref help) => {
            let short: String = if help.chars().count() > 50 {
                format!("{}...", help.chars().take(47).collect::<String>())
            } else {
                help.clone()
            };
            format!("{}{} ({})", field.label, marker, style(short).dim())
        }
        None => format!("{}{}", field.label, marker),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> WizardTemplate {
        serde_yml::from_str(
            r#"
id: deneme
name: Deneme
category: test
steps:
  - id: kisi
    title: Kişi
    fields:
      - {id: ad, kind: text, label: Ad, required: true}
      - {id: not, kind: text, label: Not}
  - id: kira
    title: Kira
    fields:
      - id: tutar
        kind: number
        label: Tutar
        required: true
        constraints: {positive: true}
"#,
        )
        .unwrap()
    }

    fn values(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_submit_advances_only_when_valid() {
        let t = template();
        let mut state = WizardState::new(&t, WizardAnswers::new()).unwrap();

        let err = state.submit(&values(json!({"not": "x"}))).unwrap_err();
        assert!(err.names_field("ad"));
        assert_eq!(state.current_index(), 0);

        state.submit(&values(json!({"ad": "Ayşe"}))).unwrap();
        assert_eq!(state.current_index(), 1);
        assert!(state.answers().is_answered("kisi", "ad"));

        state.submit(&values(json!({"tutar": "5.000"}))).unwrap();
        assert!(state.is_finished());
        assert_eq!(
            state.answers().get("kira", "tutar").unwrap().as_number(),
            5000.0
        );
    }

    #[test]
    fn test_back_counts_navigation_and_stops_at_first_step() {
        let t = template();
        let mut state = WizardState::new(&t, WizardAnswers::new()).unwrap();
        assert!(!state.back());
        state.submit(&values(json!({"ad": "Ayşe"}))).unwrap();
        assert!(state.back());
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.take_progress().back_navigations, 1);
    }

    #[test]
    fn test_clearing_optional_field_drops_answer() {
        let t = template();
        let mut answers = WizardAnswers::new();
        answers.set("kisi", "not", "eski");
        let mut state = WizardState::new(&t, answers).unwrap();
        state.submit(&values(json!({"ad": "Ayşe"}))).unwrap();
        assert!(!state.answers().is_answered("kisi", "not"));
    }

    #[test]
    fn test_progress_report_resets_counters() {
        let t = template();
        let mut state = WizardState::new(&t, WizardAnswers::new()).unwrap();
        let _ = state.submit(&values(json!({})));
        state.submit(&values(json!({"ad": "Ayşe"}))).unwrap();

        let first = state.take_progress();
        assert_eq!(first.validation_failures, 1);
        assert_eq!(first.current_step, 1);
        assert_eq!(first.completed_questions, vec!["ad".to_string()]);
        assert_eq!(first.completion_percentage, 50);
        assert!(!first.is_complete);

        state.submit(&values(json!({"tutar": 100}))).unwrap();
        let second = state.take_progress();
        assert_eq!(second.validation_failures, 0);
        assert_eq!(second.completion_percentage, 100);
        assert!(second.is_complete);
    }

    #[test]
    fn test_resume_at_is_clamped() {
        let t = template();
        let state = WizardState::new(&t, WizardAnswers::new())
            .unwrap()
            .resume_at(10);
        assert!(state.is_finished());
    }
}
