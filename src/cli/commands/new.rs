//! `dilekce new` command - Start a document from a template

use chrono::Local;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::doc::generate_document;
use crate::cli::helpers::{
    format_short_id, load_registry, open_store, print_step_errors, read_answers_file,
    report_import, AnswerImport,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::answers::WizardAnswers;
use crate::core::document::title_suggestions;
use crate::core::identity::RecordId;
use crate::core::{DocumentFormat, DocumentStore};
use crate::schema::model::WizardTemplate;
use crate::schema::{StepValidator, StepWizard, WizardOutcome, WizardState};

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Template id (see `dilekce template list`)
    pub template: String,

    /// Document title (default: template name and today's date)
    #[arg(long)]
    pub title: Option<String>,

    /// Format used when exporting (txt, docx, html)
    #[arg(long = "as")]
    pub output: Option<DocumentFormat>,

    /// Fill from an answers file instead of running the wizard
    #[arg(long, short = 'a')]
    pub answers: Option<PathBuf>,
}

pub fn run(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;
    let registry = load_registry(Some(store.project()))?;
    let template = registry.get(&args.template)?.clone();
    let format = args.output.unwrap_or_else(|| config.default_format());

    // A broken answers file must not leave an empty draft behind
    let import = match args.answers {
        Some(ref path) => {
            let import = read_answers_file(path, &template)?;
            report_import(&import)?;
            Some(import)
        }
        None => None,
    };

    let title = match args.title {
        Some(title) => title,
        None => default_title(&template, import.as_ref())?,
    };
    let doc = store
        .create_document(&template, &title, format)
        .into_diagnostic()?;

    if global.format == OutputFormat::Id {
        println!("{}", doc.id);
    } else if !global.quiet {
        println!(
            "{} Created {} \"{}\"",
            style("✓").green(),
            style(&doc.id).cyan(),
            doc.title
        );
    }

    match import {
        Some(import) => apply_answers(&store, &template, &doc.id, import.answers, global),
        None => run_wizard(&store, &template, &doc.id, WizardAnswers::new(), 0, global),
    }
}

/// First title suggestion; asked for interactively when no answers file is used
fn default_title(template: &WizardTemplate, import: Option<&AnswerImport>) -> Result<String> {
    let today = Local::now().date_naive();
    let values: Vec<String> = import
        .map(|i| i.answers.iter().map(|(_, _, a)| a.as_text()).collect())
        .unwrap_or_default();
    let suggestions = title_suggestions(&template.name, values.iter().map(String::as_str), today);
    let first = suggestions
        .into_iter()
        .next()
        .unwrap_or_else(|| template.name.clone());

    if import.is_some() {
        return Ok(first);
    }
    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Belge başlığı")
        .default(first)
        .interact_text()
        .into_diagnostic()
}

/// Store answers, report what is still missing, and generate once complete
pub(crate) fn apply_answers(
    store: &DocumentStore,
    template: &WizardTemplate,
    id: &RecordId,
    answers: WizardAnswers,
    global: &GlobalOpts,
) -> Result<()> {
    let doc = store
        .save_answers(id, answers, template)
        .into_diagnostic()?;
    let stored = store.load_answers(id).into_diagnostic()?;
    let validator = StepValidator::new(template).map_err(|e| miette::miette!("{}", e))?;
    let failures = validator.validate_answers(template, &stored);

    if !global.quiet {
        println!(
            "{} {}% complete ({} of {} questions answered)",
            style("•").cyan(),
            doc.completion_percentage,
            doc.questions_answered,
            doc.total_questions
        );
    }

    if failures.is_empty() {
        generate_document(store, template, id, global)?;
        return Ok(());
    }

    if !global.quiet {
        println!();
        println!(
            "{} step(s) still need attention:",
            style(failures.len()).yellow()
        );
        for failure in &failures {
            print_step_errors(failure);
        }
        println!();
        println!(
            "Continue with: {}",
            style(format!("dilekce fill {} --answers <FILE>", format_short_id(id))).yellow()
        );
    }
    Ok(())
}

/// Run the interactive wizard, saving answers and session after every step
pub(crate) fn run_wizard(
    store: &DocumentStore,
    template: &WizardTemplate,
    id: &RecordId,
    answers: WizardAnswers,
    start_step: usize,
    global: &GlobalOpts,
) -> Result<()> {
    let mut state = WizardState::new(template, answers)
        .map_err(|e| miette::miette!("{}", e))?
        .resume_at(start_step);

    let outcome = StepWizard::new().run(&mut state, |state| {
        let progress = state.take_progress();
        store
            .replace_answers(id, state.answers().clone(), template)
            .into_diagnostic()?;
        store.save_session(id, progress).into_diagnostic()?;
        Ok(())
    })?;

    match outcome {
        WizardOutcome::Completed => {
            generate_document(store, template, id, global)?;
            if !global.quiet {
                println!();
                println!(
                    "Export with: {}",
                    style(format!("dilekce doc export {} --as all", id)).yellow()
                );
            }
        }
        WizardOutcome::Paused => {
            if !global.quiet {
                println!(
                    "{} Answers saved. Resume with {}",
                    style("✓").green(),
                    style(format!("dilekce fill {}", id)).yellow()
                );
            }
        }
    }
    Ok(())
}
