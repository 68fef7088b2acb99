//! `dilekce validate` command - Check an answers file against a template

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::helpers::{print_step_errors, read_answers_file};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::project::Project;
use crate::schema::StepValidator;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Template id (e.g. kira-itiraz-v1)
    pub template: String,

    /// Answers file (YAML or JSON)
    pub answers: PathBuf,
}

/// One problem, as printed with `--format json|yaml`
#[derive(Debug, Serialize)]
struct Problem {
    step: Option<String>,
    field: String,
    message: String,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let project = Project::resolve(global.project.as_deref()).ok();
    let registry = crate::cli::helpers::load_registry(project.as_ref())?;
    let template = registry.get(&args.template)?;

    let import = read_answers_file(&args.answers, template)?;
    let answers = import.answers;
    let validator = StepValidator::new(template).map_err(|e| miette::miette!("{}", e))?;
    let failures = validator.validate_answers(template, &answers);

    let mut problems: Vec<Problem> = import
        .invalid
        .iter()
        .map(|(field, message)| Problem {
            step: template.field(field).map(|(s, _)| s.id.clone()),
            field: field.clone(),
            message: message.clone(),
        })
        .collect();
    for failure in &failures {
        problems.extend(failure.violations().iter().map(|v| Problem {
            step: Some(failure.step_id.clone()),
            field: v.field.clone(),
            message: v.message.clone(),
        }));
    }

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&problems).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&problems).into_diagnostic()?);
        }
        _ => {
            for key in &import.unknown {
                println!(
                    "{} Unknown answer key {}",
                    style("!").yellow(),
                    style(key).cyan()
                );
            }
            for (field, message) in &import.invalid {
                println!(
                    "{} {}",
                    style("✗").red(),
                    style(format!("{}: {}", field, message)).bold()
                );
            }
            for failure in &failures {
                print_step_errors(failure);
            }
            if problems.is_empty() && !global.quiet {
                println!(
                    "{} {} answers all {} steps of {}",
                    style("✓").green(),
                    style(args.answers.display()).cyan(),
                    template.steps.len(),
                    style(&template.id).yellow()
                );
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(miette::miette!(
            "Validation failed: {} problem(s)",
            problems.len()
        ))
    }
}
