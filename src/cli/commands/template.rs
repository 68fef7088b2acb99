//! `dilekce template` command - Browse and check wizard templates

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{effective_format, load_registry, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::project::Project;
use crate::schema::model::WizardTemplate;
use crate::schema::registry::load_template_file;

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// List built-in and project templates
    List,

    /// Show a template's steps and questions
    Show(ShowArgs),

    /// Check a template file for structural problems
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Template id (e.g. kira-itiraz-v1)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Template YAML file
    pub file: PathBuf,
}

pub fn run(cmd: TemplateCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        TemplateCommands::List => run_list(global),
        TemplateCommands::Show(args) => run_show(args, global),
        TemplateCommands::Check(args) => run_check(args, global),
    }
}

/// Templates do not need a project; project overrides apply when inside one
fn optional_project(global: &GlobalOpts) -> Option<Project> {
    Project::resolve(global.project.as_deref()).ok()
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let project = optional_project(global);
    let registry = load_registry(project.as_ref())?;
    let templates: Vec<&WizardTemplate> = registry.iter().map(|(t, _)| t).collect();

    match effective_format(global, OutputFormat::Tsv) {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&templates).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&templates).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            for template in &templates {
                println!("{}", template.id);
            }
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer
                .write_record(["id", "name", "category", "steps", "questions", "source"])
                .into_diagnostic()?;
            for (template, source) in registry.iter() {
                writer
                    .write_record([
                        template.id.clone(),
                        template.name.clone(),
                        template.category.clone(),
                        template.steps.len().to_string(),
                        template.total_questions().to_string(),
                        source.to_string(),
                    ])
                    .into_diagnostic()?;
            }
            writer.flush().into_diagnostic()?;
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["ID", "Name", "Category", "Steps", "Questions"]);
            for template in &templates {
                builder.push_record([
                    template.id.clone(),
                    template.name.clone(),
                    template.category.clone(),
                    template.steps.len().to_string(),
                    template.total_questions().to_string(),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        _ => {
            println!(
                "{:<22} {:<36} {:<10} {:<6} {:<10}",
                style("ID").bold(),
                style("NAME").bold(),
                style("CATEGORY").bold(),
                style("STEPS").bold(),
                style("SOURCE").bold()
            );
            println!("{}", "-".repeat(88));
            for (template, source) in registry.iter() {
                println!(
                    "{:<22} {:<36} {:<10} {:<6} {:<10}",
                    template.id,
                    truncate_str(&template.name, 34),
                    template.category,
                    template.steps.len(),
                    truncate_str(&source.to_string(), 30)
                );
            }
            println!();
            println!("{} template(s) found", style(registry.len()).cyan());
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = optional_project(global);
    let registry = load_registry(project.as_ref())?;
    let template = registry.get(&args.id)?;

    match effective_format(global, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(template).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(template).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", template.id),
        _ => print_template(template),
    }
    Ok(())
}

fn print_template(template: &WizardTemplate) {
    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&template.id).cyan());
    println!("{}: {}", style("Name").bold(), style(&template.name).yellow());
    println!("{}: {}", style("Category").bold(), template.category);
    let meta = &template.metadata;
    if let Some(ref time) = meta.estimated_time {
        println!("{}: {}", style("Estimated time").bold(), time);
    }
    if let Some(ref difficulty) = meta.difficulty {
        println!("{}: {}", style("Difficulty").bold(), difficulty);
    }
    if !meta.legal_references.is_empty() {
        println!(
            "{}: {}",
            style("Legal references").bold(),
            meta.legal_references.join(", ")
        );
    }
    println!("{}", style("─".repeat(60)).dim());
    if !meta.description.is_empty() {
        println!();
        println!("{}", meta.description);
    }

    for (index, step) in template.steps.iter().enumerate() {
        println!();
        println!(
            "{} {}",
            style(format!("{}.", index + 1)).cyan(),
            style(&step.title).bold()
        );
        for field in &step.fields {
            let marker = if field.required {
                style("*").red().to_string()
            } else {
                " ".to_string()
            };
            println!(
                "   {} {:<24} {} {}",
                marker,
                field.id,
                style(format!("{:<9}", format!("{:?}", field.kind).to_lowercase())).dim(),
                field.label
            );
        }
    }
    println!();
    println!(
        "{} question(s), {} required {}",
        style(template.total_questions()).cyan(),
        style(template.required_field_ids().len()).cyan(),
        style("(*)").red()
    );
}

fn run_check(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let template = load_template_file(&args.file)?;
    if !global.quiet {
        println!(
            "{} {} is valid: {} ({} steps, {} questions)",
            style("✓").green(),
            style(args.file.display()).cyan(),
            style(&template.id).yellow(),
            template.steps.len(),
            template.total_questions()
        );
    }
    Ok(())
}
