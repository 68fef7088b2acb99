//! `dilekce clause` command - Clause version control

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::cli::helpers::{effective_format, open_project, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::clause::service::last_activity;
use crate::clause::{
    ChangeType, ClauseChange, ClauseRepository, ClauseService, ClauseVersion,
    ClauseVersionNumber, FileClauseRepository, NewClause, RegulatoryUpdate, VersionComparison,
    VersionRequest, VersionStatus,
};
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ClauseCommands {
    /// List stored clauses
    List,

    /// Create a clause (version 1.0.0, draft) from a YAML file
    New(NewArgs),

    /// Create the next version of a clause from a YAML change file
    Update(UpdateArgs),

    /// Show one version (default: the active one, else the latest)
    Show(ShowArgs),

    /// List every version of a clause
    History(ClauseArg),

    /// Make a version the clause's active version
    Activate(VersionArgs),

    /// Compare two versions field by field
    Compare(CompareArgs),

    /// Apply a regulatory update to every clause it names
    ApplyUpdate(ApplyUpdateArgs),
}

#[derive(clap::Args, Debug)]
pub struct ClauseArg {
    /// Clause id
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Clause id ([a-z0-9_-])
    pub id: String,

    /// YAML file with content, metadata and legal_references
    pub file: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Breaking,
    Feature,
    Legal,
    Bugfix,
}

impl From<ChangeKind> for ChangeType {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Breaking => ChangeType::BreakingChange,
            ChangeKind::Feature => ChangeType::Feature,
            ChangeKind::Legal => ChangeType::LegalUpdate,
            ChangeKind::Bugfix => ChangeType::Bugfix,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Clause id
    pub id: String,

    /// YAML file naming only the parts that change
    pub file: PathBuf,

    /// Why the clause changes
    #[arg(long, short = 'm')]
    pub reason: String,

    /// Legal ground for the change
    #[arg(long)]
    pub justification: Option<String>,

    /// Date the new version takes effect (YYYY-MM-DD)
    #[arg(long)]
    pub effective: Option<NaiveDate>,

    /// Override the detected change type
    #[arg(long = "change-type", value_enum)]
    pub change_type: Option<ChangeKind>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Clause id
    pub id: String,

    /// Version to show
    #[arg(value_name = "VERSION")]
    pub clause_version: Option<ClauseVersionNumber>,
}

#[derive(clap::Args, Debug)]
pub struct VersionArgs {
    /// Clause id
    pub id: String,

    /// Version to activate (e.g. 1.1.0)
    #[arg(value_name = "VERSION")]
    pub clause_version: ClauseVersionNumber,
}

#[derive(clap::Args, Debug)]
pub struct CompareArgs {
    /// Clause id
    pub id: String,

    /// Older version
    pub from: ClauseVersionNumber,

    /// Newer version
    pub to: ClauseVersionNumber,
}

#[derive(clap::Args, Debug)]
pub struct ApplyUpdateArgs {
    /// YAML file describing the regulatory update
    pub file: PathBuf,
}

pub fn run(cmd: ClauseCommands, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let user = Config::load_for(Some(&project)).user();
    let mut service = ClauseService::new(FileClauseRepository::for_project(&project));

    match cmd {
        ClauseCommands::List => run_list(&service, global),
        ClauseCommands::New(args) => run_new(&mut service, args, &user, global),
        ClauseCommands::Update(args) => run_update(&mut service, args, &user, global),
        ClauseCommands::Show(args) => run_show(&service, args, global),
        ClauseCommands::History(args) => run_history(&service, args, global),
        ClauseCommands::Activate(args) => run_activate(&mut service, args, &user, global),
        ClauseCommands::Compare(args) => run_compare(&service, args, global),
        ClauseCommands::ApplyUpdate(args) => run_apply_update(&mut service, args, &user, global),
    }
}

fn read_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let source = std::fs::read_to_string(path)
        .into_diagnostic()
        .map_err(|e| e.wrap_err(format!("Failed to read {}", path.display())))?;
    Ok(crate::yaml::parse(&source, &path.display().to_string())?)
}

fn styled_status(status: VersionStatus) -> String {
    match status {
        VersionStatus::Active => style(status).green().bold().to_string(),
        VersionStatus::Draft | VersionStatus::Review => style(status).yellow().to_string(),
        VersionStatus::Approved => style(status).cyan().to_string(),
        VersionStatus::Deprecated | VersionStatus::Archived => style(status).dim().to_string(),
    }
}

fn run_list(service: &ClauseService<FileClauseRepository>, global: &GlobalOpts) -> Result<()> {
    let ids = service.repository().clause_ids().into_diagnostic()?;
    let format = effective_format(global, OutputFormat::Tsv);

    if format == OutputFormat::Id {
        for id in &ids {
            println!("{}", id);
        }
        return Ok(());
    }
    if ids.is_empty() {
        println!("No clauses found.");
        println!();
        println!(
            "Create one with: {}",
            style("dilekce clause new <ID> <FILE>").yellow()
        );
        return Ok(());
    }

    println!(
        "{:<24} {:<10} {:<10} {}",
        style("ID").bold(),
        style("ACTIVE").bold(),
        style("LATEST").bold(),
        style("TITLE").bold()
    );
    println!("{}", "-".repeat(80));
    for id in &ids {
        let versions = service.history(id).into_diagnostic()?;
        let active = versions
            .iter()
            .find(|v| v.status == VersionStatus::Active)
            .map(|v| v.version.to_string())
            .unwrap_or_else(|| "-".to_string());
        let Some(latest) = versions.last() else {
            continue;
        };
        println!(
            "{:<24} {:<10} {:<10} {}",
            id,
            active,
            latest.version.to_string(),
            truncate_str(&latest.metadata.title, 34)
        );
    }
    println!();
    println!("{} clause(s) found", style(ids.len()).cyan());
    Ok(())
}

fn run_new(
    service: &mut ClauseService<FileClauseRepository>,
    args: NewArgs,
    user: &str,
    global: &GlobalOpts,
) -> Result<()> {
    let clause: NewClause = read_yaml_file(&args.file)?;
    let version = service
        .create_clause(&args.id, clause, user)
        .into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} Created clause {} version {} ({})",
            style("✓").green(),
            style(&version.clause_id).cyan(),
            style(version.version).yellow(),
            styled_status(version.status)
        );
        println!(
            "Activate with: {}",
            style(format!("dilekce clause activate {} {}", version.clause_id, version.version))
                .yellow()
        );
    }
    Ok(())
}

fn run_update(
    service: &mut ClauseService<FileClauseRepository>,
    args: UpdateArgs,
    user: &str,
    global: &GlobalOpts,
) -> Result<()> {
    let change: ClauseChange = read_yaml_file(&args.file)?;
    let result = service
        .create_clause_version(VersionRequest {
            clause_id: args.id,
            change,
            change_reason: args.reason,
            legal_justification: args.justification,
            effective_date: args.effective,
            user_id: user.to_string(),
            change_type: args.change_type.map(ChangeType::from),
        })
        .into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} Created {} version {} ({}, {})",
            style("✓").green(),
            style(&result.version.clause_id).cyan(),
            style(result.version.version).yellow(),
            result.change_type,
            styled_status(result.version.status)
        );
    }
    for warning in &result.warnings {
        eprintln!("  {} {}", style("!").yellow(), warning);
    }
    Ok(())
}

fn run_show(
    service: &ClauseService<FileClauseRepository>,
    args: ShowArgs,
    global: &GlobalOpts,
) -> Result<()> {
    let version = service
        .get_version(&args.id, args.clause_version)
        .into_diagnostic()?;

    match effective_format(global, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&version).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&version).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", version.key()),
        _ => print_version(&version),
    }
    Ok(())
}

fn print_version(version: &ClauseVersion) {
    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {} {}",
        style("Clause").bold(),
        style(&version.clause_id).cyan(),
        style(format!("v{}", version.version)).yellow()
    );
    println!("{}: {}", style("Title").bold(), version.metadata.title);
    println!("{}: {}", style("Status").bold(), styled_status(version.status));
    if !version.metadata.category.is_empty() {
        println!("{}: {}", style("Category").bold(), version.metadata.category);
    }
    println!("{}: {}", style("Effective").bold(), version.effective_date);
    if !version.metadata.applicable_documents.is_empty() {
        println!(
            "{}: {}",
            style("Used in").bold(),
            version.metadata.applicable_documents.join(", ")
        );
    }
    if !version.metadata.required_fields.is_empty() {
        println!(
            "{}: {}",
            style("Fields").bold(),
            version.metadata.required_fields.join(", ")
        );
    }
    let integrity = if version.verify_hash() {
        style("ok").green()
    } else {
        style("MISMATCH").red().bold()
    };
    println!("{}: {}", style("Content hash").bold(), integrity);
    println!("{}", style("─".repeat(60)).dim());
    println!();
    println!("{}", version.content);
    println!();

    if !version.legal_references.is_empty() {
        println!("{}", style("Legal references:").bold());
        for reference in &version.legal_references {
            let inactive = if reference.is_active { "" } else { " (inactive)" };
            println!("  • {}{}", reference, inactive);
        }
        println!();
    }

    if !version.changelog.changes.is_empty() {
        println!("{}", style("Changes:").bold());
        for change in &version.changelog.changes {
            println!(
                "  • [{}] {} {}",
                change.change_type,
                change.description,
                style(format!("({})", change.impact)).dim()
            );
        }
        println!();
    }

    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {} | {}: {} | {}: {}",
        style("Created by").dim(),
        version.created_by,
        style("Created").dim(),
        version.created_at.format("%Y-%m-%d %H:%M"),
        style("Last activity").dim(),
        last_activity(version).format("%Y-%m-%d %H:%M")
    );
}

fn run_history(
    service: &ClauseService<FileClauseRepository>,
    args: ClauseArg,
    global: &GlobalOpts,
) -> Result<()> {
    let versions = service.history(&args.id).into_diagnostic()?;

    match effective_format(global, OutputFormat::Tsv) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&versions).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&versions).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for version in &versions {
                println!("{}", version.key());
            }
        }
        _ => {
            println!(
                "{:<10} {:<12} {:<16} {:<12} {:<12} {}",
                style("VERSION").bold(),
                style("STATUS").bold(),
                style("CHANGE").bold(),
                style("EFFECTIVE").bold(),
                style("BY").bold(),
                style("DESCRIPTION").bold()
            );
            println!("{}", "-".repeat(96));
            for version in &versions {
                let (change, description) = version
                    .changelog
                    .changes
                    .first()
                    .map(|c| (c.change_type.to_string(), c.description.clone()))
                    .unwrap_or_default();
                println!(
                    "{:<10} {:<12} {:<16} {:<12} {:<12} {}",
                    version.version.to_string(),
                    version.status.to_string(),
                    change,
                    version.effective_date.to_string(),
                    truncate_str(&version.created_by, 12),
                    truncate_str(&description, 40)
                );
            }
            println!();
            println!("{} version(s) found", style(versions.len()).cyan());
        }
    }
    Ok(())
}

fn run_activate(
    service: &mut ClauseService<FileClauseRepository>,
    args: VersionArgs,
    user: &str,
    global: &GlobalOpts,
) -> Result<()> {
    let version = service
        .activate(&args.id, args.clause_version, user)
        .into_diagnostic()?;
    if !global.quiet {
        println!(
            "{} {} version {} is now {}",
            style("✓").green(),
            style(&version.clause_id).cyan(),
            style(version.version).yellow(),
            styled_status(version.status)
        );
    }
    Ok(())
}

fn run_compare(
    service: &ClauseService<FileClauseRepository>,
    args: CompareArgs,
    global: &GlobalOpts,
) -> Result<()> {
    let comparison = service
        .compare_versions(&args.id, args.from, args.to)
        .into_diagnostic()?;

    match effective_format(global, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&comparison).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&comparison).into_diagnostic()?);
        }
        _ => print_comparison(&comparison),
    }
    Ok(())
}

fn print_comparison(comparison: &VersionComparison) {
    println!(
        "{} {} {} → {}",
        style("Comparing").bold(),
        style(&comparison.clause_id).cyan(),
        style(comparison.from_version).yellow(),
        style(comparison.to_version).yellow()
    );
    println!();

    if comparison.differences.is_empty() {
        println!("No differences.");
    } else {
        for diff in &comparison.differences {
            println!(
                "  {:<22} {:<13} {:<9} {}",
                diff.field,
                diff.kind.to_string(),
                diff.impact.to_string(),
                diff.description
            );
        }
    }

    let compat = &comparison.compatibility;
    println!();
    println!(
        "{}: {} | {}: {} | {}: {}",
        style("Breaking").dim(),
        if compat.has_breaking_changes { "yes" } else { "no" },
        style("Backward compatible").dim(),
        if compat.backward_compatible { "yes" } else { "no" },
        style("Migration").dim(),
        comparison.migration_complexity
    );
    if !compat.affected_features.is_empty() {
        println!(
            "{}: {}",
            style("Affected").dim(),
            compat.affected_features.join(", ")
        );
    }

    if !comparison.recommended_actions.is_empty() {
        println!();
        println!("{}", style("Recommended actions:").bold());
        for action in &comparison.recommended_actions {
            println!("  → {}", action);
        }
    }
}

fn run_apply_update(
    service: &mut ClauseService<FileClauseRepository>,
    args: ApplyUpdateArgs,
    user: &str,
    global: &GlobalOpts,
) -> Result<()> {
    let update: RegulatoryUpdate = read_yaml_file(&args.file)?;
    let results = service.apply_regulatory_update(&update, user);

    let mut failed = 0;
    for (clause_id, result) in &results {
        match result {
            Ok(applied) => {
                if !global.quiet {
                    println!(
                        "{} {} → {}",
                        style("✓").green(),
                        style(clause_id).cyan(),
                        style(applied.version.version).yellow()
                    );
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {}", style("✗").red(), clause_id, e);
            }
        }
    }

    if failed > 0 {
        return Err(miette::miette!(
            "Update {} failed for {} of {} clause(s)",
            update.update_id,
            failed,
            results.len()
        ));
    }
    Ok(())
}
