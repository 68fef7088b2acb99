//! `dilekce doc` command - Document management

use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::assembly::{
    analyze_rent_dispute, assemble_clauses, map_answers, DocumentGenerator, GenerationContext,
};
use crate::cli::helpers::{
    effective_format, format_short_id, load_registry, open_store, truncate_str, write_output,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::clause::FileClauseRepository;
use crate::core::identity::RecordId;
use crate::core::{
    DocumentFormat, DocumentQuery, DocumentSort, DocumentStatus, DocumentStore, UserDocument,
};
use crate::export::{self, ExportSource};
use crate::schema::model::WizardTemplate;

/// Document type whose answers get a readiness review
const RENT_DISPUTE: &str = "kira-itiraz-v1";

#[derive(Subcommand, Debug)]
pub enum DocCommands {
    /// List your documents
    List(ListArgs),

    /// Show a document's details
    Show(ShowArgs),

    /// Change a document's status
    Status(StatusArgs),

    /// Archive a document
    Archive(DocArg),

    /// Delete a document with its answers and session
    Delete(DeleteArgs),

    /// Copy a document and its answers into a new draft
    Duplicate(DuplicateArgs),

    /// Generate (or regenerate) the document text from its answers
    Generate(DocArg),

    /// Export generated content as txt, docx or html
    Export(ExportArgs),

    /// Write the document, answers and session as one YAML bundle
    Backup(BackupArgs),

    /// Show wizard statistics of a document
    Analytics(DocArg),

    /// Review a rent dispute's answers before filing
    Check(DocArg),

    /// Show which clauses the document's answers select
    Clauses(DocArg),
}

#[derive(clap::Args, Debug)]
pub struct DocArg {
    /// Document id or a unique part of it
    pub doc: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status (draft, in_progress, completed, archived)
    #[arg(long, short = 's')]
    pub status: Option<DocumentStatus>,

    /// Filter by template id
    #[arg(long, short = 't')]
    pub template: Option<String>,

    /// Sort by created, modified or title
    #[arg(long, default_value = "modified")]
    pub sort: DocumentSort,

    /// Reverse the sort order
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Show at most this many documents
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Skip this many documents
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Document id or a unique part of it
    pub doc: String,

    /// Print the generated text as well
    #[arg(long)]
    pub content: bool,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Document id or a unique part of it
    pub doc: String,

    /// New status (draft, in_progress, completed, archived)
    pub status: DocumentStatus,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Document id or a unique part of it
    pub doc: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct DuplicateArgs {
    /// Document id or a unique part of it
    pub doc: String,

    /// Title of the copy (default: "<title> (Kopya)")
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportTarget {
    Txt,
    Docx,
    Html,
    /// Every format
    All,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Document id or a unique part of it
    pub doc: String,

    /// Format to export (default: the document's own format)
    #[arg(long = "as", value_enum)]
    pub target: Option<ExportTarget>,

    /// Output directory (default: the configured export directory)
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct BackupArgs {
    /// Document id or a unique part of it
    pub doc: String,

    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

pub fn run(cmd: DocCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DocCommands::List(args) => run_list(args, global),
        DocCommands::Show(args) => run_show(args, global),
        DocCommands::Status(args) => run_status(args, global),
        DocCommands::Archive(args) => run_archive(args, global),
        DocCommands::Delete(args) => run_delete(args, global),
        DocCommands::Duplicate(args) => run_duplicate(args, global),
        DocCommands::Generate(args) => run_generate(args, global),
        DocCommands::Export(args) => run_export(args, global),
        DocCommands::Backup(args) => run_backup(args, global),
        DocCommands::Analytics(args) => run_analytics(args, global),
        DocCommands::Check(args) => run_check(args, global),
        DocCommands::Clauses(args) => run_clauses(args, global),
    }
}

fn styled_status(status: DocumentStatus) -> String {
    match status {
        DocumentStatus::Draft => style(status).dim().to_string(),
        DocumentStatus::InProgress => style(status).yellow().to_string(),
        DocumentStatus::Completed => style(status).green().to_string(),
        DocumentStatus::Archived => style(status).dim().italic().to_string(),
    }
}

/// The wizard template a document was started from
pub(crate) fn document_template(
    store: &DocumentStore,
    doc: &UserDocument,
) -> Result<WizardTemplate> {
    let registry = load_registry(Some(store.project()))?;
    Ok(registry.get(&doc.template_id)?.clone())
}

/// Render a document from its stored answers and save the result.
///
/// A regenerated document keeps its case number.
pub(crate) fn generate_document(
    store: &DocumentStore,
    template: &WizardTemplate,
    id: &RecordId,
    global: &GlobalOpts,
) -> Result<UserDocument> {
    let doc = store.load_document(id).into_diagnostic()?;
    let answers = store.load_answers(id).into_diagnostic()?;
    let generator = DocumentGenerator::new().into_diagnostic()?;

    let mut ctx = GenerationContext::now();
    if let Some(case) = doc.case_number.clone() {
        ctx = ctx.with_case_number(case);
    }
    let library = FileClauseRepository::for_project(store.project());
    let generated = generator
        .generate_with_clauses(template, &answers, &ctx, &library)
        .into_diagnostic()?;
    let readiness = (template.document_type() == RENT_DISPUTE)
        .then(|| analyze_rent_dispute(&generated.answers));

    let doc = store
        .store_generated(id, generated.content, generated.metadata)
        .into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} Generated {} (version {}, {} {})",
            style("✓").green(),
            style(format_short_id(&doc.id)).cyan(),
            doc.document_version,
            style("case").dim(),
            doc.case_number.as_deref().unwrap_or("-")
        );
        if let Some(report) = readiness {
            for warning in &report.warnings {
                println!("  {} {}", style("!").yellow(), warning);
            }
        }
        for entry in generated.clauses.warnings() {
            println!("  {} {}: {}", style("!").yellow(), entry.clause_id, entry.message);
        }
    }
    Ok(doc)
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let query = DocumentQuery {
        status: args.status,
        template_id: args.template,
        sort: args.sort,
        reverse: args.reverse,
        limit: args.limit,
        offset: args.offset,
    };
    let page = store.list_documents(&query);
    let docs = &page.documents;
    let format = effective_format(global, OutputFormat::Tsv);

    if docs.is_empty() {
        match format {
            OutputFormat::Json | OutputFormat::Yaml => println!("[]"),
            OutputFormat::Id => {}
            _ => {
                println!("No documents found.");
                println!();
                println!(
                    "Create one with: {}",
                    style("dilekce new <TEMPLATE>").yellow()
                );
            }
        }
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(docs).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(docs).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for doc in docs {
                println!("{}", doc.id);
            }
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer
                .write_record([
                    "id",
                    "title",
                    "template",
                    "status",
                    "completion",
                    "format",
                    "modified",
                ])
                .into_diagnostic()?;
            for doc in docs {
                writer
                    .write_record([
                        doc.id.to_string(),
                        doc.title.clone(),
                        doc.template_id.clone(),
                        doc.status.to_string(),
                        doc.completion_percentage.to_string(),
                        doc.output_format.to_string(),
                        doc.last_modified_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                    ])
                    .into_diagnostic()?;
            }
            writer.flush().into_diagnostic()?;
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["ID", "Title", "Template", "Status", "Done"]);
            for doc in docs {
                builder.push_record([
                    format_short_id(&doc.id),
                    doc.title.clone(),
                    doc.template_id.clone(),
                    doc.status.to_string(),
                    format!("{}%", doc.completion_percentage),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<16} {:<32} {:<18} {:<12} {:>5}  {:<16}",
                style("ID").bold(),
                style("TITLE").bold(),
                style("TEMPLATE").bold(),
                style("STATUS").bold(),
                style("DONE").bold(),
                style("MODIFIED").bold()
            );
            println!("{}", "-".repeat(106));
            for doc in docs {
                println!(
                    "{:<16} {:<32} {:<18} {:<12} {:>4}%  {:<16}",
                    format_short_id(&doc.id),
                    truncate_str(&doc.title, 30),
                    truncate_str(&doc.template_id, 18),
                    doc.status.to_string(),
                    doc.completion_percentage,
                    doc.last_modified_at.format("%Y-%m-%d %H:%M").to_string()
                );
            }
            println!();
            if docs.len() < page.total {
                println!(
                    "{} of {} document(s) shown",
                    style(docs.len()).cyan(),
                    style(page.total).cyan()
                );
            } else {
                println!("{} document(s) found", style(page.total).cyan());
            }
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let doc = store.load_document(&id).into_diagnostic()?;

    match effective_format(global, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&doc).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&doc).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", doc.id),
        _ => {
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("ID").bold(), style(&doc.id).cyan());
            println!("{}: {}", style("Title").bold(), style(&doc.title).yellow());
            println!("{}: {}", style("Template").bold(), doc.template_id);
            println!("{}: {}", style("Status").bold(), styled_status(doc.status));
            println!(
                "{}: {}% ({} of {} answered, {} required)",
                style("Progress").bold(),
                doc.completion_percentage,
                doc.questions_answered,
                doc.total_questions,
                doc.required_questions
            );
            println!("{}: {}", style("Format").bold(), doc.output_format);
            if let Some(ref case) = doc.case_number {
                println!("{}: {}", style("Case no").bold(), case);
            }
            if let Some(ref meta) = doc.metadata {
                if !meta.parties.is_empty() {
                    println!("{}: {}", style("Parties").bold(), meta.parties.join(" / "));
                }
            }
            println!("{}", style("─".repeat(60)).dim());

            match doc.generated_content {
                Some(ref content) if args.content => {
                    println!();
                    println!("{}", content);
                }
                Some(ref content) => {
                    println!(
                        "{} {} line(s) of generated text (use {} to print)",
                        style("•").cyan(),
                        content.lines().count(),
                        style("--content").yellow()
                    );
                }
                None => println!("{} Not generated yet", style("•").dim()),
            }

            println!("{}", style("─".repeat(60)).dim());
            let completed = doc
                .completed_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{}: {} | {}: {} | {}: {} | {}: {}",
                style("Started").dim(),
                doc.started_at.format("%Y-%m-%d %H:%M"),
                style("Modified").dim(),
                doc.last_modified_at.format("%Y-%m-%d %H:%M"),
                style("Completed").dim(),
                completed,
                style("Version").dim(),
                doc.document_version
            );
        }
    }
    Ok(())
}

fn run_status(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let before = store.load_document(&id).into_diagnostic()?.status;
    let doc = store.update_status(&id, args.status).into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} {} {} → {}",
            style("✓").green(),
            style(format_short_id(&doc.id)).cyan(),
            styled_status(before),
            styled_status(doc.status)
        );
    }
    Ok(())
}

fn run_archive(args: DocArg, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let doc = store.archive(&id).into_diagnostic()?;
    if !global.quiet {
        println!(
            "{} Archived {}",
            style("✓").green(),
            style(format_short_id(&doc.id)).cyan()
        );
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let doc = store.load_document(&id).into_diagnostic()?;

    if !args.yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete '{}' and all of its answers?", doc.title))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete(&id).into_diagnostic()?;
    if !global.quiet {
        println!(
            "{} Deleted {}",
            style("✓").green(),
            style(format_short_id(&id)).cyan()
        );
    }
    Ok(())
}

fn run_duplicate(args: DuplicateArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let copy = store
        .duplicate(&id, args.title.as_deref())
        .into_diagnostic()?;

    if global.format == OutputFormat::Id || global.quiet {
        println!("{}", copy.id);
    } else {
        println!(
            "{} Created {} \"{}\"",
            style("✓").green(),
            style(&copy.id).cyan(),
            copy.title
        );
    }
    Ok(())
}

fn run_generate(args: DocArg, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let doc = store.load_document(&id).into_diagnostic()?;
    let template = document_template(&store, &doc)?;
    generate_document(&store, &template, &id, global)?;
    Ok(())
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let doc = store.load_document(&id).into_diagnostic()?;
    let source = ExportSource::from_document(&doc).into_diagnostic()?;

    let formats: Vec<DocumentFormat> = match args.target {
        None => vec![doc.output_format],
        Some(ExportTarget::All) => DocumentFormat::all().to_vec(),
        Some(ExportTarget::Txt) => vec![DocumentFormat::Txt],
        Some(ExportTarget::Docx) => vec![DocumentFormat::Docx],
        Some(ExportTarget::Html) => vec![DocumentFormat::Html],
    };
    let dir = args
        .out
        .unwrap_or_else(|| config.export_dir(store.project()));

    let outcomes = export::export_all(&formats, &source, &dir);
    let mut failed = 0;
    for outcome in &outcomes {
        match outcome.result {
            Ok(ref path) => {
                if global.quiet {
                    continue;
                }
                println!(
                    "{} {:<5} {}",
                    style("✓").green(),
                    outcome.format.to_string(),
                    style(path.display()).cyan()
                );
            }
            Err(ref e) => {
                failed += 1;
                eprintln!("{} {:<5} {}", style("✗").red(), outcome.format.to_string(), e);
            }
        }
    }

    if failed > 0 {
        return Err(miette::miette!(
            "{} of {} export(s) failed",
            failed,
            outcomes.len()
        ));
    }
    Ok(())
}

fn run_backup(args: BackupArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let bundle = store.export_bundle(&id).into_diagnostic()?;

    let content = match global.format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&bundle).into_diagnostic()?;
            json.push('\n');
            json
        }
        _ => serde_yml::to_string(&bundle).into_diagnostic()?,
    };
    write_output(&content, args.out.as_deref())?;

    if let Some(path) = args.out {
        if !global.quiet {
            println!(
                "{} Backup written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
    }
    Ok(())
}

fn run_analytics(args: DocArg, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let analytics = store.analytics(&id).into_diagnostic()?;

    match effective_format(global, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&analytics).into_diagnostic()?
            );
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&analytics).into_diagnostic()?);
        }
        _ => {
            let minutes = analytics.total_time_spent_secs / 60;
            let seconds = analytics.total_time_spent_secs % 60;
            println!(
                "{} {}",
                style("Analytics for").bold(),
                style(format_short_id(&analytics.document_id)).cyan()
            );
            println!();
            println!("  {:<22} {}", "Template", analytics.template_id);
            println!("  {:<22} {}m {:02}s", "Time spent", minutes, seconds);
            println!("  {:<22} {}", "Questions answered", analytics.questions_answered);
            println!("  {:<22} {}", "Questions skipped", analytics.questions_skipped);
            println!("  {:<22} {}", "Back navigations", analytics.back_navigation_count);
            println!(
                "  {:<22} {}",
                "Validation errors", analytics.validation_error_count
            );
            if let Some(step) = analytics.abandoned_at_step {
                println!("  {:<22} {}", "Stopped at step", step + 1);
            }
            if let Some(done) = analytics.completion_date {
                println!("  {:<22} {}", "Completed", done.format("%Y-%m-%d %H:%M"));
            }
        }
    }
    Ok(())
}

fn run_check(args: DocArg, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let doc = store.load_document(&id).into_diagnostic()?;
    let template = document_template(&store, &doc)?;

    if template.document_type() != RENT_DISPUTE {
        return Err(miette::miette!(
            "No readiness review for template '{}' (only {})",
            template.id,
            RENT_DISPUTE
        ));
    }

    let answers = store.load_answers(&id).into_diagnostic()?;
    let bag = map_answers(&template, &answers, Utc::now().date_naive());
    let report = analyze_rent_dispute(&bag);

    match effective_format(global, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&report).into_diagnostic()?);
        }
        _ => {
            let mark = if report.is_ready() {
                style("✓").green()
            } else {
                style("✗").red()
            };
            println!(
                "{} {}% of critical fields answered",
                mark,
                report.completion_rate
            );
            if !report.missing_critical_fields.is_empty() {
                println!();
                println!("{}", style("Missing:").bold());
                for field in &report.missing_critical_fields {
                    println!("  • {}", field);
                }
            }
            if !report.warnings.is_empty() {
                println!();
                println!("{}", style("Warnings:").bold());
                for warning in &report.warnings {
                    println!("  {} {}", style("!").yellow(), warning);
                }
            }
            if !report.recommended_actions.is_empty() {
                println!();
                println!("{}", style("Recommended:").bold());
                for action in &report.recommended_actions {
                    println!("  → {}", action);
                }
            }
        }
    }
    Ok(())
}

fn run_clauses(args: DocArg, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let doc = store.load_document(&id).into_diagnostic()?;
    let template = document_template(&store, &doc)?;
    let generator = DocumentGenerator::new().into_diagnostic()?;
    let rules = generator
        .profile(template.document_type())
        .map(|p| p.clause_rules.as_slice())
        .unwrap_or_default();

    let answers = store.load_answers(&id).into_diagnostic()?;
    let bag = map_answers(&template, &answers, Utc::now().date_naive());
    let library = FileClauseRepository::for_project(store.project());
    let assembly = assemble_clauses(rules, &bag, &library);

    match effective_format(global, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&assembly).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&assembly).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for label in assembly.labels() {
                println!("{}", label);
            }
        }
        _ => {
            if rules.is_empty() {
                println!("No clause rules for template '{}'", template.id);
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["Rule", "Matched", "Clauses"]);
            for eval in &assembly.selection.evaluations {
                builder.push_record([
                    eval.rule_id.clone(),
                    if eval.matched { "yes" } else { "no" }.to_string(),
                    eval.clauses.join(", "),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));

            println!();
            if assembly.clauses.is_empty() {
                println!("{}", style("No clauses included").dim());
            }
            for clause in &assembly.clauses {
                println!(
                    "{} {} {} {}",
                    style("✓").green(),
                    style(&clause.clause_id).cyan(),
                    clause.version,
                    style(&clause.title).dim()
                );
            }
            for entry in assembly.warnings() {
                println!("{} {}: {}", style("!").yellow(), entry.clause_id, entry.message);
            }
        }
    }
    Ok(())
}
