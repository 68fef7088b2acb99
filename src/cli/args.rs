//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    clause::ClauseCommands, completions::CompletionsArgs, config::ConfigCommands, doc::DocCommands,
    fill::FillArgs, init::InitArgs, new::NewArgs, session::SessionCommands,
    template::TemplateCommands, validate::ValidateArgs,
};

#[derive(Parser)]
#[command(name = "dilekce")]
#[command(author, version, about = "Wizard-driven Turkish legal document toolkit")]
#[command(long_about = "Answer a step-by-step wizard, keep the answers as plain YAML records, and \
generate petitions and contracts as text, Word or printable HTML.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .dilekce/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new dilekce project
    Init(InitArgs),

    /// Browse and check wizard templates
    #[command(subcommand)]
    Template(TemplateCommands),

    /// Start a new document from a template
    New(NewArgs),

    /// Add answers to a document, from a file or by resuming the wizard
    Fill(FillArgs),

    /// Validate an answers file against a template
    Validate(ValidateArgs),

    /// Manage documents (list, status, generate, export, ...)
    #[command(subcommand)]
    Doc(DocCommands),

    /// Inspect and clean up wizard sessions
    #[command(subcommand)]
    Session(SessionCommands),

    /// Clause version control
    #[command(subcommand)]
    Clause(ClauseCommands),

    /// View and modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (human text for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}
