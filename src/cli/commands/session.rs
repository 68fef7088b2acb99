//! `dilekce session` command - Wizard sessions

use chrono::Utc;
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{effective_format, format_short_id, open_store};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Show the live wizard session of a document
    Show(ShowArgs),

    /// Delete your expired sessions
    Cleanup,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Document id or a unique part of it
    pub doc: String,
}

pub fn run(cmd: SessionCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SessionCommands::Show(args) => run_show(args, global),
        SessionCommands::Cleanup => run_cleanup(global),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let Some(session) = store.load_session(&id, Utc::now()).into_diagnostic()? else {
        return Err(miette::miette!(
            "No active session for {} (never started or expired)",
            format_short_id(&id)
        ));
    };

    match effective_format(global, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&session).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&session).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", session.id),
        _ => {
            println!(
                "{} {}",
                style("Session").bold(),
                style(&session.id).cyan()
            );
            println!();
            println!("  {:<20} {}", "Document", session.document_id);
            println!("  {:<20} {}", "Current step", session.current_step + 1);
            println!("  {:<20} {}%", "Completion", session.completion_percentage);
            println!(
                "  {:<20} {} of {} seen",
                "Questions",
                session.completed_questions.len(),
                session.visible_questions.len()
            );
            println!(
                "  {:<20} {}",
                "Complete",
                if session.is_complete { "yes" } else { "no" }
            );
            println!(
                "  {:<20} {}",
                "Last activity",
                session.last_activity_at.format("%Y-%m-%d %H:%M")
            );
            println!(
                "  {:<20} {}",
                "Expires",
                session.expires_at.format("%Y-%m-%d %H:%M")
            );

            if !session.validation_errors.is_empty() {
                println!();
                println!("{}", style("Open validation errors:").bold());
                for (field, messages) in &session.validation_errors {
                    for message in messages {
                        println!("  {} {}: {}", style("✗").red(), field, message);
                    }
                }
            }
        }
    }
    Ok(())
}

fn run_cleanup(global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let removed = store
        .cleanup_expired_sessions(Utc::now())
        .into_diagnostic()?;
    if !global.quiet {
        println!(
            "{} Removed {} expired session(s)",
            style("✓").green(),
            style(removed).cyan()
        );
    }
    Ok(())
}
