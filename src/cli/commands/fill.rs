//! `dilekce fill` command - Add answers to an existing document

use chrono::Utc;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::doc::document_template;
use crate::cli::commands::new::{apply_answers, run_wizard};
use crate::cli::helpers::{open_store, read_answers_file, report_import};
use crate::cli::GlobalOpts;
use crate::core::DocumentStatus;

#[derive(clap::Args, Debug)]
pub struct FillArgs {
    /// Document id or a unique part of it
    pub doc: String,

    /// Merge answers from this file; without it the wizard resumes
    #[arg(long, short = 'a')]
    pub answers: Option<PathBuf>,
}

pub fn run(args: FillArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let id = store.resolve_id(&args.doc).into_diagnostic()?;
    let doc = store.load_document(&id).into_diagnostic()?;
    if doc.status == DocumentStatus::Archived {
        return Err(miette::miette!(
            "Document {} is archived; restore it with 'dilekce doc status {} draft' first",
            doc.id,
            doc.id
        ));
    }
    let template = document_template(&store, &doc)?;

    match args.answers {
        Some(path) => {
            let import = read_answers_file(&path, &template)?;
            report_import(&import)?;
            apply_answers(&store, &template, &id, import.answers, global)
        }
        None => {
            // A finished session restarts from the first step for review
            let start = store
                .load_session(&id, Utc::now())
                .into_diagnostic()?
                .filter(|s| !s.is_complete)
                .map(|s| s.current_step)
                .unwrap_or(0);
            let answers = store.load_answers(&id).into_diagnostic()?;
            run_wizard(&store, &template, &id, answers, start, global)
        }
    }
}
