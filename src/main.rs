use clap::Parser;
use miette::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dilekce::cli::commands::{
    clause, completions, config, doc, fill, init, new, session, template, validate,
};
use dilekce::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Terminate quietly when piped into `head` and friends
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    let default_level = if global.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("DILEKCE_LOG")
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();

    match cli.command {
        Commands::Init(args) => init::run(args),
        Commands::Template(cmd) => template::run(cmd, &global),
        Commands::New(args) => new::run(args, &global),
        Commands::Fill(args) => fill::run(args, &global),
        Commands::Validate(args) => validate::run(args, &global),
        Commands::Doc(cmd) => doc::run(cmd, &global),
        Commands::Session(cmd) => session::run(cmd, &global),
        Commands::Clause(cmd) => clause::run(cmd, &global),
        Commands::Config(cmd) => config::run(cmd, &global),
        Commands::Completions(args) => completions::run(args),
    }
}
