//! `dilekce config` command - Configuration management

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde_yml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::helpers::open_project;
use crate::cli::GlobalOpts;
use crate::core::config::CONFIG_KEYS;
use crate::core::project::Project;
use crate::core::{Config, DocumentFormat};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (see `dilekce config keys`)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = Project::resolve(global.project.as_deref()).ok();
    let config = Config::load_for(project.as_ref());

    if let Some(key) = &args.key {
        check_key(key)?;
        return match config.get(key) {
            Some(value) => {
                println!("{}", value);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _) in CONFIG_KEYS {
        match config.get(key) {
            Some(v) => println!("  {}: {}", style(key).cyan(), style(v).yellow()),
            None => println!("  {}: {}", style(key).cyan(), style("(not set)").dim()),
        }
    }
    println!();
    println!(
        "  {}: {} {}",
        style("user").cyan(),
        config.user(),
        style("(resolved)").dim()
    );
    println!(
        "  {}: {}h {}",
        style("session_ttl").cyan(),
        config.session_ttl().num_hours(),
        style("(resolved)").dim()
    );

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (DILEKCE_USER, DILEKCE_AUTHOR, DILEKCE_FORMAT, ...)");
    println!("  2. Project config (.dilekce/config.yaml)");
    println!("  3. Global config (~/.config/dilekce/config.yaml)");
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    let value = typed_value(&args.key, &args.value)?;
    let path = config_path(args.global, global)?;

    let mut map = read_mapping(&path)?;
    map.insert(Value::String(args.key.clone()), value);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&map).into_diagnostic()?;
    fs::write(&path, yaml).into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} Set {} {} {} in {} config",
            style("✓").green(),
            style(&args.key).cyan(),
            style("→").dim(),
            style(&args.value).yellow(),
            scope(args.global)
        );
    }
    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    let path = config_path(args.global, global)?;
    if !path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            path.display()
        ));
    }

    let mut map = read_mapping(&path)?;
    if map.remove(Value::String(args.key.clone())).is_none() {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }
    let yaml = serde_yml::to_string(&map).into_diagnostic()?;
    fs::write(&path, yaml).into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} Removed {} from {} config",
            style("✓").green(),
            style(&args.key).cyan(),
            scope(args.global)
        );
    }
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    println!("{}", style("Configuration file paths:").bold());
    println!();

    match Config::global_config_path() {
        Some(path) => print_path("Global:", &path),
        None => println!(
            "  {} {}",
            style("Global:").cyan(),
            style("(no config directory)").dim()
        ),
    }

    match Project::resolve(global.project.as_deref()) {
        Ok(project) => print_path("Project:", &project.config_dir().join("config.yaml")),
        Err(_) => println!(
            "  {} {}",
            style("Project:").cyan(),
            style("(not in a dilekce project)").dim()
        ),
    }
    Ok(())
}

fn print_path(label: &str, path: &Path) {
    let state = if path.exists() {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("  {} {} {}", style(label).cyan(), path.display(), state);
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();
    for (key, description) in CONFIG_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }
    println!();
    println!(
        "{}",
        style("Use 'dilekce config set <key> <value>' to set a value.").dim()
    );
    Ok(())
}

fn scope(global: bool) -> &'static str {
    if global {
        "global"
    } else {
        "project"
    }
}

fn check_key(key: &str) -> Result<()> {
    if CONFIG_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            "Unknown config key '{}'. Run 'dilekce config keys' for the list",
            key
        ))
    }
}

/// YAML value for a key, rejecting values the loader would ignore
fn typed_value(key: &str, raw: &str) -> Result<Value> {
    match key {
        "session_ttl_hours" => {
            let hours: i64 = raw
                .trim()
                .parse()
                .map_err(|_| miette::miette!("session_ttl_hours must be a whole number"))?;
            if hours <= 0 {
                return Err(miette::miette!("session_ttl_hours must be positive"));
            }
            Ok(Value::Number(hours.into()))
        }
        "default_format" => {
            let format: DocumentFormat = raw.parse().map_err(|e: String| miette::miette!("{}", e))?;
            Ok(Value::String(format.to_string()))
        }
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn config_path(global_scope: bool, global: &GlobalOpts) -> Result<PathBuf> {
    if global_scope {
        Config::global_config_path()
            .ok_or_else(|| miette::miette!("Could not determine global config directory"))
    } else {
        Ok(open_project(global)?.config_dir().join("config.yaml"))
    }
}

fn read_mapping(path: &Path) -> Result<Mapping> {
    if !path.exists() {
        return Ok(Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<Value>(&content).into_diagnostic()? {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(miette::miette!(
            "{} is not a YAML mapping",
            path.display()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_value_ttl_is_number() {
        let v = typed_value("session_ttl_hours", "48").unwrap();
        assert_eq!(v.as_i64(), Some(48));
        assert!(typed_value("session_ttl_hours", "0").is_err());
        assert!(typed_value("session_ttl_hours", "uzun").is_err());
    }

    #[test]
    fn test_typed_value_checks_format() {
        assert_eq!(
            typed_value("default_format", "docx").unwrap().as_str(),
            Some("docx")
        );
        assert!(typed_value("default_format", "pdf").is_err());
    }

    #[test]
    fn test_check_key_rejects_unknown() {
        assert!(check_key("author").is_ok());
        assert!(check_key("editor").is_err());
    }
}
