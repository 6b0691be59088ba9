//! Waymark CLI - work with wizard definitions from the command line
//!
//! # Commands
//! - `waymark check <definition>` - Validate a definition and summarize it
//! - `waymark schematic <definition>` - Export the route graph as JSON
//! - `waymark walk <definition> <steps>...` - Drive the engine through a scripted session

mod check;
mod config;
mod walk;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use waymark::prelude::*;
use waymark::Schematic;

/// Waymark wizard CLI
#[derive(Parser)]
#[command(name = "waymark")]
#[command(author, version, about = "Command-line interface for Waymark wizards")]
struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a definition and print a summary
    Check {
        /// Definition JSON file
        definition: PathBuf,

        /// Accept any events/validator names (they do nothing)
        #[arg(long)]
        stub_hooks: bool,
    },

    /// Export the route graph of a definition as JSON
    Schematic {
        /// Definition JSON file
        definition: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Accept any events/validator names (they do nothing)
        #[arg(long)]
        stub_hooks: bool,
    },

    /// Run a scripted session: next, prev, goto:<route>, set:<field>=<json>, index:<key>=<n>
    Walk {
        /// Definition JSON file
        definition: PathBuf,

        /// Steps to run, in order
        #[arg(required = true)]
        steps: Vec<String>,

        /// Initial data model (JSON)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Resume from a saved state (JSON)
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Write the final state here (JSON)
        #[arg(long)]
        save: Option<PathBuf>,

        /// TOML config with an [engine] table
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Keep going after a refused step
        #[arg(long)]
        keep_going: bool,

        /// Accept any events/validator names (they do nothing)
        #[arg(long)]
        stub_hooks: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match cli.command {
        Commands::Check {
            definition,
            stub_hooks,
        } => check::run_check_command(&definition, stub_hooks),
        Commands::Schematic {
            definition,
            output,
            stub_hooks,
        } => run_schematic_command(&definition, output.as_deref(), stub_hooks),
        Commands::Walk {
            definition,
            steps,
            data,
            state,
            save,
            config,
            keep_going,
            stub_hooks,
        } => walk::run_walk_command(walk::WalkArgs {
            definition,
            steps,
            data,
            state,
            save,
            config,
            keep_going,
            stub_hooks,
        }),
    }
}

/// Log to stderr; `WAYMARK_LOG` wins over `RUST_LOG`.
fn init_tracing(quiet: bool) {
    let filter = std::env::var("WAYMARK_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| {
            EnvFilter::new(if quiet {
                "warn"
            } else {
                "info,waymark_runtime=debug"
            })
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read and parse a definition file.
pub(crate) fn read_definition(path: &Path) -> Result<Definition> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read definition {}", path.display()))?;
    Definition::from_json(&json)
        .with_context(|| format!("{} is not a valid wizard definition", path.display()))
}

/// A registry that satisfies every name the definition mentions.
pub(crate) fn stub_registry(definition: &Definition) -> Registry {
    struct Inert;
    impl PageEvents for Inert {}

    let mut registry = Registry::new();
    for page in definition.sections.iter().flat_map(|s| s.pages.iter()) {
        if let Some(name) = &page.events {
            registry = registry.events(name.clone(), Inert);
        }
        if let Some(name) = &page.validator {
            tracing::warn!(page = %page.id, validator = %name, "Stubbed page validator always passes");
            registry = registry.validator_fn(name.clone(), |_| true);
        }
    }
    registry
}

pub(crate) fn registry_for(definition: &Definition, stub_hooks: bool) -> Registry {
    if stub_hooks {
        stub_registry(definition)
    } else {
        Registry::new()
    }
}

/// Export the route graph of a definition
fn run_schematic_command(path: &Path, output: Option<&Path>, stub_hooks: bool) -> Result<()> {
    let definition = read_definition(path)?;
    let registry = registry_for(&definition, stub_hooks);
    let model = build(&definition, &registry)?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wizard".to_string());
    let json = serde_json::to_string_pretty(&Schematic::from_model(name, &model))?;

    match output {
        Some(out) => {
            std::fs::write(out, json.as_bytes()).context("Failed to write output file")?;
            println!("Schematic saved to: {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
