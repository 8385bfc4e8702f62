//! CLI for planning schema changes.
//!
//! Provides commands for:
//! - Rendering the DDL plan of a recorded edit session
//! - Listing inherited attribute name conflicts
//! - Checking the inheritance graph of a catalog file

mod session_file;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use schema_planner_core::catalog::load_catalog;
use schema_planner_core::PlannerConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use session_file::{check_catalog, SessionFile};

/// Command-line arguments for the schema tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Planner configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log planner decisions; RUST_LOG takes precedence
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the statements that apply a session
    Plan {
        /// Session file
        #[arg(long)]
        session: PathBuf,

        /// Statement terminator, overriding the configuration
        #[arg(long)]
        delimiter: Option<String>,

        /// Print statements and admin requests as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the column conflicts of the edited class
    Conflicts {
        /// Session file
        #[arg(long)]
        session: PathBuf,
    },
    /// Check every class of a catalog for broken inheritance
    Check {
        /// Catalog file
        #[arg(long)]
        catalog: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PlannerConfig> {
    let Some(path) = path else {
        return Ok(PlannerConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let mut config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Plan {
            session,
            delimiter,
            json,
        } => {
            if let Some(delimiter) = delimiter {
                config.delimiter = delimiter;
            }
            let file = SessionFile::load(&session)?;
            let plan = file
                .plan(&config)
                .with_context(|| format!("Cannot plan changes to '{}'", file.new.class_name))?;
            if json {
                let summary = plan.summary(&config.delimiter);
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", plan.render_with(&config.delimiter, &config.newline));
                for request in &plan.admin_requests {
                    println!("-- admin: {}", serde_json::to_string(request)?);
                }
            }
            info!(
                statements = plan.statements.len(),
                admin_requests = plan.admin_requests.len(),
                "Plan printed"
            );
        }
        Command::Conflicts { session } => {
            let file = SessionFile::load(&session)?;
            let report = file
                .conflicts()
                .with_context(|| format!("Cannot compute conflicts of '{}'", file.new.class_name))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Check { catalog } => {
            let loaded = load_catalog(&catalog)
                .with_context(|| format!("Cannot load catalog {}", catalog.display()))?;
            let failures = check_catalog(&loaded);
            for (class, error) in &failures {
                println!("{}: {}", class, error);
            }
            if !failures.is_empty() {
                bail!("{} of {} classes have broken inheritance", failures.len(), loaded.len());
            }
            println!("{} classes checked", loaded.len());
        }
    }
    Ok(())
}
