//! archgate CLI tool.
//!
//! Usage:
//! ```bash
//! archgate check [OPTIONS] [PATH]
//! archgate snapshot save [PATH] [--ref REF]
//! archgate snapshot diff [PATH] --from A --to B [--details]
//! archgate baseline create [PATH] [--ref REF]
//! archgate list-rules [PATH]
//! archgate init
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use archgate::snapshot::SnapshotRef;
use archgate::{ArchError, EngineError};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Architecture conformance checks over dependency graphs
#[derive(Parser)]
#[command(name = "archgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate rules against the current graph
    Check {
        /// Project root (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Rule files or directories, replacing the configured ones
        #[arg(long = "rules", value_name = "FILE")]
        rules: Vec<PathBuf>,

        /// Baseline ref to compare against
        #[arg(long, value_name = "REF")]
        baseline: Option<SnapshotRef>,

        /// Save the checked graph under this ref
        #[arg(long, value_name = "REF")]
        save_ref: Option<SnapshotRef>,
    },

    /// Save or compare graph snapshots
    #[command(subcommand)]
    Snapshot(SnapshotCommand),

    /// Manage the accepted-violations baseline
    #[command(subcommand)]
    Baseline(BaselineCommand),

    /// List the rules that would be evaluated
    ListRules {
        /// Project root (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Initialize configuration and rule files
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum SnapshotCommand {
    /// Build the graph and store it
    Save {
        /// Project root (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Ref to store under
        #[arg(long = "ref", default_value = SnapshotRef::LATEST)]
        reference: SnapshotRef,
    },

    /// Compare two stored snapshots
    Diff {
        /// Project root (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Earlier snapshot
        #[arg(long)]
        from: SnapshotRef,

        /// Later snapshot
        #[arg(long)]
        to: SnapshotRef,

        /// List individual changes
        #[arg(long)]
        details: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum BaselineCommand {
    /// Record the current violations as accepted
    Create {
        /// Project root (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Ref to store under
        #[arg(long = "ref", default_value = SnapshotRef::BASELINE)]
        reference: SnapshotRef,
    },
}

/// Output format for reports.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let explicit = cli.config.as_deref();
    match cli.command {
        Commands::Check {
            path,
            format,
            rules,
            baseline,
            save_ref,
        } => {
            let options = commands::check::CheckOptions {
                format,
                rules,
                baseline,
                save_ref,
            };
            commands::check::run(&path, explicit, options)
        }
        Commands::Snapshot(SnapshotCommand::Save { path, reference }) => {
            commands::snapshot::save(&path, explicit, &reference)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Snapshot(SnapshotCommand::Diff {
            path,
            from,
            to,
            details,
            format,
        }) => {
            commands::snapshot::diff(&path, explicit, &from, &to, details, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Baseline(BaselineCommand::Create { path, reference }) => {
            commands::baseline::create(&path, explicit, &reference)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::ListRules { path } => {
            commands::list_rules::run(&path, explicit)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { force } => {
            commands::init::run(std::path::Path::new("."), force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Core errors get a miette diagnostic with their code; everything else
/// prints its context chain.
fn report_error(err: &anyhow::Error) {
    let arch = err.chain().find_map(|e| {
        e.downcast_ref::<EngineError>()
            .and_then(EngineError::arch_error)
            .or_else(|| e.downcast_ref::<ArchError>())
    });
    if let Some(arch) = arch {
        eprintln!("{:?}", miette::Report::new(arch.clone()));
    } else {
        eprintln!("Error: {err:#}");
    }
}
