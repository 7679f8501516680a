//! Kiln CLI — inspection tooling for the Kiln compilation engine.
//!
//! Provides `kiln plan` to dry-run the batch plan a build pass would produce
//! for a virtual path, and `kiln classify` to show how a path classifies and
//! which provider would build it.

#![warn(missing_docs)]

mod classify;
mod plan;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Kiln — an on-demand build cache for template sites.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln build cache tooling")]
pub struct Cli {
    /// Suppress all output except errors and the report itself.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Site root directory containing `kiln.toml`.
    #[arg(long, global = true, default_value = ".")]
    pub root: String,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the batch plan a build of a virtual path would compile.
    Plan(PlanArgs),
    /// Show how a virtual path classifies.
    Classify(ClassifyArgs),
}

/// Arguments for the `kiln plan` subcommand.
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// The virtual path to plan a build for (e.g. `/site/index.page`).
    pub path: String,

    /// Output format for the report.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `kiln classify` subcommand.
#[derive(Parser, Debug)]
pub struct ClassifyArgs {
    /// The virtual path to classify.
    pub path: String,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text.
    Text,
    /// Machine-readable JSON.
    Json,
}

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Plan(args) => plan::run(args, &cli),
        Command::Classify(args) => classify::run(args, &cli),
    };

    let code = match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    };
    process::exit(code);
}
