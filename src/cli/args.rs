//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, init::InitArgs, inv::InvCommands, mat::MatCommands,
    sup::SupCommands,
};
use crate::core::{Project, ProjectError};

#[derive(Parser)]
#[command(name = "kbt")]
#[command(author, version, about = "Kwast Business Toolkit")]
#[command(
    long_about = "A Unix-style toolkit for managing a painting contractor's business records - suppliers, materials and invoices - as plain text files under git version control."
)]
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

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .kbt/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

impl GlobalOpts {
    /// Resolve the project: from `--project` when given, otherwise by
    /// walking up from the current directory
    pub fn resolve_project(&self) -> Result<Project, ProjectError> {
        match &self.project {
            Some(path) => Project::discover_from(path),
            None => Project::discover(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new KBT project
    Init(InitArgs),

    /// Supplier management (vendors, duplicates, consolidation)
    #[command(subcommand)]
    Sup(SupCommands),

    /// Material management (paint, primer, tools)
    #[command(subcommand)]
    Mat(MatCommands),

    /// Invoice management (purchase invoices, CSV import)
    #[command(subcommand)]
    Inv(InvCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
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
