use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use dqa_core::findings::Severity;
use dqa_core::split::Split;

#[derive(Debug, Parser)]
#[command(
    name = "dqa",
    version,
    about = "Deterministic quality audit for labeled image datasets"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index a dataset, run every enabled check and write artifacts
    Audit(AuditArgs),
    /// Compare the findings of two runs by fingerprint
    Diff(DiffArgs),
    /// Summarize a finished run and suggest next actions
    Explain(ExplainArgs),
}

#[derive(Debug, ClapArgs)]
pub struct AuditArgs {
    /// Path to the dataset's data.yaml
    #[arg(long)]
    pub data: PathBuf,

    /// Directory for index.json, flags.json and summary.json
    #[arg(long)]
    pub out: PathBuf,

    /// Audit config (YAML); defaults apply when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Comma-separated splits to audit (default: all declared)
    #[arg(long, value_delimiter = ',')]
    pub splits: Vec<Split>,

    /// Hashing worker threads; 0 picks one per core
    #[arg(long, default_value_t = 0)]
    pub workers: usize,

    /// Index at most this many images after ordering; 0 is unlimited
    #[arg(long, default_value_t = 0)]
    pub max_images: usize,

    /// Enable the near-duplicate check
    #[arg(long)]
    pub near_dup: bool,

    /// Override the gate threshold
    #[arg(long)]
    pub fail_on: Option<Severity>,

    /// Ignore the previous run's index in --out
    #[arg(long)]
    pub no_cache: bool,

    /// Output format for stdout
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,
}

#[derive(Debug, ClapArgs)]
pub struct DiffArgs {
    /// Earlier run directory or flags.json
    #[arg(long)]
    pub old: PathBuf,

    /// Later run directory or flags.json
    #[arg(long)]
    pub new: PathBuf,

    /// Lowest severity of a new finding that counts as a regression
    #[arg(long, default_value = "high")]
    pub fail_on_regression: Severity,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, ClapArgs)]
pub struct ExplainArgs {
    /// Run directory holding summary.json and flags.json
    #[arg(long)]
    pub run: PathBuf,

    /// How many finding ids to list
    #[arg(long, default_value_t = 5)]
    pub top: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
