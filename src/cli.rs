use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::COMPARISON_LIMIT;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Recover unnamed schema fields from sampled data",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Score unnamed fields against neighbouring revisions and rename or annotate them
    Analyse(AnalyseArgs),
    /// Order builds by distance to a target build
    Closest(ClosestArgs),
}

#[derive(Debug, Args)]
pub struct AnalyseArgs {
    /// Directory holding definition files (.yaml/.yml)
    #[arg(short = 'd', long = "definitions")]
    pub definitions: PathBuf,
    /// Directory holding samples as <name>/<build>.csv
    #[arg(short = 's', long = "samples")]
    pub samples: PathBuf,
    /// Analyse every definition for this build (e.g. 9.0.1.33978)
    #[arg(short = 'b', long = "build", conflicts_with = "changes")]
    pub build: Option<String>,
    /// JSON change set listing touched definitions and their patches
    #[arg(short = 'c', long = "changes")]
    pub changes: Option<PathBuf>,
    /// Maximum number of shared records compared per column pair
    #[arg(long = "comparison-limit", default_value_t = COMPARISON_LIMIT)]
    pub comparison_limit: usize,
    /// Character encoding of the sample files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Report results without writing definitions back
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Append the run report to this log file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ClosestArgs {
    /// Build to measure distance from
    #[arg(short = 't', long = "target")]
    pub target: String,
    /// Candidate builds
    #[arg(required = true, value_delimiter = ',')]
    pub builds: Vec<String>,
}
