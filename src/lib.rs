pub mod analyse;
pub mod candidates;
pub mod cli;
pub mod compare;
pub mod comparison;
pub mod comparison_set;
pub mod config;
pub mod definition;
pub mod error;
pub mod history;
pub mod report;
pub mod sample;
pub mod scorer;
pub mod source;
pub mod version;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug};

use crate::{
    cli::{Cli, Commands},
    version::{ClosestSorter, VersionId},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("field_sleuth", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyse(args) => analyse::execute(&args),
        Commands::Closest(args) => handle_closest(&args),
    }
}

fn handle_closest(args: &cli::ClosestArgs) -> Result<()> {
    let target: VersionId = args
        .target
        .parse()
        .with_context(|| format!("Parsing target build '{}'", args.target))?;
    let mut builds = args
        .builds
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .map(|b| {
            b.parse::<VersionId>()
                .with_context(|| format!("Parsing build '{b}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("Sorting {} build(s) by distance to {target}", builds.len());
    ClosestSorter::new(target).sort(&mut builds);
    for build in builds {
        println!("{build}");
    }
    Ok(())
}
