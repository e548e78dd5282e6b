pub mod canonical;
pub mod clean;
pub mod cli;
pub mod config;
pub mod currency;
pub mod data;
pub mod io_utils;
pub mod manifest;
pub mod mapping;
pub mod merge;
mod merge_cmd;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod sort;
pub mod source;
mod suggest_cmd;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    config::ReconcileConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("catalog_reconcile", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Suggest(args) => suggest_cmd::execute(&args),
        Commands::Merge(args) => merge_cmd::execute(&args),
        Commands::Companies(args) => handle_companies(&args),
        Commands::Config(args) => handle_config(&args),
    }
}

fn handle_companies(args: &cli::CompaniesArgs) -> Result<()> {
    let config = ReconcileConfig::load_or_default(args.config.as_deref())?;
    let headers = ["company", "handling", "min_stock", "priority"]
        .map(String::from)
        .to_vec();
    let rows: Vec<Vec<String>> = config
        .companies
        .iter()
        .map(|company| {
            vec![
                company.name.clone(),
                company.handling.clone(),
                company.min_stock.to_string(),
                config
                    .priority_rank(&company.name)
                    .map(|rank| (rank + 1).to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    output::print_table(&headers, &rows);
    Ok(())
}

fn handle_config(args: &cli::ConfigArgs) -> Result<()> {
    let config = ReconcileConfig::default();
    config
        .save(&args.output)
        .with_context(|| format!("Writing default configuration to {:?}", args.output))?;
    info!(
        "Default configuration for {} company(ies) written to {:?}",
        config.companies.len(),
        args.output
    );
    Ok(())
}
