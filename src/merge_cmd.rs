use anyhow::{Context, Result, anyhow};
use log::{error, info, warn};

use crate::{
    cli::MergeArgs,
    config::ReconcileConfig,
    currency::StaticRateProvider,
    io_utils,
    manifest::RunManifest,
    output,
    pipeline::{Pipeline, PipelineOutcome, PreparedSource},
    report::RunReport,
};

pub fn execute(args: &MergeArgs) -> Result<()> {
    let mut config = ReconcileConfig::load_or_default(args.config.as_deref())?;
    if let Some(strictness) = args.strictness() {
        config.strictness = strictness;
    }
    if let Some(base) = &args.base_currency {
        config
            .rebase(base)
            .with_context(|| format!("Switching base currency to '{base}'"))?;
    }

    let manifest = RunManifest::load(&args.manifest)?;
    let base_dir = RunManifest::base_dir(&args.manifest);
    info!(
        "Merging {} source(s) from {:?} ({:?}, base currency {})",
        manifest.sources.len(),
        args.manifest,
        config.strictness,
        config.base_currency
    );

    let mut prepared = Vec::with_capacity(manifest.sources.len());
    for entry in &manifest.sources {
        let table = entry.load_table(&base_dir)?;
        prepared.push(PreparedSource::new(
            table,
            entry.mapping.clone(),
            entry.company.clone(),
        ));
    }

    let provider = StaticRateProvider::from_config(&config);
    match Pipeline::new(&config, provider).run(prepared)? {
        PipelineOutcome::Blocked(conflicts) => {
            for conflict in &conflicts {
                match conflict.as_warning() {
                    Some(warning) => error!("{warning}"),
                    None => error!("{conflict}"),
                }
            }
            Err(anyhow!(
                "Merge blocked: {} source(s) need their mapping corrected in {:?}",
                conflicts.len(),
                args.manifest
            ))
        }
        PipelineOutcome::Empty(report) => {
            write_report(args, &report)?;
            warn!("Nothing to write; every row was skipped or filtered out");
            Ok(())
        }
        PipelineOutcome::Completed { table, report } => {
            if args.table {
                output::print_table(&table.headers(), &table.display_rows());
            } else {
                let delimiter =
                    io_utils::resolve_output_delimiter(args.output.as_deref(), args.output_delimiter);
                output::write_table(args.output.as_deref(), delimiter, &table)
                    .context("Writing merged catalog")?;
            }
            write_report(args, &report)
        }
    }
}

fn write_report(args: &MergeArgs, report: &RunReport) -> Result<()> {
    if let Some(path) = &args.report {
        report.save_json(path)?;
        info!("Run report written to {path:?}");
    }
    Ok(())
}
