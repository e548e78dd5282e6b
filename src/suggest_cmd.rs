use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{info, warn};

use crate::{
    cli::SuggestArgs,
    config::ReconcileConfig,
    io_utils,
    manifest::{RunManifest, SourceEntry},
    mapping::{SchemaMapper, Suggestion},
    output,
    report::Warning,
    source::{self, SourceOptions},
};

pub fn execute(args: &SuggestArgs) -> Result<()> {
    let config = ReconcileConfig::load_or_default(args.config.as_deref())?;
    if let Some(company) = &args.company {
        if config.company(company).is_none() {
            return Err(anyhow!("Unknown company '{company}'"));
        }
    }
    if args.manifest_out.is_some() && args.company.is_none() {
        return Err(anyhow!("--manifest-out requires --company"));
    }

    let options = SourceOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        sheet: args.sheet.clone(),
    };
    let mapper = SchemaMapper::new(config.match_threshold);
    let mut manifest = RunManifest::default();

    for input in &args.inputs {
        let name = display_name(input);
        let table = source::load(input, &name, &options)
            .with_context(|| format!("Loading source {input:?}"))?;
        info!(
            "Suggesting mappings for {} column(s) of '{}' (threshold {})",
            table.columns().len(),
            name,
            mapper.threshold()
        );
        let suggestions = mapper.suggest(table.columns());
        println!("{name}");
        print_suggestions(&suggestions);
        println!();

        let mapping = mapper.suggest_mapping(table.columns());
        let duplicates = mapping.duplicate_targets();
        if !duplicates.is_empty() {
            warn!(
                "{}; resolve before merging",
                Warning::ConflictingMapping {
                    source: name.clone(),
                    fields: duplicates,
                }
            );
        }

        if let Some(company) = &args.company {
            let mut entry = SourceEntry::new(manifest_path(input)?, company, mapping);
            entry.sheet = args.sheet.clone();
            entry.delimiter = args.delimiter.map(delimiter_name);
            entry.encoding = args.input_encoding.clone();
            manifest.sources.push(entry);
        }
    }

    if let Some(path) = &args.manifest_out {
        manifest.save(path)?;
        info!(
            "Manifest skeleton for {} source(s) written to {path:?}; review it before merging",
            manifest.sources.len()
        );
    }
    Ok(())
}

fn print_suggestions(suggestions: &[Suggestion]) {
    let headers = vec!["column".to_string(), "field".to_string(), "score".to_string()];
    let rows: Vec<Vec<String>> = suggestions
        .iter()
        .map(|suggestion| {
            vec![
                suggestion.column.clone(),
                suggestion
                    .field
                    .map(|field| field.name().to_string())
                    .unwrap_or_else(|| "-".to_string()),
                format!("{:.1}", suggestion.score),
            ]
        })
        .collect();
    output::print_table(&headers, &rows);
}

fn display_name(path: &Path) -> String {
    if io_utils::is_dash(path) {
        return "stdin".to_string();
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn manifest_path(input: &Path) -> Result<std::path::PathBuf> {
    if io_utils::is_dash(input) {
        return Err(anyhow!("Cannot write a manifest entry for stdin input"));
    }
    std::path::absolute(input).with_context(|| format!("Resolving {input:?}"))
}

fn delimiter_name(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "tab".to_string(),
        other => (other as char).to_string(),
    }
}
