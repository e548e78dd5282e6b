//! Non-fatal warning events and the per-run summary.

use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::canonical::CanonicalField;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The source had no mapped columns and was left out of the merge.
    SkippedSource { source: String },
    /// No rate could be resolved; prices in this code were kept as-is.
    UnresolvedCurrency { code: String },
    /// Converting a price in this code overflowed; the PRICE cell was cleared.
    PriceOverflow { code: String },
    /// More than one column targets the same canonical field.
    ConflictingMapping {
        source: String,
        fields: Vec<CanonicalField>,
    },
    /// Every row was skipped or filtered out.
    EmptyResult,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SkippedSource { source } => {
                write!(f, "no columns mapped for '{source}'; source skipped")
            }
            Warning::UnresolvedCurrency { code } => {
                write!(f, "no exchange rate for '{code}'; prices left unscaled")
            }
            Warning::PriceOverflow { code } => {
                write!(f, "price in '{code}' too large to convert; PRICE cleared")
            }
            Warning::ConflictingMapping { source, fields } => write!(
                f,
                "duplicate assignment in '{source}': {}",
                fields.iter().map(|field| field.name()).join(", ")
            ),
            Warning::EmptyResult => f.write_str("no rows left to output"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub company: String,
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_by_stock: usize,
    pub skipped: bool,
}

/// Row counts after each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub loaded: usize,
    pub normalized: usize,
    pub merged: usize,
    pub deduplicated: usize,
    pub validated: usize,
    pub output: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub sources: Vec<SourceSummary>,
    pub stages: StageCounts,
    pub rates: BTreeMap<String, Decimal>,
    pub warnings: Vec<Warning>,
}

impl RunReport {
    pub fn warn(&mut self, warning: Warning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating report {path:?}"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).context("Writing run report")?;
        writer.flush().context("Flushing run report")
    }

    pub fn log_summary(&self) {
        let stages = &self.stages;
        info!(
            "Rows: loaded {} -> normalized {} -> merged {} -> deduplicated {} -> validated {} -> output {}",
            stages.loaded,
            stages.normalized,
            stages.merged,
            stages.deduplicated,
            stages.validated,
            stages.output
        );
        for source in &self.sources {
            if source.skipped {
                info!("  {} ({}): skipped", source.source, source.company);
            } else {
                info!(
                    "  {} ({}): {} of {} row(s) kept, {} below minimum stock",
                    source.source,
                    source.company,
                    source.rows_out,
                    source.rows_in,
                    source.dropped_by_stock
                );
            }
        }
        if !self.warnings.is_empty() {
            info!("{} warning(s) raised during the run", self.warnings.len());
        }
    }
}
