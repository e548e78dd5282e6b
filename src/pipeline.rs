//! The reconciliation pipeline: map → normalize → merge → clean → convert →
//! sort, strictly in that order, each stage taking the previous stage's full
//! output.
//!
//! Duplicate column assignments in any source block the run before anything
//! is merged; everything else degrades to a warning on the [`RunReport`].

use std::fmt;

use log::{debug, info};
use thiserror::Error;

use crate::{
    clean::Cleaner,
    config::{ConfigError, ReconcileConfig},
    currency::{CurrencyConverter, RateProvider},
    mapping::{ColumnMapping, MappingError, ValidatedMapping},
    merge::{CatalogTable, merge},
    normalize::{NormalizeOutcome, normalize_source},
    report::{RunReport, SourceSummary, Warning},
    sort::PrioritySorter,
    source::SourceTable,
};

/// A loaded source paired with its reviewed mapping and chosen supplier.
#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub table: SourceTable,
    pub mapping: ColumnMapping,
    pub company: String,
}

impl PreparedSource {
    pub fn new(table: SourceTable, mapping: ColumnMapping, company: impl Into<String>) -> Self {
        Self {
            table,
            mapping,
            company: company.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConflict {
    pub source: String,
    pub error: MappingError,
}

impl SourceConflict {
    /// The warning form of a duplicate assignment, if that is what this is.
    pub fn as_warning(&self) -> Option<Warning> {
        match &self.error {
            MappingError::DuplicateAssignment { fields } => Some(Warning::ConflictingMapping {
                source: self.source.clone(),
                fields: fields.clone(),
            }),
            MappingError::UnknownColumn { .. } => None,
        }
    }
}

impl fmt::Display for SourceConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source '{source_name}' is assigned to unknown company '{company}'")]
    UnknownCompany {
        source_name: String,
        company: String,
    },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug)]
pub enum PipelineOutcome {
    /// At least one source has an unresolved mapping; nothing was merged.
    Blocked(Vec<SourceConflict>),
    /// The run finished but produced no rows.
    Empty(RunReport),
    Completed {
        table: CatalogTable,
        report: RunReport,
    },
}

pub struct Pipeline<'a, P> {
    config: &'a ReconcileConfig,
    converter: CurrencyConverter<P>,
}

impl<'a, P: RateProvider> Pipeline<'a, P> {
    pub fn new(config: &'a ReconcileConfig, provider: P) -> Self {
        Self {
            config,
            converter: CurrencyConverter::from_config(config, provider),
        }
    }

    /// Runs every stage once. Consuming `self` keeps currency conversion to a
    /// single pass per run.
    pub fn run(mut self, sources: Vec<PreparedSource>) -> Result<PipelineOutcome, PipelineError> {
        self.config.validate()?;

        let mut resolved: Vec<(PreparedSource, ValidatedMapping)> = Vec::with_capacity(sources.len());
        let mut conflicts = Vec::new();
        for source in sources {
            if self.config.company(&source.company).is_none() {
                return Err(PipelineError::UnknownCompany {
                    source_name: source.table.name().to_string(),
                    company: source.company,
                });
            }
            match source.mapping.resolve(source.table.columns()) {
                Ok(mapping) => resolved.push((source, mapping)),
                Err(error) => conflicts.push(SourceConflict {
                    source: source.table.name().to_string(),
                    error,
                }),
            }
        }
        if !conflicts.is_empty() {
            debug!("{} source(s) blocked on their mapping", conflicts.len());
            return Ok(PipelineOutcome::Blocked(conflicts));
        }

        let mut report = RunReport::default();
        let mut normalized = Vec::new();
        for (source, mapping) in &resolved {
            let Some(company) = self.config.company(&source.company) else {
                continue;
            };
            report.stages.loaded += source.table.row_count();
            match normalize_source(&source.table, mapping, company) {
                NormalizeOutcome::Normalized(result) => {
                    report.sources.push(SourceSummary {
                        source: result.source.clone(),
                        company: result.company.clone(),
                        rows_in: result.rows_in,
                        rows_out: result.records.len(),
                        dropped_by_stock: result.dropped_by_stock,
                        skipped: false,
                    });
                    report.stages.normalized += result.records.len();
                    normalized.push(result);
                }
                NormalizeOutcome::Skipped { source: name } => {
                    report.sources.push(SourceSummary {
                        source: name.clone(),
                        company: company.name.clone(),
                        rows_in: source.table.row_count(),
                        skipped: true,
                        ..SourceSummary::default()
                    });
                    report.warn(Warning::SkippedSource { source: name });
                }
            }
        }

        if normalized.is_empty() {
            report.warn(Warning::EmptyResult);
            return Ok(PipelineOutcome::Empty(report));
        }

        let mut table = merge(normalized);
        report.stages.merged = table.len();

        let cleaned = Cleaner::new(self.config.strictness).clean(&mut table);
        report.stages.deduplicated = cleaned.rows_in - cleaned.duplicates_removed;
        report.stages.validated = cleaned.rows_out();
        if table.is_empty() {
            report.warn(Warning::EmptyResult);
            return Ok(PipelineOutcome::Empty(report));
        }

        let conversion = self.converter.convert(&mut table);
        for code in &conversion.unresolved {
            report.warn(Warning::UnresolvedCurrency { code: code.clone() });
        }
        for code in &conversion.overflowed {
            report.warn(Warning::PriceOverflow { code: code.clone() });
        }
        report.rates = conversion.rates;

        PrioritySorter::new(&self.config.priority).sort(&mut table);
        report.stages.output = table.len();

        info!(
            "Reconciled {} source(s) into {} row(s) in base currency {}",
            report.sources.iter().filter(|s| !s.skipped).count(),
            table.len(),
            self.converter.base()
        );
        report.log_summary();
        Ok(PipelineOutcome::Completed { table, report })
    }
}
