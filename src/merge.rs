//! Concatenation of normalized sources into the single shared catalog table.

use itertools::Itertools;
use log::info;

use crate::{canonical::CanonicalField, data::CanonicalRecord, normalize::NormalizedSource};

/// The merged catalog. `columns` is the union of fields contributed by any
/// source, in canonical order; cells a source never supplied stay absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogTable {
    columns: Vec<CanonicalField>,
    records: Vec<CanonicalRecord>,
}

impl CatalogTable {
    pub fn new(columns: Vec<CanonicalField>, records: Vec<CanonicalRecord>) -> Self {
        let columns = columns.into_iter().sorted().dedup().collect();
        Self { columns, records }
    }

    pub fn columns(&self) -> &[CanonicalField] {
        &self.columns
    }

    pub fn has_column(&self, field: CanonicalField) -> bool {
        self.columns.contains(&field)
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut Vec<CanonicalRecord> {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|field| field.name().to_string())
            .collect()
    }

    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|record| record.display_cells(&self.columns))
            .collect()
    }
}

/// Merges sources in the order given; row order within each source is kept.
pub fn merge(sources: Vec<NormalizedSource>) -> CatalogTable {
    let source_count = sources.len();
    let columns = sources
        .iter()
        .flat_map(|source| source.columns.iter().copied())
        .collect::<Vec<_>>();
    let records = sources
        .into_iter()
        .flat_map(|source| source.records)
        .collect::<Vec<_>>();
    let table = CatalogTable::new(columns, records);
    info!(
        "Merged {} source(s) into {} row(s) across {} column(s)",
        source_count,
        table.len(),
        table.columns().len()
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, columns: Vec<CanonicalField>, isbns: &[&str]) -> NormalizedSource {
        NormalizedSource {
            source: name.to_string(),
            company: name.to_string(),
            columns,
            records: isbns
                .iter()
                .map(|isbn| CanonicalRecord::new().with(CanonicalField::Isbn, *isbn))
                .collect(),
            rows_in: isbns.len(),
            dropped_by_stock: 0,
        }
    }

    #[test]
    fn union_columns_follow_canonical_order() {
        let merged = merge(vec![
            source(
                "a",
                vec![CanonicalField::Price, CanonicalField::Isbn],
                &["1"],
            ),
            source(
                "b",
                vec![CanonicalField::Title, CanonicalField::Isbn],
                &["2", "3"],
            ),
        ]);
        assert_eq!(
            merged.columns(),
            [
                CanonicalField::Isbn,
                CanonicalField::Title,
                CanonicalField::Price
            ]
        );
        assert_eq!(merged.headers(), vec!["ISBN", "TITLE", "PRICE"]);
        let isbns: Vec<_> = merged
            .records()
            .iter()
            .map(|r| r.text(CanonicalField::Isbn).unwrap())
            .collect();
        assert_eq!(isbns, vec!["1", "2", "3"]);
    }

    #[test]
    fn missing_cells_render_empty() {
        let merged = merge(vec![
            source("a", vec![CanonicalField::Isbn, CanonicalField::Title], &["1"]),
        ]);
        assert_eq!(merged.display_rows(), vec![vec!["1".to_string(), String::new()]]);
    }

    #[test]
    fn merging_nothing_yields_empty_table() {
        let merged = merge(Vec::new());
        assert!(merged.is_empty());
        assert!(merged.columns().is_empty());
    }
}
