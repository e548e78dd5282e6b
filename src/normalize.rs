//! Per-source normalization: rename to canonical fields, apply the supplier's
//! stock threshold, and stamp supplier identity.

use log::debug;
use rust_decimal::Decimal;

use crate::{
    canonical::CanonicalField,
    config::CompanyProfile,
    data::{CanonicalRecord, Value, coerce_cell},
    mapping::ValidatedMapping,
    source::SourceTable,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSource {
    pub source: String,
    pub company: String,
    /// Canonical fields populated by this source, in canonical order.
    pub columns: Vec<CanonicalField>,
    pub records: Vec<CanonicalRecord>,
    pub rows_in: usize,
    pub dropped_by_stock: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    Normalized(NormalizedSource),
    /// No column was mapped; the source contributes nothing.
    Skipped { source: String },
}

pub fn normalize_source(
    table: &SourceTable,
    mapping: &ValidatedMapping,
    company: &CompanyProfile,
) -> NormalizeOutcome {
    if mapping.is_empty() {
        return NormalizeOutcome::Skipped {
            source: table.name().to_string(),
        };
    }

    let filter_stock = mapping.contains(CanonicalField::Stock);
    let min_stock = Decimal::from(company.min_stock);
    let mut dropped_by_stock = 0usize;
    let mut records = Vec::with_capacity(table.row_count());

    for row in table.rows() {
        let mut record = CanonicalRecord::new();
        for bound in mapping.columns() {
            let raw = row.get(bound.index).map(String::as_str).unwrap_or("");
            record.set(bound.field, Value::from_raw(raw));
        }

        if filter_stock {
            let stock = coerce_cell(record.take(CanonicalField::Stock));
            let meets_threshold = stock
                .as_ref()
                .and_then(Value::as_number)
                .is_some_and(|qty| qty >= min_stock);
            if !meets_threshold {
                dropped_by_stock += 1;
                continue;
            }
            record.set(CanonicalField::Stock, stock);
        }

        record.set(
            CanonicalField::Company,
            Some(Value::Text(company.name.clone())),
        );
        record.set(
            CanonicalField::Handling,
            Some(Value::Text(company.handling.clone())),
        );
        records.push(record);
    }

    let mut columns: Vec<CanonicalField> = mapping
        .columns()
        .iter()
        .map(|bound| bound.field)
        .chain(CanonicalField::ALL.into_iter().filter(|f| f.is_stamped()))
        .collect();
    columns.sort();
    columns.dedup();

    debug!(
        "Normalized '{}' as {}: {} of {} row(s) kept ({} below minimum stock {})",
        table.name(),
        company.name,
        records.len(),
        table.row_count(),
        dropped_by_stock,
        company.min_stock
    );

    NormalizeOutcome::Normalized(NormalizedSource {
        source: table.name().to_string(),
        company: company.name.clone(),
        columns,
        records,
        rows_in: table.row_count(),
        dropped_by_stock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ColumnMapping;

    fn table(columns: &[&str], rows: &[&[&str]]) -> SourceTable {
        SourceTable::new(
            "supplier.csv",
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn normalized(outcome: NormalizeOutcome) -> NormalizedSource {
        match outcome {
            NormalizeOutcome::Normalized(source) => source,
            other => panic!("expected normalized source, got {other:?}"),
        }
    }

    #[test]
    fn stock_threshold_is_inclusive_and_drops_non_numeric() {
        let table = table(
            &["ISBN", "Book Title", "Qty"],
            &[
                &["1", "A", "5"],
                &["2", "B", "12"],
                &["3", "C", "10"],
                &["4", "D", "lots"],
                &["5", "E", ""],
            ],
        );
        let mapping = ColumnMapping::from_pairs([
            ("ISBN", Some(CanonicalField::Isbn)),
            ("Book Title", Some(CanonicalField::Title)),
            ("Qty", Some(CanonicalField::Stock)),
        ])
        .resolve(table.columns())
        .unwrap();
        let company = CompanyProfile::new("Adarsh", "2", 10);

        let source = normalized(normalize_source(&table, &mapping, &company));
        let isbns: Vec<_> = source
            .records
            .iter()
            .map(|r| r.text(CanonicalField::Isbn).unwrap())
            .collect();
        assert_eq!(isbns, vec!["2", "3"]);
        assert_eq!(source.dropped_by_stock, 3);
        assert_eq!(source.rows_in, 5);
        assert_eq!(
            source.records[0].get(CanonicalField::Stock),
            Some(&Value::Number(Decimal::from(12)))
        );
    }

    #[test]
    fn stamps_company_and_handling_over_mapped_columns() {
        let table = table(&["Title", "Vendor"], &[&["A", "someone else"]]);
        let mapping = ColumnMapping::from_pairs([
            ("Title", Some(CanonicalField::Title)),
            ("Vendor", Some(CanonicalField::Company)),
        ])
        .resolve(table.columns())
        .unwrap();
        let company = CompanyProfile::new("Prakash Noida", "4", 4);

        let source = normalized(normalize_source(&table, &mapping, &company));
        let record = &source.records[0];
        assert_eq!(record.text(CanonicalField::Company), Some("Prakash Noida"));
        assert_eq!(record.text(CanonicalField::Handling), Some("4"));
        assert_eq!(
            source.columns,
            vec![
                CanonicalField::Title,
                CanonicalField::Company,
                CanonicalField::Handling
            ]
        );
        assert_eq!(source.dropped_by_stock, 0);
    }

    #[test]
    fn unassigned_columns_are_dropped() {
        let table = table(&["ISBN", "Notes"], &[&["1", "fragile"]]);
        let mapping = ColumnMapping::from_pairs([("ISBN", Some(CanonicalField::Isbn)), ("Notes", None)])
            .resolve(table.columns())
            .unwrap();
        let source = normalized(normalize_source(
            &table,
            &mapping,
            &CompanyProfile::new("UDH", "2", 0),
        ));
        assert!(!source.columns.contains(&CanonicalField::Title));
        assert_eq!(source.records[0].text(CanonicalField::Title), None);
    }

    #[test]
    fn source_without_assignments_is_skipped() {
        let table = table(&["A", "B"], &[&["1", "2"]]);
        let mapping = ColumnMapping::from_pairs([("A", None), ("B", None)])
            .resolve(table.columns())
            .unwrap();
        assert_eq!(
            normalize_source(&table, &mapping, &CompanyProfile::new("UDH", "2", 0)),
            NormalizeOutcome::Skipped {
                source: "supplier.csv".into()
            }
        );
    }
}
