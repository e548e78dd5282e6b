//! Cleaning and deduplication of the merged catalog.
//!
//! Steps run in a fixed order because each relies on the previous one:
//! ISBN canonicalization, keep-first deduplication on ISBN, numeric coercion
//! of PRICE and STOCK, then the validity filter for the configured
//! [`Strictness`].

use std::collections::HashSet;

use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    canonical::CanonicalField,
    config::Strictness,
    data::{CanonicalRecord, Value, coerce_cell, coerce_number},
    merge::CatalogTable,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanSummary {
    pub rows_in: usize,
    pub duplicates_removed: usize,
    pub invalid_removed: usize,
}

impl CleanSummary {
    pub fn rows_out(&self) -> usize {
        self.rows_in - self.duplicates_removed - self.invalid_removed
    }
}

/// Reduces an ISBN to its digits and check character. Returns `None` when
/// nothing meaningful is left.
pub fn canonicalize_isbn(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| ch.is_ascii_digit() || matches!(ch, 'x' | 'X'))
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    match cleaned.as_str() {
        "" | "0" => None,
        _ => Some(cleaned),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Cleaner {
    strictness: Strictness,
}

impl Cleaner {
    pub fn new(strictness: Strictness) -> Self {
        Self { strictness }
    }

    pub fn clean(&self, table: &mut CatalogTable) -> CleanSummary {
        let has_isbn = table.has_column(CanonicalField::Isbn);
        let records = table.records_mut();
        let rows_in = records.len();

        if has_isbn {
            for record in records.iter_mut() {
                let canonical = record
                    .take(CanonicalField::Isbn)
                    .and_then(|value| canonicalize_isbn(&value.as_display()));
                record.set(CanonicalField::Isbn, canonical.map(Value::Text));
            }
        }

        let before_dedup = records.len();
        if has_isbn {
            let mut seen = HashSet::new();
            records.retain(|record| match record.text(CanonicalField::Isbn) {
                Some(isbn) => seen.insert(isbn.to_string()),
                None => true,
            });
        }
        let duplicates_removed = before_dedup - records.len();

        for record in records.iter_mut() {
            for field in CanonicalField::ALL.into_iter().filter(|f| f.is_numeric()) {
                let coerced = coerce_cell(record.take(field));
                record.set(field, coerced);
            }
        }

        let before_filter = records.len();
        records.retain(|record| {
            let keep = self.is_valid(record);
            if !keep {
                debug!(
                    "Dropping invalid row (ISBN {:?}, COMPANY {:?})",
                    record.text(CanonicalField::Isbn),
                    record.text(CanonicalField::Company)
                );
            }
            keep
        });
        let invalid_removed = before_filter - records.len();

        let summary = CleanSummary {
            rows_in,
            duplicates_removed,
            invalid_removed,
        };
        info!(
            "Cleaned {} row(s): {} duplicate ISBN(s) and {} invalid row(s) removed ({:?})",
            rows_in, duplicates_removed, invalid_removed, self.strictness
        );
        summary
    }

    /// Row validity after coercion. Zero PRICE or STOCK is always rejected;
    /// strict mode also requires the identifying and pricing fields.
    pub fn is_valid(&self, record: &CanonicalRecord) -> bool {
        let is_zero = |field| record.number(field) == Some(Decimal::ZERO);
        if is_zero(CanonicalField::Price) || is_zero(CanonicalField::Stock) {
            return false;
        }
        match self.strictness {
            Strictness::Lenient => true,
            Strictness::Strict => {
                let required = [
                    CanonicalField::Isbn,
                    CanonicalField::Currency,
                    CanonicalField::Price,
                    CanonicalField::Stock,
                ];
                required.into_iter().all(|field| record.is_present(field))
                    && record
                        .get(CanonicalField::Currency)
                        .is_some_and(|currency| currency_is_textual(currency))
            }
        }
    }
}

fn currency_is_textual(value: &Value) -> bool {
    match value {
        Value::Number(_) => false,
        Value::Text(text) => coerce_number(text).is_none(),
    }
}
