//! Column mapping: fuzzy suggestions and conflict validation.
//!
//! Suggestions are scored per source column against every canonical field and
//! are never reconciled with each other; two columns may well suggest the same
//! field. Only [`ColumnMapping::resolve`] turns a human-confirmed mapping into
//! a [`ValidatedMapping`], which is the sole input the normalizer accepts.

use std::sync::OnceLock;

use itertools::Itertools;
use rapidfuzz::distance::jaro_winkler::similarity as jaro_similarity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canonical::CanonicalField;

/// A string similarity on a 0-100 scale.
pub trait Similarity {
    fn score(&self, column: &str, field: &str) -> f64;
}

impl<F> Similarity for F
where
    F: Fn(&str, &str) -> f64,
{
    fn score(&self, column: &str, field: &str) -> f64 {
        self(column, field)
    }
}

/// Shorter names and tokens score zero; a lone letter matches too much.
const MIN_TOKEN_CHARS: usize = 2;

/// Jaro-Winkler similarity over normalized names, taking the best of the
/// whole name and each of its word tokens so "Book Title" still lands on
/// TITLE.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSimilarity;

impl Similarity for TokenSimilarity {
    fn score(&self, column: &str, field: &str) -> f64 {
        let column = normalize_name(column);
        let field = normalize_name(field);
        if column.chars().count() < MIN_TOKEN_CHARS || field.is_empty() {
            return 0.0;
        }
        let whole = jaro_similarity(column.chars(), field.chars());
        let best_token = column
            .split(' ')
            .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
            .cartesian_product(field.split(' '))
            .map(|(left, right)| jaro_similarity(left.chars(), right.chars()))
            .fold(0.0_f64, f64::max);
        (whole.max(best_token) * 100.0).clamp(0.0, 100.0)
    }
}

fn separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern compiles"))
}

/// Lower-cases a header and collapses punctuation runs into single spaces.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    separator_pattern()
        .replace_all(&lowered, " ")
        .trim()
        .to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub column: String,
    pub field: Option<CanonicalField>,
    /// Score of the best-matching field, whether or not it was accepted.
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct SchemaMapper<S = TokenSimilarity> {
    similarity: S,
    threshold: f64,
}

impl SchemaMapper<TokenSimilarity> {
    pub fn new(threshold: f64) -> Self {
        Self::with_similarity(TokenSimilarity, threshold)
    }
}

impl<S: Similarity> SchemaMapper<S> {
    pub fn with_similarity(similarity: S, threshold: f64) -> Self {
        Self {
            similarity,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores one column against the canonical schema. Ties keep the field
    /// that comes first in canonical order.
    pub fn suggest_column(&self, column: &str) -> Suggestion {
        let mut best: Option<(CanonicalField, f64)> = None;
        for field in CanonicalField::ALL {
            let score = self.similarity.score(column, field.name());
            if best.is_none_or(|(_, current)| score > current) {
                best = Some((field, score));
            }
        }
        let (field, score) = best.unwrap_or((CanonicalField::Isbn, 0.0));
        Suggestion {
            column: column.to_string(),
            field: (score > self.threshold).then_some(field),
            score,
        }
    }

    pub fn suggest(&self, columns: &[String]) -> Vec<Suggestion> {
        columns
            .iter()
            .map(|column| self.suggest_column(column))
            .collect()
    }

    /// Turns suggestions into an editable mapping in source column order.
    pub fn suggest_mapping(&self, columns: &[String]) -> ColumnMapping {
        ColumnMapping::new(
            self.suggest(columns)
                .into_iter()
                .map(|suggestion| ColumnAssignment {
                    column: suggestion.column,
                    field: suggestion.field,
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("duplicate assignment of {}", join_fields(.fields))]
    DuplicateAssignment { fields: Vec<CanonicalField> },
    #[error("mapping refers to column '{column}' which is not present in the source")]
    UnknownColumn { column: String },
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields.iter().map(|field| field.name()).join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAssignment {
    pub column: String,
    /// `None` leaves the column unassigned.
    #[serde(default)]
    pub field: Option<CanonicalField>,
}

impl ColumnAssignment {
    pub fn new(column: impl Into<String>, field: Option<CanonicalField>) -> Self {
        Self {
            column: column.into(),
            field,
        }
    }
}

/// A per-source mapping from original column names to canonical fields, kept
/// in the order columns were presented for review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    assignments: Vec<ColumnAssignment>,
}

impl ColumnMapping {
    pub fn new(assignments: Vec<ColumnAssignment>) -> Self {
        Self { assignments }
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<CanonicalField>)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(column, field)| ColumnAssignment::new(column, field))
                .collect(),
        )
    }

    pub fn assignments(&self) -> &[ColumnAssignment] {
        &self.assignments
    }

    /// Assigns (or unassigns) a column, appending it if unseen.
    pub fn assign(&mut self, column: &str, field: Option<CanonicalField>) {
        match self.assignments.iter_mut().find(|a| a.column == column) {
            Some(existing) => existing.field = field,
            None => self.assignments.push(ColumnAssignment::new(column, field)),
        }
    }

    pub fn field_for(&self, column: &str) -> Option<CanonicalField> {
        self.assignments
            .iter()
            .find(|a| a.column == column)
            .and_then(|a| a.field)
    }

    /// Canonical fields targeted by more than one column, in canonical order.
    pub fn duplicate_targets(&self) -> Vec<CanonicalField> {
        self.assignments
            .iter()
            .filter_map(|a| a.field)
            .duplicates()
            .sorted()
            .collect()
    }

    pub fn validate(&self) -> Result<(), MappingError> {
        let fields = self.duplicate_targets();
        if fields.is_empty() {
            Ok(())
        } else {
            Err(MappingError::DuplicateAssignment { fields })
        }
    }

    /// Validates the mapping and binds it to the positions of `columns`.
    pub fn resolve(&self, columns: &[String]) -> Result<ValidatedMapping, MappingError> {
        self.validate()?;
        let mut bound = Vec::new();
        for assignment in &self.assignments {
            let Some(field) = assignment.field else {
                continue;
            };
            let index = columns
                .iter()
                .position(|column| *column == assignment.column)
                .ok_or_else(|| MappingError::UnknownColumn {
                    column: assignment.column.clone(),
                })?;
            bound.push(BoundColumn {
                index,
                column: assignment.column.clone(),
                field,
            });
        }
        Ok(ValidatedMapping { columns: bound })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundColumn {
    pub index: usize,
    pub column: String,
    pub field: CanonicalField,
}

/// A conflict-free mapping restricted to assigned columns. Only obtainable
/// through [`ColumnMapping::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMapping {
    columns: Vec<BoundColumn>,
}

impl ValidatedMapping {
    pub fn columns(&self) -> &[BoundColumn] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.columns.iter().any(|bound| bound.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn normalize_name_collapses_separators() {
        assert_eq!(normalize_name("  Book_Title "), "book title");
        assert_eq!(normalize_name("Price (INR)"), "price inr");
        assert_eq!(normalize_name("--"), "");
    }

    #[test]
    fn token_similarity_matches_words_inside_longer_headers() {
        let sim = TokenSimilarity;
        assert_eq!(sim.score("Book Title", "TITLE"), 100.0);
        assert_eq!(sim.score("isbn", "ISBN"), 100.0);
        assert!(sim.score("Qty", "STOCK") < 70.0);
        assert_eq!(sim.score("", "STOCK"), 0.0);
    }

    #[test]
    fn single_letter_headers_and_tokens_stay_unassigned() {
        let mapper = SchemaMapper::new(70.0);
        let suggestions = mapper.suggest(&names(&["S.No", "S No", "C", "P", "Book Title"]));
        let fields: Vec<_> = suggestions.iter().map(|s| s.field).collect();
        assert_eq!(
            fields,
            vec![None, None, None, None, Some(CanonicalField::Title)]
        );
        assert_eq!(TokenSimilarity.score("P", "PRICE"), 0.0);
        assert!(TokenSimilarity.score("S.No", "STOCK") <= 70.0);
    }

    #[test]
    fn suggest_leaves_low_scores_unassigned() {
        let mapper = SchemaMapper::new(70.0);
        let suggestions = mapper.suggest(&names(&["ISBN", "Book Title", "Qty"]));
        let fields: Vec<_> = suggestions.iter().map(|s| s.field).collect();
        assert_eq!(
            fields,
            vec![Some(CanonicalField::Isbn), Some(CanonicalField::Title), None]
        );
        assert!(suggestions[2].score <= 70.0);
    }

    #[test]
    fn suggest_does_not_resolve_conflicts() {
        let mapper = SchemaMapper::new(70.0);
        let mapping = mapper.suggest_mapping(&names(&["Title", "Sub Title"]));
        assert_eq!(mapping.duplicate_targets(), vec![CanonicalField::Title]);
    }

    #[test]
    fn threshold_is_exclusive() {
        let mapper = SchemaMapper::with_similarity(|_: &str, _: &str| 70.0, 70.0);
        assert_eq!(mapper.suggest_column("anything").field, None);
        let mapper = SchemaMapper::with_similarity(|_: &str, _: &str| 70.5, 70.0);
        assert_eq!(
            mapper.suggest_column("anything").field,
            Some(CanonicalField::Isbn)
        );
    }

    #[test]
    fn validate_reports_every_duplicated_field_once() {
        let mapping = ColumnMapping::from_pairs([
            ("a", Some(CanonicalField::Price)),
            ("b", Some(CanonicalField::Isbn)),
            ("c", Some(CanonicalField::Price)),
            ("d", Some(CanonicalField::Isbn)),
            ("e", Some(CanonicalField::Price)),
            ("f", None),
            ("g", None),
        ]);
        assert_eq!(
            mapping.validate(),
            Err(MappingError::DuplicateAssignment {
                fields: vec![CanonicalField::Isbn, CanonicalField::Price]
            })
        );
    }

    #[test]
    fn resolve_binds_positions_and_drops_unassigned() {
        let mut mapping = ColumnMapping::from_pairs([
            ("ISBN", Some(CanonicalField::Isbn)),
            ("Qty", None),
        ]);
        mapping.assign("Qty", Some(CanonicalField::Stock));
        let columns = names(&["Qty", "Notes", "ISBN"]);
        let validated = mapping.resolve(&columns).expect("valid mapping");
        let bound: Vec<_> = validated
            .columns()
            .iter()
            .map(|b| (b.index, b.field))
            .collect();
        assert_eq!(
            bound,
            vec![(2, CanonicalField::Isbn), (0, CanonicalField::Stock)]
        );
        assert!(validated.contains(CanonicalField::Stock));
    }

    #[test]
    fn resolve_rejects_unknown_columns() {
        let mapping = ColumnMapping::from_pairs([("Missing", Some(CanonicalField::Title))]);
        assert_eq!(
            mapping.resolve(&names(&["ISBN"])),
            Err(MappingError::UnknownColumn {
                column: "Missing".into()
            })
        );
    }

    #[test]
    fn duplicate_error_message_lists_fields() {
        let err = MappingError::DuplicateAssignment {
            fields: vec![CanonicalField::Isbn, CanonicalField::Stock],
        };
        assert_eq!(err.to_string(), "duplicate assignment of ISBN, STOCK");
    }
}
