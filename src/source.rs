//! Loading supplier exports into [`SourceTable`]s.
//!
//! Delimited text goes through the shared CSV helpers in [`crate::io_utils`];
//! spreadsheets (`.xlsx`, `.xlsm`, `.xls`, `.ods`) are read with `calamine`.
//! Either way the first row is the header and every cell is kept as text.

use std::{collections::HashSet, path::Path};

use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::{Encoding, UTF_8};
use log::debug;
use thiserror::Error;

use crate::io_utils;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("source '{source_name}' has no header row")]
    MissingHeader { source_name: String },
    #[error("source '{source_name}' repeats column '{column}'")]
    DuplicateColumn { source_name: String, column: String },
    #[error("workbook '{source_name}' contains no worksheets")]
    EmptyWorkbook { source_name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Workbook,
}

impl SourceFormat {
    pub fn detect(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => SourceFormat::Workbook,
            _ => SourceFormat::Delimited,
        }
    }
}

/// How to read one source file.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    /// Worksheet name for spreadsheets; the first sheet when absent.
    pub sheet: Option<String>,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            sheet: None,
        }
    }
}

/// One supplier's raw rows, as exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SourceTable {
    /// Builds a table, trimming header names and padding short rows. Column
    /// names must be unique; blank rows are dropped.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<Self, SourceError> {
        let name = name.into();
        let columns: Vec<String> = columns.into_iter().map(|c| c.trim().to_string()).collect();
        if columns.is_empty() {
            return Err(SourceError::MissingHeader { source_name: name });
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = columns.iter().find(|column| !seen.insert(column.as_str())) {
            return Err(SourceError::DuplicateColumn {
                column: duplicate.clone(),
                source_name: name,
            });
        }
        let width = columns.len();
        let rows = rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub fn load(path: &Path, name: &str, options: &SourceOptions) -> Result<SourceTable> {
    let table = match SourceFormat::detect(path) {
        SourceFormat::Delimited => load_delimited(path, name, options)?,
        SourceFormat::Workbook => load_workbook(path, name, options)?,
    };
    debug!(
        "Loaded '{}' with {} column(s) and {} row(s)",
        table.name(),
        table.columns().len(),
        table.row_count()
    );
    Ok(table)
}

fn load_delimited(path: &Path, name: &str, options: &SourceOptions) -> Result<SourceTable> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    debug!(
        "Reading {path:?} with delimiter '{}' and encoding {}",
        io_utils::printable_delimiter(delimiter),
        options.encoding.name()
    );
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, options.encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;
    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} in {path:?}", idx + 2))?;
        rows.push(
            io_utils::decode_record(&record, options.encoding)
                .with_context(|| format!("Decoding row {} in {path:?}", idx + 2))?,
        );
    }
    Ok(SourceTable::new(name, headers, rows)?)
}

fn load_workbook(path: &Path, name: &str, options: &SourceOptions) -> Result<SourceTable> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Opening workbook {path:?}"))?;
    let sheet = match &options.sheet {
        Some(sheet) => sheet.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SourceError::EmptyWorkbook {
                source_name: name.to_string(),
            })?,
    };
    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("Reading worksheet '{sheet}' from {path:?}"))?;
    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    Ok(SourceTable::new(name, headers, rows.collect())?)
}

/// Renders a spreadsheet cell as text. Integral floats drop their fraction so
/// numerically stored ISBNs keep all their digits.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn new_pads_short_rows_and_skips_blank_ones() {
        let table = SourceTable::new(
            "a",
            strings(&[" ISBN ", "Qty"]),
            vec![strings(&["1"]), strings(&["", " "]), strings(&["2", "5"])],
        )
        .unwrap();
        assert_eq!(table.columns(), ["ISBN", "Qty"]);
        assert_eq!(table.rows(), [strings(&["1", ""]), strings(&["2", "5"])]);
    }

    #[test]
    fn new_rejects_repeated_columns() {
        let err = SourceTable::new("a", strings(&["ISBN", "ISBN "]), Vec::new()).unwrap_err();
        assert_eq!(
            err,
            SourceError::DuplicateColumn {
                source_name: "a".into(),
                column: "ISBN".into()
            }
        );
    }

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(
            SourceFormat::detect(Path::new("stock.XLSX")),
            SourceFormat::Workbook
        );
        assert_eq!(
            SourceFormat::detect(Path::new("stock.xls")),
            SourceFormat::Workbook
        );
        assert_eq!(
            SourceFormat::detect(Path::new("stock.tsv")),
            SourceFormat::Delimited
        );
    }

    #[test]
    fn load_reads_ragged_tab_separated_file() {
        let mut file = Builder::new().suffix(".tsv").tempfile().unwrap();
        writeln!(file, "ISBN\tBook Title\tQty").unwrap();
        writeln!(file, "978-0-13\tRust\t12").unwrap();
        writeln!(file, "111\tShort").unwrap();
        let table = load(file.path(), "supplier", &SourceOptions::default()).unwrap();
        assert_eq!(table.name(), "supplier");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[1], strings(&["111", "Short", ""]));
    }

    #[test]
    fn cell_text_keeps_integral_isbn_digits() {
        assert_eq!(cell_text(&Data::Float(9780134685991.0)), "9780134685991");
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("abc".into())), "abc");
    }
}
