//! Writing the reconciled catalog: delimited output for files or stdout, and
//! an aligned console table for review.

use std::{borrow::Cow, fmt::Write as _, path::Path};

use anyhow::{Context, Result};
use log::info;

use crate::{io_utils, merge::CatalogTable};

/// Writes headers then rows; `None` or `-` writes to stdout.
pub fn write_table(path: Option<&Path>, delimiter: u8, table: &CatalogTable) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, delimiter)?;
    writer
        .write_record(table.headers())
        .context("Writing output headers")?;
    for (idx, row) in table.display_rows().into_iter().enumerate() {
        writer
            .write_record(&row)
            .with_context(|| format!("Writing output row {}", idx + 1))?;
    }
    writer.flush().context("Flushing output")?;
    match path {
        Some(path) if !io_utils::is_dash(path) => {
            info!("Wrote {} row(s) to {path:?}", table.len())
        }
        _ => info!("Wrote {} row(s) to stdout", table.len()),
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Columns whose every non-empty cell parses as a number are right-aligned.
pub fn column_alignments(column_count: usize, rows: &[Vec<String>]) -> Vec<Align> {
    (0..column_count)
        .map(|idx| {
            let mut cells = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .filter(|cell| !cell.is_empty())
                .peekable();
            if cells.peek().is_none() {
                return Align::Left;
            }
            if cells.all(|cell| crate::data::coerce_number(cell).is_some()) {
                Align::Right
            } else {
                Align::Left
            }
        })
        .collect()
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let aligns = column_alignments(headers.len(), rows);
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count().max(3)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(sanitize_cell(cell).chars().count());
        }
    }

    let mut output = String::new();
    let header_aligns = vec![Align::Left; headers.len()];
    let _ = writeln!(output, "{}", format_row(headers, &widths, &header_aligns));
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &header_aligns));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let cells: Vec<String> = widths
        .iter()
        .zip(aligns)
        .enumerate()
        .map(|(idx, (&width, align))| {
            let cell = values.get(idx).map(|v| sanitize_cell(v)).unwrap_or_default();
            match align {
                Align::Left => format!("{cell:<width$}"),
                Align::Right => format!("{cell:>width$}"),
            }
        })
        .collect();
    cells.join("  ").trim_end().to_string()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
