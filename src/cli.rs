use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::config::Strictness;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile supplier book catalogs into one priced, deduplicated listing",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Suggest canonical field mappings for the columns of one or more sources
    Suggest(SuggestArgs),
    /// Merge sources listed in a run manifest into a single catalog
    Merge(MergeArgs),
    /// List the configured supplier companies
    Companies(CompaniesArgs),
    /// Write the default configuration to a YAML file
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct SuggestArgs {
    /// Source files to inspect (CSV, TSV, or Excel workbooks)
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Configuration file overriding the built-in defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Company to assign the sources to when writing a manifest
    #[arg(long)]
    pub company: Option<String>,
    /// Write the suggested mappings as a run manifest for review
    #[arg(long = "manifest-out")]
    pub manifest_out: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Worksheet to read from workbook inputs (defaults to the first)
    #[arg(long)]
    pub sheet: Option<String>,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("strictness").args(["strict", "lenient"])))]
pub struct MergeArgs {
    /// Run manifest listing sources, companies, and reviewed mappings
    #[arg(short, long)]
    pub manifest: PathBuf,
    /// Configuration file overriding the built-in defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Output file (stdout if omitted or '-')
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Require ISBN, CURRENCY, PRICE, and STOCK on every output row
    #[arg(long)]
    pub strict: bool,
    /// Drop only rows with zero PRICE or STOCK
    #[arg(long)]
    pub lenient: bool,
    /// Currency code prices are converted into
    #[arg(long = "base-currency")]
    pub base_currency: Option<String>,
    /// Output delimiter character (defaults from the output extension)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Print the merged catalog as a table instead of writing delimited output
    #[arg(long)]
    pub table: bool,
    /// Write the run report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl MergeArgs {
    /// Strictness chosen on the command line, if any.
    pub fn strictness(&self) -> Option<Strictness> {
        match (self.strict, self.lenient) {
            (true, _) => Some(Strictness::Strict),
            (_, true) => Some(Strictness::Lenient),
            _ => None,
        }
    }
}

#[derive(Debug, Args)]
pub struct CompaniesArgs {
    /// Configuration file overriding the built-in defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Destination YAML file
    #[arg(short, long)]
    pub output: PathBuf,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
