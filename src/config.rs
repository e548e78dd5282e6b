//! Run configuration: supplier profiles, priority order, currency tables, and
//! cleaning strictness.
//!
//! A [`ReconcileConfig`] is an explicit, immutable value handed to the
//! pipeline. The [`Default`] implementation carries the built-in supplier and
//! currency tables; a YAML file may override any subset of fields.

use std::{
    collections::{BTreeMap, HashSet},
    fs::File,
    io::BufReader,
    path::Path,
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_CURRENCY: &str = "INR";
pub const DEFAULT_MATCH_THRESHOLD: f64 = 70.0;

/// A supplier and the business rules attached to its rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanyProfile {
    pub name: String,
    /// Opaque tag copied onto every row from this supplier.
    pub handling: String,
    /// Inclusive lower bound on STOCK for rows to be kept.
    #[serde(default)]
    pub min_stock: i64,
}

impl CompanyProfile {
    pub fn new(name: impl Into<String>, handling: impl Into<String>, min_stock: i64) -> Self {
        Self {
            name: name.into(),
            handling: handling.into(),
            min_stock,
        }
    }
}

/// How aggressively the cleaner discards incomplete rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum Strictness {
    /// Only rows with a zero PRICE or STOCK are dropped.
    #[default]
    Lenient,
    /// Rows must also carry ISBN, CURRENCY, PRICE and STOCK, with a
    /// non-numeric CURRENCY.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("base currency must not be empty")]
    EmptyBaseCurrency,
    #[error("company names must not be empty")]
    EmptyCompanyName,
    #[error("company '{0}' is defined more than once")]
    DuplicateCompany(String),
    #[error("company '{0}' appears more than once in the priority list")]
    DuplicatePriority(String),
    #[error("rate for '{code}' must be positive (got {rate})")]
    NonPositiveRate { code: String, rate: Decimal },
    #[error("currency alias '{alias}' must map to a non-empty code")]
    EmptyAliasTarget { alias: String },
    #[error("match threshold must lie within 0..=100 (got {0})")]
    ThresholdOutOfRange(f64),
    #[error("no rate for '{0}' to rebase the currency table on")]
    UnknownBaseCurrency(String),
    #[error("rate for '{code}' overflows when rebased on '{base}'")]
    RebaseOverflow { code: String, base: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconcileConfig {
    pub base_currency: String,
    pub strictness: Strictness,
    /// Minimum similarity (0-100, exclusive) for a column suggestion.
    pub match_threshold: f64,
    pub companies: Vec<CompanyProfile>,
    /// Company names in output order; unlisted companies sort after these.
    pub priority: Vec<String>,
    pub currency_aliases: BTreeMap<String, String>,
    /// Units of base currency per one unit of the keyed currency.
    pub rates: BTreeMap<String, Decimal>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        let companies = [
            ("Adarsh", "2", 10),
            ("Adhya", "2", 2),
            ("UDH", "2", 0),
            ("RUPA", "2", 5),
            ("Prakash Delhi", "2", 4),
            ("Prakash Noida", "4", 4),
            ("IBD", "2", 3),
            ("GBD", "2", 5),
            ("ECP", "2", 0),
            ("VCP", "2", 3),
        ]
        .into_iter()
        .map(|(name, handling, min_stock)| CompanyProfile::new(name, handling, min_stock))
        .collect();

        let priority = [
            "Adarsh",
            "GBD",
            "ECP",
            "IBD",
            "Prakash Delhi",
            "VCP",
            "Prakash Noida",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let currency_aliases = [
            ("$", "USD"),
            ("US$", "USD"),
            ("£", "GBP"),
            ("UKP", "GBP"),
            ("€", "EUR"),
            ("EU", "EUR"),
            ("RS", "INR"),
            ("RS.", "INR"),
            ("₹", "INR"),
        ]
        .into_iter()
        .map(|(alias, code)| (alias.to_string(), code.to_string()))
        .collect();

        let rates = [
            ("USD", Decimal::new(9060, 2)),
            ("GBP", Decimal::new(11380, 2)),
            ("EUR", Decimal::new(9470, 2)),
            ("INR", Decimal::ONE),
        ]
        .into_iter()
        .map(|(code, rate)| (code.to_string(), rate))
        .collect();

        Self {
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            strictness: Strictness::default(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            companies,
            priority,
            currency_aliases,
            rates,
        }
    }
}

impl ReconcileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: ReconcileConfig =
            serde_yaml::from_reader(reader).context("Parsing config YAML")?;
        let config = config.normalized();
        config
            .validate()
            .with_context(|| format!("Validating config {path:?}"))?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the built-in tables.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing config YAML")
    }

    /// Upper-cases currency keys so lookups match normalized codes.
    pub fn normalized(mut self) -> Self {
        self.base_currency = self.base_currency.trim().to_uppercase();
        self.currency_aliases = self
            .currency_aliases
            .into_iter()
            .map(|(alias, code)| (alias.trim().to_uppercase(), code.trim().to_uppercase()))
            .collect();
        self.rates = self
            .rates
            .into_iter()
            .map(|(code, rate)| (code.trim().to_uppercase(), rate))
            .collect();
        for company in &mut self.companies {
            company.name = company.name.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_currency.trim().is_empty() {
            return Err(ConfigError::EmptyBaseCurrency);
        }
        if !(0.0..=100.0).contains(&self.match_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.match_threshold));
        }
        let mut names = HashSet::new();
        for company in &self.companies {
            if company.name.trim().is_empty() {
                return Err(ConfigError::EmptyCompanyName);
            }
            if !names.insert(company.name.as_str()) {
                return Err(ConfigError::DuplicateCompany(company.name.clone()));
            }
        }
        let mut ranked = HashSet::new();
        for name in &self.priority {
            if !ranked.insert(name.as_str()) {
                return Err(ConfigError::DuplicatePriority(name.clone()));
            }
        }
        if let Some((code, rate)) = self.rates.iter().find(|(_, rate)| **rate <= Decimal::ZERO) {
            return Err(ConfigError::NonPositiveRate {
                code: code.clone(),
                rate: *rate,
            });
        }
        if let Some((alias, _)) = self
            .currency_aliases
            .iter()
            .find(|(_, code)| code.trim().is_empty())
        {
            return Err(ConfigError::EmptyAliasTarget {
                alias: alias.clone(),
            });
        }
        Ok(())
    }

    /// Switches the base currency, re-expressing every rate as units of the
    /// new base. The new base must already have a positive rate; the old base
    /// keeps a rate so its prices still convert.
    pub fn rebase(&mut self, code: &str) -> Result<(), ConfigError> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err(ConfigError::EmptyBaseCurrency);
        }
        if code == self.base_currency {
            return Ok(());
        }
        let divisor = match self.rates.get(&code) {
            Some(rate) if *rate > Decimal::ZERO => *rate,
            Some(rate) => {
                return Err(ConfigError::NonPositiveRate {
                    code,
                    rate: *rate,
                });
            }
            None => return Err(ConfigError::UnknownBaseCurrency(code)),
        };
        self.rates
            .entry(self.base_currency.clone())
            .or_insert(Decimal::ONE);
        let mut rebased = BTreeMap::new();
        for (other, rate) in &self.rates {
            let rate = rate
                .checked_div(divisor)
                .ok_or_else(|| ConfigError::RebaseOverflow {
                    code: other.clone(),
                    base: code.clone(),
                })?;
            rebased.insert(other.clone(), rate);
        }
        rebased.insert(code.clone(), Decimal::ONE);
        self.rates = rebased;
        self.base_currency = code;
        Ok(())
    }

    pub fn company(&self, name: &str) -> Option<&CompanyProfile> {
        let name = name.trim();
        self.companies.iter().find(|company| company.name == name)
    }

    pub fn priority_rank(&self, name: &str) -> Option<usize> {
        self.priority.iter().position(|ranked| ranked == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_tables_are_valid() {
        let config = ReconcileConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.company("Adarsh").map(|c| c.min_stock), Some(10));
        assert_eq!(
            config.company("Prakash Noida").map(|c| c.handling.as_str()),
            Some("4")
        );
        assert_eq!(config.priority_rank("GBD"), Some(1));
        assert_eq!(config.priority_rank("UDH"), None);
        assert_eq!(config.rates.get("USD"), Some(&Decimal::new(906, 1)));
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_fields() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "base_currency: usd").unwrap();
        writeln!(file, "strictness: strict").unwrap();
        writeln!(file, "rates:").unwrap();
        writeln!(file, "  inr: 0.011").unwrap();
        writeln!(file, "  usd: 1").unwrap();

        let config = ReconcileConfig::load(file.path()).expect("load config");
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.strictness, Strictness::Strict);
        assert_eq!(config.rates.get("INR"), Some(&Decimal::new(11, 3)));
        assert_eq!(config.companies.len(), 10);
        assert_eq!(config.match_threshold, DEFAULT_MATCH_THRESHOLD);
    }

    #[test]
    fn rejects_non_positive_rates() {
        let mut config = ReconcileConfig::default();
        config.rates.insert("JPY".into(), Decimal::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveRate {
                code: "JPY".into(),
                rate: Decimal::ZERO
            })
        );
    }

    #[test]
    fn rejects_duplicate_companies_and_priorities() {
        let mut config = ReconcileConfig::default();
        config.companies.push(CompanyProfile::new("UDH", "9", 1));
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateCompany("UDH".into()))
        );

        let mut config = ReconcileConfig::default();
        config.priority.push("Adarsh".into());
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicatePriority("Adarsh".into()))
        );
    }

    #[test]
    fn config_round_trips_through_yaml_file() {
        let file = NamedTempFile::new().expect("temp file");
        let config = ReconcileConfig::default();
        config.save(file.path()).expect("save config");
        let loaded = ReconcileConfig::load(file.path()).expect("reload config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn rebase_expresses_rates_in_the_new_base() {
        let mut config = ReconcileConfig::default();
        config.rebase(" usd ").expect("USD has a rate");
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.rates.get("USD"), Some(&Decimal::ONE));
        assert_eq!(
            config.rates.get("GBP"),
            Some(&(Decimal::new(11380, 2) / Decimal::new(9060, 2)))
        );
        assert_eq!(
            config.rates.get("INR"),
            Some(&(Decimal::ONE / Decimal::new(9060, 2)))
        );
        config.validate().expect("rebased config validates");
    }

    #[test]
    fn rebase_keeps_the_old_base_convertible() {
        let mut config = ReconcileConfig::default();
        config.rates.remove("INR");
        config.rebase("EUR").expect("EUR has a rate");
        assert_eq!(
            config.rates.get("INR"),
            Some(&(Decimal::ONE / Decimal::new(9470, 2)))
        );
    }

    #[test]
    fn rebase_rejects_codes_without_a_rate() {
        let mut config = ReconcileConfig::default();
        assert_eq!(
            config.rebase("chf"),
            Err(ConfigError::UnknownBaseCurrency("CHF".into()))
        );
        assert_eq!(config, ReconcileConfig::default());
        config.rebase("inr").expect("same base is a no-op");
        assert_eq!(config, ReconcileConfig::default());
    }
}
