//! Currency normalization and conversion to the base currency.
//!
//! Each distinct currency code is resolved once per run through a
//! [`RateProvider`] and cached. Unknown codes and provider failures fall back
//! to a rate of one and are reported, never raised.
//!
//! Conversion rewrites PRICE and CURRENCY in place. Running it twice over the
//! same rows converts twice; callers own the run-once contract.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::{
    canonical::CanonicalField,
    config::ReconcileConfig,
    data::Value,
    merge::CatalogTable,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    #[error("no exchange rate known for '{0}'")]
    Unknown(String),
    #[error("rate for '{code}' is not positive ({rate})")]
    NonPositive { code: String, rate: Decimal },
    #[error("rate lookup for '{code}' failed: {message}")]
    Provider { code: String, message: String },
}

/// Resolves a normalized currency code to units of base currency per unit.
pub trait RateProvider {
    fn resolve_rate(&self, code: &str) -> Result<Decimal, RateError>;
}

impl<F> RateProvider for F
where
    F: Fn(&str) -> Result<Decimal, RateError>,
{
    fn resolve_rate(&self, code: &str) -> Result<Decimal, RateError> {
        self(code)
    }
}

/// Rates taken from the configuration's static table.
#[derive(Debug, Clone, Default)]
pub struct StaticRateProvider {
    rates: BTreeMap<String, Decimal>,
}

impl StaticRateProvider {
    pub fn new(rates: BTreeMap<String, Decimal>) -> Self {
        Self { rates }
    }

    pub fn from_config(config: &ReconcileConfig) -> Self {
        Self::new(config.rates.clone())
    }
}

impl RateProvider for StaticRateProvider {
    fn resolve_rate(&self, code: &str) -> Result<Decimal, RateError> {
        self.rates
            .get(code)
            .copied()
            .ok_or_else(|| RateError::Unknown(code.to_string()))
    }
}

/// Trims, upper-cases, and applies the alias table to a raw currency cell.
pub fn normalize_code(raw: &str, aliases: &BTreeMap<String, String>) -> String {
    let code = raw.trim().to_uppercase();
    aliases.get(&code).cloned().unwrap_or(code)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionSummary {
    /// Effective rate applied per normalized code, fallbacks included.
    pub rates: BTreeMap<String, Decimal>,
    pub unresolved: Vec<String>,
    /// Codes whose converted price exceeded the decimal range; PRICE was cleared.
    pub overflowed: Vec<String>,
    pub converted_rows: usize,
}

pub struct CurrencyConverter<P> {
    base: String,
    aliases: BTreeMap<String, String>,
    provider: P,
    cache: BTreeMap<String, Option<Decimal>>,
}

impl<P: RateProvider> CurrencyConverter<P> {
    pub fn new(base: &str, aliases: BTreeMap<String, String>, provider: P) -> Self {
        Self {
            base: base.trim().to_uppercase(),
            aliases,
            provider,
            cache: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &ReconcileConfig, provider: P) -> Self {
        Self::new(
            &config.base_currency,
            config.currency_aliases.clone(),
            provider,
        )
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Cached rate for `code`; `None` means unresolved. The base code is
    /// always one and never sent to the provider.
    pub fn rate_for(&mut self, code: &str) -> Option<Decimal> {
        if code == self.base {
            return Some(Decimal::ONE);
        }
        if let Some(cached) = self.cache.get(code) {
            return *cached;
        }
        let resolved = match self.provider.resolve_rate(code) {
            Ok(rate) if rate > Decimal::ZERO => Some(rate),
            Ok(rate) => {
                warn!(
                    "{}",
                    RateError::NonPositive {
                        code: code.to_string(),
                        rate
                    }
                );
                None
            }
            Err(err) => {
                warn!("{err}; using a rate of 1");
                None
            }
        };
        debug!("Resolved currency '{code}' -> {resolved:?}");
        self.cache.insert(code.to_string(), resolved);
        resolved
    }

    /// Rescales PRICE to the base currency and stamps CURRENCY with the base
    /// code. Tables lacking either column are left untouched.
    pub fn convert(&mut self, table: &mut CatalogTable) -> ConversionSummary {
        let mut summary = ConversionSummary::default();
        if !table.has_column(CanonicalField::Currency) || !table.has_column(CanonicalField::Price) {
            debug!("Skipping currency conversion: CURRENCY or PRICE column absent");
            return summary;
        }

        let codes: Vec<Option<String>> = table
            .records()
            .iter()
            .map(|record| {
                record
                    .get(CanonicalField::Currency)
                    .map(|value| normalize_code(&value.as_display(), &self.aliases))
                    .filter(|code| !code.is_empty())
            })
            .collect();

        let distinct: BTreeSet<&str> = codes.iter().flatten().map(String::as_str).collect();
        for code in distinct {
            match self.rate_for(code) {
                Some(rate) => {
                    summary.rates.insert(code.to_string(), rate);
                }
                None => {
                    summary.rates.insert(code.to_string(), Decimal::ONE);
                    summary.unresolved.push(code.to_string());
                }
            }
        }

        let base = Value::Text(self.base.clone());
        let mut overflowed = BTreeSet::new();
        for (record, code) in table.records_mut().iter_mut().zip(&codes) {
            let rate = code
                .as_ref()
                .and_then(|code| summary.rates.get(code).copied())
                .unwrap_or(Decimal::ONE);
            if let Some(price) = record.number(CanonicalField::Price) {
                match price.checked_mul(rate) {
                    Some(converted) => {
                        record.set(CanonicalField::Price, Some(Value::Number(converted)));
                        summary.converted_rows += 1;
                    }
                    None => {
                        let code = code.as_deref().unwrap_or(&self.base);
                        debug!("Price {price} x {rate} ({code}) overflows; clearing PRICE");
                        record.set(CanonicalField::Price, None);
                        overflowed.insert(code.to_string());
                    }
                }
            }
            record.set(CanonicalField::Currency, Some(base.clone()));
        }
        summary.overflowed = overflowed.into_iter().collect();

        info!(
            "Converted {} price(s) to {} using {} distinct currency code(s)",
            summary.converted_rows,
            self.base,
            summary.rates.len()
        );
        summary
    }
}
