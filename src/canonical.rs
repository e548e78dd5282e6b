//! The canonical catalog schema.
//!
//! Every supplier export is mapped into the same nine fields, always emitted in
//! the order declared by [`CanonicalField::ALL`]. Deriving `Ord` on the enum
//! gives that order for free, so sets of fields sort canonically.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CanonicalField {
    Isbn,
    Title,
    Author,
    Publisher,
    Stock,
    Currency,
    Price,
    Company,
    Handling,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a canonical field (expected one of ISBN, TITLE, AUTHOR, PUBLISHER, STOCK, CURRENCY, PRICE, COMPANY, HANDLING)")]
pub struct UnknownField(pub String);

impl CanonicalField {
    pub const COUNT: usize = 9;

    pub const ALL: [CanonicalField; Self::COUNT] = [
        CanonicalField::Isbn,
        CanonicalField::Title,
        CanonicalField::Author,
        CanonicalField::Publisher,
        CanonicalField::Stock,
        CanonicalField::Currency,
        CanonicalField::Price,
        CanonicalField::Company,
        CanonicalField::Handling,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            CanonicalField::Isbn => "ISBN",
            CanonicalField::Title => "TITLE",
            CanonicalField::Author => "AUTHOR",
            CanonicalField::Publisher => "PUBLISHER",
            CanonicalField::Stock => "STOCK",
            CanonicalField::Currency => "CURRENCY",
            CanonicalField::Price => "PRICE",
            CanonicalField::Company => "COMPANY",
            CanonicalField::Handling => "HANDLING",
        }
    }

    /// Position of the field within the canonical order.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Fields that are coerced to numbers during cleaning.
    pub const fn is_numeric(self) -> bool {
        matches!(self, CanonicalField::Stock | CanonicalField::Price)
    }

    /// Fields stamped from the supplier profile, overriding any mapped source column.
    pub const fn is_stamped(self) -> bool {
        matches!(self, CanonicalField::Company | CanonicalField::Handling)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CanonicalField {
    type Err = UnknownField;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        CanonicalField::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownField(trimmed.to_string()))
    }
}
