//! Final ordering of the catalog by supplier priority.

use std::collections::HashMap;

use log::debug;

use crate::{canonical::CanonicalField, data::CanonicalRecord, merge::CatalogTable};

/// Sort key: ranked companies first by rank, then unranked companies by the
/// position they were first seen, then rows without a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PriorityKey {
    Ranked(usize),
    Unranked(usize),
    Missing,
}

#[derive(Debug, Clone)]
pub struct PrioritySorter<'a> {
    priority: &'a [String],
}

impl<'a> PrioritySorter<'a> {
    pub fn new(priority: &'a [String]) -> Self {
        Self { priority }
    }

    pub fn rank(&self, company: &str) -> Option<usize> {
        self.priority.iter().position(|name| name == company)
    }

    /// Keys for every record, assigning first-seen positions to unranked
    /// companies in current table order.
    pub fn keys(&self, records: &[CanonicalRecord]) -> Vec<PriorityKey> {
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        records
            .iter()
            .map(|record| match record.text(CanonicalField::Company) {
                None => PriorityKey::Missing,
                Some(company) => match self.rank(company) {
                    Some(rank) => PriorityKey::Ranked(rank),
                    None => {
                        let next = first_seen.len();
                        PriorityKey::Unranked(*first_seen.entry(company).or_insert(next))
                    }
                },
            })
            .collect()
    }

    /// Stable sort; rows of the same company keep their merge order.
    pub fn sort(&self, table: &mut CatalogTable) {
        let keys = self.keys(table.records());
        let records = std::mem::take(table.records_mut());
        let mut keyed: Vec<(PriorityKey, CanonicalRecord)> = keys.into_iter().zip(records).collect();
        keyed.sort_by_key(|(key, _)| *key);
        let unranked = keyed
            .iter()
            .filter(|(key, _)| matches!(key, PriorityKey::Unranked(_)))
            .count();
        if unranked > 0 {
            debug!("{unranked} row(s) belong to companies outside the priority list");
        }
        *table.records_mut() = keyed.into_iter().map(|(_, record)| record).collect();
    }
}
