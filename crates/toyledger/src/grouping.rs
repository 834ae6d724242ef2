//! Month-by-month view over a user's records.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::{MonthKey, ToyRecord};

/// All records filed under one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGroup {
    /// The month.
    pub month: MonthKey,
    /// Display label for the month.
    pub label: String,
    /// Records in descending date order.
    pub records: Vec<ToyRecord>,
}

/// Group records by month, newest month first.
///
/// Within a group records are ordered by descending date. Records on the
/// same date keep their relative input order, so a newest-first input stays
/// newest-first.
#[must_use]
pub fn group_by_month(records: Vec<ToyRecord>) -> Vec<MonthGroup> {
    let mut by_month: BTreeMap<MonthKey, Vec<ToyRecord>> = BTreeMap::new();
    for record in records {
        by_month
            .entry(MonthKey::from(record.date))
            .or_default()
            .push(record);
    }

    by_month
        .into_iter()
        .rev()
        .map(|(month, mut records)| {
            records.sort_by(|a, b| b.date.cmp(&a.date));
            MonthGroup {
                month,
                label: month.label(),
                records,
            }
        })
        .collect()
}
