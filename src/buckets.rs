// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Gap filling for period reports. Aggregates come in sparse (only periods
//! with activity); reports go out dense, newest period first.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::OperationKind;
use crate::period::{first_of_month, last_of_month};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub income: Decimal,
    /// Sum of expense amounts as stored, so zero or negative.
    pub expense: Decimal,
}

impl Totals {
    pub fn add(&mut self, kind: OperationKind, amount: Decimal) {
        match kind {
            OperationKind::Income => self.income += amount,
            OperationKind::Expense => self.expense += amount,
        }
    }

    pub fn net(&self) -> Decimal {
        self.income + self.expense
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportBucket<K> {
    pub key: K,
    pub income: Decimal,
    pub expense: Decimal,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// True when no transaction fell into this period.
    pub synthetic: bool,
}

impl<K> ReportBucket<K> {
    pub fn totals(&self) -> Totals {
        Totals {
            income: self.income,
            expense: self.expense,
        }
    }
}

/// Produces one bucket per key in `keys`, taking totals from `existing`
/// where present and zero otherwise. Every bucket gets its bounds from
/// `window_of`. The result is ordered by key, descending.
pub fn fill<K, I, F>(existing: &BTreeMap<K, Totals>, keys: I, window_of: F) -> Vec<ReportBucket<K>>
where
    K: Ord + Copy,
    I: IntoIterator<Item = K>,
    F: Fn(K) -> (NaiveDate, NaiveDate),
{
    let mut keys: Vec<K> = keys.into_iter().collect();
    keys.sort();
    keys.dedup();

    let mut buckets: Vec<ReportBucket<K>> = keys
        .into_iter()
        .map(|key| {
            let (start, end) = window_of(key);
            let found = existing.get(&key);
            let totals = found.copied().unwrap_or_default();
            ReportBucket {
                key,
                income: totals.income,
                expense: totals.expense,
                start,
                end,
                synthetic: found.is_none(),
            }
        })
        .collect();
    buckets.reverse();
    buckets
}

/// Twelve month buckets for `year`, December first. `months[i]` holds the
/// totals for month `i + 1`, if that month had any activity.
pub fn fill_months(year: i32, months: &[Option<Totals>; 12]) -> Vec<ReportBucket<u32>> {
    (1..=12u32)
        .rev()
        .map(|month| {
            let slot = months[(month - 1) as usize];
            let totals = slot.unwrap_or_default();
            let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN);
            ReportBucket {
                key: month,
                income: totals.income,
                expense: totals.expense,
                start: first_of_month(start),
                end: last_of_month(start),
                synthetic: slot.is_none(),
            }
        })
        .collect()
}
