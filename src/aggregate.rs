// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Report queries. Each one resolves its window, fetches the raw rows from
//! the store, groups them, and pads empty periods.

use std::collections::BTreeMap;

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use tracing::warn;

use crate::buckets::{ReportBucket, Totals, fill, fill_months};
use crate::error::{LedgerError, LedgerResult};
use crate::models::TransactionDetail;
use crate::period::{MonthRef, PeriodWindow, resolve_year};
use crate::store::LedgerStore;

#[derive(Debug, Clone, Serialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub totals: Totals,
    pub transactions: Vec<TransactionDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedReport {
    pub window: PeriodWindow,
    /// Newest day first.
    pub groups: Vec<DayGroup>,
    pub totals: Totals,
    pub previous: MonthRef,
    pub next: MonthRef,
    /// Where the caller wants edits made from this report to land. Set by
    /// the presentation layer, never here.
    pub return_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyReport {
    pub window: PeriodWindow,
    /// Highest week ordinal first.
    pub weeks: Vec<ReportBucket<u32>>,
    pub totals: Totals,
    pub previous: MonthRef,
    pub next: MonthRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    /// December first.
    pub months: Vec<ReportBucket<u32>>,
    pub totals: Totals,
}

pub fn detailed(
    store: &impl LedgerStore,
    user_id: i64,
    month: u32,
    year: i32,
) -> LedgerResult<DetailedReport> {
    let window = PeriodWindow::resolve(month, year);
    let rows = store.fetch_transactions(user_id, &window, None)?;
    Ok(build_detailed(window, rows))
}

pub fn detailed_by_account(
    store: &impl LedgerStore,
    user_id: i64,
    account_id: i64,
    month: u32,
    year: i32,
) -> LedgerResult<DetailedReport> {
    if store.fetch_account(account_id, user_id)?.is_none() {
        warn!(account_id, user_id, "report for account not owned by user");
        return Err(LedgerError::not_found(format!("Account {}", account_id)));
    }
    let window = PeriodWindow::resolve(month, year);
    let rows = store.fetch_transactions(user_id, &window, Some(account_id))?;
    Ok(build_detailed(window, rows))
}

pub fn weekly(
    store: &impl LedgerStore,
    user_id: i64,
    month: u32,
    year: i32,
) -> LedgerResult<WeeklyReport> {
    let window = PeriodWindow::resolve(month, year);
    let rows = store.fetch_transactions(user_id, &window, None)?;

    let mut by_week: BTreeMap<u32, Totals> = BTreeMap::new();
    let mut totals = Totals::default();
    for row in &rows {
        let t = &row.transaction;
        by_week
            .entry(window.week_of(t.date))
            .or_default()
            .add(t.kind, t.amount);
        totals.add(t.kind, t.amount);
    }

    let weeks = fill(&by_week, 1..=window.week_count(), |week| {
        window.week_bounds(week)
    });
    Ok(WeeklyReport {
        window,
        weeks,
        totals,
        previous: window.previous(),
        next: window.next(),
    })
}

pub fn monthly(store: &impl LedgerStore, user_id: i64, year: i32) -> LedgerResult<MonthlyReport> {
    let year = resolve_year(year, Local::now().date_naive());
    let window = PeriodWindow::calendar_year(year);
    let rows = store.fetch_transactions(user_id, &window, None)?;

    let mut months: [Option<Totals>; 12] = [None; 12];
    let mut totals = Totals::default();
    for row in &rows {
        let t = &row.transaction;
        months[t.date.month0() as usize]
            .get_or_insert_with(Totals::default)
            .add(t.kind, t.amount);
        totals.add(t.kind, t.amount);
    }

    Ok(MonthlyReport {
        year,
        months: fill_months(year, &months),
        totals,
    })
}

/// Every transaction between `from` and `to`, both included, newest first.
pub fn between(
    store: &impl LedgerStore,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> LedgerResult<Vec<TransactionDetail>> {
    let window = PeriodWindow {
        start: from.min(to),
        end: from.max(to),
    };
    store.fetch_transactions(user_id, &window, None)
}

fn build_detailed(window: PeriodWindow, rows: Vec<TransactionDetail>) -> DetailedReport {
    let mut by_date: BTreeMap<NaiveDate, DayGroup> = BTreeMap::new();
    let mut totals = Totals::default();
    for row in rows {
        let t = &row.transaction;
        totals.add(t.kind, t.amount);
        let group = by_date.entry(t.date).or_insert_with(|| DayGroup {
            date: t.date,
            totals: Totals::default(),
            transactions: Vec::new(),
        });
        group.totals.add(t.kind, t.amount);
        group.transactions.push(row);
    }

    DetailedReport {
        window,
        groups: by_date.into_values().rev().collect(),
        totals,
        previous: window.previous(),
        next: window.next(),
        return_to: None,
    }
}
