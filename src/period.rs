// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Reporting windows: one calendar month, or one calendar year, with
//! inclusive bounds on both ends.

use chrono::{Datelike, Days, Local, Months, NaiveDate};
use serde::Serialize;

/// Years at or below this are treated as "not given".
const UNSET_YEAR: i32 = 1900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthRef {
    pub month: u32,
    pub year: i32,
}

impl MonthRef {
    fn of(date: NaiveDate) -> Self {
        MonthRef {
            month: date.month(),
            year: date.year(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    /// Window for (month, year) using today's local date as the fallback.
    pub fn resolve(month: u32, year: i32) -> Self {
        Self::resolve_at(month, year, Local::now().date_naive())
    }

    /// Month window for (month, year). An out-of-range month or an unset
    /// year falls back to the month containing `today`.
    pub fn resolve_at(month: u32, year: i32, today: NaiveDate) -> Self {
        let start = if (1..=12).contains(&month) && year > UNSET_YEAR {
            NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_else(|| first_of_month(today))
        } else {
            first_of_month(today)
        };
        PeriodWindow {
            start,
            end: last_of_month(start),
        }
    }

    /// January 1st through December 31st of `year`.
    pub fn calendar_year(year: i32) -> Self {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN);
        let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX);
        PeriodWindow { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days covered, both bounds included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn month_ref(&self) -> MonthRef {
        MonthRef::of(self.start)
    }

    pub fn previous(&self) -> MonthRef {
        MonthRef::of(
            self.start
                .checked_sub_months(Months::new(1))
                .unwrap_or(self.start),
        )
    }

    pub fn next(&self) -> MonthRef {
        MonthRef::of(
            self.start
                .checked_add_months(Months::new(1))
                .unwrap_or(self.start),
        )
    }

    /// 1-based week ordinal of `date`, counted in 7-day chunks from `start`.
    pub fn week_of(&self, date: NaiveDate) -> u32 {
        ((date - self.start).num_days().max(0) / 7 + 1) as u32
    }

    pub fn week_count(&self) -> u32 {
        ((self.days() + 6) / 7) as u32
    }

    /// Bounds of week `week`; the last week is clipped to `end`.
    pub fn week_bounds(&self, week: u32) -> (NaiveDate, NaiveDate) {
        let offset = u64::from(week.saturating_sub(1)) * 7;
        let start = self
            .start
            .checked_add_days(Days::new(offset))
            .unwrap_or(self.end);
        let end = start
            .checked_add_days(Days::new(6))
            .map_or(self.end, |d| d.min(self.end));
        (start, end)
    }
}

/// Resolves a report year; an unset year means the current one.
pub fn resolve_year(year: i32, today: NaiveDate) -> i32 {
    if year > UNSET_YEAR { year } else { today.year() }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}
