// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::period::PeriodWindow;
use crate::store::{LedgerStore, SqliteStore};
use crate::utils::{current_user, month_year};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, sub),
        _ => Ok(()),
    }
}

/// `--all`, a whole year (`--year` alone), or one month.
pub fn export_window(sub: &clap::ArgMatches) -> PeriodWindow {
    if sub.get_flag("all") {
        return PeriodWindow {
            start: NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX),
        };
    }
    let (month, year) = month_year(sub);
    if month == 0 && year > 0 {
        return PeriodWindow::calendar_year(year);
    }
    PeriodWindow::resolve(month, year)
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = current_user(conn)?;
    let fmt = sub.get_one::<String>("format").unwrap().trim().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap().trim();
    let window = export_window(sub);

    let mut rows = SqliteStore::new(conn).fetch_transactions(user_id, &window, None)?;
    rows.reverse();

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record(["date", "account", "category", "note", "amount", "kind"])?;
            for d in &rows {
                let t = &d.transaction;
                wtr.write_record([
                    t.date.to_string(),
                    d.account.clone(),
                    d.category.clone(),
                    t.note.clone().unwrap_or_default(),
                    t.amount.to_string(),
                    t.kind.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let items: Vec<_> = rows
                .iter()
                .map(|d| {
                    let t = &d.transaction;
                    json!({
                        "date": t.date, "account": d.account, "category": d.category,
                        "note": t.note, "amount": t.amount.to_string(), "kind": t.kind
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => return Err(anyhow!("Unknown format: {} (use csv|json)", fmt)),
    }
    println!(
        "Exported {} transactions ({} to {}) to {}",
        rows.len(),
        window.start,
        window.end,
        out
    );
    Ok(())
}
