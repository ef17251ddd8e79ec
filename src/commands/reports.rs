// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregate::{self, DetailedReport};
use crate::buckets::ReportBucket;
use crate::commands::transactions::detail_row;
use crate::store::SqliteStore;
use crate::utils::{
    current_user, fmt_amount, id_for_account, maybe_print_json, month_year, parse_date,
    pretty_table,
};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let user_id = current_user(conn)?;
    let store = SqliteStore::new(conn);
    match m.subcommand() {
        Some(("detailed", sub)) => {
            let (month, year) = month_year(sub);
            let report = match sub.get_one::<String>("account") {
                Some(name) => {
                    let account_id = id_for_account(conn, user_id, name)?;
                    aggregate::detailed_by_account(&store, user_id, account_id, month, year)?
                }
                None => aggregate::detailed(&store, user_id, month, year)?,
            };
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &report)? {
                print_detailed(&report);
            }
        }
        Some(("weekly", sub)) => {
            let (month, year) = month_year(sub);
            let report = aggregate::weekly(&store, user_id, month, year)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &report)? {
                println!("Weeks of {}", report.window.start.format("%Y-%m"));
                let rows = report
                    .weeks
                    .iter()
                    .map(|b| {
                        bucket_row(
                            b,
                            format!("{} to {}", b.start.format("%d/%m"), b.end.format("%d/%m")),
                        )
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Week", "Income", "Expense", "Net"], rows)
                );
                print_totals(report.totals.income, report.totals.expense);
                println!(
                    "Previous: --month {} --year {} | Next: --month {} --year {}",
                    report.previous.month, report.previous.year, report.next.month, report.next.year
                );
            }
        }
        Some(("monthly", sub)) => {
            let year = sub.get_one::<i32>("year").copied().unwrap_or(0);
            let report = aggregate::monthly(&store, user_id, year)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &report)? {
                println!("Year {}", report.year);
                let rows = report
                    .months
                    .iter()
                    .map(|b| bucket_row(b, b.start.format("%B").to_string()))
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Month", "Income", "Expense", "Net"], rows)
                );
                print_totals(report.totals.income, report.totals.expense);
            }
        }
        Some(("calendar", sub)) => {
            let from = parse_date(sub.get_one::<String>("from").unwrap())?;
            let to = parse_date(sub.get_one::<String>("to").unwrap())?;
            let events: Vec<CalendarEvent> = aggregate::between(&store, user_id, from, to)?
                .into_iter()
                .map(|d| CalendarEvent {
                    title: fmt_amount(&d.transaction.amount),
                    date: d.transaction.date.to_string(),
                    kind: d.transaction.kind.to_string(),
                    account: d.account,
                    category: d.category,
                })
                .collect();
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &events)? {
                let rows = events
                    .iter()
                    .map(|e| {
                        vec![
                            e.date.clone(),
                            e.title.clone(),
                            e.kind.clone(),
                            e.account.clone(),
                            e.category.clone(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Date", "Amount", "Kind", "Account", "Category"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct CalendarEvent {
    pub title: String,
    pub date: String,
    pub kind: String,
    pub account: String,
    pub category: String,
}

fn bucket_row(b: &ReportBucket<u32>, label: String) -> Vec<String> {
    vec![
        label,
        fmt_amount(&b.income),
        fmt_amount(&b.expense.abs()),
        fmt_amount(&b.totals().net()),
    ]
}

fn print_totals(income: Decimal, expense: Decimal) {
    println!(
        "Income: {}  Expense: {}  Net: {}",
        fmt_amount(&income),
        fmt_amount(&expense.abs()),
        fmt_amount(&(income + expense))
    );
}

pub fn print_detailed(report: &DetailedReport) {
    println!("{} to {}", report.window.start, report.window.end);
    if report.groups.is_empty() {
        println!("(no transactions)");
    }
    for g in &report.groups {
        let rows = g.transactions.iter().map(detail_row).collect();
        println!(
            "{}  income {}  expense {}",
            g.date.format("%a %d %b %Y"),
            fmt_amount(&g.totals.income),
            fmt_amount(&g.totals.expense.abs())
        );
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Account", "Category", "Kind", "Amount", "Note"],
                rows
            )
        );
    }
    print_totals(report.totals.income, report.totals.expense);
    println!(
        "Previous: --month {} --year {} | Next: --month {} --year {}",
        report.previous.month, report.previous.year, report.next.month, report.next.year
    );
}
