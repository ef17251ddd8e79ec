// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::categories::parse_kind;
use crate::ledger::{Ledger, NewTransaction, TransactionChanges};
use crate::models::{OperationKind, TransactionDetail};
use crate::period::PeriodWindow;
use crate::store::{LedgerStore, SqliteStore};
use crate::utils::{
    current_user, fmt_amount, id_for_account, id_for_category, maybe_print_json, month_year,
    parse_date, parse_decimal, pretty_table,
};
use anyhow::{Result, anyhow};
use chrono::Local;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let user_id = current_user(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => add(conn, user_id, sub)?,
        Some(("edit", sub)) => edit(conn, user_id, sub)?,
        Some(("rm", sub)) => remove(conn, user_id, sub)?,
        Some(("list", sub)) => list(conn, user_id, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d)?,
        None => Local::now().date_naive(),
    };
    let account_name = sub.get_one::<String>("account").unwrap();
    let category_name = sub.get_one::<String>("category").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let note = optional_note(sub);

    let account_id = id_for_account(conn, user_id, account_name)?;
    let category_id = id_for_category(conn, user_id, category_name)?;
    let store = SqliteStore::new(conn);
    let kind = match sub.get_one::<String>("kind") {
        Some(k) => parse_kind(k)?,
        None => category_kind(&store, user_id, category_id)?,
    };

    let tx = Ledger::new(store).create(
        user_id,
        NewTransaction {
            date,
            account_id,
            category_id,
            amount,
            note,
            kind,
        },
    )?;
    println!(
        "Recorded #{} {} {} on {} (acct: {}, category: {})",
        tx.id,
        kind,
        fmt_amount(&tx.amount),
        tx.date,
        account_name.trim(),
        category_name.trim()
    );
    Ok(())
}

fn edit(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let changes = TransactionChanges {
        date: sub.get_one::<String>("date").map(|d| parse_date(d)).transpose()?,
        account_id: sub
            .get_one::<String>("account")
            .map(|a| id_for_account(conn, user_id, a))
            .transpose()?,
        category_id: sub
            .get_one::<String>("category")
            .map(|c| id_for_category(conn, user_id, c))
            .transpose()?,
        amount: sub
            .get_one::<String>("amount")
            .map(|a| parse_decimal(a))
            .transpose()?,
        note: sub.contains_id("note").then(|| optional_note(sub)),
        kind: sub.get_one::<String>("kind").map(|k| parse_kind(k)).transpose()?,
    };

    let tx = Ledger::new(SqliteStore::new(conn)).edit(user_id, id, changes)?;
    println!(
        "Updated #{}: {} {} on {}",
        tx.id,
        tx.kind,
        fmt_amount(&tx.amount),
        tx.date
    );
    Ok(())
}

fn remove(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let tx = Ledger::new(SqliteStore::new(conn)).delete(user_id, id)?;
    println!("Removed #{} ({} on {})", tx.id, fmt_amount(&tx.amount), tx.date);
    Ok(())
}

fn list(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, user_id, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data.iter().map(detail_row).collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Account", "Category", "Kind", "Amount", "Note"],
                rows,
            )
        );
    }
    Ok(())
}

pub fn detail_row(d: &TransactionDetail) -> Vec<String> {
    let t = &d.transaction;
    vec![
        t.id.to_string(),
        t.date.to_string(),
        d.account.clone(),
        d.category.clone(),
        t.kind.to_string(),
        fmt_amount(&t.amount),
        t.note.clone().unwrap_or_default(),
    ]
}

/// Transactions of the requested month, newest first.
pub fn query_rows(
    conn: &Connection,
    user_id: i64,
    sub: &clap::ArgMatches,
) -> Result<Vec<TransactionDetail>> {
    let (month, year) = month_year(sub);
    let window = PeriodWindow::resolve(month, year);
    let account_id = sub
        .get_one::<String>("account")
        .map(|a| id_for_account(conn, user_id, a))
        .transpose()?;
    let mut rows = SqliteStore::new(conn).fetch_transactions(user_id, &window, account_id)?;
    if let Some(limit) = sub.get_one::<usize>("limit") {
        rows.truncate(*limit);
    }
    Ok(rows)
}

fn optional_note(sub: &clap::ArgMatches) -> Option<String> {
    sub.get_one::<String>("note")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn category_kind(
    store: &SqliteStore<'_>,
    user_id: i64,
    category_id: i64,
) -> Result<OperationKind> {
    store
        .fetch_category(category_id, user_id)?
        .map(|c| c.kind)
        .ok_or_else(|| anyhow!("Category {} not found", category_id))
}
