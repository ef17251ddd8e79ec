// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregate;
use crate::commands::reports::print_detailed;
use crate::store::{SqliteStore, parse_stored_decimal};
use crate::utils::{
    current_user, fmt_amount, id_for_account, id_for_account_type, maybe_print_json, month_year,
    pretty_table,
};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let user_id = current_user(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let typ = sub.get_one::<String>("type").unwrap();
            let description = sub
                .get_one::<String>("description")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            if name.is_empty() {
                return Err(anyhow!("Account name cannot be empty"));
            }
            if id_for_account(conn, user_id, name).is_ok() {
                return Err(anyhow!("Account '{}' already exists", name));
            }
            let type_id = id_for_account_type(conn, user_id, typ)?;
            conn.execute(
                "INSERT INTO accounts(account_type_id, name, description, balance) VALUES (?1, ?2, ?3, '0')",
                params![type_id, name, description],
            )?;
            println!("Added account '{}' ({})", name, typ.trim());
        }
        Some(("list", sub)) => {
            let json_flag = sub.get_flag("json");
            let jsonl_flag = sub.get_flag("jsonl");
            let groups = accounts_by_type(conn, user_id)?;
            if !maybe_print_json(json_flag, jsonl_flag, &groups)? {
                let mut data = Vec::new();
                for g in &groups {
                    data.push(vec![g.account_type.clone(), String::new(), fmt_amount(&g.total)]);
                    for a in &g.accounts {
                        data.push(vec![String::new(), a.name.clone(), fmt_amount(&a.balance)]);
                    }
                }
                println!("{}", pretty_table(&["Type", "Account", "Balance"], data));
            }
        }
        Some(("edit", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = id_for_account(conn, user_id, name)?;
            if let Some(new_name) = sub.get_one::<String>("rename").map(|s| s.trim()) {
                if new_name.is_empty() {
                    return Err(anyhow!("Account name cannot be empty"));
                }
                if id_for_account(conn, user_id, new_name).is_ok_and(|other| other != id) {
                    return Err(anyhow!("Account '{}' already exists", new_name));
                }
                conn.execute(
                    "UPDATE accounts SET name=?1 WHERE id=?2",
                    params![new_name, id],
                )?;
            }
            if let Some(desc) = sub.get_one::<String>("description") {
                let desc = Some(desc.trim()).filter(|s| !s.is_empty());
                conn.execute(
                    "UPDATE accounts SET description=?1 WHERE id=?2",
                    params![desc, id],
                )?;
            }
            if let Some(typ) = sub.get_one::<String>("type") {
                let type_id = id_for_account_type(conn, user_id, typ)?;
                conn.execute(
                    "UPDATE accounts SET account_type_id=?1 WHERE id=?2",
                    params![type_id, id],
                )?;
            }
            println!("Updated account '{}'", name.trim());
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = id_for_account(conn, user_id, name)?;
            // Its transactions go with it (ON DELETE CASCADE).
            conn.execute("DELETE FROM accounts WHERE id=?1", params![id])?;
            println!("Removed account '{}'", name.trim());
        }
        Some(("show", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = id_for_account(conn, user_id, name)?;
            let (month, year) = month_year(sub);
            let report =
                aggregate::detailed_by_account(&SqliteStore::new(conn), user_id, id, month, year)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &report)? {
                println!("Account: {}", name.trim());
                print_detailed(&report);
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct AccountBalance {
    pub name: String,
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct AccountTypeGroup {
    pub account_type: String,
    pub total: Decimal,
    pub accounts: Vec<AccountBalance>,
}

/// Accounts grouped under their type, in account type display order.
pub fn accounts_by_type(conn: &Connection, user_id: i64) -> Result<Vec<AccountTypeGroup>> {
    let mut stmt = conn.prepare(
        "SELECT at.name, a.id, a.name, a.balance
         FROM accounts a JOIN account_types at ON at.id=a.account_type_id
         WHERE at.user_id=?1
         ORDER BY at.position, at.name, a.name",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;

    let mut groups: Vec<AccountTypeGroup> = Vec::new();
    for row in rows {
        let (type_name, id, name, raw_balance) = row?;
        let balance = parse_stored_decimal(&raw_balance, "account", id)?;
        if groups.last().is_none_or(|g| g.account_type != type_name) {
            groups.push(AccountTypeGroup {
                account_type: type_name,
                total: Decimal::ZERO,
                accounts: Vec::new(),
            });
        }
        let group = groups.last_mut().expect("group just added");
        group.total += balance;
        group.accounts.push(AccountBalance { name, balance });
    }
    Ok(groups)
}
