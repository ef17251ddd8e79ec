// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::AccountType;
use crate::utils::{current_user, id_for_account_type, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let user_id = current_user(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            if name.is_empty() {
                return Err(anyhow!("Account type name cannot be empty"));
            }
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM account_types WHERE user_id=?1 AND name=?2)",
                params![user_id, name],
                |r| r.get(0),
            )?;
            if exists {
                return Err(anyhow!("Account type '{}' already exists", name));
            }
            conn.execute(
                "INSERT INTO account_types(user_id, name, position)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(position), 0) + 1 FROM account_types WHERE user_id=?1))",
                params![user_id, name],
            )?;
            println!("Added account type '{}'", name);
        }
        Some(("list", _)) => {
            let mut count =
                conn.prepare("SELECT COUNT(*) FROM accounts WHERE account_type_id=?1")?;
            let mut data = Vec::new();
            for t in account_types_for(conn, user_id)? {
                let n: i64 = count.query_row(params![t.id], |r| r.get(0))?;
                data.push(vec![t.position.to_string(), t.name, n.to_string()]);
            }
            println!("{}", pretty_table(&["#", "Account Type", "Accounts"], data));
        }
        Some(("rename", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let to = sub.get_one::<String>("to").unwrap().trim();
            let id = id_for_account_type(conn, user_id, name)?;
            conn.execute(
                "UPDATE account_types SET name=?1 WHERE id=?2",
                params![to, id],
            )?;
            println!("Renamed account type '{}' to '{}'", name.trim(), to);
        }
        Some(("reorder", sub)) => {
            let names: Vec<&String> = sub.get_many::<String>("names").unwrap().collect();
            reorder(conn, user_id, &names)?;
            println!("Reordered {} account types", names.len());
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = id_for_account_type(conn, user_id, name)?;
            let in_use: i64 = conn.query_row(
                "SELECT COUNT(*) FROM accounts WHERE account_type_id=?1",
                params![id],
                |r| r.get(0),
            )?;
            if in_use > 0 {
                return Err(anyhow!(
                    "Account type '{}' still has {} account(s)",
                    name.trim(),
                    in_use
                ));
            }
            conn.execute("DELETE FROM account_types WHERE id=?1", params![id])?;
            println!("Removed account type '{}'", name.trim());
        }
        _ => {}
    }
    Ok(())
}

pub fn account_types_for(conn: &Connection, user_id: i64) -> Result<Vec<AccountType>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, position FROM account_types
         WHERE user_id=?1 ORDER BY position, name",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok(AccountType {
            id: r.get(0)?,
            user_id: r.get(1)?,
            name: r.get(2)?,
            position: r.get(3)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Positions follow the order of `names`; every name must belong to the user.
pub fn reorder<S: AsRef<str>>(conn: &Connection, user_id: i64, names: &[S]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for (i, name) in names.iter().enumerate() {
        let id = id_for_account_type(&tx, user_id, name.as_ref())?;
        tx.execute(
            "UPDATE account_types SET position=?1 WHERE id=?2",
            params![(i + 1) as i64, id],
        )?;
    }
    tx.commit()?;
    Ok(())
}
