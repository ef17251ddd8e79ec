// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::identity::{end_session, find_user, start_session};
use crate::utils::current_user;
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let email = normalize_email(sub.get_one::<String>("email").unwrap())?;
            let tx = conn.unchecked_transaction()?;
            tx.execute("INSERT INTO users(email) VALUES (?1)", params![email])?;
            let id = tx.last_insert_rowid();
            seed_defaults(&tx, id)?;
            tx.commit()?;
            println!("Added user '{}'", email);
        }
        Some(("login", sub)) => {
            let email = normalize_email(sub.get_one::<String>("email").unwrap())?;
            let user = find_user(conn, &email)?;
            start_session(conn, user.id)?;
            println!("Logged in as {}", user.email);
        }
        Some(("logout", _)) => {
            end_session(conn)?;
            println!("Logged out");
        }
        Some(("whoami", _)) => {
            let id = current_user(conn)?;
            let email: String =
                conn.query_row("SELECT email FROM users WHERE id=?1", params![id], |r| {
                    r.get(0)
                })?;
            println!("{}", email);
        }
        _ => {}
    }
    Ok(())
}

fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(anyhow!("Invalid email '{}'", raw.trim()));
    }
    Ok(email)
}

/// New users start with one account type and a couple of categories so the
/// first `tx add` works without setup.
pub fn seed_defaults(conn: &Connection, user_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO account_types(user_id, name, position) VALUES (?1, 'Cash', 1)",
        params![user_id],
    )?;
    conn.execute(
        "INSERT INTO categories(user_id, name, kind) VALUES (?1, 'Salary', 'income'), (?1, 'General', 'expense')",
        params![user_id],
    )?;
    Ok(())
}
