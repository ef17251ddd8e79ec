// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::OperationKind;
use crate::utils::{current_user, id_for_category, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let user_id = current_user(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let kind = parse_kind(sub.get_one::<String>("kind").unwrap())?;
            if name.is_empty() {
                return Err(anyhow!("Category name cannot be empty"));
            }
            conn.execute(
                "INSERT INTO categories(user_id, name, kind) VALUES (?1, ?2, ?3)",
                params![user_id, name, kind],
            )?;
            println!("Added {} category '{}'", kind, name);
        }
        Some(("list", sub)) => {
            let kind = sub
                .get_one::<String>("kind")
                .map(|k| parse_kind(k))
                .transpose()?;
            let mut stmt = conn.prepare(
                "SELECT name, kind FROM categories
                 WHERE user_id=?1 AND (?2 IS NULL OR kind=?2)
                 ORDER BY kind, name",
            )?;
            let rows = stmt.query_map(params![user_id, kind], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, OperationKind>(1)?))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (name, kind) = row?;
                data.push(vec![name, kind.to_string()]);
            }
            println!("{}", pretty_table(&["Category", "Kind"], data));
        }
        Some(("rename", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let to = sub.get_one::<String>("to").unwrap().trim();
            let id = id_for_category(conn, user_id, name)?;
            conn.execute("UPDATE categories SET name=?1 WHERE id=?2", params![to, id])?;
            println!("Renamed category '{}' to '{}'", name.trim(), to);
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = id_for_category(conn, user_id, name)?;
            let in_use: i64 = conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE category_id=?1",
                params![id],
                |r| r.get(0),
            )?;
            if in_use > 0 {
                return Err(anyhow!(
                    "Category '{}' is used by {} transaction(s)",
                    name.trim(),
                    in_use
                ));
            }
            conn.execute("DELETE FROM categories WHERE id=?1", params![id])?;
            println!("Removed category '{}'", name.trim());
        }
        _ => {}
    }
    Ok(())
}

pub fn parse_kind(s: &str) -> Result<OperationKind> {
    s.parse::<OperationKind>().map_err(|e| anyhow!(e))
}
