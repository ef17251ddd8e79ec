// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store::parse_stored_decimal;
use crate::utils::{current_user, fmt_amount, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceDrift {
    pub account: String,
    pub stored: Decimal,
    pub posted: Decimal,
}

pub fn handle(conn: &Connection) -> Result<()> {
    let user_id = current_user(conn)?;
    let mut rows = Vec::new();

    // 1) Stored balance differs from the sum of posted transactions
    for d in balance_drift(conn, user_id)? {
        rows.push(vec![
            "balance_drift".into(),
            format!(
                "{}: stored {} vs posted {}",
                d.account,
                fmt_amount(&d.stored),
                fmt_amount(&d.posted)
            ),
        ]);
    }

    // 2) Amount sign disagrees with the operation kind
    let mut stmt = conn.prepare(
        "SELECT id, amount, kind FROM transactions WHERE user_id=?1 ORDER BY id",
    )?;
    let mut cur = stmt.query(params![user_id])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let raw: String = r.get(1)?;
        let kind: String = r.get(2)?;
        let amount = parse_stored_decimal(&raw, "transaction", id)?;
        let bad = match kind.as_str() {
            "income" => amount.is_sign_negative() && !amount.is_zero(),
            _ => amount.is_sign_positive() && !amount.is_zero(),
        };
        if bad {
            rows.push(vec!["sign_mismatch".into(), format!("#{} {} {}", id, kind, raw)]);
        }
    }

    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

/// Accounts whose stored balance is not the sum of their transactions.
pub fn balance_drift(conn: &Connection, user_id: i64) -> Result<Vec<BalanceDrift>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.name, a.balance
         FROM accounts a JOIN account_types at ON at.id=a.account_type_id
         WHERE at.user_id=?1 ORDER BY a.name",
    )?;
    let accounts = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;
    let mut amounts = conn.prepare("SELECT id, amount FROM transactions WHERE account_id=?1")?;

    let mut drift = Vec::new();
    for acct in accounts {
        let (id, name, raw_balance) = acct?;
        let stored = parse_stored_decimal(&raw_balance, "account", id)?;
        let mut posted = Decimal::ZERO;
        let mut cur = amounts.query(params![id])?;
        while let Some(r) = cur.next()? {
            let tx_id: i64 = r.get(0)?;
            let raw: String = r.get(1)?;
            posted += parse_stored_decimal(&raw, "transaction", tx_id)?;
        }
        if stored != posted {
            drift.push(BalanceDrift {
                account: name,
                stored,
                posted,
            });
        }
    }
    Ok(drift)
}
