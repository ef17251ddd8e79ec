// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{LedgerError, LedgerResult};
use crate::models::User;

const SESSION_KEY: &str = "session_user";

/// Resolves who is making the request. Called once per command; the id is
/// then passed explicitly to the ledger and report functions.
pub trait Identity {
    fn current_user_id(&self) -> LedgerResult<i64>;
}

/// Session persisted in the `settings` table by `user login`.
pub struct SessionIdentity<'c> {
    conn: &'c Connection,
}

impl<'c> SessionIdentity<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        SessionIdentity { conn }
    }
}

impl Identity for SessionIdentity<'_> {
    fn current_user_id(&self) -> LedgerResult<i64> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key=?1",
                params![SESSION_KEY],
                |r| r.get(0),
            )
            .optional()?;
        let id = raw
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or(LedgerError::Unauthenticated)?;
        // The user may have been removed since logging in.
        let exists: Option<i64> = self
            .conn
            .query_row("SELECT id FROM users WHERE id=?1", params![id], |r| r.get(0))
            .optional()?;
        exists.ok_or(LedgerError::Unauthenticated)
    }
}

pub fn start_session(conn: &Connection, user_id: i64) -> LedgerResult<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![SESSION_KEY, user_id.to_string()],
    )?;
    Ok(())
}

pub fn end_session(conn: &Connection) -> LedgerResult<()> {
    conn.execute("DELETE FROM settings WHERE key=?1", params![SESSION_KEY])?;
    Ok(())
}

pub fn find_user(conn: &Connection, email: &str) -> LedgerResult<User> {
    conn.query_row(
        "SELECT id, email FROM users WHERE email=?1",
        params![email],
        |r| {
            Ok(User {
                id: r.get(0)?,
                email: r.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found(format!("User '{}'", email)))
}
