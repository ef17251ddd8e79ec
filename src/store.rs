// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Storage seam for the ledger and the reports, with the SQLite backend.

use chrono::NaiveDate;
use rusqlite::{
    Connection, OptionalExtension, Row, Transaction as SqlTransaction, TransactionBehavior, params,
};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{BalanceDelta, Posting};
use crate::models::{Account, Category, OperationKind, Transaction, TransactionDetail};
use crate::period::PeriodWindow;

/// What the ledger and the report queries need from persistence. Every
/// lookup is scoped to a user; rows owned by someone else are `None`.
/// The `persist_*` calls write the row and apply `deltas` as one unit.
/// Update and delete first re-read the row inside that unit and refuse to
/// write unless it still posts `posted`.
pub trait LedgerStore {
    /// Transactions dated inside `window`, newest first.
    fn fetch_transactions(
        &self,
        user_id: i64,
        window: &PeriodWindow,
        account_id: Option<i64>,
    ) -> LedgerResult<Vec<TransactionDetail>>;

    fn fetch_transaction(&self, id: i64, user_id: i64) -> LedgerResult<Option<Transaction>>;

    fn fetch_account(&self, id: i64, user_id: i64) -> LedgerResult<Option<Account>>;

    fn fetch_category(&self, id: i64, user_id: i64) -> LedgerResult<Option<Category>>;

    /// Returns the id assigned to the new row.
    fn persist_create(
        &self,
        transaction: &Transaction,
        deltas: &[BalanceDelta],
    ) -> LedgerResult<i64>;

    fn persist_update(
        &self,
        transaction: &Transaction,
        posted: Posting,
        deltas: &[BalanceDelta],
    ) -> LedgerResult<()>;

    fn persist_delete(
        &self,
        transaction: &Transaction,
        posted: Posting,
        deltas: &[BalanceDelta],
    ) -> LedgerResult<()>;
}

#[derive(Clone, Copy)]
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        SqliteStore { conn }
    }

    /// Takes the write lock up front so balances read inside the unit
    /// cannot be changed underneath it.
    fn begin(&self) -> LedgerResult<SqlTransaction<'c>> {
        Ok(SqlTransaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

const TRANSACTION_COLUMNS: &str =
    "t.id, t.user_id, t.date, t.account_id, t.category_id, t.amount, t.note, t.kind";

struct RawTransaction {
    id: i64,
    user_id: i64,
    date: NaiveDate,
    account_id: i64,
    category_id: i64,
    amount: String,
    note: Option<String>,
    kind: OperationKind,
}

impl RawTransaction {
    fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawTransaction {
            id: r.get(0)?,
            user_id: r.get(1)?,
            date: r.get(2)?,
            account_id: r.get(3)?,
            category_id: r.get(4)?,
            amount: r.get(5)?,
            note: r.get(6)?,
            kind: r.get(7)?,
        })
    }

    fn into_transaction(self) -> LedgerResult<Transaction> {
        let amount = parse_stored_decimal(&self.amount, "transaction", self.id)?;
        Ok(Transaction {
            id: self.id,
            user_id: self.user_id,
            date: self.date,
            account_id: self.account_id,
            category_id: self.category_id,
            amount,
            note: self.note,
            kind: self.kind,
        })
    }
}

pub(crate) fn parse_stored_decimal(raw: &str, table: &str, id: i64) -> LedgerResult<Decimal> {
    raw.parse::<Decimal>().map_err(|e| {
        LedgerError::InvalidData(format!("amount '{}' on {} {}: {}", raw, table, id, e))
    })
}

/// Fails unless transaction `id` of `user_id` still posts `posted`.
fn check_posted(
    tx: &SqlTransaction<'_>,
    id: i64,
    user_id: i64,
    posted: Posting,
) -> LedgerResult<()> {
    let row: Option<(i64, String)> = tx
        .query_row(
            "SELECT account_id, amount FROM transactions WHERE id=?1 AND user_id=?2",
            params![id, user_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let (account_id, raw) =
        row.ok_or_else(|| LedgerError::not_found(format!("Transaction {}", id)))?;
    let amount = parse_stored_decimal(&raw, "transaction", id)?;
    if account_id != posted.account_id || amount != posted.amount {
        warn!(id, account_id, amount = %amount, "posting changed underneath the write");
        return Err(LedgerError::StalePosting(id));
    }
    Ok(())
}

/// Applies each delta to an account of `user_id`; any other account is
/// treated as missing.
fn apply_deltas(
    tx: &SqlTransaction<'_>,
    user_id: i64,
    deltas: &[BalanceDelta],
) -> LedgerResult<()> {
    for d in deltas {
        let current: Option<String> = tx
            .query_row(
                "SELECT a.balance FROM accounts a
                 JOIN account_types at ON at.id=a.account_type_id
                 WHERE a.id=?1 AND at.user_id=?2",
                params![d.account_id, user_id],
                |r| r.get(0),
            )
            .optional()?;
        let current = current
            .ok_or_else(|| LedgerError::not_found(format!("Account {}", d.account_id)))?;
        let balance = parse_stored_decimal(&current, "account", d.account_id)? + d.delta;
        tx.execute(
            "UPDATE accounts SET balance=?1 WHERE id=?2",
            params![balance.to_string(), d.account_id],
        )?;
        debug!(account = d.account_id, delta = %d.delta, balance = %balance, "balance adjusted");
    }
    Ok(())
}

impl LedgerStore for SqliteStore<'_> {
    fn fetch_transactions(
        &self,
        user_id: i64,
        window: &PeriodWindow,
        account_id: Option<i64>,
    ) -> LedgerResult<Vec<TransactionDetail>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS}, a.name, c.name
             FROM transactions t
             JOIN accounts a ON a.id=t.account_id
             JOIN categories c ON c.id=t.category_id
             WHERE t.user_id=?1 AND t.date BETWEEN ?2 AND ?3
               AND (?4 IS NULL OR t.account_id=?4)
             ORDER BY t.date DESC, t.id DESC"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(
            params![user_id, window.start, window.end, account_id],
            |r| {
                Ok((
                    RawTransaction::from_row(r)?,
                    r.get::<_, String>(8)?,
                    r.get::<_, String>(9)?,
                ))
            },
        )?;

        let mut data = Vec::new();
        for row in rows {
            let (raw, account, category) = row?;
            data.push(TransactionDetail {
                transaction: raw.into_transaction()?,
                account,
                category,
            });
        }
        debug!(user_id, count = data.len(), start = %window.start, end = %window.end, "fetched transactions");
        Ok(data)
    }

    fn fetch_transaction(&self, id: i64, user_id: i64) -> LedgerResult<Option<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE t.id=?1 AND t.user_id=?2"
        );
        let raw = self
            .conn
            .query_row(&sql, params![id, user_id], RawTransaction::from_row)
            .optional()?;
        raw.map(RawTransaction::into_transaction).transpose()
    }

    fn fetch_account(&self, id: i64, user_id: i64) -> LedgerResult<Option<Account>> {
        let row = self
            .conn
            .query_row(
                "SELECT a.id, a.account_type_id, a.name, a.description, a.balance
                 FROM accounts a
                 JOIN account_types at ON at.id=a.account_type_id
                 WHERE a.id=?1 AND at.user_id=?2",
                params![id, user_id],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, i64>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, Option<String>>(3)?,
                        r.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, account_type_id, name, description, balance)| -> LedgerResult<Account> {
            Ok(Account {
                id,
                account_type_id,
                name,
                description,
                balance: parse_stored_decimal(&balance, "account", id)?,
            })
        })
        .transpose()
    }

    fn fetch_category(&self, id: i64, user_id: i64) -> LedgerResult<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, name, kind FROM categories WHERE id=?1 AND user_id=?2",
                params![id, user_id],
                |r| {
                    Ok(Category {
                        id: r.get(0)?,
                        user_id: r.get(1)?,
                        name: r.get(2)?,
                        kind: r.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    fn persist_create(
        &self,
        transaction: &Transaction,
        deltas: &[BalanceDelta],
    ) -> LedgerResult<i64> {
        let tx = self.begin()?;
        tx.execute(
            "INSERT INTO transactions(user_id, date, account_id, category_id, amount, note, kind)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                transaction.user_id,
                transaction.date,
                transaction.account_id,
                transaction.category_id,
                transaction.amount.to_string(),
                transaction.note,
                transaction.kind
            ],
        )?;
        let id = tx.last_insert_rowid();
        apply_deltas(&tx, transaction.user_id, deltas)?;
        tx.commit()?;
        Ok(id)
    }

    fn persist_update(
        &self,
        transaction: &Transaction,
        posted: Posting,
        deltas: &[BalanceDelta],
    ) -> LedgerResult<()> {
        let tx = self.begin()?;
        check_posted(&tx, transaction.id, transaction.user_id, posted)?;
        tx.execute(
            "UPDATE transactions
             SET date=?1, account_id=?2, category_id=?3, amount=?4, note=?5, kind=?6
             WHERE id=?7 AND user_id=?8",
            params![
                transaction.date,
                transaction.account_id,
                transaction.category_id,
                transaction.amount.to_string(),
                transaction.note,
                transaction.kind,
                transaction.id,
                transaction.user_id
            ],
        )?;
        apply_deltas(&tx, transaction.user_id, deltas)?;
        tx.commit()?;
        Ok(())
    }

    fn persist_delete(
        &self,
        transaction: &Transaction,
        posted: Posting,
        deltas: &[BalanceDelta],
    ) -> LedgerResult<()> {
        let tx = self.begin()?;
        check_posted(&tx, transaction.id, transaction.user_id, posted)?;
        tx.execute(
            "DELETE FROM transactions WHERE id=?1 AND user_id=?2",
            params![transaction.id, transaction.user_id],
        )?;
        apply_deltas(&tx, transaction.user_id, deltas)?;
        tx.commit()?;
        Ok(())
    }
}
