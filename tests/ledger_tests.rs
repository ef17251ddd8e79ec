// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use pocketledger::commands::doctor::balance_drift;
use pocketledger::db;
use pocketledger::error::{LedgerError, LedgerResult};
use pocketledger::ledger::{
    BalanceDelta, Ledger, NewTransaction, Posting, TransactionChanges, TransactionUpdate,
    normalize_amount,
};
use pocketledger::models::{Account, Category, OperationKind, Transaction, TransactionDetail};
use pocketledger::period::PeriodWindow;
use pocketledger::store::{LedgerStore, SqliteStore};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use tempfile::tempdir;

const USER: i64 = 1;
const OTHER_USER: i64 = 2;
const ACCT_X: i64 = 1;
const ACCT_Y: i64 = 2;
const OTHER_ACCT: i64 = 3;
const SALARY: i64 = 1;
const FOOD: i64 = 2;
const OTHER_CAT: i64 = 3;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    seed(&conn);
    conn
}

fn seed(conn: &Connection) {
    db::init_schema(conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO users(id, email) VALUES (1, 'ana@example.com'), (2, 'bo@example.com');
        INSERT INTO account_types(id, user_id, name, position) VALUES (1, 1, 'Bank', 1), (2, 2, 'Bank', 1);
        INSERT INTO accounts(id, account_type_id, name, balance) VALUES
            (1, 1, 'X', '0'), (2, 1, 'Y', '0'), (3, 2, 'Other', '0');
        INSERT INTO categories(id, user_id, name, kind) VALUES
            (1, 1, 'Salary', 'income'), (2, 1, 'Food', 'expense'), (3, 2, 'Food', 'expense');
        "#,
    )
    .unwrap();
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str_exact(s).unwrap()
}

fn balance(conn: &Connection, account_id: i64) -> Decimal {
    let raw: String = conn
        .query_row(
            "SELECT balance FROM accounts WHERE id=?1",
            params![account_id],
            |r| r.get(0),
        )
        .unwrap();
    raw.parse().unwrap()
}

fn tx_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap()
}

fn income(account_id: i64, amount: &str) -> NewTransaction {
    NewTransaction {
        date: d(2024, 5, 10),
        account_id,
        category_id: SALARY,
        amount: dec(amount),
        note: None,
        kind: OperationKind::Income,
    }
}

fn expense(account_id: i64, amount: &str) -> NewTransaction {
    NewTransaction {
        date: d(2024, 5, 11),
        account_id,
        category_id: FOOD,
        amount: dec(amount),
        note: Some("groceries".into()),
        kind: OperationKind::Expense,
    }
}

#[test]
fn normalization_is_idempotent() {
    for raw in ["0", "12.34", "-12.34", "1000000.01"] {
        let x = dec(raw);
        for kind in [OperationKind::Income, OperationKind::Expense] {
            let once = normalize_amount(x, kind);
            assert_eq!(normalize_amount(once, kind), once);
        }
    }
    assert_eq!(normalize_amount(dec("40"), OperationKind::Expense), dec("-40"));
    assert_eq!(normalize_amount(dec("40"), OperationKind::Income), dec("40"));
}

#[test]
fn create_posts_signed_amount() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));

    let paid = ledger.create(USER, income(ACCT_X, "100")).unwrap();
    let spent = ledger.create(USER, expense(ACCT_X, "30.25")).unwrap();

    assert_eq!(paid.amount, dec("100"));
    assert_eq!(spent.amount, dec("-30.25"));
    assert_eq!(balance(&conn, ACCT_X), dec("69.75"));

    let stored = ledger.store().fetch_transaction(spent.id, USER).unwrap().unwrap();
    assert_eq!(stored, spent);
}

#[test]
fn scenario_income_edited_to_expense() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));

    let tx = ledger.create(USER, income(ACCT_X, "100")).unwrap();
    assert_eq!(balance(&conn, ACCT_X), dec("100"));

    let updated = ledger
        .update(
            USER,
            TransactionUpdate {
                id: tx.id,
                date: tx.date,
                account_id: ACCT_X,
                category_id: FOOD,
                amount: dec("40"),
                note: None,
                kind: OperationKind::Expense,
                previous_amount: tx.amount,
                previous_account_id: tx.account_id,
            },
        )
        .unwrap();

    assert_eq!(updated.amount, dec("-40"));
    assert_eq!(balance(&conn, ACCT_X), dec("-40"));
}

#[test]
fn scenario_move_expense_between_accounts() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));

    let tx = ledger.create(USER, expense(ACCT_X, "50")).unwrap();
    assert_eq!(balance(&conn, ACCT_X), dec("-50"));

    ledger
        .edit(
            USER,
            tx.id,
            TransactionChanges {
                account_id: Some(ACCT_Y),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(balance(&conn, ACCT_X), dec("0"));
    assert_eq!(balance(&conn, ACCT_Y), dec("-50"));
}

#[test]
fn update_with_identical_values_is_net_zero() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));
    let tx = ledger.create(USER, expense(ACCT_X, "18.40")).unwrap();
    let before = balance(&conn, ACCT_X);

    ledger
        .update(
            USER,
            TransactionUpdate {
                id: tx.id,
                date: tx.date,
                account_id: tx.account_id,
                category_id: tx.category_id,
                amount: dec("18.40"),
                note: tx.note.clone(),
                kind: tx.kind,
                previous_amount: tx.amount,
                previous_account_id: tx.account_id,
            },
        )
        .unwrap();

    assert_eq!(balance(&conn, ACCT_X), before);
}

#[test]
fn note_and_date_edit_keeps_balance() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));
    let tx = ledger.create(USER, expense(ACCT_X, "7")).unwrap();

    let edited = ledger
        .edit(
            USER,
            tx.id,
            TransactionChanges {
                date: Some(d(2024, 6, 1)),
                note: Some(Some("bakery".into())),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(edited.date, d(2024, 6, 1));
    assert_eq!(edited.note.as_deref(), Some("bakery"));
    assert_eq!(edited.amount, dec("-7"));
    assert_eq!(balance(&conn, ACCT_X), dec("-7"));
}

#[test]
fn edit_to_new_category_takes_its_kind() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));
    let tx = ledger.create(USER, expense(ACCT_X, "25")).unwrap();

    let edited = ledger
        .edit(
            USER,
            tx.id,
            TransactionChanges {
                category_id: Some(SALARY),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(edited.kind, OperationKind::Income);
    assert_eq!(edited.amount, dec("25"));
    assert_eq!(balance(&conn, ACCT_X), dec("25"));
}

#[test]
fn delete_reverses_posting() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));
    ledger.create(USER, income(ACCT_X, "100")).unwrap();
    let spent = ledger.create(USER, expense(ACCT_X, "60")).unwrap();

    let removed = ledger.delete(USER, spent.id).unwrap();

    assert_eq!(removed.id, spent.id);
    assert_eq!(balance(&conn, ACCT_X), dec("100"));
    assert_eq!(tx_count(&conn), 1);
}

#[test]
fn zero_amount_is_accepted() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));
    let tx = ledger.create(USER, expense(ACCT_X, "0")).unwrap();
    assert!(tx.amount.is_zero());
    assert_eq!(balance(&conn, ACCT_X), Decimal::ZERO);
    assert_eq!(tx_count(&conn), 1);
}

#[test]
fn foreign_account_is_rejected_before_writing() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));

    let err = ledger.create(USER, income(OTHER_ACCT, "10")).unwrap_err();

    assert!(matches!(err, LedgerError::ReferenceNotFound(_)));
    assert_eq!(tx_count(&conn), 0);
    assert_eq!(balance(&conn, OTHER_ACCT), Decimal::ZERO);
}

#[test]
fn foreign_category_is_rejected() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));
    let mut new = expense(ACCT_X, "10");
    new.category_id = OTHER_CAT;

    let err = ledger.create(USER, new).unwrap_err();

    assert!(matches!(err, LedgerError::ReferenceNotFound(_)));
    assert_eq!(balance(&conn, ACCT_X), Decimal::ZERO);
}

#[test]
fn category_kind_must_match() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));
    let mut new = income(ACCT_X, "10");
    new.category_id = FOOD;

    let err = ledger.create(USER, new).unwrap_err();

    assert!(matches!(err, LedgerError::KindMismatch { .. }));
    assert_eq!(tx_count(&conn), 0);
}

#[test]
fn update_rejects_move_to_foreign_account() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));
    let tx = ledger.create(USER, expense(ACCT_X, "50")).unwrap();

    let err = ledger
        .edit(
            USER,
            tx.id,
            TransactionChanges {
                account_id: Some(OTHER_ACCT),
                ..Default::default()
            },
        )
        .unwrap_err();

    assert!(matches!(err, LedgerError::ReferenceNotFound(_)));
    assert_eq!(balance(&conn, ACCT_X), dec("-50"));
    assert_eq!(balance(&conn, OTHER_ACCT), Decimal::ZERO);
}

#[test]
fn other_users_transaction_is_not_found() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));
    let tx = ledger.create(USER, expense(ACCT_X, "50")).unwrap();

    let err = ledger.delete(OTHER_USER, tx.id).unwrap_err();
    assert!(matches!(err, LedgerError::ReferenceNotFound(_)));

    let err = ledger
        .edit(OTHER_USER, tx.id, TransactionChanges::default())
        .unwrap_err();
    assert!(matches!(err, LedgerError::ReferenceNotFound(_)));

    assert_eq!(tx_count(&conn), 1);
    assert_eq!(balance(&conn, ACCT_X), dec("-50"));
}

#[test]
fn failed_posting_rolls_back_the_row() {
    let conn = setup();
    let store = SqliteStore::new(&conn);
    let tx = Transaction {
        id: 0,
        user_id: USER,
        date: d(2024, 5, 1),
        account_id: ACCT_X,
        category_id: SALARY,
        amount: dec("10"),
        note: None,
        kind: OperationKind::Income,
    };

    let err = store
        .persist_create(
            &tx,
            &[
                BalanceDelta::new(ACCT_X, dec("10")),
                BalanceDelta::new(999, dec("10")),
            ],
        )
        .unwrap_err();

    assert!(matches!(err, LedgerError::ReferenceNotFound(_)));
    assert_eq!(tx_count(&conn), 0);
    assert_eq!(balance(&conn, ACCT_X), Decimal::ZERO);
}

#[test]
fn balance_matches_postings_after_mixed_operations() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));

    // Small deterministic LCG so the sequence is reproducible.
    let mut seed: u64 = 42;
    let mut next = move || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (seed >> 33) as i64
    };

    let mut live: Vec<i64> = Vec::new();
    for step in 0..120 {
        let account = if next() % 2 == 0 { ACCT_X } else { ACCT_Y };
        let amount = Decimal::new(next() % 100_000, 2);
        match next() % 4 {
            0 | 1 => {
                let new = if next() % 2 == 0 {
                    NewTransaction { amount, ..income(account, "0") }
                } else {
                    NewTransaction { amount, ..expense(account, "0") }
                };
                live.push(ledger.create(USER, new).unwrap().id);
            }
            2 if !live.is_empty() => {
                let id = live[(next() as usize) % live.len()];
                let flip = next() % 3 == 0;
                ledger
                    .edit(
                        USER,
                        id,
                        TransactionChanges {
                            account_id: Some(account),
                            amount: Some(amount),
                            category_id: flip.then_some(if next() % 2 == 0 { SALARY } else { FOOD }),
                            ..Default::default()
                        },
                    )
                    .unwrap();
            }
            3 if !live.is_empty() => {
                let idx = (next() as usize) % live.len();
                ledger.delete(USER, live.swap_remove(idx)).unwrap();
            }
            _ => {}
        }
        let drift = balance_drift(&conn, USER).unwrap();
        assert!(drift.is_empty(), "step {}: {:?}", step, drift);
    }
}

#[test]
fn update_rejects_previous_posting_on_foreign_account() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));
    let tx = ledger.create(USER, expense(ACCT_X, "50")).unwrap();

    let err = ledger
        .update(
            USER,
            TransactionUpdate {
                id: tx.id,
                date: tx.date,
                account_id: ACCT_X,
                category_id: FOOD,
                amount: dec("50"),
                note: None,
                kind: OperationKind::Expense,
                previous_amount: dec("999"),
                previous_account_id: OTHER_ACCT,
            },
        )
        .unwrap_err();

    assert!(matches!(err, LedgerError::StalePosting(id) if id == tx.id));
    assert_eq!(balance(&conn, ACCT_X), dec("-50"));
    assert_eq!(balance(&conn, OTHER_ACCT), Decimal::ZERO);
}

#[test]
fn update_rejects_wrong_previous_amount() {
    let conn = setup();
    let ledger = Ledger::new(SqliteStore::new(&conn));
    let tx = ledger.create(USER, expense(ACCT_X, "50")).unwrap();

    let err = ledger
        .update(
            USER,
            TransactionUpdate {
                id: tx.id,
                date: tx.date,
                account_id: ACCT_Y,
                category_id: FOOD,
                amount: dec("20"),
                note: None,
                kind: OperationKind::Expense,
                previous_amount: dec("-30"),
                previous_account_id: ACCT_X,
            },
        )
        .unwrap_err();

    assert!(matches!(err, LedgerError::StalePosting(_)));
    assert_eq!(balance(&conn, ACCT_X), dec("-50"));
    assert_eq!(balance(&conn, ACCT_Y), Decimal::ZERO);
    assert!(balance_drift(&conn, USER).unwrap().is_empty());
}

#[test]
fn balance_updates_never_touch_other_users_accounts() {
    let conn = setup();
    let store = SqliteStore::new(&conn);
    let tx = Transaction {
        id: 0,
        user_id: USER,
        date: d(2024, 5, 1),
        account_id: ACCT_X,
        category_id: SALARY,
        amount: dec("10"),
        note: None,
        kind: OperationKind::Income,
    };

    let err = store
        .persist_create(&tx, &[BalanceDelta::new(OTHER_ACCT, dec("10"))])
        .unwrap_err();

    assert!(matches!(err, LedgerError::ReferenceNotFound(_)));
    assert_eq!(balance(&conn, OTHER_ACCT), Decimal::ZERO);
    assert_eq!(tx_count(&conn), 0);
}

/// Runs `before_write` right before each update or delete reaches the
/// database, standing in for a second process writing in between.
struct Interleaved<'c, F: Fn()> {
    inner: SqliteStore<'c>,
    before_write: F,
}

impl<F: Fn()> LedgerStore for Interleaved<'_, F> {
    fn fetch_transactions(
        &self,
        user_id: i64,
        window: &PeriodWindow,
        account_id: Option<i64>,
    ) -> LedgerResult<Vec<TransactionDetail>> {
        self.inner.fetch_transactions(user_id, window, account_id)
    }

    fn fetch_transaction(&self, id: i64, user_id: i64) -> LedgerResult<Option<Transaction>> {
        self.inner.fetch_transaction(id, user_id)
    }

    fn fetch_account(&self, id: i64, user_id: i64) -> LedgerResult<Option<Account>> {
        self.inner.fetch_account(id, user_id)
    }

    fn fetch_category(&self, id: i64, user_id: i64) -> LedgerResult<Option<Category>> {
        self.inner.fetch_category(id, user_id)
    }

    fn persist_create(
        &self,
        transaction: &Transaction,
        deltas: &[BalanceDelta],
    ) -> LedgerResult<i64> {
        self.inner.persist_create(transaction, deltas)
    }

    fn persist_update(
        &self,
        transaction: &Transaction,
        posted: Posting,
        deltas: &[BalanceDelta],
    ) -> LedgerResult<()> {
        (self.before_write)();
        self.inner.persist_update(transaction, posted, deltas)
    }

    fn persist_delete(
        &self,
        transaction: &Transaction,
        posted: Posting,
        deltas: &[BalanceDelta],
    ) -> LedgerResult<()> {
        (self.before_write)();
        self.inner.persist_delete(transaction, posted, deltas)
    }
}

fn raise_to_80(conn: &Connection, id: i64) {
    Ledger::new(SqliteStore::new(conn))
        .edit(
            USER,
            id,
            TransactionChanges {
                amount: Some(dec("80")),
                ..Default::default()
            },
        )
        .unwrap();
}

#[test]
fn delete_refuses_row_changed_by_another_connection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite");
    let conn = Connection::open(&path).unwrap();
    seed(&conn);
    let other = Connection::open(&path).unwrap();

    let tx = Ledger::new(SqliteStore::new(&conn))
        .create(USER, expense(ACCT_X, "50"))
        .unwrap();
    let ledger = Ledger::new(Interleaved {
        inner: SqliteStore::new(&conn),
        before_write: || raise_to_80(&other, tx.id),
    });

    let err = ledger.delete(USER, tx.id).unwrap_err();

    assert!(matches!(err, LedgerError::StalePosting(_)));
    assert_eq!(tx_count(&conn), 1);
    assert_eq!(balance(&conn, ACCT_X), dec("-80"));
    assert!(balance_drift(&conn, USER).unwrap().is_empty());
}

#[test]
fn edit_refuses_row_changed_by_another_connection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite");
    let conn = Connection::open(&path).unwrap();
    seed(&conn);
    let other = Connection::open(&path).unwrap();

    let tx = Ledger::new(SqliteStore::new(&conn))
        .create(USER, expense(ACCT_X, "50"))
        .unwrap();
    let ledger = Ledger::new(Interleaved {
        inner: SqliteStore::new(&conn),
        before_write: || raise_to_80(&other, tx.id),
    });

    let err = ledger
        .edit(
            USER,
            tx.id,
            TransactionChanges {
                account_id: Some(ACCT_Y),
                ..Default::default()
            },
        )
        .unwrap_err();

    assert!(matches!(err, LedgerError::StalePosting(_)));
    assert_eq!(balance(&conn, ACCT_X), dec("-80"));
    assert_eq!(balance(&conn, ACCT_Y), Decimal::ZERO);
    assert!(balance_drift(&conn, USER).unwrap().is_empty());
}
