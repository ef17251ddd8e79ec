// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Transaction mutations and the account postings they imply.
//!
//! Every write goes through [`Ledger`], which validates references against
//! the requesting user, normalizes the amount sign from the operation kind,
//! and hands the store the row together with the balance deltas so both are
//! committed as one unit.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, OperationKind, Transaction};
use crate::store::LedgerStore;

/// Canonical stored amount: expenses negative, income non-negative.
pub fn normalize_amount(amount: Decimal, kind: OperationKind) -> Decimal {
    match kind {
        OperationKind::Income => amount.abs(),
        OperationKind::Expense => -amount.abs(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDelta {
    pub account_id: i64,
    pub delta: Decimal,
}

impl BalanceDelta {
    pub fn new(account_id: i64, delta: Decimal) -> Self {
        BalanceDelta { account_id, delta }
    }
}

/// What a stored transaction currently contributes to an account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub account_id: i64,
    pub amount: Decimal,
}

impl Posting {
    pub fn of(transaction: &Transaction) -> Self {
        Posting {
            account_id: transaction.account_id,
            amount: transaction.amount,
        }
    }
}

/// Reverse the old posting, then apply the new one. Both entries are kept
/// even when they hit the same account; applied in order they net out.
pub fn repost(
    previous_account_id: i64,
    previous_amount: Decimal,
    account_id: i64,
    amount: Decimal,
) -> [BalanceDelta; 2] {
    [
        BalanceDelta::new(previous_account_id, -previous_amount),
        BalanceDelta::new(account_id, amount),
    ]
}

/// Input for a new transaction. `amount` is the magnitude as entered.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub account_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub note: Option<String>,
    pub kind: OperationKind,
}

/// Full replacement of a stored transaction. `previous_amount` is the
/// signed amount currently posted to `previous_account_id`; both must match
/// the stored row or the update is rejected.
#[derive(Debug, Clone)]
pub struct TransactionUpdate {
    pub id: i64,
    pub date: NaiveDate,
    pub account_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub note: Option<String>,
    pub kind: OperationKind,
    pub previous_amount: Decimal,
    pub previous_account_id: i64,
}

/// Partial edit; unset fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct TransactionChanges {
    pub date: Option<NaiveDate>,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub amount: Option<Decimal>,
    pub note: Option<Option<String>>,
    pub kind: Option<OperationKind>,
}

pub struct Ledger<S> {
    store: S,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Ledger { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn create(&self, user_id: i64, new: NewTransaction) -> LedgerResult<Transaction> {
        self.check_references(user_id, new.account_id, new.category_id, new.kind)?;

        let mut transaction = Transaction {
            id: 0,
            user_id,
            date: new.date,
            account_id: new.account_id,
            category_id: new.category_id,
            amount: normalize_amount(new.amount, new.kind),
            note: new.note,
            kind: new.kind,
        };
        let deltas = [BalanceDelta::new(transaction.account_id, transaction.amount)];
        debug!(?deltas, "posting new transaction");

        transaction.id = self.store.persist_create(&transaction, &deltas)?;
        info!(
            id = transaction.id,
            account = transaction.account_id,
            amount = %transaction.amount,
            "transaction created"
        );
        Ok(transaction)
    }

    pub fn update(&self, user_id: i64, update: TransactionUpdate) -> LedgerResult<Transaction> {
        let current = self
            .store
            .fetch_transaction(update.id, user_id)?
            .ok_or_else(|| {
                warn!(id = update.id, user_id, "update of unknown transaction");
                LedgerError::not_found(format!("Transaction {}", update.id))
            })?;
        let posted = Posting::of(&current);
        if posted.account_id != update.previous_account_id || posted.amount != update.previous_amount
        {
            warn!(
                id = update.id,
                stored_account = posted.account_id,
                stored_amount = %posted.amount,
                given_account = update.previous_account_id,
                given_amount = %update.previous_amount,
                "update with stale previous posting"
            );
            return Err(LedgerError::StalePosting(update.id));
        }
        self.check_references(user_id, update.account_id, update.category_id, update.kind)?;

        let transaction = Transaction {
            id: update.id,
            user_id,
            date: update.date,
            account_id: update.account_id,
            category_id: update.category_id,
            amount: normalize_amount(update.amount, update.kind),
            note: update.note,
            kind: update.kind,
        };
        let deltas = repost(
            posted.account_id,
            posted.amount,
            transaction.account_id,
            transaction.amount,
        );
        debug!(?deltas, "reposting transaction");

        self.store.persist_update(&transaction, posted, &deltas)?;
        info!(
            id = transaction.id,
            from_account = update.previous_account_id,
            to_account = transaction.account_id,
            amount = %transaction.amount,
            "transaction updated"
        );
        Ok(transaction)
    }

    /// Applies `changes` on top of the stored row, reversing exactly what is
    /// currently posted.
    pub fn edit(
        &self,
        user_id: i64,
        id: i64,
        changes: TransactionChanges,
    ) -> LedgerResult<Transaction> {
        let current = self
            .store
            .fetch_transaction(id, user_id)?
            .ok_or_else(|| LedgerError::not_found(format!("Transaction {}", id)))?;

        let category_id = changes.category_id.unwrap_or(current.category_id);
        let kind = match (changes.kind, changes.category_id) {
            (Some(kind), _) => kind,
            // A new category without an explicit kind takes the category's.
            (None, Some(_)) => self.category_kind(user_id, category_id)?,
            (None, None) => current.kind,
        };

        self.update(
            user_id,
            TransactionUpdate {
                id,
                date: changes.date.unwrap_or(current.date),
                account_id: changes.account_id.unwrap_or(current.account_id),
                category_id,
                amount: changes.amount.unwrap_or(current.amount.abs()),
                note: changes.note.unwrap_or(current.note),
                kind,
                previous_amount: current.amount,
                previous_account_id: current.account_id,
            },
        )
    }

    pub fn delete(&self, user_id: i64, id: i64) -> LedgerResult<Transaction> {
        let transaction = self.store.fetch_transaction(id, user_id)?.ok_or_else(|| {
            warn!(id, user_id, "delete of unknown transaction");
            LedgerError::not_found(format!("Transaction {}", id))
        })?;
        let deltas = [BalanceDelta::new(
            transaction.account_id,
            -transaction.amount,
        )];

        self.store
            .persist_delete(&transaction, Posting::of(&transaction), &deltas)?;
        info!(
            id,
            account = transaction.account_id,
            amount = %transaction.amount,
            "transaction deleted"
        );
        Ok(transaction)
    }

    fn category_kind(&self, user_id: i64, category_id: i64) -> LedgerResult<OperationKind> {
        self.store
            .fetch_category(category_id, user_id)?
            .map(|c| c.kind)
            .ok_or_else(|| LedgerError::not_found(format!("Category {}", category_id)))
    }

    fn check_references(
        &self,
        user_id: i64,
        account_id: i64,
        category_id: i64,
        kind: OperationKind,
    ) -> LedgerResult<Category> {
        if self.store.fetch_account(account_id, user_id)?.is_none() {
            warn!(account_id, user_id, "account not found for user");
            return Err(LedgerError::not_found(format!("Account {}", account_id)));
        }
        let category = self
            .store
            .fetch_category(category_id, user_id)?
            .ok_or_else(|| {
                warn!(category_id, user_id, "category not found for user");
                LedgerError::not_found(format!("Category {}", category_id))
            })?;
        if category.kind != kind {
            return Err(LedgerError::KindMismatch {
                category: category.name,
                expected: kind,
                actual: category.kind,
            });
        }
        Ok(category)
    }
}
