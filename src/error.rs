// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

use crate::models::OperationKind;

/// Failures surfaced by the ledger, the report queries and the session.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The account, category, transaction or account type does not exist
    /// or belongs to another user.
    #[error("{0} not found")]
    ReferenceNotFound(String),
    #[error("No active session; run `pocketledger user login --email <email>` first")]
    Unauthenticated,
    #[error("Category '{category}' is {actual}, but the transaction is {expected}")]
    KindMismatch {
        category: String,
        expected: OperationKind,
        actual: OperationKind,
    },
    /// The stored posting is not the one the caller expected to reverse,
    /// either because the caller passed stale values or another writer got
    /// there first.
    #[error("Transaction {0} was changed since it was read; reload and retry")]
    StalePosting(i64),
    #[error("Invalid stored value: {0}")]
    InvalidData(String),
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    pub fn not_found(what: impl Into<String>) -> Self {
        LedgerError::ReferenceNotFound(what.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
