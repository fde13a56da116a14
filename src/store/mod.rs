//! The storage collaborator used by the ledger operations and the import engine.
//!
//! Two implementations exist: [`crate::Db`], backed by SQLite, and [`MemoryStore`], which keeps
//! everything in memory and is used in tests.
//!
//! # Get-or-create and uniqueness
//!
//! The ledger operations find rows by name or by `(bank_name, account_number)` and insert them
//! when they are missing. Two callers doing this at the same time can both miss and both insert.
//! An implementation must either reject the second insert with a uniqueness constraint (the SQLite
//! schema has `UNIQUE` constraints on both keys), or the caller must serialize imports per bank
//! account.

mod memory;

pub use memory::MemoryStore;

use crate::error::{Error, ErrorKind, Result, WrapErr};
use crate::model::{
    Account, AccountFilter, BankAccount, Posting, StatementHeader, StatementRange,
};
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait Store: Send + Sync {
    /// Accounts passing `filter`, ordered by name, at most `filter.effective_limit()` of them.
    async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>>;

    /// The account with this id, if any.
    async fn get_account(&self, id: &str) -> Result<Option<Account>>;

    /// The account with exactly this name, if any.
    async fn find_account(&self, name: &str) -> Result<Option<Account>>;

    /// Inserts an account that already has its id.
    async fn insert_account(&self, account: &Account) -> Result<()>;

    /// Updates name and type by id. Returns the number of rows affected.
    async fn update_account(&self, account: &Account) -> Result<u64>;

    /// The bank account with this key, without its ledger account attached.
    async fn find_bank_account(
        &self,
        bank_name: &str,
        account_number: &str,
    ) -> Result<Option<BankAccount>>;

    /// Inserts a bank account that already has its id and account id.
    async fn insert_bank_account(&self, bank_account: &BankAccount) -> Result<()>;

    /// Updates the bank details by id. Returns the number of rows affected.
    async fn update_bank_account(&self, bank_account: &BankAccount) -> Result<u64>;

    /// Statements of this bank account whose date window intersects `[from, to]`.
    async fn find_overlapping_statements(
        &self,
        bank_account_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StatementRange>>;

    /// Returns the number of rows inserted.
    async fn insert_statement(&self, header: &StatementHeader) -> Result<u64>;

    /// Returns the number of rows inserted.
    async fn insert_posting(&self, posting: &Posting) -> Result<u64>;

    /// Writes a statement header followed by its postings.
    ///
    /// This default issues the inserts one by one and stops at the first failure; rows written
    /// before the failure stay written. Implementations that can do better should write
    /// everything in one transaction.
    async fn write_import(&self, header: &StatementHeader, postings: &[Posting]) -> Result<()> {
        let rows = self
            .insert_statement(header)
            .await
            .wrap_err("failed to insert statement record")?;
        ensure_one_row(rows, "statement")?;
        for posting in postings {
            let rows = self
                .insert_posting(posting)
                .await
                .wrap_err_with(|| format!("failed to insert transaction dated {}", posting.date))?;
            ensure_one_row(rows, "transaction")?;
        }
        Ok(())
    }
}

/// Fails with [`ErrorKind::Consistency`] unless exactly one row was affected.
pub(crate) fn ensure_one_row(rows: u64, what: &str) -> Result<()> {
    if rows == 1 {
        Ok(())
    } else {
        Err(Error::msg(
            ErrorKind::Consistency,
            format!("affected {rows} {what} rows instead of 1"),
        ))
    }
}
