//! In-memory storage implementation for testing

use crate::error::{ErrorKind, IntoResult, Result};
use crate::model::{
    Account, AccountFilter, BankAccount, Posting, StatementHeader, StatementRange,
};
use crate::store::Store;
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    accounts: Vec<Account>,
    bank_accounts: Vec<BankAccount>,
    statements: Vec<StatementHeader>,
    postings: Vec<Posting>,
    /// When set, the posting insert with this zero-based index fails.
    fail_posting_at: Option<usize>,
    posting_inserts: usize,
}

/// A [`Store`] that keeps its rows in memory.
///
/// Clones share the same tables. Names and `(bank_name, account_number)` are kept unique the way
/// the SQLite schema keeps them unique.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("the memory store lock is poisoned"))
            .pub_result(ErrorKind::Storage)
    }

    /// Makes the `n`th posting insert (counting from zero, across the store's lifetime) fail.
    pub fn fail_posting_at(&self, n: usize) -> Result<()> {
        self.tables()?.fail_posting_at = Some(n);
        Ok(())
    }

    pub fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.tables()?.accounts.clone())
    }

    pub fn bank_accounts(&self) -> Result<Vec<BankAccount>> {
        Ok(self.tables()?.bank_accounts.clone())
    }

    pub fn statements(&self) -> Result<Vec<StatementHeader>> {
        Ok(self.tables()?.statements.clone())
    }

    pub fn postings(&self) -> Result<Vec<Posting>> {
        Ok(self.tables()?.postings.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>> {
        let tables = self.tables()?;
        let mut accounts: Vec<Account> = tables
            .accounts
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name().cmp(b.name()));
        accounts.truncate(usize::try_from(filter.effective_limit()).unwrap_or(usize::MAX));
        Ok(accounts)
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let tables = self.tables()?;
        Ok(tables.accounts.iter().find(|a| a.id() == Some(id)).cloned())
    }

    async fn find_account(&self, name: &str) -> Result<Option<Account>> {
        let tables = self.tables()?;
        Ok(tables.accounts.iter().find(|a| a.name() == name).cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        let mut tables = self.tables()?;
        insert_account(&mut tables, account).pub_result(ErrorKind::Storage)
    }

    async fn update_account(&self, account: &Account) -> Result<u64> {
        let mut tables = self.tables()?;
        let duplicate = tables
            .accounts
            .iter()
            .any(|a| a.name() == account.name() && a.id() != account.id());
        if duplicate {
            return Err(anyhow!("UNIQUE constraint failed: accounts.name"))
                .pub_result(ErrorKind::Storage);
        }
        let mut rows = 0;
        for existing in tables.accounts.iter_mut() {
            if existing.id().is_some() && existing.id() == account.id() {
                *existing = account.clone();
                rows += 1;
            }
        }
        Ok(rows)
    }

    async fn find_bank_account(
        &self,
        bank_name: &str,
        account_number: &str,
    ) -> Result<Option<BankAccount>> {
        let tables = self.tables()?;
        Ok(tables
            .bank_accounts
            .iter()
            .find(|ba| ba.bank_name == bank_name && ba.account_number == account_number)
            .cloned())
    }

    async fn insert_bank_account(&self, bank_account: &BankAccount) -> Result<()> {
        let mut tables = self.tables()?;
        insert_bank_account(&mut tables, bank_account).pub_result(ErrorKind::Storage)
    }

    async fn update_bank_account(&self, bank_account: &BankAccount) -> Result<u64> {
        let mut tables = self.tables()?;
        let mut rows = 0;
        for existing in tables.bank_accounts.iter_mut() {
            if existing.id.is_some() && existing.id == bank_account.id {
                existing.bank_name = bank_account.bank_name.clone();
                existing.branch_name = bank_account.branch_name.clone();
                existing.branch_code = bank_account.branch_code.clone();
                existing.account_number = bank_account.account_number.clone();
                rows += 1;
            }
        }
        Ok(rows)
    }

    async fn find_overlapping_statements(
        &self,
        bank_account_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StatementRange>> {
        let tables = self.tables()?;
        Ok(tables
            .statements
            .iter()
            .filter(|s| s.bank_account_id == bank_account_id)
            .map(|s| StatementRange {
                id: s.id.clone(),
                opening_date: s.opening_date,
                closing_date: s.closing_date,
            })
            .filter(|range| range.overlaps(from, to))
            .collect())
    }

    async fn insert_statement(&self, header: &StatementHeader) -> Result<u64> {
        let mut tables = self.tables()?;
        if tables.statements.iter().any(|s| s.id == header.id) {
            return Err(anyhow!("UNIQUE constraint failed: statements.id"))
                .pub_result(ErrorKind::Storage);
        }
        tables.statements.push(header.clone());
        Ok(1)
    }

    async fn insert_posting(&self, posting: &Posting) -> Result<u64> {
        let mut tables = self.tables()?;
        let n = tables.posting_inserts;
        tables.posting_inserts += 1;
        if tables.fail_posting_at == Some(n) {
            return Err(anyhow!("injected failure on posting insert {n}"))
                .pub_result(ErrorKind::Storage);
        }
        if !tables.statements.iter().any(|s| s.id == posting.statement_id) {
            return Err(anyhow!("FOREIGN KEY constraint failed: transactions.statement_id"))
                .pub_result(ErrorKind::Storage);
        }
        tables.postings.push(posting.clone());
        Ok(1)
    }
}

fn insert_account(tables: &mut Tables, account: &Account) -> anyhow::Result<()> {
    if account.id().is_none() {
        bail!("NOT NULL constraint failed: accounts.id");
    }
    if tables
        .accounts
        .iter()
        .any(|a| a.id() == account.id() || a.name() == account.name())
    {
        bail!("UNIQUE constraint failed: accounts");
    }
    tables.accounts.push(account.clone());
    Ok(())
}

fn insert_bank_account(tables: &mut Tables, bank_account: &BankAccount) -> anyhow::Result<()> {
    if bank_account.id.is_none() || bank_account.account_id.is_none() {
        bail!("NOT NULL constraint failed: bank_accounts");
    }
    let duplicate = tables.bank_accounts.iter().any(|ba| {
        ba.id == bank_account.id
            || (ba.bank_name == bank_account.bank_name
                && ba.account_number == bank_account.account_number)
    });
    if duplicate {
        bail!("UNIQUE constraint failed: bank_accounts");
    }
    let mut row = bank_account.clone();
    row.account = None;
    tables.bank_accounts.push(row);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccountType, Amount};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn header(id: &str, bank_account_id: &str, from: NaiveDate, to: NaiveDate) -> StatementHeader {
        StatementHeader {
            id: id.to_string(),
            bank_account_id: bank_account_id.to_string(),
            opening_date: from,
            opening_balance: Amount::ZERO,
            closing_date: to,
            closing_balance: Amount::ZERO,
        }
    }

    #[tokio::test]
    async fn test_account_names_are_unique() {
        let store = MemoryStore::new();
        let a = Account::from_storage("1", "Cash", AccountType::Asset);
        let b = Account::from_storage("2", "Cash", AccountType::Expense);
        store.insert_account(&a).await.unwrap();
        let err = store.insert_account(&b).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_update_unknown_account_affects_no_rows() {
        let store = MemoryStore::new();
        let a = Account::from_storage("missing", "Cash", AccountType::Asset);
        assert_eq!(store.update_account(&a).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_statements_filters_by_bank_account_and_dates() {
        let store = MemoryStore::new();
        store
            .insert_statement(&header("s1", "ba1", date(2021, 1, 1), date(2021, 1, 31)))
            .await
            .unwrap();
        store
            .insert_statement(&header("s2", "ba2", date(2021, 1, 1), date(2021, 1, 31)))
            .await
            .unwrap();
        store
            .insert_statement(&header("s3", "ba1", date(2021, 3, 1), date(2021, 3, 31)))
            .await
            .unwrap();

        let found = store
            .find_overlapping_statements("ba1", date(2021, 1, 15), date(2021, 2, 15))
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["s1"]);
    }

    #[tokio::test]
    async fn test_posting_requires_statement() {
        let store = MemoryStore::new();
        let posting = Posting {
            id: "p1".to_string(),
            date: date(2021, 1, 1),
            amount: Amount::from(1),
            debit_account_id: "a".to_string(),
            credit_account_id: "b".to_string(),
            statement_id: "nope".to_string(),
            statement_type: String::new(),
            statement_code: String::new(),
            statement_details: String::new(),
            notes: None,
        };
        assert!(store.insert_posting(&posting).await.is_err());
        assert!(store.postings().unwrap().is_empty());
    }
}
