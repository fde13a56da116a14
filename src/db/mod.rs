//! This module is responsible for reading, writing and managing the SQLite database

mod migrations;

use crate::error::{ErrorKind, IntoResult, Result, WrapErr};
use crate::model::{
    Account, AccountFilter, AccountType, Amount, BankAccount, Posting, StatementHeader,
    StatementRange,
};
use crate::store::{ensure_one_row, Store};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteExecutor, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, trace};

/// The schema version this build of the program expects.
pub(crate) const CURRENT_VERSION: i32 = 1;

/// A [`Store`] backed by a SQLite file.
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Validates that there is a SQLite file at `path`
    /// - Creates a SQLite client
    /// - Updates the database schema with migrations if it is out-of-date
    /// - Returns a constructed `Db` object for further operations
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(anyhow!("The SQLite file is missing '{}'", path.display()))
                .pub_result(ErrorKind::Config);
        }
        let pool = connect(path, false).await.pub_result(ErrorKind::Storage)?;
        let current = schema_version(&pool).await.pub_result(ErrorKind::Storage)?;
        if current > CURRENT_VERSION {
            return Err(anyhow!(
                "The database schema version {current} is newer than this program supports \
                ({CURRENT_VERSION})"
            ))
            .pub_result(ErrorKind::Config);
        }
        migrations::run(&pool, current, CURRENT_VERSION)
            .await
            .pub_result(ErrorKind::Storage)?;
        Ok(Self { pool })
    }

    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    /// - Returns a constructed `Db` object for further operations
    pub async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(anyhow!("A file already exists at '{}'", path.display()))
                .pub_result(ErrorKind::Config);
        }
        let pool = connect(path, true).await.pub_result(ErrorKind::Storage)?;
        bootstrap(&pool).await.pub_result(ErrorKind::Storage)?;
        migrations::run(&pool, 0, CURRENT_VERSION)
            .await
            .pub_result(ErrorKind::Storage)?;
        debug!("Initialized SQLite database at {}", path.display());
        Ok(Self { pool })
    }

    /// Returns the number of rows in the transactions table
    pub async fn count_postings(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transactions")
            .pub_result(ErrorKind::Storage)?;
        Ok(u64::try_from(row.0).unwrap_or_default())
    }

    /// Returns the postings of a statement in insertion order.
    pub async fn postings(&self, statement_id: &str) -> Result<Vec<Posting>> {
        let rows: Vec<PostingRow> = sqlx::query_as(
            "SELECT id, date, amount, dt_account_id, ct_account_id, statement_id, statement_type, \
             statement_code, statement_details, notes FROM transactions WHERE statement_id = ? \
             ORDER BY rowid",
        )
        .bind(statement_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to select transactions")
        .pub_result(ErrorKind::Storage)?;
        rows.into_iter().map(posting_from_row).collect()
    }

    /// Returns the header of a statement.
    pub async fn statement(&self, id: &str) -> Result<Option<StatementHeader>> {
        let row: Option<StatementRow> = sqlx::query_as(
            "SELECT id, bank_account_id, opening_date, opening_balance, closing_date, \
             closing_balance FROM statements WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to select statement")
        .pub_result(ErrorKind::Storage)?;
        row.map(statement_from_row).transpose()
    }
}

async fn connect(path: &Path, create: bool) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .context("Failed to parse SQLite connection string")?
        .create_if_missing(create)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open SQLite database at {}", path.display()))
}

async fn bootstrap(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create schema_version table")?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
        .execute(pool)
        .await
        .context("Failed to insert initial schema version")?;
    Ok(())
}

async fn schema_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    let row: (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to query schema version")?;
    match row.0 {
        Some(v) => Ok(v),
        None => bail!("The schema_version table is empty"),
    }
}

type AccountRow = (String, String, String);
type BankAccountRow = (String, String, String, String, String, String);
type StatementRow = (String, String, NaiveDate, String, NaiveDate, String);
type PostingRow = (
    String,
    NaiveDate,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
);

fn parse_amount(s: &str, column: &str) -> Result<Amount> {
    Amount::from_str(s)
        .with_context(|| format!("Invalid amount '{s}' in column {column}"))
        .pub_result(ErrorKind::Format)
}

fn account_from_row((id, name, account_type): AccountRow) -> Result<Account> {
    let account_type = AccountType::from_str(&account_type)
        .wrap_err_with(|| format!("Invalid type for account {id}"))?;
    Ok(Account::from_storage(id, name, account_type))
}

fn statement_from_row(row: StatementRow) -> Result<StatementHeader> {
    let (id, bank_account_id, opening_date, opening_balance, closing_date, closing_balance) = row;
    Ok(StatementHeader {
        opening_balance: parse_amount(&opening_balance, "statements.opening_balance")?,
        closing_balance: parse_amount(&closing_balance, "statements.closing_balance")?,
        id,
        bank_account_id,
        opening_date,
        closing_date,
    })
}

fn posting_from_row(row: PostingRow) -> Result<Posting> {
    let (
        id,
        date,
        amount,
        debit_account_id,
        credit_account_id,
        statement_id,
        statement_type,
        statement_code,
        statement_details,
        notes,
    ) = row;
    Ok(Posting {
        amount: parse_amount(&amount, "transactions.amount")?,
        id,
        date,
        debit_account_id,
        credit_account_id,
        statement_id,
        statement_type,
        statement_code,
        statement_details,
        notes,
    })
}

/// Escapes `%`, `_` and `\` so that `s` is matched literally inside a `LIKE ... ESCAPE '\'`.
fn like_pattern(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 2);
    escaped.push('%');
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

async fn insert_statement_row<'e, E>(executor: E, header: &StatementHeader) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    trace!("Inserting statement {}", header.id);
    let result = sqlx::query(
        "INSERT INTO statements (id, bank_account_id, opening_date, opening_balance, \
         closing_date, closing_balance) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&header.id)
    .bind(&header.bank_account_id)
    .bind(header.opening_date)
    .bind(header.opening_balance.to_string())
    .bind(header.closing_date)
    .bind(header.closing_balance.to_string())
    .execute(executor)
    .await
    .context("Failed to insert statement")
    .pub_result(ErrorKind::Storage)?;
    Ok(result.rows_affected())
}

async fn insert_posting_row<'e, E>(executor: E, posting: &Posting) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    trace!("Inserting transaction {}", posting.id);
    let result = sqlx::query(
        "INSERT INTO transactions (id, date, amount, dt_account_id, ct_account_id, statement_id, \
         statement_type, statement_code, statement_details, notes) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&posting.id)
    .bind(posting.date)
    .bind(posting.amount.to_string())
    .bind(&posting.debit_account_id)
    .bind(&posting.credit_account_id)
    .bind(&posting.statement_id)
    .bind(&posting.statement_type)
    .bind(&posting.statement_code)
    .bind(&posting.statement_details)
    .bind(&posting.notes)
    .execute(executor)
    .await
    .context("Failed to insert transaction")
    .pub_result(ErrorKind::Storage)?;
    Ok(result.rows_affected())
}

#[async_trait]
impl Store for Db {
    async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            "SELECT id, name, type FROM accounts \
             WHERE (? = '' OR name LIKE ? ESCAPE '\\') \
             AND (? = '' OR type LIKE ? ESCAPE '\\') \
             ORDER BY name LIMIT ?",
        )
        .bind(&filter.name)
        .bind(like_pattern(&filter.name))
        .bind(&filter.account_type)
        .bind(like_pattern(&filter.account_type))
        .bind(filter.effective_limit())
        .fetch_all(&self.pool)
        .await
        .with_context(|| {
            format!(
                "Failed to get list of accounts({},{},{})",
                filter.name, filter.account_type, filter.limit
            )
        })
        .pub_result(ErrorKind::Storage)?;
        rows.into_iter().map(account_from_row).collect()
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let row: Option<AccountRow> =
            sqlx::query_as("SELECT id, name, type FROM accounts WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to select account")
                .pub_result(ErrorKind::Storage)?;
        row.map(account_from_row).transpose()
    }

    async fn find_account(&self, name: &str) -> Result<Option<Account>> {
        let row: Option<AccountRow> =
            sqlx::query_as("SELECT id, name, type FROM accounts WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to select account")
                .pub_result(ErrorKind::Storage)?;
        row.map(account_from_row).transpose()
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        sqlx::query("INSERT INTO accounts (id, name, type) VALUES (?, ?, ?)")
            .bind(account.id())
            .bind(account.name())
            .bind(account.account_type().to_string())
            .execute(&self.pool)
            .await
            .context("Failed to insert account")
            .pub_result(ErrorKind::Storage)?;
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<u64> {
        let result = sqlx::query("UPDATE accounts SET name = ?, type = ? WHERE id = ?")
            .bind(account.name())
            .bind(account.account_type().to_string())
            .bind(account.id())
            .execute(&self.pool)
            .await
            .context("Failed to update account")
            .pub_result(ErrorKind::Storage)?;
        Ok(result.rows_affected())
    }

    async fn find_bank_account(
        &self,
        bank_name: &str,
        account_number: &str,
    ) -> Result<Option<BankAccount>> {
        let row: Option<BankAccountRow> = sqlx::query_as(
            "SELECT id, account_id, bank_name, branch_name, branch_code, account_number \
             FROM bank_accounts WHERE bank_name = ? AND account_number = ?",
        )
        .bind(bank_name)
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to select bank_account")
        .pub_result(ErrorKind::Storage)?;
        Ok(row.map(
            |(id, account_id, bank_name, branch_name, branch_code, account_number)| {
                BankAccount::from_storage(
                    id,
                    account_id,
                    bank_name,
                    branch_name,
                    branch_code,
                    account_number,
                )
            },
        ))
    }

    async fn insert_bank_account(&self, bank_account: &BankAccount) -> Result<()> {
        sqlx::query(
            "INSERT INTO bank_accounts (id, account_id, bank_name, branch_name, branch_code, \
             account_number) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(bank_account.id())
        .bind(bank_account.account_id())
        .bind(&bank_account.bank_name)
        .bind(&bank_account.branch_name)
        .bind(&bank_account.branch_code)
        .bind(&bank_account.account_number)
        .execute(&self.pool)
        .await
        .context("Failed to insert bank_account")
        .pub_result(ErrorKind::Storage)?;
        Ok(())
    }

    async fn update_bank_account(&self, bank_account: &BankAccount) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE bank_accounts SET bank_name = ?, branch_name = ?, branch_code = ?, \
             account_number = ? WHERE id = ?",
        )
        .bind(&bank_account.bank_name)
        .bind(&bank_account.branch_name)
        .bind(&bank_account.branch_code)
        .bind(&bank_account.account_number)
        .bind(bank_account.id())
        .execute(&self.pool)
        .await
        .context("Failed to update bank_account")
        .pub_result(ErrorKind::Storage)?;
        Ok(result.rows_affected())
    }

    async fn find_overlapping_statements(
        &self,
        bank_account_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StatementRange>> {
        let rows: Vec<(String, NaiveDate, NaiveDate)> = sqlx::query_as(
            "SELECT id, opening_date, closing_date FROM statements \
             WHERE bank_account_id = ? AND opening_date <= ? AND closing_date >= ? \
             ORDER BY opening_date",
        )
        .bind(bank_account_id)
        .bind(to)
        .bind(from)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list overlapping statements")
        .pub_result(ErrorKind::Storage)?;
        Ok(rows
            .into_iter()
            .map(|(id, opening_date, closing_date)| StatementRange {
                id,
                opening_date,
                closing_date,
            })
            .collect())
    }

    async fn insert_statement(&self, header: &StatementHeader) -> Result<u64> {
        insert_statement_row(&self.pool, header).await
    }

    async fn insert_posting(&self, posting: &Posting) -> Result<u64> {
        insert_posting_row(&self.pool, posting).await
    }

    /// Writes the header and all postings in a single SQLite transaction.
    async fn write_import(&self, header: &StatementHeader, postings: &[Posting]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin import transaction")
            .pub_result(ErrorKind::Storage)?;

        let rows = insert_statement_row(&mut *tx, header)
            .await
            .wrap_err("failed to insert statement record")?;
        ensure_one_row(rows, "statement")?;

        for posting in postings {
            let rows = insert_posting_row(&mut *tx, posting)
                .await
                .wrap_err_with(|| format!("failed to insert transaction dated {}", posting.date))?;
            ensure_one_row(rows, "transaction")?;
        }

        tx.commit()
            .await
            .context("Failed to commit import transaction")
            .pub_result(ErrorKind::Storage)?;
        debug!(
            "Committed statement {} with {} transactions",
            header.id,
            postings.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn new_db() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("ledger.sqlite")).await.unwrap();
        (dir, db)
    }

    async fn seed_bank_account(db: &Db) -> (Account, BankAccount) {
        let account = Account::from_storage("acc-bank", "Standard Bank:123", AccountType::Asset);
        db.insert_account(&account).await.unwrap();
        let mut ba = BankAccount::new(account.clone(), "Standard Bank", "", "", "123");
        ba.id = Some("ba-1".to_string());
        db.insert_bank_account(&ba).await.unwrap();
        (account, ba)
    }

    fn header(id: &str, from: NaiveDate, to: NaiveDate) -> StatementHeader {
        StatementHeader {
            id: id.to_string(),
            bank_account_id: "ba-1".to_string(),
            opening_date: from,
            opening_balance: Amount::from_str("1000.00").unwrap(),
            closing_date: to,
            closing_balance: Amount::from_str("-0.50").unwrap(),
        }
    }

    fn posting(id: &str, statement_id: &str, d: NaiveDate, amount: &str) -> Posting {
        Posting {
            id: id.to_string(),
            date: d,
            amount: Amount::from_str(amount).unwrap(),
            debit_account_id: "acc-bank".to_string(),
            credit_account_id: "acc-bank".to_string(),
            statement_id: statement_id.to_string(),
            statement_type: "TYPE".to_string(),
            statement_code: "CODE".to_string(),
            statement_details: "details".to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.sqlite");
        {
            let _db = Db::init(&path).await.unwrap();
        }
        let db = Db::load(&path).await.unwrap();
        assert_eq!(db.count_postings().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_init_refuses_existing_file() {
        let (dir, _db) = new_db().await;
        let err = Db::init(dir.path().join("ledger.sqlite")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_load_requires_file() {
        let dir = TempDir::new().unwrap();
        let err = Db::load(dir.path().join("missing.sqlite")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_account_insert_find_update() {
        let (_dir, db) = new_db().await;
        let mut account = Account::from_storage("a1", "Groceries", AccountType::Expense);
        db.insert_account(&account).await.unwrap();

        let found = db.find_account("Groceries").await.unwrap().unwrap();
        assert_eq!(found, account);
        assert_eq!(db.get_account("a1").await.unwrap(), Some(account.clone()));
        assert_eq!(db.get_account("a2").await.unwrap(), None);
        assert_eq!(db.find_account("groceries").await.unwrap(), None);

        account.set_name("Food");
        assert_eq!(db.update_account(&account).await.unwrap(), 1);
        assert_eq!(db.get_account("a1").await.unwrap().unwrap().name(), "Food");

        let ghost = Account::from_storage("ghost", "Ghost", AccountType::Asset);
        assert_eq!(db.update_account(&ghost).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_account_name_is_unique() {
        let (_dir, db) = new_db().await;
        db.insert_account(&Account::from_storage("a1", "Cash", AccountType::Asset))
            .await
            .unwrap();
        let err = db
            .insert_account(&Account::from_storage("a2", "Cash", AccountType::Asset))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_list_accounts_filters_orders_and_limits() {
        let (_dir, db) = new_db().await;
        for (id, name, t) in [
            ("1", "Unknown income", AccountType::Income),
            ("2", "Unknown expense", AccountType::Expense),
            ("3", "Standard Bank:123", AccountType::Asset),
            ("4", "100%_match", AccountType::Asset),
        ] {
            db.insert_account(&Account::from_storage(id, name, t))
                .await
                .unwrap();
        }

        let all = db.list_accounts(&AccountFilter::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec![
                "100%_match",
                "Standard Bank:123",
                "Unknown expense",
                "Unknown income"
            ]
        );

        let unknown = db
            .list_accounts(&AccountFilter::new("UNKNOWN", "", 0))
            .await
            .unwrap();
        assert_eq!(unknown.len(), 2);

        let income = db
            .list_accounts(&AccountFilter::new("unknown", "inc", 0))
            .await
            .unwrap();
        assert_eq!(income.len(), 1);
        assert_eq!(income[0].name(), "Unknown income");

        let limited = db
            .list_accounts(&AccountFilter::new("", "", 1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        // wildcards in the filter are matched literally
        let literal = db
            .list_accounts(&AccountFilter::new("%_", "", 0))
            .await
            .unwrap();
        assert_eq!(literal.len(), 1);
        assert_eq!(literal[0].name(), "100%_match");
    }

    #[tokio::test]
    async fn test_bank_account_round_trip() {
        let (_dir, db) = new_db().await;
        let (account, mut ba) = seed_bank_account(&db).await;

        let found = db
            .find_bank_account("Standard Bank", "123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), Some("ba-1"));
        assert_eq!(found.account_id(), account.id());
        assert!(found.account().is_none());
        assert!(db
            .find_bank_account("Standard Bank", "999")
            .await
            .unwrap()
            .is_none());

        ba.branch_name = "CENTURION".to_string();
        assert_eq!(db.update_bank_account(&ba).await.unwrap(), 1);
        let found = db
            .find_bank_account("Standard Bank", "123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.branch_name, "CENTURION");
    }

    #[tokio::test]
    async fn test_bank_account_key_is_unique() {
        let (_dir, db) = new_db().await;
        let (account, _) = seed_bank_account(&db).await;
        let mut dup = BankAccount::new(account, "Standard Bank", "", "", "123");
        dup.id = Some("ba-2".to_string());
        let err = db.insert_bank_account(&dup).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_overlapping_statements_use_interval_overlap() {
        let (_dir, db) = new_db().await;
        seed_bank_account(&db).await;
        db.insert_statement(&header("jan", date(2021, 1, 1), date(2021, 1, 31)))
            .await
            .unwrap();
        db.insert_statement(&header("mar", date(2021, 3, 1), date(2021, 3, 31)))
            .await
            .unwrap();

        // straddles the end of january only
        let found = db
            .find_overlapping_statements("ba-1", date(2021, 1, 20), date(2021, 2, 10))
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["jan"]);

        // a window inside january still finds it
        let found = db
            .find_overlapping_statements("ba-1", date(2021, 1, 10), date(2021, 1, 11))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let found = db
            .find_overlapping_statements("ba-1", date(2021, 1, 1), date(2021, 12, 31))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        let found = db
            .find_overlapping_statements("ba-2", date(2021, 1, 1), date(2021, 12, 31))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_write_import_round_trip() {
        let (_dir, db) = new_db().await;
        seed_bank_account(&db).await;
        let h = header("s1", date(2021, 1, 1), date(2021, 1, 2));
        let postings = vec![
            posting("p1", "s1", date(2021, 1, 1), "200.00"),
            posting("p2", "s1", date(2021, 1, 2), "-0.50"),
        ];
        db.write_import(&h, &postings).await.unwrap();

        assert_eq!(db.statement("s1").await.unwrap(), Some(h));
        assert_eq!(db.postings("s1").await.unwrap(), postings);
        assert_eq!(db.count_postings().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_write_import_is_atomic() {
        let (_dir, db) = new_db().await;
        seed_bank_account(&db).await;
        let h = header("s1", date(2021, 1, 1), date(2021, 1, 2));
        // the duplicate id makes the second insert fail
        let postings = vec![
            posting("p1", "s1", date(2021, 1, 1), "1.00"),
            posting("p1", "s1", date(2021, 1, 2), "2.00"),
        ];
        let err = db.write_import(&h, &postings).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("failed to insert transaction dated 2021-01-02"));

        assert_eq!(db.statement("s1").await.unwrap(), None);
        assert_eq!(db.count_postings().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_posting_requires_existing_accounts() {
        let (_dir, db) = new_db().await;
        seed_bank_account(&db).await;
        let h = header("s1", date(2021, 1, 1), date(2021, 1, 1));
        let mut p = posting("p1", "s1", date(2021, 1, 1), "1.00");
        p.credit_account_id = "nobody".to_string();
        assert!(db.write_import(&h, &[p]).await.is_err());
        assert_eq!(db.statement("s1").await.unwrap(), None);
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("abc"), "%abc%");
        assert_eq!(like_pattern(""), "%%");
        assert_eq!(like_pattern("5%_\\"), "%5\\%\\_\\\\%");
    }
}
