//! Posts the transactions of a validated [`Statement`] to the ledger.
//!
//! Every transaction becomes one [`Posting`] between the statement's bank account and a suspense
//! account: money in is debited to the bank account and credited to [`UNKNOWN_INCOME`], money out
//! is debited to [`UNKNOWN_EXPENSE`] and credited to the bank account. Transactions dated inside
//! the window of a statement imported earlier for the same bank account are skipped, so importing
//! the same file twice posts nothing the second time.

use crate::error::{Error, ErrorKind, Result, WrapErr};
use crate::ledger::{resolve_or_create_account, resolve_or_create_bank_account};
use crate::model::{
    AccountType, ImportState, Posting, Statement, StatementHeader, StatementRange, Transaction,
};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Suspense account debited with money leaving the bank account.
pub const UNKNOWN_EXPENSE: &str = "Unknown expense";

/// Suspense account credited with money entering the bank account.
pub const UNKNOWN_INCOME: &str = "Unknown income";

/// The result of a successful import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ImportOutcome {
    /// The id of the stored statement, `None` when every transaction was skipped.
    pub statement_id: Option<String>,
    pub posted: usize,
    pub skipped: usize,
}

/// Imports `statement` into `store`.
///
/// A statement value goes through this at most once. The first call moves it to
/// [`ImportState::Importing`] and then to `Imported` or `Failed`; any later call fails with
/// [`ErrorKind::AlreadyImported`] without touching storage.
///
/// Storage writes go through [`Store::write_import`], so whether a failure part way through leaves
/// earlier postings behind depends on the store.
pub async fn import_to_db<S>(store: &S, statement: &mut Statement) -> Result<ImportOutcome>
where
    S: Store + ?Sized,
{
    if *statement.import_state() != ImportState::Unimported {
        return Err(Error::msg(
            ErrorKind::AlreadyImported,
            format!(
                "statement for {} {} was already imported",
                statement.bank_name(),
                statement.account_number()
            ),
        ));
    }

    statement.set_import_state(ImportState::Importing);
    match import(store, statement).await {
        Ok(outcome) => {
            statement.set_import_state(ImportState::Imported {
                statement_id: outcome.statement_id.clone(),
            });
            Ok(outcome)
        }
        Err(e) => {
            statement.set_import_state(ImportState::Failed);
            Err(e)
        }
    }
}

async fn import<S>(store: &S, statement: &Statement) -> Result<ImportOutcome>
where
    S: Store + ?Sized,
{
    let (from, to) = statement
        .date_range()
        .ok_or_else(|| Error::msg(ErrorKind::Validation, "statement has no transactions"))?;
    statement
        .validate()
        .wrap_err("refusing to import a statement that does not balance")?;

    let bank_account = resolve_or_create_bank_account(store, statement)
        .await
        .wrap_err("failed to get bank account")?;
    let bank_account_id = bank_account.id().unwrap_or_default().to_string();
    let bank_ledger_id = bank_account.account_id().unwrap_or_default().to_string();

    let expense = resolve_or_create_account(store, UNKNOWN_EXPENSE, AccountType::Expense)
        .await
        .wrap_err("failed to get default account")?;
    let income = resolve_or_create_account(store, UNKNOWN_INCOME, AccountType::Income)
        .await
        .wrap_err("failed to get default account")?;
    let accounts = Counterparts {
        bank: bank_ledger_id,
        expense: expense.id().unwrap_or_default().to_string(),
        income: income.id().unwrap_or_default().to_string(),
    };

    let overlapping = store
        .find_overlapping_statements(&bank_account_id, from, to)
        .await
        .wrap_err("failed to list overlapping statements")?;
    info!("{} overlapping statements", overlapping.len());
    for range in &overlapping {
        info!(
            "  overlapping statement {} ({} to {})",
            range.id, range.opening_date, range.closing_date
        );
    }

    let plan = plan_postings(statement.transactions(), &overlapping, &accounts, new_id);
    let skipped = statement.transactions().len() - plan.len();
    if plan.is_empty() {
        info!("All {skipped} transactions are covered by earlier statements, nothing to import");
        return Ok(ImportOutcome {
            statement_id: None,
            posted: 0,
            skipped,
        });
    }

    let statement_id = plan[0].statement_id.clone();
    let header = StatementHeader {
        id: statement_id.clone(),
        bank_account_id,
        opening_date: from,
        opening_balance: statement.open_balance(),
        closing_date: to,
        closing_balance: statement.close_balance(),
    };
    store.write_import(&header, &plan).await?;

    info!(
        "Imported statement {statement_id}: {} transactions posted, {skipped} skipped",
        plan.len()
    );
    Ok(ImportOutcome {
        statement_id: Some(statement_id),
        posted: plan.len(),
        skipped,
    })
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// The ledger account ids a posting can name.
struct Counterparts {
    bank: String,
    expense: String,
    income: String,
}

/// Builds one posting per transaction that no range in `overlapping` covers. All postings share
/// one statement id, which is only generated when the first posting is.
fn plan_postings(
    transactions: &[Transaction],
    overlapping: &[StatementRange],
    accounts: &Counterparts,
    mut next_id: impl FnMut() -> String,
) -> Vec<Posting> {
    let mut statement_id: Option<String> = None;
    let mut postings = Vec::new();
    for tx in transactions {
        if let Some(range) = overlapping.iter().find(|r| r.contains(tx.date)) {
            debug!("Date {} skipped, included in statement({})", tx.date, range.id);
            continue;
        }
        let (debit, credit) = if tx.amount.is_positive() {
            (&accounts.bank, &accounts.income)
        } else {
            (&accounts.expense, &accounts.bank)
        };
        let sid = statement_id.get_or_insert_with(&mut next_id).clone();
        postings.push(Posting::from_transaction(
            next_id(),
            tx,
            debit.as_str(),
            credit.as_str(),
            sid,
        ));
    }
    postings
}
