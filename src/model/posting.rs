use crate::model::{Amount, Transaction};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The longest `statement_type` or `statement_details` value stored with a posting, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// The persisted header of an imported statement (a row of the `statements` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatementHeader {
    pub id: String,
    pub bank_account_id: String,
    pub opening_date: NaiveDate,
    pub opening_balance: Amount,
    pub closing_date: NaiveDate,
    pub closing_balance: Amount,
}

/// The date window of a previously imported statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatementRange {
    pub id: String,
    pub opening_date: NaiveDate,
    pub closing_date: NaiveDate,
}

impl StatementRange {
    /// Whether `date` lies inside the window, both ends included.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.opening_date <= date && date <= self.closing_date
    }

    /// Whether the window intersects `[from, to]`, both ends included.
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.opening_date <= to && self.closing_date >= from
    }
}

/// A double-entry ledger row (a row of the `transactions` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Posting {
    pub id: String,
    pub date: NaiveDate,
    pub amount: Amount,
    pub debit_account_id: String,
    pub credit_account_id: String,
    pub statement_id: String,
    pub statement_type: String,
    pub statement_code: String,
    pub statement_details: String,
    pub notes: Option<String>,
}

impl Posting {
    /// Builds the posting for `tx`, truncating its type and details to
    /// [`MAX_DESCRIPTION_CHARS`]. The debit and credit accounts carry the direction, so the
    /// posting amount is the magnitude of the transaction amount.
    pub fn from_transaction(
        id: impl Into<String>,
        tx: &Transaction,
        debit_account_id: impl Into<String>,
        credit_account_id: impl Into<String>,
        statement_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date: tx.date,
            amount: tx.amount.abs(),
            debit_account_id: debit_account_id.into(),
            credit_account_id: credit_account_id.into(),
            statement_id: statement_id.into(),
            statement_type: truncate_chars(&tx.kind, MAX_DESCRIPTION_CHARS),
            statement_code: tx.code.clone(),
            statement_details: truncate_chars(&tx.details, MAX_DESCRIPTION_CHARS),
            notes: None,
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((ix, _)) => s[..ix].to_string(),
        None => s.to_string(),
    }
}
