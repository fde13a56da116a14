use crate::error::{ErrorKind, IntoResult, Result};
use crate::model::Amount;
use anyhow::anyhow;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// One line of a bank statement.
///
/// A positive amount is money flowing into the bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: Amount,
    /// The bank's free-text transaction type, e.g. `TJEKKAART-AANKOOP`.
    #[serde(rename = "type")]
    pub kind: String,
    pub details: String,
    /// The bank-supplied reference code.
    pub code: String,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        amount: Amount,
        kind: impl Into<String>,
        details: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            date,
            amount,
            kind: kind.into(),
            details: details.into(),
            code: code.into(),
        }
    }
}

/// Where a [`Statement`] is in its import lifecycle.
///
/// `Imported` and `Failed` are terminal: a statement value is imported at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ImportState {
    #[default]
    Unimported,
    Importing,
    /// `statement_id` is `None` when every transaction was already covered by an earlier import.
    Imported {
        statement_id: Option<String>,
    },
    Failed,
}

/// A bank statement: the bank account it belongs to, its balances and its transactions.
///
/// Statements are built by chaining `with_*` calls. Each call consumes the statement and returns
/// the updated value, so a clone taken part way through is never affected by later calls.
///
/// ```
/// # use ledger_import::model::{Amount, Statement, Transaction};
/// # use chrono::NaiveDate;
/// # use std::str::FromStr;
/// let date = NaiveDate::from_ymd_opt(2020, 9, 28).unwrap();
/// let statement = Statement::new("Standard Bank")
///     .with_account_number("12319791")
///     .with_opening_balance(Amount::from_str("1000.00").unwrap())
///     .with_transaction(Transaction::new(date, Amount::from(200), "CREDIT", "Salary", "1"))
///     .with_closing_balance(Amount::from_str("1200.00").unwrap());
/// assert!(statement.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Statement {
    bank_name: String,
    branch_name: String,
    branch_code: String,
    account_number: String,
    opening_balance: Amount,
    closing_balance: Amount,
    transactions: Vec<Transaction>,
    #[serde(skip)]
    import_state: ImportState,
}

impl Statement {
    pub fn new(bank_name: impl Into<String>) -> Self {
        Self {
            bank_name: bank_name.into(),
            ..Self::default()
        }
    }

    pub fn with_branch_name(mut self, branch_name: impl Into<String>) -> Self {
        self.branch_name = branch_name.into();
        self
    }

    pub fn with_branch_code(mut self, branch_code: impl Into<String>) -> Self {
        self.branch_code = branch_code.into();
        self
    }

    pub fn with_account_number(mut self, account_number: impl Into<String>) -> Self {
        self.account_number = account_number.into();
        self
    }

    pub fn with_opening_balance(mut self, balance: Amount) -> Self {
        self.opening_balance = balance;
        self
    }

    pub fn with_closing_balance(mut self, balance: Amount) -> Self {
        self.closing_balance = balance;
        self
    }

    /// Appends a transaction. Transactions are kept in the order they are added.
    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    /// Checks that the transactions account exactly for the change from the opening balance to
    /// the closing balance.
    ///
    /// Totals that do not fit an [`Amount`] are reported as a validation error.
    pub fn validate(&self) -> Result<()> {
        let total = self
            .transactions
            .iter()
            .try_fold(Amount::ZERO, |sum, tx| sum.checked_add(tx.amount))
            .ok_or_else(|| anyhow!("transaction total is out of range"))
            .pub_result(ErrorKind::Validation)?;
        let reached = self
            .opening_balance
            .checked_add(total)
            .ok_or_else(|| {
                anyhow!(
                    "open({}) + tx.total({}) is out of range",
                    self.opening_balance,
                    total
                )
            })
            .pub_result(ErrorKind::Validation)?;
        if reached != self.closing_balance {
            let diff = self
                .closing_balance
                .checked_sub(reached)
                .map(|d| d.to_string())
                .unwrap_or_else(|| "out of range".to_string());
            return Err(anyhow!(
                "open({}) + tx.total({}) = {} != close({}) (diff={})",
                self.opening_balance,
                total,
                reached,
                self.closing_balance,
                diff
            ))
            .pub_result(ErrorKind::Validation);
        }
        Ok(())
    }

    pub fn bank_name(&self) -> &str {
        &self.bank_name
    }

    pub fn branch_name(&self) -> &str {
        &self.branch_name
    }

    pub fn branch_code(&self) -> &str {
        &self.branch_code
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn open_balance(&self) -> Amount {
        self.opening_balance
    }

    pub fn close_balance(&self) -> Amount {
        self.closing_balance
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The date of the first transaction, or today when there are no transactions.
    ///
    /// Use [`Statement::date_range`] when the fallback must not be mistaken for a real date.
    pub fn open_date(&self) -> NaiveDate {
        self.transactions
            .first()
            .map(|tx| tx.date)
            .unwrap_or_else(today)
    }

    /// The date of the last transaction, or today when there are no transactions.
    pub fn close_date(&self) -> NaiveDate {
        self.transactions
            .last()
            .map(|tx| tx.date)
            .unwrap_or_else(today)
    }

    /// The dates of the first and last transactions, or `None` for an empty statement.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.transactions.first(), self.transactions.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }

    pub fn import_state(&self) -> &ImportState {
        &self.import_state
    }

    pub(crate) fn set_import_state(&mut self, state: ImportState) {
        self.import_state = state;
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(d: NaiveDate, amount: &str) -> Transaction {
        Transaction::new(d, amt(amount), "TYPE", "details", "code")
    }

    #[test]
    fn test_validate_balanced() {
        let statement = Statement::new("Bank")
            .with_opening_balance(amt("1000.00"))
            .with_transaction(tx(date(2021, 1, 1), "200.00"))
            .with_transaction(tx(date(2021, 1, 2), "-50.00"))
            .with_closing_balance(amt("1150.00"));
        assert!(statement.validate().is_ok());
        // validate is pure and repeatable
        assert!(statement.validate().is_ok());
    }

    #[test]
    fn test_validate_mismatch() {
        let statement = Statement::new("Bank")
            .with_opening_balance(amt("1000.00"))
            .with_transaction(tx(date(2021, 1, 1), "200.00"))
            .with_closing_balance(amt("1150.00"));
        let err = statement.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "validation error: open(1000.00) + tx.total(200.00) = 1200.00 != close(1150.00) \
             (diff=-50.00)"
        );
    }

    #[test]
    fn test_validate_detects_milli_unit_difference() {
        let statement = Statement::new("Bank")
            .with_transaction(tx(date(2021, 1, 1), "0.001"))
            .with_closing_balance(amt("0.00"));
        assert!(statement.validate().is_err());
    }

    #[test]
    fn test_validate_total_out_of_range() {
        let huge = "9000000000000000.00";
        let statement = Statement::new("Bank")
            .with_transaction(tx(date(2021, 1, 1), huge))
            .with_transaction(tx(date(2021, 1, 2), huge))
            .with_closing_balance(amt("1.00"));
        let err = statement.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("out of range"));

        let statement = Statement::new("Bank")
            .with_opening_balance(amt(huge))
            .with_transaction(tx(date(2021, 1, 1), huge))
            .with_closing_balance(amt("1.00"));
        assert_eq!(statement.validate().unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_validate_empty_statement() {
        assert!(Statement::new("Bank").validate().is_ok());
        let statement = Statement::new("Bank").with_closing_balance(amt("1.00"));
        assert!(statement.validate().is_err());
    }

    #[test]
    fn test_with_is_value_semantic() {
        let base = Statement::new("Bank").with_account_number("123");
        let a = base.clone().with_transaction(tx(date(2021, 1, 1), "1.00"));
        let b = base.clone().with_branch_name("Centurion");
        assert!(base.transactions().is_empty());
        assert_eq!(base.branch_name(), "");
        assert_eq!(a.transactions().len(), 1);
        assert_eq!(a.branch_name(), "");
        assert!(b.transactions().is_empty());
        assert_eq!(b.branch_name(), "Centurion");
    }

    #[test]
    fn test_accessors() {
        let statement = Statement::new("Standard Bank")
            .with_branch_name("CENTURION")
            .with_branch_code("2645")
            .with_account_number("12319791")
            .with_opening_balance(amt("44608.60"))
            .with_closing_balance(amt("-45775.73"));
        assert_eq!(statement.bank_name(), "Standard Bank");
        assert_eq!(statement.branch_name(), "CENTURION");
        assert_eq!(statement.branch_code(), "2645");
        assert_eq!(statement.account_number(), "12319791");
        assert_eq!(statement.open_balance(), amt("44608.60"));
        assert_eq!(statement.close_balance(), amt("-45775.73"));
        assert_eq!(statement.import_state(), &ImportState::Unimported);
    }

    #[test]
    fn test_dates_follow_sequence_order() {
        // The sequence is not sorted, so the dates come from the first and last entries.
        let statement = Statement::new("Bank")
            .with_transaction(tx(date(2021, 3, 5), "1.00"))
            .with_transaction(tx(date(2021, 3, 1), "1.00"))
            .with_transaction(tx(date(2021, 3, 3), "1.00"));
        assert_eq!(statement.open_date(), date(2021, 3, 5));
        assert_eq!(statement.close_date(), date(2021, 3, 3));
        assert_eq!(
            statement.date_range(),
            Some((date(2021, 3, 5), date(2021, 3, 3)))
        );
    }

    #[test]
    fn test_dates_fall_back_to_today_when_empty() {
        let statement = Statement::new("Bank");
        assert_eq!(statement.date_range(), None);
        let now = Local::now().date_naive();
        assert!(statement.open_date() >= now);
        assert!(statement.close_date() >= now);
    }

    #[test]
    fn test_serde_skips_import_state() {
        let mut statement =
            Statement::new("Bank").with_transaction(tx(date(2021, 1, 1), "-4.50"));
        statement.set_import_state(ImportState::Failed);
        let json = serde_json::to_string(&statement).unwrap();
        assert!(!json.contains("import_state"));
        let back: Statement = serde_json::from_str(&json).unwrap();
        assert_eq!(back.import_state(), &ImportState::Unimported);
        assert_eq!(back.transactions(), statement.transactions());
    }
}
