use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The type tag of a ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

serde_plain::derive_display_from_serialize!(AccountType);

impl FromStr for AccountType {
    type Err = Error;

    /// Parses the stored, lowercase form. An empty string is reported as a missing type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(Error::msg(ErrorKind::Validation, "missing type")),
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "income" => Ok(AccountType::Income),
            "expense" => Ok(AccountType::Expense),
            other => Err(Error::msg(
                ErrorKind::Validation,
                format!("unknown account type \"{other}\""),
            )),
        }
    }
}

/// A ledger account.
///
/// The `id` is `None` until the account is first saved and never changes after that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Account {
    id: Option<String>,
    name: String,
    #[serde(rename = "type")]
    account_type: AccountType,
}

impl Account {
    /// Creates an account that has not been saved yet.
    pub fn new(name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: None,
            name: name.into(),
            account_type,
        }
    }

    /// Reconstructs an account that was loaded from storage.
    pub fn from_storage(
        id: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            account_type,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_account_type(&mut self, account_type: AccountType) {
        self.account_type = account_type;
    }

    /// Assigns the generated id. Only the save path calls this, and only once.
    pub(crate) fn assign_id(&mut self, id: String) {
        debug_assert!(self.id.is_none(), "account id is immutable once assigned");
        self.id = Some(id);
    }
}

/// The binding of a ledger [`Account`] to an account at a bank.
///
/// `(bank_name, account_number)` is the key used to find a bank account again on later imports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BankAccount {
    pub(crate) id: Option<String>,
    pub(crate) account_id: Option<String>,
    #[serde(skip)]
    pub(crate) account: Option<Account>,
    pub bank_name: String,
    pub branch_name: String,
    pub branch_code: String,
    pub account_number: String,
}

impl BankAccount {
    /// Creates an unsaved bank account linked to `account`, which may itself be unsaved.
    pub fn new(
        account: Account,
        bank_name: impl Into<String>,
        branch_name: impl Into<String>,
        branch_code: impl Into<String>,
        account_number: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            account_id: account.id().map(str::to_string),
            account: Some(account),
            bank_name: bank_name.into(),
            branch_name: branch_name.into(),
            branch_code: branch_code.into(),
            account_number: account_number.into(),
        }
    }

    /// Reconstructs a bank account row loaded from storage. The linked account is not attached.
    pub fn from_storage(
        id: impl Into<String>,
        account_id: impl Into<String>,
        bank_name: impl Into<String>,
        branch_name: impl Into<String>,
        branch_code: impl Into<String>,
        account_number: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            account_id: Some(account_id.into()),
            account: None,
            bank_name: bank_name.into(),
            branch_name: branch_name.into(),
            branch_code: branch_code.into(),
            account_number: account_number.into(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    /// The linked ledger account, when it has been attached.
    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub(crate) fn attach(&mut self, account: Account) {
        self.account_id = account.id().map(str::to_string);
        self.account = Some(account);
    }
}

/// Filter for listing accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFilter {
    /// Case-insensitive substring of the account name. Empty matches all names.
    pub name: String,
    /// Case-insensitive substring of the account type. Empty matches all types.
    pub account_type: String,
    /// Maximum number of accounts returned. Values of zero or less mean
    /// [`AccountFilter::DEFAULT_LIMIT`].
    pub limit: i64,
}

impl AccountFilter {
    pub const DEFAULT_LIMIT: i64 = 10;

    pub fn new(name: impl Into<String>, account_type: impl Into<String>, limit: i64) -> Self {
        Self {
            name: name.into(),
            account_type: account_type.into(),
            limit,
        }
    }

    /// The limit with the default applied.
    pub fn effective_limit(&self) -> i64 {
        if self.limit <= 0 {
            Self::DEFAULT_LIMIT
        } else {
            self.limit
        }
    }

    /// Whether `account` passes the name and type filters. The limit is not considered.
    pub fn matches(&self, account: &Account) -> bool {
        contains_ignore_case(account.name(), &self.name)
            && contains_ignore_case(&account.account_type().to_string(), &self.account_type)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}
