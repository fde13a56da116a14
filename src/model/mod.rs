//! Types that represent the core data model, such as `Amount`, `Account` and `Statement`.
mod account;
mod amount;
mod posting;
mod statement;

pub use account::{Account, AccountFilter, AccountType, BankAccount};
pub use amount::{Amount, AmountError, SCALE};
pub use posting::{Posting, StatementHeader, StatementRange, MAX_DESCRIPTION_CHARS};
pub use statement::{ImportState, Statement, Transaction};
