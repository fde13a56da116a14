//! Account and bank account operations on top of a [`Store`].
//!
//! `resolve_or_create_account` and `resolve_or_create_bank_account` are get-or-create in two
//! steps: a lookup followed by an insert. Two callers resolving the same key at the same time can
//! both miss the lookup. With [`crate::Db`] the second insert then fails on the `UNIQUE`
//! constraint. Callers using another store must serialize imports per bank account.

use crate::error::{Error, ErrorKind, Result, WrapErr};
use crate::model::{Account, AccountFilter, AccountType, BankAccount, Statement};
use crate::store::{ensure_one_row, Store};
use tracing::{debug, info};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lists accounts matching `filter`, ordered by name.
pub async fn get_accounts<S>(store: &S, filter: &AccountFilter) -> Result<Vec<Account>>
where
    S: Store + ?Sized,
{
    store.list_accounts(filter).await.wrap_err_with(|| {
        format!(
            "failed to get list of accounts({},{},{})",
            filter.name, filter.account_type, filter.limit
        )
    })
}

pub async fn get_account<S>(store: &S, id: &str) -> Result<Option<Account>>
where
    S: Store + ?Sized,
{
    store
        .get_account(id)
        .await
        .wrap_err_with(|| format!("failed to get account(id={id})"))
}

pub async fn get_account_by_name<S>(store: &S, name: &str) -> Result<Option<Account>>
where
    S: Store + ?Sized,
{
    store
        .find_account(name)
        .await
        .wrap_err_with(|| format!("failed to get account(name={name})"))
}

/// Inserts the account if it has never been saved, assigning it a new id, otherwise updates it.
pub async fn save_account<S>(store: &S, account: &mut Account) -> Result<()>
where
    S: Store + ?Sized,
{
    if account.name().trim().is_empty() {
        return Err(Error::msg(ErrorKind::Validation, "missing name"));
    }

    if account.id().is_some() {
        let rows = store
            .update_account(account)
            .await
            .wrap_err_with(|| format!("failed to update account \"{}\"", account.name()))?;
        return ensure_one_row(rows, "account");
    }

    let mut created = account.clone();
    created.assign_id(new_id());
    store
        .insert_account(&created)
        .await
        .wrap_err_with(|| format!("failed to create account \"{}\"", created.name()))?;
    debug!("Created account {:?} ({})", created.name(), created.account_type());
    *account = created;
    Ok(())
}

/// Returns the account called `name`, creating it with `account_type` when there is none.
///
/// An existing account is returned as stored, even if its type differs from `account_type`.
pub async fn resolve_or_create_account<S>(
    store: &S,
    name: &str,
    account_type: AccountType,
) -> Result<Account>
where
    S: Store + ?Sized,
{
    if let Some(existing) = get_account_by_name(store, name).await? {
        return Ok(existing);
    }
    let mut account = Account::new(name, account_type);
    save_account(store, &mut account).await?;
    info!("Created {account_type} account \"{name}\"");
    Ok(account)
}

/// Finds the bank account with this key and attaches its ledger account.
pub async fn get_bank_account<S>(
    store: &S,
    bank_name: &str,
    account_number: &str,
) -> Result<Option<BankAccount>>
where
    S: Store + ?Sized,
{
    let found = store
        .find_bank_account(bank_name, account_number)
        .await
        .wrap_err_with(|| format!("failed to get bank account({bank_name},{account_number})"))?;
    let mut bank_account = match found {
        Some(ba) => ba,
        None => return Ok(None),
    };

    let account_id = bank_account.account_id().unwrap_or_default().to_string();
    let account = get_account(store, &account_id).await?.ok_or_else(|| {
        Error::msg(
            ErrorKind::Consistency,
            format!(
                "bank account({bank_name},{account_number}) refers to missing account(id={account_id})"
            ),
        )
    })?;
    bank_account.attach(account);
    Ok(Some(bank_account))
}

/// Inserts or updates a bank account. An attached account that has never been saved is saved
/// first.
pub async fn save_bank_account<S>(store: &S, bank_account: &mut BankAccount) -> Result<()>
where
    S: Store + ?Sized,
{
    if bank_account.bank_name.trim().is_empty() {
        return Err(Error::msg(ErrorKind::Validation, "missing bank name"));
    }
    if bank_account.account_number.trim().is_empty() {
        return Err(Error::msg(ErrorKind::Validation, "missing account number"));
    }

    if let Some(account) = bank_account.account.as_mut() {
        if account.id().is_none() {
            save_account(store, account)
                .await
                .wrap_err("failed to save bank account's ledger account")?;
        }
        bank_account.account_id = account.id().map(str::to_string);
    }
    if bank_account.account_id.is_none() {
        return Err(Error::msg(ErrorKind::Validation, "missing account"));
    }

    if bank_account.id.is_some() {
        let rows = store.update_bank_account(bank_account).await.wrap_err_with(|| {
            format!(
                "failed to update bank account({},{})",
                bank_account.bank_name, bank_account.account_number
            )
        })?;
        return ensure_one_row(rows, "bank account");
    }

    let mut created = bank_account.clone();
    created.id = Some(new_id());
    store.insert_bank_account(&created).await.wrap_err_with(|| {
        format!(
            "failed to create bank account({},{})",
            created.bank_name, created.account_number
        )
    })?;
    *bank_account = created;
    Ok(())
}

/// Returns the bank account for the statement's bank and account number. When there is none, the
/// asset account named `"<bank_name>:<account_number>"` is resolved or created first and a bank
/// account linked to it is created.
pub async fn resolve_or_create_bank_account<S>(
    store: &S,
    statement: &Statement,
) -> Result<BankAccount>
where
    S: Store + ?Sized,
{
    let bank_name = statement.bank_name();
    let account_number = statement.account_number();
    if let Some(existing) = get_bank_account(store, bank_name, account_number).await? {
        return Ok(existing);
    }

    let account = resolve_or_create_account(
        store,
        &format!("{bank_name}:{account_number}"),
        AccountType::Asset,
    )
    .await?;
    let mut bank_account = BankAccount::new(
        account,
        bank_name,
        statement.branch_name(),
        statement.branch_code(),
        account_number,
    );
    save_bank_account(store, &mut bank_account)
        .await
        .wrap_err_with(|| format!("failed to create bank account({bank_name},{account_number})"))?;
    info!("Created bank account {bank_name} {account_number}");
    Ok(bank_account)
}
