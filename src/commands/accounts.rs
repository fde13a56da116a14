use crate::args::AccountsArgs;
use crate::commands::Out;
use crate::ledger::get_accounts;
use crate::model::{Account, AccountFilter};
use crate::{Config, Result};

/// Lists accounts whose name and type contain the given filters, ordered by name.
pub async fn accounts(config: Config, args: AccountsArgs) -> Result<Out<Vec<Account>>> {
    let filter = AccountFilter::new(args.name(), args.account_type(), args.limit());
    let accounts = get_accounts(config.db(), &filter).await?;

    let count = accounts.len();
    let mut message = format!("Found {} account{}", count, if count == 1 { "" } else { "s" });
    for account in &accounts {
        message.push_str(&format!(
            "\n  {:<9} {}",
            account.account_type().to_string(),
            account.name()
        ));
    }
    Ok(Out::new(message, accounts))
}
