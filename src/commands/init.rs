use crate::commands::Out;
use crate::error::WrapErr;
use crate::{Config, Result};
use std::path::Path;

/// Creates the ledger home directory with its `config.json` and an empty, migrated database.
///
/// # Errors
/// - Returns an error if the directory already holds a ledger or any file operation fails.
pub async fn init(ledger_home: &Path) -> Result<Out<()>> {
    let config = Config::create(ledger_home)
        .await
        .wrap_err("Unable to create the ledger home directory and config")?;
    Ok(format!(
        "Successfully created the ledger home at {}",
        config.root().display()
    )
    .into())
}
