use crate::args::ImportArgs;
use crate::commands::Out;
use crate::import::{import_to_db, ImportOutcome};
use crate::model::{Amount, Statement};
use crate::{stdbank, Config, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// What was loaded from a statement file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementSummary {
    pub file: PathBuf,
    pub bank_name: String,
    pub branch_name: String,
    pub branch_code: String,
    pub account_number: String,
    pub open_date: NaiveDate,
    pub open_balance: Amount,
    pub close_date: NaiveDate,
    pub close_balance: Amount,
    pub transactions: usize,
}

impl StatementSummary {
    fn new(file: PathBuf, statement: &Statement) -> Self {
        Self {
            file,
            bank_name: statement.bank_name().to_string(),
            branch_name: statement.branch_name().to_string(),
            branch_code: statement.branch_code().to_string(),
            account_number: statement.account_number().to_string(),
            open_date: statement.open_date(),
            open_balance: statement.open_balance(),
            close_date: statement.close_date(),
            close_balance: statement.close_balance(),
            transactions: statement.transactions().len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub statement: StatementSummary,
    /// `None` for a dry run.
    pub outcome: Option<ImportOutcome>,
}

/// Loads a Standard Bank statement, validates it and, unless this is a dry run, imports it.
pub async fn import(config: Config, args: ImportArgs) -> Result<Out<ImportReport>> {
    let mut statement = stdbank::load_statement(args.file()).await?;
    let summary = StatementSummary::new(args.file().to_path_buf(), &statement);

    let mut message = format!(
        "Statement loaded successfully\n\
         Filename: {}\n\
         Bank Name: {}\n\
         Branch Name: {}\n\
         Branch Code: {}\n\
         Account Number: {}\n\
         Open Date: {}\n\
         Open Balance: {}\n\
         Close Date: {}\n\
         Close Balance: {}",
        summary.file.display(),
        summary.bank_name,
        summary.branch_name,
        summary.branch_code,
        summary.account_number,
        summary.open_date,
        summary.open_balance,
        summary.close_date,
        summary.close_balance,
    );

    if args.verbose() {
        for tx in statement.transactions() {
            info!("{},{},{},{}", tx.date, tx.details, tx.kind, tx.amount);
        }
    }

    if args.dry_run() {
        message.push_str("\nDry run, not imported");
        return Ok(Out::new(
            message,
            ImportReport {
                statement: summary,
                outcome: None,
            },
        ));
    }

    let outcome = import_to_db(config.db(), &mut statement).await?;
    match &outcome.statement_id {
        Some(id) => {
            message.push_str(&format!(
                "\nImported successfully as statement \"{id}\" ({} posted, {} skipped)",
                outcome.posted, outcome.skipped
            ));
        }
        None => {
            message.push_str(&format!(
                "\nNothing imported, all {} transactions are covered by earlier statements",
                outcome.skipped
            ));
        }
    }

    Ok(Out::new(
        message,
        ImportReport {
            statement: summary,
            outcome: Some(outcome),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{TestEnv, SAMPLE_CSV};
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_import_then_reimport() {
        let env = TestEnv::new().await;
        let file = env.write_file("statement.csv", SAMPLE_CSV).await;

        let out = import(env.config(), ImportArgs::new(&file, false, true))
            .await
            .unwrap();
        assert!(out.message().contains("Account Number: 12319791"));
        assert!(out.message().contains("Imported successfully as statement"));
        let report = out.structure().unwrap();
        assert_eq!(report.statement.transactions, 3);
        let outcome = report.outcome.as_ref().unwrap();
        assert!(outcome.statement_id.is_some());
        assert_eq!(outcome.posted, 3);
        assert_eq!(env.config().db().count_postings().await.unwrap(), 3);

        let out = import(env.config(), ImportArgs::new(&file, false, false))
            .await
            .unwrap();
        assert!(out.message().contains("Nothing imported"));
        let outcome = out.structure().unwrap().outcome.clone().unwrap();
        assert_eq!(outcome.statement_id, None);
        assert_eq!(outcome.skipped, 3);
        assert_eq!(env.config().db().count_postings().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let env = TestEnv::new().await;
        let file = env.write_file("statement.csv", SAMPLE_CSV).await;

        let out = import(env.config(), ImportArgs::new(&file, true, false))
            .await
            .unwrap();
        assert!(out.message().ends_with("Dry run, not imported"));
        assert!(out.structure().unwrap().outcome.is_none());
        assert_eq!(env.config().db().count_postings().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unbalanced_statement_is_not_imported() {
        let env = TestEnv::new().await;
        let data = SAMPLE_CSV.replace("43724.75", "1.00");
        let file = env.write_file("bad.csv", data).await;

        let err = import(env.config(), ImportArgs::new(&file, false, false))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(env.config().db().count_postings().await.unwrap(), 0);
    }
}
