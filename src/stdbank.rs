//! Reads Standard Bank CSV statement exports.
//!
//! The export has no header row. The first two lines describe the account, balances are lines
//! whose first field is empty and second field is `0`, and transactions are `HIST` lines:
//!
//! ```text
//! 0,2645,BRANCH,0,,CENTURION,0,0
//! ,12319791,ACC-NO,0,,,0,0
//! ,0,OPEN,44608.60,OPEN BALANCE,,0,0
//! HIST,20200928,,-211.22,TJEKKAART-AANKOOP,Spar Midstrea 5222*7143 23 SEP,6076,0
//! ,0,CLOSE,44397.38,CLOSE BALANCE,,0,0
//! ```
//!
//! Every other line after the second must still carry a valid amount in its fourth field and is
//! otherwise ignored.

use crate::error::{Error, ErrorKind, IntoResult, Result, WrapErr};
use crate::model::{Amount, Statement, Transaction};
use crate::utils;
use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, trace};

pub const BANK_NAME: &str = "Standard Bank";

/// Loads and validates the statement in the file at `path`.
pub async fn load_statement(path: impl AsRef<Path>) -> Result<Statement> {
    let path = path.as_ref();
    let content = utils::read(path).await?;
    let statement =
        parse(content.as_bytes()).wrap_err_with(|| format!("failed to load {}", path.display()))?;
    debug!(
        "Loaded {} transactions from {}",
        statement.transactions().len(),
        path.display()
    );
    Ok(statement)
}

/// Reads a statement from CSV and validates it. Errors name the offending line.
pub fn parse<R: Read>(reader: R) -> Result<Statement> {
    let mut csv = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut statement = Statement::new(BANK_NAME);
    let mut line = 0;
    for record in csv.records() {
        line += 1;
        let record = record
            .context("invalid CSV")
            .pub_result(ErrorKind::Format)
            .wrap_err_with(|| format!("line({line})"))?;
        statement = apply_line(statement, line, &record)
            .wrap_err_with(|| format!("line({line})"))?;
    }

    statement
        .validate()
        .wrap_err_with(|| format!("line({line})"))?;
    Ok(statement)
}

fn apply_line(statement: Statement, line: usize, record: &StringRecord) -> Result<Statement> {
    match line {
        1 => {
            return Ok(statement
                .with_branch_name(field(record, 5)?)
                .with_branch_code(field(record, 1)?))
        }
        2 => return Ok(statement.with_account_number(field(record, 1)?)),
        _ => {}
    }

    let raw_amount = field(record, 3)?;
    let amount = Amount::from_str(raw_amount)
        .map_err(|e| anyhow!("col[4]={raw_amount} is not valid amount: {e}"))
        .pub_result(ErrorKind::Format)?;

    let first = field(record, 0)?;
    if first.is_empty() && field(record, 1)? == "0" {
        match field(record, 2)? {
            "OPEN" => return Ok(statement.with_opening_balance(amount)),
            "CLOSE" => return Ok(statement.with_closing_balance(amount)),
            _ => {}
        }
    }

    if first == "HIST" {
        let raw_date = field(record, 1)?;
        let date = NaiveDate::parse_from_str(raw_date, "%Y%m%d").map_err(|_| {
            Error::msg(
                ErrorKind::Format,
                format!("invalid date=\"{raw_date}\" not CCYYMMDD"),
            )
        })?;
        let tx = Transaction::new(
            date,
            amount,
            field(record, 4)?,
            field(record, 5)?,
            field(record, 6)?,
        );
        trace!("Line({line:6}): {record:?}");
        return Ok(statement.with_transaction(tx));
    }

    Ok(statement)
}

fn field(record: &StringRecord, index: usize) -> Result<&str> {
    record.get(index).ok_or_else(|| {
        Error::msg(
            ErrorKind::Format,
            format!("expected at least {} fields, found {}", index + 1, record.len()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImportState;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
0,2645,BRANCH,0,,CENTURION,0,0
,12319791,ACC-NO,0,,,0,0
,0,OPEN,44608.60,OPEN BALANCE,,0,0
HIST,20200928,,-211.22,TJEKKAART-AANKOOP,Spar Midstrea 5222*7143 23 SEP,6076,0
HIST,20200928,,-932,TJEKKAART-AANKOOP,C*SASOL MIDRI 5222*7143 24 SEP,6076,0
HIST,20210318,,259.37,KREDIETOORPLASING,CORNUEX,6088,0
,0,CLOSE,43724.75,CLOSE BALANCE,,0,0
";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let s = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(s.bank_name(), "Standard Bank");
        assert_eq!(s.branch_name(), "CENTURION");
        assert_eq!(s.branch_code(), "2645");
        assert_eq!(s.account_number(), "12319791");
        assert_eq!(s.open_balance(), Amount::from_str("44608.60").unwrap());
        assert_eq!(s.close_balance(), Amount::from_str("43724.75").unwrap());
        assert_eq!(s.open_date(), date(2020, 9, 28));
        assert_eq!(s.close_date(), date(2021, 3, 18));
        assert_eq!(*s.import_state(), ImportState::Unimported);

        let txs = s.transactions();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].amount, Amount::from_str("-211.22").unwrap());
        assert_eq!(txs[0].kind, "TJEKKAART-AANKOOP");
        assert_eq!(txs[0].details, "Spar Midstrea 5222*7143 23 SEP");
        assert_eq!(txs[0].code, "6076");
        assert_eq!(txs[1].amount, Amount::from(-932));
        assert_eq!(txs[2].amount.to_string(), "259.37");
    }

    #[test]
    fn test_unbalanced_file_is_rejected() {
        let data = SAMPLE.replace("43724.75", "43724.76");
        let err = parse(data.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("line(7)"), "{err}");
        assert!(err.to_string().contains("diff=0.01"), "{err}");
    }

    #[test]
    fn test_bad_amount_names_line() {
        let data = SAMPLE.replace("-932", "-9x32");
        let err = parse(data.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        let message = err.to_string();
        assert!(message.contains("line(5)"), "{message}");
        assert!(message.contains("col[4]=-9x32"), "{message}");
    }

    #[test]
    fn test_bad_date_names_line() {
        let data = SAMPLE.replace("20210318", "2021-03-18");
        let err = parse(data.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("line(6)"));
        assert!(err.to_string().contains("not CCYYMMDD"));
    }

    #[test]
    fn test_short_line_is_an_error() {
        let data = "0,2645,BRANCH\n";
        let err = parse(data.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("line(1)"));
    }

    #[test]
    fn test_other_lines_are_ignored() {
        let data = SAMPLE.replace(
            ",0,CLOSE",
            "NOTE,x,y,0.00,something else,,0,0\n,0,CLOSE",
        );
        let s = parse(data.as_bytes()).unwrap();
        assert_eq!(s.transactions().len(), 3);
    }

    #[test]
    fn test_overflowing_total_is_an_error() {
        let huge = "HIST,20200928,,9000000000000000.00,X,Y,1,0";
        let data = format!(
            "0,2645,BRANCH,0,,CENTURION,0,0\n\
             ,12319791,ACC-NO,0,,,0,0\n\
             ,0,OPEN,0.00,OPEN BALANCE,,0,0\n\
             {huge}\n{huge}\n\
             ,0,CLOSE,0.00,CLOSE BALANCE,,0,0\n"
        );
        let err = parse(data.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[tokio::test]
    async fn test_load_statement_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("statement.csv");
        utils::write(&path, SAMPLE).await.unwrap();

        let s = load_statement(&path).await.unwrap();
        assert_eq!(s.transactions().len(), 3);

        let err = load_statement(dir.path().join("missing.csv"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
