//! These structs provide the CLI interface for the ledger CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// ledger: import bank statements into a double-entry ledger.
///
/// Statements exported from your bank are checked so that the opening balance plus every
/// transaction equals the closing balance, and each transaction is then posted between the bank
/// account and an "Unknown income" or "Unknown expense" account. Transactions that fall inside a
/// statement you imported before are skipped.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the ledger home directory, its config file and an empty database.
    ///
    /// Run this once before importing anything. The directory is --ledger-home, which defaults to
    /// $HOME/ledger.
    Init,
    /// Load a Standard Bank CSV statement and post its transactions to the ledger.
    Import(ImportArgs),
    /// List ledger accounts.
    Accounts(AccountsArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the ledger database and configuration are held. Defaults to ~/ledger
    #[arg(long, env = "LEDGER_HOME", default_value_t = default_ledger_home())]
    ledger_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, ledger_home: PathBuf) -> Self {
        Self {
            log_level,
            ledger_home: ledger_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn ledger_home(&self) -> &DisplayPath {
        &self.ledger_home
    }
}

/// (Not shown): Args for the `ledger import` command.
#[derive(Debug, Parser, Clone)]
pub struct ImportArgs {
    /// The Standard Bank CSV export to import.
    #[arg(long, short = 'f')]
    file: PathBuf,

    /// Load and validate the statement and show its summary, but do not import it.
    #[arg(long)]
    dry_run: bool,

    /// Also show every transaction in the statement.
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl ImportArgs {
    pub fn new(file: impl Into<PathBuf>, dry_run: bool, verbose: bool) -> Self {
        Self {
            file: file.into(),
            dry_run,
            verbose,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

/// (Not shown): Args for the `ledger accounts` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct AccountsArgs {
    /// Only accounts whose name contains this text, ignoring case.
    #[arg(long, default_value = "")]
    name: String,

    /// Only accounts whose type contains this text, ignoring case, e.g. "expense".
    #[arg(long = "type", default_value = "")]
    account_type: String,

    /// The most accounts to list. Zero or less means 10.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    limit: i64,
}

impl AccountsArgs {
    pub fn new(name: impl Into<String>, account_type: impl Into<String>, limit: i64) -> Self {
        Self {
            name: name.into(),
            account_type: account_type.into(),
            limit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn account_type(&self) -> &str {
        &self.account_type
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }
}

fn default_ledger_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("ledger"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --ledger-home or LEDGER_HOME instead of relying on the default \
                ledger home directory.",
            );
            PathBuf::from("ledger")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
