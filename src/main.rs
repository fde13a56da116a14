use clap::Parser;
use ledger_import::args::{Args, Command};
use ledger_import::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().ledger_home().path();

    let _: () = match args.command() {
        Command::Init => commands::init(home).await?.print(),

        Command::Import(import_args) => {
            let config = Config::load(home).await?;
            commands::import(config, import_args.clone())
                .await?
                .print()
        }

        Command::Accounts(accounts_args) => {
            let config = Config::load(home).await?;
            commands::accounts(config, accounts_args.clone())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        // Without RUST_LOG, only this package's library and binary log, at `level`.
        None => EnvFilter::new(format!(
            "{}={},{}={}",
            env!("CARGO_PKG_NAME").replace('-', "_"),
            level,
            env!("CARGO_BIN_NAME"),
            level
        )),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
