//! Imports bank statement exports into a double-entry ledger.
//!
//! A [`model::Statement`] is loaded (for example with [`stdbank::load_statement`]), checked with
//! [`model::Statement::validate`] and handed to [`import::import_to_db`], which posts every
//! transaction not already covered by an earlier statement to a [`Store`].

pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
pub mod import;
pub mod ledger;
pub mod model;
pub mod stdbank;
mod store;
mod utils;


pub use config::Config;
pub use db::Db;
pub use error::{Error, ErrorKind, Result};
pub use store::{MemoryStore, Store};
