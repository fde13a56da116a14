//! The public error type.
//!
//! Inside the crate, errors are built as `anyhow` chains so that every layer can add context. When
//! an error crosses a public boundary it is tagged with an [`ErrorKind`] using
//! [`IntoResult::pub_result`], which lets callers branch on the category of failure without
//! parsing messages.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input such as an amount or a date that cannot be parsed.
    Format,
    /// A required field is missing or a statement does not balance.
    Validation,
    /// Storage reported an unexpected number of affected rows, or a stored reference dangles.
    Consistency,
    /// Any failure reported by the storage layer.
    Storage,
    /// The statement has already been through an import attempt.
    AlreadyImported,
    /// The ledger home or its `config.json` is missing or invalid.
    Config,
    /// A file could not be read or written.
    Io,
}

serde_plain::derive_display_from_serialize!(ErrorKind);

/// An error with an [`ErrorKind`] and a chain of context messages.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {inner:#}")]
pub struct Error {
    kind: ErrorKind,
    inner: anyhow::Error,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            kind,
            inner: inner.into(),
        }
    }

    /// Creates an error of `kind` from a plain message.
    pub fn msg<M>(kind: ErrorKind, message: M) -> Self
    where
        M: Display + std::fmt::Debug + Send + Sync + 'static,
    {
        Self::new(kind, anyhow::Error::msg(message))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Wraps the error with an outer context message. The kind is preserved.
    pub fn context<C>(self, context: C) -> Self
    where
        C: Display + Send + Sync + 'static,
    {
        Self {
            kind: self.kind,
            inner: self.inner.context(context),
        }
    }
}

/// Converts any `Result` whose error can become an `anyhow::Error` into a public [`Result`].
pub(crate) trait IntoResult<T> {
    fn pub_result(self, kind: ErrorKind) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, kind: ErrorKind) -> Result<T> {
        self.map_err(|e| Error::new(kind, e))
    }
}

/// Adds context to a public [`Result`] without losing its [`ErrorKind`].
pub(crate) trait WrapErr<T> {
    fn wrap_err<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    fn wrap_err_with<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> WrapErr<T> for Result<T> {
    fn wrap_err<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| e.context(context))
    }

    fn wrap_err_with<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_preserved_through_context() {
        let result: Result<()> = Err(Error::msg(ErrorKind::Validation, "missing name"));
        let err = result.wrap_err("failed to save account").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "validation error: failed to save account: missing name"
        );
    }

    #[test]
    fn test_pub_result_tags_anyhow_errors() {
        let result: std::result::Result<(), anyhow::Error> = Err(anyhow::anyhow!("disk full"));
        let err = result.pub_result(ErrorKind::Storage).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::AlreadyImported.to_string(), "already_imported");
        assert_eq!(ErrorKind::Format.to_string(), "format");
    }
}
