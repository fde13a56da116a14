use crate::error::{ErrorKind, IntoResult};
use crate::Result;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Write a file.
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Unable to write to {}", path.display()))
        .pub_result(ErrorKind::Io)
}

/// Read a file to a `String`.
pub(crate) async fn read(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
        .pub_result(ErrorKind::Io)
}

/// Create a directory and any missing parents.
pub(crate) async fn make_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("Unable to create directory {}", path.display()))
        .pub_result(ErrorKind::Io)
}

pub(crate) async fn canonicalize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("Unable to resolve the path {}", path.display()))
        .pub_result(ErrorKind::Io)
}
