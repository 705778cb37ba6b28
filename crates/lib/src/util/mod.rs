//! Filesystem helpers shared by the pipeline stages.

#[cfg(test)]
pub mod testutil;

use std::io;
use std::path::Path;

use crate::error::BuildError;

/// Create `path` and its parents, mapping failures to `BuildError::Io`.
pub async fn ensure_dir(path: &Path) -> Result<(), BuildError> {
  tokio::fs::create_dir_all(path).await.map_err(BuildError::io(path))
}

/// Remove a file, treating an already absent file as success.
pub async fn remove_file_if_exists(path: &Path) -> Result<(), BuildError> {
  match tokio::fs::remove_file(path).await {
    Err(e) if e.kind() != io::ErrorKind::NotFound => Err(BuildError::io(path)(e)),
    _ => Ok(()),
  }
}

/// Remove a directory tree.
///
/// Returns `false` when there was nothing to remove.
pub async fn remove_dir_if_exists(path: &Path) -> Result<bool, BuildError> {
  match tokio::fs::remove_dir_all(path).await {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(BuildError::io(path)(e)),
  }
}
