//! Timestamp-based staleness checks.
//!
//! A target is stale when it is missing or when any source was modified after
//! it. Directories count as their most recently modified entry, recursively.
//! There is no content hashing: touching a file without changing it still
//! triggers a rebuild.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::BuildError;

/// Returns the newest modification time found at `path`.
///
/// For a file this is the file's own mtime. For a directory it is the newest
/// mtime among the directory itself and everything below it.
pub fn latest_modified(path: &Path) -> io::Result<SystemTime> {
  let metadata = std::fs::metadata(path)?;
  let mut latest = metadata.modified()?;

  if metadata.is_dir() {
    for entry in WalkDir::new(path).min_depth(1) {
      let entry = entry.map_err(io::Error::other)?;
      let modified = entry.metadata().map_err(io::Error::other)?.modified()?;
      if modified > latest {
        latest = modified;
      }
    }
  }

  Ok(latest)
}

/// Decide whether the operation producing `targets` from `sources` must run.
///
/// Returns `true` when `targets` is empty, when any target is missing, or when
/// the newest source is strictly newer than any target. A missing source is an
/// error since there is nothing to compare against.
pub fn is_stale(targets: &[PathBuf], sources: &[PathBuf]) -> Result<bool, BuildError> {
  if targets.is_empty() {
    return Ok(true);
  }

  let mut target_times = Vec::with_capacity(targets.len());
  for target in targets {
    if !target.exists() {
      debug!(target = %target.display(), "target missing");
      return Ok(true);
    }
    target_times.push((target, latest_modified(target).map_err(BuildError::io(target))?));
  }

  let newest_source = newest_source(sources)?;
  let Some(newest_source) = newest_source else {
    return Ok(false);
  };

  for (target, modified) in target_times {
    if newest_source > modified {
      debug!(target = %target.display(), "target older than its sources");
      return Ok(true);
    }
  }

  Ok(false)
}

fn newest_source(sources: &[PathBuf]) -> Result<Option<SystemTime>, BuildError> {
  let mut newest: Option<SystemTime> = None;

  for source in sources {
    if !source.exists() {
      return Err(BuildError::SourceMissing { path: source.clone() });
    }
    let modified = latest_modified(source).map_err(BuildError::io(source))?;
    newest = Some(newest.map_or(modified, |n| n.max(modified)));
  }

  Ok(newest)
}
