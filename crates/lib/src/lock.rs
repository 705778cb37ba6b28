//! Workspace build lock.
//!
//! Every orchestrator entry point holds an exclusive lock on
//! `<root>/.stubsmith.lock` while it runs. The holder records which entry
//! point it is running and for which component, so a second invocation can
//! say what it is waiting for. A contending invocation polls until the lock
//! frees up or its wait budget runs out.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The entry point holding the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "kebab-case")]
pub enum LockHolder {
  Build { component: Option<String> },
  UpdateStubs,
  BuildStub { component: String },
  InjectStub { consumer: String, dependency: String },
  Clean,
}

impl fmt::Display for LockHolder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LockHolder::Build { component: None } => write!(f, "build"),
      LockHolder::Build {
        component: Some(component),
      } => write!(f, "build {component}"),
      LockHolder::UpdateStubs => write!(f, "update-stubs"),
      LockHolder::BuildStub { component } => write!(f, "stub build for {component}"),
      LockHolder::InjectStub { consumer, dependency } => {
        write!(f, "stub injection of {dependency} into {consumer}")
      }
      LockHolder::Clean => write!(f, "clean"),
    }
  }
}

/// Content of the lock file while it is held.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRecord {
  pub pid: u32,
  pub acquired_at_unix: u64,
  pub holder: LockHolder,
}

#[derive(Debug, Error)]
pub enum LockError {
  #[error(
    "workspace is busy with '{}' (PID {}), gave up after {}s; remove {} if that process is gone",
    .record.holder, .record.pid, .waited.as_secs(), .lock_path.display()
  )]
  Busy {
    record: LockRecord,
    waited: Duration,
    lock_path: PathBuf,
  },

  #[error(
    "workspace lock {} is held by another process, gave up after {}s",
    .lock_path.display(), .waited.as_secs()
  )]
  BusyUnknown { waited: Duration, lock_path: PathBuf },

  #[error("failed to open lock file {}: {source}", .lock_path.display())]
  Open {
    lock_path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to lock {}: {source}", .lock_path.display())]
  Lock {
    lock_path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to record lock holder: {0}")]
  Record(#[source] io::Error),
}

/// Exclusive hold on the workspace, released when dropped.
#[derive(Debug)]
pub struct BuildLock {
  _file: File,
  record: LockRecord,
}

impl BuildLock {
  /// Take the lock at `lock_path` on behalf of `holder`.
  ///
  /// While another process holds it, polls for up to `wait`, logging the
  /// current holder once. A zero `wait` fails on the first contention.
  pub async fn acquire(lock_path: &Path, holder: LockHolder, wait: Duration) -> Result<Self, LockError> {
    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(lock_path)
      .map_err(|source| LockError::Open {
        lock_path: lock_path.to_path_buf(),
        source,
      })?;

    let started = Instant::now();
    let mut announced = false;
    while !try_lock(&file).map_err(|source| LockError::Lock {
      lock_path: lock_path.to_path_buf(),
      source,
    })? {
      let current = read_record(lock_path);
      let waited = started.elapsed();
      if waited >= wait {
        return Err(match current {
          Some(record) => LockError::Busy {
            record,
            waited,
            lock_path: lock_path.to_path_buf(),
          },
          None => LockError::BusyUnknown {
            waited,
            lock_path: lock_path.to_path_buf(),
          },
        });
      }

      if !announced {
        match &current {
          Some(record) => warn!(pid = record.pid, "waiting for '{}' to finish", record.holder),
          None => warn!(path = %lock_path.display(), "waiting for the workspace lock"),
        }
        announced = true;
      }
      tokio::time::sleep(POLL_INTERVAL.min(wait - waited)).await;
    }

    let record = LockRecord {
      pid: std::process::id(),
      acquired_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      holder,
    };
    write_record(&file, &record)?;
    debug!(path = %lock_path.display(), holder = %record.holder, "acquired workspace lock");

    Ok(Self { _file: file, record })
  }

  pub fn record(&self) -> &LockRecord {
    &self.record
  }
}

fn write_record(file: &File, record: &LockRecord) -> Result<(), LockError> {
  file.set_len(0).map_err(LockError::Record)?;
  let mut writer = io::BufWriter::new(file);
  serde_json::to_writer(&mut writer, record).map_err(|e| LockError::Record(io::Error::other(e)))?;
  writer.flush().map_err(LockError::Record)
}

/// The record of the current holder, if it can be read.
///
/// Windows refuses reads of the locked range, so contention there is always
/// reported without a holder.
pub fn read_record(lock_path: &Path) -> Option<LockRecord> {
  let content = std::fs::read_to_string(lock_path).ok()?;
  serde_json::from_str(&content).ok()
}

/// Try to take the lock without blocking. `Ok(false)` means someone else has it.
#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<bool> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  match flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive) {
    Ok(()) => Ok(true),
    Err(e) if e == rustix::io::Errno::WOULDBLOCK => Ok(false),
    Err(e) => Err(io::Error::from_raw_os_error(e.raw_os_error())),
  }
}

#[cfg(windows)]
fn try_lock(file: &File) -> io::Result<bool> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};
  use windows_sys::Win32::System::IO::OVERLAPPED;

  let handle = file.as_raw_handle() as HANDLE;
  // SAFETY: `handle` is a valid open file handle and OVERLAPPED is valid zeroed.
  let locked = unsafe {
    let mut overlapped: OVERLAPPED = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if locked != 0 {
    return Ok(true);
  }
  let err = io::Error::last_os_error();
  if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
    Ok(false)
  } else {
    Err(err)
  }
}
