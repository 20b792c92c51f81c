//! Cross-process exclusion via a pid lock file.
//!
//! Acquisition creates the lock file with `O_EXCL`, so exactly one
//! process wins even when several start at once. The file records the
//! owner's pid; a later process finding the file checks whether that
//! pid is still alive and reclaims the lock when it is not, which
//! covers owners that crashed or were SIGKILLed and never ran their
//! cleanup.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::error::{IngestError, IngestResult};

/// Cross-process lock rooted at one filesystem path.
#[derive(Debug, Clone)]
pub struct ProcessLock {
  path: PathBuf,
}

/// Proof of lock ownership. Releases the lock on drop.
#[derive(Debug)]
pub struct LockGuard {
  path: PathBuf,
  pid: u32,
  released: bool,
}

impl ProcessLock {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Try to take the lock. `Err(LockError)` with the holder's pid
  /// means another live process owns it; that is the normal
  /// concurrent-run outcome, not a failure.
  pub fn acquire(&self) -> IngestResult<LockGuard> {
    match self.try_create() {
      Ok(guard) => Ok(guard),
      Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => self.handle_contention(),
      Err(err) => Err(err.into()),
    }
  }

  fn try_create(&self) -> std::io::Result<LockGuard> {
    if let Some(parent) = self.path.parent() {
      if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
      }
    }
    let pid = std::process::id();
    let mut file = OpenOptions::new().write(true).create_new(true).open(&self.path)?;
    writeln!(file, "{pid}")?;
    writeln!(file, "{}", Local::now().to_rfc3339())?;
    file.sync_all()?;
    debug!(path = %self.path.display(), pid, "lock acquired");
    Ok(LockGuard { path: self.path.clone(), pid, released: false })
  }

  /// The lock file already exists: reclaim it if the recorded owner
  /// is dead or unreadable, otherwise report who holds it.
  fn handle_contention(&self) -> IngestResult<LockGuard> {
    match self.read_owner_pid() {
      Some(pid) if pid_alive(pid) => {
        Err(IngestError::LockError(format!("held by running process {pid}")))
      },
      Some(pid) => {
        info!(path = %self.path.display(), stale_pid = pid, "reclaiming stale lock");
        self.reclaim()
      },
      None => {
        warn!(path = %self.path.display(), "lock file owner pid unreadable, reclaiming");
        self.reclaim()
      },
    }
  }

  fn reclaim(&self) -> IngestResult<LockGuard> {
    self.remove_stale()?;
    // One retry only: losing the post-reclaim race means another
    // process won the lock fairly.
    self.try_create().map_err(|err| {
      if err.kind() == std::io::ErrorKind::AlreadyExists {
        IngestError::LockError("lost reclaim race to another process".to_string())
      } else {
        err.into()
      }
    })
  }

  fn read_owner_pid(&self) -> Option<u32> {
    let raw = fs::read_to_string(&self.path).ok()?;
    raw.lines().next()?.trim().parse().ok()
  }

  fn remove_stale(&self) -> IngestResult<()> {
    match fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      // Someone else reclaimed it first
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(err) => Err(err.into()),
    }
  }
}

/// Liveness check through /proc. On systems without /proc we cannot
/// tell, so presume the owner is alive and leave the lock in place.
fn pid_alive(pid: u32) -> bool {
  if !Path::new("/proc").is_dir() {
    warn!(pid, "no /proc available, presuming lock owner is alive");
    return true;
  }
  Path::new(&format!("/proc/{pid}")).exists()
}

impl LockGuard {
  /// Release the lock. Safe to call more than once; only removes the
  /// file while this process still owns it.
  pub fn release(&mut self) -> IngestResult<()> {
    if self.released {
      return Ok(());
    }
    self.released = true;

    let owner = fs::read_to_string(&self.path)
      .ok()
      .and_then(|raw| raw.lines().next().and_then(|line| line.trim().parse::<u32>().ok()));
    match owner {
      Some(pid) if pid == self.pid => {
        fs::remove_file(&self.path)?;
        debug!(path = %self.path.display(), "lock released");
        Ok(())
      },
      Some(pid) => {
        warn!(expected = self.pid, found = pid, "lock file owned by someone else, not removing");
        Ok(())
      },
      None => Ok(()),
    }
  }
}

impl Drop for LockGuard {
  fn drop(&mut self) {
    if let Err(err) = self.release() {
      warn!(path = %self.path.display(), %err, "failed to release lock on drop");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn lock_in(dir: &TempDir) -> ProcessLock {
    ProcessLock::new(dir.path().join("ingest.lock"))
  }

  #[test]
  fn test_acquire_creates_lock_file_with_own_pid() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);
    let _guard = lock.acquire().unwrap();

    let contents = fs::read_to_string(lock.path()).unwrap();
    let pid: u32 = contents.lines().next().unwrap().trim().parse().unwrap();
    assert_eq!(pid, std::process::id());
  }

  #[test]
  fn test_second_acquire_fails_while_held() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);
    let _guard = lock.acquire().unwrap();

    // Our own pid is alive, so the lock is not stale
    let second = lock.acquire();
    assert!(matches!(second, Err(IngestError::LockError(_))));
  }

  #[test]
  fn test_stale_lock_is_reclaimed() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);
    // A pid far above pid_max never belongs to a live process
    fs::write(lock.path(), "999999999\n2026-01-01T00:00:00+00:00\n").unwrap();

    let guard = lock.acquire().unwrap();
    drop(guard);
    assert!(!lock.path().exists());
  }

  #[test]
  fn test_unreadable_owner_is_reclaimed() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);
    fs::write(lock.path(), "garbage\n").unwrap();

    let _guard = lock.acquire().unwrap();
    let contents = fs::read_to_string(lock.path()).unwrap();
    let pid: u32 = contents.lines().next().unwrap().trim().parse().unwrap();
    assert_eq!(pid, std::process::id());
  }

  #[test]
  fn test_release_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);
    let mut guard = lock.acquire().unwrap();

    guard.release().unwrap();
    assert!(!lock.path().exists());
    guard.release().unwrap();
  }

  #[test]
  fn test_drop_releases_lock() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);
    {
      let _guard = lock.acquire().unwrap();
      assert!(lock.path().exists());
    }
    assert!(!lock.path().exists());
    // And the lock is reacquirable afterwards
    let _guard = lock.acquire().unwrap();
  }

  #[test]
  fn test_release_leaves_foreign_lock_alone() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);
    let mut guard = lock.acquire().unwrap();
    // Simulate another process replacing the lock file
    fs::write(lock.path(), "999999999\n").unwrap();

    guard.release().unwrap();
    assert!(lock.path().exists());
    fs::remove_file(lock.path()).unwrap();
  }
}
