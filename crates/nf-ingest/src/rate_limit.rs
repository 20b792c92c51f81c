//! Persistent daily request counter.
//!
//! The counter survives process restarts by living in a small JSON
//! file next to the lock file. A "day" starts at `reset_hour` local
//! time rather than midnight, so the effective date of an instant is
//! the local date of that instant minus `reset_hour` hours. Counts
//! are written before the request they pay for is sent: a crash
//! mid-request wastes budget instead of overspending it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IngestError, IngestResult};

/// On-disk counter state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
  pub date: NaiveDate,
  pub count: u32,
}

/// File-backed daily rate-limit counter.
#[derive(Debug, Clone)]
pub struct RateLimitStore {
  path: PathBuf,
  max_daily_requests: u32,
  reset_hour: u32,
}

impl RateLimitStore {
  pub fn new(path: impl Into<PathBuf>, max_daily_requests: u32, reset_hour: u32) -> IngestResult<Self> {
    if reset_hour > 23 {
      return Err(IngestError::ConfigurationError(format!(
        "reset hour must be 0-23, got {reset_hour}"
      )));
    }
    Ok(Self { path: path.into(), max_daily_requests, reset_hour })
  }

  pub fn max_daily_requests(&self) -> u32 {
    self.max_daily_requests
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Effective accounting day for `now`: a run at 01:00 with a
  /// reset hour of 6 still bills yesterday's budget.
  pub fn effective_date_at(&self, now: DateTime<Local>) -> NaiveDate {
    (now - Duration::hours(self.reset_hour as i64)).date_naive()
  }

  /// Whether another request fits in today's budget.
  pub fn can_call(&self) -> bool {
    self.can_call_at(Local::now())
  }

  pub fn can_call_at(&self, now: DateTime<Local>) -> bool {
    self.usage_at(now) < self.max_daily_requests
  }

  /// Requests already spent against the current effective day.
  pub fn usage(&self) -> u32 {
    self.usage_at(Local::now())
  }

  pub fn usage_at(&self, now: DateTime<Local>) -> u32 {
    match self.load() {
      Some(state) if state.date == self.effective_date_at(now) => state.count,
      _ => 0,
    }
  }

  /// Charge one request against today's budget and persist the new
  /// count. Call this before sending the request it pays for.
  pub fn record_call(&self) -> IngestResult<u32> {
    self.record_call_at(Local::now())
  }

  pub fn record_call_at(&self, now: DateTime<Local>) -> IngestResult<u32> {
    let today = self.effective_date_at(now);
    let count = match self.load() {
      Some(state) if state.date == today => state.count + 1,
      _ => 1,
    };
    self.persist(&RateLimitState { date: today, count })?;
    debug!(count, max = self.max_daily_requests, "recorded api call");
    Ok(count)
  }

  /// Read counter state; a missing or unreadable file counts as a
  /// fresh day (fail open).
  fn load(&self) -> Option<RateLimitState> {
    let raw = match fs::read_to_string(&self.path) {
      Ok(raw) => raw,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
      Err(err) => {
        warn!(path = %self.path.display(), %err, "rate limit file unreadable, counter resets");
        return None;
      },
    };
    match serde_json::from_str(&raw) {
      Ok(state) => Some(state),
      Err(err) => {
        warn!(path = %self.path.display(), %err, "rate limit file corrupt, counter resets");
        None
      },
    }
  }

  /// Write the new state via a temp file and rename so readers never
  /// observe a half-written counter.
  fn persist(&self, state: &RateLimitState) -> IngestResult<()> {
    if let Some(parent) = self.path.parent() {
      if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
      }
    }
    let tmp = self.path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_string(state)?)?;
    fs::rename(&tmp, &self.path)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use tempfile::TempDir;

  fn store_in(dir: &TempDir, max: u32, reset_hour: u32) -> RateLimitStore {
    RateLimitStore::new(dir.path().join("rate_limit.json"), max, reset_hour).unwrap()
  }

  fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
  }

  #[test]
  fn test_counter_starts_at_zero() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 100, 0);
    let now = at(2026, 3, 10, 12);
    assert_eq!(store.usage_at(now), 0);
    assert!(store.can_call_at(now));
  }

  #[test]
  fn test_record_call_is_monotonic_within_a_day() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 100, 0);
    let now = at(2026, 3, 10, 12);
    assert_eq!(store.record_call_at(now).unwrap(), 1);
    assert_eq!(store.record_call_at(now).unwrap(), 2);
    assert_eq!(store.record_call_at(now).unwrap(), 3);
    assert_eq!(store.usage_at(now), 3);
  }

  #[test]
  fn test_budget_exhaustion_blocks_further_calls() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 2, 0);
    let now = at(2026, 3, 10, 12);
    store.record_call_at(now).unwrap();
    assert!(store.can_call_at(now));
    store.record_call_at(now).unwrap();
    assert!(!store.can_call_at(now));
  }

  #[test]
  fn test_day_rollover_resets_count() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 100, 0);
    let yesterday = at(2026, 3, 10, 23);
    for _ in 0..100 {
      store.record_call_at(yesterday).unwrap();
    }
    assert!(!store.can_call_at(yesterday));

    let today = at(2026, 3, 11, 1);
    assert!(store.can_call_at(today));
    assert_eq!(store.record_call_at(today).unwrap(), 1);
    assert_eq!(store.usage_at(today), 1);
  }

  #[test]
  fn test_reset_hour_shifts_day_boundary() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 100, 6);
    // 01:30 on the 11th is still the 10th's budget window
    let late_night = at(2026, 3, 11, 1);
    assert_eq!(
      store.effective_date_at(late_night),
      NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    );
    store.record_call_at(late_night).unwrap();

    // 07:30 on the 11th is past the reset, fresh budget
    let after_reset = at(2026, 3, 11, 7);
    assert_eq!(store.usage_at(after_reset), 0);
    assert_eq!(store.usage_at(late_night), 1);
  }

  #[test]
  fn test_corrupt_file_resets_counter() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 100, 0);
    let now = at(2026, 3, 10, 12);
    store.record_call_at(now).unwrap();
    fs::write(store.path(), "{not json").unwrap();

    assert_eq!(store.usage_at(now), 0);
    assert_eq!(store.record_call_at(now).unwrap(), 1);
  }

  #[test]
  fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let now = at(2026, 3, 10, 12);
    {
      let store = store_in(&dir, 100, 0);
      store.record_call_at(now).unwrap();
      store.record_call_at(now).unwrap();
    }
    let reopened = store_in(&dir, 100, 0);
    assert_eq!(reopened.usage_at(now), 2);
  }

  #[test]
  fn test_invalid_reset_hour_rejected() {
    let dir = TempDir::new().unwrap();
    let result = RateLimitStore::new(dir.path().join("rl.json"), 100, 24);
    assert!(matches!(result, Err(IngestError::ConfigurationError(_))));
  }
}
