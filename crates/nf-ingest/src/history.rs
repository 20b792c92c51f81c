//! Per-run history persisted across runs.
//!
//! Each finished run appends one record to a JSON history file so a
//! cron deployment can answer "what did the last runs do" without
//! trawling logs. The file keeps the newest hundred runs; missing or
//! corrupt history starts over empty, same policy as the counter.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::IngestResult;
use crate::stats::{IngestStats, RunStatus};

/// Runs retained in the history file.
const MAX_HISTORY_RUNS: usize = 100;

/// One finished run as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
  pub started_at: DateTime<Local>,
  pub status: RunStatus,
  pub duration_secs: f64,
  pub api_calls: u32,
  pub articles_fetched: usize,
  pub articles_created: usize,
  pub articles_duplicate: usize,
  pub articles_failed: usize,
  pub sources_created: usize,
  pub symbols_created: usize,
  pub industries_created: usize,
  pub sectors_created: usize,
}

impl RunRecord {
  pub fn new(started_at: DateTime<Local>, status: RunStatus, stats: &IngestStats) -> Self {
    Self {
      started_at,
      status,
      duration_secs: stats.duration.as_secs_f64(),
      api_calls: stats.api_calls,
      articles_fetched: stats.articles_fetched,
      articles_created: stats.articles_created,
      articles_duplicate: stats.articles_duplicate,
      articles_failed: stats.articles_failed,
      sources_created: stats.sources_created,
      symbols_created: stats.symbols_created,
      industries_created: stats.industries_created,
      sectors_created: stats.sectors_created,
    }
  }

  /// Share of processed articles that persisted cleanly, in percent.
  pub fn success_rate(&self) -> f64 {
    let total = self.articles_created + self.articles_duplicate + self.articles_failed;
    if total == 0 {
      return 100.0;
    }
    ((total - self.articles_failed) as f64 / total as f64) * 100.0
  }
}

/// File-backed log of recent run outcomes.
#[derive(Debug, Clone)]
pub struct RunHistory {
  path: PathBuf,
}

impl RunHistory {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// All stored records, oldest first.
  pub fn load(&self) -> Vec<RunRecord> {
    let raw = match fs::read_to_string(&self.path) {
      Ok(raw) => raw,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
      Err(err) => {
        warn!(path = %self.path.display(), %err, "run history unreadable, starting fresh");
        return Vec::new();
      },
    };
    match serde_json::from_str(&raw) {
      Ok(records) => records,
      Err(err) => {
        warn!(path = %self.path.display(), %err, "run history corrupt, starting fresh");
        Vec::new()
      },
    }
  }

  /// Append one record, dropping the oldest beyond the retention cap.
  pub fn record(&self, record: RunRecord) -> IngestResult<()> {
    let mut records = self.load();
    records.push(record);
    if records.len() > MAX_HISTORY_RUNS {
      let excess = records.len() - MAX_HISTORY_RUNS;
      records.drain(..excess);
    }
    self.persist(&records)
  }

  /// Records from the trailing `days` days, newest first.
  pub fn recent(&self, days: i64) -> Vec<RunRecord> {
    let cutoff = Local::now() - Duration::days(days);
    let mut records: Vec<RunRecord> =
      self.load().into_iter().filter(|record| record.started_at >= cutoff).collect();
    records.reverse();
    records
  }

  fn persist(&self, records: &[RunRecord]) -> IngestResult<()> {
    if let Some(parent) = self.path.parent() {
      if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
      }
    }
    let tmp = self.path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_string_pretty(records)?)?;
    fs::rename(&tmp, &self.path)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn history_in(dir: &TempDir) -> RunHistory {
    RunHistory::new(dir.path().join("run_history.json"))
  }

  fn record_at(started_at: DateTime<Local>, created: usize) -> RunRecord {
    let stats = IngestStats { articles_created: created, ..Default::default() };
    RunRecord::new(started_at, RunStatus::Completed, &stats)
  }

  #[test]
  fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
      let history = history_in(&dir);
      history.record(record_at(Local::now(), 10)).unwrap();
      history.record(record_at(Local::now(), 20)).unwrap();
    }

    let reopened = history_in(&dir);
    let records = reopened.load();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].articles_created, 10);
    assert_eq!(records[1].articles_created, 20);
  }

  #[test]
  fn test_retention_drops_oldest_runs() {
    let dir = TempDir::new().unwrap();
    let history = history_in(&dir);
    for n in 0..MAX_HISTORY_RUNS + 5 {
      history.record(record_at(Local::now(), n)).unwrap();
    }

    let records = history.load();
    assert_eq!(records.len(), MAX_HISTORY_RUNS);
    // The five oldest records were dropped
    assert_eq!(records[0].articles_created, 5);
    assert_eq!(records[MAX_HISTORY_RUNS - 1].articles_created, MAX_HISTORY_RUNS + 4);
  }

  #[test]
  fn test_recent_filters_by_age_and_orders_newest_first() {
    let dir = TempDir::new().unwrap();
    let history = history_in(&dir);
    history.record(record_at(Local::now() - Duration::days(30), 1)).unwrap();
    history.record(record_at(Local::now() - Duration::days(2), 2)).unwrap();
    history.record(record_at(Local::now(), 3)).unwrap();

    let recent = history.recent(7);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].articles_created, 3);
    assert_eq!(recent[1].articles_created, 2);
  }

  #[test]
  fn test_corrupt_history_starts_fresh() {
    let dir = TempDir::new().unwrap();
    let history = history_in(&dir);
    history.record(record_at(Local::now(), 1)).unwrap();
    fs::write(history.path(), "[{broken").unwrap();

    assert!(history.load().is_empty());
    history.record(record_at(Local::now(), 2)).unwrap();
    assert_eq!(history.load().len(), 1);
  }

  #[test]
  fn test_success_rate() {
    let stats = IngestStats {
      articles_created: 8,
      articles_duplicate: 1,
      articles_failed: 1,
      ..Default::default()
    };
    let record = RunRecord::new(Local::now(), RunStatus::Completed, &stats);
    assert!((record.success_rate() - 90.0).abs() < f64::EPSILON);

    let empty = RunRecord::new(Local::now(), RunStatus::Completed, &IngestStats::default());
    assert!((empty.success_rate() - 100.0).abs() < f64::EPSILON);
  }
}
