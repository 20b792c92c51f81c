//! `nf status` - inspect the budget counter and lock without running.

use std::fs;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local};
use clap::Args;

use nf_ingest::{RateLimitStore, RunHistory};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct StatusCommand {}

pub fn execute(_cmd: StatusCommand, config: Config) -> Result<()> {
  let store = RateLimitStore::new(
    &config.rate_limit_file,
    config.max_daily_requests,
    config.reset_hour,
  )?;

  let usage = store.usage();
  let remaining = config.max_daily_requests.saturating_sub(usage);
  let next_reset =
    next_reset_after(Local::now(), config.reset_hour).context("invalid reset hour")?;

  println!("Requests used:      {usage} / {}", config.max_daily_requests);
  println!("Requests remaining: {remaining}");
  println!("Budget resets:      {}", next_reset.format("%Y-%m-%d %H:%M %Z"));

  match fs::read_to_string(&config.lock_file) {
    Ok(contents) => {
      let pid = contents.lines().next().unwrap_or("?").trim();
      println!("Lock:               held by pid {pid}");
    },
    Err(_) => println!("Lock:               free"),
  }

  let recent = RunHistory::new(&config.history_file).recent(7);
  if recent.is_empty() {
    println!("Recent runs:        none in the last 7 days");
  } else {
    println!("Recent runs (last 7 days):");
    for run in recent.iter().take(10) {
      println!(
        "  {}  {:<18}  created {:>4}  duplicates {:>4}  failed {:>3}  {} calls  {:.1}s",
        run.started_at.format("%Y-%m-%d %H:%M"),
        format!("{:?}", run.status),
        run.articles_created,
        run.articles_duplicate,
        run.articles_failed,
        run.api_calls,
        run.duration_secs,
      );
    }
  }

  Ok(())
}

/// First reset instant strictly after `now`.
fn next_reset_after(now: DateTime<Local>, reset_hour: u32) -> Option<DateTime<Local>> {
  let today = now.date_naive().and_hms_opt(reset_hour, 0, 0)?.and_local_timezone(Local).earliest()?;
  if today > now {
    return Some(today);
  }
  (now.date_naive() + Duration::days(1))
    .and_hms_opt(reset_hour, 0, 0)?
    .and_local_timezone(Local)
    .earliest()
}
