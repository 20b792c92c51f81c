use anyhow::{Context, Result};
use nf_core::Config as CoreConfig;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
  pub api_config: CoreConfig,
  pub database_url: String,
  pub rate_limit_file: PathBuf,
  pub lock_file: PathBuf,
  pub history_file: PathBuf,
  pub max_daily_requests: u32,
  pub reset_hour: u32,
  pub page_limit: u32,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    let api_config = CoreConfig::from_env().context("failed to load Newsfilter API settings")?;

    let database_url =
      env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;

    let rate_limit_file = env::var("NF_RATE_LIMIT_FILE")
      .unwrap_or_else(|_| "./nf_rate_limit.json".to_string())
      .into();

    let lock_file =
      env::var("NF_LOCK_FILE").unwrap_or_else(|_| "./nf_ingest.lock".to_string()).into();

    let history_file = env::var("NF_HISTORY_FILE")
      .unwrap_or_else(|_| "./nf_run_history.json".to_string())
      .into();

    let max_daily_requests =
      env_u32("NF_MAX_DAILY_REQUESTS", nf_core::DEFAULT_MAX_DAILY_REQUESTS)?;
    let reset_hour = env_u32("NF_RESET_HOUR", nf_core::DEFAULT_RESET_HOUR)?;
    let page_limit = env_u32("NF_PAGE_LIMIT", nf_core::DEFAULT_PAGE_LIMIT)?;

    Ok(Self {
      api_config,
      database_url,
      rate_limit_file,
      lock_file,
      history_file,
      max_daily_requests,
      reset_hour,
      page_limit,
    })
  }
}

fn env_u32(name: &str, default: u32) -> Result<u32> {
  match env::var(name) {
    Ok(raw) => {
      raw.trim().parse().with_context(|| format!("{name} must be an integer, got {raw:?}"))
    },
    Err(_) => Ok(default),
  }
}
