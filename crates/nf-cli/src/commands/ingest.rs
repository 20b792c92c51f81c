//! `nf ingest` - run one ingestion pass.

use anyhow::Result;
use clap::Args;
use tracing::info;

use nf_client::NewsfilterClient;
use nf_ingest::{IngestionPipeline, PipelineConfig, RunStatus};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct IngestCommand {
  /// Articles requested per page (overrides NF_PAGE_LIMIT)
  #[arg(long)]
  page_limit: Option<u32>,

  /// Daily request budget (overrides NF_MAX_DAILY_REQUESTS)
  #[arg(long)]
  max_daily_requests: Option<u32>,
}

pub async fn execute(cmd: IngestCommand, config: Config) -> Result<()> {
  let client = NewsfilterClient::new(&config.api_config)?;

  let pipeline_config = PipelineConfig {
    database_url: config.database_url,
    rate_limit_file: config.rate_limit_file,
    lock_file: config.lock_file,
    history_file: config.history_file,
    max_daily_requests: cmd.max_daily_requests.unwrap_or(config.max_daily_requests),
    reset_hour: config.reset_hour,
    page_limit: cmd.page_limit.unwrap_or(config.page_limit),
  };

  info!(page_limit = pipeline_config.page_limit, "starting ingestion run");
  let pipeline = IngestionPipeline::new(client, pipeline_config);
  let outcome = pipeline.run().await?;

  // Skips are normal outcomes for a scheduled job, not failures
  match outcome.status {
    RunStatus::SkippedLocked => {
      println!("Skipped: another ingestion process holds the lock");
    },
    RunStatus::SkippedRateLimited => {
      println!("Skipped: daily request budget already spent");
    },
    _ => print!("{}", outcome.stats.summary(outcome.status)),
  }

  Ok(())
}
