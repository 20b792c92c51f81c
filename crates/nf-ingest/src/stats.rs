//! Run accounting: what a pipeline run did and how it ended.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

/// How a pipeline run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
  /// Ran to completion (possibly exhausting the budget mid-run).
  Completed,
  /// Never started: another process holds the lock.
  SkippedLocked,
  /// Never started: today's request budget was already spent.
  SkippedRateLimited,
  /// Started but hit a fatal error before finishing.
  Aborted,
}

/// One article that failed to persist, with the reason.
#[derive(Debug, Clone)]
pub struct ArticleError {
  pub article_id: String,
  pub message: String,
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
  pub api_calls: u32,
  pub pages_fetched: u32,
  pub articles_fetched: usize,
  pub articles_created: usize,
  pub articles_duplicate: usize,
  pub articles_failed: usize,
  pub sources_created: usize,
  pub symbols_created: usize,
  pub industries_created: usize,
  pub sectors_created: usize,
  pub page_errors: u32,
  pub article_errors: Vec<ArticleError>,
  /// Budget ran out before pagination finished.
  pub budget_exhausted: bool,
  /// Wall-clock time of the run.
  pub duration: Duration,
}

/// Final result of a pipeline run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
  pub status: RunStatus,
  pub stats: IngestStats,
}

impl RunOutcome {
  pub fn skipped(status: RunStatus) -> Self {
    Self { status, stats: IngestStats::default() }
  }
}

impl IngestStats {
  pub fn record_article_error(&mut self, article_id: impl Into<String>, message: impl Into<String>) {
    self.articles_failed += 1;
    self.article_errors.push(ArticleError {
      article_id: article_id.into(),
      message: message.into(),
    });
  }

  pub fn log_summary(&self, status: RunStatus) {
    info!(
      ?status,
      api_calls = self.api_calls,
      pages = self.pages_fetched,
      fetched = self.articles_fetched,
      created = self.articles_created,
      duplicates = self.articles_duplicate,
      failed = self.articles_failed,
      sources = self.sources_created,
      symbols = self.symbols_created,
      industries = self.industries_created,
      sectors = self.sectors_created,
      page_errors = self.page_errors,
      budget_exhausted = self.budget_exhausted,
      duration_ms = self.duration.as_millis() as u64,
      "ingestion run finished"
    );
  }

  /// Human-readable summary block for CLI output.
  pub fn summary(&self, status: RunStatus) -> String {
    let mut out = String::new();
    out.push_str("=== Ingestion Summary ===\n");
    out.push_str(&format!("Status:             {status:?}\n"));
    out.push_str(&format!("API calls:          {}\n", self.api_calls));
    out.push_str(&format!("Pages fetched:      {}\n", self.pages_fetched));
    out.push_str(&format!("Articles fetched:   {}\n", self.articles_fetched));
    out.push_str(&format!("Articles created:   {}\n", self.articles_created));
    out.push_str(&format!("Duplicates skipped: {}\n", self.articles_duplicate));
    out.push_str(&format!("Articles failed:    {}\n", self.articles_failed));
    out.push_str(&format!(
      "Entities created:   {} sources, {} symbols, {} industries, {} sectors\n",
      self.sources_created, self.symbols_created, self.industries_created, self.sectors_created
    ));
    out.push_str(&format!("Duration:           {:.1}s\n", self.duration.as_secs_f64()));
    if self.page_errors > 0 {
      out.push_str(&format!("Page errors:        {}\n", self.page_errors));
    }
    if self.budget_exhausted {
      out.push_str("Daily request budget exhausted mid-run\n");
    }
    for err in &self.article_errors {
      out.push_str(&format!("  failed {}: {}\n", err.article_id, err.message));
    }
    out
  }
}
