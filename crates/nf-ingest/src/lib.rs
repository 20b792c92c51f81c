//! # nf-ingest
//!
//! Ingestion pipeline for Newsfilter article data.
//!
//! This crate provides the run machinery around the API client:
//! - Persistent daily request budgeting across process restarts
//! - Cross-process locking with stale-lock reclaim
//! - Validated, idempotent article persistence with entity resolution
//! - Per-run statistics, outcome reporting and persisted run history

pub mod error;
pub mod history;
pub mod lock;
pub mod pipeline;
pub mod rate_limit;
pub mod stats;

// Re-export commonly used types
pub use error::{IngestError, IngestResult};
pub use history::{RunHistory, RunRecord};
pub use lock::{LockGuard, ProcessLock};
pub use pipeline::{
  ArticleFeed, ArticleStore, EntityCounts, IngestionPipeline, Persisted, PgArticleStore,
  PipelineConfig, PreparedArticle,
};
pub use rate_limit::{RateLimitState, RateLimitStore};
pub use stats::{ArticleError, IngestStats, RunOutcome, RunStatus};

// Prelude for convenient imports
pub mod prelude {
  pub use crate::{
    ArticleFeed, IngestError, IngestResult, IngestStats, IngestionPipeline, PipelineConfig,
    ProcessLock, RateLimitStore, RunOutcome, RunStatus,
  };
}
