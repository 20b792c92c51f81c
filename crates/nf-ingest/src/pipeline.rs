/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Article ingestion pipeline.
//!
//! One run holds the process lock for its whole duration, re-checks
//! the daily request budget before every page fetch, and persists
//! each article in its own transaction so a bad record never takes
//! its page down with it. Runs are idempotent: re-ingesting a feed
//! window only counts duplicates.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use tracing::{error, info, instrument, warn};

use nf_client::NewsfilterClient;
use nf_database_postgres::models::{
  Article, Industry, NewArticle, NewArticleIndustry, NewArticleSector, NewArticleSymbol, Sector,
  Source, Symbol,
};
use nf_database_postgres::{establish_connection, Resolver};
use nf_models::{ArticlePage, ArticleRecord};

use crate::error::{IngestError, IngestResult};
use crate::history::{RunHistory, RunRecord};
use crate::lock::ProcessLock;
use crate::rate_limit::RateLimitStore;
use crate::stats::{IngestStats, RunOutcome, RunStatus};

/// Source of article pages. The production implementation is
/// [`NewsfilterClient`]; tests substitute a scripted feed.
#[async_trait]
pub trait ArticleFeed: Send + Sync {
  async fn fetch_page(&self, cursor: Option<&str>, limit: u32) -> nf_core::Result<ArticlePage>;
}

#[async_trait]
impl ArticleFeed for NewsfilterClient {
  async fn fetch_page(&self, cursor: Option<&str>, limit: u32) -> nf_core::Result<ArticlePage> {
    NewsfilterClient::fetch_page(self, cursor, limit).await
  }
}

/// Pipeline settings, assembled by the CLI from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  pub database_url: String,
  pub rate_limit_file: PathBuf,
  pub lock_file: PathBuf,
  pub history_file: PathBuf,
  pub max_daily_requests: u32,
  pub reset_hour: u32,
  pub page_limit: u32,
}

/// An article that passed validation, ready to persist.
#[derive(Debug, Clone)]
pub struct PreparedArticle {
  pub id: String,
  pub title: String,
  pub description: Option<String>,
  pub source_url: String,
  pub image_url: Option<String>,
  pub published_at: DateTime<Utc>,
  pub source_id: String,
  pub source_name: String,
  pub symbols: Vec<String>,
  pub industries: Vec<String>,
  pub sectors: Vec<String>,
}

impl PreparedArticle {
  /// Validate a wire record into a persistable article.
  ///
  /// Required: id, title, sourceUrl, publishedAt (RFC 3339) and the
  /// source object. Description and image stay optional; tag lists
  /// are deduplicated and symbols uppercased.
  pub fn from_record(record: ArticleRecord) -> IngestResult<Self> {
    let id = required(record.id, "id")?;
    let title = required(record.title, "title")?;
    let source_url = required(record.source_url, "sourceUrl")?;
    let published_raw = required(record.published_at, "publishedAt")?;
    let published_at = DateTime::parse_from_rfc3339(&published_raw)
      .map_err(|err| {
        IngestError::InvalidData(format!("unparseable publishedAt {published_raw:?}: {err}"))
      })?
      .with_timezone(&Utc);
    let source = record
      .source
      .ok_or_else(|| IngestError::InvalidData("missing field `source`".to_string()))?;

    Ok(Self {
      id,
      title,
      description: record.description.filter(|d| !d.trim().is_empty()),
      source_url,
      image_url: record.image_url.filter(|u| !u.trim().is_empty()),
      published_at,
      source_id: source.id,
      source_name: source.name,
      symbols: normalize_tags(record.symbols, true),
      industries: normalize_tags(record.industries, false),
      sectors: normalize_tags(record.sectors, false),
    })
  }
}

fn required(field: Option<String>, name: &str) -> IngestResult<String> {
  match field {
    Some(value) if !value.trim().is_empty() => Ok(value),
    _ => Err(IngestError::InvalidData(format!("missing field `{name}`"))),
  }
}

/// Trim, drop empties, deduplicate preserving feed order. Ticker
/// symbols are additionally uppercased so `aapl` and `AAPL` resolve
/// to one row.
fn normalize_tags(tags: Vec<String>, uppercase: bool) -> Vec<String> {
  let mut seen = HashSet::new();
  tags
    .into_iter()
    .map(|tag| {
      let tag = tag.trim();
      if uppercase { tag.to_uppercase() } else { tag.to_string() }
    })
    .filter(|tag| !tag.is_empty())
    .filter(|tag| seen.insert(tag.clone()))
    .collect()
}

/// Per-run entity resolvers, one per natural-key table.
struct Resolvers {
  sources: Resolver<Source>,
  symbols: Resolver<Symbol>,
  industries: Resolver<Industry>,
  sectors: Resolver<Sector>,
}

impl Resolvers {
  fn new() -> Self {
    Self {
      sources: Resolver::new(),
      symbols: Resolver::new(),
      industries: Resolver::new(),
      sectors: Resolver::new(),
    }
  }

  fn commit(&mut self) {
    self.sources.commit();
    self.symbols.commit();
    self.industries.commit();
    self.sectors.commit();
  }

  fn rollback(&mut self) {
    self.sources.rollback();
    self.symbols.rollback();
    self.industries.rollback();
    self.sectors.rollback();
  }
}

/// What one article's unit of work did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
  Created,
  Duplicate,
}

/// Entities created by committed article writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
  pub sources: usize,
  pub symbols: usize,
  pub industries: usize,
  pub sectors: usize,
}

/// Sink for validated articles. The production implementation is
/// [`PgArticleStore`]; tests substitute an in-memory store.
#[async_trait]
pub trait ArticleStore: Send {
  /// Persist one article atomically.
  async fn persist(&mut self, article: &PreparedArticle) -> IngestResult<Persisted>;

  /// Entities created by the articles persisted so far.
  fn entities_created(&self) -> EntityCounts;
}

/// Postgres-backed article store: one transaction per article, with
/// per-run entity resolvers whose staged work commits or rolls back
/// with the article.
pub struct PgArticleStore {
  conn: AsyncPgConnection,
  resolvers: Resolvers,
}

impl PgArticleStore {
  pub fn new(conn: AsyncPgConnection) -> Self {
    Self { conn, resolvers: Resolvers::new() }
  }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
  async fn persist(&mut self, article: &PreparedArticle) -> IngestResult<Persisted> {
    match persist_one(&mut self.conn, &mut self.resolvers, article).await {
      Ok(persisted) => {
        self.resolvers.commit();
        Ok(persisted)
      },
      Err(err) => {
        self.resolvers.rollback();
        Err(err.into())
      },
    }
  }

  fn entities_created(&self) -> EntityCounts {
    EntityCounts {
      sources: self.resolvers.sources.created(),
      symbols: self.resolvers.symbols.created(),
      industries: self.resolvers.industries.created(),
      sectors: self.resolvers.sectors.created(),
    }
  }
}

pub struct IngestionPipeline<F: ArticleFeed> {
  feed: F,
  config: PipelineConfig,
}

impl<F: ArticleFeed> IngestionPipeline<F> {
  pub fn new(feed: F, config: PipelineConfig) -> Self {
    Self { feed, config }
  }

  /// Execute one ingestion run.
  ///
  /// Skips cleanly (without touching the network or the database)
  /// when another run holds the lock or today's budget is spent.
  /// Fatal errors release the lock before propagating.
  #[instrument(skip(self))]
  pub async fn run(&self) -> IngestResult<RunOutcome> {
    let lock = ProcessLock::new(&self.config.lock_file);
    let mut guard = match lock.acquire() {
      Ok(guard) => guard,
      Err(IngestError::LockError(reason)) => {
        info!(%reason, "another ingestion run is active, skipping");
        return Ok(RunOutcome::skipped(RunStatus::SkippedLocked));
      },
      Err(err) => return Err(err),
    };

    let rate_store = RateLimitStore::new(
      &self.config.rate_limit_file,
      self.config.max_daily_requests,
      self.config.reset_hour,
    )?;
    if !rate_store.can_call() {
      guard.release()?;
      info!(
        usage = rate_store.usage(),
        max = rate_store.max_daily_requests(),
        "daily request budget already spent, skipping"
      );
      return Ok(RunOutcome::skipped(RunStatus::SkippedRateLimited));
    }

    let started_at = Local::now();
    let started = std::time::Instant::now();
    let mut stats = IngestStats::default();
    let result = self.ingest(&rate_store, &mut stats).await;
    stats.duration = started.elapsed();
    let released = guard.release();

    match result {
      Ok(()) => {
        released?;
        stats.log_summary(RunStatus::Completed);
        self.record_history(started_at, RunStatus::Completed, &stats);
        Ok(RunOutcome { status: RunStatus::Completed, stats })
      },
      Err(err) => {
        if let Err(release_err) = released {
          warn!(%release_err, "failed to release lock after aborted run");
        }
        error!(%err, "ingestion run aborted");
        stats.log_summary(RunStatus::Aborted);
        self.record_history(started_at, RunStatus::Aborted, &stats);
        Err(err)
      },
    }
  }

  async fn ingest(&self, rate_store: &RateLimitStore, stats: &mut IngestStats) -> IngestResult<()> {
    let records = self.fetch_articles(rate_store, stats).await?;

    let conn = establish_connection(&self.config.database_url).await?;
    let mut store = PgArticleStore::new(conn);
    persist_all(&mut store, records, stats).await;
    Ok(())
  }

  /// Best effort: a run that did real work should never fail because
  /// its history entry could not be written.
  fn record_history(&self, started_at: DateTime<Local>, status: RunStatus, stats: &IngestStats) {
    let history = RunHistory::new(&self.config.history_file);
    if let Err(err) = history.record(RunRecord::new(started_at, status, stats)) {
      warn!(%err, "failed to record run history");
    }
  }

  /// Walk the paginated feed, re-checking the budget before every
  /// page. Counts are persisted before the fetch they pay for, so a
  /// crash can only waste budget.
  async fn fetch_articles(
    &self,
    rate_store: &RateLimitStore,
    stats: &mut IngestStats,
  ) -> IngestResult<Vec<ArticleRecord>> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
      if !rate_store.can_call() {
        info!(pages = stats.pages_fetched, "request budget exhausted mid-run");
        stats.budget_exhausted = true;
        break;
      }
      rate_store.record_call()?;
      stats.api_calls += 1;

      let page = match self.feed.fetch_page(cursor.as_deref(), self.config.page_limit).await {
        Ok(page) => page,
        Err(err) => {
          warn!(%err, page = stats.pages_fetched + 1, "page fetch failed, stopping pagination");
          stats.page_errors += 1;
          break;
        },
      };

      stats.pages_fetched += 1;
      stats.articles_fetched += page.articles.len();
      records.extend(page.articles);

      match page.next_cursor {
        Some(next) => cursor = Some(next),
        None => break,
      }
    }

    Ok(records)
  }

}

/// Persist every fetched article through the store. A failed article
/// is recorded and skipped; the rest of the batch proceeds.
async fn persist_all<S: ArticleStore>(
  store: &mut S,
  records: Vec<ArticleRecord>,
  stats: &mut IngestStats,
) {
  for record in records {
    let article_id = record.id.clone().unwrap_or_else(|| "<missing id>".to_string());
    let article = match PreparedArticle::from_record(record) {
      Ok(article) => article,
      Err(err) => {
        warn!(article_id, %err, "article failed validation");
        stats.record_article_error(article_id, err.to_string());
        continue;
      },
    };

    match store.persist(&article).await {
      Ok(Persisted::Created) => stats.articles_created += 1,
      Ok(Persisted::Duplicate) => stats.articles_duplicate += 1,
      Err(err) => {
        warn!(article_id = %article.id, %err, "article failed to persist");
        stats.record_article_error(article.id, err.to_string());
      },
    }
  }

  let entities = store.entities_created();
  stats.sources_created = entities.sources;
  stats.symbols_created = entities.symbols;
  stats.industries_created = entities.industries;
  stats.sectors_created = entities.sectors;
}

/// One article's unit of work: resolve its source, bail early on a
/// known id, resolve its tags, then write the row and its edges.
async fn persist_one(
  conn: &mut AsyncPgConnection,
  resolvers: &mut Resolvers,
  article: &PreparedArticle,
) -> Result<Persisted, diesel::result::Error> {
  conn
    .transaction(|conn| {
      async move {
        resolvers
          .sources
          .resolve(conn, &article.source_id, article.source_name.as_str())
          .await?;

        if Article::exists(conn, &article.id).await? {
          return Ok(Persisted::Duplicate);
        }

        for symbol in &article.symbols {
          resolvers.symbols.resolve(conn, symbol, &()).await?;
        }
        for industry in &article.industries {
          resolvers.industries.resolve(conn, industry, &()).await?;
        }
        for sector in &article.sectors {
          resolvers.sectors.resolve(conn, sector, &()).await?;
        }

        let now = Utc::now();
        let created = NewArticle {
          id: &article.id,
          title: &article.title,
          description: article.description.as_deref(),
          source_url: &article.source_url,
          image_url: article.image_url.as_deref(),
          published_at: article.published_at,
          source_id: &article.source_id,
          created_at: now,
          updated_at: now,
        }
        .insert_if_new(conn)
        .await?;
        if !created {
          // Lost an insert race after the existence check
          return Ok(Persisted::Duplicate);
        }

        let symbol_edges: Vec<NewArticleSymbol> = article
          .symbols
          .iter()
          .map(|symbol| NewArticleSymbol { article_id: &article.id, symbol_id: symbol })
          .collect();
        NewArticleSymbol::bulk_insert(conn, &symbol_edges).await?;

        let industry_edges: Vec<NewArticleIndustry> = article
          .industries
          .iter()
          .map(|industry| NewArticleIndustry { article_id: &article.id, industry_id: industry })
          .collect();
        NewArticleIndustry::bulk_insert(conn, &industry_edges).await?;

        let sector_edges: Vec<NewArticleSector> = article
          .sectors
          .iter()
          .map(|sector| NewArticleSector { article_id: &article.id, sector_id: sector })
          .collect();
        NewArticleSector::bulk_insert(conn, &sector_edges).await?;

        Ok(Persisted::Created)
      }
      .scope_boxed()
    })
    .await
}

#[cfg(test)]
mod tests {
  use super::*;
  use nf_models::SourceRecord;
  use std::collections::VecDeque;
  use std::sync::Mutex;
  use tempfile::TempDir;

  fn full_record(id: &str) -> ArticleRecord {
    ArticleRecord {
      id: Some(id.to_string()),
      title: Some("Apple beats estimates".to_string()),
      description: Some("Quarterly results".to_string()),
      source_url: Some(format!("https://example.com/{id}")),
      image_url: None,
      published_at: Some("2026-03-15T12:34:56Z".to_string()),
      source: Some(SourceRecord { id: "reuters".to_string(), name: "Reuters".to_string() }),
      symbols: vec!["AAPL".to_string()],
      industries: vec!["Consumer Electronics".to_string()],
      sectors: vec!["Technology".to_string()],
    }
  }

  fn page(ids: &[&str], next_cursor: Option<&str>) -> ArticlePage {
    ArticlePage {
      articles: ids.iter().map(|id| full_record(id)).collect(),
      next_cursor: next_cursor.map(String::from),
    }
  }

  /// Feed that replays a scripted sequence of page results.
  struct ScriptedFeed {
    pages: Mutex<VecDeque<nf_core::Result<ArticlePage>>>,
  }

  impl ScriptedFeed {
    fn new(pages: Vec<nf_core::Result<ArticlePage>>) -> Self {
      Self { pages: Mutex::new(pages.into_iter().collect()) }
    }
  }

  #[async_trait]
  impl ArticleFeed for ScriptedFeed {
    async fn fetch_page(&self, _cursor: Option<&str>, _limit: u32) -> nf_core::Result<ArticlePage> {
      self
        .pages
        .lock()
        .unwrap()
        .pop_front()
        .expect("feed queried past the scripted pages")
    }
  }

  fn test_config(dir: &TempDir, max_daily_requests: u32) -> PipelineConfig {
    PipelineConfig {
      database_url: "postgres://unused".to_string(),
      rate_limit_file: dir.path().join("rate_limit.json"),
      lock_file: dir.path().join("ingest.lock"),
      history_file: dir.path().join("run_history.json"),
      max_daily_requests,
      reset_hour: 0,
      page_limit: 50,
    }
  }

  /// In-memory store: remembers persisted ids, fails on demand.
  #[derive(Default)]
  struct MemoryStore {
    seen: Vec<String>,
    fail_ids: HashSet<String>,
  }

  #[async_trait]
  impl ArticleStore for MemoryStore {
    async fn persist(&mut self, article: &PreparedArticle) -> IngestResult<Persisted> {
      if self.fail_ids.contains(&article.id) {
        return Err(IngestError::DatabaseError("deadlock detected".to_string()));
      }
      if self.seen.iter().any(|id| id == &article.id) {
        return Ok(Persisted::Duplicate);
      }
      self.seen.push(article.id.clone());
      Ok(Persisted::Created)
    }

    fn entities_created(&self) -> EntityCounts {
      EntityCounts::default()
    }
  }

  #[test]
  fn test_prepared_article_maps_all_fields() {
    let article = PreparedArticle::from_record(full_record("a-1")).unwrap();
    assert_eq!(article.id, "a-1");
    assert_eq!(article.source_id, "reuters");
    assert_eq!(article.source_name, "Reuters");
    assert_eq!(article.published_at.to_rfc3339(), "2026-03-15T12:34:56+00:00");
    assert_eq!(article.symbols, vec!["AAPL"]);
  }

  #[test]
  fn test_prepared_article_requires_id() {
    let mut record = full_record("a-1");
    record.id = None;
    let err = PreparedArticle::from_record(record).unwrap_err();
    assert!(matches!(err, IngestError::InvalidData(_)));
    assert!(err.to_string().contains("`id`"));
  }

  #[test]
  fn test_prepared_article_rejects_blank_title() {
    let mut record = full_record("a-1");
    record.title = Some("   ".to_string());
    assert!(PreparedArticle::from_record(record).is_err());
  }

  #[test]
  fn test_prepared_article_rejects_bad_timestamp() {
    let mut record = full_record("a-1");
    record.published_at = Some("yesterday".to_string());
    let err = PreparedArticle::from_record(record).unwrap_err();
    assert!(err.to_string().contains("publishedAt"));
  }

  #[test]
  fn test_prepared_article_requires_source() {
    let mut record = full_record("a-1");
    record.source = None;
    let err = PreparedArticle::from_record(record).unwrap_err();
    assert!(err.to_string().contains("`source`"));
  }

  #[test]
  fn test_tag_normalization() {
    let mut record = full_record("a-1");
    record.symbols = vec![" aapl ".to_string(), "AAPL".to_string(), "".to_string()];
    record.industries =
      vec!["Banking".to_string(), "Banking".to_string(), "  ".to_string()];
    let article = PreparedArticle::from_record(record).unwrap();
    assert_eq!(article.symbols, vec!["AAPL"]);
    assert_eq!(article.industries, vec!["Banking"]);
  }

  #[tokio::test]
  async fn test_fetch_walks_all_pages() {
    let dir = TempDir::new().unwrap();
    let feed = ScriptedFeed::new(vec![
      Ok(page(&["a-1", "a-2"], Some("c-1"))),
      Ok(page(&["a-3"], None)),
    ]);
    let pipeline = IngestionPipeline::new(feed, test_config(&dir, 100));
    let rate_store = RateLimitStore::new(dir.path().join("rate_limit.json"), 100, 0).unwrap();

    let mut stats = IngestStats::default();
    let records = pipeline.fetch_articles(&rate_store, &mut stats).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(stats.api_calls, 2);
    assert_eq!(stats.pages_fetched, 2);
    assert!(!stats.budget_exhausted);
    assert_eq!(rate_store.usage(), 2);
  }

  #[tokio::test]
  async fn test_fetch_stops_when_budget_runs_out() {
    let dir = TempDir::new().unwrap();
    // Five pages scripted, but only three requests in the budget
    let feed = ScriptedFeed::new(vec![
      Ok(page(&["a-1"], Some("c-1"))),
      Ok(page(&["a-2"], Some("c-2"))),
      Ok(page(&["a-3"], Some("c-3"))),
      Ok(page(&["a-4"], Some("c-4"))),
      Ok(page(&["a-5"], None)),
    ]);
    let pipeline = IngestionPipeline::new(feed, test_config(&dir, 3));
    let rate_store = RateLimitStore::new(dir.path().join("rate_limit.json"), 3, 0).unwrap();

    let mut stats = IngestStats::default();
    let records = pipeline.fetch_articles(&rate_store, &mut stats).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(stats.api_calls, 3);
    assert!(stats.budget_exhausted);
    assert!(!rate_store.can_call());
  }

  #[tokio::test]
  async fn test_fetch_keeps_earlier_pages_on_page_error() {
    let dir = TempDir::new().unwrap();
    let feed = ScriptedFeed::new(vec![
      Ok(page(&["a-1", "a-2"], Some("c-1"))),
      Err(nf_core::Error::Api("boom".to_string())),
    ]);
    let pipeline = IngestionPipeline::new(feed, test_config(&dir, 100));
    let rate_store = RateLimitStore::new(dir.path().join("rate_limit.json"), 100, 0).unwrap();

    let mut stats = IngestStats::default();
    let records = pipeline.fetch_articles(&rate_store, &mut stats).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(stats.page_errors, 1);
    assert_eq!(stats.pages_fetched, 1);
    // The failed request still spent budget
    assert_eq!(stats.api_calls, 2);
  }

  #[tokio::test]
  async fn test_persist_continues_past_malformed_article() {
    // Ten articles, the fifth missing its title: nine persist, the
    // bad one is counted, nothing after it is lost.
    let mut records: Vec<ArticleRecord> =
      (1..=10).map(|n| full_record(&format!("a-{n}"))).collect();
    records[4].title = None;

    let mut store = MemoryStore::default();
    let mut stats = IngestStats::default();
    persist_all(&mut store, records, &mut stats).await;

    assert_eq!(stats.articles_created, 9);
    assert_eq!(stats.articles_failed, 1);
    assert_eq!(stats.article_errors.len(), 1);
    assert_eq!(stats.article_errors[0].article_id, "a-5");
    assert_eq!(store.seen.len(), 9);
    assert!(store.seen.contains(&"a-10".to_string()));
  }

  #[tokio::test]
  async fn test_persist_continues_past_store_failure() {
    let records: Vec<ArticleRecord> =
      (1..=10).map(|n| full_record(&format!("a-{n}"))).collect();

    let mut store = MemoryStore::default();
    store.fail_ids.insert("a-5".to_string());
    let mut stats = IngestStats::default();
    persist_all(&mut store, records, &mut stats).await;

    assert_eq!(stats.articles_created, 9);
    assert_eq!(stats.articles_failed, 1);
    assert!(stats.article_errors[0].message.contains("deadlock"));
    // Articles after the failure still went through
    assert!(store.seen.contains(&"a-6".to_string()));
    assert!(store.seen.contains(&"a-10".to_string()));
  }

  #[tokio::test]
  async fn test_persist_counts_repeat_article_as_duplicate() {
    let records = vec![full_record("a-1"), full_record("a-2"), full_record("a-1")];

    let mut store = MemoryStore::default();
    let mut stats = IngestStats::default();
    persist_all(&mut store, records, &mut stats).await;

    assert_eq!(stats.articles_created, 2);
    assert_eq!(stats.articles_duplicate, 1);
    assert_eq!(stats.articles_failed, 0);
    // No second row for the repeated id
    assert_eq!(store.seen, vec!["a-1".to_string(), "a-2".to_string()]);
  }

  #[tokio::test]
  async fn test_run_skips_when_budget_already_spent() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, 1);
    let rate_store =
      RateLimitStore::new(&config.rate_limit_file, 1, 0).unwrap();
    rate_store.record_call().unwrap();

    // Feed must never be queried on a skipped run
    let feed = ScriptedFeed::new(vec![]);
    let pipeline = IngestionPipeline::new(feed, config.clone());
    let outcome = pipeline.run().await.unwrap();

    assert_eq!(outcome.status, RunStatus::SkippedRateLimited);
    assert_eq!(outcome.stats.api_calls, 0);
    // Lock was released on the way out
    assert!(!config.lock_file.exists());
  }

  #[tokio::test]
  async fn test_run_skips_when_lock_is_held() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, 100);
    let lock = ProcessLock::new(&config.lock_file);
    let _guard = lock.acquire().unwrap();

    let feed = ScriptedFeed::new(vec![]);
    let pipeline = IngestionPipeline::new(feed, config);
    let outcome = pipeline.run().await.unwrap();

    assert_eq!(outcome.status, RunStatus::SkippedLocked);
    assert_eq!(outcome.stats.api_calls, 0);
  }
}
