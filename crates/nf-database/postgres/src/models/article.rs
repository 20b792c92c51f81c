//! Article rows and their association edges.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::schema::{article_industries, article_sectors, article_symbols, articles};

// ===== Article =====
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = articles)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub source_url: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = articles)]
pub struct NewArticle<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub source_url: &'a str,
    pub image_url: Option<&'a str>,
    pub published_at: DateTime<Utc>,
    pub source_id: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub async fn exists(
        conn: &mut AsyncPgConnection,
        id: &str,
    ) -> Result<bool, diesel::result::Error> {
        let found = articles::table
            .find(id)
            .select(articles::id)
            .first::<String>(conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }
}

impl<'a> NewArticle<'a> {
    /// Insert the article unless its id already exists.
    ///
    /// Returns `true` when a row was written. A concurrent insert of
    /// the same id is absorbed by `ON CONFLICT DO NOTHING` and reads
    /// as `false`, the same as a plain duplicate.
    pub async fn insert_if_new(
        &self,
        conn: &mut AsyncPgConnection,
    ) -> Result<bool, diesel::result::Error> {
        let written = diesel::insert_into(articles::table)
            .values(self)
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;
        Ok(written > 0)
    }
}

// ===== Association edges =====
// Composite primary keys on (article_id, other_key) make edge inserts
// idempotent under ON CONFLICT DO NOTHING.

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = article_symbols)]
pub struct NewArticleSymbol<'a> {
    pub article_id: &'a str,
    pub symbol_id: &'a str,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = article_industries)]
pub struct NewArticleIndustry<'a> {
    pub article_id: &'a str,
    pub industry_id: &'a str,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = article_sectors)]
pub struct NewArticleSector<'a> {
    pub article_id: &'a str,
    pub sector_id: &'a str,
}

impl<'a> NewArticleSymbol<'a> {
    pub async fn bulk_insert(
        conn: &mut AsyncPgConnection,
        records: &[NewArticleSymbol<'a>],
    ) -> Result<usize, diesel::result::Error> {
        if records.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(article_symbols::table)
            .values(records)
            .on_conflict_do_nothing()
            .execute(conn)
            .await
    }
}

impl<'a> NewArticleIndustry<'a> {
    pub async fn bulk_insert(
        conn: &mut AsyncPgConnection,
        records: &[NewArticleIndustry<'a>],
    ) -> Result<usize, diesel::result::Error> {
        if records.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(article_industries::table)
            .values(records)
            .on_conflict_do_nothing()
            .execute(conn)
            .await
    }
}

impl<'a> NewArticleSector<'a> {
    pub async fn bulk_insert(
        conn: &mut AsyncPgConnection,
        records: &[NewArticleSector<'a>],
    ) -> Result<usize, diesel::result::Error> {
        if records.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(article_sectors::table)
            .values(records)
            .on_conflict_do_nothing()
            .execute(conn)
            .await
    }
}
