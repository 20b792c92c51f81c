//! Generic get-or-create resolution for natural-key entities.
//!
//! One `Resolver` is instantiated per entity kind (source, symbol,
//! industry, sector) and memoizes the keys it has already ensured, so
//! a ticker mentioned by five articles in one run touches the
//! database once. The resolver only stages work inside whatever
//! transaction the caller has open; it never commits on its own.

use std::collections::HashSet;
use std::hash::Hash;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::models::entity::{
    Industry, NewIndustry, NewSector, NewSource, NewSymbol, Sector, Source, Symbol,
};
use crate::schema::{industries, sectors, sources, symbols};

/// An entity identified by a natural key that can be lazily created.
///
/// `insert` must be conflict-tolerant (`ON CONFLICT DO NOTHING`):
/// losing a create race reads as zero rows written, never as an error
/// that would poison the surrounding transaction.
#[async_trait]
pub trait ResolvableEntity {
    /// Natural key type
    type Key: Clone + Eq + Hash + Send + Sync + std::fmt::Debug;

    /// Attributes carried alongside the key
    type Attrs: Send + Sync + ?Sized;

    /// Entity kind name, for logging
    const KIND: &'static str;

    async fn exists(conn: &mut AsyncPgConnection, key: &Self::Key) -> QueryResult<bool>;

    /// Insert a new row for `key`; returns rows written (0 on conflict).
    async fn insert(
        conn: &mut AsyncPgConnection,
        key: &Self::Key,
        attrs: &Self::Attrs,
    ) -> QueryResult<usize>;

    /// Refresh mutable attributes of an existing row. Most entities
    /// have none.
    async fn refresh(
        _conn: &mut AsyncPgConnection,
        _key: &Self::Key,
        _attrs: &Self::Attrs,
    ) -> QueryResult<()> {
        Ok(())
    }
}

/// Whether `resolve` found an existing row or staged a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Existing,
    Created,
}

/// Per-run get-or-create resolver for one entity kind.
///
/// Keys resolved inside the currently open unit of work are held as
/// pending until the caller commits: `commit` merges them into the
/// run-wide cache, `rollback` forgets them so a row whose insert was
/// rolled back is re-attempted by the next article that needs it.
pub struct Resolver<E: ResolvableEntity> {
    committed: HashSet<E::Key>,
    pending: HashSet<E::Key>,
    created_total: usize,
    created_pending: usize,
}

impl<E: ResolvableEntity + Send> Resolver<E> {
    pub fn new() -> Self {
        Self {
            committed: HashSet::new(),
            pending: HashSet::new(),
            created_total: 0,
            created_pending: 0,
        }
    }

    /// Ensure the row for `key` exists, creating it when missing.
    ///
    /// Resolving the same key twice within one run returns the same
    /// logical entity and performs no second insert.
    pub async fn resolve(
        &mut self,
        conn: &mut AsyncPgConnection,
        key: &E::Key,
        attrs: &E::Attrs,
    ) -> QueryResult<Resolution> {
        if self.committed.contains(key) || self.pending.contains(key) {
            return Ok(Resolution::Existing);
        }

        let resolution = if E::exists(conn, key).await? {
            E::refresh(conn, key, attrs).await?;
            Resolution::Existing
        } else if E::insert(conn, key, attrs).await? > 0 {
            debug!(kind = E::KIND, ?key, "created entity");
            self.created_pending += 1;
            Resolution::Created
        } else {
            // Lost a create race; the row is there now.
            debug!(kind = E::KIND, ?key, "create conflict resolved to existing row");
            Resolution::Existing
        };

        self.pending.insert(key.clone());
        Ok(resolution)
    }

    /// Keep resolutions staged by the just-committed unit of work.
    pub fn commit(&mut self) {
        self.committed.extend(self.pending.drain());
        self.created_total += self.created_pending;
        self.created_pending = 0;
    }

    /// Forget resolutions staged by a rolled-back unit of work.
    pub fn rollback(&mut self) {
        self.pending.clear();
        self.created_pending = 0;
    }

    /// Rows created by committed units of work during this run.
    pub fn created(&self) -> usize {
        self.created_total
    }
}

impl<E: ResolvableEntity + Send> Default for Resolver<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResolvableEntity for Source {
    type Key = String;
    type Attrs = str;

    const KIND: &'static str = "source";

    async fn exists(conn: &mut AsyncPgConnection, key: &Self::Key) -> QueryResult<bool> {
        let found = sources::table
            .find(key)
            .select(sources::id)
            .first::<String>(conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }

    async fn insert(
        conn: &mut AsyncPgConnection,
        key: &Self::Key,
        attrs: &Self::Attrs,
    ) -> QueryResult<usize> {
        let now = Utc::now();
        diesel::insert_into(sources::table)
            .values(NewSource { id: key.as_str(), name: attrs, created_at: now, updated_at: now })
            .on_conflict_do_nothing()
            .execute(conn)
            .await
    }

    async fn refresh(
        conn: &mut AsyncPgConnection,
        key: &Self::Key,
        attrs: &Self::Attrs,
    ) -> QueryResult<()> {
        // updated_at moves only when the name actually changed
        let bumped = diesel::update(sources::table.find(key).filter(sources::name.ne(attrs)))
            .set((sources::name.eq(attrs), sources::updated_at.eq(Utc::now())))
            .execute(conn)
            .await?;
        if bumped > 0 {
            debug!(source = %key, "source attributes refreshed");
        }
        Ok(())
    }
}

#[async_trait]
impl ResolvableEntity for Symbol {
    type Key = String;
    type Attrs = ();

    const KIND: &'static str = "symbol";

    async fn exists(conn: &mut AsyncPgConnection, key: &Self::Key) -> QueryResult<bool> {
        let found = symbols::table
            .find(key)
            .select(symbols::symbol)
            .first::<String>(conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }

    async fn insert(
        conn: &mut AsyncPgConnection,
        key: &Self::Key,
        _attrs: &Self::Attrs,
    ) -> QueryResult<usize> {
        diesel::insert_into(symbols::table)
            .values(NewSymbol { symbol: key.as_str(), created_at: Utc::now() })
            .on_conflict_do_nothing()
            .execute(conn)
            .await
    }
}

#[async_trait]
impl ResolvableEntity for Industry {
    type Key = String;
    type Attrs = ();

    const KIND: &'static str = "industry";

    async fn exists(conn: &mut AsyncPgConnection, key: &Self::Key) -> QueryResult<bool> {
        let found = industries::table
            .find(key)
            .select(industries::name)
            .first::<String>(conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }

    async fn insert(
        conn: &mut AsyncPgConnection,
        key: &Self::Key,
        _attrs: &Self::Attrs,
    ) -> QueryResult<usize> {
        diesel::insert_into(industries::table)
            .values(NewIndustry { name: key.as_str(), created_at: Utc::now() })
            .on_conflict_do_nothing()
            .execute(conn)
            .await
    }
}

#[async_trait]
impl ResolvableEntity for Sector {
    type Key = String;
    type Attrs = ();

    const KIND: &'static str = "sector";

    async fn exists(conn: &mut AsyncPgConnection, key: &Self::Key) -> QueryResult<bool> {
        let found = sectors::table
            .find(key)
            .select(sectors::name)
            .first::<String>(conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }

    async fn insert(
        conn: &mut AsyncPgConnection,
        key: &Self::Key,
        _attrs: &Self::Attrs,
    ) -> QueryResult<usize> {
        diesel::insert_into(sectors::table)
            .values(NewSector { name: key.as_str(), created_at: Utc::now() })
            .on_conflict_do_nothing()
            .execute(conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_merges_pending_into_run_cache() {
        let mut resolver: Resolver<Symbol> = Resolver::new();
        resolver.pending.insert("AAPL".to_string());
        resolver.created_pending = 1;

        resolver.commit();

        assert!(resolver.committed.contains("AAPL"));
        assert!(resolver.pending.is_empty());
        assert_eq!(resolver.created(), 1);
    }

    #[test]
    fn test_rollback_forgets_pending() {
        let mut resolver: Resolver<Symbol> = Resolver::new();
        resolver.committed.insert("MSFT".to_string());
        resolver.created_total = 1;
        resolver.pending.insert("AAPL".to_string());
        resolver.created_pending = 1;

        resolver.rollback();

        assert!(resolver.pending.is_empty());
        assert!(!resolver.committed.contains("AAPL"));
        // committed state survives a rollback of later work
        assert!(resolver.committed.contains("MSFT"));
        assert_eq!(resolver.created(), 1);
    }

    #[test]
    fn test_created_counts_only_committed_work() {
        let mut resolver: Resolver<Sector> = Resolver::new();
        resolver.created_pending = 2;
        assert_eq!(resolver.created(), 0);

        resolver.commit();
        assert_eq!(resolver.created(), 2);
    }
}
