//! Row models for the natural-key entities an article references.
//!
//! Sources carry mutable attributes (name) and an `updated_at` that is
//! bumped only when those attributes change; symbols, industries and
//! sectors are existence-only records keyed by their natural name.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{industries, sectors, sources, symbols};

// ===== Source =====
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = sources)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = sources)]
pub struct NewSource<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ===== Symbol =====
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = symbols)]
#[diesel(primary_key(symbol))]
pub struct Symbol {
    pub symbol: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = symbols)]
pub struct NewSymbol<'a> {
    pub symbol: &'a str,
    pub created_at: DateTime<Utc>,
}

// ===== Industry =====
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = industries)]
#[diesel(primary_key(name))]
pub struct Industry {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = industries)]
pub struct NewIndustry<'a> {
    pub name: &'a str,
    pub created_at: DateTime<Utc>,
}

// ===== Sector =====
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = sectors)]
#[diesel(primary_key(name))]
pub struct Sector {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = sectors)]
pub struct NewSector<'a> {
    pub name: &'a str,
    pub created_at: DateTime<Utc>,
}
