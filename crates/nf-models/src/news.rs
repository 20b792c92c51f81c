//! News article feed data models

use serde::{Deserialize, Serialize};

/// One page of the paginated article feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePage {
    /// Articles on this page, in feed order
    #[serde(default)]
    pub articles: Vec<ArticleRecord>,

    /// Cursor for the next page; absent on the last page
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A single article record as returned by the API.
///
/// Every field except the tag lists is optional at the wire level so
/// that one malformed record can be rejected on its own instead of
/// failing deserialization of the whole page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    /// External article id, the article's primary key downstream
    #[serde(default)]
    pub id: Option<String>,

    /// Article title
    #[serde(default)]
    pub title: Option<String>,

    /// Article description or summary
    #[serde(default)]
    pub description: Option<String>,

    /// URL of the original article
    #[serde(default)]
    pub source_url: Option<String>,

    /// Banner/preview image URL
    #[serde(default)]
    pub image_url: Option<String>,

    /// Publication time, RFC 3339
    #[serde(default)]
    pub published_at: Option<String>,

    /// Publishing source
    #[serde(default)]
    pub source: Option<SourceRecord>,

    /// Ticker symbols mentioned in the article
    #[serde(default)]
    pub symbols: Vec<String>,

    /// Industries the article is tagged with
    #[serde(default)]
    pub industries: Vec<String>,

    /// Sectors the article is tagged with
    #[serde(default)]
    pub sectors: Vec<String>,
}

/// Publishing source attached to an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Provider id of the source
    pub id: String,

    /// Display name of the source
    pub name: String,
}
