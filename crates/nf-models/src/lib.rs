//! # nf-models
//!
//! Wire-format models for newsfilter API responses.

pub mod news;

pub use news::{ArticlePage, ArticleRecord, SourceRecord};
