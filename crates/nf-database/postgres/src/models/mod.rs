pub mod article;
pub mod entity;

pub use article::{
    Article, NewArticle, NewArticleIndustry, NewArticleSector, NewArticleSymbol,
};
pub use entity::{Industry, NewIndustry, NewSector, NewSource, NewSymbol, Sector, Source, Symbol};
