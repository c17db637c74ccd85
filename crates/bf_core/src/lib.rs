pub mod error;
pub mod storage;
pub mod types;

pub use error::Error;
pub use storage::{ArticleStore, EnhancedArticleStore, UpsertStatus, VersionSet};
pub use types::{
    ArticleDraft, ArticleRecord, EnhancedArticleRecord, ReferenceArticle, ReferenceEntry,
    ScrapedArticle,
};

pub type Result<T> = std::result::Result<T, Error>;
