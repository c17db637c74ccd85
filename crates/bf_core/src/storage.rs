use async_trait::async_trait;
use serde::Serialize;

use crate::types::{ArticleDraft, ArticleRecord, EnhancedArticleRecord, ScrapedArticle};
use crate::{Error, Result};

/// Outcome of a scrape-time upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStatus {
    Saved,
    Updated,
}

/// An article together with its full version lineage.
#[derive(Debug, Clone, Serialize)]
pub struct VersionSet {
    pub original: ArticleRecord,
    pub updates: Vec<ArticleRecord>,
    pub current: ArticleRecord,
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert(&self, record: ArticleRecord) -> Result<()>;

    /// Overwrite the record with the same id. Errors if it does not exist.
    async fn replace(&self, record: ArticleRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<ArticleRecord>>;

    /// Look up the lineage root that owns this source URL. Versioned updates
    /// share the root's URL and are never returned here.
    async fn find_by_source_url(&self, url: &str) -> Result<Option<ArticleRecord>>;

    /// Page through records, newest created first.
    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<ArticleRecord>>;

    async fn count(&self) -> Result<usize>;

    /// All updates whose lineage root is `root_id`, newest first.
    async fn updates_of(&self, root_id: &str) -> Result<Vec<ArticleRecord>>;

    async fn delete(&self, id: &str) -> Result<bool>;

    /// Scrape-path upsert keyed by source URL: create the record if absent,
    /// otherwise overwrite its fields in place. The version number never
    /// changes here; only `create_version` increments it.
    async fn upsert_scraped(&self, scraped: ScrapedArticle) -> Result<(ArticleRecord, UpsertStatus)> {
        if let Some(mut existing) = self.find_by_source_url(&scraped.source_url).await? {
            existing.title = scraped.title;
            existing.content = scraped.content;
            existing.content_html = scraped.content_html;
            existing.author = scraped.author;
            existing.published_date = scraped.published_date;
            existing.image_url = scraped.image_url;
            existing.excerpt = scraped.excerpt;
            existing.tags = Vec::new();
            existing.is_scraped = true;
            self.replace(existing.clone()).await?;
            Ok((existing, UpsertStatus::Updated))
        } else {
            let record = scraped.into_record();
            self.insert(record.clone()).await?;
            Ok((record, UpsertStatus::Saved))
        }
    }

    /// Store `draft` as a new version of the article `id` belongs to. The new
    /// record always links the lineage root, so chains never grow deeper than
    /// one hop, and its version is one past the highest in the lineage.
    async fn create_version(&self, id: &str, draft: ArticleDraft) -> Result<ArticleRecord> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("article {}", id)))?;

        let root_id = current
            .original_article_id
            .clone()
            .unwrap_or_else(|| current.id.clone());
        let root = self
            .get(&root_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("article {}", root_id)))?;

        let latest_version = self
            .updates_of(&root_id)
            .await?
            .iter()
            .map(|r| r.version)
            .max()
            .unwrap_or(root.version)
            .max(root.version);

        let mut record = draft.into_record();
        record.original_article_id = Some(root_id);
        record.version = latest_version + 1;
        self.insert(record.clone()).await?;
        Ok(record)
    }

    /// Resolve the full lineage of `id`: its root, every update of that root,
    /// and the record itself.
    async fn versions(&self, id: &str) -> Result<VersionSet> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("article {}", id)))?;

        let original = match &current.original_article_id {
            Some(root_id) => self
                .get(root_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("article {}", root_id)))?,
            None => current.clone(),
        };

        let updates = self.updates_of(&original.id).await?;
        Ok(VersionSet {
            original,
            updates,
            current,
        })
    }
}

#[async_trait]
pub trait EnhancedArticleStore: Send + Sync {
    async fn insert_enhanced(&self, record: EnhancedArticleRecord) -> Result<()>;

    /// Most recent enhancement of the given original, by `enhanced_at`.
    async fn latest_for(&self, original_id: &str) -> Result<Option<EnhancedArticleRecord>>;

    /// Every enhancement of the given original, newest first.
    async fn all_for(&self, original_id: &str) -> Result<Vec<EnhancedArticleRecord>>;
}
