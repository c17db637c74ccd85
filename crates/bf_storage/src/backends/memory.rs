use std::sync::Arc;

use async_trait::async_trait;
use bf_core::{
    ArticleRecord, ArticleStore, EnhancedArticleRecord, EnhancedArticleStore, Error, Result,
};
use tokio::sync::RwLock;

/// Vec-backed store, the default backend. Fine for the data volumes a single
/// blog produces; everything clones on the way out.
#[derive(Default)]
pub struct MemoryStore {
    articles: Arc<RwLock<Vec<ArticleRecord>>>,
    enhanced: Arc<RwLock<Vec<EnhancedArticleRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert(&self, record: ArticleRecord) -> Result<()> {
        let mut articles = self.articles.write().await;
        if articles.iter().any(|a| a.id == record.id) {
            return Err(Error::Storage(format!("duplicate id {}", record.id)));
        }
        articles.push(record);
        Ok(())
    }

    async fn replace(&self, record: ArticleRecord) -> Result<()> {
        let mut articles = self.articles.write().await;
        match articles.iter_mut().find(|a| a.id == record.id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(Error::NotFound(format!("article {}", record.id))),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<ArticleRecord>> {
        let articles = self.articles.read().await;
        Ok(articles.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_source_url(&self, url: &str) -> Result<Option<ArticleRecord>> {
        let articles = self.articles.read().await;
        Ok(articles
            .iter()
            .find(|a| a.source_url == url && a.original_article_id.is_none())
            .cloned())
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<ArticleRecord>> {
        let articles = self.articles.read().await;
        let mut sorted: Vec<ArticleRecord> = articles.clone();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sorted.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.articles.read().await.len())
    }

    async fn updates_of(&self, root_id: &str) -> Result<Vec<ArticleRecord>> {
        let articles = self.articles.read().await;
        let mut updates: Vec<ArticleRecord> = articles
            .iter()
            .filter(|a| a.original_article_id.as_deref() == Some(root_id))
            .cloned()
            .collect();
        updates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(updates)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut articles = self.articles.write().await;
        let before = articles.len();
        articles.retain(|a| a.id != id);
        Ok(articles.len() < before)
    }
}

#[async_trait]
impl EnhancedArticleStore for MemoryStore {
    async fn insert_enhanced(&self, record: EnhancedArticleRecord) -> Result<()> {
        self.enhanced.write().await.push(record);
        Ok(())
    }

    async fn latest_for(&self, original_id: &str) -> Result<Option<EnhancedArticleRecord>> {
        let enhanced = self.enhanced.read().await;
        Ok(enhanced
            .iter()
            .filter(|e| e.original_article_id == original_id)
            .max_by_key(|e| e.enhanced_at)
            .cloned())
    }

    async fn all_for(&self, original_id: &str) -> Result<Vec<EnhancedArticleRecord>> {
        let enhanced = self.enhanced.read().await;
        let mut all: Vec<EnhancedArticleRecord> = enhanced
            .iter()
            .filter(|e| e.original_article_id == original_id)
            .cloned()
            .collect();
        all.sort_by(|a, b| b.enhanced_at.cmp(&a.enhanced_at));
        Ok(all)
    }
}
