//! The enhancement pipeline: six strictly sequential steps, each observable
//! through a `ProgressSink`. A fatal failure marks the in-flight step as
//! errored and leaves the later ones pending.

use std::sync::Arc;

use async_trait::async_trait;
use bf_core::{
    ArticleStore, EnhancedArticleRecord, EnhancedArticleStore, Error, ReferenceArticle, Result,
};
use bf_progress::{ProgressSink, StepStatus};
use bf_scraper::ReferenceScraper;
use chrono::Utc;
use tracing::{info, warn};

use crate::citations::{format_citations_html, format_citations_text};
use crate::llm::{build_prompt, parse_rewrite, CompletionModel};
use crate::search::SearchProvider;

/// Step names, in execution order. Progress records for enhancement jobs are
/// seeded from this list.
pub const ENHANCE_STEPS: &[&str] = &[
    "fetch-article",
    "search",
    "scrape-references",
    "rewrite",
    "format-citations",
    "persist",
];

/// References scraped on the first attempt.
const PRIMARY_REFERENCE_COUNT: usize = 2;
/// Widened attempt when none of the primary references yield content.
const WIDENED_REFERENCE_COUNT: usize = 5;

/// Turns a list of candidate URLs into scraped reference articles, skipping
/// failures.
#[async_trait]
pub trait ReferenceLoader: Send + Sync {
    async fn load(&self, urls: &[String]) -> Vec<ReferenceArticle>;
}

#[async_trait]
impl ReferenceLoader for ReferenceScraper {
    async fn load(&self, urls: &[String]) -> Vec<ReferenceArticle> {
        self.scrape_many(urls).await
    }
}

pub struct EnhancementOrchestrator {
    store: Arc<dyn ArticleStore>,
    enhanced: Arc<dyn EnhancedArticleStore>,
    search: Arc<dyn SearchProvider>,
    model: Arc<dyn CompletionModel>,
    loader: Arc<dyn ReferenceLoader>,
}

impl EnhancementOrchestrator {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        enhanced: Arc<dyn EnhancedArticleStore>,
        search: Arc<dyn SearchProvider>,
        model: Arc<dyn CompletionModel>,
        loader: Arc<dyn ReferenceLoader>,
    ) -> Self {
        Self {
            store,
            enhanced,
            search,
            model,
            loader,
        }
    }

    /// Run the full pipeline for one stored article.
    pub async fn enhance(
        &self,
        article_id: &str,
        sink: &dyn ProgressSink,
    ) -> Result<EnhancedArticleRecord> {
        match self.run(article_id, sink).await {
            Ok(record) => {
                sink.finish().await;
                Ok(record)
            }
            Err((step, e)) => {
                warn!("enhancement of {} failed at {}: {}", article_id, ENHANCE_STEPS[step], e);
                sink.step(step, StepStatus::Error).await;
                sink.fail(&e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        article_id: &str,
        sink: &dyn ProgressSink,
    ) -> std::result::Result<EnhancedArticleRecord, (usize, Error)> {
        sink.step(0, StepStatus::InProgress).await;
        sink.message("Fetching original article").await;
        let article = self
            .store
            .get(article_id)
            .await
            .map_err(|e| (0, e))?
            .ok_or_else(|| (0, Error::NotFound(format!("article {}", article_id))))?;
        sink.step(0, StepStatus::Completed).await;

        sink.step(1, StepStatus::InProgress).await;
        sink.message("Searching for related articles").await;
        let results = self
            .search
            .search(&article.title)
            .await
            .map_err(|e| (1, e))?;
        if results.is_empty() {
            return Err((1, Error::Search("no related articles found".to_string())));
        }
        info!("found {} related results", results.len());
        sink.step(1, StepStatus::Completed).await;

        sink.step(2, StepStatus::InProgress).await;
        sink.message("Scraping reference articles").await;
        let urls: Vec<String> = results.iter().map(|r| r.url.clone()).collect();
        let primary = &urls[..urls.len().min(PRIMARY_REFERENCE_COUNT)];
        let mut references = self.loader.load(primary).await;
        if references.is_empty() && urls.len() > primary.len() {
            let widened = &urls[..urls.len().min(WIDENED_REFERENCE_COUNT)];
            info!("no references scraped, widening to {} results", widened.len());
            references = self.loader.load(widened).await;
        }
        if references.is_empty() {
            return Err((
                2,
                Error::Scraping("failed to scrape any reference articles".to_string()),
            ));
        }
        sink.step(2, StepStatus::Completed).await;

        sink.step(3, StepStatus::InProgress).await;
        sink.message("Rewriting article").await;
        let prompt = build_prompt(&article, &references);
        let completion = self.model.complete(&prompt).await.map_err(|e| (3, e))?;
        let rewritten = parse_rewrite(&completion, &article.title);
        sink.step(3, StepStatus::Completed).await;

        sink.step(4, StepStatus::InProgress).await;
        sink.message("Formatting citations").await;
        let entries: Vec<_> = references.iter().map(|r| r.entry()).collect();
        let citations = format_citations_text(&entries);
        let citations_html = format_citations_html(&entries);
        sink.step(4, StepStatus::Completed).await;

        sink.step(5, StepStatus::InProgress).await;
        sink.message("Saving enhanced article").await;
        let record = EnhancedArticleRecord {
            id: uuid::Uuid::new_v4().to_string(),
            original_article_id: article.id.clone(),
            title: rewritten.title,
            content: format!("{}{}", rewritten.content, citations),
            content_html: format!("{}{}", rewritten.content_html, citations_html),
            reference_articles: entries,
            citations,
            citations_html,
            enhanced_at: Utc::now(),
            model_used: self.model.name().to_string(),
            search_query: article.title.clone(),
        };
        self.enhanced
            .insert_enhanced(record.clone())
            .await
            .map_err(|e| (5, e))?;
        sink.step(5, StepStatus::Completed).await;

        Ok(record)
    }
}
