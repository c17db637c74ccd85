//! The scrape batch: base URL to a bounded set of stored articles, with
//! per-article progress reporting.

use std::sync::Arc;
use std::time::Duration;

use bf_core::{ArticleRecord, ArticleStore, Error, Result, UpsertStatus};
use bf_progress::{ArticleOutcome, OutcomeStatus, ProgressSink};
use tracing::{info, warn};

use crate::extract::extract_article;
use crate::fetch::Fetcher;
use crate::links::collect_article_links;
use crate::pagination::resolve_last_page;

/// Upper bound on articles per batch.
pub const MAX_BATCH: usize = 10;

/// Pause between article fetches, out of politeness to the source host.
const SCRAPE_DELAY: Duration = Duration::from_millis(500);

/// Drives one scrape batch: resolve the last listing page, collect article
/// links, extract each sequentially, keep the oldest N, and upsert them by
/// source URL.
pub struct ScrapeOrchestrator {
    fetcher: Fetcher,
    store: Arc<dyn ArticleStore>,
    base_url: String,
}

impl ScrapeOrchestrator {
    pub fn new(store: Arc<dyn ArticleStore>, base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new()?,
            store,
            base_url: base_url.into(),
        })
    }

    /// Scrape up to `count` articles (clamped to `[1, MAX_BATCH]`). Individual
    /// extraction and persistence failures are recorded and skipped; finding
    /// no links at all is a hard failure.
    pub async fn scrape_batch(
        &self,
        count: usize,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<ArticleRecord>> {
        let count = count.clamp(1, MAX_BATCH);

        let listing_url = resolve_last_page(&self.fetcher, &self.base_url).await;
        info!("scraping listing page {}", listing_url);
        sink.message(&format!("Fetching article list from {}", listing_url))
            .await;

        let listing_html = self.fetcher.get_listing(&listing_url).await?;
        let links = collect_article_links(&listing_html, &listing_url);
        if links.is_empty() {
            return Err(Error::Scraping(format!(
                "no article links found on {}",
                listing_url
            )));
        }
        info!("found {} candidate links", links.len());
        sink.begin(count.min(links.len())).await;

        let mut candidates = Vec::new();
        for (i, link) in links.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(SCRAPE_DELAY).await;
            }
            sink.message(&format!("Scraping {}", link)).await;
            match self.fetcher.get_article(link).await {
                Ok(html) => {
                    if let Some(article) = extract_article(&html, link) {
                        candidates.push(article);
                    } else {
                        warn!("no usable content at {}", link);
                    }
                }
                Err(e) => {
                    warn!("failed to fetch {}: {}", link, e);
                }
            }
        }

        let stored = persist_oldest(self.store.as_ref(), candidates, count, sink).await;
        info!("batch complete: {} articles stored", stored.len());
        Ok(stored)
    }
}

/// Keep the `count` oldest candidates and upsert each by source URL,
/// reporting a per-article outcome. Persistence failures are recorded and
/// skipped, never fatal.
async fn persist_oldest(
    store: &dyn ArticleStore,
    mut candidates: Vec<bf_core::ScrapedArticle>,
    count: usize,
    sink: &dyn ProgressSink,
) -> Vec<ArticleRecord> {
    candidates.sort_by_key(|a| a.published_date);
    candidates.truncate(count);

    let mut stored = Vec::new();
    for article in candidates {
        let title = article.title.clone();
        let source_url = article.source_url.clone();
        match store.upsert_scraped(article).await {
            Ok((record, status)) => {
                let status = match status {
                    UpsertStatus::Saved => OutcomeStatus::Saved,
                    UpsertStatus::Updated => OutcomeStatus::Updated,
                };
                sink.article(ArticleOutcome {
                    title,
                    source_url,
                    status,
                    message: None,
                })
                .await;
                sink.item_done().await;
                stored.push(record);
            }
            Err(e) => {
                warn!("failed to store {}: {}", source_url, e);
                sink.article(ArticleOutcome {
                    title,
                    source_url,
                    status: OutcomeStatus::Error,
                    message: Some(e.to_string()),
                })
                .await;
                sink.item_done().await;
            }
        }
    }
    stored
}
