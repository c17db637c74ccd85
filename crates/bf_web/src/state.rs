use std::sync::Arc;

use bf_core::{ArticleStore, EnhancedArticleStore};
use bf_enhance::EnhancementOrchestrator;
use bf_progress::ProgressTracker;
use bf_scraper::ScrapeOrchestrator;

/// Shared state behind every handler. The scrape and enhancement pipelines
/// are optional; endpoints that need one answer 503 when it is not
/// configured (no base URL, no API keys).
pub struct AppState {
    pub store: Arc<dyn ArticleStore>,
    pub enhanced: Arc<dyn EnhancedArticleStore>,
    pub tracker: ProgressTracker,
    pub scraper: Option<Arc<ScrapeOrchestrator>>,
    pub enhancer: Option<Arc<EnhancementOrchestrator>>,
}
