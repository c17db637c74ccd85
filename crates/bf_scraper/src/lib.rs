pub mod batch;
pub mod extract;
pub mod fetch;
pub mod links;
pub mod pagination;
pub mod reference;
mod util;

pub use batch::{ScrapeOrchestrator, MAX_BATCH};
pub use extract::extract_article;
pub use fetch::Fetcher;
pub use links::collect_article_links;
pub use pagination::resolve_last_page;
pub use reference::{extract_reference, ReferenceScraper};
