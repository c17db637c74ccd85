//! Reference-article extraction for the enhancement flow. Compared to the
//! main heuristic this variant runs against arbitrary sites found by search,
//! so it carries a broader selector cascade, a lower bar for acceptance, and
//! no validation against the stored-article limits.

use bf_core::{ReferenceArticle, Result};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::extract::{parse_date, BOILERPLATE};
use crate::fetch::Fetcher;
use crate::util::{meta_content, normalize_ws, select_attr, select_text, strip_nodes};

/// Container guesses for unfamiliar sites, roughly by publishing platform
/// popularity. Broader than the blog-scrape cascade on purpose.
const REFERENCE_CONTENT_SELECTORS: &[&str] = &[
    "article .entry-content",
    "article .post-content",
    ".entry-content",
    ".post-content",
    ".article-content",
    ".article-body",
    ".article__body",
    ".story-body",
    ".post-body",
    "[itemprop=\"articleBody\"]",
    "[class*=\"article-content\"]",
    "[class*=\"post-content\"]",
    "[class*=\"story-content\"]",
    "article main",
    "main article",
    "article",
    "main",
    "#content",
    ".content",
];

/// Minimum extracted length for a reference to be worth citing.
const MIN_REFERENCE_LEN: usize = 200;
/// References are context for rewriting, not stored records; cap them hard.
const MAX_REFERENCE_LEN: usize = 20_000;
const MAX_REFERENCE_HTML_LEN: usize = 100_000;

const FETCH_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

/// Parse a fetched reference page. `None` when no container yields enough
/// text to be useful as rewrite context.
pub fn extract_reference(page_html: &str, page_url: &str) -> Option<ReferenceArticle> {
    let mut doc = Html::parse_document(page_html);
    strip_nodes(&mut doc, BOILERPLATE);

    let title = select_text(&doc, "article h1, .entry-title, .post-title, h1")
        .or_else(|| meta_content(&doc, "meta[property=\"og:title\"]"))
        .or_else(|| select_text(&doc, "title"))
        .unwrap_or_default();

    let mut content = String::new();
    let mut content_html = String::new();
    for selector_str in REFERENCE_CONTENT_SELECTORS {
        let selector = Selector::parse(selector_str).unwrap();
        if let Some(container) = doc.select(&selector).next() {
            let candidate = paragraph_text(&container);
            if candidate.chars().count() >= MIN_REFERENCE_LEN {
                content = candidate;
                content_html = container.inner_html();
                break;
            }
            if candidate.chars().count() > content.chars().count() {
                content = candidate;
                content_html = container.inner_html();
            }
        }
    }

    if title.is_empty() || content.chars().count() < MIN_REFERENCE_LEN {
        debug!(
            "reference {} rejected: title={} content_len={}",
            page_url,
            !title.is_empty(),
            content.chars().count()
        );
        return None;
    }

    let author = select_text(
        &doc,
        "article .author, .byline, [class*=\"author-name\"], [rel=\"author\"]",
    )
    .or_else(|| meta_content(&doc, "meta[name=\"author\"]"))
    .unwrap_or_else(|| "Unknown".to_string());

    let published_date = select_attr(&doc, "time[datetime]", "datetime")
        .or_else(|| meta_content(&doc, "meta[property=\"article:published_time\"]"))
        .and_then(|raw| parse_date(&raw));

    Some(ReferenceArticle {
        title: normalize_ws(&title),
        content: bf_core::types::truncate_chars(&content, MAX_REFERENCE_LEN),
        content_html: bf_core::types::truncate_chars(&content_html, MAX_REFERENCE_HTML_LEN),
        author,
        published_date,
        source_url: page_url.to_string(),
    })
}

fn paragraph_text(container: &scraper::ElementRef) -> String {
    let p_selector = Selector::parse("p").unwrap();
    let paragraphs: Vec<String> = container
        .select(&p_selector)
        .map(|p| normalize_ws(&p.text().collect::<String>()))
        .filter(|p| p.chars().count() > 20)
        .collect();
    if paragraphs.is_empty() {
        normalize_ws(&container.text().collect::<String>())
    } else {
        paragraphs.join(" ")
    }
}

/// Fetches and extracts a set of reference URLs sequentially, pausing between
/// requests. Individual failures are logged and skipped.
#[derive(Clone)]
pub struct ReferenceScraper {
    fetcher: Fetcher,
}

impl ReferenceScraper {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new()?,
        })
    }

    pub async fn scrape_one(&self, url: &str) -> Option<ReferenceArticle> {
        match self.fetcher.get_article(url).await {
            Ok(html) => extract_reference(&html, url),
            Err(e) => {
                warn!("failed to fetch reference {}: {}", url, e);
                None
            }
        }
    }

    pub async fn scrape_many(&self, urls: &[String]) -> Vec<ReferenceArticle> {
        let mut references = Vec::new();
        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(FETCH_DELAY).await;
            }
            if let Some(reference) = self.scrape_one(url).await {
                references.push(reference);
            }
        }
        references
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://elsewhere.com/article/reference";

    fn filler(n: usize) -> String {
        "reference prose ".repeat(n).trim().to_string()
    }

    #[test]
    fn test_extracts_reference_with_metadata() {
        let html = format!(
            r#"<html><head><title>Useful Source</title></head><body>
                <article>
                    <h1>Useful Source</h1>
                    <div class="byline">Sam Writer</div>
                    <time datetime="2022-11-05T08:00:00Z">Nov 5</time>
                    <div class="article-body"><p>{p}</p><p>{p}</p></div>
                </article>
            </body></html>"#,
            p = filler(20)
        );
        let reference = extract_reference(&html, URL).unwrap();
        assert_eq!(reference.title, "Useful Source");
        assert_eq!(reference.author, "Sam Writer");
        assert!(reference.published_date.is_some());
        assert_eq!(reference.source_url, URL);
        assert!(reference.content.chars().count() >= 200);
    }

    #[test]
    fn test_thin_page_is_rejected() {
        let html = r#"<html><head><title>Thin</title></head><body>
            <article><p>Barely anything to work with here.</p></article>
        </body></html>"#;
        assert!(extract_reference(html, URL).is_none());
    }

    #[test]
    fn test_content_is_capped() {
        let html = format!(
            r#"<html><head><title>Huge</title></head><body>
                <div class="post-content"><p>{p}</p></div>
            </body></html>"#,
            p = filler(5000)
        );
        let reference = extract_reference(&html, URL).unwrap();
        assert!(reference.content.chars().count() <= 20_000);
    }

    #[test]
    fn test_missing_date_is_none_not_now() {
        let html = format!(
            r#"<html><head><title>Undated</title></head><body>
                <div class="entry-content"><p>{p}</p><p>{p}</p></div>
            </body></html>"#,
            p = filler(20)
        );
        let reference = extract_reference(&html, URL).unwrap();
        assert!(reference.published_date.is_none());
        assert_eq!(reference.author, "Unknown");
    }
}
