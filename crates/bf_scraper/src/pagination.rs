use regex::Regex;
use scraper::{Html, Selector};
use tracing::warn;

use crate::fetch::Fetcher;
use crate::util::absolutize;

const PAGINATION_ANCHORS: &str =
    "a[href*=\"page\"], a[href*=\"p=\"], .pagination a, .page-numbers a, nav a";

/// Find the last listing page for a blog index. Fetch failures are non-fatal:
/// scraping simply proceeds on page 1.
pub async fn resolve_last_page(fetcher: &Fetcher, base_url: &str) -> String {
    match fetcher.get_listing(base_url).await {
        Ok(html) => {
            last_page_from_listing(&html, base_url).unwrap_or_else(|| base_url.to_string())
        }
        Err(e) => {
            warn!("failed to fetch {} for pagination: {}", base_url, e);
            base_url.to_string()
        }
    }
}

/// Single pass over pagination-looking anchors. An explicit "last" link wins
/// immediately; otherwise the highest numeric page parameter seen is used to
/// synthesize a last-page URL. `None` when no pagination was detected.
pub fn last_page_from_listing(listing_html: &str, base_url: &str) -> Option<String> {
    let doc = Html::parse_document(listing_html);
    let selector = Selector::parse(PAGINATION_ANCHORS).unwrap();
    let page_re = Regex::new(r"(?i)[?&]page[=_](\d+)|page[=_](\d+)|[?&]p[=_](\d+)").unwrap();

    let mut max_page = 1u32;
    for anchor in doc.select(&selector) {
        let href = match anchor.value().attr("href") {
            Some(h) => h,
            None => continue,
        };
        let text = anchor.text().collect::<String>().trim().to_lowercase();
        if text == "last" || text == "»" || text.contains("last") {
            return Some(absolutize(href, base_url));
        }
        if let Some(caps) = page_re.captures(href) {
            let num = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .and_then(|m| m.as_str().parse::<u32>().ok());
            if let Some(num) = num {
                if num > max_page {
                    max_page = num;
                }
            }
        }
    }

    if max_page > 1 {
        Some(page_url(base_url, max_page))
    } else {
        None
    }
}

fn page_url(base_url: &str, page: u32) -> String {
    if base_url.contains('?') {
        format!("{}&page={}", base_url, page)
    } else if base_url.ends_with('/') {
        format!("{}?page={}", base_url, page)
    } else {
        format!("{}/?page={}", base_url, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/blogs/";

    #[test]
    fn test_numeric_pages_pick_maximum() {
        let anchors: String = (1..=7)
            .map(|n| format!("<a href=\"/blogs/?page={}\">{}</a>", n, n))
            .collect();
        let html = format!("<html><body><nav>{}</nav></body></html>", anchors);
        let resolved = last_page_from_listing(&html, BASE).unwrap();
        assert!(resolved.contains("page=7"), "got {}", resolved);
    }

    #[test]
    fn test_explicit_last_link_wins() {
        let html = r#"<html><body><nav>
            <a href="/blogs/?page=3">3</a>
            <a href="/blogs/?page=7">7</a>
            <a href="/blogs/?p=9">Last</a>
        </nav></body></html>"#;
        let resolved = last_page_from_listing(html, BASE).unwrap();
        assert_eq!(resolved, "https://example.com/blogs/?p=9");
    }

    #[test]
    fn test_guillemet_counts_as_last() {
        let html = r#"<html><body><div class="pagination">
            <a href="/blogs/?page=4">»</a>
        </div></body></html>"#;
        let resolved = last_page_from_listing(html, BASE).unwrap();
        assert_eq!(resolved, "https://example.com/blogs/?page=4");
    }

    #[test]
    fn test_underscore_and_p_parameters() {
        let html = r#"<html><body><nav>
            <a href="/blogs/page_5">5</a>
        </nav></body></html>"#;
        let resolved = last_page_from_listing(html, BASE).unwrap();
        assert!(resolved.contains("page=5"), "got {}", resolved);
    }

    #[test]
    fn test_no_pagination_yields_none() {
        let html = r#"<html><body><a href="/about">About</a></body></html>"#;
        assert!(last_page_from_listing(html, BASE).is_none());
    }

    #[test]
    fn test_query_separator_respected() {
        assert_eq!(
            page_url("https://example.com/blogs/?lang=en", 3),
            "https://example.com/blogs/?lang=en&page=3"
        );
        assert_eq!(
            page_url("https://example.com/blogs/", 3),
            "https://example.com/blogs/?page=3"
        );
        assert_eq!(
            page_url("https://example.com/blogs", 3),
            "https://example.com/blogs/?page=3"
        );
    }
}
