use scraper::{Html, Selector};
use url::Url;

use crate::util::absolutize;

/// Ordered permalink patterns, most structural first. All of them are tried;
/// matches accumulate into one order-preserving, deduplicated set.
const LINK_SELECTORS: &[&str] = &[
    "article a[href*=\"/blog\"]",
    "article a[href*=\"/post\"]",
    ".blog-post a",
    ".post-item a",
    ".entry-title a",
    "h2 a[href*=\"/blog\"]",
    "h3 a[href*=\"/blog\"]",
    "[class*=\"blog\"] a[href*=\"/blog\"]",
    "[class*=\"post\"] a[href*=\"/post\"]",
];

/// Collect absolute article URLs from a fetched listing page.
pub fn collect_article_links(listing_html: &str, base_url: &str) -> Vec<String> {
    let doc = Html::parse_document(listing_html);
    let mut links: Vec<String> = Vec::new();

    for selector_str in LINK_SELECTORS {
        let selector = Selector::parse(selector_str).unwrap();
        for anchor in doc.select(&selector) {
            let href = match anchor.value().attr("href") {
                Some(h) => h,
                None => continue,
            };
            if !href.contains("/blog/") && !href.contains("/post/") {
                continue;
            }
            let url = absolutize(href, base_url);
            if !links.contains(&url) {
                links.push(url);
            }
        }
    }

    // Looser pass when the structural patterns all missed: any same-domain
    // link that at least mentions a blog/post path.
    if links.is_empty() {
        let loose = Selector::parse("a[href*=\"/blog\"], a[href*=\"/post\"]").unwrap();
        let base_host = Url::parse(base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        for anchor in doc.select(&loose) {
            let href = match anchor.value().attr("href") {
                Some(h) => h,
                None => continue,
            };
            if href.contains('#') || href.starts_with("mailto:") {
                continue;
            }
            let url = absolutize(href, base_url);
            let link_host = Url::parse(&url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string));
            match (&base_host, &link_host) {
                (Some(b), Some(h)) if b == h => {
                    if !links.contains(&url) {
                        links.push(url);
                    }
                }
                _ => {}
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/blogs/";

    #[test]
    fn test_collects_and_absolutizes() {
        let html = r#"<html><body>
            <article><a href="/blog/first-post">First</a></article>
            <article><a href="https://example.com/blog/second-post">Second</a></article>
        </body></html>"#;
        let links = collect_article_links(html, BASE);
        assert_eq!(
            links,
            vec![
                "https://example.com/blog/first-post".to_string(),
                "https://example.com/blog/second-post".to_string(),
            ]
        );
    }

    #[test]
    fn test_duplicate_across_selectors_appears_once() {
        // Same URL reachable through both the <article> and <h2> patterns
        let html = r#"<html><body>
            <article><h2><a href="/blog/one-post">One</a></h2></article>
        </body></html>"#;
        let links = collect_article_links(html, BASE);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0], "https://example.com/blog/one-post");
    }

    #[test]
    fn test_loose_fallback_same_domain_only() {
        let html = r#"<html><body>
            <a href="/blog-index">Index</a>
            <a href="https://elsewhere.com/blog/stolen">Other</a>
            <a href="mailto:someone@example.com">Mail</a>
            <a href="/blog-index#section">Frag</a>
        </body></html>"#;
        let links = collect_article_links(html, BASE);
        assert_eq!(links, vec!["https://example.com/blog-index".to_string()]);
    }

    #[test]
    fn test_non_article_hrefs_skipped_by_primary_pass() {
        let html = r#"<html><body>
            <article><a href="/about">About</a></article>
            <article><a href="/post/real-article">Real</a></article>
        </body></html>"#;
        let links = collect_article_links(html, BASE);
        assert_eq!(links, vec!["https://example.com/post/real-article".to_string()]);
    }
}
