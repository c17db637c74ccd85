//! The content-extraction heuristic: turn one fetched article page into a
//! `ScrapedArticle`, or `None` when the page holds no usable article content.
//!
//! This is best-effort against arbitrary blog markup. Every resolution step
//! is a cascade of selector guesses with fallbacks; the validation gate at
//! the end bounds the failure mode to "reject" rather than "store garbage".

use bf_core::types::{
    truncate_chars, ScrapedArticle, MAX_AUTHOR_LEN, MAX_CONTENT_HTML_LEN, MAX_CONTENT_LEN,
    MAX_EXCERPT_LEN, MAX_TITLE_LEN, MIN_CONTENT_LEN,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::util::{absolutize, meta_content, normalize_ws, select_attr, select_text, strip_nodes};

/// Boilerplate removed from the whole document before any extraction.
pub(crate) const BOILERPLATE: &str = "footer, .footer, #footer, nav, .nav, .navigation, \
     .sidebar, .side-bar, .widget, .social-share, .share-buttons, .related-posts, \
     .comments, .comment-section, script, style, iframe, .advertisement, .ads, \
     [class*=\"ad-\"], [id*=\"ad-\"]";

/// Boilerplate stripped again inside a candidate container.
const CONTAINER_STRIP: &str = "footer, .footer, nav, .nav, .sidebar, .widget, \
     .social-share, .share-buttons, .related-posts, .comments, .comment-section, \
     script, style, iframe, .advertisement, .ads, [class*=\"ad-\"], [id*=\"ad-\"]";

/// Non-semantic wrappers whose class hints at chrome rather than content.
const HINTED_WRAPPERS: &str = "div[class*=\"ad\"], span[class*=\"ad\"], \
     div[class*=\"widget\"], span[class*=\"widget\"], \
     div[class*=\"sidebar\"], span[class*=\"sidebar\"]";

/// Body container guesses, most specific first.
const CONTENT_SELECTORS: &[&str] = &[
    "article .entry-content",
    "article .post-content",
    "article .content",
    "article .article-content",
    ".entry-content",
    ".post-content",
    ".article-content",
    "[class*=\"entry-content\"]",
    "[class*=\"post-content\"]",
    "article main",
    "main article",
    "article",
];

const FOOTER_KEYWORDS: &[&str] = &[
    "copyright",
    "all rights reserved",
    "privacy policy",
    "terms of service",
    "follow us",
    "subscribe",
];

/// A paragraph must exceed this many characters to count as content.
const MIN_PARAGRAPH_LEN: usize = 20;
/// A container candidate is accepted once text and HTML both exceed this.
const MIN_CANDIDATE_LEN: usize = 100;
/// Footer-leakage correction only kicks in below this content length.
const FOOTER_SUSPECT_LEN: usize = 500;

/// Extract a structured article from a fetched page, or `None` if the page
/// does not contain usable article content.
pub fn extract_article(page_html: &str, page_url: &str) -> Option<ScrapedArticle> {
    let mut doc = Html::parse_document(page_html);
    strip_nodes(&mut doc, BOILERPLATE);

    let title = resolve_title(&doc);
    let (mut content, content_html) = resolve_body(&doc);

    // Footer-leakage re-check: short content that reads like legal
    // boilerplate gets one corrective pass over the best container.
    let lower = content.to_lowercase();
    if content.chars().count() < FOOTER_SUSPECT_LEN
        && FOOTER_KEYWORDS.iter().any(|kw| lower.contains(kw))
    {
        if let Some(better) = reextract_without_footer(&doc) {
            content = better;
        }
    }

    let origin = Url::parse(page_url)
        .ok()
        .map(|u| u.origin().ascii_serialization());
    let content_html = clean_html(&content_html, origin.as_deref());

    let image_url = resolve_image(&doc, page_url);
    let author = resolve_author(&doc);
    let published_date = resolve_date(&doc);
    let excerpt = resolve_excerpt(&doc, &content);

    if title.is_empty() || content.chars().count() < MIN_CONTENT_LEN {
        debug!(
            "rejecting {}: title={} content_len={}",
            page_url,
            !title.is_empty(),
            content.chars().count()
        );
        return None;
    }

    Some(ScrapedArticle {
        title: truncate_chars(&title, MAX_TITLE_LEN),
        content: truncate_chars(&content, MAX_CONTENT_LEN),
        content_html: truncate_chars(&content_html, MAX_CONTENT_HTML_LEN),
        author: truncate_chars(&author, MAX_AUTHOR_LEN),
        published_date,
        source_url: page_url.to_string(),
        image_url,
        excerpt: truncate_chars(&excerpt, MAX_EXCERPT_LEN),
    })
}

fn resolve_title(doc: &Html) -> String {
    select_text(
        doc,
        "article h1, .entry-title, .post-title, h1.entry-title, h1.post-title",
    )
    .or_else(|| select_text(doc, "h1"))
    .or_else(|| {
        select_text(doc, "title").map(|t| {
            let t = t.split('|').next().unwrap_or("").trim();
            t.split('-').next().unwrap_or("").trim().to_string()
        })
    })
    .unwrap_or_default()
}

/// Try the container cascade, then `<main>`, then a cleaned `<body>`.
/// Returns (plain text, inner HTML); either may be weak or empty, the
/// validation gate decides.
fn resolve_body(doc: &Html) -> (String, String) {
    let mut content = String::new();
    let mut content_html = String::new();

    for selector_str in CONTENT_SELECTORS {
        let selector = Selector::parse(selector_str).unwrap();
        if let Some(container) = doc.select(&selector).next() {
            let mut fragment = Html::parse_fragment(&container.inner_html());
            strip_nodes(&mut fragment, CONTAINER_STRIP);
            strip_nodes(&mut fragment, HINTED_WRAPPERS);

            content_html = fragment.root_element().inner_html();
            content = paragraphs_or_full_text(&fragment);

            if content.chars().count() > MIN_CANDIDATE_LEN
                && content_html.chars().count() > MIN_CANDIDATE_LEN
            {
                return (content, content_html);
            }
        }
    }

    // Fallback: <main>, paragraphs only
    if content.chars().count() <= MIN_CANDIDATE_LEN {
        let main_selector = Selector::parse("main").unwrap();
        if let Some(main_el) = doc.select(&main_selector).next() {
            let mut fragment = Html::parse_fragment(&main_el.inner_html());
            strip_nodes(
                &mut fragment,
                "footer, .footer, nav, .nav, .sidebar, .widget, script, style",
            );
            content_html = fragment.root_element().inner_html();
            content = join_paragraphs(&fragment, |_| true);
        }
    }

    // Last resort: cleaned <body> with legal-looking paragraphs dropped
    if content.chars().count() <= MIN_CANDIDATE_LEN {
        let body_selector = Selector::parse("body").unwrap();
        if let Some(body) = doc.select(&body_selector).next() {
            let mut fragment = Html::parse_fragment(&body.inner_html());
            strip_nodes(
                &mut fragment,
                "footer, .footer, nav, .nav, .sidebar, script, style, header, .header",
            );
            content = join_paragraphs(&fragment, |p| {
                let lower = p.to_lowercase();
                !lower.contains("copyright") && !lower.contains("all rights reserved")
            });
            if content_html.is_empty() {
                let inner = Selector::parse("article, main, .content").unwrap();
                content_html = fragment
                    .select(&inner)
                    .next()
                    .map(|el| el.inner_html())
                    .unwrap_or_default();
            }
        }
    }

    (content, content_html)
}

/// Join qualifying `<p>` texts; when none qualify, fall back to the
/// fragment's full text.
fn paragraphs_or_full_text(fragment: &Html) -> String {
    let joined = join_paragraphs(fragment, |_| true);
    if !joined.is_empty() {
        joined
    } else {
        normalize_ws(&fragment.root_element().text().collect::<String>())
    }
}

fn join_paragraphs<F>(fragment: &Html, keep: F) -> String
where
    F: Fn(&str) -> bool,
{
    let p_selector = Selector::parse("p").unwrap();
    let paragraphs: Vec<String> = fragment
        .select(&p_selector)
        .map(|p| normalize_ws(&p.text().collect::<String>()))
        .filter(|p| p.chars().count() > MIN_PARAGRAPH_LEN && keep(p))
        .collect();
    normalize_ws(&paragraphs.join(" "))
}

/// Corrective pass: paragraphs from the best container, excluding any footer
/// subtree and any paragraph carrying a footer keyword. Adopted only when
/// the result is substantial.
fn reextract_without_footer(doc: &Html) -> Option<String> {
    let selector = Selector::parse("article, .entry-content, .post-content").unwrap();
    let container = doc.select(&selector).next()?;
    let mut fragment = Html::parse_fragment(&container.inner_html());
    strip_nodes(&mut fragment, "footer, .footer, [class*=\"footer\"]");
    let better = join_paragraphs(&fragment, |p| {
        let lower = p.to_lowercase();
        !FOOTER_KEYWORDS.iter().any(|kw| lower.contains(kw))
    });
    if better.chars().count() > MIN_CANDIDATE_LEN {
        Some(better)
    } else {
        None
    }
}

/// String-level HTML cleanup, mirroring what the extraction keeps: absolute
/// image sources, no inline styles, no empty wrappers, single-space runs.
pub(crate) fn clean_html(html: &str, origin: Option<&str>) -> String {
    if html.is_empty() {
        return String::new();
    }
    let mut out = html.to_string();

    if let Some(origin) = origin {
        let src_re = Regex::new(r#"src=["']([^"']+)["']"#).unwrap();
        out = src_re
            .replace_all(&out, |caps: &regex::Captures| {
                let src = &caps[1];
                if let Some(rest) = src.strip_prefix("//") {
                    format!("src=\"https://{}\"", rest)
                } else if src.starts_with('/') {
                    format!("src=\"{}{}\"", origin, src)
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
    }

    let style_re = Regex::new(r#"\s+style=["'][^"']*["']"#).unwrap();
    out = style_re.replace_all(&out, "").into_owned();

    let empty_re = Regex::new(r"(?i)<(p|div)[^>]*>\s*</(p|div)>").unwrap();
    out = empty_re.replace_all(&out, "").into_owned();

    let ws_re = Regex::new(r"\s+").unwrap();
    ws_re.replace_all(&out, " ").trim().to_string()
}

fn resolve_image(doc: &Html, page_url: &str) -> String {
    let src = select_attr(
        doc,
        "article img, .featured-image img, .post-thumbnail img, .entry-featured-image img",
        "src",
    )
    .or_else(|| meta_content(doc, "meta[property=\"og:image\"]"))
    .or_else(|| select_attr(doc, "img", "src"))
    .unwrap_or_default();
    absolutize(&src, page_url)
}

fn resolve_author(doc: &Html) -> String {
    select_text(
        doc,
        "article .author, .entry-author, .post-author, .by-author, [class*=\"author-name\"]",
    )
    .or_else(|| meta_content(doc, "meta[name=\"author\"]"))
    .or_else(|| select_text(doc, "[rel=\"author\"]"))
    .unwrap_or_else(|| "Unknown".to_string())
}

fn resolve_date(doc: &Html) -> DateTime<Utc> {
    select_attr(
        doc,
        "article time[datetime], .entry-date time[datetime], .post-date time[datetime]",
        "datetime",
    )
    .or_else(|| meta_content(doc, "meta[property=\"article:published_time\"]"))
    .or_else(|| select_attr(doc, "time[datetime]", "datetime"))
    .or_else(|| select_attr(doc, "[class*=\"date\"] time", "datetime"))
    .and_then(|raw| parse_date(&raw))
    .unwrap_or_else(Utc::now)
}

/// Accept a date only if it parses to a valid instant.
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|ndt| DateTime::from_naive_utc_and_offset(ndt, Utc));
    }
    None
}

fn resolve_excerpt(doc: &Html, content: &str) -> String {
    meta_content(doc, "meta[name=\"description\"]")
        .or_else(|| meta_content(doc, "meta[property=\"og:description\"]"))
        .or_else(|| select_text(doc, ".excerpt, .summary, .entry-summary"))
        .unwrap_or_else(|| truncate_chars(&normalize_ws(content), 200))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/blog/test-post";

    fn long_paragraph(n: usize) -> String {
        "word ".repeat(n).trim().to_string()
    }

    fn article_page(body: &str) -> String {
        format!(
            "<html><head><title>Fallback Title | Example Blog</title></head><body>{}</body></html>",
            body
        )
    }

    #[test]
    fn test_extracts_structured_article() {
        let para = long_paragraph(40);
        let html = article_page(&format!(
            r#"<article>
                <h1>A Proper Headline</h1>
                <div class="entry-content">
                    <p>{p}</p>
                    <p>{p}</p>
                    <img src="/images/lead.png">
                </div>
                <span class="author-name">Jane Roe</span>
                <time datetime="2023-04-01T10:00:00Z">April 2023</time>
            </article>"#,
            p = para
        ));

        let article = extract_article(&html, URL).unwrap();
        assert_eq!(article.title, "A Proper Headline");
        assert!(article.content.contains("word"));
        assert!(article.content_html.contains("src=\"https://example.com/images/lead.png\""));
        assert_eq!(article.author, "Jane Roe");
        assert_eq!(
            article.published_date,
            DateTime::parse_from_rfc3339("2023-04-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc)
        );
        assert_eq!(article.source_url, URL);
    }

    #[test]
    fn test_rejects_page_without_content() {
        let html = article_page("<div><p>too short</p></div>");
        assert!(extract_article(&html, URL).is_none());
    }

    #[test]
    fn test_rejects_content_below_minimum() {
        // Title resolves but content never reaches 50 chars
        let html = article_page(
            r#"<article><h1>Title Here</h1>
               <div class="entry-content"><p>short</p></div></article>"#,
        );
        assert!(extract_article(&html, URL).is_none());
    }

    #[test]
    fn test_title_from_tag_discards_site_suffix() {
        let para = long_paragraph(40);
        let html = format!(
            "<html><head><title>Real Title | Example Blog</title></head><body>\
             <div class=\"entry-content\"><p>{p}</p><p>{p}</p></div></body></html>",
            p = para
        );
        let article = extract_article(&html, URL).unwrap();
        assert_eq!(article.title, "Real Title");
    }

    #[test]
    fn test_boilerplate_does_not_leak_into_content() {
        let para = long_paragraph(40);
        let html = article_page(&format!(
            r#"<article><h1>Headline Words</h1>
                <div class="entry-content"><p>{p}</p><p>{p}</p></div>
            </article>
            <footer><p>Copyright 2024 Example Inc. All rights reserved on everything.</p></footer>"#,
            p = para
        ));
        let article = extract_article(&html, URL).unwrap();
        assert!(!article.content.to_lowercase().contains("copyright"));
    }

    #[test]
    fn test_fields_are_truncated() {
        let para = long_paragraph(40);
        let long_title = "T".repeat(800);
        let html = article_page(&format!(
            r#"<article><h1>{t}</h1>
               <div class="entry-content"><p>{p}</p><p>{p}</p></div></article>"#,
            t = long_title,
            p = para
        ));
        let article = extract_article(&html, URL).unwrap();
        assert_eq!(article.title.chars().count(), 500);
        assert!(article.content.chars().count() <= 10_000);
        assert!(article.excerpt.chars().count() <= 500);
    }

    #[test]
    fn test_image_falls_back_to_open_graph() {
        let para = long_paragraph(40);
        let html = format!(
            "<html><head><meta property=\"og:image\" content=\"https://cdn.example.com/og.png\">\
             </head><body><div class=\"entry-content\"><p>{p}</p><p>{p}</p></div></body></html>",
            p = para
        );
        let article = extract_article(&html, URL).unwrap();
        assert_eq!(article.image_url, "https://cdn.example.com/og.png");
    }

    #[test]
    fn test_author_defaults_to_unknown() {
        let para = long_paragraph(40);
        let html = article_page(&format!(
            "<div class=\"entry-content\"><p>{p}</p><p>{p}</p></div>",
            p = para
        ));
        let article = extract_article(&html, URL).unwrap();
        assert_eq!(article.author, "Unknown");
    }

    #[test]
    fn test_excerpt_prefers_meta_description() {
        let para = long_paragraph(40);
        let html = format!(
            "<html><head><meta name=\"description\" content=\"A handy summary.\"></head>\
             <body><div class=\"entry-content\"><p>{p}</p><p>{p}</p></div></body></html>",
            p = para
        );
        let article = extract_article(&html, URL).unwrap();
        assert_eq!(article.excerpt, "A handy summary.");
    }

    #[test]
    fn test_excerpt_falls_back_to_content_prefix() {
        let para = long_paragraph(100);
        let html = article_page(&format!(
            "<div class=\"entry-content\"><p>{p}</p><p>{p}</p></div>",
            p = para
        ));
        let article = extract_article(&html, URL).unwrap();
        assert_eq!(article.excerpt.chars().count(), 200);
        assert!(article.content.starts_with(&article.excerpt));
    }

    #[test]
    fn test_invalid_date_defaults_to_now() {
        let para = long_paragraph(40);
        let before = Utc::now();
        let html = article_page(&format!(
            r#"<article><h1>Dated Headline</h1>
               <div class="entry-content"><p>{p}</p><p>{p}</p></div>
               <time datetime="not-a-date">whenever</time></article>"#,
            p = para
        ));
        let article = extract_article(&html, URL).unwrap();
        assert!(article.published_date >= before);
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2023-04-01T10:00:00Z").is_some());
        assert!(parse_date("2023-04-01").is_some());
        assert!(parse_date("garbage").is_none());
    }

    #[test]
    fn test_clean_html_rules() {
        let html = r#"<p style="color:red">Hi there</p><p></p><img src="/a.png"><img src="//cdn.example.com/b.png">"#;
        let cleaned = clean_html(html, Some("https://example.com"));
        assert!(!cleaned.contains("style="));
        assert!(!cleaned.contains("<p></p>"));
        assert!(cleaned.contains("src=\"https://example.com/a.png\""));
        assert!(cleaned.contains("src=\"https://cdn.example.com/b.png\""));
    }

    #[test]
    fn test_hinted_wrappers_removed_from_container() {
        let para = long_paragraph(40);
        let html = article_page(&format!(
            r#"<div class="entry-content">
                <p>{p}</p><p>{p}</p>
                <div class="widget-area">promo junk</div>
            </div>"#,
            p = para
        ));
        let article = extract_article(&html, URL).unwrap();
        assert!(!article.content_html.contains("promo junk"));
    }
}
