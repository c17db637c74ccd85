use scraper::{Html, Selector};
use url::Url;

/// Detach every element matching `selector_str` from the document.
pub(crate) fn strip_nodes(doc: &mut Html, selector_str: &str) {
    let selector = Selector::parse(selector_str).unwrap();
    let ids: Vec<_> = doc.select(&selector).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// First matching element's text, whitespace-normalized; `None` when the
/// selector misses or the text is empty.
pub(crate) fn select_text(doc: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).unwrap();
    doc.select(&selector)
        .next()
        .map(|el| normalize_ws(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// First matching element's attribute value, `None` when missing or empty.
pub(crate) fn select_attr(doc: &Html, selector_str: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).unwrap();
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn meta_content(doc: &Html, selector_str: &str) -> Option<String> {
    select_attr(doc, selector_str, "content")
}

/// Collapse whitespace runs to single spaces and trim.
pub(crate) fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve a possibly-relative href against the page it was found on.
pub(crate) fn absolutize(href: &str, base_url: &str) -> String {
    if href.is_empty() || href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    Url::parse(base_url)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize("/blog/post", "https://example.com/blogs/"),
            "https://example.com/blog/post"
        );
        assert_eq!(
            absolutize("https://other.com/x", "https://example.com/"),
            "https://other.com/x"
        );
        assert_eq!(absolutize("", "https://example.com/"), "");
    }

    #[test]
    fn test_normalize_ws() {
        assert_eq!(normalize_ws("  a \n\n b\tc  "), "a b c");
    }

    #[test]
    fn test_strip_nodes_removes_subtrees() {
        let mut doc = Html::parse_document(
            "<html><body><article><p>keep</p></article><footer><p>drop</p></footer></body></html>",
        );
        strip_nodes(&mut doc, "footer");
        let text = doc.root_element().text().collect::<String>();
        assert!(text.contains("keep"));
        assert!(!text.contains("drop"));
    }
}
