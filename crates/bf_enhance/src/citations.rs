//! Citation blocks generated from reference-article metadata, appended to
//! enhanced content in both HTML and plain-text form.

use bf_core::ReferenceEntry;

/// HTML citation list. Empty input produces an empty string, not an empty
/// list shell.
pub fn format_citations_html(references: &[ReferenceEntry]) -> String {
    if references.is_empty() {
        return String::new();
    }

    let mut html = String::from(
        "\n\n<div class=\"article-citations\">\n<h3>References</h3>\n<ol class=\"citation-list\">\n",
    );
    for reference in references {
        html.push_str("<li class=\"citation-item\">\n");
        html.push_str(&format!("<strong>{}</strong><br>\n", display_title(reference)));
        if let Some(byline) = byline(reference) {
            html.push_str(&byline);
            html.push_str("<br>\n");
        }
        if !reference.url.is_empty() {
            html.push_str(&format!(
                "<a href=\"{url}\" target=\"_blank\" rel=\"noopener noreferrer\">{url}</a>\n",
                url = reference.url
            ));
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ol>\n</div>");
    html
}

/// Numbered plain-text citation block.
pub fn format_citations_text(references: &[ReferenceEntry]) -> String {
    if references.is_empty() {
        return String::new();
    }

    let mut text = String::from("\n\nReferences:\n");
    for (i, reference) in references.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", i + 1, display_title(reference)));
        if let Some(byline) = byline(reference) {
            text.push_str(&format!("   {}\n", byline));
        }
        if !reference.url.is_empty() {
            text.push_str(&format!("   {}\n", reference.url));
        }
        text.push('\n');
    }
    text
}

fn display_title(reference: &ReferenceEntry) -> &str {
    if reference.title.is_empty() {
        "Untitled"
    } else {
        &reference.title
    }
}

/// "By <author>, <date>" — suppressed entirely for unknown authors.
fn byline(reference: &ReferenceEntry) -> Option<String> {
    if reference.author.is_empty()
        || reference.author == "Unknown"
        || reference.author == "Unknown Author"
    {
        return None;
    }
    match reference.published_date {
        Some(date) => Some(format!(
            "By {}, {}",
            reference.author,
            date.format("%B %-d, %Y")
        )),
        None => Some(format!("By {}", reference.author)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(title: &str, author: &str) -> ReferenceEntry {
        ReferenceEntry {
            title: title.to_string(),
            url: "https://elsewhere.com/blog/ref".to_string(),
            author: author.to_string(),
            published_date: Some(Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_empty_references_yield_empty_strings() {
        assert_eq!(format_citations_html(&[]), "");
        assert_eq!(format_citations_text(&[]), "");
    }

    #[test]
    fn test_html_structure() {
        let html = format_citations_html(&[entry("Useful Source", "Sam Writer")]);
        assert!(html.contains("<div class=\"article-citations\">"));
        assert!(html.contains("<h3>References</h3>"));
        assert!(html.contains("<strong>Useful Source</strong>"));
        assert!(html.contains("By Sam Writer, April 1, 2023"));
        assert!(html.contains("href=\"https://elsewhere.com/blog/ref\""));
    }

    #[test]
    fn test_unknown_author_has_no_byline() {
        let html = format_citations_html(&[entry("Useful Source", "Unknown")]);
        assert!(!html.contains("By "));
        let text = format_citations_text(&[entry("Useful Source", "Unknown Author")]);
        assert!(!text.contains("By "));
    }

    #[test]
    fn test_text_is_numbered() {
        let text = format_citations_text(&[
            entry("First Source", "A"),
            entry("Second Source", "B"),
        ]);
        assert!(text.contains("1. First Source"));
        assert!(text.contains("2. Second Source"));
    }

    #[test]
    fn test_untitled_placeholder() {
        let mut reference = entry("", "Unknown");
        reference.published_date = None;
        let text = format_citations_text(&[reference]);
        assert!(text.contains("1. Untitled"));
    }
}
