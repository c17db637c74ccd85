use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field limits applied before a scraped article is accepted.
pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_CONTENT_LEN: usize = 10_000;
pub const MAX_CONTENT_HTML_LEN: usize = 50_000;
pub const MAX_AUTHOR_LEN: usize = 200;
pub const MAX_EXCERPT_LEN: usize = 500;
/// Extractions with less plain text than this are rejected outright.
pub const MIN_CONTENT_LEN: usize = 50;

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// A stored article. Versions of the same article share a lineage rooted at
/// the record whose `original_article_id` is `None`; every update points at
/// that root directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub author: String,
    pub published_date: DateTime<Utc>,
    pub source_url: String,
    pub image_url: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub is_scraped: bool,
    pub original_article_id: Option<String>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

/// What the content extractor produces for one article page, before the
/// store assigns an id and version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedArticle {
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub author: String,
    pub published_date: DateTime<Utc>,
    pub source_url: String,
    pub image_url: String,
    pub excerpt: String,
}

impl ScrapedArticle {
    pub fn into_record(self) -> ArticleRecord {
        ArticleRecord {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title,
            content: self.content,
            content_html: self.content_html,
            author: self.author,
            published_date: self.published_date,
            source_url: self.source_url,
            image_url: self.image_url,
            excerpt: self.excerpt,
            tags: Vec::new(),
            is_scraped: true,
            original_article_id: None,
            version: 1,
            created_at: Utc::now(),
        }
    }
}

/// Incoming fields for creating an article or a new version of one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub content_html: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "Utc::now")]
    pub published_date: DateTime<Utc>,
    pub source_url: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_scraped: bool,
}

fn default_author() -> String {
    "Unknown".to_string()
}

impl ArticleDraft {
    pub fn into_record(self) -> ArticleRecord {
        ArticleRecord {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title,
            content: self.content,
            content_html: self.content_html,
            author: self.author,
            published_date: self.published_date,
            source_url: self.source_url,
            image_url: self.image_url,
            excerpt: self.excerpt,
            tags: self.tags,
            is_scraped: self.is_scraped,
            original_article_id: None,
            version: 1,
            created_at: Utc::now(),
        }
    }
}

/// A third-party article scraped as a style exemplar for enhancement.
/// Limits are looser than for stored articles since this never persists
/// as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceArticle {
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub author: String,
    pub published_date: Option<DateTime<Utc>>,
    pub source_url: String,
}

impl ReferenceArticle {
    pub fn entry(&self) -> ReferenceEntry {
        ReferenceEntry {
            title: self.title.clone(),
            url: self.source_url.clone(),
            author: self.author.clone(),
            published_date: self.published_date,
        }
    }
}

/// The slice of reference-article metadata kept on an enhanced record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub title: String,
    pub url: String,
    pub author: String,
    pub published_date: Option<DateTime<Utc>>,
}

/// Output of one enhancement run, linked to (not replacing) its original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedArticleRecord {
    pub id: String,
    pub original_article_id: String,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub reference_articles: Vec<ReferenceEntry>,
    pub citations: String,
    pub citations_html: String,
    pub enhanced_at: DateTime<Utc>,
    pub model_used: String,
    pub search_query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte characters must not be split
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_scraped_into_record_defaults() {
        let scraped = ScrapedArticle {
            title: "Title".into(),
            content: "Content".into(),
            content_html: "<p>Content</p>".into(),
            author: "Unknown".into(),
            published_date: Utc::now(),
            source_url: "https://example.com/blog/post".into(),
            image_url: String::new(),
            excerpt: "Content".into(),
        };
        let record = scraped.into_record();
        assert_eq!(record.version, 1);
        assert!(record.is_scraped);
        assert!(record.original_article_id.is_none());
        assert!(record.tags.is_empty());
        assert!(!record.id.is_empty());
    }
}
