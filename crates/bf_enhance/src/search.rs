use std::fmt;

use async_trait::async_trait;
use bf_core::{Error, Result};
use serde::Deserialize;
use tracing::info;

/// Domains that never count as reference material, mostly social and video.
const EXCLUDED_DOMAINS: &[&str] = &[
    "youtube.com",
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "linkedin.com",
    "pinterest.com",
    "reddit.com",
    "quora.com",
    "amazon.com",
    "wikipedia.org",
    "github.com",
];

const BLOG_PATHS: &[&str] = &["/blog/", "/article/", "/post/", "/news/", "/story/"];
const BLOG_PLATFORMS: &[&str] = &[
    "medium.com",
    "wordpress.com",
    "blogger.com",
    "tumblr.com",
    "substack.com",
];

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
}

/// Query string in, blog-looking results out, best first.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

pub(crate) fn looks_like_article(url: &str) -> bool {
    BLOG_PATHS.iter().any(|p| url.contains(p))
        || BLOG_PLATFORMS.iter().any(|p| url.contains(p))
}

/// Keep results that plausibly point at blog articles; order is preserved.
pub fn filter_blog_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|result| {
            let url = result.url.to_lowercase();
            let title = result.title.to_lowercase();
            if EXCLUDED_DOMAINS.iter().any(|d| url.contains(d)) {
                return false;
            }
            url.contains("/blog/")
                || url.contains("/article/")
                || url.contains("/post/")
                || title.contains("blog")
                || title.contains("article")
                || looks_like_article(&url)
        })
        .collect()
}

#[derive(Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Deserialize)]
struct OrganicResult {
    title: String,
    link: String,
    snippet: Option<String>,
}

/// SerpAPI-backed Google search.
pub struct SerpApiSearch {
    client: reqwest::Client,
    api_key: String,
}

impl fmt::Debug for SerpApiSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerpApiSearch")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl SerpApiSearch {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("SERPAPI_KEY is required".to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(std::env::var("SERPAPI_KEY").ok())
    }
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        info!("searching for \"{}\"", query);
        let response = self
            .client
            .get("https://serpapi.com/search.json")
            .query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("engine", "google"),
                ("num", "10"),
                ("safe", "active"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Search(format!(
                "search provider returned {}",
                response.status()
            )));
        }

        let body: SerpResponse = response.json().await?;
        let results = body
            .organic_results
            .into_iter()
            .map(|r| SearchResult {
                title: r.title,
                url: r.link,
                snippet: r.snippet,
            })
            .collect();
        Ok(filter_blog_results(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, url: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            url: url.to_string(),
            snippet: None,
        }
    }

    #[test]
    fn test_excluded_domains_are_dropped() {
        let results = vec![
            result("Great video", "https://youtube.com/watch?v=1"),
            result("A blog post", "https://example.com/blog/post"),
            result("Wiki entry", "https://en.wikipedia.org/wiki/Thing"),
        ];
        let filtered = filter_blog_results(results);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].url, "https://example.com/blog/post");
    }

    #[test]
    fn test_blog_platforms_count_as_articles() {
        let results = vec![
            result("Some thoughts", "https://someone.medium.com/thoughts-123"),
            result("Homepage", "https://example.com/"),
        ];
        let filtered = filter_blog_results(results);
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].url.contains("medium.com"));
    }

    #[test]
    fn test_blog_in_title_is_enough() {
        let results = vec![result(
            "My blog about gardening",
            "https://example.com/gardening",
        )];
        assert_eq!(filter_blog_results(results).len(), 1);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let err = SerpApiSearch::new(None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = SerpApiSearch::new(Some(String::new())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
