use std::fmt;

use async_trait::async_trait;
use bf_core::types::truncate_chars;
use bf_core::{ArticleRecord, Error, ReferenceArticle, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Reference content is truncated to this many characters per article before
/// going into the prompt.
const MAX_REFERENCE_PROMPT_LEN: usize = 3000;

/// Prompt in, free-text completion out.
#[async_trait]
pub trait CompletionModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// The rewritten article parsed out of a completion.
#[derive(Debug, Clone)]
pub struct RewrittenArticle {
    pub title: String,
    pub content: String,
    pub content_html: String,
}

/// Build the rewrite prompt: the original article plus each reference,
/// with a tagged output contract the parser understands.
pub fn build_prompt(original: &ArticleRecord, references: &[ReferenceArticle]) -> String {
    let reference_content = references
        .iter()
        .enumerate()
        .map(|(i, reference)| {
            format!(
                "Reference Article {}:\nTitle: {}\nContent: {}",
                i + 1,
                reference.title,
                truncate_chars(&reference.content, MAX_REFERENCE_PROMPT_LEN)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an expert content writer. Your task is to enhance and rewrite an article \
to match the style, formatting, and quality of top-ranking articles on Google.\n\n\
Original Article:\nTitle: {}\nContent: {}\n\n\
Reference Articles (top-ranking articles from Google):\n{}\n\n\
Instructions:\n\
1. Rewrite the original article to match the style, tone, and formatting of the reference articles\n\
2. Improve the content quality, structure, and readability\n\
3. Maintain the core message and key points from the original article\n\
4. Use similar paragraph structure, heading styles, and formatting as the reference articles\n\
5. Make the article more engaging and informative\n\
6. Ensure proper formatting with headings, paragraphs, and lists where appropriate\n\
7. Keep the article length similar to the reference articles\n\n\
Return the enhanced article in the following format:\n\
TITLE: [Enhanced title]\n\
CONTENT: [Enhanced content with proper HTML formatting - use <h2>, <h3>, <p>, <ul>, <ol>, <strong>, <em> tags as needed]",
        original.title, original.content, reference_content
    )
}

/// Parse the `TITLE:`/`CONTENT:` contract out of a completion. A response
/// without the tags falls back to the original title and the raw text.
pub fn parse_rewrite(raw: &str, fallback_title: &str) -> RewrittenArticle {
    let title_re = Regex::new(r"(?i)TITLE:\s*(.+?)\s*(?:\n|CONTENT:)").unwrap();
    let content_re = Regex::new(r"(?is)CONTENT:\s*(.+)").unwrap();

    let title = title_re
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_title.to_string());

    let content_html = content_re
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| raw.trim().to_string());

    RewrittenArticle {
        title,
        content: extract_plain_text(&content_html),
        content_html,
    }
}

/// Crude HTML-to-text for storing a plain variant of the rewrite.
pub fn extract_plain_text(html: &str) -> String {
    let tag_re = Regex::new(r"<[^>]+>").unwrap();
    let no_tags = tag_re.replace_all(html, " ");
    no_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

/// Google Gemini generateContent client.
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiModel {
    pub fn new(api_key: Option<String>, model: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("GEMINI_API_KEY is required".to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("GEMINI_MODEL").ok(),
        )
    }
}

#[async_trait]
impl CompletionModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        info!("calling {} to rewrite article", self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        );
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(Error::Inference(format!(
                "model endpoint returned {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response.json().await?;
        body.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| Error::Inference("empty completion response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record() -> ArticleRecord {
        ArticleRecord {
            id: "a1".to_string(),
            title: "Original Title".to_string(),
            content: "Original body text.".to_string(),
            content_html: String::new(),
            author: "Unknown".to_string(),
            published_date: Utc::now(),
            source_url: "https://example.com/blog/a".to_string(),
            image_url: String::new(),
            excerpt: String::new(),
            tags: vec![],
            is_scraped: true,
            original_article_id: None,
            version: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_tagged_response() {
        let raw = "TITLE: A Better Title\nCONTENT: <p>Rewritten body with <strong>style</strong>.</p>";
        let parsed = parse_rewrite(raw, "Original Title");
        assert_eq!(parsed.title, "A Better Title");
        assert!(parsed.content_html.starts_with("<p>Rewritten"));
        assert_eq!(parsed.content, "Rewritten body with style .");
    }

    #[test]
    fn test_untagged_response_falls_back() {
        let raw = "Just a plain rewrite with no tags at all.";
        let parsed = parse_rewrite(raw, "Original Title");
        assert_eq!(parsed.title, "Original Title");
        assert_eq!(parsed.content_html, raw);
    }

    #[test]
    fn test_multiline_content_is_kept_whole() {
        let raw = "TITLE: T\nCONTENT: <h2>One</h2>\n<p>Two</p>\n<p>Three</p>";
        let parsed = parse_rewrite(raw, "x");
        assert!(parsed.content_html.contains("<p>Three</p>"));
    }

    #[test]
    fn test_prompt_truncates_references() {
        let references = vec![ReferenceArticle {
            title: "Ref".to_string(),
            content: "x".repeat(10_000),
            content_html: String::new(),
            author: "Unknown".to_string(),
            published_date: None,
            source_url: "https://elsewhere.com/blog/ref".to_string(),
        }];
        let prompt = build_prompt(&record(), &references);
        assert!(prompt.contains("Original Title"));
        assert!(prompt.contains("Reference Article 1:"));
        // The 10k reference body must have been cut down
        assert!(prompt.len() < 6000);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        assert!(matches!(
            GeminiModel::new(None, None).unwrap_err(),
            Error::Config(_)
        ));
    }
}
