use std::time::Duration;

use bf_core::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT};
use tracing::debug;

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const SIMPLE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub const LISTING_TIMEOUT: Duration = Duration::from_secs(15);
pub const ARTICLE_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP fetcher with a browser-like identity. Listing pages and article pages
/// get different timeouts; article fetches retry once with a stripped-down
/// header set when the host answers 403.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }

    pub async fn get_listing(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .timeout(LISTING_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Scraping(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        Ok(response.text().await?)
    }

    pub async fn get_article(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .headers(browser_headers())
            .timeout(ARTICLE_TIMEOUT)
            .send()
            .await?;

        // Some hosts reject the full browser fingerprint outright
        let response = if response.status() == reqwest::StatusCode::FORBIDDEN {
            debug!("got 403 from {}, retrying with simpler headers", url);
            self.client
                .get(url)
                .header(USER_AGENT, SIMPLE_USER_AGENT)
                .header(
                    ACCEPT,
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .timeout(ARTICLE_TIMEOUT)
                .send()
                .await?
        } else {
            response
        };

        if !response.status().is_success() {
            return Err(Error::Scraping(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        Ok(response.text().await?)
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_headers_identify_as_browser() {
        let headers = browser_headers();
        assert_eq!(
            headers.get(USER_AGENT).unwrap(),
            &HeaderValue::from_static(BROWSER_USER_AGENT)
        );
        assert!(headers.contains_key("sec-fetch-mode"));
    }
}
