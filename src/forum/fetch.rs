use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::constants::LAST_PAGE_QUERY;

use super::parse::{diagnose_empty_page, extract_posts, is_anti_bot_title};
use super::{FetchError, ScrapedPost, TopicFetcher};

/// HTTP implementation of [`TopicFetcher`].
///
/// Fetches the final page of the thread (phpBB clamps an oversized `start`
/// offset) with the configured session cookie and a browser user agent.
/// Anti-bot challenge pages are detected and reported as a diagnosis, not
/// bypassed; solving them is outside this service.
#[derive(Debug, Clone)]
pub struct HttpTopicFetcher {
    client: reqwest::Client,
    session_cookie: Option<String>,
}

impl HttpTopicFetcher {
    /// Build a fetcher from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            session_cookie: config.session_cookie.clone(),
        })
    }

    /// Fetcher reusing an existing client; used by tests.
    #[must_use]
    pub fn with_client(client: reqwest::Client, session_cookie: Option<String>) -> Self {
        Self {
            client,
            session_cookie,
        }
    }
}

#[async_trait]
impl TopicFetcher for HttpTopicFetcher {
    async fn fetch_rendered_posts(&self, topic_url: &str) -> Result<Vec<ScrapedPost>, FetchError> {
        // Force the last page of the thread.
        let separator = if topic_url.contains('?') { '&' } else { '?' };
        let page_url_str = format!("{topic_url}{separator}{LAST_PAGE_QUERY}");

        let mut request = self.client.get(&page_url_str);
        if let Some(cookie) = &self.session_cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let html = response.text().await?;

        // Refs are anchored on the canonical topic URL, not the start-offset
        // page URL, so they stay comparable across checks.
        let base_url = Url::parse(topic_url)
            .or_else(|_| Url::parse(&page_url_str))
            .map_err(|_| FetchError::ScraperMismatch {
                title: String::new(),
                body_snippet: format!("unparseable topic url: {topic_url}"),
            })?;

        let posts = extract_posts(&html, &base_url);
        debug!(url = %topic_url, posts = posts.len(), "Fetched topic page");

        if posts.is_empty() {
            // Even a successful response can be a challenge interstitial.
            let diagnosis = diagnose_empty_page(&html);
            return Err(diagnosis);
        }

        // A challenge page will not normally contain post containers, but if
        // a skin quirk makes one slip through, the title is authoritative.
        if let Some(title_start) = html.find("<title>") {
            let title_rest = &html[title_start + 7..];
            if let Some(end) = title_rest.find("</title>") {
                if is_anti_bot_title(&title_rest[..end]) {
                    return Err(FetchError::AntiBotBlock);
                }
            }
        }

        Ok(posts)
    }
}
