//! Forum boundary: fetching and parsing rendered topic pages.
//!
//! The checker only ever talks to the [`TopicFetcher`] trait, so the HTTP
//! implementation can be swapped for a mock in tests (or, in principle, for
//! a headless-browser fetcher) without touching the classification logic.

mod fetch;
pub mod normalize;
pub mod parse;

pub use fetch::HttpTopicFetcher;
pub use normalize::normalize_topic_url;

use async_trait::async_trait;
use thiserror::Error;

/// One post scraped from the final page of a topic. Ephemeral: built fresh
/// per check and discarded after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPost {
    /// Best-effort stable locator for the post: a permalink when the page
    /// offers one, an anchor derived from the post id otherwise, and a
    /// synthetic per-index value as the last resort.
    pub post_ref: String,
    /// Rendered post body HTML, markup retained.
    pub raw_content: String,
    /// Normalized plain text: quote headers stripped, whitespace collapsed,
    /// truncated to 200 characters.
    pub plain_text: String,
}

/// Why a fetch produced no usable posts.
///
/// Every variant renders to the diagnostic note persisted on the topic, so a
/// false negative can be diagnosed from the topic row alone.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("forum returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("login required (forum served the login page)")]
    LoginRequired,
    #[error("blocked by anti-bot challenge")]
    AntiBotBlock,
    #[error("generic information page (topic removed?)")]
    TopicRemoved,
    #[error("scraper mismatch, title: {title:?}, body: {body_snippet:?}")]
    ScraperMismatch { title: String, body_snippet: String },
}

/// The `fetchRenderedPosts` collaborator: returns the posts of the final page
/// of a topic thread, oldest to newest, or a failure diagnosis.
#[async_trait]
pub trait TopicFetcher: Send + Sync {
    async fn fetch_rendered_posts(&self, topic_url: &str) -> Result<Vec<ScrapedPost>, FetchError>;
}
