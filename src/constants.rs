//! Shared constants used across the application.

/// User agent string used for forum and storefront HTTP requests.
///
/// A realistic browser user agent; phpBB boards behind anti-bot proxies serve
/// stripped or challenge pages to obvious non-browser clients.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Query parameter appended to a topic URL to force the final page of the
/// thread. phpBB clamps an out-of-range `start` offset to the last page.
pub const LAST_PAGE_QUERY: &str = "start=9999999";
