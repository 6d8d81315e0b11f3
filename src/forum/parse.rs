//! Extraction of rendered posts from a phpBB topic page.
//!
//! RIN-era phpBB skins are inconsistent, so extraction runs a strategy chain:
//! post containers with a numeric `p<digits>` id first, then the classic
//! `.row1`/`.row2` table rows that wrap a post body, then bare `.postbody`
//! elements as the last resort. Post locators get the same best-effort
//! treatment; a post that yields no stable locator still classifies, it just
//! carries a synthetic ref that will not resolve to a real forum anchor.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{FetchError, ScrapedPost};

/// Plain text snippets are capped at this many characters for storage and
/// debug display.
const SNIPPET_MAX_CHARS: usize = 200;

static POST_CONTAINER_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[id^="p"], table[id^="p"]"#).expect("valid selector"));
static ROW_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".row1, .row2").expect("valid selector"));
static POSTBODY_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".postbody").expect("valid selector"));
static CONTENT_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".content").expect("valid selector"));
static TOPIC_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="viewtopic.php"]"#).expect("valid selector"));
static SUBJECT_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h3 a, .post-subject a").expect("valid selector"));
static POST_ANCHOR_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[name^="p"]"#).expect("valid selector"));
static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static BODY_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));

static POST_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^p\d+$").expect("valid regex"));
static POST_NUM_IN_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[?&]p=|#p)(\d+)").expect("valid regex"));
static QUOTE_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Quote:.*?wrote:").expect("valid regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Extract all posts from a rendered topic page, oldest to newest as they
/// appear on the page. `page_url` anchors relative permalinks and synthetic
/// refs.
#[must_use]
pub fn extract_posts(html: &str, page_url: &Url) -> Vec<ScrapedPost> {
    let document = Html::parse_document(html);

    // Strategy 1: containers with a strictly numeric post id (p153567).
    let mut elements: Vec<ElementRef<'_>> = document
        .select(&POST_CONTAINER_SEL)
        .filter(|el| el.value().id().is_some_and(|id| POST_ID_RE.is_match(id)))
        .collect();

    // Strategy 2: .row1/.row2 table rows that actually wrap a post body.
    if elements.is_empty() {
        elements = document
            .select(&ROW_SEL)
            .filter(|el| {
                el.select(&POSTBODY_SEL).next().is_some()
                    || el.select(&CONTENT_SEL).next().is_some()
            })
            .collect();
    }

    // Strategy 3: bare post bodies.
    if elements.is_empty() {
        elements = document.select(&POSTBODY_SEL).collect();
    }

    elements
        .iter()
        .enumerate()
        .map(|(index, el)| ScrapedPost {
            post_ref: extract_post_ref(el, page_url, index),
            raw_content: extract_raw_content(el),
            plain_text: extract_plain_text(el),
        })
        .collect()
}

/// Diagnose a page that yielded zero posts. Never silently "up to date": the
/// caller persists this as an `error` status with an explanatory note.
#[must_use]
pub fn diagnose_empty_page(html: &str) -> FetchError {
    let document = Html::parse_document(html);
    let title = document
        .select(&TITLE_SEL)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    if is_anti_bot_title(&title) {
        return FetchError::AntiBotBlock;
    }
    if title.contains("Login") {
        return FetchError::LoginRequired;
    }
    if title.contains("Information") {
        return FetchError::TopicRemoved;
    }

    // Unknown layout: keep a snippet of the body so the mismatch can be
    // diagnosed from the persisted note alone.
    let body_snippet = document
        .select(&BODY_SEL)
        .next()
        .map(|b| {
            let text = b.text().collect::<Vec<_>>().join(" ");
            let collapsed = WHITESPACE_RE.replace_all(&text, " ");
            collapsed.trim().chars().take(100).collect::<String>()
        })
        .unwrap_or_default();

    FetchError::ScraperMismatch {
        title,
        body_snippet,
    }
}

/// Whether a page title looks like an interstitial anti-bot challenge.
#[must_use]
pub fn is_anti_bot_title(title: &str) -> bool {
    ["Just a moment", "Attention Required", "Security Check", "Cloudflare"]
        .iter()
        .any(|m| title.contains(m))
}

fn extract_raw_content(el: &ElementRef<'_>) -> String {
    if let Some(content) = el.select(&CONTENT_SEL).next() {
        return content.inner_html();
    }
    if let Some(body) = el.select(&POSTBODY_SEL).next() {
        return body.inner_html();
    }
    el.inner_html()
}

fn extract_plain_text(el: &ElementRef<'_>) -> String {
    let text = el.text().collect::<Vec<_>>().join(" ");
    let without_quotes = QUOTE_HEADER_RE.replace_all(&text, "");
    let collapsed = WHITESPACE_RE.replace_all(&without_quotes, " ");
    let trimmed = collapsed.trim();

    if trimmed.chars().count() > SNIPPET_MAX_CHARS {
        let truncated: String = trimmed.chars().take(SNIPPET_MAX_CHARS).collect();
        format!("{truncated}...")
    } else {
        trimmed.to_string()
    }
}

/// Resolve the best available stable locator for a post.
///
/// Preference order: a permalink found inside the post, the container's own
/// numeric id, an inner `<a name="p...">` anchor, and finally a synthetic
/// per-index value. Whenever a post number is recoverable the ref is rebuilt
/// as a canonical `viewtopic.php?p=N#pN` permalink, so session ids and page
/// offsets embedded in the on-page hrefs cannot make refs drift between
/// checks.
fn extract_post_ref(el: &ElementRef<'_>, page_url: &Url, index: usize) -> String {
    // Permalinks inside the post, preferring ones that name a post number.
    let links: Vec<&str> = el
        .select(&TOPIC_LINK_SEL)
        .filter_map(|a| a.value().attr("href"))
        .collect();
    let best_link = links
        .iter()
        .find(|href| href.contains("#p") || href.contains("p="))
        .or_else(|| links.first())
        .copied()
        .or_else(|| {
            el.select(&SUBJECT_LINK_SEL)
                .next()
                .and_then(|a| a.value().attr("href"))
        });

    if let Some(href) = best_link {
        if let Some(num) = POST_NUM_IN_URL_RE
            .captures(href)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
        {
            return permalink(page_url, num);
        }
        // A link with no recognizable post number is still better than
        // nothing, resolved against the page URL.
        if let Ok(resolved) = page_url.join(href) {
            return resolved.to_string();
        }
    }

    // Container id or inner anchor.
    let id = el
        .value()
        .id()
        .filter(|id| POST_ID_RE.is_match(id))
        .map(ToString::to_string)
        .or_else(|| {
            el.select(&POST_ANCHOR_SEL)
                .filter_map(|a| a.value().attr("name"))
                .find(|name| POST_ID_RE.is_match(name))
                .map(ToString::to_string)
        });
    if let Some(id) = id {
        return permalink(page_url, id.trim_start_matches('p'));
    }

    format!("generated_{index}")
}

/// Canonical permalink for a post number, anchored on the page's host/path.
fn permalink(page_url: &Url, post_num: &str) -> String {
    let mut url = page_url.clone();
    url.set_query(Some(&format!("p={post_num}")));
    url.set_fragment(Some(&format!("p{post_num}")));
    url.to_string()
}
