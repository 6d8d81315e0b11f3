//! Store metadata enrichment for tracked topics.
//!
//! Topic titles on the forum are decorated with version tags and bracketed
//! release info, so lookups go through a cleanup pass first. Steam is the
//! primary source; IGDB is the fallback when Steam finds nothing and
//! credentials are configured. Enrichment is strictly best-effort: a topic is
//! tracked just fine with every metadata field empty.

pub mod igdb;
pub mod steam;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::Config;

/// Metadata looked up from a game store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreMetadata {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub genres: Vec<String>,
    pub steam_app_id: Option<String>,
}

impl StoreMetadata {
    /// Whether the lookup produced anything worth storing.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.name.is_some() || self.image_url.is_some()
    }

    /// Genres as a JSON array string for the `genres` column.
    #[must_use]
    pub fn genres_json(&self) -> Option<String> {
        if self.genres.is_empty() {
            None
        } else {
            serde_json::to_string(&self.genres).ok()
        }
    }
}

static NAME_DECORATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"v\d+(\.\d+)*|\[.*?\]|\(.*?\)").expect("valid regex"));

/// Strip version tags and bracketed decorations from a forum topic title
/// before using it as a store search term.
#[must_use]
pub fn clean_search_name(name: &str) -> String {
    let cleaned = NAME_DECORATION_RE.replace_all(name, "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Look up metadata for a game name: Steam first, IGDB as fallback.
/// Best-effort; failures are logged and produce an empty result.
///
/// `igdb` is the process-wide client (None when no credentials are
/// configured); it must be long-lived so its OAuth token cache is effective
/// across lookups.
pub async fn lookup(
    client: &reqwest::Client,
    config: &Config,
    igdb: Option<&igdb::IgdbClient>,
    name: &str,
) -> StoreMetadata {
    let term = clean_search_name(name);
    if term.is_empty() {
        return StoreMetadata::default();
    }

    match steam::search(client, &config.steam_api_base, &term).await {
        Ok(Some(metadata)) => {
            debug!(term = %term, "Steam metadata found");
            return metadata;
        }
        Ok(None) => debug!(term = %term, "No Steam results"),
        Err(e) => warn!(term = %term, "Steam lookup failed: {e:#}"),
    }

    if let Some(igdb) = igdb {
        match igdb.search(&term).await {
            Ok(Some(metadata)) => {
                debug!(term = %term, "IGDB metadata found");
                return metadata;
            }
            Ok(None) => debug!(term = %term, "No IGDB results"),
            Err(e) => warn!(term = %term, "IGDB lookup failed: {e:#}"),
        }
    }

    StoreMetadata::default()
}
