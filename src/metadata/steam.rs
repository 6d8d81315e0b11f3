//! Steam storefront lookups via the public store JSON endpoints.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::StoreMetadata;

#[derive(Debug, Deserialize)]
struct StoreSearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    items: Vec<StoreSearchItem>,
}

#[derive(Debug, Deserialize)]
struct StoreSearchItem {
    id: u64,
    name: String,
    tiny_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppDetailsEntry {
    success: bool,
    data: Option<AppDetailsData>,
}

#[derive(Debug, Deserialize)]
struct AppDetailsData {
    name: String,
    header_image: Option<String>,
    short_description: Option<String>,
    #[serde(default)]
    genres: Vec<AppGenre>,
}

#[derive(Debug, Deserialize)]
struct AppGenre {
    description: String,
}

/// Search the storefront for a game and resolve full details for the first
/// hit. Returns `None` when the search matches nothing.
///
/// # Errors
///
/// Returns an error if a request fails or a response cannot be decoded.
pub async fn search(
    client: &reqwest::Client,
    api_base: &str,
    term: &str,
) -> Result<Option<StoreMetadata>> {
    let url = format!(
        "{api_base}/api/storesearch/?term={}&l=english&cc=US",
        urlencoding::encode(term)
    );
    let response: StoreSearchResponse = client
        .get(&url)
        .send()
        .await
        .context("Steam store search request failed")?
        .error_for_status()
        .context("Steam store search returned an error status")?
        .json()
        .await
        .context("Failed to decode Steam store search response")?;

    if response.total == 0 || response.items.is_empty() {
        return Ok(None);
    }

    let item = &response.items[0];

    // The search endpoint only carries a name and a tiny image; details give
    // the header image, description, and genres. Fall back to the search
    // fields when details are unavailable for the app.
    match app_details(client, api_base, item.id).await {
        Ok(Some(details)) => Ok(Some(details)),
        Ok(None) => Ok(Some(StoreMetadata {
            name: Some(item.name.clone()),
            image_url: item.tiny_image.clone(),
            steam_app_id: Some(item.id.to_string()),
            ..StoreMetadata::default()
        })),
        Err(e) => {
            tracing::debug!(app_id = item.id, "App details lookup failed: {e:#}");
            Ok(Some(StoreMetadata {
                name: Some(item.name.clone()),
                image_url: item.tiny_image.clone(),
                steam_app_id: Some(item.id.to_string()),
                ..StoreMetadata::default()
            }))
        }
    }
}

/// Fetch full details for a known app id. Returns `None` when the store has
/// no successful entry for the app.
///
/// # Errors
///
/// Returns an error if the request fails or the response cannot be decoded.
pub async fn app_details(
    client: &reqwest::Client,
    api_base: &str,
    app_id: u64,
) -> Result<Option<StoreMetadata>> {
    let url = format!("{api_base}/api/appdetails?appids={app_id}");
    // The response is keyed by the app id: {"12345": {"success": true, ...}}
    let response: HashMap<String, AppDetailsEntry> = client
        .get(&url)
        .send()
        .await
        .context("Steam app details request failed")?
        .error_for_status()
        .context("Steam app details returned an error status")?
        .json()
        .await
        .context("Failed to decode Steam app details response")?;

    let Some(entry) = response.get(&app_id.to_string()) else {
        return Ok(None);
    };
    if !entry.success {
        return Ok(None);
    }
    let Some(data) = &entry.data else {
        return Ok(None);
    };

    Ok(Some(StoreMetadata {
        name: Some(data.name.clone()),
        image_url: data.header_image.clone(),
        description: data.short_description.clone(),
        genres: data.genres.iter().map(|g| g.description.clone()).collect(),
        steam_app_id: Some(app_id.to_string()),
    }))
}
