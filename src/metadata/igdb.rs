//! IGDB lookups via the Twitch client-credentials OAuth flow.
//!
//! Used as a fallback when the Steam storefront has no match (common for
//! delisted or niche titles). The OAuth token is cached in-process and
//! refreshed shortly before expiry.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::StoreMetadata;
use crate::config::Config;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct IgdbGame {
    name: String,
    summary: Option<String>,
    cover: Option<IgdbCover>,
    #[serde(default)]
    genres: Vec<IgdbGenre>,
}

#[derive(Debug, Deserialize)]
struct IgdbCover {
    url: String,
}

#[derive(Debug, Deserialize)]
struct IgdbGenre {
    name: String,
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// IGDB API client with token caching.
#[derive(Debug)]
pub struct IgdbClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    oauth_base: String,
    api_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl IgdbClient {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        client_id: String,
        client_secret: String,
        oauth_base: String,
        api_base: String,
    ) -> Self {
        Self {
            client,
            client_id,
            client_secret,
            oauth_base,
            api_base,
            token: Mutex::new(None),
        }
    }

    /// Build the process-wide client, or `None` when credentials are not
    /// configured. One instance should live for the whole process so the
    /// token cache is shared across lookups.
    #[must_use]
    pub fn from_config(client: reqwest::Client, config: &Config) -> Option<Self> {
        let client_id = config.igdb_client_id.clone()?;
        let client_secret = config.igdb_client_secret.clone()?;
        Some(Self::new(
            client,
            client_id,
            client_secret,
            config.twitch_oauth_base.clone(),
            config.igdb_api_base.clone(),
        ))
    }

    /// Search IGDB for a game. Returns `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the query fails.
    pub async fn search(&self, term: &str) -> Result<Option<StoreMetadata>> {
        let token = self.access_token().await?;

        // Apicalypse query body; quotes inside the term would break out of
        // the string literal, so strip them.
        let sanitized = term.replace('"', "");
        let body = format!(
            "search \"{sanitized}\"; fields name,summary,cover.url,genres.name; limit 1;"
        );

        let games: Vec<IgdbGame> = self
            .client
            .post(format!("{}/v4/games", self.api_base))
            .header("Client-ID", &self.client_id)
            .bearer_auth(&token)
            .body(body)
            .send()
            .await
            .context("IGDB query failed")?
            .error_for_status()
            .context("IGDB returned an error status")?
            .json()
            .await
            .context("Failed to decode IGDB response")?;

        let Some(game) = games.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(StoreMetadata {
            name: Some(game.name),
            image_url: game.cover.map(|c| upgrade_cover_url(&c.url)),
            description: game.summary,
            genres: game.genres.into_iter().map(|g| g.name).collect(),
            steam_app_id: None,
        }))
    }

    /// Get a valid access token, refreshing through the client-credentials
    /// flow when the cached one is missing or near expiry.
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;

        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let url = format!(
            "{}/oauth2/token?client_id={}&client_secret={}&grant_type=client_credentials",
            self.oauth_base,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.client_secret)
        );

        let response: TokenResponse = self
            .client
            .post(&url)
            .send()
            .await
            .context("Twitch OAuth token request failed")?
            .error_for_status()
            .context("Twitch OAuth returned an error status")?
            .json()
            .await
            .context("Failed to decode Twitch OAuth response")?;

        // Refresh a minute early rather than racing the expiry.
        let lifetime = Duration::from_secs(response.expires_in.saturating_sub(60));
        *guard = Some(CachedToken {
            access_token: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(response.access_token)
    }
}

/// IGDB cover URLs come back as protocol-relative thumbnails; upgrade them to
/// an https cover-sized image.
fn upgrade_cover_url(url: &str) -> String {
    let sized = url.replace("t_thumb", "t_cover_big");
    if let Some(rest) = sized.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        sized
    }
}
