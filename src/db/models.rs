use serde::{Deserialize, Serialize};

use crate::checker::classifier::TopicStatus;

/// A tracked forum topic, one per game.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrackedTopic {
    pub id: i64,
    pub name: String,
    /// Canonical topic URL (normalized to host + path + topic id).
    pub url: String,
    /// Current status string; always derived by the classifier, never set
    /// ad hoc (`checking` excepted, which the web layer writes while a
    /// manual check runs).
    pub status: String,
    /// Ref of the newest post observed on the previous successful check.
    pub last_seen_post_ref: Option<String>,
    /// Ref of the newest post previously classified as a genuine update.
    /// Distinct from the read cursor: tracks the last qualifying post only.
    pub last_known_update_ref: Option<String>,
    // Debug fields from the latest check, for diagnosing false negatives.
    pub latest_post_ref: Option<String>,
    pub latest_post_text: Option<String>,
    pub update_post_ref: Option<String>,
    pub update_post_text: Option<String>,
    pub check_note: Option<String>,
    // Store metadata.
    pub image_url: Option<String>,
    pub description: Option<String>,
    /// JSON array of genre names.
    pub genres: Option<String>,
    pub steam_app_id: Option<String>,
    pub last_checked_at: Option<String>,
    /// Set when a check yields `update-available`.
    pub last_updated_at: Option<String>,
    pub created_at: String,
}

impl TrackedTopic {
    #[must_use]
    pub fn status_enum(&self) -> Option<TopicStatus> {
        TopicStatus::from_str(&self.status)
    }
}

/// Data for inserting a new tracked topic.
#[derive(Debug, Clone, Default)]
pub struct NewTopic {
    pub name: String,
    pub url: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub genres: Option<String>,
    pub steam_app_id: Option<String>,
}
