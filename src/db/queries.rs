use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::checker::classifier::{CheckOutcome, TopicStatus};

use super::models::{NewTopic, TrackedTopic};

// ========== Topics ==========

/// Insert a new tracked topic, returning its ID.
pub async fn insert_topic(pool: &SqlitePool, topic: &NewTopic) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO topics (name, url, image_url, description, genres, steam_app_id)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(&topic.name)
    .bind(&topic.url)
    .bind(&topic.image_url)
    .bind(&topic.description)
    .bind(&topic.genres)
    .bind(&topic.steam_app_id)
    .execute(pool)
    .await
    .context("Failed to insert topic")?;

    Ok(result.last_insert_rowid())
}

/// Get a topic by ID.
pub async fn get_topic(pool: &SqlitePool, id: i64) -> Result<Option<TrackedTopic>> {
    sqlx::query_as("SELECT * FROM topics WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch topic")
}

/// Get a topic by its canonical URL.
pub async fn get_topic_by_url(pool: &SqlitePool, url: &str) -> Result<Option<TrackedTopic>> {
    sqlx::query_as("SELECT * FROM topics WHERE url = ?")
        .bind(url)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch topic by url")
}

/// List all tracked topics, oldest first.
pub async fn list_topics(pool: &SqlitePool) -> Result<Vec<TrackedTopic>> {
    sqlx::query_as("SELECT * FROM topics ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list topics")
}

/// Delete a topic. Returns whether a row was removed.
pub async fn delete_topic(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM topics WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete topic")?;

    Ok(result.rows_affected() > 0)
}

/// Set a topic's status directly. Reserved for the transient `checking`
/// marker; every other status comes from a [`CheckOutcome`].
pub async fn set_status(pool: &SqlitePool, id: i64, status: TopicStatus) -> Result<()> {
    sqlx::query("UPDATE topics SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set topic status")?;

    Ok(())
}

/// Apply a check outcome to a topic.
///
/// `last_known_update_ref` only ever advances: the COALESCE keeps the stored
/// pointer when the outcome carries none, and the classifier never reports a
/// post older than the one it previously reported.
pub async fn update_check_result(
    pool: &SqlitePool,
    id: i64,
    outcome: &CheckOutcome,
) -> Result<()> {
    sqlx::query(
        r"
        UPDATE topics
        SET status = ?,
            last_seen_post_ref = COALESCE(?, last_seen_post_ref),
            last_known_update_ref = COALESCE(?, last_known_update_ref),
            latest_post_ref = ?,
            latest_post_text = ?,
            update_post_ref = ?,
            update_post_text = ?,
            check_note = ?,
            last_checked_at = datetime('now'),
            last_updated_at = CASE WHEN ? THEN datetime('now') ELSE last_updated_at END
        WHERE id = ?
        ",
    )
    .bind(outcome.status.as_str())
    .bind(&outcome.last_seen_ref)
    .bind(&outcome.last_known_update_ref)
    .bind(&outcome.latest_post_ref)
    .bind(&outcome.latest_post_text)
    .bind(&outcome.update_post_ref)
    .bind(&outcome.update_post_text)
    .bind(&outcome.note)
    .bind(outcome.status == TopicStatus::UpdateAvailable)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to apply check result")?;

    Ok(())
}

/// Update a topic's store metadata fields.
pub async fn update_metadata(
    pool: &SqlitePool,
    id: i64,
    name: Option<&str>,
    image_url: Option<&str>,
    description: Option<&str>,
    genres: Option<&str>,
    steam_app_id: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r"
        UPDATE topics
        SET name = COALESCE(?, name),
            image_url = COALESCE(?, image_url),
            description = COALESCE(?, description),
            genres = COALESCE(?, genres),
            steam_app_id = COALESCE(?, steam_app_id)
        WHERE id = ?
        ",
    )
    .bind(name)
    .bind(image_url)
    .bind(description)
    .bind(genres)
    .bind(steam_app_id)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update topic metadata")?;

    Ok(())
}
