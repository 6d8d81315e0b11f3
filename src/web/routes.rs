use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::checker;
use crate::checker::classifier::TopicStatus;
use crate::db::{
    delete_topic, get_topic, get_topic_by_url, insert_topic, list_topics, set_status,
    update_metadata, NewTopic,
};
use crate::forum::normalize_topic_url;
use crate::metadata;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/topics", get(topics_index).post(topics_create))
        .route("/api/topics/:id", get(topics_show).delete(topics_delete))
        .route("/api/topics/:id/check", post(topics_check))
}

async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

async fn topics_index(State(state): State<AppState>) -> Response {
    match list_topics(state.db.pool()).await {
        Ok(topics) => Json(topics).into_response(),
        Err(e) => {
            tracing::error!("Failed to list topics: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}

async fn topics_show(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match get_topic(state.db.pool(), id).await {
        Ok(Some(topic)) => Json(topic).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Topic not found").into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch topic: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTopic {
    pub url: String,
    pub name: Option<String>,
}

async fn topics_create(
    State(state): State<AppState>,
    Json(body): Json<CreateTopic>,
) -> Response {
    let url = match normalize_topic_url(&body.url, &state.config.forum_host) {
        Ok(url) => url,
        Err(e) => {
            return (StatusCode::UNPROCESSABLE_ENTITY, format!("Invalid topic URL: {e}"))
                .into_response();
        }
    };

    match get_topic_by_url(state.db.pool(), &url).await {
        Ok(Some(_)) => {
            return (StatusCode::CONFLICT, "Topic is already tracked").into_response();
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Failed to check for duplicate topic: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    }

    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(|| "New topic".to_string(), ToString::to_string);

    let new_topic = NewTopic {
        name: name.clone(),
        url,
        ..NewTopic::default()
    };
    let id = match insert_topic(state.db.pool(), &new_topic).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to insert topic: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    // Best-effort store metadata; a failed lookup never fails the create.
    let store = metadata::lookup(&state.http, &state.config, state.igdb.as_deref(), &name).await;
    if store.has_content() {
        if let Err(e) = update_metadata(
            state.db.pool(),
            id,
            store.name.as_deref(),
            store.image_url.as_deref(),
            store.description.as_deref(),
            store.genres_json().as_deref(),
            store.steam_app_id.as_deref(),
        )
        .await
        {
            tracing::warn!("Failed to store topic metadata: {e:#}");
        }
    }

    match get_topic(state.db.pool(), id).await {
        Ok(Some(topic)) => (StatusCode::CREATED, Json(topic)).into_response(),
        Ok(None) => (StatusCode::INTERNAL_SERVER_ERROR, "Topic vanished").into_response(),
        Err(e) => {
            tracing::error!("Failed to reload topic: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}

async fn topics_delete(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match delete_topic(state.db.pool(), id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Topic not found").into_response(),
        Err(e) => {
            tracing::error!("Failed to delete topic: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}

/// Run a check for one topic inline and return the updated row.
async fn topics_check(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let topic = match get_topic(state.db.pool(), id).await {
        Ok(Some(topic)) => topic,
        Ok(None) => return (StatusCode::NOT_FOUND, "Topic not found").into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch topic: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    // Transient UI marker while the check runs; the classifier's outcome
    // overwrites it.
    if let Err(e) = set_status(state.db.pool(), id, TopicStatus::Checking).await {
        tracing::warn!("Failed to mark topic as checking: {e:#}");
    }

    match checker::check_topic(
        &state.db,
        state.fetcher.as_ref(),
        &state.scorer,
        &state.check_locks,
        id,
    )
    .await
    {
        Ok(Some(updated)) => Json(updated).into_response(),
        // Deleted while the check was queued or running.
        Ok(None) => (StatusCode::NOT_FOUND, "Topic not found").into_response(),
        Err(e) => {
            tracing::error!("Check failed: {e:#}");
            // Put the previous status back so a failed check is not left
            // showing `checking` until the next sweep.
            if let Some(prev) = topic.status_enum() {
                if let Err(e) = set_status(state.db.pool(), id, prev).await {
                    tracing::warn!("Failed to restore topic status: {e:#}");
                }
            }
            (StatusCode::INTERNAL_SERVER_ERROR, "Check failed").into_response()
        }
    }
}
