//! Management API tests driving the router directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use rin_update_tracker::checker::CheckLocks;
use rin_update_tracker::config::Config;
use rin_update_tracker::db::{delete_topic, get_topic, Database, TrackedTopic};
use rin_update_tracker::forum::{FetchError, ScrapedPost, TopicFetcher};
use rin_update_tracker::metadata::igdb::IgdbClient;
use rin_update_tracker::scoring::Scorer;
use rin_update_tracker::web::{create_app, AppState};
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fetcher returning canned posts, or a canned failure.
struct StubFetcher {
    posts: Vec<ScrapedPost>,
    fail: bool,
}

impl StubFetcher {
    fn with_update_post() -> Self {
        Self {
            posts: vec![ScrapedPost {
                post_ref: "p42".to_string(),
                raw_content:
                    "<a href=\"https://pixeldrain.com/u/abc\">mirror</a> Update v2 repack".to_string(),
                plain_text: "Update v2 repack uploaded, includes all previous fixes and DLC".to_string(),
            }],
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            posts: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl TopicFetcher for StubFetcher {
    async fn fetch_rendered_posts(&self, _topic_url: &str) -> Result<Vec<ScrapedPost>, FetchError> {
        if self.fail {
            return Err(FetchError::AntiBotBlock);
        }
        Ok(self.posts.clone())
    }
}

/// App with a stub fetcher and a wiremock Steam storefront.
async fn setup_app(
    fetcher: StubFetcher,
) -> (axum::Router, Database, TempDir, MockServer, CheckLocks) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("test.sqlite"))
        .await
        .unwrap();

    let steam = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/storesearch/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "total": 0, "items": [] })),
        )
        .mount(&steam)
        .await;

    let mut config = Config::from_env().unwrap();
    config.forum_host = "cs.rin.ru".to_string();
    config.steam_api_base = steam.uri();
    config.igdb_client_id = None;
    config.igdb_client_secret = None;

    let check_locks = CheckLocks::default();
    let state = AppState {
        db: db.clone(),
        config: Arc::new(config),
        fetcher: Arc::new(fetcher),
        scorer: Arc::new(Scorer::default()),
        http: reqwest::Client::new(),
        igdb: None,
        check_locks: check_locks.clone(),
    };

    (create_app(state), db, temp_dir, steam, check_locks)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _db, _tmp, _steam, _locks) = setup_app(StubFetcher::with_update_post()).await;
    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_topic_normalizes_url() {
    let (app, _db, _tmp, _steam, _locks) = setup_app(StubFetcher::with_update_post()).await;

    let response = app
        .oneshot(post_json(
            "/api/topics",
            json!({
                "url": "https://cs.rin.ru/forum/viewtopic.php?f=10&t=12345&sid=abcdef&start=30",
                "name": "Test Game"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let topic: TrackedTopic = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(topic.url, "https://cs.rin.ru/forum/viewtopic.php?t=12345");
    assert_eq!(topic.name, "Test Game");
    assert_eq!(topic.status, "up-to-date");
}

#[tokio::test]
async fn test_create_topic_rejects_foreign_url() {
    let (app, _db, _tmp, _steam, _locks) = setup_app(StubFetcher::with_update_post()).await;

    let response = app
        .oneshot(post_json(
            "/api/topics",
            json!({ "url": "https://example.com/forum/viewtopic.php?t=1" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_create_duplicate_topic_conflicts() {
    let (app, _db, _tmp, _steam, _locks) = setup_app(StubFetcher::with_update_post()).await;
    let body = json!({ "url": "https://cs.rin.ru/forum/viewtopic.php?t=777", "name": "Dup" });

    let first = app
        .clone()
        .oneshot(post_json("/api/topics", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    // Same topic with different volatile parameters still collides.
    let second = app
        .oneshot(post_json(
            "/api/topics",
            json!({ "url": "https://cs.rin.ru/forum/viewtopic.php?t=777&sid=zzz", "name": "Dup" }),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_list_and_delete_topic() {
    let (app, _db, _tmp, _steam, _locks) = setup_app(StubFetcher::with_update_post()).await;

    let created = app
        .clone()
        .oneshot(post_json(
            "/api/topics",
            json!({ "url": "https://cs.rin.ru/forum/viewtopic.php?t=5", "name": "Game" }),
        ))
        .await
        .unwrap();
    let topic: TrackedTopic = serde_json::from_value(body_json(created).await).unwrap();

    let listed = app.clone().oneshot(get("/api/topics")).await.unwrap();
    let topics: Vec<TrackedTopic> = serde_json::from_value(body_json(listed).await).unwrap();
    assert_eq!(topics.len(), 1);

    let deleted = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/topics/{}", topic.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = app
        .oneshot(get(&format!("/api/topics/{}", topic.id)))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_check_reports_update() {
    let (app, _db, _tmp, _steam, _locks) = setup_app(StubFetcher::with_update_post()).await;

    let created = app
        .clone()
        .oneshot(post_json(
            "/api/topics",
            json!({ "url": "https://cs.rin.ru/forum/viewtopic.php?t=9", "name": "Game" }),
        ))
        .await
        .unwrap();
    let topic: TrackedTopic = serde_json::from_value(body_json(created).await).unwrap();

    let checked = app
        .oneshot(post_json(
            &format!("/api/topics/{}/check", topic.id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(checked.status(), StatusCode::OK);

    let updated: TrackedTopic = serde_json::from_value(body_json(checked).await).unwrap();
    assert_eq!(updated.status, "update-available");
    assert_eq!(updated.last_known_update_ref.as_deref(), Some("p42"));
}

#[tokio::test]
async fn test_manual_check_with_failing_fetcher_reports_error() {
    let (app, _db, _tmp, _steam, _locks) = setup_app(StubFetcher::failing()).await;

    let created = app
        .clone()
        .oneshot(post_json(
            "/api/topics",
            json!({ "url": "https://cs.rin.ru/forum/viewtopic.php?t=8", "name": "Game" }),
        ))
        .await
        .unwrap();
    let topic: TrackedTopic = serde_json::from_value(body_json(created).await).unwrap();

    let checked = app
        .oneshot(post_json(
            &format!("/api/topics/{}/check", topic.id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(checked.status(), StatusCode::OK);

    let updated: TrackedTopic = serde_json::from_value(body_json(checked).await).unwrap();
    assert_eq!(updated.status, "error");
    assert!(updated.check_note.unwrap().contains("anti-bot"));
}

#[tokio::test]
async fn test_check_unknown_topic_is_not_found() {
    let (app, _db, _tmp, _steam, _locks) = setup_app(StubFetcher::with_update_post()).await;
    let response = app
        .oneshot(post_json("/api/topics/9999/check", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_check_racing_delete_is_not_left_checking() {
    let (app, db, _tmp, _steam, locks) = setup_app(StubFetcher::with_update_post()).await;

    let created = app
        .clone()
        .oneshot(post_json(
            "/api/topics",
            json!({ "url": "https://cs.rin.ru/forum/viewtopic.php?t=11", "name": "Game" }),
        ))
        .await
        .unwrap();
    let topic: TrackedTopic = serde_json::from_value(body_json(created).await).unwrap();

    // Hold the topic's check lock so the manual check blocks after marking
    // the row as checking.
    let guard = locks.acquire(topic.id).await;

    let pending = tokio::spawn({
        let app = app.clone();
        let uri = format!("/api/topics/{}/check", topic.id);
        async move { app.oneshot(post_json(&uri, json!({}))).await.unwrap() }
    });

    let mut marked = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let row = get_topic(db.pool(), topic.id).await.unwrap().unwrap();
        if row.status == "checking" {
            marked = true;
            break;
        }
    }
    assert!(marked, "manual check never marked the row as checking");

    // The topic disappears while the check is still queued on the lock.
    assert!(delete_topic(db.pool(), topic.id).await.unwrap());
    drop(guard);

    let response = pending.await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(get_topic(db.pool(), topic.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_igdb_token_reused_across_creates() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("test.sqlite"))
        .await
        .unwrap();

    let steam = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/storesearch/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "total": 0, "items": [] })),
        )
        .mount(&steam)
        .await;

    // One OAuth round trip must cover both IGDB fallback lookups.
    let igdb_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&igdb_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v4/games"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&igdb_server)
        .await;

    let mut config = Config::from_env().unwrap();
    config.forum_host = "cs.rin.ru".to_string();
    config.steam_api_base = steam.uri();
    config.igdb_client_id = Some("id".to_string());
    config.igdb_client_secret = Some("secret".to_string());
    config.igdb_api_base = igdb_server.uri();
    config.twitch_oauth_base = igdb_server.uri();

    let http = reqwest::Client::new();
    let igdb = IgdbClient::from_config(http.clone(), &config).map(Arc::new);
    let state = AppState {
        db: db.clone(),
        config: Arc::new(config),
        fetcher: Arc::new(StubFetcher::with_update_post()),
        scorer: Arc::new(Scorer::default()),
        http,
        igdb,
        check_locks: CheckLocks::default(),
    };
    let app = create_app(state);

    for t in [1, 2] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/topics",
                json!({
                    "url": format!("https://cs.rin.ru/forum/viewtopic.php?t={t}"),
                    "name": "Obscure Game"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    // Dropping the mock server verifies the single-token expectation.
}
