//! Integration tests for database operations.

use rin_update_tracker::checker::classifier::{CheckOutcome, TopicStatus};
use rin_update_tracker::db::{
    delete_topic, get_topic, get_topic_by_url, insert_topic, list_topics, set_status,
    update_check_result, update_metadata, Database, NewTopic,
};
use tempfile::TempDir;

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

fn sample_topic(url: &str) -> NewTopic {
    NewTopic {
        name: "Test Game".to_string(),
        url: url.to_string(),
        ..NewTopic::default()
    }
}

#[tokio::test]
async fn test_insert_and_get_topic() {
    let (db, _temp_dir) = setup_db().await;

    let id = insert_topic(
        db.pool(),
        &sample_topic("https://cs.rin.ru/forum/viewtopic.php?t=1"),
    )
    .await
    .expect("Failed to insert topic");
    assert!(id > 0);

    let topic = get_topic(db.pool(), id)
        .await
        .expect("Failed to get topic")
        .expect("Topic not found");

    assert_eq!(topic.name, "Test Game");
    assert_eq!(topic.status, "up-to-date");
    assert_eq!(topic.last_seen_post_ref, None);
    assert_eq!(topic.last_known_update_ref, None);

    let by_url = get_topic_by_url(db.pool(), "https://cs.rin.ru/forum/viewtopic.php?t=1")
        .await
        .expect("Failed to get topic by url");
    assert!(by_url.is_some());
}

#[tokio::test]
async fn test_duplicate_url_rejected() {
    let (db, _temp_dir) = setup_db().await;
    let topic = sample_topic("https://cs.rin.ru/forum/viewtopic.php?t=2");

    insert_topic(db.pool(), &topic).await.expect("First insert");
    assert!(insert_topic(db.pool(), &topic).await.is_err());
}

#[tokio::test]
async fn test_list_and_delete_topics() {
    let (db, _temp_dir) = setup_db().await;

    let id1 = insert_topic(
        db.pool(),
        &sample_topic("https://cs.rin.ru/forum/viewtopic.php?t=10"),
    )
    .await
    .unwrap();
    insert_topic(
        db.pool(),
        &sample_topic("https://cs.rin.ru/forum/viewtopic.php?t=11"),
    )
    .await
    .unwrap();

    let topics = list_topics(db.pool()).await.unwrap();
    assert_eq!(topics.len(), 2);

    assert!(delete_topic(db.pool(), id1).await.unwrap());
    assert!(!delete_topic(db.pool(), id1).await.unwrap());
    assert_eq!(list_topics(db.pool()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_check_result_applies_outcome() {
    let (db, _temp_dir) = setup_db().await;
    let id = insert_topic(
        db.pool(),
        &sample_topic("https://cs.rin.ru/forum/viewtopic.php?t=3"),
    )
    .await
    .unwrap();

    let outcome = CheckOutcome {
        status: TopicStatus::UpdateAvailable,
        last_seen_ref: Some("p9".to_string()),
        last_known_update_ref: Some("p7".to_string()),
        latest_post_ref: Some("p9".to_string()),
        latest_post_text: Some("latest text".to_string()),
        update_post_ref: Some("p7".to_string()),
        update_post_text: Some("update text".to_string()),
        note: "update found, score 45 (p7)".to_string(),
    };

    update_check_result(db.pool(), id, &outcome).await.unwrap();

    let topic = get_topic(db.pool(), id).await.unwrap().unwrap();
    assert_eq!(topic.status, "update-available");
    assert_eq!(topic.status_enum(), Some(TopicStatus::UpdateAvailable));
    assert_eq!(topic.last_seen_post_ref.as_deref(), Some("p9"));
    assert_eq!(topic.last_known_update_ref.as_deref(), Some("p7"));
    assert_eq!(topic.update_post_text.as_deref(), Some("update text"));
    assert!(topic.check_note.as_deref().unwrap().contains("score 45"));
    assert!(topic.last_checked_at.is_some());
    assert!(topic.last_updated_at.is_some());
}

#[tokio::test]
async fn test_update_check_result_keeps_pointers_on_error() {
    let (db, _temp_dir) = setup_db().await;
    let id = insert_topic(
        db.pool(),
        &sample_topic("https://cs.rin.ru/forum/viewtopic.php?t=4"),
    )
    .await
    .unwrap();

    let good = CheckOutcome {
        status: TopicStatus::UpdateAvailable,
        last_seen_ref: Some("p5".to_string()),
        last_known_update_ref: Some("p5".to_string()),
        latest_post_ref: Some("p5".to_string()),
        latest_post_text: None,
        update_post_ref: Some("p5".to_string()),
        update_post_text: None,
        note: "update found".to_string(),
    };
    update_check_result(db.pool(), id, &good).await.unwrap();

    // An error outcome carrying no new pointers must not clear the old ones.
    let failed = CheckOutcome {
        status: TopicStatus::Error,
        last_seen_ref: None,
        last_known_update_ref: None,
        latest_post_ref: None,
        latest_post_text: None,
        update_post_ref: None,
        update_post_text: None,
        note: "blocked by anti-bot challenge".to_string(),
    };
    update_check_result(db.pool(), id, &failed).await.unwrap();

    let topic = get_topic(db.pool(), id).await.unwrap().unwrap();
    assert_eq!(topic.status, "error");
    assert_eq!(topic.last_seen_post_ref.as_deref(), Some("p5"));
    assert_eq!(topic.last_known_update_ref.as_deref(), Some("p5"));
    assert_eq!(
        topic.check_note.as_deref(),
        Some("blocked by anti-bot challenge")
    );
}

#[tokio::test]
async fn test_last_updated_at_only_set_on_update() {
    let (db, _temp_dir) = setup_db().await;
    let id = insert_topic(
        db.pool(),
        &sample_topic("https://cs.rin.ru/forum/viewtopic.php?t=5"),
    )
    .await
    .unwrap();

    let activity = CheckOutcome {
        status: TopicStatus::NewActivity,
        last_seen_ref: Some("p2".to_string()),
        last_known_update_ref: None,
        latest_post_ref: Some("p2".to_string()),
        latest_post_text: Some("chatter".to_string()),
        update_post_ref: None,
        update_post_text: None,
        note: "new activity found, no verified update".to_string(),
    };
    update_check_result(db.pool(), id, &activity).await.unwrap();

    let topic = get_topic(db.pool(), id).await.unwrap().unwrap();
    assert_eq!(topic.status, "new-activity");
    assert!(topic.last_checked_at.is_some());
    assert_eq!(topic.last_updated_at, None);
}

#[tokio::test]
async fn test_set_status_checking() {
    let (db, _temp_dir) = setup_db().await;
    let id = insert_topic(
        db.pool(),
        &sample_topic("https://cs.rin.ru/forum/viewtopic.php?t=6"),
    )
    .await
    .unwrap();

    set_status(db.pool(), id, TopicStatus::Checking)
        .await
        .unwrap();
    let topic = get_topic(db.pool(), id).await.unwrap().unwrap();
    assert_eq!(topic.status, "checking");
}

#[tokio::test]
async fn test_update_metadata_coalesces() {
    let (db, _temp_dir) = setup_db().await;
    let id = insert_topic(
        db.pool(),
        &sample_topic("https://cs.rin.ru/forum/viewtopic.php?t=7"),
    )
    .await
    .unwrap();

    update_metadata(
        db.pool(),
        id,
        Some("Official Name"),
        Some("https://img.example/header.jpg"),
        Some("A fine game"),
        Some(r#"["RPG"]"#),
        Some("440"),
    )
    .await
    .unwrap();

    // A later partial update keeps existing fields.
    update_metadata(db.pool(), id, None, None, Some("New description"), None, None)
        .await
        .unwrap();

    let topic = get_topic(db.pool(), id).await.unwrap().unwrap();
    assert_eq!(topic.name, "Official Name");
    assert_eq!(topic.image_url.as_deref(), Some("https://img.example/header.jpg"));
    assert_eq!(topic.description.as_deref(), Some("New description"));
    assert_eq!(topic.steam_app_id.as_deref(), Some("440"));
}
