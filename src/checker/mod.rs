//! Check orchestration: runs the fetch/classify/persist cycle per topic.

pub mod classifier;

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::{self, Database, TrackedTopic};
use crate::forum::TopicFetcher;
use crate::scoring::Scorer;

use classifier::{classify, CheckInput, CheckOutcome};

/// Per-topic check serialization.
///
/// A manual check from the web API must never overlap the sweep's check of
/// the same topic: the later writer would classify against a stale pointer
/// snapshot and could report an already-surfaced update a second time.
/// Checks for different topics do not block each other.
#[derive(Debug, Clone, Default)]
pub struct CheckLocks {
    inner: Arc<StdMutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl CheckLocks {
    /// Take the check lock for one topic, waiting out any check already in
    /// flight for it.
    pub async fn acquire(&self, topic_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(topic_id).or_default())
        };
        lock.lock_owned().await
    }
}

/// Check one topic: fetch the final page, classify, persist, return the
/// updated row. Returns `Ok(None)` when the topic no longer exists.
///
/// The whole fetch/classify/persist cycle runs under the topic's check lock,
/// and the row is re-read after the lock is held, so a check that queued
/// behind another classifies against the pointers that check just persisted.
///
/// Fetch failures never propagate as faults; they land in the `error` status
/// with the fetcher's diagnosis as the note.
///
/// # Errors
///
/// Returns an error only when the database itself fails.
pub async fn check_topic(
    db: &Database,
    fetcher: &dyn TopicFetcher,
    scorer: &Scorer,
    locks: &CheckLocks,
    topic_id: i64,
) -> Result<Option<TrackedTopic>> {
    let _guard = locks.acquire(topic_id).await;

    let Some(topic) = db::get_topic(db.pool(), topic_id).await? else {
        return Ok(None);
    };

    let outcome = run_check(fetcher, scorer, &topic).await;

    info!(
        topic = %topic.name,
        status = outcome.status.as_str(),
        note = %outcome.note,
        "Check complete"
    );

    db::update_check_result(db.pool(), topic_id, &outcome).await?;

    db::get_topic(db.pool(), topic_id).await
}

/// Fetch and classify without touching the database.
async fn run_check(
    fetcher: &dyn TopicFetcher,
    scorer: &Scorer,
    topic: &TrackedTopic,
) -> CheckOutcome {
    let input_pointers = CheckInput {
        posts: &[],
        last_seen_ref: topic.last_seen_post_ref.as_deref(),
        last_known_update_ref: topic.last_known_update_ref.as_deref(),
    };

    match fetcher.fetch_rendered_posts(&topic.url).await {
        Ok(posts) => classify(
            scorer,
            &CheckInput {
                posts: &posts,
                ..input_pointers
            },
        ),
        Err(e) => {
            warn!(topic = %topic.name, url = %topic.url, "Fetch failed: {e}");
            CheckOutcome::error(&input_pointers, e.to_string())
        }
    }
}

/// Run the periodic check loop forever.
///
/// Topics are checked strictly one at a time with a randomized pause between
/// them. That pacing is a courtesy to the remote forum, not a correctness
/// requirement; the scorer and classifier are pure and safe to run
/// concurrently for different topics.
pub async fn check_loop(
    config: Config,
    db: Database,
    fetcher: impl TopicFetcher,
    scorer: Scorer,
    locks: CheckLocks,
) {
    loop {
        match db::list_topics(db.pool()).await {
            Ok(topics) => {
                let count = topics.len();
                info!(topics = count, "Starting check sweep");

                for topic in topics {
                    match check_topic(&db, &fetcher, &scorer, &locks, topic.id).await {
                        Ok(Some(_)) => {}
                        Ok(None) => debug!(topic = %topic.name, "Topic removed before check"),
                        Err(e) => error!(topic = %topic.name, "Check failed: {e:#}"),
                    }
                    tokio::time::sleep(inter_check_delay(&config)).await;
                }

                info!(topics = count, "Check sweep complete");
            }
            Err(e) => {
                error!("Failed to list topics: {e:#}");
            }
        }

        tokio::time::sleep(config.check_interval).await;
    }
}

/// Randomized pause between topic checks.
fn inter_check_delay(config: &Config) -> Duration {
    let ms = if config.check_delay_max_ms > config.check_delay_min_ms {
        rand::thread_rng().gen_range(config.check_delay_min_ms..=config.check_delay_max_ms)
    } else {
        config.check_delay_min_ms
    };
    Duration::from_millis(ms)
}
