//! The update classifier: a pure state machine over one check's scrape.
//!
//! Given the ordered post list from the final page of a topic and the two
//! persisted pointers, it derives exactly one status per check. The two
//! pointers serve different purposes: `last_seen_ref` is the read cursor and
//! advances on every check that sees content; `last_known_update_ref` marks
//! the last post that qualified as a genuine update, so the same update is
//! surfaced at most once across repeated checks.

use crate::forum::ScrapedPost;
use crate::scoring::Scorer;

/// Topic status derived by the classifier.
///
/// `Checking` is a caller-side transient written by the web layer while a
/// manual check is in flight; the classifier never emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopicStatus {
    UpToDate,
    UpdateAvailable,
    NewActivity,
    Error,
    Checking,
}

impl TopicStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpToDate => "up-to-date",
            Self::UpdateAvailable => "update-available",
            Self::NewActivity => "new-activity",
            Self::Error => "error",
            Self::Checking => "checking",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "up-to-date" => Some(Self::UpToDate),
            "update-available" => Some(Self::UpdateAvailable),
            "new-activity" => Some(Self::NewActivity),
            "error" => Some(Self::Error),
            "checking" => Some(Self::Checking),
            _ => None,
        }
    }
}

/// Input to one classification: the scrape plus the persisted pointers.
#[derive(Debug, Clone, Copy)]
pub struct CheckInput<'a> {
    /// Posts from the final page of the thread, oldest to newest.
    pub posts: &'a [ScrapedPost],
    /// Ref of the newest post observed on the previous successful check.
    pub last_seen_ref: Option<&'a str>,
    /// Ref of the newest post previously classified as a genuine update.
    pub last_known_update_ref: Option<&'a str>,
}

/// Result of one classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub status: TopicStatus,
    /// Advanced read cursor.
    pub last_seen_ref: Option<String>,
    /// Advanced update pointer (unchanged unless a new update was found).
    pub last_known_update_ref: Option<String>,
    /// Debug: ref and snippet of the newest post on the page.
    pub latest_post_ref: Option<String>,
    pub latest_post_text: Option<String>,
    /// Debug: ref and snippet of the evidence post, when one qualified.
    pub update_post_ref: Option<String>,
    pub update_post_text: Option<String>,
    /// Short human-readable explanation of the decision.
    pub note: String,
}

impl CheckOutcome {
    /// Error outcome that leaves both pointers untouched.
    #[must_use]
    pub fn error(input: &CheckInput<'_>, note: impl Into<String>) -> Self {
        Self {
            status: TopicStatus::Error,
            last_seen_ref: input.last_seen_ref.map(ToString::to_string),
            last_known_update_ref: input.last_known_update_ref.map(ToString::to_string),
            latest_post_ref: None,
            latest_post_text: None,
            update_post_ref: None,
            update_post_text: None,
            note: note.into(),
        }
    }
}

/// Classify one check. Pure and infallible: every abnormal condition resolves
/// to a status plus note, never a panic or an error.
#[must_use]
pub fn classify(scorer: &Scorer, input: &CheckInput<'_>) -> CheckOutcome {
    let Some(latest) = input.posts.last() else {
        // A fetch that produced zero posts is an upstream failure; the caller
        // usually substitutes a more specific diagnosis for this note.
        return CheckOutcome::error(input, "no posts extracted from page");
    };

    let latest_ref = latest.post_ref.clone();
    let latest_text = latest.plain_text.clone();

    // Read cursor unchanged: nothing new since the last check.
    if input.last_seen_ref == Some(latest_ref.as_str()) {
        return CheckOutcome {
            status: TopicStatus::UpToDate,
            last_seen_ref: input.last_seen_ref.map(ToString::to_string),
            last_known_update_ref: input.last_known_update_ref.map(ToString::to_string),
            latest_post_ref: Some(latest_ref),
            latest_post_text: Some(latest_text),
            update_post_ref: None,
            update_post_text: None,
            note: "no new posts since last check".to_string(),
        };
    }

    // New content exists. Scan newest-first for the first qualifying post;
    // only the most recent qualifying post is ever reported, even if several
    // qualify in the same batch.
    for post in input.posts.iter().rev() {
        let score = scorer.score(&post.raw_content, &post.plain_text);
        if !scorer.is_update_evidence(score) {
            continue;
        }

        // This exact update was already surfaced on a prior check: advance
        // the read cursor but do not notify again.
        if input.last_known_update_ref == Some(post.post_ref.as_str()) {
            return CheckOutcome {
                status: TopicStatus::UpToDate,
                last_seen_ref: Some(latest_ref.clone()),
                last_known_update_ref: input.last_known_update_ref.map(ToString::to_string),
                latest_post_ref: Some(latest_ref),
                latest_post_text: Some(latest_text),
                update_post_ref: Some(post.post_ref.clone()),
                update_post_text: Some(post.plain_text.clone()),
                note: format!("update already seen, score {score} ({})", post.post_ref),
            };
        }

        return CheckOutcome {
            status: TopicStatus::UpdateAvailable,
            last_seen_ref: Some(latest_ref.clone()),
            last_known_update_ref: Some(post.post_ref.clone()),
            latest_post_ref: Some(latest_ref),
            latest_post_text: Some(latest_text),
            update_post_ref: Some(post.post_ref.clone()),
            update_post_text: Some(post.plain_text.clone()),
            note: format!("update found, score {score} ({})", post.post_ref),
        };
    }

    // Something changed, but nothing scored as a verified update.
    CheckOutcome {
        status: TopicStatus::NewActivity,
        last_seen_ref: Some(latest_ref.clone()),
        last_known_update_ref: input.last_known_update_ref.map(ToString::to_string),
        latest_post_ref: Some(latest_ref),
        latest_post_text: Some(latest_text),
        update_post_ref: None,
        update_post_text: None,
        note: "new activity found, no verified update".to_string(),
    }
}
