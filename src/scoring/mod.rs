//! Post scoring: a fixed weighted-rule system that separates genuine update
//! evidence from chatter.
//!
//! Scoring is deliberately not a learned model. Every rule is a substring
//! check with a fixed weight, so a surprising classification can always be
//! traced to the exact term that caused it.

mod lexicon;

pub use lexicon::Lexicon;

/// Marker for a phpBB code box in rendered post HTML. A post with neither a
/// link nor a code box cannot be update evidence.
const CODE_BOX_MARKER: &str = "class=\"codebox\"";

/// Tokens that flag a short post as a drive-by thank-you.
const GRATITUDE_TOKENS: &[&str] = &["thanks", "thx", "ty"];

/// Tokens that usually precede an archive password.
const PASSWORD_MARKERS: &[&str] = &["pw:", "password:", "pass:"];

/// Bonus and penalty magnitudes, plus the decision threshold.
///
/// All values are empirically chosen weights. The defaults are the tuned
/// production values; they are fields rather than constants so deployments
/// can adjust them without a rebuild.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    /// Known file host present in HTML or text.
    pub host_bonus: i32,
    /// Known scene group or repacker named in the text.
    pub scene_group_bonus: i32,
    /// Release terminology present in the text.
    pub release_term_bonus: i32,
    /// Password marker present in the text.
    pub password_bonus: i32,
    /// Junk/complaint phrase present in the text (subtracted).
    pub junk_penalty: i32,
    /// Short post ending in a question mark (subtracted).
    pub short_question_penalty: i32,
    /// Short thank-you post (subtracted, short-circuits all other rules).
    pub short_thanks_penalty: i32,
    /// Scores strictly above this count as genuine update evidence.
    pub update_threshold: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            host_bonus: 25,
            scene_group_bonus: 15,
            release_term_bonus: 10,
            password_bonus: 5,
            junk_penalty: 40,
            short_question_penalty: 50,
            short_thanks_penalty: 100,
            update_threshold: 15,
        }
    }
}

/// Scores forum posts against the lexicon tables.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    lexicon: Lexicon,
    weights: ScoreWeights,
}

impl Scorer {
    #[must_use]
    pub fn new(lexicon: Lexicon, weights: ScoreWeights) -> Self {
        Self { lexicon, weights }
    }

    /// Scorer with the built-in lexicon and a custom decision threshold.
    #[must_use]
    pub fn with_threshold(threshold: i32) -> Self {
        Self::new(
            Lexicon::default(),
            ScoreWeights {
                update_threshold: threshold,
                ..ScoreWeights::default()
            },
        )
    }

    /// Whether a score counts as genuine update evidence.
    #[must_use]
    pub fn is_update_evidence(&self, score: i32) -> bool {
        score > self.weights.update_threshold
    }

    #[must_use]
    pub fn threshold(&self) -> i32 {
        self.weights.update_threshold
    }

    /// Score a post. Pure, deterministic, and case-insensitive over both
    /// inputs; malformed or empty input degrades to 0, never an error.
    ///
    /// `raw_content` is the rendered post HTML (structural cues: links, code
    /// boxes), `plain_text` the normalized human-readable text (keywords).
    #[must_use]
    pub fn score(&self, raw_content: &str, plain_text: &str) -> i32 {
        let html = raw_content.to_lowercase();
        let text = plain_text.to_lowercase();
        let w = &self.weights;

        // Gatekeeper: no link and no code box means no update evidence,
        // whatever the text says.
        if !html.contains("http") && !html.contains(CODE_BOX_MARKER) {
            return 0;
        }

        // Short "thanks" posts hard-fail before any bonuses apply.
        let text_len = plain_text.chars().count();
        if text_len < 50 && GRATITUDE_TOKENS.iter().any(|t| text.contains(t)) {
            return -w.short_thanks_penalty;
        }

        let mut score = 0;

        // Each rule is a single fixed bonus when any term in its list
        // matches; the rules are independent and all may stack.
        if self
            .lexicon
            .hosts
            .iter()
            .any(|h| html.contains(h.as_str()) || text.contains(h.as_str()))
        {
            score += w.host_bonus;
        }
        if self
            .lexicon
            .scene_groups
            .iter()
            .any(|g| text.contains(g.as_str()))
        {
            score += w.scene_group_bonus;
        }
        if self
            .lexicon
            .release_terms
            .iter()
            .any(|t| text.contains(t.as_str()))
        {
            score += w.release_term_bonus;
        }
        if PASSWORD_MARKERS.iter().any(|m| text.contains(m)) {
            score += w.password_bonus;
        }

        if self
            .lexicon
            .junk_terms
            .iter()
            .any(|t| text.contains(t.as_str()))
        {
            score -= w.junk_penalty;
        }
        if text_len < 100 && plain_text.trim().ends_with('?') {
            score -= w.short_question_penalty;
        }

        score
    }
}
