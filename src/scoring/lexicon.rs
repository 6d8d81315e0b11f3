//! Static classification tables for the post scorer.
//!
//! These are fixed lexical signals, not a general classifier: known file
//! hosts, scene/repack groups, release terminology, and the perennial
//! junk/beggar phrases. All matching is substring-based over lowercased text,
//! so every entry here is stored lowercased.

/// File hosts commonly linked from release posts.
const VALID_HOSTS: &[&str] = &[
    "pixeldrain",
    "mega.nz",
    "gofile.io",
    "1fichier",
    "rapidgator",
    "qiwi.gg",
    "doodrive",
    "send.cm",
    "clicknupload",
    "bowfile",
    "katfile",
    "userscloud",
    "mixdrop",
    "drop.download",
    "multiup",
    "buzzheavier",
    "mediafire",
    "zippyshare", // legacy
];

/// Active scene groups and repackers.
const SCENE_GROUPS: &[&str] = &[
    "tenoke",
    "rune",
    "skidrow",
    "goldberg",
    "kaos",
    "fitgirl",
    "dodi",
    "elamigos",
    "gog",
    "razor1911",
    "flt",
    "cpy",
    "plaza",
    "tinyiso",
    "darksiders",
    "i_know",
    "omni",
    "insaneramzes",
    "ar-81",
];

/// Technical phrases that read as update evidence.
const RELEASE_TERMS: &[&str] = &[
    "crack only",
    "csf",
    "clean steam files",
    "repack",
    "portable",
    "build",
    "update v",
    "hotfix",
    "changelog",
    "patch",
    "dlc unlocker",
    "steam-rip",
    "aio update",
    "no-dvd",
    "goldberg emu",
    "smartsteamemu",
    "sse",
    "online-fix",
];

/// Phrases that mark a post as a question, complaint, or request.
const JUNK_TERMS: &[&str] = &[
    "eta?",
    "any news",
    "dead link",
    "reupload",
    "doesn't work",
    "help please",
    "password?",
    "rar password",
    "virus?",
    "trojan",
    "is this safe",
    "multiplayer?",
    "co-op?",
    "when is",
    "update please",
    "anyone have",
    "can someone",
    "seed please",
    "link expired",
    "part 2 missing",
    "google drive quota",
];

/// The word lists the scorer matches against.
///
/// Loaded once at startup and treated as immutable configuration. The
/// `Default` impl carries the built-in tables; tests substitute their own.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub hosts: Vec<String>,
    pub scene_groups: Vec<String>,
    pub release_terms: Vec<String>,
    pub junk_terms: Vec<String>,
}

impl Lexicon {
    /// Build a lexicon from raw term lists. Terms are lowercased so matching
    /// stays case-insensitive regardless of how callers spell them.
    #[must_use]
    pub fn new<S: AsRef<str>>(
        hosts: &[S],
        scene_groups: &[S],
        release_terms: &[S],
        junk_terms: &[S],
    ) -> Self {
        fn lower<S: AsRef<str>>(terms: &[S]) -> Vec<String> {
            terms.iter().map(|t| t.as_ref().to_lowercase()).collect()
        }
        Self {
            hosts: lower(hosts),
            scene_groups: lower(scene_groups),
            release_terms: lower(release_terms),
            junk_terms: lower(junk_terms),
        }
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new(VALID_HOSTS, SCENE_GROUPS, RELEASE_TERMS, JUNK_TERMS)
    }
}
